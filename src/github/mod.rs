pub mod client;
pub mod errors;
pub mod host;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod page;
pub mod retry;
pub mod types;

pub use client::GitHubClient;
pub use errors::GitHubError;
pub use host::VersionControlHost;
#[cfg(any(test, feature = "testing"))]
pub use memory::{HostAction, InMemoryHost};
pub use page::{collect_all, Page, DEFAULT_PER_PAGE};
pub use retry::{GitHubRetryHandler, RetryConfig};

#[cfg(any(test, feature = "testing"))]
pub use host::MockVersionControlHost;
