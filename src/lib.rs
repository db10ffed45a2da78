// repo-warden library - repository and CI governance
// Exposes the governance components for the binary and for integration tests

pub mod config;
pub mod github;
pub mod governance;
pub mod observability;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{GovernanceSettings, WardenConfig};
pub use github::{GitHubClient, GitHubError, VersionControlHost};
#[cfg(feature = "testing")]
pub use github::InMemoryHost;
pub use governance::{
    BaseMergeOutcome, BranchCategory, BranchClassifier, CiResumeAuthorizer, MergeCoordinator,
    MonitoredRepository, PassReport, WorkflowRunGovernor,
};
pub use observability::{create_pass_span, host_metrics, HostCall, OperationTimer};
pub use telemetry::{generate_correlation_id, init_telemetry, shutdown_telemetry};
