use octocrab::Error as OctocrabError;
use thiserror::Error;

/// Errors surfaced by the version control host layer.
///
/// Octocrab failures are classified by HTTP status when converted, so callers can
/// decide between retrying, treating the failure as a no-op, or logging and moving on.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub token not found: {0}")]
    TokenNotFound(String),

    #[error("GitHub configuration missing: {0}")]
    ConfigNotFound(String),

    #[error("GitHub rate limit exceeded: {message}")]
    RateLimit { message: String },

    #[error("operation '{operation}' timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("GitHub server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("GitHub API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GitHub client error: {0}")]
    Client(String),
}

impl GitHubError {
    /// Classify an HTTP failure by status code and the message GitHub returned with it.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 | 410 => GitHubError::NotFound(message),
            409 | 405 => GitHubError::Conflict(message),
            429 => GitHubError::RateLimit { message },
            403 if is_rate_limit_message(&message) => GitHubError::RateLimit { message },
            500..=599 => GitHubError::Server { status, message },
            _ => GitHubError::Api { status, message },
        }
    }

    /// Rate limits, timeouts, 5xx and connection failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GitHubError::RateLimit { .. }
                | GitHubError::Timeout { .. }
                | GitHubError::Server { .. }
                | GitHubError::NetworkError(_)
        )
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GitHubError::RateLimit { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, GitHubError::Conflict(_))
    }
}

fn is_rate_limit_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("rate limit") || message.contains("abuse")
}

impl From<OctocrabError> for GitHubError {
    fn from(err: OctocrabError) -> Self {
        match err {
            OctocrabError::GitHub { source, .. } => {
                GitHubError::from_status(source.status_code.as_u16(), source.message.clone())
            }
            http @ OctocrabError::Http { .. } => GitHubError::NetworkError(http.to_string()),
            other => {
                let message = other.to_string();
                let lowered = message.to_ascii_lowercase();
                if lowered.contains("timed out")
                    || lowered.contains("connection")
                    || lowered.contains("dns")
                {
                    GitHubError::NetworkError(message)
                } else {
                    GitHubError::Client(message)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(GitHubError::from_status(404, "Not Found").is_not_found());
        assert!(GitHubError::from_status(409, "Cannot cancel a completed run").is_conflict());
        assert!(GitHubError::from_status(429, "slow down").is_rate_limit());
        assert!(GitHubError::from_status(403, "API rate limit exceeded for user").is_rate_limit());
        assert!(!GitHubError::from_status(403, "Resource not accessible by integration").is_retryable());
        assert!(GitHubError::from_status(502, "Bad Gateway").is_retryable());
        assert!(!GitHubError::from_status(422, "Validation Failed").is_retryable());
    }

    #[test]
    fn test_configuration_errors_are_not_retryable() {
        assert!(!GitHubError::TokenNotFound("missing".to_string()).is_retryable());
        assert!(!GitHubError::ConfigNotFound("missing".to_string()).is_retryable());
        assert!(GitHubError::Timeout {
            operation: "get_branches".to_string(),
            duration_ms: 30_000,
        }
        .is_retryable());
    }
}
