//! Error types for the receipt scanner.

use reqwest::StatusCode;
use thiserror::Error;

/// Startup errors. Any of these is fatal.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Problems with the environment-provided configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("Please set the {0} environment variable.")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Failures while talking to Azure Document Intelligence.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Could not reach the service.
    #[error("Check your internet connection and try again.")]
    Connection(#[source] reqwest::Error),

    /// Any other transport error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service refused the request (bad key, unsupported file, ...).
    #[error("Receipt analysis failed ({status}): {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("No Operation-Location in response")]
    MissingOperationLocation,

    /// The analysis operation ended in the `failed` state.
    #[error("Receipt analysis failed: {0}")]
    Failed(String),

    #[error("Receipt analysis timed out. Try again.")]
    TimedOut,

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Free-form failure from a recognizer.
    #[error("{0}")]
    Service(String),
}

impl AnalysisError {
    /// Whether submitting again may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AnalysisError::Connection(_) => true,
            AnalysisError::Network(e) => e.is_timeout(),
            AnalysisError::Rejected { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_messages() {
        assert_eq!(
            ConfigError::Missing("AZURE_DOCUMENT_INTELLIGENCE_KEY").to_string(),
            "Please set the AZURE_DOCUMENT_INTELLIGENCE_KEY environment variable."
        );
        assert_eq!(
            AnalysisError::Service("service unavailable".to_string()).to_string(),
            "service unavailable"
        );
        assert_eq!(
            AnalysisError::Rejected {
                status: StatusCode::UNAUTHORIZED,
                body: "Access denied".to_string()
            }
            .to_string(),
            "Receipt analysis failed (401 Unauthorized): Access denied"
        );
    }

    #[test]
    fn test_transient() {
        let rejected = |status| AnalysisError::Rejected {
            status,
            body: String::new(),
        };
        assert!(rejected(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(rejected(StatusCode::SERVICE_UNAVAILABLE).is_transient());
        assert!(!rejected(StatusCode::BAD_REQUEST).is_transient());
        assert!(!AnalysisError::TimedOut.is_transient());
        assert!(!AnalysisError::Failed("corrupt image".to_string()).is_transient());
    }
}
