//! Error types shared by every engine in the crate.
//!
//! Only configuration and programmer errors live here. Data degeneracy
//! (empty graphs, unreachable OD pairs, zero-variance baselines) is handled
//! locally with documented sentinel values.

use crate::network::NodeId;
use thiserror::Error;

/// Resilience engine errors
#[derive(Error, Debug)]
pub enum ResilienceError {
    #[error("Unknown attack strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Trial payload codec error: {0}")]
    Codec(String),

    #[error("Trial {0} failed: {1}")]
    TrialFailed(usize, String),

    #[error("No data: every trial of the ensemble failed")]
    NoData,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<bincode::Error> for ResilienceError {
    fn from(err: bincode::Error) -> Self {
        ResilienceError::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResilienceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ResilienceError::UnknownStrategy("pagerank".into());
        assert_eq!(err.to_string(), "Unknown attack strategy: pagerank");

        let err = ResilienceError::UnknownNode(NodeId::new("s42"));
        assert_eq!(err.to_string(), "Unknown node: s42");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ResilienceError = io.into();
        assert!(matches!(err, ResilienceError::Io(_)));
    }
}
