//! Domain-level error taxonomy for Flotilla.

/// Flotilla domain errors.
#[derive(Debug, thiserror::Error)]
pub enum FlotillaError {
    #[error("git error: {0}")]
    Git(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("build tool error: {0}")]
    BuildTool(String),

    #[error("build failed for unit {unit}: {message}")]
    BuildFailed { unit: String, message: String },

    #[error("push failed for unit {unit}: {message}")]
    PushFailed { unit: String, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Flotilla domain operations.
pub type Result<T> = std::result::Result<T, FlotillaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlotillaError::Git("rev-parse failed".to_string());
        assert!(err.to_string().contains("git error"));

        let err = FlotillaError::Registry("pull denied".to_string());
        assert!(err.to_string().contains("registry error"));
    }

    #[test]
    fn test_stage_errors_carry_unit_identity() {
        let err = FlotillaError::BuildFailed {
            unit: "app2".to_string(),
            message: "missing base image".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("app2"));
        assert!(msg.contains("missing base image"));

        let err = FlotillaError::PushFailed {
            unit: "app1".to_string(),
            message: "denied".to_string(),
        };
        assert!(err.to_string().contains("app1"));
    }
}
