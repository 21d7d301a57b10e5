use thiserror::Error;

/// Top-level error type for the SwachTrack service.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for SwachError` (or the reverse) so that the `?`
/// operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SwachError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for SwachError {
    fn from(err: toml::de::Error) -> Self {
        SwachError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SwachError {
    fn from(err: toml::ser::Error) -> Self {
        SwachError::Config(err.to_string())
    }
}

/// A specialized `Result` type for SwachTrack operations.
pub type Result<T> = std::result::Result<T, SwachError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SwachError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(SwachError, &str)> = vec![
            (
                SwachError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                SwachError::Validation("issue is required".to_string()),
                "Validation error: issue is required",
            ),
            (
                SwachError::Upstream("connection reset".to_string()),
                "Upstream error: connection reset",
            ),
            (
                SwachError::Api("bind failed".to_string()),
                "API error: bind failed",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SwachError = io_err.into();
        assert!(matches!(err, SwachError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let err: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        let swach_err: SwachError = err.unwrap_err().into();
        assert!(matches!(swach_err, SwachError::Config(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(format!("value={}", value))
        }

        assert_eq!(inner().unwrap(), "value=42");
    }
}
