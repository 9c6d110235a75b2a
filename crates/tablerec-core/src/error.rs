use thiserror::Error;

/// Top-level error type for the Tablerec system.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates define
/// their own error types and implement `From` conversions so the `?`
/// operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TablerecError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),
}

impl From<toml::de::Error> for TablerecError {
    fn from(err: toml::de::Error) -> Self {
        TablerecError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TablerecError {
    fn from(err: toml::ser::Error) -> Self {
        TablerecError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TablerecError {
    fn from(err: serde_json::Error) -> Self {
        TablerecError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Tablerec operations.
pub type Result<T> = std::result::Result<T, TablerecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TablerecError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = TablerecError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");

        let err = TablerecError::TaskNotFound("abc123".to_string());
        assert_eq!(err.to_string(), "Task not found: abc123");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TablerecError = io_err.into();
        assert!(matches!(err, TablerecError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let bad_toml = "invalid = [[[";
        let parsed: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        let err: TablerecError = parsed.unwrap_err().into();
        assert!(matches!(err, TablerecError::Config(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let parsed: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("{ invalid json }");
        let err: TablerecError = parsed.unwrap_err().into();
        assert!(matches!(err, TablerecError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
