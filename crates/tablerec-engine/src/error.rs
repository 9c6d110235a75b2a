//! Error types for the recommendation engine.

/// Errors from the recommendation engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("query cannot be empty")]
    EmptyQuery,
    #[error("query exceeds maximum length of {0} characters")]
    QueryTooLong(usize),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("state error: {0}")]
    StateError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        assert_eq!(EngineError::EmptyQuery.to_string(), "query cannot be empty");
        assert_eq!(
            EngineError::QueryTooLong(2000).to_string(),
            "query exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            EngineError::TaskNotFound("abc".to_string()).to_string(),
            "task not found: abc"
        );
    }
}
