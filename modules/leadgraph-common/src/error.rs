use thiserror::Error;

/// Error taxonomy for the knowledge engine.
///
/// Graph failures are fatal to the operation that hit them; vector failures
/// are logged and degraded around (the variants exist so callers and tests
/// can name them, not so they bubble out of the engine).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("graph write failed at step {step} for conversation {conversation_id}: {cause}")]
    GraphWrite {
        step: u8,
        conversation_id: String,
        cause: String,
    },

    #[error("vector write failed for conversation {conversation_id}: {cause}")]
    VectorWrite {
        conversation_id: String,
        cause: String,
    },

    #[error("graph read failed during {operation}: {cause}")]
    GraphRead {
        operation: String,
        cause: String,
    },

    #[error("vector read failed: {cause}")]
    VectorRead { cause: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn graph_write(step: u8, conversation_id: &str, cause: impl ToString) -> Self {
        EngineError::GraphWrite {
            step,
            conversation_id: conversation_id.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn graph_read(operation: &str, cause: impl ToString) -> Self {
        EngineError::GraphRead {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn vector_write(conversation_id: &str, cause: impl ToString) -> Self {
        EngineError::VectorWrite {
            conversation_id: conversation_id.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn vector_read(cause: impl ToString) -> Self {
        EngineError::VectorRead {
            cause: cause.to_string(),
        }
    }
}
