use prizebond_db::models::SchemaError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("invalid configuration: {parameter} {reason}")]
    InvalidConfig {
        parameter: &'static str,
        reason: String,
    },

    #[error("insufficient data: need at least {required} draws, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("digit position {position} received no ensemble votes")]
    DegenerateDistribution { position: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;
