use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TraceError>;
