/// The error taxonomy of every service method. The dispatcher is the only
/// place that downgrades these to a string; everywhere else they propagate
/// with `?`.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("schema error: {0}")]
    Schema(String),
    #[error("unknown type: {0}")]
    UnknownType(String),
    #[error("unknown id: {0}")]
    UnknownId(u32),
    #[error("invalid action")]
    InvalidAction,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Schema(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
