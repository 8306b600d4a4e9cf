use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("record not found")]
    NotFound,
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BoardError>;
