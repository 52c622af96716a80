//! Job Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0} data is not found")]
    DataNotFound(i64),

    #[error("file is not found")]
    FileNotFound,

    #[error("file url is empty")]
    EmptyFileUrl,

    #[error("invalid prompt point: {0}")]
    InvalidPromptPoint(String),
}
