use crate::RowId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("title not found: {0}")]
    NotFound(String),

    #[error("row {row} out of range for {rows} rows")]
    IndexOutOfRange { row: usize, rows: usize },

    #[error("recommendation engine is still loading")]
    NotReady,

    #[error("artifact shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    #[error("title {key:?} maps to both row {first} and row {second}")]
    TitleCollision { key: String, first: RowId, second: RowId },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
