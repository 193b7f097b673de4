use thiserror::Error;

use bt_core::BtError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(String),

    #[error("unsupported catalog format {0:?}: expected .csv or .json")]
    UnsupportedFormat(String),

    #[error("catalog is empty")]
    Empty,

    #[error(transparent)]
    Route(#[from] BtError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
