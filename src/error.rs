use thiserror::Error;

/// Errors surfaced by session setup and result persistence
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("grid size must be between 1 and 9, got {0}")]
    InvalidGridSize(usize),

    #[error("a session needs at least one round")]
    InvalidRounds,

    #[error("timeout must be a positive number of milliseconds")]
    InvalidTimeout,

    #[error("stats database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, FocusError>;
