use thiserror::Error;

pub type PlotResult<T> = Result<T, PlotError>;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("memoization cache is already locked")]
    MemoizeAlreadyLocked,

    #[error("plot has been destroyed")]
    Destroyed,
}
