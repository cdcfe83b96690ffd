use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UtilError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

pub type UtilResult<T> = Result<T, UtilError>;
