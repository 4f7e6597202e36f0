use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("provider call failed: {0}")]
    Provider(String),

    #[error("{got} texts exceed the provider limit of {max} per call")]
    ProviderLimit { got: usize, max: usize },

    #[error("batch of {got} entries exceeds the store maximum of {max}")]
    BatchTooLarge { got: usize, max: usize },

    #[error("vector dimension {got} does not match configured dimension {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("duplicate chunk id: {0}")]
    DuplicateEntry(String),

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("no relevant context was retrieved for the question")]
    EmptyContext,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
