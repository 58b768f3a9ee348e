use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// a file on the pipeline boundary was missing, truncated, or in the wrong shape
    #[error("bad input: {0}")]
    InputFormat(String),

    #[error("can't design filter: {0}")]
    FilterDesign(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
