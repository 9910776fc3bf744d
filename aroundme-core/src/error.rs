use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Concurrency error: {0}")]
    Concurrency(String),
}

pub type Result<T> = std::result::Result<T, Error>;
