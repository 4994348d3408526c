use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Tag errors
    #[error("Invalid tag identifier: {0}")]
    InvalidTag(String),

    #[error("Invalid authorized entry: {0}")]
    InvalidEntry(String),

    // Session errors
    #[error("Invalid mode transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
