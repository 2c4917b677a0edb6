use thiserror::Error;

#[derive(Error, Debug)]
pub enum FernError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ambiguous account identity: {0}")]
    AmbiguousIdentity(String),

    #[error("Authentication failed: {0}. Re-authenticate with your bank and update the access token.")]
    Auth(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FernError>;
