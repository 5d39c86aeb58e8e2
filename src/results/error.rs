use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Index responded with status {0}")]
    RemoteStatus(u16),

    #[error("Index reported failure: {0}")]
    RemoteFailure(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time slot: {0}")]
    InvalidTimeSlot(String),

    #[error("Missing setting: {0}")]
    MissingSetting(String),
}
