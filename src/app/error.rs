use thiserror::Error;

#[derive(Error, Debug)]
pub enum TributaryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Calendar parsing error: {0}")]
    CalendarParse(String),

    #[error("CalDAV error: {0}")]
    CalDav(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("fetch cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl TributaryError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TributaryError::Cancelled)
    }

    pub fn is_serialization(&self) -> bool {
        matches!(self, TributaryError::Serialization(_))
    }
}

pub type Result<T> = std::result::Result<T, TributaryError>;
