//! Error types for the rate sync pipeline.

use reqwest::StatusCode;

/// Failures of a single fetch against the rates endpoint.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("HTTP error: {status}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("JSON decode error: {message}")]
    Decode { message: String, body: String },
}

impl FetchError {
    /// Raw response body carried by the error, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            FetchError::HttpStatus { body, .. } | FetchError::Decode { body, .. } => {
                Some(body.as_str())
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Storage-level errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database credential not configured: {0}")]
    MissingCredential(&'static str),

    #[error("Error connecting to database: {0}")]
    Connection(String),

    #[error("Error initializing schema: {0}")]
    Schema(String),

    #[error("Error inserting currency rate for {code}: {message}")]
    Write { code: String, message: String },
}

/// A raw rate value that could not be turned into a decimal.
#[derive(Debug, thiserror::Error)]
#[error("Could not convert rate '{raw}' to decimal for currency {code}")]
pub struct CoercionError {
    pub code: String,
    pub raw: String,
}

/// Errors that end a run before all rates are processed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("CURRENCY_API_KEY not configured")]
    MissingApiKey,

    #[error("Failed to fetch currency rates: {0}")]
    Fetch(#[from] FetchError),

    #[error("Fetched rates data is missing a 'rates' mapping")]
    MalformedSnapshot,

    #[error(transparent)]
    Store(#[from] StoreError),
}
