//! Replica error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpfsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Replica API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid replica response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
