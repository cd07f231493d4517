use std::{str::Utf8Error, time::SystemTimeError};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FolioError>;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parsing error")]
    Parse,
    #[error("Store error: {0} {1}")]
    Store(String, String),
    #[error("Upload error: {0}")]
    Upload(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Caller is not an authorized writer")]
    Unauthorized,
    #[error("Another submission is already in flight")]
    Busy,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FolioError {
    /// Build a [`FolioError::Store`] from a resource label and a message.
    pub fn store(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store(label.into(), message.into())
    }

    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload(message.into())
    }
}

impl From<Utf8Error> for FolioError {
    fn from(_: Utf8Error) -> Self {
        Self::Parse
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(_: serde_json::Error) -> Self {
        Self::Parse
    }
}

impl From<url::ParseError> for FolioError {
    fn from(_: url::ParseError) -> Self {
        Self::Parse
    }
}

impl From<reqwest::Error> for FolioError {
    fn from(value: reqwest::Error) -> Self {
        Self::Network(value.to_string())
    }
}

impl From<SystemTimeError> for FolioError {
    fn from(value: SystemTimeError) -> Self {
        Self::Other(anyhow::anyhow!(value.to_string()))
    }
}

impl From<Box<dyn std::error::Error>> for FolioError {
    fn from(e: Box<dyn std::error::Error>) -> Self {
        Self::Other(anyhow::anyhow!(e.to_string()))
    }
}
