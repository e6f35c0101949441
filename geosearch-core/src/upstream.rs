use async_trait::async_trait;
use std::{error::Error as StdError, fmt::Debug};
use thiserror::Error;

pub mod os_data_hub;

pub use os_data_hub::OsDataHubClient;

/// Raw reply from the search API: status code plus the body as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The search API could not be reached (connection refused, DNS failure, timeout, ...).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Flatten an error and its `source()` chain into one message.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { message }
    }
}

/// Outbound capability used by the lookup handler.
#[async_trait]
pub trait SearchClient: Send + Sync + Debug {
    /// Issue a place-name search for `location`, authenticated with `api_key`.
    async fn find(&self, location: &str, api_key: &str) -> Result<UpstreamReply, TransportError>;
}
