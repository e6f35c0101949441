use thiserror::Error;

use crate::model::ErrorBody;

/// Every way a lookup can fail, each mapped to one client-facing response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Missing required parameter 'location'. Pass it as a query string or JSON body.")]
    MissingLocation,

    #[error("Server configuration error: API key not set.")]
    MissingApiKey,

    /// The search API answered with a non-success status.
    #[error("OS Data Hub API returned {status}.")]
    Upstream { status: u16, body: String },

    #[error("Unable to reach OS Data Hub API.")]
    Unreachable { detail: String },

    /// The search API answered 200 with a body that is not JSON.
    #[error("OS Data Hub API returned an invalid response.")]
    InvalidUpstreamBody { detail: String },
}

impl LookupError {
    /// HTTP status code to answer the caller with.
    pub fn status(&self) -> u16 {
        match self {
            LookupError::MissingLocation => 400,
            LookupError::MissingApiKey => 500,
            LookupError::Upstream { status, .. } => *status,
            LookupError::Unreachable { .. } | LookupError::InvalidUpstreamBody { .. } => 502,
        }
    }

    /// Diagnostic text for the `detail` field: the upstream body or the underlying failure.
    pub fn detail(&self) -> Option<&str> {
        match self {
            LookupError::MissingLocation | LookupError::MissingApiKey => None,
            LookupError::Upstream { body, .. } => Some(body.as_str()),
            LookupError::Unreachable { detail } | LookupError::InvalidUpstreamBody { detail } => {
                Some(detail.as_str())
            }
        }
    }

    /// JSON payload to answer the caller with.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            detail: self.detail().map(str::to_owned),
        }
    }
}
