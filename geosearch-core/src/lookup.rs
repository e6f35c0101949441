//! The location lookup handler.
//!
//! Resolves the `location` parameter, checks that an API key is configured,
//! forwards the search to the upstream client, and maps whatever comes back
//! into either a [`LocationResult`] or a [`LookupError`].

use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    config::{API_KEY_ENV, Config},
    error::LookupError,
    model::{LocationResult, LookupRequest},
    upstream::SearchClient,
};

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Resolve the location from the query string first, then from a JSON body `{"location": "..."}`.
///
/// A blank value counts as absent. A body that is not JSON, not an object, or has no
/// string `location` field yields nothing rather than an error.
pub fn extract_location(query: Option<&str>, body: &[u8]) -> Option<LookupRequest> {
    if let Some(location) = query.filter(|q| !is_blank(q)) {
        return Some(LookupRequest {
            location: location.to_string(),
        });
    }

    if body.is_empty() {
        return None;
    }

    let json: Value = serde_json::from_slice(body).ok()?;
    let location = json.get("location")?.as_str()?;

    (!is_blank(location)).then(|| LookupRequest {
        location: location.to_string(),
    })
}

/// Stateless lookup handler. Safe to share across concurrent requests.
#[derive(Debug, Clone)]
pub struct LocationLookup {
    config: Config,
    client: Arc<dyn SearchClient>,
}

impl LocationLookup {
    pub fn new(config: Config, client: Arc<dyn SearchClient>) -> Self {
        Self { config, client }
    }

    /// Handle one inbound request given its `location` query value and raw body.
    pub async fn handle(
        &self,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<LocationResult, LookupError> {
        let request = extract_location(query, body).ok_or(LookupError::MissingLocation)?;
        self.lookup(&request).await
    }

    pub async fn lookup(&self, request: &LookupRequest) -> Result<LocationResult, LookupError> {
        let location = request.location.as_str();
        info!(location, "Looking up location");

        let Some(api_key) = self.config.api_key() else {
            error!("OS Data Hub API key is not set; configure {API_KEY_ENV}");
            return Err(LookupError::MissingApiKey);
        };

        let reply = match self.client.find(location, api_key).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(location, error = %e, "Failed to reach OS Data Hub API");
                return Err(LookupError::Unreachable { detail: e.message });
            }
        };

        if !reply.is_success() {
            warn!(
                status = reply.status,
                body = %reply.body,
                "OS Data Hub API returned a non-success status"
            );
            return Err(LookupError::Upstream {
                status: reply.status,
                body: reply.body,
            });
        }

        let data: Value = serde_json::from_str(&reply.body).map_err(|e| {
            error!(location, error = %e, "OS Data Hub API returned a body that is not JSON");
            LookupError::InvalidUpstreamBody {
                detail: e.to_string(),
            }
        })?;

        Ok(LocationResult::new(location.to_string(), data))
    }
}
