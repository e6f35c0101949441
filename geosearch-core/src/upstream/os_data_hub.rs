use anyhow::{Context, Result};
use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{
    Client, Url,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use std::time::Duration;

use super::{SearchClient, TransportError, UpstreamReply};

const FIND_PATH: &str = "search/names/v1/find";

/// RFC 3986 data escaping: everything except unreserved characters is encoded.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// OS Data Hub Names API client. Cheap to clone; the connection pool is shared.
#[derive(Debug, Clone)]
pub struct OsDataHubClient {
    base_url: Url,
    http: Client,
}

impl OsDataHubClient {
    /// `timeout` bounds the whole exchange, connect through reading the body.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("Invalid OS Data Hub base URL: {base}"))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for OS Data Hub")?;

        Ok(Self { base_url, http })
    }

    /// `<base>search/names/v1/find?query=<location>&key=<api_key>`, both values escaped.
    pub fn find_url(&self, location: &str, api_key: &str) -> Result<Url> {
        let relative = format!(
            "{FIND_PATH}?query={}&key={}",
            utf8_percent_encode(location, QUERY_VALUE),
            utf8_percent_encode(api_key, QUERY_VALUE),
        );

        self.base_url
            .join(&relative)
            .with_context(|| format!("Failed to build OS Data Hub URL for '{location}'"))
    }
}

#[async_trait]
impl SearchClient for OsDataHubClient {
    async fn find(&self, location: &str, api_key: &str) -> Result<UpstreamReply, TransportError> {
        let url = self
            .find_url(location, api_key)
            .map_err(|e| TransportError::new(e.to_string()))?;

        // The URL carries the API key, keep it out of error messages.
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::from_error(&e.without_url()))?;

        let status = res.status().as_u16();
        let body = res
            .text()
            .await
            .map_err(|e| TransportError::from_error(&e.without_url()))?;

        Ok(UpstreamReply { status, body })
    }
}
