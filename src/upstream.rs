//! Upstream forms API client
//!
//! Fetches one page of submissions for a form. Requests are not retried; any
//! failure aborts the caller's request.

use bytes::Bytes;
use reqwest::{header, StatusCode};
use serde::de::IgnoredAny;
use thiserror::Error;
use url::Url;

use crate::config::{ApiConfig, ConfigError};

/// Upstream fetch errors
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport failure or timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the upstream API
    #[error("upstream responded with {0}")]
    Status(StatusCode),

    /// Body was not the expected JSON
    #[error("invalid upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Submissions URL could not be built from the base URL
    #[error("cannot build submissions URL from {0}")]
    Url(Url),
}

/// Client for the upstream submissions endpoint
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    /// Build a client with the bearer credential installed as a default header
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.bearer_token))
            .map_err(|e| ConfigError::Invalid { name: "BEARER_TOKEN", reason: e.to_string() })?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.upstream_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| ConfigError::Invalid {
            name: "BASE_URL",
            reason: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self { http, base_url: config.base_url.clone() })
    }

    /// Host of the configured upstream base URL
    pub fn host(&self) -> Option<&str> {
        self.base_url.host_str()
    }

    /// `{base}/{form_id}/submissions`
    pub fn submissions_url(&self, form_id: &str) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .push(form_id)
            .push("submissions");
        Ok(url)
    }

    /// Fetch one page of submissions.
    ///
    /// The body is checked to be JSON and returned byte for byte.
    pub async fn fetch_submissions(
        &self,
        form_id: &str,
        query: &[(&str, String)],
    ) -> Result<Bytes, UpstreamError> {
        let url = self.submissions_url(form_id)?;
        tracing::debug!(%url, ?query, "fetching submissions");

        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<IgnoredAny>(&body)?;
        Ok(body)
    }
}
