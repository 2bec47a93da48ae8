use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ErrorDetail, Result};

/// One page worth of API response: the JSON body plus the value of the
/// `total` header, when the endpoint reports one.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Value,
    pub total: Option<u64>,
}

/// Query parameters for one endpoint request. `per_page` is typed so the
/// fetcher can recognize a paginated request; everything else is a plain
/// key/value string pair.
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: Vec<(String, String)>,
    per_page: Option<u32>,
    page: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn param(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn per_page(mut self, size: u32) -> Self {
        self.per_page = Some(size);
        self
    }

    pub fn page_size(&self) -> Option<u32> {
        self.per_page
    }

    pub(crate) fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub(crate) fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.params.clone();
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page".into(), per_page.to_string()));
        }

        if let Some(page) = self.page {
            pairs.push(("page".into(), page.to_string()));
        }

        pairs
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.pairs().into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// The seam between the fetcher and the wire. The real implementation is
/// [`HttpTransport`]; tests substitute an in-memory one.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn get(&self, endpoint: &str, query: &Query) -> Result<ApiResponse>;
}

/// The category of a failed API request. "Empty but successful" responses
/// are not errors and never reach this type; see the per-method contracts
/// in [`crate::import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request was rejected, most likely because the token is wrong.
    Unauthorized,
    /// The endpoint or item does not exist.
    NotFound,
    /// Any other failure: non-success status or a network-level error.
    Other,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn for_status(status: u16, message: String) -> Self {
        let kind = match status {
            401 => ApiErrorKind::Unauthorized,
            404 => ApiErrorKind::NotFound,
            _ => ApiErrorKind::Other,
        };

        ApiError { kind, status: Some(status), message }
    }

    pub fn transport(error: reqwest::Error) -> Self {
        ApiError {
            kind: ApiErrorKind::Other,
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }

    /// Emit the category-tagged diagnostic for this failure, then hand the
    /// error back for propagation. No request is ever retried.
    pub(crate) fn trace(self, endpoint: &str) -> Self {
        match self.kind {
            ApiErrorKind::Unauthorized => tracing::error!(
                endpoint, "unauthorized: the API token is probably wrong"
            ),
            ApiErrorKind::NotFound => tracing::error!(
                endpoint, "not found: the item you are trying to get doesn't exist"
            ),
            ApiErrorKind::Other => tracing::error!(
                endpoint,
                status = self.status,
                message = %self.message,
                "request failed"
            ),
        }

        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ApiErrorKind::Unauthorized => write!(f, "unauthorized API request"),
            ApiErrorKind::NotFound => write!(f, "API item not found"),
            ApiErrorKind::Other => write!(f, "API request failed"),
        }
    }
}

impl ErrorDetail for ApiError {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        if let Some(status) = self.status {
            ctxt.push((Some("status".into()), status.to_string()));
        }

        if !self.message.is_empty() {
            ctxt.push((Some("message".into()), self.message.clone()));
        }

        ctxt
    }
}

/// reqwest-backed [`Transport`] speaking to the CDN API.
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    pub fn new(token: &str, config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(seconds) = config.timeout {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        Ok(HttpTransport {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: &str, query: &Query) -> Result<ApiResponse> {
        let url = format!("{}/cdn/{}", self.base_url, endpoint);
        let request = self.http.get(&url)
            .query(&[("token", self.token.as_str())])
            .query(&query.pairs());

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(ApiError::transport(e).trace(endpoint).into()),
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::for_status(status.as_u16(), message).trace(endpoint).into());
        }

        let total = response.headers()
            .get("total")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());

        Ok(ApiResponse { body: response.json().await?, total })
    }
}
