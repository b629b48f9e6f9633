use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::models::{ApiEnvelope, Event, FestivalStats};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("upstream reported failure: {0}")]
    Unsuccessful(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Query parameters accepted by the general listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// Read-only festival data source.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn list(&self, params: &ListParams) -> Result<Vec<Event>, ApiError>;
    async fn open(&self) -> Result<Vec<Event>, ApiError>;
    async fn upcoming(&self, days: u32) -> Result<Vec<Event>, ApiError>;
    async fn stats(&self) -> Result<FestivalStats, ApiError>;
    async fn categories(&self) -> Result<Vec<String>, ApiError>;
    /// Single record by slug, falling back to id on the upstream side.
    async fn event(&self, key: &str) -> Result<Event, ApiError>;
}

pub struct ApiClient {
    base_url: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|err| ApiError::Http(err.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("festival-front/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ApiError::Http(err.to_string()))?;
        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::Http(err.to_string()))
    }

    async fn get_data<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(%url, "requesting festival api");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| ApiError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::Http(err.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&body).map_err(|err| ApiError::Parse(err.to_string()))?;
        if !envelope.success {
            return Err(ApiError::Unsuccessful(
                envelope
                    .error
                    .unwrap_or_else(|| "success=false".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| ApiError::Parse("response missing data".to_string()))
    }
}

#[async_trait]
impl EventSource for ApiClient {
    async fn list(&self, params: &ListParams) -> Result<Vec<Event>, ApiError> {
        let mut url = self.endpoint("api/festivals")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(limit) = params.limit.filter(|n| *n > 0) {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(skip) = params.skip.filter(|n| *n > 0) {
                query.append_pair("skip", &skip.to_string());
            }
            if let Some(category) = params.category.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("type", category);
            }
            if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("search", search);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.get_data(url).await
    }

    async fn open(&self) -> Result<Vec<Event>, ApiError> {
        let url = self.endpoint("api/festivals/open")?;
        self.get_data(url).await
    }

    async fn upcoming(&self, days: u32) -> Result<Vec<Event>, ApiError> {
        let mut url = self.endpoint("api/festivals/upcoming")?;
        url.query_pairs_mut()
            .append_pair("days", &days.to_string());
        self.get_data(url).await
    }

    async fn stats(&self) -> Result<FestivalStats, ApiError> {
        let url = self.endpoint("api/festivals/stats")?;
        self.get_data(url).await
    }

    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint("api/festivals/types")?;
        self.get_data(url).await
    }

    async fn event(&self, key: &str) -> Result<Event, ApiError> {
        let mut url = self.endpoint("api/festivals")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Http("base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(key);
        self.get_data(url).await
    }
}
