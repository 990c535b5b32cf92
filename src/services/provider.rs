// src/services/provider.rs

//! BTC Map read API client.
//!
//! Three endpoints are used, all relative to the configured base URL:
//!
//! - `GET areas/{name}` for community metadata and boundary
//! - `GET events?updated_since={YYYY-MM-DD}` for change events
//! - `GET elements/{kind}:{id}` for the full element record

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, ChangeEvent, Community, Element, decode_events};
use crate::utils::http;

/// Read access to the remote directory of areas, events and elements.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Community metadata. A missing area is `AppError::CommunityNotFound`.
    async fn fetch_area(&self, name: &str) -> Result<Community>;

    /// Change events updated on or after `since` (date granularity only).
    async fn fetch_events(&self, since: NaiveDate) -> Result<Vec<ChangeEvent>>;

    /// One element by its typed reference, e.g. `node:123`.
    async fn fetch_element(&self, element_id: &str) -> Result<Element>;
}

/// HTTP implementation of [`DirectoryProvider`].
#[derive(Debug, Clone)]
pub struct BtcMapClient {
    client: Client,
    base: Url,
}

impl BtcMapClient {
    /// Create a client from API settings.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = http::create_async_client(config)?;
        Self::new(client, &config.base_url)
    }

    /// Create a client over an existing `reqwest::Client`.
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(AppError::config(format!("Not a base URL: {base_url}")));
        }
        Ok(Self { client, base })
    }

    /// Build an endpoint URL from path segments under the base.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("Not a base URL: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn area_url(&self, name: &str) -> Result<Url> {
        self.endpoint(&["areas", name])
    }

    fn events_url(&self, since: NaiveDate) -> Result<Url> {
        let mut url = self.endpoint(&["events"])?;
        url.query_pairs_mut()
            .append_pair("updated_since", &since.format("%Y-%m-%d").to_string());
        Ok(url)
    }

    fn element_url(&self, element_id: &str) -> Result<Url> {
        self.endpoint(&["elements", element_id])
    }

    /// GET a URL and decode the JSON body, failing on non-success status.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        log::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Provider {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DirectoryProvider for BtcMapClient {
    async fn fetch_area(&self, name: &str) -> Result<Community> {
        let url = self.area_url(name)?;
        match self.get_json(url).await {
            Err(AppError::Provider { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(AppError::CommunityNotFound(name.to_string()))
            }
            other => other,
        }
    }

    async fn fetch_events(&self, since: NaiveDate) -> Result<Vec<ChangeEvent>> {
        let records: Vec<Value> = self.get_json(self.events_url(since)?).await?;
        let events = decode_events(records)?;
        log::debug!("Provider reported {} events since {}", events.len(), since);
        Ok(events)
    }

    async fn fetch_element(&self, element_id: &str) -> Result<Element> {
        self.get_json(self.element_url(element_id)?).await
    }
}
