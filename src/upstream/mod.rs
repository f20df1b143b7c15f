//! Clients for the public launch-data APIs.
//!
//! [`ApiClient`] performs the raw JSON GETs and never fails loudly: any
//! problem is logged and reported as `None`. [`normalize`] turns the SpaceX
//! launch list into [`NewMission`](crate::api::mission_store::NewMission)
//! payloads.

pub mod normalize;

pub use normalize::normalize_launches;

use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Default upstream request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default SpaceX launch list endpoint.
pub const SPACEX_API_URL: &str = "https://api.spacexdata.com/v4/launches";

/// Default NASA Astronomy Picture of the Day endpoint.
pub const NASA_APOD_URL: &str = "https://api.nasa.gov/planetary/apod";

/// JSON-over-HTTP GET client with a fixed timeout.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// `api_key` is sent as the `api_key` query parameter when given. Returns
    /// `None` for non-200 responses, timeouts, transport failures and bodies
    /// that are not JSON.
    pub async fn fetch_json(&self, url: &str, api_key: Option<&str>) -> Option<serde_json::Value> {
        let mut request = self.client.get(url);
        if let Some(key) = api_key {
            request = request.query(&[("api_key", key)]);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    tracing::warn!("Request to {} timed out", url);
                } else if e.is_connect() {
                    tracing::warn!("Connection to {} failed: {}", url, e);
                } else {
                    tracing::warn!("Request to {} failed: {}", url, e);
                }
                return None;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!("Upstream {} answered with status {}", url, status);
            return None;
        }

        match response.json::<serde_json::Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                if e.is_timeout() {
                    tracing::warn!("Reading response from {} timed out", url);
                } else {
                    tracing::warn!("Failed to decode JSON from {}: {}", url, e);
                }
                None
            }
        }
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
