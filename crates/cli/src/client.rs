//! API client for communicating with the forecast server

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;
use url::Url;

/// API client for the forecast server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // Keep any path prefix when joining relative routes
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (status, body) = self.get_with_status::<T>(path).await?;
        body.with_context(|| format!("API error ({})", status))
    }

    /// GET that also accepts 503, which health probes use for an unhealthy body
    pub async fn get_with_status<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<(StatusCode, Option<T>)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.json().await.context("Failed to parse response")?;
            return Ok((status, Some(body)));
        }

        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("API error ({}): {}", status, body);
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API request types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficRequest {
    pub hour: i64,
    pub day_of_week: i64,
    pub weather: String,
    pub vehicle_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyRequest {
    pub hour: i64,
    pub day_of_week: i64,
    pub temperature: f64,
    pub grid_load_mw: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteRequest {
    pub bin_type: String,
    pub fill_level_percent: i64,
    pub days_since_collection: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollutionRequest {
    pub hour: i64,
    pub traffic_level: String,
    pub aqi: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRequest {
    pub hour: i64,
    pub day_of_week: i64,
    pub weather: String,
    pub traffic_level: String,
}

// API response types

/// Body of every prediction route: one forecast field, or an `error` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionReply {
    Error { error: String },
    Forecast(BTreeMap<String, f64>),
}

impl PredictionReply {
    /// Split into the forecast field and its value, or the server's error message
    pub fn into_result(self) -> std::result::Result<(String, f64), String> {
        match self {
            PredictionReply::Error { error } => Err(error),
            PredictionReply::Forecast(body) => body
                .into_iter()
                .next()
                .ok_or_else(|| "Empty prediction response".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub models_loaded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
