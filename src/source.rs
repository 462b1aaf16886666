//! Rate source: one GET against the rates endpoint per fetch.

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{Client, Url};

use crate::error::FetchError;
use crate::rate_snapshot::RateSnapshot;

pub const DEFAULT_BASE_CURRENCY: &str = "USD";

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetches the latest snapshot of rates against `base_currency`.
    async fn fetch(&self, api_key: &str, base_currency: &str) -> Result<RateSnapshot, FetchError>;
}

pub struct HttpRateSource {
    api_url: String,
    client: Client,
}

impl HttpRateSource {
    pub fn new(api_url: &str) -> Self {
        Self::with_client(api_url, Client::new())
    }

    pub fn with_client(api_url: &str, client: Client) -> Self {
        HttpRateSource {
            api_url: api_url.to_string(),
            client,
        }
    }

    fn get_url(&self, api_key: &str, base_currency: &str) -> Result<Url, FetchError> {
        Url::parse_with_params(&self.api_url, &[("key", api_key), ("base", base_currency)])
            .map_err(|e| FetchError::Transport(format!("invalid rates URL {}: {}", self.api_url, e)))
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn fetch(&self, api_key: &str, base_currency: &str) -> Result<RateSnapshot, FetchError> {
        if api_key.is_empty() {
            error!("API key is not configured. Please set CURRENCY_API_KEY environment variable.");
            return Err(FetchError::MissingApiKey);
        }

        let url = self.get_url(api_key, base_currency)?;
        debug!("Requesting rates from {}", self.api_url);

        let resp = self.client.get(url).send().await.map_err(|e| {
            let err = FetchError::from(e);
            error!("{}", err);
            err
        })?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            error!("HTTP error occurred: {} - {}", status, body);
            return Err(FetchError::HttpStatus { status, body });
        }

        let snapshot: RateSnapshot = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to decode JSON response: {}", e);
            FetchError::Decode {
                message: e.to_string(),
                body: body.clone(),
            }
        })?;

        info!("Successfully fetched rates for base currency: {}", base_currency);
        Ok(snapshot)
    }
}
