//! postcodes.io lookup: `GET {base}/postcodes/{postcode}`

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{Geocoder, Location, WeatherError};
use crate::config::WeatherConfig;

const SERVICE: &str = "postcodes.io";

#[derive(Debug, Deserialize)]
struct LookupResponse {
    result: Option<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Clone)]
pub struct PostcodesIoGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl PostcodesIoGeocoder {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.geocoder_url.trim_end_matches('/').to_string(),
        })
    }

    /// Extract coordinates from a lookup body.
    pub fn parse_response(postcode: &str, body: &str) -> Result<Location, WeatherError> {
        let parsed: LookupResponse =
            serde_json::from_str(body).map_err(|e| WeatherError::Malformed {
                service: SERVICE,
                reason: e.to_string(),
            })?;
        match parsed.result {
            Some(LookupResult {
                latitude: Some(latitude),
                longitude: Some(longitude),
            }) => Ok(Location { latitude, longitude }),
            // Valid postcode without a grid reference (e.g. Channel Islands)
            _ => Err(WeatherError::UnknownPostcode(postcode.to_string())),
        }
    }
}

#[async_trait]
impl Geocoder for PostcodesIoGeocoder {
    async fn locate(&self, postcode: &str) -> Result<Location, WeatherError> {
        let normalised = postcode.trim().to_ascii_uppercase();
        let resp = self
            .http
            .get(format!("{}/postcodes/{}", self.base_url, normalised))
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::NOT_FOUND => Err(WeatherError::UnknownPostcode(normalised)),
            status if status.is_success() => {
                let body = resp.text().await?;
                Self::parse_response(&normalised, &body)
            }
            status => Err(WeatherError::Status {
                service: SERVICE,
                status: status.as_u16(),
            }),
        }
    }
}
