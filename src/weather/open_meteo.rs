//! Open-Meteo historical archive: daily `precipitation_sum` in mm

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{Location, PrecipitationSource, WeatherError, PRECIPITATION_SERIES};
use crate::config::WeatherConfig;
use crate::types::{EnvironmentalSeries, TimeSeries};

const SERVICE: &str = "Open-Meteo";

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    precipitation_sum: Vec<Option<f64>>,
}

#[derive(Clone)]
pub struct OpenMeteoArchive {
    http: reqwest::Client,
    archive_url: String,
}

impl OpenMeteoArchive {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            archive_url: config.archive_url.clone(),
        })
    }

    /// Turn an archive body into a daily series. `null` days stay missing.
    pub fn parse_response(body: &str) -> Result<EnvironmentalSeries, WeatherError> {
        let malformed = |reason: String| WeatherError::Malformed {
            service: SERVICE,
            reason,
        };
        let parsed: ArchiveResponse =
            serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
        let daily = parsed
            .daily
            .ok_or_else(|| malformed("no daily block".to_string()))?;
        if daily.time.len() != daily.precipitation_sum.len() {
            return Err(malformed(format!(
                "{} dates but {} precipitation values",
                daily.time.len(),
                daily.precipitation_sum.len()
            )));
        }

        let mut pairs = Vec::with_capacity(daily.time.len());
        for (day, value) in daily.time.iter().zip(daily.precipitation_sum) {
            let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map_err(|e| malformed(format!("bad date '{day}': {e}")))?;
            pairs.push((date.and_time(chrono::NaiveTime::MIN), value));
        }
        let series = TimeSeries::from_pairs(pairs).map_err(|e| malformed(e.to_string()))?;
        Ok(EnvironmentalSeries::new(PRECIPITATION_SERIES, series))
    }
}

#[async_trait]
impl PrecipitationSource for OpenMeteoArchive {
    async fn daily_precipitation(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<EnvironmentalSeries, WeatherError> {
        debug!(location = %location, start = %start, end = %end, "Requesting precipitation archive");
        let resp = self
            .http
            .get(&self.archive_url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("daily", "precipitation_sum".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(WeatherError::Status {
                service: SERVICE,
                status: resp.status().as_u16(),
            });
        }
        let body = resp.text().await?;
        Self::parse_response(&body)
    }
}
