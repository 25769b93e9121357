//! Weather Collaborators
//!
//! Rainfall and soil moisture arrive from outside the analysis core:
//!
//! - `PostcodesIoGeocoder`: UK postcode to latitude/longitude
//! - `OpenMeteoArchive`: daily precipitation history for a location
//! - `CosmosUkClient`: daily soil moisture from the nearest COSMOS-UK station
//! - `CsvPrecipitationSource` / `CsvSoilMoistureSource`: operator-supplied
//!   daily files
//!
//! Any failure here means "environment unavailable for this run". Callers
//! log it and analyse without that series; nothing is retried.

pub mod cosmos;
pub mod csv_source;
pub mod open_meteo;
pub mod postcodes;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::alignment::AlignmentError;
use crate::ingest::IngestError;
use crate::types::EnvironmentalSeries;

pub use cosmos::CosmosUkClient;
pub use csv_source::{CsvPrecipitationSource, CsvSoilMoistureSource};
pub use open_meteo::OpenMeteoArchive;
pub use postcodes::PostcodesIoGeocoder;

/// Name carried by every precipitation series.
pub const PRECIPITATION_SERIES: &str = "precipitation_mm";

/// Name carried by every soil moisture series (volumetric water content, %).
pub const SOIL_MOISTURE_SERIES: &str = "soil_moisture_vwc";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("Postcode not recognised: {0}")]
    UnknownPostcode(String),

    #[error("Malformed response from {service}: {reason}")]
    Malformed { service: &'static str, reason: String },

    #[error("No COSMOS-UK station within {max_km:.0} km of {location}")]
    NoNearbyStation { location: Location, max_km: f64 },

    #[error("Environmental file: {0}")]
    Ingest(#[from] IngestError),

    #[error("Environmental file: {0}")]
    Alignment(#[from] AlignmentError),

    #[error("{0} file has no numeric column")]
    NoNumericColumn(&'static str),
}

/// WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, postcode: &str) -> Result<Location, WeatherError>;
}

#[async_trait]
pub trait PrecipitationSource: Send + Sync {
    /// Daily precipitation (mm) for `start..=end`.
    async fn daily_precipitation(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<EnvironmentalSeries, WeatherError>;
}

#[async_trait]
pub trait SoilMoistureSource: Send + Sync {
    /// Daily volumetric soil water content (%) for `start..=end`.
    async fn daily_soil_moisture(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<EnvironmentalSeries, WeatherError>;
}

/// Geocode `postcode` and fetch its daily rainfall over `start..=end`.
pub async fn rainfall_for_postcode(
    geocoder: &dyn Geocoder,
    source: &dyn PrecipitationSource,
    postcode: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<EnvironmentalSeries, WeatherError> {
    let location = geocoder.locate(postcode).await?;
    info!(postcode, location = %location, "Postcode located");
    let series = source.daily_precipitation(&location, start, end).await?;
    info!(
        days = series.series.len(),
        start = %start,
        end = %end,
        "Daily precipitation retrieved"
    );
    Ok(series)
}

/// Geocode `postcode` and fetch its daily soil moisture over `start..=end`.
pub async fn soil_moisture_for_postcode(
    geocoder: &dyn Geocoder,
    source: &dyn SoilMoistureSource,
    postcode: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<EnvironmentalSeries, WeatherError> {
    let location = geocoder.locate(postcode).await?;
    info!(postcode, location = %location, "Postcode located");
    let series = source.daily_soil_moisture(&location, start, end).await?;
    info!(
        days = series.series.len(),
        start = %start,
        end = %end,
        "Daily soil moisture retrieved"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeSeries;

    struct FixedGeocoder;

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn locate(&self, postcode: &str) -> Result<Location, WeatherError> {
            if postcode == "SW1A 1AA" {
                Ok(Location { latitude: 51.501, longitude: -0.1416 })
            } else {
                Err(WeatherError::UnknownPostcode(postcode.to_string()))
            }
        }
    }

    struct DryWeather;

    #[async_trait]
    impl PrecipitationSource for DryWeather {
        async fn daily_precipitation(
            &self,
            _location: &Location,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<EnvironmentalSeries, WeatherError> {
            let days = start
                .iter_days()
                .take_while(|d| *d <= end)
                .map(|d| (d.and_hms_opt(0, 0, 0).unwrap_or_default(), Some(0.0)));
            let series = TimeSeries::from_pairs(days).map_err(|e| WeatherError::Malformed {
                service: "test",
                reason: e.to_string(),
            })?;
            Ok(EnvironmentalSeries::new(PRECIPITATION_SERIES, series))
        }
    }

    struct WetSoil;

    #[async_trait]
    impl SoilMoistureSource for WetSoil {
        async fn daily_soil_moisture(
            &self,
            location: &Location,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<EnvironmentalSeries, WeatherError> {
            if location.latitude > 55.0 {
                return Err(WeatherError::NoNearbyStation {
                    location: *location,
                    max_km: 40.0,
                });
            }
            let t = start.and_hms_opt(0, 0, 0).unwrap_or_default();
            let series = TimeSeries::from_pairs(vec![(t, Some(38.5))]).map_err(|e| {
                WeatherError::Malformed {
                    service: "test",
                    reason: e.to_string(),
                }
            })?;
            Ok(EnvironmentalSeries::new(SOIL_MOISTURE_SERIES, series))
        }
    }

    #[tokio::test]
    async fn test_soil_moisture_for_postcode() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let series = soil_moisture_for_postcode(&FixedGeocoder, &WetSoil, "SW1A 1AA", day, day)
            .await
            .unwrap();
        assert_eq!(series.name, SOIL_MOISTURE_SERIES);
        assert_eq!(series.series.values(), &[Some(38.5)]);
    }

    #[test]
    fn test_no_station_message_names_radius() {
        let err = WeatherError::NoNearbyStation {
            location: Location { latitude: 57.0, longitude: -4.0 },
            max_km: 40.0,
        };
        assert_eq!(
            err.to_string(),
            "No COSMOS-UK station within 40 km of 57.0000, -4.0000"
        );
    }

    #[tokio::test]
    async fn test_rainfall_for_postcode() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let series = rainfall_for_postcode(&FixedGeocoder, &DryWeather, "SW1A 1AA", start, end)
            .await
            .unwrap();
        assert_eq!(series.series.len(), 10);
    }

    #[tokio::test]
    async fn test_unknown_postcode_propagates() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = rainfall_for_postcode(&FixedGeocoder, &DryWeather, "ZZ9 9ZZ", day, day)
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::UnknownPostcode(_)));
    }
}
