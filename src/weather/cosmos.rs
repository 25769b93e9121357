//! COSMOS-UK soil moisture: daily `cosmos_vwc` (%) from the station nearest
//! the site
//!
//! `GET {base}/collections/1D/locations` lists stations as GeoJSON points;
//! `GET {base}/collections/1D/locations/{id}` returns CoverageJSON for one.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{Location, SoilMoistureSource, WeatherError, SOIL_MOISTURE_SERIES};
use crate::config::WeatherConfig;
use crate::ingest::parse_datetime;
use crate::types::{EnvironmentalSeries, TimeSeries};

const SERVICE: &str = "COSMOS-UK";
const PARAMETER: &str = "cosmos_vwc";
const EARTH_RADIUS_KM: f64 = 6371.0;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StationCollection {
    features: Vec<StationFeature>,
}

#[derive(Debug, Deserialize)]
struct StationFeature {
    id: String,
    geometry: PointGeometry,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    /// GeoJSON order: longitude, latitude
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoverageBody {
    Collection { coverages: Vec<Coverage> },
    Single(Coverage),
}

#[derive(Debug, Deserialize)]
struct Coverage {
    domain: Domain,
    ranges: HashMap<String, Range>,
}

#[derive(Debug, Deserialize)]
struct Domain {
    axes: Axes,
}

#[derive(Debug, Deserialize)]
struct Axes {
    t: TimeAxis,
}

#[derive(Debug, Deserialize)]
struct TimeAxis {
    values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Range {
    values: Vec<Option<f64>>,
}

/// A COSMOS-UK monitoring site.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub location: Location,
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone)]
pub struct CosmosUkClient {
    http: reqwest::Client,
    base_url: String,
    max_station_km: f64,
}

impl CosmosUkClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.soil_moisture_url.trim_end_matches('/').to_string(),
            max_station_km: config.soil_station_max_km,
        })
    }

    /// Station list from a `locations` body. Features without a usable point
    /// are skipped.
    pub fn parse_stations(body: &str) -> Result<Vec<Station>, WeatherError> {
        let parsed: StationCollection =
            serde_json::from_str(body).map_err(|e| WeatherError::Malformed {
                service: SERVICE,
                reason: e.to_string(),
            })?;
        Ok(parsed
            .features
            .into_iter()
            .filter_map(|f| match f.geometry.coordinates.as_slice() {
                [longitude, latitude, ..] => Some(Station {
                    id: f.id,
                    location: Location {
                        latitude: *latitude,
                        longitude: *longitude,
                    },
                }),
                _ => None,
            })
            .collect())
    }

    /// Closest station to `site` and its distance, if one lies within
    /// `max_km`.
    pub fn nearest_station(
        stations: &[Station],
        site: &Location,
        max_km: f64,
    ) -> Result<(Station, f64), WeatherError> {
        stations
            .iter()
            .map(|s| (s, distance_km(site, &s.location)))
            .filter(|(_, km)| *km <= max_km)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(s, km)| (s.clone(), km))
            .ok_or(WeatherError::NoNearbyStation {
                location: *site,
                max_km,
            })
    }

    /// Daily series from a CoverageJSON body. `null` days stay missing and
    /// negative values (logger fill) are treated as missing.
    pub fn parse_coverage(body: &str) -> Result<EnvironmentalSeries, WeatherError> {
        let malformed = |reason: String| WeatherError::Malformed {
            service: SERVICE,
            reason,
        };
        let parsed: CoverageBody =
            serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
        let coverage = match parsed {
            CoverageBody::Collection { coverages } => coverages
                .into_iter()
                .next()
                .ok_or_else(|| malformed("empty coverage collection".to_string()))?,
            CoverageBody::Single(coverage) => coverage,
        };

        let times = coverage.domain.axes.t.values;
        let mut ranges = coverage.ranges;
        let values = ranges
            .remove(PARAMETER)
            .map(|r| r.values)
            .ok_or_else(|| malformed(format!("no '{PARAMETER}' range")))?;
        if times.len() != values.len() {
            return Err(malformed(format!(
                "{} times but {} {PARAMETER} values",
                times.len(),
                values.len()
            )));
        }

        let mut pairs = Vec::with_capacity(times.len());
        for (raw, value) in times.iter().zip(values) {
            let t = parse_datetime(raw).ok_or_else(|| malformed(format!("bad time '{raw}'")))?;
            let value = value.filter(|v| v.is_finite() && *v >= 0.0);
            pairs.push((t.date().and_time(NaiveTime::MIN), value));
        }
        let series = TimeSeries::from_pairs(pairs).map_err(|e| malformed(e.to_string()))?;
        Ok(EnvironmentalSeries::new(SOIL_MOISTURE_SERIES, series))
    }

    async fn get_body(&self, url: &str, query: &[(&str, String)]) -> Result<String, WeatherError> {
        let resp = self.http.get(url).query(query).send().await?;
        if !resp.status().is_success() {
            return Err(WeatherError::Status {
                service: SERVICE,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl SoilMoistureSource for CosmosUkClient {
    async fn daily_soil_moisture(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<EnvironmentalSeries, WeatherError> {
        let listing = self
            .get_body(&format!("{}/collections/1D/locations", self.base_url), &[])
            .await?;
        let stations = Self::parse_stations(&listing)?;
        let (station, km) = Self::nearest_station(&stations, location, self.max_station_km)?;
        info!(station = %station.id, distance_km = km, "COSMOS-UK station selected");

        debug!(station = %station.id, start = %start, end = %end, "Requesting soil moisture");
        let body = self
            .get_body(
                &format!("{}/collections/1D/locations/{}", self.base_url, station.id),
                &[
                    (
                        "datetime",
                        format!("{}T00:00:00Z/{}T23:59:59Z", start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
                    ),
                    ("parameter-name", PARAMETER.to_string()),
                ],
            )
            .await?;
        Self::parse_coverage(&body)
    }
}

/// Great-circle distance (haversine).
fn distance_km(a: &Location, b: &Location) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "EAST1",
             "geometry": {"type": "Point", "coordinates": [-0.6424, 52.0385]}},
            {"type": "Feature", "id": "WADDN",
             "geometry": {"type": "Point", "coordinates": [-1.0528, 51.8224]}},
            {"type": "Feature", "id": "BROKEN",
             "geometry": {"type": "Point", "coordinates": []}}
        ]
    }"#;

    #[test]
    fn test_parse_stations_skips_bad_geometry() {
        let stations = CosmosUkClient::parse_stations(STATIONS).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].id, "WADDN");
        assert!((stations[1].location.latitude - 51.8224).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_station_within_radius() {
        let stations = CosmosUkClient::parse_stations(STATIONS).unwrap();
        // Aylesbury
        let site = Location { latitude: 51.8156, longitude: -0.8124 };
        let (station, km) = CosmosUkClient::nearest_station(&stations, &site, 40.0).unwrap();
        assert_eq!(station.id, "WADDN");
        assert!((15.0..18.0).contains(&km), "km = {km}");
    }

    #[test]
    fn test_no_station_in_range() {
        let stations = CosmosUkClient::parse_stations(STATIONS).unwrap();
        // Inverness
        let site = Location { latitude: 57.4778, longitude: -4.2247 };
        assert!(matches!(
            CosmosUkClient::nearest_station(&stations, &site, 40.0),
            Err(WeatherError::NoNearbyStation { .. })
        ));
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = Location { latitude: 51.0, longitude: 0.0 };
        let b = Location { latitude: 52.0, longitude: 0.0 };
        assert!((distance_km(&a, &b) - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_parse_coverage_collection() {
        let body = r#"{
            "type": "CoverageCollection",
            "coverages": [{
                "type": "Coverage",
                "domain": {"type": "Domain", "axes": {
                    "t": {"values": ["2024-06-01T00:00:00Z", "2024-06-02T00:00:00Z", "2024-06-03T00:00:00Z"]},
                    "x": {"values": [-1.0528]}, "y": {"values": [51.8224]}
                }},
                "ranges": {"cosmos_vwc": {"type": "NdArray", "values": [34.2, null, -9999.0]}}
            }]
        }"#;
        let env = CosmosUkClient::parse_coverage(body).unwrap();
        assert_eq!(env.name, SOIL_MOISTURE_SERIES);
        assert_eq!(env.series.values(), &[Some(34.2), None, None]);
        assert_eq!(
            env.series.timestamps()[1],
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap().and_time(NaiveTime::MIN)
        );
    }

    #[test]
    fn test_parse_single_coverage() {
        let body = r#"{
            "type": "Coverage",
            "domain": {"axes": {"t": {"values": ["2024-06-01T00:00:00Z"]}}},
            "ranges": {"cosmos_vwc": {"values": [30.0]}}
        }"#;
        let env = CosmosUkClient::parse_coverage(body).unwrap();
        assert_eq!(env.series.values(), &[Some(30.0)]);
    }

    #[test]
    fn test_parse_coverage_without_parameter() {
        let body = r#"{
            "type": "Coverage",
            "domain": {"axes": {"t": {"values": ["2024-06-01T00:00:00Z"]}}},
            "ranges": {"precip": {"values": [1.0]}}
        }"#;
        assert!(matches!(
            CosmosUkClient::parse_coverage(body),
            Err(WeatherError::Malformed { .. })
        ));
    }
}
