//! Rainfall and soil moisture from local CSVs (date column plus numeric
//! columns)
//!
//! Used when the site has its own gauge or moisture sensor, or the online services are
//! unreachable. Files go through the same ingestion and time alignment as
//! survey data.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

use super::{
    Location, PrecipitationSource, SoilMoistureSource, WeatherError, PRECIPITATION_SERIES,
    SOIL_MOISTURE_SERIES,
};
use crate::alignment::{TimeAligner, TimeColumn};
use crate::config::AlignmentConfig;
use crate::ingest::RawTable;
use crate::types::{EnvironmentalSeries, TimeSeries};

const RAIN_KEYWORDS: &[&str] = &["rain", "precip"];
const SOIL_KEYWORDS: &[&str] = &["soil", "moisture", "vwc"];

/// One numeric column of a dated file.
#[derive(Debug, Clone)]
struct DailyFile {
    series: TimeSeries,
}

impl DailyFile {
    fn load(
        path: &Path,
        alignment: &AlignmentConfig,
        keywords: &[&str],
        kind: &'static str,
    ) -> Result<Self, WeatherError> {
        let table = RawTable::from_path(path)?;
        let file = Self::from_table(&table, alignment, keywords, kind)?;
        info!(
            path = %path.display(),
            kind,
            days = file.series.len(),
            "Environmental file loaded"
        );
        Ok(file)
    }

    /// First column whose name contains a keyword, else the first numeric
    /// column.
    fn from_table(
        table: &RawTable,
        alignment: &AlignmentConfig,
        keywords: &[&str],
        kind: &'static str,
    ) -> Result<Self, WeatherError> {
        let dataset = TimeAligner::new(alignment).align(table, &TimeColumn::AutoDetect, None)?;
        let chosen = dataset
            .sensors()
            .iter()
            .find(|s| {
                let name = s.name.to_ascii_lowercase();
                keywords.iter().any(|k| name.contains(k))
            })
            .or_else(|| dataset.sensors().first())
            .ok_or(WeatherError::NoNumericColumn(kind))?;
        Ok(Self {
            series: chosen.series.clone(),
        })
    }

    fn window(&self, start: NaiveDate, end: NaiveDate) -> TimeSeries {
        let pairs = self
            .series
            .iter()
            .filter(|(t, _)| (start..=end).contains(&t.date()));
        // a filtered ordered series stays ordered
        TimeSeries::from_pairs(pairs).unwrap_or_else(|_| self.series.clone())
    }
}

// ============================================================================
// Rainfall
// ============================================================================

#[derive(Debug, Clone)]
pub struct CsvPrecipitationSource {
    file: DailyFile,
}

impl CsvPrecipitationSource {
    pub fn from_path(path: impl AsRef<Path>, alignment: &AlignmentConfig) -> Result<Self, WeatherError> {
        let file = DailyFile::load(path.as_ref(), alignment, RAIN_KEYWORDS, "Rainfall")?;
        Ok(Self { file })
    }

    /// Picks the column whose name mentions rain or precipitation, else the
    /// first numeric column.
    pub fn from_table(table: &RawTable, alignment: &AlignmentConfig) -> Result<Self, WeatherError> {
        let file = DailyFile::from_table(table, alignment, RAIN_KEYWORDS, "Rainfall")?;
        Ok(Self { file })
    }

    /// Samples whose date falls in `start..=end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> TimeSeries {
        self.file.window(start, end)
    }
}

#[async_trait]
impl PrecipitationSource for CsvPrecipitationSource {
    async fn daily_precipitation(
        &self,
        _location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<EnvironmentalSeries, WeatherError> {
        Ok(EnvironmentalSeries::new(PRECIPITATION_SERIES, self.window(start, end)))
    }
}

// ============================================================================
// Soil Moisture
// ============================================================================

#[derive(Debug, Clone)]
pub struct CsvSoilMoistureSource {
    file: DailyFile,
}

impl CsvSoilMoistureSource {
    pub fn from_path(path: impl AsRef<Path>, alignment: &AlignmentConfig) -> Result<Self, WeatherError> {
        let file = DailyFile::load(path.as_ref(), alignment, SOIL_KEYWORDS, "Soil moisture")?;
        Ok(Self { file })
    }

    /// Picks the column whose name mentions soil, moisture or VWC, else the
    /// first numeric column.
    pub fn from_table(table: &RawTable, alignment: &AlignmentConfig) -> Result<Self, WeatherError> {
        let file = DailyFile::from_table(table, alignment, SOIL_KEYWORDS, "Soil moisture")?;
        Ok(Self { file })
    }

    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> TimeSeries {
        self.file.window(start, end)
    }
}

#[async_trait]
impl SoilMoistureSource for CsvSoilMoistureSource {
    async fn daily_soil_moisture(
        &self,
        _location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<EnvironmentalSeries, WeatherError> {
        Ok(EnvironmentalSeries::new(SOIL_MOISTURE_SERIES, self.window(start, end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        RawTable::from_text_columns(vec![
            ("Date", vec!["01/01/2024", "02/01/2024", "03/01/2024"]),
            ("Station", vec!["7", "7", "7"]),
            ("Rainfall (mm)", vec!["1.0", "", "2.5"]),
            ("Soil VWC (%)", vec!["41.2", "40.8", "42.0"]),
        ])
    }

    #[test]
    fn test_prefers_rain_named_column() {
        let source = CsvPrecipitationSource::from_table(&table(), &AlignmentConfig::default()).unwrap();
        assert_eq!(source.file.series.values(), &[Some(1.0), None, Some(2.5)]);
    }

    #[test]
    fn test_prefers_soil_named_column() {
        let source = CsvSoilMoistureSource::from_table(&table(), &AlignmentConfig::default()).unwrap();
        assert_eq!(source.file.series.values(), &[Some(41.2), Some(40.8), Some(42.0)]);
    }

    #[test]
    fn test_window_is_inclusive() {
        let source = CsvPrecipitationSource::from_table(&table(), &AlignmentConfig::default()).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(source.window(start, end).values(), &[None, Some(2.5)]);
    }

    #[tokio::test]
    async fn test_soil_file_series_is_named() {
        let source = CsvSoilMoistureSource::from_table(&table(), &AlignmentConfig::default()).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let here = Location { latitude: 51.5, longitude: -0.1 };
        let env = source.daily_soil_moisture(&here, day, day).await.unwrap();
        assert_eq!(env.name, SOIL_MOISTURE_SERIES);
        assert_eq!(env.series.values(), &[Some(40.8)]);
    }

    #[test]
    fn test_no_numeric_column() {
        let table = RawTable::from_text_columns(vec![
            ("Date", vec!["01/01/2024"]),
            ("Note", vec!["dry"]),
        ]);
        assert!(matches!(
            CsvPrecipitationSource::from_table(&table, &AlignmentConfig::default()),
            Err(WeatherError::NoNumericColumn("Rainfall"))
        ));
        assert!(matches!(
            CsvSoilMoistureSource::from_table(&table, &AlignmentConfig::default()),
            Err(WeatherError::NoNumericColumn("Soil moisture"))
        ));
    }
}
