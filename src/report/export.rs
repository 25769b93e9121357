//! JSON export for charting and downstream typesetting

use serde::{Deserialize, Serialize};

use crate::config::SurveyInfo;
use crate::types::{AnalysisReport, ClassificationRecord, SensorFailure, Timestamp};

/// Per-sensor chart payload. All series share `timeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorExport {
    pub sensor_name: String,
    pub timeline: Vec<Timestamp>,
    pub original: Vec<Option<f64>>,
    pub thermal: Vec<Option<f64>>,
    pub seasonal: Vec<Option<f64>>,
    pub progressive: Vec<Option<f64>>,
    pub classification: ClassificationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentExport {
    pub timeline: Vec<Timestamp>,
    pub precipitation_mm: Vec<Option<f64>>,
    pub cumulative_mm: Vec<Option<f64>>,
}

/// Series the thermal component was fitted against, on `timeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovariateExport {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportExport {
    pub survey: SurveyInfo,
    pub sensors: Vec<SensorExport>,
    pub environment: Option<EnvironmentExport>,
    pub thermal_covariate: Option<CovariateExport>,
    pub failures: Vec<SensorFailure>,
}

impl ReportExport {
    pub fn from_report(survey: &SurveyInfo, report: &AnalysisReport) -> Self {
        let sensors = report
            .sensors
            .iter()
            .map(|s| {
                let d = &s.decomposition;
                SensorExport {
                    sensor_name: s.sensor_name.clone(),
                    timeline: report.timeline.clone(),
                    original: d.original.values().to_vec(),
                    thermal: d.thermal.values().to_vec(),
                    seasonal: d.seasonal.values().to_vec(),
                    progressive: d.progressive.values().to_vec(),
                    classification: s.classification.clone(),
                }
            })
            .collect();

        let environment = match (&report.environment, &report.cumulative_rainfall) {
            (Some(env), Some(cumulative)) => Some(EnvironmentExport {
                timeline: report.timeline.clone(),
                precipitation_mm: env.values().to_vec(),
                cumulative_mm: cumulative.values().to_vec(),
            }),
            _ => None,
        };

        let thermal_covariate = report.thermal_covariate.as_ref().map(|c| CovariateExport {
            name: c.name.clone(),
            values: c.series.values().to_vec(),
        });

        Self {
            survey: survey.clone(),
            sensors,
            environment,
            thermal_covariate,
            failures: report.failures.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MovementAnalyzer;
    use crate::config::AnalysisConfig;
    use crate::types::{AlignedDataset, EnvironmentalSeries, TimeSeries};
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_export_shape() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timeline: Vec<_> = (0..6).map(|i| start + Duration::days(i)).collect();
        let dataset = AlignedDataset::new(
            timeline.clone(),
            vec![("Crack 1".to_string(), vec![Some(0.1), None, Some(0.3), Some(0.2), Some(0.5), Some(0.6)])],
        )
        .unwrap();
        let rain = EnvironmentalSeries::new(
            "precipitation_mm",
            TimeSeries::new(timeline, vec![Some(1.0); 6]).unwrap(),
        );
        let report = MovementAnalyzer::new(&AnalysisConfig::default()).analyze(&dataset, Some(&rain));
        let export = ReportExport::from_report(&SurveyInfo::default(), &report);

        let sensor = &export.sensors[0];
        assert_eq!(sensor.timeline.len(), 6);
        assert_eq!(sensor.original[1], None);
        assert_eq!(sensor.thermal.len(), 6);
        let env = export.environment.as_ref().unwrap();
        assert_eq!(env.cumulative_mm.last(), Some(&Some(6.0)));

        let json = export.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["sensors"][0]["sensor_name"], "Crack 1");
        assert_eq!(value["sensors"][0]["original"][1], serde_json::Value::Null);
        assert!(value["sensors"][0]["classification"]["movement_type"].is_string());
        assert_eq!(value["thermal_covariate"]["name"], "precipitation_mm");
        assert!(value["sensors"][0]["classification"]["evidence"]["trend"]["significant"].is_boolean());
    }

    #[test]
    fn test_export_names_soil_covariate() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timeline: Vec<_> = (0..4).map(|i| start + Duration::days(i)).collect();
        let dataset = AlignedDataset::new(
            timeline.clone(),
            vec![("Crack 1".to_string(), vec![Some(0.1), Some(0.2), Some(0.2), Some(0.4)])],
        )
        .unwrap();
        let soil = EnvironmentalSeries::new(
            "soil_moisture_vwc",
            TimeSeries::new(timeline, vec![Some(30.0), Some(31.0), None, Some(33.0)]).unwrap(),
        );
        let report = MovementAnalyzer::new(&AnalysisConfig::default())
            .analyze_with_covariate(&dataset, None, Some(&soil));
        let export = ReportExport::from_report(&SurveyInfo::default(), &report);
        assert!(export.environment.is_none());
        let covariate = export.thermal_covariate.unwrap();
        assert_eq!(covariate.name, "soil_moisture_vwc");
        // a soil moisture gap is not zero moisture
        assert_eq!(covariate.values, vec![Some(30.0), Some(31.0), None, Some(33.0)]);
    }
}
