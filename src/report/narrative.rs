//! Template-based narrative report for one analysis run

use crate::config::SurveyInfo;
use crate::types::{AnalysisReport, MovementType, SensorAnalysis, ThermalStatus};
use crate::weather::{PRECIPITATION_SERIES, SOIL_MOISTURE_SERIES};

/// Generate a markdown report from the structured results.
///
/// Produces sections: Survey, Data Coverage, Sensor Findings, Sensors Not
/// Analysed (when any failed) and Interpretation.
pub fn generate_narrative(survey: &SurveyInfo, report: &AnalysisReport) -> String {
    let mut sections = Vec::new();

    // 1. Survey header
    let mut header = vec![format!("# Movement Analysis: {}", display_or(&survey.name, "Unnamed survey"))];
    if !survey.client.is_empty() {
        header.push(format!("- **Client**: {}", survey.client));
    }
    if !survey.address.is_empty() {
        header.push(format!("- **Address**: {}", survey.address));
    }
    if !survey.postcode.is_empty() {
        header.push(format!("- **Postcode**: {}", survey.postcode));
    }
    sections.push(header.join("\n"));

    // 2. Coverage
    let range = match (report.timeline.first(), report.timeline.last()) {
        (Some(first), Some(last)) => format!(
            "{} to {}",
            first.format("%d/%m/%Y"),
            last.format("%d/%m/%Y")
        ),
        _ => "no readings".to_string(),
    };
    let rainfall = match &report.cumulative_rainfall {
        Some(cumulative) => {
            let total = cumulative.last_defined().map_or(0.0, |(_, v)| v);
            format!("available ({total:.1} mm over the survey period)")
        }
        None => "unavailable (rainfall-dependent checks skipped)".to_string(),
    };
    let covariate = report
        .thermal_covariate
        .as_ref()
        .map_or("none (thermal component not fitted)", |c| covariate_label(&c.name));
    sections.push(format!(
        "## Data Coverage\n\n\
         - **Readings**: {} rows, {}\n\
         - **Sensors**: {} analysed, {} not analysed\n\
         - **Rainfall**: {}\n\
         - **Thermal covariate**: {}",
        report.timeline.len(),
        range,
        report.sensors.len(),
        report.failures.len(),
        rainfall,
        covariate,
    ));

    // 3. Per-sensor findings
    if !report.sensors.is_empty() {
        let mut lines = vec!["## Sensor Findings\n".to_string()];
        let unit = report
            .thermal_covariate
            .as_ref()
            .map_or("unit", |c| covariate_unit(&c.name));
        for sensor in &report.sensors {
            lines.push(sensor_block(sensor, unit));
        }
        sections.push(lines.join("\n"));
    }

    // 4. Failures
    if !report.failures.is_empty() {
        let mut lines = vec!["## Sensors Not Analysed\n".to_string()];
        for failure in &report.failures {
            lines.push(format!("- **{}**: {}", failure.sensor_name, failure.reason));
        }
        sections.push(lines.join("\n"));
    }

    // 5. Interpretation of the movement types that occurred
    let mut notes = vec!["## Interpretation\n".to_string()];
    let present = |t: MovementType| {
        report
            .sensors
            .iter()
            .any(|s| s.classification.movement_type == t)
    };
    if present(MovementType::Seasonal) {
        notes.push(
            "- **Seasonal**: movement follows soil moisture. Cracks open as clay \
             shrinks in dry months and close as it swells after rain. Typical of \
             shallow foundations on shrinkable clay, often worsened by nearby trees."
                .to_string(),
        );
    }
    if present(MovementType::Progressive) {
        notes.push(
            "- **Progressive**: net movement in one direction beyond normal scatter. \
             Continued monitoring is recommended to confirm whether the rate is \
             steady, slowing or accelerating."
                .to_string(),
        );
    }
    if present(MovementType::None) {
        notes.push(
            "- **None**: no significant pattern over the monitoring period."
                .to_string(),
        );
    }
    notes.push(
        "\nTrend slopes are measured per reading, not per day; irregular \
         reading intervals distort them."
            .to_string(),
    );
    sections.push(notes.join("\n"));

    sections.join("\n\n")
}

fn sensor_block(sensor: &SensorAnalysis, covariate_unit: &str) -> String {
    let record = &sensor.classification;
    let evidence = &record.evidence;
    let mut lines = vec![format!(
        "### {}\n\n**{}** movement, strength **{}**. {}.",
        sensor.sensor_name, record.movement_type, record.strength, record.supporting_note
    )];

    lines.push(format!(
        "- Readings: {}; std {}; net change {}",
        evidence.defined_points,
        fmt_opt(evidence.std_dev),
        fmt_signed(evidence.net_change),
    ));
    lines.push(format!(
        "- Summer minus winter mean: {}",
        fmt_signed(evidence.seasonal_differential)
    ));
    lines.push(format!(
        "- Correlation with cumulative rainfall: {}",
        record.rain_correlation_display()
    ));

    let trend = &sensor.trend;
    let p = trend
        .p_value
        .map_or_else(|| "n/a".to_string(), |p| format!("{p:.3}"));
    let verdict = if trend.significant { "significant" } else { "not significant" };
    lines.push(format!(
        "- Trend: {:+.4} per reading ({}, p = {}, {} at α = {})",
        trend.slope_per_sample, trend.strength, p, verdict, trend.significance_level
    ));

    if let Some(rate) = &sensor.rate_correlation {
        lines.push(format!(
            "- Movement rate vs daily rainfall: r = {:.2} (p = {:.3}, n = {})",
            rate.r_value, rate.p_value, rate.sample_count
        ));
    }

    lines.push(match sensor.decomposition.thermal_status {
        ThermalStatus::Fitted(fit) => format!(
            "- Environmental fit: {:+.4} per {}, intercept {:+.4}, {} paired readings",
            fit.slope, covariate_unit, fit.intercept, fit.sample_count
        ),
        ThermalStatus::NoCovariate => "- Environmental fit: no covariate series".to_string(),
        ThermalStatus::InsufficientCoverage { paired_points } => format!(
            "- Environmental fit: skipped ({paired_points} paired readings)"
        ),
    });

    lines.join("\n")
}

fn covariate_label(name: &str) -> &str {
    match name {
        PRECIPITATION_SERIES => "daily rainfall",
        SOIL_MOISTURE_SERIES => "soil moisture (COSMOS-UK volumetric water content)",
        other => other,
    }
}

fn covariate_unit(name: &str) -> &str {
    match name {
        PRECIPITATION_SERIES => "mm",
        SOIL_MOISTURE_SERIES => "% VWC",
        _ => "unit",
    }
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

fn fmt_signed(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.3}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MovementAnalyzer;
    use crate::config::AnalysisConfig;
    use crate::types::{AlignedDataset, EnvironmentalSeries, TimeSeries};
    use chrono::{Duration, NaiveDate};

    fn report() -> AnalysisReport {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timeline = (0..10).map(|i| start + Duration::days(i)).collect();
        let dataset = AlignedDataset::new(
            timeline,
            vec![
                ("Crack 1".to_string(), (0..10).map(|i| Some(f64::from(i))).collect()),
                ("Dead".to_string(), vec![None; 10]),
            ],
        )
        .unwrap();
        MovementAnalyzer::new(&AnalysisConfig::default()).analyze(&dataset, None)
    }

    #[test]
    fn test_narrative_sections() {
        let survey = SurveyInfo {
            name: "12 Acacia Avenue".to_string(),
            ..SurveyInfo::default()
        };
        let text = generate_narrative(&survey, &report());
        assert!(text.starts_with("# Movement Analysis: 12 Acacia Avenue"));
        assert!(text.contains("## Data Coverage"));
        assert!(text.contains("01/03/2024 to 10/03/2024"));
        assert!(text.contains("### Crack 1"));
        assert!(text.contains("**Progressive** movement"));
        assert!(text.contains("Correlation with cumulative rainfall: n/a"));
        assert!(text.contains("## Sensors Not Analysed"));
        assert!(text.contains("- **Dead**: no numeric readings"));
        assert!(text.contains("unavailable"));
    }

    #[test]
    fn test_trend_significance_statement() {
        let text = generate_narrative(&SurveyInfo::default(), &report());
        // exact ramp: p = 0
        assert!(text.contains("p = 0.000, significant at α = 0.05)"), "{text}");

        let mut config = AnalysisConfig::default();
        config.trend.significance_level = 0.01;
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let dataset = AlignedDataset::new(
            (0..10).map(|i| start + Duration::days(i)).collect(),
            vec![("Flat".to_string(), vec![Some(0.1); 10])],
        )
        .unwrap();
        let flat = MovementAnalyzer::new(&config).analyze(&dataset, None);
        let text = generate_narrative(&SurveyInfo::default(), &flat);
        assert!(text.contains("p = 1.000, not significant at α = 0.01)"), "{text}");
    }

    #[test]
    fn test_soil_moisture_fit_is_labelled() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timeline: Vec<_> = (0..10).map(|i| start + Duration::days(i)).collect();
        let moisture: Vec<Option<f64>> = (0..10).map(|i| Some(35.0 + f64::from(i % 4))).collect();
        let dataset = AlignedDataset::new(
            timeline.clone(),
            vec![("Crack 1".to_string(), moisture.iter().map(|m| m.map(|m| m / 10.0)).collect())],
        )
        .unwrap();
        let soil = EnvironmentalSeries::new(
            SOIL_MOISTURE_SERIES,
            TimeSeries::new(timeline, moisture).unwrap(),
        );
        let report = MovementAnalyzer::new(&AnalysisConfig::default())
            .analyze_with_covariate(&dataset, None, Some(&soil));
        let text = generate_narrative(&SurveyInfo::default(), &report);
        assert!(text.contains("**Thermal covariate**: soil moisture"), "{text}");
        assert!(text.contains("per % VWC"), "{text}");
        assert!(text.contains("unavailable (rainfall-dependent checks skipped)"));
    }

    #[test]
    fn test_unnamed_survey() {
        let text = generate_narrative(&SurveyInfo::default(), &report());
        assert!(text.starts_with("# Movement Analysis: Unnamed survey"));
    }
}
