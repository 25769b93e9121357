//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for AnalysisConfig.
///
/// Maintained by hand to match the struct hierarchy in analysis_config.rs.
/// Any new field added to AnalysisConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [survey]
        "survey",
        "survey.name",
        "survey.client",
        "survey.address",
        "survey.postcode",
        // [alignment]
        "alignment",
        "alignment.min_time_parse_ratio",
        "alignment.duplicate_timestamps",
        // [environment]
        "environment",
        "environment.resample",
        "environment.missing_fill",
        // [decomposition]
        "decomposition",
        "decomposition.seasonal_window",
        // [classification]
        "classification",
        "classification.min_defined_points",
        "classification.rain_correlation_cutoff",
        "classification.summer_months",
        "classification.winter_months",
        // [trend]
        "trend",
        "trend.weak_below",
        "trend.moderate_below",
        "trend.significance_level",
        // [weather]
        "weather",
        "weather.geocoder_url",
        "weather.archive_url",
        "weather.soil_moisture_url",
        "weather.soil_station_max_km",
        "weather.timeout_secs",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the alphabetically first key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut candidates: Vec<&str> = known.iter().copied().collect();
    candidates.sort_unstable();

    let mut best: Option<(&str, usize)> = None;
    for k in candidates {
        let dist = levenshtein(unknown, k);
        if dist <= 3 && best.map_or(true, |(_, best_dist)| dist < best_dist) {
            best = Some((k, dist));
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate cross-field and plausibility ranges on a parsed AnalysisConfig.
///
/// Returns (errors, warnings). Errors are contradictory settings that must
/// prevent the run; warnings are suspicious but not fatal.
pub fn validate_ranges(config: &super::AnalysisConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let c = &config.classification;

    // A month cannot be both summer and winter
    let overlap: Vec<u32> = c
        .summer_months
        .iter()
        .filter(|m| c.winter_months.contains(m))
        .copied()
        .collect();
    if !overlap.is_empty() {
        errors.push(format!(
            "classification: months {overlap:?} appear in both summer_months and winter_months"
        ));
    }

    // Positive cutoff no longer demands anti-correlation
    if c.rain_correlation_cutoff > 0.0 {
        warnings.push(ValidationWarning {
            field: "classification.rain_correlation_cutoff".to_string(),
            message: format!(
                "rain_correlation_cutoff = {:.2} is positive; seasonal movement is normally anti-correlated with cumulative rainfall",
                c.rain_correlation_cutoff
            ),
            suggestion: None,
        });
    }

    // Window: 7 samples to a year of daily readings covers sensible smoothing
    let w = config.decomposition.seasonal_window;
    if w > 0 && !(7..=366).contains(&w) {
        warnings.push(ValidationWarning {
            field: "decomposition.seasonal_window".to_string(),
            message: format!("seasonal_window = {w} is outside typical range (7-366 samples)"),
            suggestion: None,
        });
    }

    let ratio = config.alignment.min_time_parse_ratio;
    if ratio > 0.0 && ratio < 0.5 {
        warnings.push(ValidationWarning {
            field: "alignment.min_time_parse_ratio".to_string(),
            message: format!(
                "min_time_parse_ratio = {ratio:.2} accepts columns where most cells are not dates"
            ),
            suggestion: None,
        });
    }

    if config.weather.soil_station_max_km > 100.0 {
        warnings.push(ValidationWarning {
            field: "weather.soil_station_max_km".to_string(),
            message: format!(
                "soil_station_max_km = {:.0} admits stations on different soils and rainfall",
                config.weather.soil_station_max_km
            ),
            suggestion: None,
        });
    }

    if config.weather.timeout_secs > 120 {
        warnings.push(ValidationWarning {
            field: "weather.timeout_secs".to_string(),
            message: format!(
                "timeout_secs = {} is long; a stalled weather lookup delays the whole run",
                config.weather.timeout_secs
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("window", "window"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("seasonl_window", "seasonal_window"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [trend]
            weak_below = 0.3
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"trend".to_string()));
        assert!(keys.contains(&"trend.weak_below".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[decomposition]
seasonl_window = 30
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("decomposition.seasonal_window")
        );
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_clean() {
        let (errors, warnings) = validate_ranges(&AnalysisConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_overlapping_months_is_error() {
        let mut config = AnalysisConfig::default();
        config.classification.winter_months = vec![8, 12, 1];
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("[8]")));
    }

    #[test]
    fn test_positive_cutoff_warns() {
        let mut config = AnalysisConfig::default();
        config.classification.rain_correlation_cutoff = 0.2;
        let (_, warnings) = validate_ranges(&config);
        assert!(warnings.iter().any(|w| w.field.contains("rain_correlation_cutoff")));
    }
}
