//! Movement Classifier
//!
//! An ordered list of rules, evaluated first-match-wins:
//!
//! 1. `seasonal`: cumulative-rainfall correlation below the cutoff and the
//!    summer mean exceeding the winter mean by more than one std
//! 2. `progressive`: net change (last - first) exceeding one std
//! 3. `none`: everything else
//!
//! Series with too few defined points short-circuit to `none`/`insufficient`
//! before any rule runs. The rain correlation is reported on every record.

use chrono::Datelike;
use tracing::debug;

use crate::config::ClassificationConfig;
use crate::types::{
    ClassificationEvidence, ClassificationRecord, DecomposedSignal, MovementType, Strength,
    TimeSeries, TrendAssessment,
};

use super::correlations::CorrelationEngine;
use super::stats::{mean, std_dev};

/// Statistics shared by every rule for one sensor.
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    pub series: &'a TimeSeries,
    pub std_dev: f64,
    pub net_change: f64,
    pub seasonal_differential: Option<f64>,
    pub rain_correlation: Option<f64>,
    pub trend: Option<&'a TrendAssessment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub movement_type: MovementType,
    pub strength: Strength,
    pub note: String,
}

/// A named predicate producing an outcome when it matches.
#[derive(Clone, Copy)]
pub struct ClassificationRule {
    pub name: &'static str,
    pub evaluate: fn(&RuleContext<'_>, &ClassificationConfig) -> Option<RuleOutcome>,
}

impl std::fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationRule").field("name", &self.name).finish()
    }
}

// ============================================================================
// Rules
// ============================================================================

pub const SEASONAL_RULE: ClassificationRule = ClassificationRule {
    name: "seasonal",
    evaluate: seasonal_rule,
};

pub const PROGRESSIVE_RULE: ClassificationRule = ClassificationRule {
    name: "progressive",
    evaluate: progressive_rule,
};

pub const NONE_RULE: ClassificationRule = ClassificationRule {
    name: "none",
    evaluate: none_rule,
};

/// Rules in precedence order.
pub fn default_rules() -> Vec<ClassificationRule> {
    vec![SEASONAL_RULE, PROGRESSIVE_RULE, NONE_RULE]
}

fn seasonal_rule(ctx: &RuleContext<'_>, config: &ClassificationConfig) -> Option<RuleOutcome> {
    let r = ctx.rain_correlation?;
    let differential = ctx.seasonal_differential?;
    if r < config.rain_correlation_cutoff && differential > ctx.std_dev {
        Some(RuleOutcome {
            movement_type: MovementType::Seasonal,
            strength: Strength::Strong,
            note: "Clay shrink/swell: cumulative rainfall anti-correlated with movement".to_string(),
        })
    } else {
        None
    }
}

fn progressive_rule(ctx: &RuleContext<'_>, _config: &ClassificationConfig) -> Option<RuleOutcome> {
    if ctx.net_change.abs() <= ctx.std_dev {
        return None;
    }
    let mut note = format!(
        "Net drift of {:+.3} exceeds one standard deviation ({:.3})",
        ctx.net_change, ctx.std_dev
    );
    if let Some(p) = ctx.trend.and_then(|t| t.p_value) {
        note.push_str(&format!("; trend slope p = {p:.3}"));
    }
    Some(RuleOutcome {
        movement_type: MovementType::Progressive,
        strength: Strength::Strong,
        note,
    })
}

fn none_rule(_ctx: &RuleContext<'_>, _config: &ClassificationConfig) -> Option<RuleOutcome> {
    Some(RuleOutcome {
        movement_type: MovementType::None,
        strength: Strength::Weak,
        note: "No drift or rainfall-linked cycle beyond normal scatter".to_string(),
    })
}

// ============================================================================
// Classifier
// ============================================================================

#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassificationConfig,
    rules: Vec<ClassificationRule>,
}

impl Classifier {
    pub fn new(config: &ClassificationConfig) -> Self {
        Self::with_rules(config, default_rules())
    }

    pub fn with_rules(config: &ClassificationConfig, rules: Vec<ClassificationRule>) -> Self {
        Self {
            config: config.clone(),
            rules,
        }
    }

    /// Classify a decomposed sensor. `cumulative_rainfall` is the running sum
    /// of rainfall aligned to the sensor timeline.
    pub fn classify(
        &self,
        signal: &DecomposedSignal,
        cumulative_rainfall: Option<&TimeSeries>,
        trend: Option<&TrendAssessment>,
    ) -> ClassificationRecord {
        let series = &signal.original;
        let defined = series.defined_values();
        let rain_correlation =
            cumulative_rainfall.and_then(|rain| CorrelationEngine::pearson(series, rain));

        let std = std_dev(&defined);
        let net_change = match (series.first_defined(), series.last_defined()) {
            (Some((_, first)), Some((_, last))) => Some(last - first),
            _ => None,
        };
        let seasonal_differential = self.seasonal_differential(series);

        let mut evidence = ClassificationEvidence {
            defined_points: defined.len(),
            std_dev: std,
            net_change,
            seasonal_differential,
            rule: String::new(),
            trend: trend.copied(),
        };

        let (std, net_change) = match (std, net_change) {
            (Some(s), Some(n)) if defined.len() >= self.config.min_defined_points => (s, n),
            _ => {
                evidence.rule = "insufficient_data".to_string();
                return ClassificationRecord {
                    sensor_name: signal.sensor_name.clone(),
                    movement_type: MovementType::None,
                    strength: Strength::Insufficient,
                    supporting_note: format!(
                        "Only {} readings; at least {} needed to classify",
                        defined.len(),
                        self.config.min_defined_points
                    ),
                    rain_correlation,
                    evidence,
                };
            }
        };

        let ctx = RuleContext {
            series,
            std_dev: std,
            net_change,
            seasonal_differential,
            rain_correlation,
            trend,
        };

        let matched = self
            .rules
            .iter()
            .find_map(|rule| (rule.evaluate)(&ctx, &self.config).map(|o| (rule.name, o)));
        let (rule_name, outcome) = matched.unwrap_or_else(|| ("none", none_outcome()));

        debug!(
            sensor = %signal.sensor_name,
            rule = rule_name,
            movement = %outcome.movement_type,
            "Sensor classified"
        );

        evidence.rule = rule_name.to_string();
        ClassificationRecord {
            sensor_name: signal.sensor_name.clone(),
            movement_type: outcome.movement_type,
            strength: outcome.strength,
            supporting_note: outcome.note,
            rain_correlation,
            evidence,
        }
    }

    /// Summer mean minus winter mean, `None` when either season has no data.
    pub fn seasonal_differential(&self, series: &TimeSeries) -> Option<f64> {
        let in_months = |months: &[u32]| -> Vec<f64> {
            series
                .iter()
                .filter(|(t, _)| months.contains(&t.month()))
                .filter_map(|(_, v)| v)
                .collect()
        };
        let summer = mean(&in_months(&self.config.summer_months))?;
        let winter = mean(&in_months(&self.config.winter_months))?;
        Some(summer - winter)
    }
}

/// Fallback when a custom rule list has no catch-all.
fn none_outcome() -> RuleOutcome {
    RuleOutcome {
        movement_type: MovementType::None,
        strength: Strength::Weak,
        note: "No classification rule matched".to_string(),
    }
}
