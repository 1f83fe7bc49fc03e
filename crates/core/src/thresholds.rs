//! Threshold evaluation engine.
//!
//! Pure logic: the caller passes in the latest sample, the prior
//! [`RuleState`] for that series and the active [`ThresholdConfig`], and gets
//! back an [`Evaluation`] plus the next state to store. Nothing here keeps
//! state between calls.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::alert::Severity;
use crate::error::CoreError;
use crate::sample::{Category, Sample};

/// Frame budget at 60 fps, in milliseconds.
const DEFAULT_TARGET_FRAME_TIME_MS: f64 = 1000.0 / 60.0;

/// Which side of a limit counts as a breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsWorse,
    HigherIsWorse,
    /// Boolean channel: a value of exactly 0 is a critical breach.
    DownWhenZero,
}

/// Whether a value exactly at a limit counts as a breach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// `<` / `>`: a value equal to the limit does not breach.
    #[default]
    Strict,
    /// `<=` / `>=`: a value equal to the limit breaches.
    Inclusive,
}

impl FromStr for BoundaryPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "inclusive" => Ok(Self::Inclusive),
            other => Err(CoreError::Validation(format!(
                "boundary policy must be 'strict' or 'inclusive', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Inclusive => f.write_str("inclusive"),
        }
    }
}

/// One threshold rule. Every category has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub category: Category,
    pub name: &'static str,
    pub direction: Direction,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

/// Consecutive evaluations needed before an alert opens or resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hysteresis {
    pub open_after: u32,
    pub resolve_after: u32,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self {
            open_after: 1,
            resolve_after: 1,
        }
    }
}

/// Active thresholds for every category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    pub fps_target: f64,
    pub fps_minimum: f64,
    pub target_frame_time_ms: f64,
    pub max_entities: f64,
    pub memory_limit_mb: f64,
    pub pathfinding_target_ms: f64,
    pub selection_target_ms: f64,
    pub max_response_time_ms: f64,
    pub boundary: BoundaryPolicy,
    pub hysteresis: Hysteresis,
    /// Per-category hysteresis that takes precedence over `hysteresis`.
    pub overrides: BTreeMap<Category, Hysteresis>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            fps_target: 60.0,
            fps_minimum: 45.0,
            target_frame_time_ms: DEFAULT_TARGET_FRAME_TIME_MS,
            max_entities: 1000.0,
            memory_limit_mb: 512.0,
            pathfinding_target_ms: 10.0,
            selection_target_ms: 5.0,
            max_response_time_ms: 2000.0,
            boundary: BoundaryPolicy::Strict,
            hysteresis: Hysteresis::default(),
            overrides: BTreeMap::new(),
        }
    }
}

impl ThresholdConfig {
    /// The rule that applies to `category`.
    pub fn rule_for(&self, category: Category) -> Rule {
        let (name, direction, warning, critical) = match category {
            Category::Health => ("down", Direction::DownWhenZero, None, Some(0.0)),
            Category::Latency => (
                "slow_response",
                Direction::HigherIsWorse,
                Some(self.max_response_time_ms),
                None,
            ),
            Category::Fps => (
                "low_fps",
                Direction::LowerIsWorse,
                Some(self.fps_target),
                Some(self.fps_minimum),
            ),
            Category::FrameTime => (
                "slow_frame",
                Direction::HigherIsWorse,
                Some(self.target_frame_time_ms * 2.0),
                None,
            ),
            Category::EntityCount => (
                "entity_limit",
                Direction::HigherIsWorse,
                Some(self.max_entities),
                None,
            ),
            Category::MemoryUsage => (
                "memory_limit",
                Direction::HigherIsWorse,
                Some(self.memory_limit_mb),
                None,
            ),
            Category::PathfindingTime => (
                "slow_pathfinding",
                Direction::HigherIsWorse,
                Some(self.pathfinding_target_ms),
                None,
            ),
            Category::SelectionTime => (
                "slow_selection",
                Direction::HigherIsWorse,
                Some(self.selection_target_ms),
                None,
            ),
        };
        Rule {
            category,
            name,
            direction,
            warning,
            critical,
        }
    }

    pub fn rules(&self) -> Vec<Rule> {
        Category::ALL.iter().map(|c| self.rule_for(*c)).collect()
    }

    pub fn hysteresis_for(&self, category: Category) -> Hysteresis {
        self.overrides
            .get(&category)
            .copied()
            .unwrap_or(self.hysteresis)
    }

    /// Reject configurations that could never evaluate sensibly.
    pub fn validate(&self) -> Result<(), CoreError> {
        let limits = [
            ("fps_target", self.fps_target),
            ("fps_minimum", self.fps_minimum),
            ("target_frame_time_ms", self.target_frame_time_ms),
            ("max_entities", self.max_entities),
            ("memory_limit_mb", self.memory_limit_mb),
            ("pathfinding_target_ms", self.pathfinding_target_ms),
            ("selection_target_ms", self.selection_target_ms),
            ("max_response_time_ms", self.max_response_time_ms),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::Validation(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.fps_minimum > self.fps_target {
            return Err(CoreError::Validation(format!(
                "fps_minimum ({}) must not exceed fps_target ({})",
                self.fps_minimum, self.fps_target
            )));
        }
        let hystereses = std::iter::once(&self.hysteresis).chain(self.overrides.values());
        for h in hystereses {
            if h.open_after == 0 || h.resolve_after == 0 {
                return Err(CoreError::Validation(
                    "hysteresis counts must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }
}

/// A single threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breach {
    pub severity: Severity,
    pub value: f64,
    /// The limit that was crossed.
    pub threshold: f64,
}

/// Classify a value against a rule, returning the most severe level crossed.
pub fn classify(value: f64, rule: &Rule, boundary: BoundaryPolicy) -> Option<Breach> {
    let crosses = |limit: f64| match (rule.direction, boundary) {
        (Direction::LowerIsWorse, BoundaryPolicy::Strict) => value < limit,
        (Direction::LowerIsWorse, BoundaryPolicy::Inclusive) => value <= limit,
        (Direction::HigherIsWorse, BoundaryPolicy::Strict) => value > limit,
        (Direction::HigherIsWorse, BoundaryPolicy::Inclusive) => value >= limit,
        (Direction::DownWhenZero, _) => value == limit,
    };

    let levels = [
        (Severity::Critical, rule.critical),
        (Severity::Warning, rule.warning),
    ];
    levels.into_iter().find_map(|(severity, limit)| {
        let limit = limit?;
        crosses(limit).then_some(Breach {
            severity,
            value,
            threshold: limit,
        })
    })
}

/// Per-series memory the evaluator needs between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleState {
    pub open: bool,
    pub consecutive_violations: u32,
    pub consecutive_recoveries: u32,
}

/// Outcome of evaluating one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    NoChange,
    /// The series is in breach and an alert is (or becomes) open.
    Violation(Breach),
    /// The open alert for this series should resolve.
    Recovery,
}

/// Evaluate `sample` against its category rule, applying hysteresis.
///
/// A breach is only reported once `open_after` consecutive breaches have
/// accumulated; while the series is open, every further breach is reported
/// so the caller can update the open alert. Recovery is reported after
/// `resolve_after` consecutive healthy samples, and only while open.
pub fn evaluate(
    sample: &Sample,
    prior: RuleState,
    config: &ThresholdConfig,
) -> (Evaluation, RuleState) {
    let rule = config.rule_for(sample.category());
    let hysteresis = config.hysteresis_for(sample.category());
    let mut next = prior;

    match classify(sample.value(), &rule, config.boundary) {
        Some(breach) => {
            next.consecutive_violations = prior.consecutive_violations.saturating_add(1);
            next.consecutive_recoveries = 0;
            if prior.open || next.consecutive_violations >= hysteresis.open_after {
                next.open = true;
                (Evaluation::Violation(breach), next)
            } else {
                (Evaluation::NoChange, next)
            }
        }
        None => {
            next.consecutive_violations = 0;
            if !prior.open {
                next.consecutive_recoveries = 0;
                return (Evaluation::NoChange, next);
            }
            next.consecutive_recoveries = prior.consecutive_recoveries.saturating_add(1);
            if next.consecutive_recoveries >= hysteresis.resolve_after {
                next.open = false;
                next.consecutive_recoveries = 0;
                (Evaluation::Recovery, next)
            } else {
                (Evaluation::NoChange, next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::sample::{SampleSource, Slot};

    fn game(category: Category, value: f64) -> Sample {
        Sample::new(Slot::Game, category, value, Utc::now(), SampleSource::Stream)
    }

    fn health(up: bool) -> Sample {
        Sample::flag(Slot::Blue, Category::Health, up, Utc::now(), SampleSource::Poll)
    }

    #[test]
    fn fps_below_minimum_is_critical() {
        let config = ThresholdConfig::default();
        let breach = classify(20.0, &config.rule_for(Category::Fps), config.boundary).unwrap();
        assert_eq!(breach.severity, Severity::Critical);
        assert_eq!(breach.threshold, 45.0);
    }

    #[test]
    fn fps_between_minimum_and_target_is_warning() {
        let config = ThresholdConfig::default();
        let breach = classify(50.0, &config.rule_for(Category::Fps), config.boundary).unwrap();
        assert_eq!(breach.severity, Severity::Warning);
        assert_eq!(breach.threshold, 60.0);
    }

    #[test]
    fn values_exactly_at_threshold_do_not_breach_under_strict_policy() {
        let config = ThresholdConfig::default();
        for (category, value) in [
            (Category::Fps, 60.0),
            (Category::EntityCount, 1000.0),
            (Category::MemoryUsage, 512.0),
            (Category::PathfindingTime, 10.0),
            (Category::SelectionTime, 5.0),
            (Category::Latency, 2000.0),
        ] {
            let rule = config.rule_for(category);
            assert!(
                classify(value, &rule, BoundaryPolicy::Strict).is_none(),
                "{category} at {value} should not breach"
            );
        }
        // Exactly at the minimum is still below target, so only a warning.
        let breach = classify(45.0, &config.rule_for(Category::Fps), BoundaryPolicy::Strict).unwrap();
        assert_eq!(breach.severity, Severity::Warning);
    }

    #[test]
    fn inclusive_policy_breaches_at_threshold() {
        let config = ThresholdConfig::default();
        let breach =
            classify(1000.0, &config.rule_for(Category::EntityCount), BoundaryPolicy::Inclusive)
                .unwrap();
        assert_eq!(breach.severity, Severity::Warning);
    }

    #[test]
    fn frame_time_warns_above_twice_the_target() {
        let config = ThresholdConfig::default();
        let rule = config.rule_for(Category::FrameTime);
        assert!(classify(30.0, &rule, config.boundary).is_none());
        assert!(classify(34.0, &rule, config.boundary).is_some());
    }

    #[test]
    fn health_zero_is_critical_and_one_is_fine() {
        let config = ThresholdConfig::default();
        let rule = config.rule_for(Category::Health);
        assert_eq!(
            classify(0.0, &rule, BoundaryPolicy::Strict).unwrap().severity,
            Severity::Critical
        );
        assert!(classify(1.0, &rule, BoundaryPolicy::Strict).is_none());
        assert!(classify(1.0, &rule, BoundaryPolicy::Inclusive).is_none());
    }

    #[test]
    fn evaluation_is_pure() {
        let config = ThresholdConfig::default();
        let sample = game(Category::Fps, 30.0);
        let prior = RuleState::default();
        let first = evaluate(&sample, prior, &config);
        let second = evaluate(&sample, prior, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn first_breach_opens_with_default_hysteresis() {
        let config = ThresholdConfig::default();
        let (evaluation, next) = evaluate(&health(false), RuleState::default(), &config);
        assert_matches!(evaluation, Evaluation::Violation(b) if b.severity == Severity::Critical);
        assert!(next.open);
        assert_eq!(next.consecutive_violations, 1);
    }

    #[test]
    fn healthy_sample_without_open_alert_is_no_change() {
        let config = ThresholdConfig::default();
        let (evaluation, next) = evaluate(&health(true), RuleState::default(), &config);
        assert_eq!(evaluation, Evaluation::NoChange);
        assert_eq!(next, RuleState::default());
    }

    #[test]
    fn recovery_only_reported_while_open() {
        let config = ThresholdConfig::default();
        let open = RuleState {
            open: true,
            consecutive_violations: 3,
            consecutive_recoveries: 0,
        };
        let (evaluation, next) = evaluate(&health(true), open, &config);
        assert_eq!(evaluation, Evaluation::Recovery);
        assert!(!next.open);
        assert_eq!(next.consecutive_violations, 0);
    }

    #[test]
    fn multi_tick_hysteresis_delays_open_and_resolve() {
        let mut config = ThresholdConfig::default();
        config.overrides.insert(
            Category::Fps,
            Hysteresis {
                open_after: 3,
                resolve_after: 2,
            },
        );

        let mut state = RuleState::default();
        let mut outcomes = Vec::new();
        for value in [30.0, 30.0, 30.0, 30.0, 61.0, 61.0] {
            let (evaluation, next) = evaluate(&game(Category::Fps, value), state, &config);
            outcomes.push(evaluation);
            state = next;
        }

        assert_eq!(outcomes[0], Evaluation::NoChange);
        assert_eq!(outcomes[1], Evaluation::NoChange);
        assert_matches!(outcomes[2], Evaluation::Violation(_));
        assert_matches!(outcomes[3], Evaluation::Violation(_));
        assert_eq!(outcomes[4], Evaluation::NoChange);
        assert_eq!(outcomes[5], Evaluation::Recovery);
        assert!(!state.open);
    }

    #[test]
    fn breach_during_recovery_window_resets_the_count() {
        let mut config = ThresholdConfig::default();
        config.hysteresis.resolve_after = 2;
        let open = RuleState {
            open: true,
            consecutive_violations: 1,
            consecutive_recoveries: 0,
        };
        let (_, state) = evaluate(&health(true), open, &config);
        assert_eq!(state.consecutive_recoveries, 1);
        let (evaluation, state) = evaluate(&health(false), state, &config);
        assert_matches!(evaluation, Evaluation::Violation(_));
        assert_eq!(state.consecutive_recoveries, 0);
        assert!(state.open);
    }

    #[test]
    fn validate_rejects_inverted_fps_limits() {
        let config = ThresholdConfig {
            fps_minimum: 70.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_hysteresis() {
        let mut config = ThresholdConfig::default();
        config.hysteresis.open_after = 0;
        assert!(config.validate().is_err());
        assert!(ThresholdConfig::default().validate().is_ok());
    }

    #[test]
    fn boundary_policy_parses_case_insensitively() {
        assert_eq!("Strict".parse::<BoundaryPolicy>().unwrap(), BoundaryPolicy::Strict);
        assert_eq!(
            " inclusive ".parse::<BoundaryPolicy>().unwrap(),
            BoundaryPolicy::Inclusive
        );
        assert!("loose".parse::<BoundaryPolicy>().is_err());
    }

    #[test]
    fn every_category_has_a_rule() {
        let config = ThresholdConfig::default();
        let rules = config.rules();
        assert_eq!(rules.len(), Category::ALL.len());
        assert!(rules.iter().all(|r| r.warning.is_some() || r.critical.is_some()));
    }
}
