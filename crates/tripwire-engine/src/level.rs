//! Severity level state machine.
//!
//! Banded metrics move between Normal, Low, Medium and High. Travel alerts
//! additionally ratchet their trigger value to the next boundary that would
//! justify escalation, and become Liquidated at -100%.

use tripwire_config::{BandMetric, ThresholdRange, Thresholds};
use tripwire_core::{AlertLevel, Condition};

/// Travel percent at the liquidation price.
pub const LIQUIDATION_TRAVEL_PERCENT: f64 = -100.0;

/// Which way a metric worsens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricDirection {
    /// Worse as the value grows (profit, heat index).
    IncreasingBad,
    /// Worse as the value falls (travel percent).
    DecreasingBad,
}

impl MetricDirection {
    /// Direction for a metric. Travel percent is always decreasing-bad;
    /// the others follow the band condition, defaulting to increasing-bad.
    pub fn for_metric(metric: BandMetric, condition: Option<Condition>) -> Self {
        match (metric, condition) {
            (BandMetric::TravelPercent, _) => Self::DecreasingBad,
            (_, Some(Condition::Below)) => Self::DecreasingBad,
            (_, Some(Condition::Above)) | (_, None) => Self::IncreasingBad,
        }
    }
}

/// Level and trigger value after one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelOutcome {
    pub level: AlertLevel,
    pub trigger_value: f64,
}

/// Maps evaluated values to levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelStateMachine;

impl LevelStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Band classification. Non-finite values are Normal.
    pub fn classify(&self, value: f64, t: &Thresholds, direction: MetricDirection) -> AlertLevel {
        if !value.is_finite() {
            return AlertLevel::Normal;
        }

        match direction {
            MetricDirection::IncreasingBad => {
                if value < t.low {
                    AlertLevel::Normal
                } else if value < t.medium {
                    AlertLevel::Low
                } else if value < t.high {
                    AlertLevel::Medium
                } else {
                    AlertLevel::High
                }
            }
            MetricDirection::DecreasingBad => {
                if value >= 0.0 || value > t.low {
                    AlertLevel::Normal
                } else if value > t.medium {
                    AlertLevel::Low
                } else if value > t.high {
                    AlertLevel::Medium
                } else {
                    AlertLevel::High
                }
            }
        }
    }

    /// Next boundary a travel alert must cross to escalate from `level`.
    pub fn next_trigger(&self, level: AlertLevel, t: &Thresholds) -> f64 {
        match level {
            AlertLevel::Normal => t.low,
            AlertLevel::Low => t.medium,
            AlertLevel::Medium | AlertLevel::High | AlertLevel::Liquidated => t.high,
            AlertLevel::Triggered => t.low,
        }
    }

    /// Full transition for a banded alert.
    ///
    /// A disabled band leaves the alert Normal with its trigger unchanged.
    /// Only travel alerts get a new trigger value; it depends only on the
    /// resulting level, so repeated evaluation of an unchanged value is
    /// stable.
    pub fn transition(
        &self,
        metric: BandMetric,
        band: &ThresholdRange,
        value: f64,
        current_trigger: f64,
    ) -> LevelOutcome {
        if !band.enabled {
            return LevelOutcome {
                level: AlertLevel::Normal,
                trigger_value: current_trigger,
            };
        }

        let thresholds = band.thresholds(metric);
        let direction = MetricDirection::for_metric(metric, band.condition());
        let mut level = self.classify(value, &thresholds, direction);

        match metric {
            BandMetric::TravelPercent => {
                if value.is_finite() && value <= LIQUIDATION_TRAVEL_PERCENT {
                    level = AlertLevel::Liquidated;
                }
                LevelOutcome {
                    level,
                    trigger_value: self.next_trigger(level, &thresholds),
                }
            }
            BandMetric::Profit | BandMetric::HeatIndex => LevelOutcome {
                level,
                trigger_value: current_trigger,
            },
        }
    }

    /// Boundary check for market alerts: Triggered once crossed.
    pub fn market(&self, condition: Condition, value: f64, trigger: f64) -> AlertLevel {
        // A missing price arrives as 0.0 and must not satisfy Below.
        if value <= 0.0 || !value.is_finite() {
            return AlertLevel::Normal;
        }
        if condition.is_met(value, trigger) {
            AlertLevel::Triggered
        } else {
            AlertLevel::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn band(value: serde_json::Value) -> ThresholdRange {
        serde_json::from_value(value).unwrap()
    }

    fn travel_band() -> ThresholdRange {
        band(json!({"enabled": true, "low": -25, "medium": -50, "high": -75}))
    }

    #[test]
    fn test_travel_low_ratchets_to_medium() {
        let sm = LevelStateMachine::new();
        let outcome = sm.transition(BandMetric::TravelPercent, &travel_band(), -30.0, -25.0);
        assert_eq!(outcome.level, AlertLevel::Low);
        assert_eq!(outcome.trigger_value, -50.0);
    }

    #[test]
    fn test_travel_ratchet_per_level() {
        let sm = LevelStateMachine::new();
        let b = travel_band();
        let cases = [
            (5.0, AlertLevel::Normal, -25.0),
            (-10.0, AlertLevel::Normal, -25.0),
            (-25.0, AlertLevel::Low, -50.0),
            (-50.0, AlertLevel::Medium, -75.0),
            (-60.0, AlertLevel::Medium, -75.0),
            (-75.0, AlertLevel::High, -75.0),
            (-99.0, AlertLevel::High, -75.0),
            (-100.0, AlertLevel::Liquidated, -75.0),
        ];
        for (value, level, trigger) in cases {
            let outcome = sm.transition(BandMetric::TravelPercent, &b, value, 0.0);
            assert_eq!(outcome.level, level, "value {value}");
            assert_eq!(outcome.trigger_value, trigger, "value {value}");
        }
    }

    #[test]
    fn test_transition_is_idempotent() {
        let sm = LevelStateMachine::new();
        let b = travel_band();
        let first = sm.transition(BandMetric::TravelPercent, &b, -55.0, -25.0);
        let second = sm.transition(BandMetric::TravelPercent, &b, -55.0, first.trigger_value);
        assert_eq!(first, second);
    }

    #[test]
    fn test_profit_increasing_bad_keeps_trigger() {
        let sm = LevelStateMachine::new();
        let b = band(json!({"low": 50, "medium": 100, "high": 200, "condition": "ABOVE"}));

        let outcome = sm.transition(BandMetric::Profit, &b, 120.0, 50.0);
        assert_eq!(outcome.level, AlertLevel::Medium);
        assert_eq!(outcome.trigger_value, 50.0);

        assert_eq!(
            sm.transition(BandMetric::Profit, &b, 49.9, 50.0).level,
            AlertLevel::Normal
        );
        assert_eq!(
            sm.transition(BandMetric::Profit, &b, 50.0, 50.0).level,
            AlertLevel::Low
        );
        assert_eq!(
            sm.transition(BandMetric::Profit, &b, 200.0, 50.0).level,
            AlertLevel::High
        );
    }

    #[test]
    fn test_below_condition_flips_direction() {
        let sm = LevelStateMachine::new();
        let b = band(json!({"low": -50, "medium": -100, "high": -200, "condition": "BELOW"}));

        assert_eq!(
            sm.transition(BandMetric::Profit, &b, 10.0, 0.0).level,
            AlertLevel::Normal
        );
        assert_eq!(
            sm.transition(BandMetric::Profit, &b, -120.0, 0.0).level,
            AlertLevel::Medium
        );
    }

    #[test]
    fn test_disabled_band_is_normal() {
        let sm = LevelStateMachine::new();
        let b = band(json!({"enabled": false, "low": -25, "medium": -50, "high": -75}));
        let outcome = sm.transition(BandMetric::TravelPercent, &b, -80.0, -25.0);
        assert_eq!(outcome.level, AlertLevel::Normal);
        assert_eq!(outcome.trigger_value, -25.0);
    }

    #[test]
    fn test_unparsable_thresholds_use_metric_defaults() {
        let sm = LevelStateMachine::new();
        let b = band(json!({"low": "abc", "medium": {}, "high": true}));
        // Travel defaults: -4 / -7 / -10
        let outcome = sm.transition(BandMetric::TravelPercent, &b, -8.0, 0.0);
        assert_eq!(outcome.level, AlertLevel::Medium);
        assert_eq!(outcome.trigger_value, -10.0);
    }

    #[test]
    fn test_non_finite_value_is_normal() {
        let sm = LevelStateMachine::new();
        let t = Thresholds::new(1.0, 2.0, 3.0);
        assert_eq!(
            sm.classify(f64::NAN, &t, MetricDirection::IncreasingBad),
            AlertLevel::Normal
        );
    }

    #[test]
    fn test_market_boundary() {
        let sm = LevelStateMachine::new();
        assert_eq!(
            sm.market(Condition::Above, 45_000.0, 40_000.0),
            AlertLevel::Triggered
        );
        assert_eq!(
            sm.market(Condition::Above, 39_000.0, 40_000.0),
            AlertLevel::Normal
        );
        assert_eq!(
            sm.market(Condition::Below, 1_900.0, 2_000.0),
            AlertLevel::Triggered
        );
        assert_eq!(sm.market(Condition::Below, 0.0, 2_000.0), AlertLevel::Normal);
    }

    #[test]
    fn test_direction_for_metric() {
        assert_eq!(
            MetricDirection::for_metric(BandMetric::TravelPercent, Some(Condition::Above)),
            MetricDirection::DecreasingBad
        );
        assert_eq!(
            MetricDirection::for_metric(BandMetric::HeatIndex, None),
            MetricDirection::IncreasingBad
        );
        assert_eq!(
            MetricDirection::for_metric(BandMetric::Profit, Some(Condition::Below)),
            MetricDirection::DecreasingBad
        );
    }
}
