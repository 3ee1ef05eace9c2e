//! Evaluated value extraction.
//!
//! Missing inputs never fail an evaluation: the value defaults to 0.0 and
//! the returned `InputStatus` says why.

use std::fmt;

use tracing::{debug, warn};

use tripwire_config::{BandMetric, ThresholdDocument};
use tripwire_core::{Alert, AlertClass, AlertType, Condition, NotificationType};

use crate::snapshot::InputSnapshot;

/// Whether the evaluated value came from real input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    Found,
    /// Position-class alert without a position reference.
    MissingReference,
    /// Referenced position is not in the snapshot.
    MissingPosition,
    /// No price for the asset.
    MissingPrice,
    /// Position present but the metric is absent or not finite.
    MissingMetric,
    UnrecognizedType,
}

impl InputStatus {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::MissingReference => "missing_reference",
            Self::MissingPosition => "missing_position",
            Self::MissingPrice => "missing_price",
            Self::MissingMetric => "missing_metric",
            Self::UnrecognizedType => "unrecognized_type",
        }
    }
}

impl fmt::Display for InputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display figures copied from the referenced position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFigures {
    pub liquidation_distance: f64,
    pub liquidation_price: f64,
    pub travel_percent: f64,
}

/// Result of evaluating one alert against a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub status: InputStatus,
    /// Present for position-class alerts whose position was found.
    pub figures: Option<PositionFigures>,
}

impl Evaluation {
    fn found(value: f64, figures: Option<PositionFigures>) -> Self {
        Self {
            value,
            status: InputStatus::Found,
            figures,
        }
    }

    fn defaulted(status: InputStatus, figures: Option<PositionFigures>) -> Self {
        Self {
            value: 0.0,
            status,
            figures,
        }
    }
}

/// Config-derived defaults for an alert record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enrichment {
    pub trigger_value: f64,
    pub condition: Condition,
    pub notification_type: NotificationType,
    /// False when the asset or band is switched off in the document.
    pub enabled: bool,
}

/// Computes evaluated values.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator;

impl AlertEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Evaluated value of `alert` against `snapshot`.
    pub fn evaluate(&self, alert: &Alert, snapshot: &InputSnapshot) -> Evaluation {
        let evaluation = match &alert.alert_type {
            AlertType::PriceThreshold => match snapshot.price(&alert.asset_type) {
                Some(quote) if quote.current_price.is_finite() => {
                    Evaluation::found(quote.current_price, None)
                }
                _ => Evaluation::defaulted(InputStatus::MissingPrice, None),
            },
            AlertType::TravelPercentLiquid => {
                self.position_metric(alert, snapshot, |p| Some(p.travel_percent))
            }
            AlertType::Profit => self.position_metric(alert, snapshot, |p| Some(p.pnl_after_fees)),
            AlertType::HeatIndex => {
                self.position_metric(alert, snapshot, |p| p.effective_heat_index())
            }
            AlertType::Unrecognized(name) => {
                warn!(alert_id = %alert.id, alert_type = %name, "Unrecognized alert type, evaluating as 0.0");
                Evaluation::defaulted(InputStatus::UnrecognizedType, None)
            }
        };

        if !evaluation.status.is_found() {
            debug!(
                alert_id = %alert.id,
                alert_type = %alert.alert_type,
                status = %evaluation.status,
                "Evaluation input missing, using 0.0"
            );
        }
        evaluation
    }

    fn position_metric(
        &self,
        alert: &Alert,
        snapshot: &InputSnapshot,
        metric: impl Fn(&tripwire_core::Position) -> Option<f64>,
    ) -> Evaluation {
        let Some(position_id) = alert.position_reference_id.as_deref() else {
            return Evaluation::defaulted(InputStatus::MissingReference, None);
        };
        let Some(position) = snapshot.position(position_id) else {
            return Evaluation::defaulted(InputStatus::MissingPosition, None);
        };

        let figures = Some(PositionFigures {
            liquidation_distance: position.liquidation_distance,
            liquidation_price: position.liquidation_price,
            travel_percent: position.travel_percent,
        });

        match metric(position).filter(|v| v.is_finite()) {
            Some(value) => Evaluation::found(value, figures),
            None => Evaluation::defaulted(InputStatus::MissingMetric, figures),
        }
    }

    /// Defaults for an alert taken from the threshold document.
    ///
    /// A zero trigger value is replaced by the configured one (the band's
    /// low boundary, or the asset's trigger for price alerts). Travel alerts
    /// always use `Below`. The notification type is `Call` when the band or
    /// asset routes to calls, `Email` otherwise. An asset without an entry
    /// in `price_alerts` counts as enabled.
    pub fn enrich(&self, alert: &Alert, doc: &ThresholdDocument) -> Enrichment {
        let mut enrichment = Enrichment {
            trigger_value: alert.trigger_value,
            condition: alert.condition,
            notification_type: alert.notification_type,
            enabled: true,
        };

        match AlertClass::for_type(&alert.alert_type) {
            AlertClass::Market => {
                if let Some(asset) = doc.alert_ranges.price_alerts.get(&alert.asset_type) {
                    if enrichment.trigger_value == 0.0 {
                        enrichment.trigger_value = asset.trigger();
                    }
                    enrichment.condition = asset.condition;
                    enrichment.notification_type = routing_type(asset.notifications.call);
                    enrichment.enabled = asset.enabled;
                }
            }
            AlertClass::Position => {
                let Some(metric) = BandMetric::for_alert_type(&alert.alert_type) else {
                    return enrichment;
                };
                let band = doc.band(metric);
                enrichment.enabled = band.enabled;
                if enrichment.trigger_value == 0.0 {
                    enrichment.trigger_value = band.thresholds(metric).low;
                }
                enrichment.condition = match metric {
                    BandMetric::TravelPercent => Condition::Below,
                    BandMetric::Profit | BandMetric::HeatIndex => {
                        band.condition().unwrap_or(enrichment.condition)
                    }
                };
                enrichment.notification_type = routing_type(band.notifications.call);
            }
        }

        enrichment
    }
}

fn routing_type(call: bool) -> NotificationType {
    if call {
        NotificationType::Call
    } else {
        NotificationType::Email
    }
}
