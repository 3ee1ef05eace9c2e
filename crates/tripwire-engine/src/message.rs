//! Notification text.

use tripwire_core::{Alert, AlertClass, AlertLevel, Position};

/// One line describing an actionable alert.
pub fn format_alert_message(
    alert: &Alert,
    level: AlertLevel,
    value: f64,
    position: Option<&Position>,
) -> String {
    match alert.alert_class {
        AlertClass::Market => format!(
            "{} ALERT for {} - Level: {}, Condition: {}, Trigger: {}, Current: {}",
            alert.alert_type, alert.asset_type, level, alert.condition, alert.trigger_value, value
        ),
        AlertClass::Position => {
            let side = position
                .map(|p| format!(" {}", p.position_type))
                .unwrap_or_default();
            let wallet = position
                .and_then(|p| p.wallet_name.as_deref())
                .map(|w| format!(" (Wallet: {w})"))
                .unwrap_or_default();
            format!(
                "{} ALERT for {}{}{} - Level: {}, Value: {:.2}",
                alert.alert_type, alert.asset_type, side, wallet, level, value
            )
        }
    }
}

/// Join per-alert lines into the single dispatched message.
pub fn combine_messages(lines: &[String]) -> String {
    lines.join("\n")
}
