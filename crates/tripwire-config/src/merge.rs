//! Recursive document merge and band validation.

use serde_json::Value;
use tracing::warn;

const REQUIRED_BOUNDARIES: [&str; 3] = ["low", "medium", "high"];

/// Merge `incoming` into `target`.
///
/// When both sides hold an object at the same key the objects are merged
/// recursively; otherwise the incoming value replaces the existing one.
/// Keys absent from `incoming` are left untouched.
pub fn deep_merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(updates)) => {
            for (key, value) in updates {
                match existing.get_mut(&key) {
                    Some(slot) if slot.is_object() && value.is_object() => deep_merge(slot, value),
                    _ => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Check that every band in `bands` carries `low`, `medium` and `high`.
///
/// `bands` is an object of band name to band object. Anything else, or any
/// band missing a boundary key, is invalid.
pub fn validate_bands(bands: &Value) -> bool {
    let Some(bands) = bands.as_object() else {
        warn!("Threshold bands are not an object");
        return false;
    };

    for (name, band) in bands {
        let Some(band) = band.as_object() else {
            warn!(band = %name, "Threshold band is not an object");
            return false;
        };
        if let Some(missing) = REQUIRED_BOUNDARIES
            .iter()
            .find(|key| !band.contains_key(**key))
        {
            warn!(band = %name, key = *missing, "Threshold band missing boundary");
            return false;
        }
    }

    true
}
