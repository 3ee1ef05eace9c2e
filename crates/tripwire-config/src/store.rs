//! On-disk threshold document.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use tripwire_core::write_atomic;

use crate::document::{BandMetric, ThresholdDocument};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{deep_merge, validate_bands};

/// Threshold document backed by a JSON file.
///
/// Reads never fail: a missing or malformed file yields the default
/// document. Writes go through `update`, which merges and replaces the file
/// atomically. Concurrent updates are serialized.
pub struct ThresholdConfig {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ThresholdConfig {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the typed document.
    pub fn load(&self) -> ThresholdDocument {
        let raw = self.load_raw();
        match ThresholdDocument::from_value(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Threshold document has invalid shape, using defaults");
                ThresholdDocument::default()
            }
        }
    }

    /// Load the raw document; an empty object when unreadable.
    pub fn load_raw(&self) -> Value {
        match self.read_raw() {
            Ok(Some(value)) => value,
            Ok(None) => {
                warn!(path = %self.path.display(), "Threshold document not found, using defaults");
                empty_document()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read threshold document, using defaults");
                empty_document()
            }
        }
    }

    fn read_raw(&self) -> ConfigResult<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&content)?;
        if !value.is_object() {
            return Err(ConfigError::InvalidDocument(
                "document root is not an object".to_string(),
            ));
        }
        Ok(Some(value))
    }

    /// Check that every banded metric present in the document carries
    /// `low`, `medium` and `high`.
    pub fn validate(&self) -> bool {
        validate_bands(&banded_sections(&self.load_raw()))
    }

    /// Deep-merge `partial` into the stored document and persist it.
    ///
    /// Returns the merged document. A missing file starts from an empty
    /// document; an existing file that cannot be read or parsed is left
    /// untouched and the update fails.
    pub fn update(&self, partial: Value) -> ConfigResult<ThresholdDocument> {
        if !partial.is_object() {
            return Err(ConfigError::InvalidUpdate(
                "partial update must be a JSON object".to_string(),
            ));
        }

        let _guard = self.write_lock.lock();
        let mut raw = match self.read_raw() {
            Ok(Some(value)) => value,
            Ok(None) => empty_document(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Refusing to overwrite unreadable threshold document");
                return Err(e);
            }
        };
        deep_merge(&mut raw, partial);

        if !validate_bands(&banded_sections(&raw)) {
            debug!("Merged document has incomplete bands, missing boundaries use defaults");
        }

        let doc = ThresholdDocument::from_value(&raw)?;
        let bytes = serde_json::to_vec_pretty(&raw)?;
        write_atomic(&self.path, &bytes)?;

        info!(path = %self.path.display(), "Threshold document updated");
        Ok(doc)
    }

    /// Persist the throttle timers (Unix seconds, `None` clears) and the
    /// length of the active snooze.
    pub fn save_timers(
        &self,
        call_refractory_start: Option<f64>,
        snooze_start: Option<f64>,
        snooze_duration: Option<u64>,
    ) -> ConfigResult<()> {
        self.update(json!({
            "call_refractory_start": call_refractory_start,
            "snooze_start": snooze_start,
            "snooze_duration": snooze_duration,
        }))?;
        Ok(())
    }
}

fn empty_document() -> Value {
    Value::Object(Map::new())
}

/// The banded metric sections present under `alert_ranges`.
fn banded_sections(raw: &Value) -> Value {
    let bands: Map<String, Value> = raw
        .get("alert_ranges")
        .and_then(Value::as_object)
        .map(|ranges| {
            BandMetric::ALL
                .iter()
                .filter_map(|m| ranges.get(m.key()).map(|b| (m.key().to_string(), b.clone())))
                .collect()
        })
        .unwrap_or_default();
    Value::Object(bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Thresholds;
    use tempfile::TempDir;

    fn write(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("alert_thresholds.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ThresholdConfig::new(temp_dir.path().join("absent.json"));
        assert_eq!(config.load(), ThresholdDocument::default());
    }

    #[test]
    fn test_load_malformed_file_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ThresholdConfig::new(write(&temp_dir, "{not json"));
        assert_eq!(config.load(), ThresholdDocument::default());

        let config = ThresholdConfig::new(write(&temp_dir, "[1, 2]"));
        assert_eq!(config.load(), ThresholdDocument::default());
    }

    #[test]
    fn test_update_preserves_band_siblings() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            &temp_dir,
            r#"{"alert_ranges": {"heat_index_ranges": {"enabled": true, "low": 12, "medium": 16, "high": 20}}}"#,
        );
        let config = ThresholdConfig::new(&path);

        let doc = config
            .update(json!({"alert_ranges": {"heat_index_ranges": {"low": 5}}}))
            .unwrap();

        assert_eq!(
            doc.thresholds(BandMetric::HeatIndex),
            Thresholds::new(5.0, 16.0, 20.0)
        );
        assert_eq!(config.load(), doc);
    }

    #[test]
    fn test_update_writes_parseable_file_without_temp_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("alert_thresholds.json");
        let config = ThresholdConfig::new(&path);

        config.update(json!({"alert_cooldown_seconds": 60})).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["alert_cooldown_seconds"], json!(60));

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["alert_thresholds.json".to_string()]);
    }

    #[test]
    fn test_update_rejects_non_object() {
        let temp_dir = TempDir::new().unwrap();
        let config = ThresholdConfig::new(temp_dir.path().join("doc.json"));
        assert!(matches!(
            config.update(json!(42)),
            Err(ConfigError::InvalidUpdate(_))
        ));
    }

    #[test]
    fn test_save_timers_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, r#"{"snooze_countdown": 120}"#);
        let config = ThresholdConfig::new(&path);

        config.save_timers(Some(1_700_000_000.5), None, None).unwrap();
        let doc = config.load();
        assert_eq!(doc.call_refractory_start, Some(1_700_000_000.5));
        assert_eq!(doc.snooze_start, None);
        assert_eq!(doc.snooze_countdown, 120);

        config
            .save_timers(None, Some(1_700_000_100.0), Some(3600))
            .unwrap();
        let doc = config.load();
        assert_eq!(doc.call_refractory_start, None);
        assert_eq!(doc.snooze_start, Some(1_700_000_100.0));
        assert_eq!(doc.snooze_duration, Some(3600));
        assert_eq!(doc.snooze_countdown, 120);
    }

    #[test]
    fn test_save_timers_keeps_malformed_document() {
        let temp_dir = TempDir::new().unwrap();
        let content = r#"{"alert_ranges": {"travel_percent_liquid_ranges": {"low": -25, "medium": -50, "high": -75}},}"#;
        let path = write(&temp_dir, content);
        let config = ThresholdConfig::new(&path);

        assert!(matches!(
            config.save_timers(Some(1.0), None, None),
            Err(ConfigError::Json(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_update_rejects_non_object_root_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "[1, 2]");
        let config = ThresholdConfig::new(&path);

        assert!(matches!(
            config.update(json!({"alert_cooldown_seconds": 60})),
            Err(ConfigError::InvalidDocument(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1, 2]");
    }

    #[test]
    fn test_validate_detects_missing_boundary() {
        let temp_dir = TempDir::new().unwrap();
        let config = ThresholdConfig::new(write(
            &temp_dir,
            r#"{"alert_ranges": {"profit_ranges": {"low": 50, "medium": 100, "high": 200}}}"#,
        ));
        assert!(config.validate());

        let config = ThresholdConfig::new(write(
            &temp_dir,
            r#"{"alert_ranges": {"profit_ranges": {"low": 50, "high": 200}}}"#,
        ));
        assert!(!config.validate());
    }
}
