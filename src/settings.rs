use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;
use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::alerts::CooldownPolicy;

const THRESHOLD_RANGE: RangeInclusive<u64> = 1..=30;
const COOLDOWN_RANGE: RangeInclusive<u64> = 10..=300;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enable_email_alerts: bool,
    pub enable_in_app_alerts: bool,
    pub alert_threshold_secs: u64,
    pub cooldown_secs: u64,
    pub cooldown_policy: CooldownPolicy,
    pub recipients: Vec<String>,
    pub serial_port: PathBuf,
    pub buzzer_sound: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_email_alerts: true,
            enable_in_app_alerts: true,
            alert_threshold_secs: 5,
            cooldown_secs: 60,
            cooldown_policy: CooldownPolicy::Shared,
            recipients: Vec::new(),
            serial_port: PathBuf::from("/dev/ttyUSB0"),
            buzzer_sound: None,
        }
    }
}

impl Settings {
    pub fn alert_threshold(&self) -> Duration {
        Duration::from_secs(self.alert_threshold_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Clamps out-of-range values to their valid ranges instead of
    /// rejecting the file.
    fn sanitize(&mut self) {
        self.alert_threshold_secs =
            clamp_to_range("alertThresholdSecs", self.alert_threshold_secs, THRESHOLD_RANGE);
        self.cooldown_secs = clamp_to_range("cooldownSecs", self.cooldown_secs, COOLDOWN_RANGE);
    }
}

fn clamp_to_range(name: &str, value: u64, range: RangeInclusive<u64>) -> u64 {
    if range.contains(&value) {
        value
    } else {
        let clamped = value.clamp(*range.start(), *range.end());
        warn!(
            "{name} = {value} is outside {}..={}, using {clamped}",
            range.start(),
            range.end()
        );
        clamped
    }
}

pub struct SettingsStore {
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: &Path) -> Result<Self> {
        let mut data = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "settings file {} is malformed ({err}), using defaults",
                    path.display()
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };
        data.sanitize();

        Ok(Self {
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> Settings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_the_documented_configuration_surface() {
        let settings = Settings::default();
        assert!(settings.enable_email_alerts);
        assert!(settings.enable_in_app_alerts);
        assert_eq!(settings.alert_threshold_secs, 5);
        assert_eq!(settings.cooldown_secs, 60);
        assert_eq!(settings.cooldown_policy, CooldownPolicy::Shared);
        assert!(settings.recipients.is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(&dir.path().join("settings.json")).unwrap();
        assert_eq!(store.current().alert_threshold_secs, 5);
    }

    #[test]
    fn out_of_range_values_are_clamped_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"alertThresholdSecs": 99, "cooldownSecs": 1}"#).unwrap();

        let settings = SettingsStore::new(&path).unwrap().current();
        assert_eq!(settings.alert_threshold_secs, 30);
        assert_eq!(settings.cooldown_secs, 10);
    }

    #[test]
    fn partial_file_falls_back_to_defaults_per_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"cooldownPolicy": "perKind", "recipients": ["ops@example.com"]}"#,
        )
        .unwrap();

        let settings = SettingsStore::new(&path).unwrap().current();
        assert_eq!(settings.cooldown_policy, CooldownPolicy::PerKind);
        assert_eq!(settings.recipients, vec!["ops@example.com".to_string()]);
        assert_eq!(settings.alert_threshold_secs, 5);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ this is not json").unwrap();

        let settings = SettingsStore::new(&path).unwrap().current();
        assert_eq!(settings.cooldown_secs, 60);
    }
}
