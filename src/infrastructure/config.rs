use crate::domain::models::DEFAULT_ACADEMIC_YEAR;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const APP_JSON: &str = "app.json";
const CONFIG_SCHEMA: u64 = 1;
const DEFAULT_SCHOOL_NAME: &str = "Sekolah Rendah Islam Integrasi Ehsan";
const DEFAULT_TIMEZONE: &str = "Asia/Kuala_Lumpur";
const DEFAULT_STORAGE_KEY: &str = "sriie_events_2026";
const DEFAULT_UPCOMING_LIMIT: usize = 5;
const DEFAULT_SUGGESTION_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_SUGGESTION_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionSettings {
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_SUGGESTION_MODEL.to_string(),
            timeout_seconds: DEFAULT_SUGGESTION_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    pub school_name: String,
    pub academic_year: i32,
    pub timezone: String,
    pub storage_key: String,
    pub upcoming_limit: usize,
    #[serde(default)]
    pub suggestion: SuggestionSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: CONFIG_SCHEMA as u8,
            school_name: DEFAULT_SCHOOL_NAME.to_string(),
            academic_year: DEFAULT_ACADEMIC_YEAR,
            timezone: DEFAULT_TIMEZONE.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            suggestion: SuggestionSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.school_name.trim().is_empty() {
            return Err(InfraError::InvalidConfig("schoolName must not be empty".to_string()));
        }
        if self.storage_key.trim().is_empty() {
            return Err(InfraError::InvalidConfig("storageKey must not be empty".to_string()));
        }
        if !(1900..=9999).contains(&self.academic_year) {
            return Err(InfraError::InvalidConfig(format!(
                "academicYear {} is out of range",
                self.academic_year
            )));
        }
        if self.suggestion.timeout_seconds == 0 {
            return Err(InfraError::InvalidConfig(
                "suggestion.timeoutSeconds must be > 0".to_string(),
            ));
        }
        self.time_zone()?;
        Ok(())
    }

    pub fn time_zone(&self) -> Result<Tz, InfraError> {
        self.timezone.trim().parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!("invalid timezone '{}': {error}", self.timezone))
        })
    }
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != CONFIG_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let value = read_config(&path)?;
    let config: AppConfig = serde_json::from_value(value).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid {}: {error}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

pub fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DIR: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DIR.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "takwim-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn default_config_is_written_and_loaded() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        let config = load_app_config(&dir.path).expect("load config");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.academic_year, 2026);
        assert_eq!(config.storage_key, "sriie_events_2026");
        assert_eq!(config.time_zone().expect("tz"), chrono_tz::Asia::Kuala_Lumpur);
    }

    #[test]
    fn ensure_default_configs_keeps_existing_file() {
        let dir = TempConfigDir::new();
        let custom = AppConfig {
            academic_year: 2027,
            storage_key: "events_2027".to_string(),
            ..AppConfig::default()
        };
        fs::write(
            dir.path.join(APP_JSON),
            serde_json::to_string_pretty(&custom).expect("serialize"),
        )
        .expect("write custom config");

        ensure_default_configs(&dir.path).expect("ensure defaults");
        let loaded = load_app_config(&dir.path).expect("load config");
        assert_eq!(loaded.academic_year, 2027);
        assert_eq!(loaded.storage_key, "events_2027");
    }

    #[test]
    fn load_rejects_unsupported_schema() {
        let dir = TempConfigDir::new();
        fs::write(dir.path.join(APP_JSON), r#"{"schema": 3}"#).expect("write config");
        match load_app_config(&dir.path) {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("unsupported schema 3")),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_unknown_timezone() {
        let dir = TempConfigDir::new();
        let mut value = serde_json::to_value(AppConfig::default()).expect("serialize");
        value["timezone"] = serde_json::json!("Mars/Olympus");
        fs::write(dir.path.join(APP_JSON), value.to_string()).expect("write config");
        assert!(matches!(
            load_app_config(&dir.path),
            Err(InfraError::InvalidConfig(message)) if message.contains("Mars/Olympus")
        ));
    }

    #[test]
    fn suggestion_settings_default_when_missing() {
        let dir = TempConfigDir::new();
        let mut value = serde_json::to_value(AppConfig::default()).expect("serialize");
        value
            .as_object_mut()
            .expect("object")
            .remove("suggestion");
        fs::write(dir.path.join(APP_JSON), value.to_string()).expect("write config");
        let loaded = load_app_config(&dir.path).expect("load config");
        assert_eq!(loaded.suggestion, SuggestionSettings::default());
    }

    #[test]
    fn lookup_skips_blank_values_in_key_order() {
        let lookup = |key: &str| match key {
            "FIRST" => Some("   ".to_string()),
            "SECOND" => Some(" value ".to_string()),
            _ => None,
        };
        assert_eq!(
            optional_lookup_value(&lookup, &["MISSING", "FIRST", "SECOND"]),
            Some("value".to_string())
        );
        assert_eq!(optional_lookup_value(&lookup, &["MISSING"]), None);
    }
}
