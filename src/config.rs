use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use crate::paths::{DEFAULT_DATA_ROOT, DataLayout};

pub const API_KEY_VAR: &str = "BRAWLSTARS_API_KEY";
pub const BASE_URL_VAR: &str = "BRAWLSTARS_BASE_URL";
pub const DATA_ROOT_VAR: &str = "BRAWLSTARS_DATA_ROOT";
pub const CONFIG_DIR_VAR: &str = "BRAWLSTARS_CONFIG_DIR";

pub const DEFAULT_BASE_URL: &str = "https://api.brawlstars.com/v1";
const DEFAULT_CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const LOCAL_CONFIG_FILE: &str = "config.local.json";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Reads the API credentials from the environment. A missing or blank key
    /// is an error; the base URL falls back to the public endpoint.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(API_KEY_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("{API_KEY_VAR} is not set"))?;
        let base_url = env::var(BASE_URL_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key.trim(), base_url.trim()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub default_player_tags: Vec<String>,
    #[serde(default)]
    pub default_club_tags: Vec<String>,
}

impl PipelineConfig {
    /// Loads `config.json` from `dir`, merged with `config.local.json` when
    /// that file exists.
    pub fn load(dir: &Path) -> Result<Self> {
        let base_path = dir.join(CONFIG_FILE);
        if !base_path.exists() {
            return Err(anyhow!("config file not found: {}", base_path.display()));
        }
        let mut merged = read_json(&base_path)?;

        let local_path = dir.join(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            let local = read_json(&local_path)?;
            merged = merge_configs(merged, local);
        }

        serde_json::from_value(merged)
            .with_context(|| format!("invalid pipeline config in {}", dir.display()))
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

/// Overlays `local` on `base`. When both sides hold a list under the same key
/// the lists are unioned, base entries first; any other value is replaced.
pub fn merge_configs(base: Value, local: Value) -> Value {
    let (mut merged, local) = match (base, local) {
        (Value::Object(base), Value::Object(local)) => (base, local),
        (_, local) => return local,
    };
    for (key, value) in local {
        if let (Some(Value::Array(existing)), Value::Array(extra)) = (merged.get_mut(&key), &value)
        {
            for item in extra {
                if !existing.contains(item) {
                    existing.push(item.clone());
                }
            }
            continue;
        }
        merged.insert(key, value);
    }
    Value::Object(merged)
}

pub fn data_root() -> PathBuf {
    env::var(DATA_ROOT_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT))
}

pub fn data_layout() -> DataLayout {
    DataLayout::new(data_root())
}

pub fn config_dir() -> PathBuf {
    env::var(CONFIG_DIR_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses a `YYYY-MM-DD` command line date.
pub fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date {raw:?}, expected YYYY-MM-DD"))
}

/// Finds `--name value` or `--name=value` in `args`.
pub fn flag_value(args: &[String], name: &str) -> Option<String> {
    let flag = format!("--{name}");
    let prefix = format!("{flag}=");
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == &flag {
            return iter.next().cloned();
        }
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_unions_lists_and_overrides_scalars() {
        let base = json!({
            "default_player_tags": ["#AAA", "#BBB"],
            "default_club_tags": ["#C1"],
            "note": "base",
        });
        let local = json!({
            "default_player_tags": ["#BBB", "#CCC"],
            "note": "local",
        });
        let merged = merge_configs(base, local);
        assert_eq!(merged["default_player_tags"], json!(["#AAA", "#BBB", "#CCC"]));
        assert_eq!(merged["default_club_tags"], json!(["#C1"]));
        assert_eq!(merged["note"], json!("local"));
    }

    #[test]
    fn load_requires_base_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(PipelineConfig::load(dir.path()).is_err());

        fs::write(
            dir.path().join(CONFIG_FILE),
            r##"{"default_player_tags": ["#PC0PPLRU"]}"##,
        )
        .expect("write config");
        fs::write(
            dir.path().join(LOCAL_CONFIG_FILE),
            r##"{"default_club_tags": ["#2YGRLQ9P"]}"##,
        )
        .expect("write local config");

        let cfg = PipelineConfig::load(dir.path()).expect("load");
        assert_eq!(cfg.default_player_tags, vec!["#PC0PPLRU"]);
        assert_eq!(cfg.default_club_tags, vec!["#2YGRLQ9P"]);
    }

    #[test]
    fn flag_value_accepts_both_forms() {
        let args = vec![
            "--mode".to_string(),
            "club".to_string(),
            "--date=2025-07-14".to_string(),
        ];
        assert_eq!(flag_value(&args, "mode").as_deref(), Some("club"));
        assert_eq!(flag_value(&args, "date").as_deref(), Some("2025-07-14"));
        assert_eq!(flag_value(&args, "tag"), None);
    }
}
