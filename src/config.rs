use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FernError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: String,
    /// Bank API access tokens, one per enrollment.
    #[serde(default)]
    pub access_tokens: Vec<String>,
    /// PEM paths for the bank API client certificate.
    #[serde(default)]
    pub cert_path: String,
    #[serde(default)]
    pub key_path: String,
    #[serde(default)]
    pub claude_api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Start of history for accounts with no stored transactions.
    #[serde(default)]
    pub default_start_date: Option<NaiveDate>,
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    /// Pinned categories by transaction id; applied before the AI pass.
    #[serde(default)]
    pub manual_overrides: BTreeMap<String, String>,
    #[serde(default = "default_fallback_category")]
    pub fallback_category: String,
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,
}

fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_fallback_category() -> String {
    "general".to_string()
}

fn default_fallback_confidence() -> f64 {
    0.5
}

fn default_categories() -> Vec<Category> {
    let pairs = [
        ("income", "Salary, deposits, transfers into your accounts"),
        ("dining", "Restaurants, cafes, takeout"),
        ("groceries", "Supermarkets and food stores"),
        ("fuel", "Gas stations and charging"),
        ("transport", "Transit, rideshare, parking, tolls"),
        ("shopping", "Retail and online purchases"),
        ("subscriptions", "Recurring digital services"),
        ("utilities", "Power, water, internet, phone"),
        ("health", "Pharmacies, clinics, insurance"),
        ("travel", "Flights, hotels, rentals"),
        ("entertainment", "Events, streaming, hobbies"),
        ("loan", "Loan and credit card payments, transfers out"),
        ("fees", "Bank and service fees"),
        ("general", "Anything without a clearly better category"),
        ("undefined", "Merchant and purpose genuinely unclear"),
    ];
    pairs
        .iter()
        .map(|(name, description)| Category {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            access_tokens: Vec::new(),
            cert_path: String::new(),
            key_path: String::new(),
            claude_api_key: String::new(),
            model: default_model(),
            batch_size: default_batch_size(),
            default_start_date: None,
            categories: default_categories(),
            manual_overrides: BTreeMap::new(),
            fallback_category: default_fallback_category(),
            fallback_confidence: default_fallback_confidence(),
        }
    }
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("fern.db")
    }

    pub fn exports_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("exports")
    }

    /// Check everything a sync run needs. Values are validated here once so
    /// the engine can consume them as-is.
    pub fn validate_for_sync(&self) -> Result<()> {
        if self.access_tokens.is_empty() {
            return Err(FernError::Config(
                "no access tokens configured; add access_tokens to the config".to_string(),
            ));
        }
        let token_re = Regex::new(r"^token_[a-z0-9]{26}$").unwrap();
        for token in &self.access_tokens {
            if !token_re.is_match(token) {
                let prefix: String = token.chars().take(8).collect();
                return Err(FernError::Config(format!(
                    "malformed access token '{prefix}...'"
                )));
            }
        }

        let key_re = Regex::new(r"^sk-ant-api03-[A-Za-z0-9\-]{95}$").unwrap();
        if !key_re.is_match(&self.claude_api_key) {
            return Err(FernError::Config(
                "claude_api_key is missing or malformed".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(FernError::Config("batch_size must be at least 1".to_string()));
        }

        for path in [&self.cert_path, &self.key_path] {
            if path.is_empty() {
                return Err(FernError::Config(
                    "cert_path and key_path must point at the bank API client certificate".to_string(),
                ));
            }
            if !PathBuf::from(path).exists() {
                return Err(FernError::Config(format!("certificate file not found: {path}")));
            }
        }

        let valid = self.valid_category_names();
        if !valid.contains(self.fallback_category.as_str()) {
            return Err(FernError::Config(format!(
                "fallback_category '{}' is not in the category list",
                self.fallback_category
            )));
        }

        Ok(())
    }

    pub fn valid_category_names(&self) -> std::collections::HashSet<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fern")
}

fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("fern")
}

pub fn load_config() -> Config {
    let path = config_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Config::default()
    }
}

pub fn save_config(config: &Config) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| FernError::Config(e.to_string()))?;
    std::fs::write(config_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_token() -> String {
        format!("token_{}", "a1b2c3d4e5f6a1b2c3d4e5f6a1")
    }

    fn valid_api_key() -> String {
        format!("sk-ant-api03-{}", "A".repeat(95))
    }

    fn syncable_config(dir: &std::path::Path) -> Config {
        let cert = dir.join("certificate.pem");
        let key = dir.join("private_key.pem");
        std::fs::write(&cert, "cert").unwrap();
        std::fs::write(&key, "key").unwrap();
        Config {
            access_tokens: vec![valid_token()],
            claude_api_key: valid_api_key(),
            cert_path: cert.to_string_lossy().to_string(),
            key_path: key.to_string_lossy().to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = Config {
            batch_size: 25,
            default_start_date: Some("2024-01-01".parse().unwrap()),
            ..Config::default()
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let loaded: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.batch_size, 25);
        assert_eq!(loaded.default_start_date, config.default_start_date);
        assert_eq!(loaded.fallback_category, "general");
    }

    #[test]
    fn test_partial_config_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/fern", "batch_size": 5}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.model, default_model());
        assert!(!config.categories.is_empty());
        assert_eq!(config.fallback_confidence, 0.5);
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let dir = tempfile::tempdir().unwrap();
        syncable_config(dir.path()).validate_for_sync().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = syncable_config(dir.path());
        config.access_tokens = vec!["token_SHOUTING".to_string()];
        assert!(config.validate_for_sync().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = syncable_config(dir.path());
        config.claude_api_key = String::new();
        assert!(config.validate_for_sync().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = syncable_config(dir.path());
        config.batch_size = 0;
        assert!(config.validate_for_sync().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = syncable_config(dir.path());
        config.cert_path = dir.path().join("nope.pem").to_string_lossy().to_string();
        assert!(config.validate_for_sync().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_fallback_category() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = syncable_config(dir.path());
        config.fallback_category = "not_a_category".to_string();
        assert!(config.validate_for_sync().is_err());
    }

    #[test]
    fn test_default_categories_include_fallback() {
        let config = Config::default();
        assert!(config.valid_category_names().contains("general"));
        assert!(config.valid_category_names().contains("undefined"));
    }
}
