// Configuration Storage Service
// Handles config file read/write and version backup

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::services::detection::{ClassifierParams, VectorizerParams};

const APP_DIR: &str = "context-type";
const BACKUPS_KEPT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            detection: DetectionConfig::default(),
            model: ModelConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Use the trained model when one is available.
    #[serde(default = "default_true")]
    pub use_statistical: bool,
    /// Shortest text (in chars) a detect call accepts.
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            use_statistical: true,
            min_text_length: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_min_df")]
    pub min_df: usize,
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_artifact_key")]
    pub artifact_key: String,
    /// Overrides the platform data directory.
    #[serde(default)]
    pub model_dir: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            min_df: default_min_df(),
            ngram_max: default_ngram_max(),
            alpha: default_alpha(),
            test_size: default_test_size(),
            seed: default_seed(),
            artifact_key: default_artifact_key(),
            model_dir: None,
        }
    }
}

impl ModelConfig {
    /// Where persisted artifacts live.
    pub fn model_dir(&self) -> PathBuf {
        match &self.model_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("models"),
        }
    }

    pub fn classifier_params(&self) -> ClassifierParams {
        ClassifierParams {
            vectorizer: VectorizerParams {
                max_features: self.max_features,
                min_df: self.min_df,
                ngram_max: self.ngram_max,
            },
            alpha: self.alpha,
            test_size: self.test_size,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingConfig {
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
        }
    }
}

fn default_version() -> String { "1.0.0".to_string() }
fn default_true() -> bool { true }
fn default_min_text_length() -> usize { 10 }
fn default_max_features() -> usize { 1000 }
fn default_min_df() -> usize { 2 }
fn default_ngram_max() -> usize { 2 }
fn default_alpha() -> f64 { 0.1 }
fn default_test_size() -> f64 { 0.2 }
fn default_seed() -> u64 { 42 }
fn default_artifact_key() -> String { "context_model".to_string() }
fn default_min_samples() -> usize { 10 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    fn backup_dir(&self) -> PathBuf {
        self.config_dir.join("backups")
    }

    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        // Millisecond stamp so two saves within a second don't collide.
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        self.cleanup_old_backups(&backup_dir, BACKUPS_KEPT)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), String> {
        let mut entries: Vec<PathBuf> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort oldest first
        entries.sort();

        for path in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(path);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.detection.use_statistical);
        assert_eq!(config.detection.min_text_length, 10);
        assert_eq!(config.model.artifact_key, "context_model");
        assert_eq!(config.training.min_samples, 10);
        assert_eq!(config.model.classifier_params(), ClassifierParams::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"detection":{"minTextLength":3},"model":{"alpha":0.5,"modelDir":"/tmp/m"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.detection.min_text_length, 3);
        assert!(config.detection.use_statistical);
        assert_eq!(config.model.alpha, 0.5);
        assert_eq!(config.model.max_features, 1000);
        assert_eq!(config.model.model_dir(), PathBuf::from("/tmp/m"));
        assert_eq!(config.version, "1.0.0");
    }

    #[test]
    fn test_load_missing_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let store = ConfigStore::new(tmp.path().join("cfg"));
        let config = store.load().unwrap();
        assert_eq!(config.model.seed, 42);
    }

    #[test]
    fn test_save_and_backup_rotation() {
        let tmp = TempDir::new().unwrap();
        let store = ConfigStore::new(tmp.path().to_path_buf());

        let mut config = AppConfig::default();
        for i in 0..13 {
            config.training.min_samples = 10 + i;
            store.save(&config).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        assert_eq!(store.load().unwrap().training.min_samples, 22);
        let backups = fs::read_dir(tmp.path().join("backups")).unwrap().count();
        assert_eq!(backups, BACKUPS_KEPT);
    }
}
