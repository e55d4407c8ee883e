use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5-coder:7b";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub ollama_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            ollama_url: None,
            model: None,
            temperature: None,
        }
    }

    /// Loads the config file, writing one with defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            let config = Self::new();
            config.save_to(&config_path)?;
            return Ok(config);
        }
        Self::load_from(&config_path)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("maqueta").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maqueta").join("config.json");
        let config = Config {
            ollama_url: Some("http://localhost:9999".to_string()),
            model: Some("llama3.2".to_string()),
            temperature: Some(0.7),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.ollama_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(loaded.model.as_deref(), Some("llama3.2"));
        assert_eq!(loaded.temperature, Some(0.7));
    }

    #[test]
    fn test_unset_fields_stay_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        Config::new().save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.ollama_url.is_none());
        assert!(loaded.model.is_none());
        assert!(loaded.temperature.is_none());
    }
}
