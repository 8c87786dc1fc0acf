//! Configuration management for fichas
//!
//! Config stored at: ~/.config/fichas/config.json

use std::path::{Path, PathBuf};

use fichas_domain::model::CellMap;
use fichas_types::{ConfigError, OutputFormat, Result};
use serde::{Deserialize, Serialize};

use crate::app::FillOptions;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Template cell for each record field
    #[serde(default)]
    pub cell_map: CellMap,

    /// File name of the generated zip
    #[serde(default = "default_archive_name")]
    pub archive_name: String,

    /// Parallel fills (1 = sequential, 0 = CPU count)
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Default preview format (json, table)
    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_archive_name() -> String {
    "Fichas_Preenchidas.zip".to_string()
}

fn default_jobs() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cell_map: CellMap::default(),
            archive_name: default_archive_name(),
            jobs: default_jobs(),
            output_format: OutputFormat::default(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("fichas");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default location, or defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`, or defaults when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        if config.archive_name.trim().is_empty() {
            return Err(ConfigError::ParseError("archive_name must not be empty".to_string()).into());
        }
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn fill_options(&self) -> FillOptions {
        FillOptions { jobs: self.jobs }
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Fichas Configuration")?;
        writeln!(f, "====================")?;
        writeln!(f)?;
        writeln!(f, "Archive name:   {}", self.archive_name)?;
        writeln!(f, "Jobs:           {}", self.jobs)?;
        writeln!(f, "Output format:  {}", self.output_format)?;
        writeln!(f)?;
        writeln!(f, "Cell map:")?;
        for (field, cell) in self.cell_map.iter() {
            writeln!(f, "  {:<14} {}", field.label(), cell)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fichas_domain::model::{CellRef, FieldKey};
    use fichas_types::Error;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.archive_name, "Fichas_Preenchidas.zip");
        assert_eq!(config.cell_map.get(FieldKey::Driver), Some(CellRef::new(3, 1)));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"jobs": 4, "cell_map": {"MOTORISTA": "C7"}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.jobs, 4);
        assert_eq!(config.archive_name, "Fichas_Preenchidas.zip");
        assert_eq!(config.cell_map.len(), 1);
        assert_eq!(config.cell_map.get(FieldKey::Driver), Some(CellRef::new(6, 2)));
        assert_eq!(config.cell_map.get(FieldKey::Carrier), None);
    }

    #[test]
    fn test_invalid_cell_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"cell_map": {"MOTORISTA": "4B"}}"#).unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            archive_name: "lote.zip".to_string(),
            output_format: OutputFormat::Json,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
