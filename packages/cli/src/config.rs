use outline_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "outline.config.json";

/// Outline project configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding `<id>.json` articles
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub editor: EditorConfig,
}

fn default_data_dir() -> String {
    "articles".to_string()
}

impl Config {
    /// Load `explicit` if given, else the default config file in `cwd`
    pub fn load(cwd: &str, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else if explicit.is_some() {
            Err(anyhow::anyhow!("Config file not found: {}", config_path.display()))
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Get absolute path to the article directory
    pub fn get_data_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.data_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            editor: EditorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "dataDir": "notes",
            "editor": { "maxUndoLevels": 10, "placement": { "armThreshold": 8 } }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.data_dir, "notes");
        assert_eq!(config.editor.max_undo_levels, 10);
        assert_eq!(config.editor.placement.arm_threshold, 8.0);
        assert_eq!(config.editor.placement.indent_unit, 24.0);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data_dir, "articles");
        assert_eq!(config.editor, EditorConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        let config = Config::load(&cwd, None).unwrap();
        assert_eq!(config.get_data_dir(&cwd), dir.path().join("articles"));

        let missing = dir.path().join("nope.json");
        assert!(Config::load(&cwd, Some(&missing)).is_err());
    }
}
