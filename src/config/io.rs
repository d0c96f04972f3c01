//! Configuration file I/O operations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::Config;

impl Config {
    /// Get the global config directory path (~/.statsync/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".statsync")
    }

    /// Get the global config file path (~/.statsync/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Serialize this configuration to a file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Write raw config text to `path`, refusing to overwrite unless `force`
    pub fn write_template(path: &Path, template: &str, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "Configuration already exists: {}\nUse --force to overwrite.",
                path.display()
            );
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, template)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut config = Config::with_defaults();
        config.achievements.count = 4;

        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.achievements.count, 4);
        assert!(loaded.leaderboard.contains_key("HighScores"));
    }

    #[test]
    fn test_from_dir_prefers_local_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".statsync/config.toml");
        Config::write_template(&path, "[achievements]\ncount = 2\n", false).unwrap();

        let loaded = Config::from_dir(dir.path()).unwrap();
        assert_eq!(loaded.achievements.count, 2);
    }

    #[test]
    fn test_write_template_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::write_template(&path, "", false).unwrap();
        assert!(Config::write_template(&path, "", false).is_err());
        assert!(Config::write_template(&path, "", true).is_ok());
    }
}
