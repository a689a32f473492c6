use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub last_profile: Option<String>,
    #[serde(default = "default_true")]
    pub confirm_profile_delete: bool,
    #[serde(default = "default_true")]
    pub confirm_game_delete: bool,
}

impl AppConfig {
    pub fn load_or_create(data_dir: Option<&Path>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => base_data_dir()?,
        };
        fs::create_dir_all(&data_dir).context("create app data dir")?;
        let path = data_dir.join("config.json");
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let mut config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            config.data_dir = data_dir;
            return Ok(config);
        }

        let config = AppConfig {
            data_dir,
            last_profile: None,
            confirm_profile_delete: true,
            confirm_game_delete: true,
        };
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).context("create app data dir")?;
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(self.data_dir.join("config.json"), raw).context("write app config")?;
        Ok(())
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.data_dir.join("profiles")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("gameshelf.log")
    }

    /// Remembers the active profile for the next start. Only writes when it
    /// changed.
    pub fn remember_profile(&mut self, profile: Option<&str>) -> Result<()> {
        if self.last_profile.as_deref() == profile {
            return Ok(());
        }
        self.last_profile = profile.map(|name| name.to_string());
        self.save()
    }
}

fn default_true() -> bool {
    true
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("gameshelf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_defaults_on_first_run() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::load_or_create(Some(tmp.path())).unwrap();
        assert!(config.confirm_profile_delete);
        assert!(config.confirm_game_delete);
        assert!(config.last_profile.is_none());
        assert!(tmp.path().join("config.json").exists());
        assert_eq!(config.profiles_dir(), tmp.path().join("profiles"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.json"),
            r#"{"confirm_game_delete": false}"#,
        )
        .unwrap();
        let config = AppConfig::load_or_create(Some(tmp.path())).unwrap();
        assert!(config.confirm_profile_delete);
        assert!(!config.confirm_game_delete);
        assert_eq!(config.data_dir, tmp.path());
    }

    #[test]
    fn remembers_last_profile() {
        let tmp = TempDir::new().unwrap();
        let mut config = AppConfig::load_or_create(Some(tmp.path())).unwrap();
        config.remember_profile(Some("Arcade")).unwrap();
        let config = AppConfig::load_or_create(Some(tmp.path())).unwrap();
        assert_eq!(config.last_profile.as_deref(), Some("Arcade"));
    }
}
