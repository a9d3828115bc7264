use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Load from `explicit` when given, otherwise from
    /// `~/.recovery-watchdog/config.toml` (created with defaults on first run).
    /// Environment overrides are applied and the result validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(&crate::security::key_files::expand_path(path))?,
            None => Self::load_or_init()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_init() -> Result<Self> {
        let watchdog_dir = default_config_dir()?;
        let config_path = watchdog_dir.join("config.toml");

        if !watchdog_dir.exists() {
            fs::create_dir_all(&watchdog_dir)
                .context("Failed to create .recovery-watchdog directory")?;
        }

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".recovery-watchdog"))
}
