use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub redmine: RedmineConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedmineConfig {
  /// Base URL of the Redmine instance
  pub url: String,
  /// Login for basic auth (password comes from the environment)
  pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long cached records stay valid, in milliseconds
  #[serde(default = "default_ttl_ms")]
  pub ttl_ms: u64,
  /// Treat every cache read as a miss (cache busting for debugging)
  #[serde(default)]
  pub force_refresh: bool,
  /// Explicit cache database path (defaults to the platform data directory)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_ms: default_ttl_ms(),
      force_refresh: false,
      path: None,
    }
  }
}

fn default_ttl_ms() -> u64 {
  600_000
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./roadview.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/roadview/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/roadview/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("roadview.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("roadview").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the Redmine password or API key from environment variables.
  ///
  /// Checks ROADVIEW_REDMINE_PASSWORD first, then REDMINE_PASSWORD as
  /// fallback.
  pub fn get_password() -> Result<String> {
    std::env::var("ROADVIEW_REDMINE_PASSWORD")
      .or_else(|_| std::env::var("REDMINE_PASSWORD"))
      .map_err(|_| {
        eyre!(
          "Redmine password not found. Set ROADVIEW_REDMINE_PASSWORD or REDMINE_PASSWORD environment variable."
        )
      })
  }
}
