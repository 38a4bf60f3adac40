use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest framework image representation copied out, in bytes.
pub const DEFAULT_MAX_REPRESENTATION_BYTES: usize = 256 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Search tables and limits used by the icon backends.
///
/// Directory entries may start with `~/` or `$HOME/`; they are expanded
/// against the home directory handed to [`Config::search_paths`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub application_dirs: Vec<String>,
    pub icon_dirs: Vec<String>,
    pub themes: Vec<String>,
    pub sizes: Vec<u32>,
    pub max_representation_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            application_dirs: vec![
                "~/.local/share/applications".to_string(),
                "/usr/share/applications".to_string(),
                "/usr/local/share/applications".to_string(),
            ],
            icon_dirs: vec![
                "~/.local/share/icons".to_string(),
                "~/.icons".to_string(),
                "/usr/share/icons".to_string(),
                "/usr/share/pixmaps".to_string(),
            ],
            themes: vec!["hicolor".to_string()],
            sizes: vec![512, 256, 128, 96, 64, 48],
            max_representation_bytes: DEFAULT_MAX_REPRESENTATION_BYTES,
        }
    }
}

/// Resolved, absolute search directories for the desktop resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    pub application_dirs: Vec<PathBuf>,
    pub icon_dirs: Vec<PathBuf>,
    pub themes: Vec<String>,
    pub sizes: Vec<u32>,
}

impl Config {
    /// Expands home-relative entries. Entries that need a home directory are
    /// dropped when `home` is `None`.
    pub fn search_paths(&self, home: Option<&Path>) -> SearchPaths {
        let expand = |dirs: &[String]| -> Vec<PathBuf> {
            dirs.iter().filter_map(|d| expand_home(d, home)).collect()
        };
        SearchPaths {
            application_dirs: expand(&self.application_dirs),
            icon_dirs: expand(&self.icon_dirs),
            themes: self.themes.clone(),
            sizes: self.sizes.clone(),
        }
    }
}

fn expand_home(dir: &str, home: Option<&Path>) -> Option<PathBuf> {
    let rest = dir
        .strip_prefix("~/")
        .or_else(|| dir.strip_prefix("$HOME/"));
    match (rest, home) {
        (Some(rest), Some(home)) => Some(home.join(rest)),
        (Some(_), None) => None,
        (None, _) => Some(PathBuf::from(dir)),
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    if !path.as_ref().exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
