use serde::Deserialize;
use std::path::{Path, PathBuf};

const FILE_NAME: &str = "elo-calibrate.toml";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub segment: Option<String>,
    pub xorg_config: Option<PathBuf>,
    pub update_config: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub inset: Option<u32>,
    pub expect_version: Option<i32>,
    pub keep_segment: bool,
}

pub fn load_from_path(path: &Path) -> Option<FileConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => {
            log::debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

pub fn load_from_default_paths() -> Option<FileConfig> {
    default_config_paths()
        .into_iter()
        .filter(|path| path.exists())
        .find_map(|path| load_from_path(&path))
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(FILE_NAME)];

    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".config").join(FILE_NAME));
    }

    paths
}
