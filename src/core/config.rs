//! RON config loading shared by every plugin.
//!
//! Each config resource lives in its own file under `assets/data/` and falls
//! back to its `Default` when the file is missing or malformed.

use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Directory holding all RON config files.
pub const CONFIG_DIR: &str = "assets/data";

/// Errors that can occur when loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// RON parsing failed.
    #[error("Parse error in '{path}': {details}")]
    Parse { path: String, details: String },
}

/// Parse RON text, tagging errors with the path it came from.
pub fn parse_ron<T: DeserializeOwned>(path: &str, contents: &str) -> Result<T, ConfigError> {
    ron::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_string(),
        details: e.to_string(),
    })
}

/// Read and parse a RON file.
pub fn read_ron<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    parse_ron(&display, &contents)
}

/// Load `CONFIG_DIR/<file_name>`, falling back to defaults on any error.
pub fn load_or_default<T: DeserializeOwned + Default>(file_name: &str) -> T {
    let path = Path::new(CONFIG_DIR).join(file_name);
    match read_ron(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e @ ConfigError::Read { .. }) => {
            warn!("{}. Using defaults.", e);
            T::default()
        }
        Err(e) => {
            error!("{}. Using defaults.", e);
            T::default()
        }
    }
}
