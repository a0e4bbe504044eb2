//! Loading `depforge.toml` and merging user overrides on top of it.

use super::model::Config;
use crate::error::{CoreError, Result};
use crate::fsutil::expand_placeholders;
use log::debug;
use std::path::Path;
use toml::Value;

/// File name of the main configuration document.
pub const CONFIG_FILE_NAME: &str = "depforge.toml";

impl Config {
    /// Parse a single configuration file without applying overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let value = read_toml(path)?;
        from_value(value, path)
    }

    /// Load the main document, then merge `~/.depforge/config.toml` and every
    /// existing entry of `user_config_paths`.
    ///
    /// Arrays are appended, tables merged key by key and scalars replaced.
    pub fn load_merged(path: &Path, root_dir: &Path, home_dir: Option<&Path>) -> Result<Self> {
        let mut merged = read_toml(path)?;

        if let Some(home) = home_dir {
            let user_cfg = home.join(".depforge").join("config.toml");
            if user_cfg.is_file() {
                debug!("Loading user config from file {}", user_cfg.display());
                merge_values(&mut merged, read_toml(&user_cfg)?);
            }
        }

        let extra_paths: Vec<String> = merged
            .get("user_config_paths")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        for raw in extra_paths {
            let resolved = expand_placeholders(&raw, root_dir, home_dir);
            let candidate = Path::new(&resolved);
            if candidate.is_file() {
                debug!("Loading config override {}", candidate.display());
                merge_values(&mut merged, read_toml(candidate)?);
            }
        }

        from_value(merged, path)
    }
}

fn read_toml(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(CoreError::ConfigNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| CoreError::io(format!("read {}", path.display()), e))?;
    content.parse::<Value>().map_err(|e| CoreError::ConfigParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn from_value(value: Value, path: &Path) -> Result<Config> {
    value.try_into().map_err(|e: toml::de::Error| CoreError::ConfigParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Merge `overlay` into `base`.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_table), Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => {
            base_items.extend(overlay_items);
        }
        (slot, value) => *slot = value,
    }
}
