//! Application configuration loaded from `snapshare.toml`.
//!
//! ```toml
//! [store]
//! backend = "redis"
//! redis_url = "${REDIS_URL}"
//! prefix = "snapshare"
//!
//! [upload]
//! cloud_name = "${CLOUDINARY_CLOUD_NAME}"
//! upload_preset = "${CLOUDINARY_UPLOAD_PRESET}"
//! ```
//!
//! Values written as `${VAR}` are read from the environment. `REDIS_URL`,
//! `SNAPSHARE_PREFIX`, `CLOUDINARY_CLOUD_NAME` and `CLOUDINARY_UPLOAD_PRESET`
//! override whatever the file says.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "snapshare.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {name} not set")]
    MissingVariable { name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            prefix: default_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "snapshare".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadSettings {
    #[serde(default)]
    pub cloud_name: Option<String>,
    #[serde(default)]
    pub upload_preset: Option<String>,
    /// Base API URL; the Cloudinary default when absent.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads `path`, or `snapshare.toml` in the working directory when no path is
    /// given, then applies environment overrides. A missing default file yields
    /// the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::read(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Applies environment overrides and resolves `${VAR}` placeholders through `lookup`.
    /// Placeholders whose variable is unset are left in place.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("REDIS_URL") {
            self.store.redis_url = url;
        }
        if let Some(prefix) = lookup("SNAPSHARE_PREFIX") {
            self.store.prefix = prefix;
        }
        if let Some(cloud_name) = lookup("CLOUDINARY_CLOUD_NAME") {
            self.upload.cloud_name = Some(cloud_name);
        }
        if let Some(preset) = lookup("CLOUDINARY_UPLOAD_PRESET") {
            self.upload.upload_preset = Some(preset);
        }

        resolve_in_place(&mut self.store.redis_url, &lookup);
        resolve_in_place(&mut self.store.prefix, &lookup);
        for value in [
            &mut self.upload.cloud_name,
            &mut self.upload.upload_preset,
            &mut self.upload.endpoint,
        ] {
            // An unresolved upload setting counts as not configured.
            if let Some(inner) = value.as_mut() {
                resolve_in_place(inner, &lookup);
                if placeholder_name(inner).is_some() {
                    *value = None;
                }
            }
        }
    }

    /// The Redis URL, failing when it still names an unset variable.
    pub fn redis_url(&self) -> Result<&str, ConfigError> {
        match placeholder_name(&self.store.redis_url) {
            Some(name) => Err(ConfigError::MissingVariable { name: name.to_string() }),
            None => Ok(&self.store.redis_url),
        }
    }
}

fn placeholder_name(value: &str) -> Option<&str> {
    value.strip_prefix("${")?.strip_suffix('}')
}

fn resolve_in_place<F>(value: &mut String, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(resolved) = placeholder_name(value).and_then(lookup) {
        *value = resolved;
    }
}
