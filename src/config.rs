//! Configuration
//!
//! Credentials live in a small JSON file in the user's home directory:
//!
//! ```json
//! {
//!     "host": "192.168.0.50",
//!     "user": "admin",
//!     "pass": "super_secret_password"
//! }
//! ```
//!
//! Optional keys tune the request pacing and the eject retry loop.

use crate::autoloader::client::EjectPolicy;
use crate::autoloader::transport::TransportConfig;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Config file name, looked up in `$HOME`
pub const CONFIG_FILE_NAME: &str = ".pv124t.json";

/// Only this many bytes of the config file are read
const MAX_CONFIG_BYTES: u64 = 1024;

const REQUIRED_KEYS: [&str; 3] = ["host", "user", "pass"];

// =============================================================================
// Device Configuration
// =============================================================================

/// Contents of the config file
#[derive(Clone, Deserialize)]
pub struct DeviceConfig {
    /// Hostname or IP address of the autoloader
    pub host: String,
    /// HTTP username
    pub user: String,
    /// HTTP password
    pub pass: String,
    /// Override of the minimum gap between requests
    #[serde(default)]
    pub request_interval_secs: Option<u64>,
    /// Override of the wait after a rejected or ignored move
    #[serde(default)]
    pub busy_backoff_secs: Option<u64>,
    /// Give up on a tape after this many move attempts
    #[serde(default)]
    pub max_eject_attempts: Option<u32>,
}

impl std::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("request_interval_secs", &self.request_interval_secs)
            .field("busy_backoff_secs", &self.busy_backoff_secs)
            .field("max_eject_attempts", &self.max_eject_attempts)
            .finish()
    }
}

impl DeviceConfig {
    /// Read and validate the config file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Reading: {}", path.display());

        let mut data = Vec::new();
        File::open(path)
            .and_then(|file| file.take(MAX_CONFIG_BYTES).read_to_end(&mut data))
            .map_err(|e| Error::Configuration(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_slice(&data)
            .map_err(|e| match e {
                Error::JsonParse(e) => Error::Configuration(format!(
                    "Failed to parse json in {}: {}",
                    path.display(),
                    e
                )),
                other => other,
            })
    }

    /// Parse and validate config file contents
    pub fn from_json(data: &str) -> Result<Self> {
        Self::from_slice(data.as_bytes())
    }

    /// Parse and validate raw config file bytes; invalid UTF-8 is a parse error
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(data)?;

        let object = value
            .as_object()
            .ok_or_else(|| Error::Configuration("JSON data not a dictionary.".to_string()))?;
        if let Some(missing) = REQUIRED_KEYS.iter().find(|key| !object.contains_key(**key)) {
            return Err(Error::Configuration(format!(
                "Missing key from JSON dict: {}",
                missing
            )));
        }

        let config: DeviceConfig = serde_json::from_value(value)?;
        if config.host.is_empty() || config.user.is_empty() || config.pass.is_empty() {
            return Err(Error::Configuration(
                "One or more JSON value is empty.".to_string(),
            ));
        }

        debug!("Got: {:?}", config);
        Ok(config)
    }

    /// Transport settings with the file's overrides applied
    pub fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::default();
        if let Some(secs) = self.request_interval_secs {
            config.request_interval = Duration::from_secs(secs);
        }
        config
    }

    /// Eject retry settings with the file's overrides applied
    pub fn eject_policy(&self) -> EjectPolicy {
        let mut policy = EjectPolicy::default();
        if let Some(secs) = self.busy_backoff_secs {
            policy.busy_backoff = Duration::from_secs(secs);
        }
        policy.max_attempts = self.max_eject_attempts;
        policy
    }
}

/// `.pv124t.json` in the user's home directory
pub fn default_config_path() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(CONFIG_FILE_NAME))
        .ok_or_else(|| {
            Error::Configuration("No home directory found, pass --config".to_string())
        })
}

// =============================================================================
// Tape List
// =============================================================================

/// Normalize tape arguments into a sorted, deduplicated set
///
/// Each argument may hold several labels separated by spaces or `|`.
/// Leading and trailing separators are ignored, an empty label anywhere
/// else (`A||B`) rejects the whole list.
pub fn parse_tape_list<S: AsRef<str>>(args: &[S]) -> Result<BTreeSet<String>> {
    let joined = args
        .iter()
        .map(|arg| arg.as_ref())
        .collect::<Vec<_>>()
        .join("|")
        .replace(' ', "|");
    let trimmed = joined.trim().trim_matches('|');

    let tapes: BTreeSet<String> = trimmed.split('|').map(str::to_string).collect();
    if trimmed.is_empty() || tapes.iter().any(|tape| tape.is_empty()) {
        return Err(Error::Configuration("No tapes specified.".to_string()));
    }

    debug!("Got tapes: {:?}", tapes);
    Ok(tapes)
}
