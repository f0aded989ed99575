use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::progress::ProgressMode;
use crate::transfer::TransferSettings;
use crate::validate::MAX_UPLOAD_BYTES;

pub const CONFIG_FILENAME: &str = "repitch.json";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/audio/pitch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub max_upload_bytes: u64,
    pub tick_interval_ms: u64,
    /// 0 disables the deadline.
    pub timeout_secs: u64,
    pub progress: ProgressMode,
    pub output_dir: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            tick_interval_ms: 500,
            timeout_secs: 300,
            progress: ProgressMode::Upload,
            output_dir: PathBuf::from("."),
            log_file: None,
        }
    }
}

impl ClientConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Explicit path if given, else `repitch.json` in `dir` if present, else
    /// defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let local = dir.join(CONFIG_FILENAME);
        if local.is_file() {
            return Self::from_file(&local);
        }
        Ok(Self::default())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn transfer_settings(&self) -> TransferSettings {
        TransferSettings {
            endpoint: self.endpoint.clone(),
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            timeout: self.timeout(),
            progress: self.progress,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("repitch.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(c.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(c.timeout(), Some(Duration::from_secs(300)));
        assert_eq!(c.transfer_settings().tick_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"{ "endpoint": "http://example.com/pitch", "timeout_secs": 0, "progress": "heuristic" }"#,
        )
        .unwrap();

        let c = ClientConfig::load(None, dir.path()).unwrap();
        assert_eq!(c.endpoint, "http://example.com/pitch");
        assert_eq!(c.timeout(), None);
        assert_eq!(c.progress, ProgressMode::Heuristic);
        assert_eq!(c.tick_interval_ms, 500);
    }

    #[test]
    fn test_missing_local_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ClientConfig::load(None, dir.path()).unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ClientConfig::load(Some(&path), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }
}
