use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration loaded from `~/.config/chiptrack/config.toml`.
///
/// Missing keys fall back to their defaults, so a config file written by an
/// older build keeps loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChiptrackConfig {
    /// Number of concurrent range requests per download.
    pub workers: usize,
    /// Audio output buffer length in milliseconds.
    pub buffer_ms: u64,
    /// Deadline for fetching one track (HEAD probe plus every chunk).
    pub request_timeout_secs: u64,
    /// TCP/TLS connect timeout per request.
    pub connect_timeout_secs: u64,
    /// Substring of the output device name; `None` uses the host default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for ChiptrackConfig {
    fn default() -> Self {
        Self {
            workers: 40,
            buffer_ms: 100,
            request_timeout_secs: 60,
            connect_timeout_secs: 15,
            output_device: None,
        }
    }
}

impl ChiptrackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.buffer_ms == 0 {
            anyhow::bail!("buffer_ms must be at least 1");
        }
        Ok(())
    }

    pub fn buffer(&self) -> Duration {
        Duration::from_millis(self.buffer_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("chiptrack")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ChiptrackConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] but for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<ChiptrackConfig> {
    if !path.exists() {
        let default_cfg = ChiptrackConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)
            .with_context(|| format!("failed to write default config {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: ChiptrackConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ChiptrackConfig::default();
        assert_eq!(cfg.workers, 40);
        assert_eq!(cfg.buffer(), Duration::from_millis(100));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(15));
        assert!(cfg.output_device.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ChiptrackConfig {
            output_device: Some("USB".to_string()),
            ..ChiptrackConfig::default()
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ChiptrackConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            workers = 8
            output_device = "pulse"
        "#;
        let cfg: ChiptrackConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.output_device.as_deref(), Some("pulse"));
        assert_eq!(cfg.buffer_ms, 100);
        assert_eq!(cfg.request_timeout_secs, 60);
    }

    #[test]
    fn validate_rejects_zero_workers_and_buffer() {
        let cfg = ChiptrackConfig {
            workers: 0,
            ..ChiptrackConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = ChiptrackConfig {
            buffer_ms: 0,
            ..ChiptrackConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_or_init_writes_default_then_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let first = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(first, ChiptrackConfig::default());

        fs::write(&path, "workers = 3\nbuffer_ms = 250\n").unwrap();
        let second = load_or_init_at(&path).unwrap();
        assert_eq!(second.workers, 3);
        assert_eq!(second.buffer_ms, 250);
    }

    #[test]
    fn load_or_init_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "workers = 0\n").unwrap();
        assert!(load_or_init_at(&path).is_err());
    }
}
