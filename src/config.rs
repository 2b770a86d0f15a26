use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    /// Directory holding `<year>/<semester><S|T>/<course>` folders.
    pub root_path: PathBuf,
    /// Path or URL of the remote course manifest.
    pub manifest: Option<String>,
    pub scan_threads: usize,
    pub download_threads: usize,
    pub download_retries: u32,
    pub retry_backoff_ms: u64,
    pub request_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
    pub stats_csv: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("./CLIP"),
            manifest: None,
            scan_threads: 8,
            download_threads: 4,
            download_retries: 3,
            retry_backoff_ms: 300,
            request_timeout_secs: 60,
            log_file: None,
            stats_csv: None,
        }
    }
}

impl AppConfig {
    /// Defaults, then `Config.toml` (or `path`), then `CLIP_*` variables.
    pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let mut builder = Config::builder()
            .set_default("root_path", defaults.root_path.to_string_lossy().into_owned())?
            .set_default("scan_threads", defaults.scan_threads as u64)?
            .set_default("download_threads", defaults.download_threads as u64)?
            .set_default("download_retries", defaults.download_retries as u64)?
            .set_default("retry_backoff_ms", defaults.retry_backoff_ms)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?;

        builder = match path {
            Some(path) => builder.add_source(ConfigFile::from(path).required(true)),
            None => builder.add_source(ConfigFile::with_name("Config").required(false)),
        };

        builder
            .add_source(Environment::with_prefix("CLIP").try_parsing(true))
            .build()?
            .try_deserialize::<AppConfig>()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.toml");
        fs::write(
            &path,
            "root_path = \"/srv/clip\"\nmanifest = \"courses.json\"\ndownload_threads = 2\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.root_path, PathBuf::from("/srv/clip"));
        assert_eq!(config.manifest.as_deref(), Some("courses.json"));
        assert_eq!(config.download_threads, 2);
        assert_eq!(config.scan_threads, 8);
        assert_eq!(config.retry_backoff(), Duration::from_millis(300));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn prints_as_toml() {
        let toml = AppConfig::default().to_toml().unwrap();
        assert!(toml.contains("root_path = \"./CLIP\""));
        assert!(toml.contains("scan_threads = 8"));
    }
}
