//! Configuration
//!
//! Layered with the `config` crate, lowest precedence first:
//! built-in defaults, a TOML file (`mortar.toml` in the working directory,
//! or an explicit path), then `MORTAR_*` environment variables where `__`
//! separates nested keys (`MORTAR_LIMITS__MAX_FRAMES=500`).

use std::path::{Path, PathBuf};

use config::{Config as Layers, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "mortar.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "MORTAR_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/* ===================== Settings ===================== */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub log: LogConfig,
}

/// Evaluation limits applied to every session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Live evaluation frames per run loop
    pub max_frames: usize,
    /// Nested procedure invocations
    pub max_call_depth: usize,
    /// Nested native run loops (expression substitutions, coroutine resumes)
    pub max_nesting: usize,
    /// Syntax nodes per parsed script
    pub max_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_frames: 10_000,
            max_call_depth: 1_000,
            max_nesting: 200,
            max_nodes: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load using the default file lookup and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        for (name, value) in [
            ("limits.max_frames", limits.max_frames),
            ("limits.max_call_depth", limits.max_call_depth),
            ("limits.max_nesting", limits.max_nesting),
            ("limits.max_nodes", limits.max_nodes),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("log.filter must not be empty".into()));
        }
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/* ===================== Builder ===================== */

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
    max_frames: Option<usize>,
    max_call_depth: Option<usize>,
    max_nesting: Option<usize>,
    log_filter: Option<String>,
}

impl ConfigBuilder {
    /// Explicit configuration file; it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore `MORTAR_*` environment variables
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn max_frames(mut self, value: Option<usize>) -> Self {
        self.max_frames = value;
        self
    }

    pub fn max_call_depth(mut self, value: Option<usize>) -> Self {
        self.max_call_depth = value;
        self
    }

    pub fn max_nesting(mut self, value: Option<usize>) -> Self {
        self.max_nesting = value;
        self
    }

    pub fn log_filter(mut self, value: Option<String>) -> Self {
        self.log_filter = value;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let defaults = toml::to_string(&Config::default())?;
        let mut layers =
            Layers::builder().add_source(File::from_str(&defaults, FileFormat::Toml));

        let explicit = self
            .config_path
            .clone()
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path));
                }
                layers = layers.add_source(file_source(&path).required(true));
            }
            None => {
                layers = layers.add_source(file_source(Path::new(DEFAULT_CONFIG_FILE)).required(false));
            }
        }

        if !self.skip_env {
            layers = layers.add_source(
                Environment::with_prefix("MORTAR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: Config = layers.build()?.try_deserialize()?;

        if let Some(v) = self.max_frames {
            config.limits.max_frames = v;
        }
        if let Some(v) = self.max_call_depth {
            config.limits.max_call_depth = v;
        }
        if let Some(v) = self.max_nesting {
            config.limits.max_nesting = v;
        }
        if let Some(v) = self.log_filter {
            config.log.filter = v;
        }

        config.validate()?;
        Ok(config)
    }
}

fn file_source(path: &Path) -> File<config::FileSourceFile, FileFormat> {
    File::from(path).format(FileFormat::Toml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.limits.max_frames, 10_000);
        assert_eq!(config.limits.max_call_depth, 1_000);
        assert_eq!(config.log.filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("mortar-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("override.toml");
        let mut file = std::fs::File::create(&path).expect("create file");
        writeln!(file, "[limits]\nmax_frames = 42\n\n[log]\nfilter = \"debug\"").expect("write");

        let config = Config::builder()
            .config_path(Some(path.clone()))
            .without_env()
            .build()
            .expect("config loads");
        assert_eq!(config.limits.max_frames, 42);
        assert_eq!(config.limits.max_nesting, 200);
        assert_eq!(config.log.filter, "debug");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::builder()
            .config_path(Some(PathBuf::from("/definitely/not/here.toml")))
            .without_env()
            .build()
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_builder_overrides_and_validation() {
        let config = Config::builder()
            .without_env()
            .max_call_depth(Some(5))
            .build()
            .expect("config loads");
        assert_eq!(config.limits.max_call_depth, 5);

        let err = Config::builder()
            .without_env()
            .max_frames(Some(0))
            .build()
            .expect_err("zero is rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_renders_as_toml() {
        let text = Config::default().to_toml().expect("renders");
        assert!(text.contains("[limits]"));
        assert!(text.contains("max_frames = 10000"));
    }
}
