//! Loader for service configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults (every field has one, so an empty config is valid)
//! 2. an optional or required YAML/TOML/JSON file (`stelle.yaml`)
//! 3. `STELLE__`-prefixed environment variables, `__` separating sections,
//!    e.g. `STELLE__SERVER__PORT=9090`
//!
//! `${VAR}` placeholders inside string values are expanded after merging.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use stelle_common::observability::LogFormat;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StelleConfig {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed by CORS. A single `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
    pub status_policy: StatusPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            allowed_origins: vec!["http://localhost:3000".into()],
            status_policy: StatusPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// How failures of the download endpoint map onto HTTP status codes.
///
/// The JSON body is identical under both policies; only the status differs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// 400 for bad input, 502 for upstream failures, 500 for encoding failures.
    #[default]
    Semantic,
    /// Always 200; clients must inspect `success`.
    AlwaysOk,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            connect_timeout_secs: 5,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            stderr: true,
            filter: "info".into(),
        }
    }
}

impl StelleConfig {
    /// Reject values that parse but cannot work at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Message("server.host must not be empty".into()));
        }
        if self.server.allowed_origins.is_empty() {
            return Err(ConfigError::Message(
                "server.allowed_origins must list at least one origin (or \"*\")".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "fetch.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("fetch.user_agent must not be empty".into()));
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (files + env overrides).
pub struct StelleConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env: Environment,
}

impl Default for StelleConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl StelleConfigLoader {
    /// Start from the built-in defaults with `STELLE__` env overrides.
    ///
    /// ```
    /// use stelle_config::{StatusPolicy, StelleConfigLoader};
    ///
    /// let config = StelleConfigLoader::new()
    ///     .with_yaml_str("server:\n  port: 9000")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.server.port, 9000);
    /// assert_eq!(config.server.status_policy, StatusPolicy::Semantic);
    /// assert_eq!(config.fetch.timeout_secs, 15);
    /// ```
    pub fn new() -> Self {
        let env = Environment::with_prefix("STELLE")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("server.allowed_origins");
        Self {
            builder: Config::builder(),
            env,
        }
    }

    /// Attach a file that must exist; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is read when present and skipped otherwise.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use stelle_config::{LogFormat, StatusPolicy, StelleConfigLoader};
    ///
    /// let cfg = StelleConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// server:
    ///   status_policy: always_ok
    ///   allowed_origins: ["*"]
    /// logging:
    ///   format: json
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.server.status_policy, StatusPolicy::AlwaysOk);
    /// assert_eq!(cfg.server.allowed_origins, vec!["*".to_string()]);
    /// assert_eq!(cfg.logging.format, LogFormat::Json);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// Environment variables are layered last so they win over any file, then
    /// `${VAR}` placeholders are expanded and the result is validated.
    pub fn load(self) -> Result<StelleConfig, ConfigError> {
        let cfg = self.builder.add_source(self.env).build()?;

        // Convert to serde_json::Value first
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: StelleConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
