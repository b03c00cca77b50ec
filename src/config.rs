//! Layered configuration
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. a TOML file: `--config`, else `LOOM_CONFIG_PATH`, else `./loom.toml` if present
//! 3. environment variables prefixed `LOOM_`, sections split by `__`
//!    (e.g. `LOOM_WORKER__CONCURRENCY=4`)
//! 4. programmatic overrides set on [`ConfigBuilder`]
//!
//! A `.env` file in the working directory is loaded first, so it feeds layer 3.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_PREFIX: &str = "LOOM";
pub const CONFIG_PATH_ENV: &str = "LOOM_CONFIG_PATH";
pub const DEFAULT_CONFIG_NAME: &str = "loom";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid configuration value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub reducer: ReducerConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducerConfig {
    /// Nested reductions allowed before a pass fails
    pub max_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Foreign invocations running at once
    pub concurrency: usize,
    /// Root of the per-ticket work directories
    pub build_dir: PathBuf,
    /// Interpreter used for bash callables
    pub shell: String,
    /// Keep work directories after a successful invocation
    pub keep_work_dirs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive; `RUST_LOG` wins when set
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reducer: ReducerConfig {
                max_depth: crate::reducer::DEFAULT_MAX_DEPTH,
            },
            worker: WorkerConfig {
                concurrency: 8,
                build_dir: PathBuf::from("build"),
                shell: "bash".to_string(),
                keep_work_dirs: true,
            },
            logging: LoggingConfig {
                filter: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load from every layer with no programmatic overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reducer.max_depth == 0 {
            return Err(ConfigError::Invalid {
                key: "reducer.max_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.worker.concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "worker.concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.worker.shell.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "worker.shell",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Builder for loading [`Config`] with overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
    max_depth: Option<usize>,
    concurrency: Option<usize>,
    build_dir: Option<PathBuf>,
    keep_work_dirs: Option<bool>,
}

impl ConfigBuilder {
    /// Explicit config file; must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore `LOOM_*` variables and `.env`
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn concurrency(mut self, workers: Option<usize>) -> Self {
        self.concurrency = workers;
        self
    }

    pub fn build_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.build_dir = dir;
        self
    }

    pub fn keep_work_dirs(mut self, keep: Option<bool>) -> Self {
        self.keep_work_dirs = keep;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        if !self.skip_env {
            // Missing .env is fine
            let _ = dotenvy::dotenv();
        }

        let defaults = Config::default();
        let mut builder = ::config::Config::builder()
            .set_default("reducer.max_depth", defaults.reducer.max_depth as i64)?
            .set_default("worker.concurrency", defaults.worker.concurrency as i64)?
            .set_default(
                "worker.build_dir",
                defaults.worker.build_dir.to_string_lossy().into_owned(),
            )?
            .set_default("worker.shell", defaults.worker.shell)?
            .set_default("worker.keep_work_dirs", defaults.worker.keep_work_dirs)?
            .set_default("logging.filter", defaults.logging.filter)?;

        let env_path = if self.skip_env {
            None
        } else {
            std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
        };
        builder = match self.config_path.or(env_path) {
            Some(path) => builder.add_source(::config::File::from(path).required(true)),
            None => builder.add_source(::config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        if !self.skip_env {
            builder = builder.add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        if let Some(depth) = self.max_depth {
            builder = builder.set_override("reducer.max_depth", depth as i64)?;
        }
        if let Some(workers) = self.concurrency {
            builder = builder.set_override("worker.concurrency", workers as i64)?;
        }
        if let Some(dir) = self.build_dir {
            builder = builder.set_override("worker.build_dir", dir.to_string_lossy().into_owned())?;
        }
        if let Some(keep) = self.keep_work_dirs {
            builder = builder.set_override("worker.keep_work_dirs", keep)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
