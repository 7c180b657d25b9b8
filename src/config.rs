//! Repository-wide defaults.
//!
//! [`RepositoryConfig`] is read from the `[repository]` table of `config/repoquery.toml`
//! and from `REPOQUERY__REPOSITORY__*` environment variables. These are the lowest-priority
//! settings: method annotations override them, and call-time arguments override both.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;

pub const DEFAULT_CONFIG_PATH: &str = "config/repoquery.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryConfig {
    /// Fetch plan used when neither the call nor the method names one.
    #[serde(default = "default_fetch_plan")]
    pub default_fetch_plan: String,
    /// Compile every method when the repository is built instead of on first use.
    #[serde(default = "default_eager_compile")]
    pub eager_compile: bool,
    /// Hints added to every load unless the method or the call sets them.
    #[serde(default)]
    pub default_hints: BTreeMap<String, String>,
}

fn default_fetch_plan() -> String {
    crate::backend::BASE_FETCH_PLAN.to_string()
}

fn default_eager_compile() -> bool {
    true
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_fetch_plan: default_fetch_plan(),
            eager_compile: default_eager_compile(),
            default_hints: BTreeMap::new(),
        }
    }
}

impl RepositoryConfig {
    /// Load from `config/repoquery.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from the TOML file at `path` (optional) layered under the environment.
    ///
    /// A file that exists but cannot be read or parsed is skipped with a warning. A missing
    /// `[repository]` table yields the defaults.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("REPOQUERY").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(path).exists() {
                    log::warn!("failed to load {}, falling back to env: {}", path, err);
                }
                Config::builder()
                    .add_source(Environment::with_prefix("REPOQUERY").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        match settings.get::<RepositoryConfig>("repository") {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Repository configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }
}
