//! Configuration file support for steward.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `STEWARD_`, nested keys joined
//!    with `__`, e.g. `STEWARD_GITLAB__TOKEN`)
//! 3. Config file (./steward.toml, then ~/.config/steward/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [gitlab]
//! api_url = "https://gitlab.example.com/api/v4"
//! token = "glpat-..."  # or use STEWARD_GITLAB__TOKEN
//! per_page = 100
//! group_id = 42  # parent for `create-subgroup` without --parent
//!
//! [gitlab.exclusions]
//! cleanup_policies = [1234, 5678]
//!
//! [gitlab.mirror]
//! username = "mirror-bot"
//! token = "glpat-..."
//! group_path = "backup.example.com/mirrors"
//!
//! [fleet]
//! concurrency = 0  # 0 = unbounded
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use steward::fleet::MirrorTarget;

pub const DEFAULT_API_URL: &str = "https://gitlab.com/api/v4";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gitlab: GitLabConfig,
    pub fleet: FleetConfig,
}

/// GitLab configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// API base URL including the version path.
    pub api_url: String,
    /// Personal access token with `api` scope.
    pub token: Option<String>,
    /// Page size for listings (server default when unset).
    pub per_page: Option<u32>,
    /// Parent group used by `create-subgroup` when `--parent` is omitted.
    pub group_id: Option<u64>,
    pub exclusions: ExclusionsConfig,
    pub mirror: MirrorConfig,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            per_page: None,
            group_id: None,
            exclusions: ExclusionsConfig::default(),
            mirror: MirrorConfig::default(),
        }
    }
}

/// Projects excluded from specific policies.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExclusionsConfig {
    /// Project ids that never receive the cleanup policy.
    pub cleanup_policies: Vec<u64>,
}

/// Push-mirror target used by `mirroring` and `create-project --mirror`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub username: Option<String>,
    pub token: Option<String>,
    pub group_path: Option<String>,
}

/// Default fan-out options.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Maximum tasks in flight. 0 means unbounded.
    pub concurrency: usize,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/steward/config.toml)
    /// 3. Local config file (./steward.toml)
    /// 4. Environment variables with STEWARD_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("steward.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./steward.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // STEWARD_GITLAB__API_URL -> gitlab.api_url
        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix("STEWARD")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("gitlab.exclusions.cleanup_policies")
            .try_parsing(true)
    }

    /// Get the GitLab token.
    pub fn gitlab_token(&self) -> Option<String> {
        self.gitlab.token.clone()
    }

    pub fn cleanup_exclusions(&self) -> HashSet<u64> {
        self.gitlab
            .exclusions
            .cleanup_policies
            .iter()
            .copied()
            .collect()
    }

    /// Resolve the fan-out cap: CLI flag first, then config. 0 means unbounded.
    pub fn concurrency(&self, flag: Option<usize>) -> Option<usize> {
        match flag.unwrap_or(self.fleet.concurrency) {
            0 => None,
            n => Some(n),
        }
    }

    /// Parent of a new subgroup: CLI flag first, then config.
    pub fn parent_group(&self, flag: Option<u64>) -> Option<u64> {
        flag.or(self.gitlab.group_id)
    }

    /// The mirror target, if all three fields are configured.
    pub fn mirror_target(&self) -> Option<MirrorTarget> {
        let mirror = &self.gitlab.mirror;
        Some(MirrorTarget {
            username: mirror.username.clone()?,
            token: mirror.token.clone()?,
            group_path: mirror.group_path.clone()?,
        })
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "steward").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
