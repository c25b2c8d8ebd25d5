//! The dev-tool configuration file.
//!
//! A TOML document, by default `~/.dev-tool/dev-tool.toml`:
//!
//! ```toml
//! [[rancher.clusters]]
//! environment = "prod"
//! url = "https://kube-api.prod"
//! token = "token-abc12:s3cret"
//!
//! [[kubernetes.clusters]]
//! cluster_name = "cluster-a"
//! kubeconfig = "/home/me/.dev-tool/kubeconfig/cluster-a"
//! ```
//!
//! The file holds API tokens, so it is only ever written with mode `0600`
//! inside a `0700` directory.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "DEV_TOOL_CONFIG";

const APP_DIR: &str = ".dev-tool";
const CONFIG_FILE: &str = "dev-tool.toml";

/// Token value written into freshly created config files.
pub const PLACEHOLDER_TOKEN: &str = "changeme";

/// Errors reading, writing or querying the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `$HOME` could not be determined.
    #[error("could not determine the home directory")]
    NoHomeDir,

    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// The in-memory config could not be rendered.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No `[[rancher.clusters]]` entry for the requested environment.
    #[error("environment {0} not found in config")]
    EnvironmentNotFound(String),

    /// A cluster name that cannot be used as a file name.
    #[error("invalid cluster name {0:?}")]
    InvalidClusterName(String),
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The whole config file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Management servers, one per environment.
    #[serde(default)]
    pub rancher: RancherSection,
    /// Kubeconfig files written by `setup` / `kubeconfig`.
    #[serde(default)]
    pub kubernetes: KubernetesSection,
}

/// `[rancher]` table.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RancherSection {
    /// `[[rancher.clusters]]` entries.
    #[serde(default)]
    pub clusters: Vec<RancherEnvironment>,
}

/// One management server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RancherEnvironment {
    /// Environment name used with `-e`.
    pub environment: String,
    /// Server URL.
    pub url: String,
    /// API token (`access:secret`).
    pub token: String,
    /// Skip TLS certificate verification for this server.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub insecure_skip_tls_verify: bool,
}

/// `[kubernetes]` table.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct KubernetesSection {
    /// `[[kubernetes.clusters]]` entries.
    #[serde(default)]
    pub clusters: Vec<KubernetesCluster>,
}

/// A kubeconfig file written for a cluster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KubernetesCluster {
    /// Cluster display name.
    pub cluster_name: String,
    /// Location of the kubeconfig file.
    pub kubeconfig: PathBuf,
}

// ---------------------------------------------------------------------------
// Loading / saving
// ---------------------------------------------------------------------------

impl Config {
    /// Config written on first run: `prod` and `test` with placeholder values.
    pub fn initial() -> Self {
        let environment = |name: &str| RancherEnvironment {
            environment: name.to_string(),
            url: format!("https://kube-api.{name}"),
            token: PLACEHOLDER_TOKEN.to_string(),
            insecure_skip_tls_verify: false,
        };
        Self {
            rancher: RancherSection {
                clusters: vec![environment("prod"), environment("test")],
            },
            kubernetes: KubernetesSection::default(),
        }
    }

    /// Where the config lives: `explicit`, else `$DEV_TOOL_CONFIG`, else
    /// `~/.dev-tool/dev-tool.toml`.
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Read the config at `path`, creating [`Config::initial`] there first
    /// if the file does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::initial();
            config.save(path)?;
            info!(path = %path.display(), "created default config");
            return Ok(config);
        }
        Self::load(path)
    }

    /// Read the config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config to `path` with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        write_private(path, &content)
    }

    // ------------------------------------------------------------------
    // Queries / updates
    // ------------------------------------------------------------------

    /// The entry for `environment`.
    pub fn environment(&self, environment: &str) -> Result<&RancherEnvironment, ConfigError> {
        self.rancher
            .clusters
            .iter()
            .find(|e| e.environment == environment)
            .ok_or_else(|| ConfigError::EnvironmentNotFound(environment.to_string()))
    }

    /// Replace the token of `environment`.
    pub fn set_token(&mut self, environment: &str, token: &str) -> Result<(), ConfigError> {
        let entry = self
            .rancher
            .clusters
            .iter_mut()
            .find(|e| e.environment == environment)
            .ok_or_else(|| ConfigError::EnvironmentNotFound(environment.to_string()))?;
        entry.token = token.to_string();
        Ok(())
    }

    /// Record where the kubeconfig of `cluster_name` was written.
    pub fn record_kubeconfig(&mut self, cluster_name: &str, kubeconfig: &Path) {
        let clusters = &mut self.kubernetes.clusters;
        match clusters.iter_mut().find(|c| c.cluster_name == cluster_name) {
            Some(entry) => entry.kubeconfig = kubeconfig.to_path_buf(),
            None => clusters.push(KubernetesCluster {
                cluster_name: cluster_name.to_string(),
                kubeconfig: kubeconfig.to_path_buf(),
            }),
        }
    }
}

/// Write `content` to `path`, readable by the owner only.
///
/// Missing parent directories are created with mode `0700`.
pub(crate) fn write_private(path: &Path, content: &str) -> Result<(), ConfigError> {
    let write_err = |source: io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_private_dir(parent).map_err(write_err)?;
    }
    let mut file = private_file(path).map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.flush().map_err(write_err)
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn private_file(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // The mode above only applies to new files.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn private_file(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}
