//! Kubeconfig files written for fetched clusters.
//!
//! Documents land in a `kubeconfig/` directory next to the config file
//! (`~/.dev-tool/kubeconfig/<cluster>` by default), one file per cluster,
//! readable by the owner only.

use std::path::{Path, PathBuf};

use crate::config::{write_private, ConfigError};

const KUBECONFIG_DIR: &str = "kubeconfig";

/// Directory kubeconfig files are written to for the config at `config_path`.
pub fn directory_for(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(KUBECONFIG_DIR)
}

/// Write `document` for `cluster_name` into `dir`, replacing any earlier copy.
pub fn store(dir: &Path, cluster_name: &str, document: &str) -> Result<PathBuf, ConfigError> {
    let invalid = cluster_name.is_empty()
        || cluster_name == "."
        || cluster_name == ".."
        || cluster_name.contains(|c: char| c == '/' || c == '\\');
    if invalid {
        return Err(ConfigError::InvalidClusterName(cluster_name.to_string()));
    }
    let path = dir.join(cluster_name);
    write_private(&path, document)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_next_to_config() {
        let dir = directory_for(Path::new("/home/me/.dev-tool/dev-tool.toml"));
        assert_eq!(dir, PathBuf::from("/home/me/.dev-tool/kubeconfig"));
    }

    #[test]
    fn document_is_written_verbatim_and_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(KUBECONFIG_DIR);

        store(&dir, "cluster-a", "first").unwrap();
        let path = store(&dir, "cluster-a", "apiVersion: v1\n").unwrap();

        assert_eq!(path, dir.join("cluster-a"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "apiVersion: v1\n");
    }

    #[cfg(unix)]
    #[test]
    fn document_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = store(tmp.path(), "cluster-a", "apiVersion: v1\n").unwrap();
        let mode = std::fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn path_like_names_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["", "..", "a/b", "..\\x"] {
            let err = store(tmp.path(), name, "x").unwrap_err();
            assert!(matches!(err, ConfigError::InvalidClusterName(_)), "{name}");
        }
    }
}
