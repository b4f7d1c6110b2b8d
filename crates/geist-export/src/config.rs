//! Connector configuration loading
//!
//! The operator mounts the serialized `ConnectorSpec` as `config.yaml`. The
//! first search directory holding that file wins.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use geist_common::crd::ConnectorSpec;

use crate::error::{ExportError, Result};

/// File name looked up in each search directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Mount path inside the connector pod
pub const POD_CONFIG_DIR: &str = "/etc/config";

/// Directories searched for `config.yaml`, in priority order
///
/// `/etc/config`, then `$HOME/.config` when `HOME` is set, then `./configs`.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(POD_CONFIG_DIR)];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".config"));
    }
    paths.push(PathBuf::from("./configs"));
    paths
}

/// Load the connector configuration from the default search paths
pub fn load_config() -> Result<ConnectorSpec> {
    load_config_from(&search_paths())
}

/// Load the connector configuration from the first directory that has one
pub fn load_config_from(dirs: &[PathBuf]) -> Result<ConnectorSpec> {
    let path = dirs
        .iter()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| {
            let found = candidate.is_file();
            debug!(path = %candidate.display(), found, "config candidate");
            found
        })
        .ok_or_else(|| ExportError::ConfigNotFound {
            searched: dirs.to_vec(),
        })?;

    let spec = parse_config_file(&path)?;
    info!(
        path = %path.display(),
        endpoint = %spec.opcua.connection.endpoint,
        nodes = spec.opcua.subscription.nodeids.len(),
        "loaded connector configuration"
    );
    Ok(spec)
}

fn parse_config_file(path: &Path) -> Result<ConnectorSpec> {
    let raw = std::fs::read_to_string(path).map_err(|source| ExportError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ExportError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
