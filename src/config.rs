//! Configuration loading for all three services, keyed by service name.
//!
//! Mirrors the original DFS's per-service property sections, with defaults
//! baked in so a missing config file is not fatal.

use serde::Deserialize;
use std::fs;

fn default_mds_port() -> u16 {
    20000
}
fn default_cs_port() -> u16 {
    21000
}
fn default_access_port() -> u16 {
    22000
}
fn default_root_directory() -> String {
    "data".to_string()
}
fn default_chunk_size() -> u64 {
    64 * 1024
}
fn default_replica_count() -> usize {
    3
}
fn default_check_interval() -> u64 {
    5
}
fn default_liveness_window() -> u64 {
    5
}
fn default_heartbeat_interval() -> u64 {
    1
}
fn default_meta_server_address() -> String {
    "127.0.0.1:20000".to_string()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MdsConfig {
    pub port: u16,
    pub root_directory: String,
    /// Used by `create_file` when the caller doesn't supply `chunk_size`.
    pub default_chunk_size: u64,
    /// Used by `create_file`; immutable per-file after creation.
    pub default_replica_count: usize,
    /// How often the liveness checker wakes up, in seconds.
    pub check_interval_secs: u64,
    /// Maximum heartbeat staleness before a chunkserver is evicted, in seconds.
    pub liveness_window_secs: u64,
}

impl Default for MdsConfig {
    fn default() -> Self {
        Self {
            port: default_mds_port(),
            root_directory: default_root_directory(),
            default_chunk_size: default_chunk_size(),
            default_replica_count: default_replica_count(),
            check_interval_secs: default_check_interval(),
            liveness_window_secs: default_liveness_window(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CsConfig {
    pub port: u16,
    pub root_directory: String,
    pub meta_server_address: String,
    /// How often the chunkserver pushes its inventory to the MDS, in seconds.
    pub heartbeat_interval_secs: u64,
}

impl Default for CsConfig {
    fn default() -> Self {
        Self {
            port: default_cs_port(),
            root_directory: default_root_directory(),
            meta_server_address: default_meta_server_address(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub port: u16,
    pub meta_server_address: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            port: default_access_port(),
            meta_server_address: default_meta_server_address(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mds: MdsConfig,
    pub cs: CsConfig,
    pub access: AccessConfig,
}

/// Load configuration from a TOML file. A missing file is not an error —
/// callers get `Config::default()`; a present-but-malformed file is.
pub fn load_config(path: &str) -> anyhow::Result<Config> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path, "no config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}
