use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::session::{SessionConfig, DEFAULT_DECLARED_DIFFICULTY, DEFAULT_HANDSHAKE_TIMEOUT};

/// The configuration file looked up in the working directory when no path is given.
pub const CONFIG: &str = "bazooka.toml";
const DEFAULT_PORT: u16 = 30303;
const DEFAULT_NETWORK_ID: u64 = 1337;

/// Everything needed to run an attack, read from the `bazooka.toml` file.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BazookaConfig {
    /// The target node's data directory, relative to the working directory.
    pub target_data_dir: PathBuf,
    /// The port the target listens on.
    #[serde(default = "default_port")]
    pub target_port: u16,
    /// The chain export to serve.
    pub chain: PathBuf,
    /// The attack script to execute once the target is synced.
    pub script: PathBuf,
    #[serde(default = "default_network_id")]
    pub network_id: u64,
    /// Total difficulty declared with crafted blocks.
    #[serde(default = "default_declared_difficulty")]
    pub declared_difficulty: u64,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_network_id() -> u64 {
    DEFAULT_NETWORK_ID
}

fn default_declared_difficulty() -> u64 {
    DEFAULT_DECLARED_DIFFICULTY as u64
}

fn default_handshake_timeout_secs() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT.as_secs()
}

impl BazookaConfig {
    /// Reads the configuration from `path`, or from [`CONFIG`] in the working directory.
    pub fn load(path: Option<&Path>) -> io::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => env::current_dir()?.join(CONFIG),
        };

        let config_string = fs::read_to_string(&path)?;
        Self::parse(&config_string)
    }

    pub fn parse(config_string: &str) -> io::Result<Self> {
        toml::from_str(config_string).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    /// The session tunables derived from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            declared_difficulty: self.declared_difficulty as u128,
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
        }
    }
}
