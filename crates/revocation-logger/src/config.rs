//! Start-up configuration
//!
//! The logger is configured by three JSON files:
//! - its own config: log id, signing key, CA allow-list and relay policy
//! - the CA list: every CA's id, public key and URL, grouped by operator
//! - the log list: every log's id, public key and URL, used to find this
//!   logger's own entry and derive the address it listens on
//!
//! Anything wrong in these files is fatal at start-up and never afterwards.

use revocation_core::{HashAlgorithm, KeyPair, PublicKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::keys::{CaEntity, CaRegistry, LoggerIdentity, SelectionPolicy};
use crate::publisher::DEFAULT_ACCEPTED_REVOCATION_TYPE;

/// Port used when the log list URL does not name one
pub const DEFAULT_PORT: u16 = 6966;

/// Configuration errors, all fatal at start-up
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Logger with id [{0}] not found in log list")]
    NotInLogList(String),

    #[error("Invalid key for [{id}]: {reason}")]
    InvalidKey { id: String, reason: String },

    #[error("Private key does not match the log list key for [{0}]")]
    KeyMismatch(String),

    #[error("Duplicate CA id in CA list: {0}")]
    DuplicateCa(String),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),
}

/// The logger's own configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub log_id: String,

    /// Base64 Ed25519 seed
    pub private_key: String,

    /// CAs the relay may pick; every CA when absent
    #[serde(default)]
    pub ca_ids: Option<Vec<String>>,

    #[serde(default)]
    pub selection_policy: SelectionPolicy,

    #[serde(default = "default_accepted_revocation_type")]
    pub accepted_revocation_type: String,

    /// Commitment hash algorithm every CA must use
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
}

fn default_accepted_revocation_type() -> String {
    DEFAULT_ACCEPTED_REVOCATION_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaInfo {
    pub ca_id: String,
    /// Base64 Ed25519 public key
    pub ca_key: String,
    pub ca_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaOperator {
    pub name: String,
    pub cas: Vec<CaInfo>,
}

/// Every CA the logger knows, grouped by operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaList {
    pub operators: Vec<CaOperator>,
}

impl CaList {
    /// Decode every entry into a registry entity
    pub fn entities(&self) -> Result<Vec<CaEntity>, ConfigError> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();

        for operator in &self.operators {
            for ca in &operator.cas {
                if !seen.insert(ca.ca_id.as_str()) {
                    return Err(ConfigError::DuplicateCa(ca.ca_id.clone()));
                }
                let public_key = PublicKey::from_base64(&ca.ca_id, &ca.ca_key).map_err(|e| {
                    ConfigError::InvalidKey {
                        id: ca.ca_id.clone(),
                        reason: e.to_string(),
                    }
                })?;
                entities.push(CaEntity {
                    id: ca.ca_id.clone(),
                    public_key,
                    url: ca.ca_url.clone(),
                    operator: operator.name.clone(),
                });
            }
        }

        Ok(entities)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogInfo {
    pub log_id: String,
    /// Base64 Ed25519 public key
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOperator {
    pub name: String,
    pub logs: Vec<LogInfo>,
}

/// Every known log, grouped by operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogList {
    pub operators: Vec<LogOperator>,
}

impl LogList {
    pub fn find(&self, log_id: &str) -> Option<&LogInfo> {
        self.operators
            .iter()
            .flat_map(|op| op.logs.iter())
            .find(|log| log.log_id == log_id)
    }
}

/// Everything the server needs, validated
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub identity: LoggerIdentity,
    pub registry: CaRegistry,
    pub bind_address: String,
    pub accepted_revocation_type: String,
    pub hash_algorithm: HashAlgorithm,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and cross-check the three configuration files
pub fn load(
    config_path: impl AsRef<Path>,
    ca_list_path: impl AsRef<Path>,
    log_list_path: impl AsRef<Path>,
) -> Result<LoadedConfig, ConfigError> {
    let ca_list: CaList = read_json(ca_list_path.as_ref())?;
    let log_list: LogList = read_json(log_list_path.as_ref())?;
    let config: LoggerConfig = read_json(config_path.as_ref())?;

    resolve(config, &ca_list, &log_list)
}

/// Validate parsed configuration and build the logger's components
pub fn resolve(
    config: LoggerConfig,
    ca_list: &CaList,
    log_list: &LogList,
) -> Result<LoadedConfig, ConfigError> {
    let own = log_list
        .find(&config.log_id)
        .ok_or_else(|| ConfigError::NotInLogList(config.log_id.clone()))?;

    let key_pair = KeyPair::from_base64(&config.log_id, &config.private_key).map_err(|e| {
        ConfigError::InvalidKey {
            id: config.log_id.clone(),
            reason: e.to_string(),
        }
    })?;

    let listed = PublicKey::from_base64(&config.log_id, &own.key).map_err(|e| {
        ConfigError::InvalidKey {
            id: config.log_id.clone(),
            reason: e.to_string(),
        }
    })?;
    if listed != key_pair.public_key() {
        return Err(ConfigError::KeyMismatch(config.log_id));
    }

    let bind_address = bind_address_from_url(&own.url)?;

    let registry = CaRegistry::new(
        ca_list.entities()?,
        config.ca_ids.as_deref(),
        config.selection_policy,
    );

    info!(
        log_id = %config.log_id,
        bind_address = %bind_address,
        accepted_revocation_type = %config.accepted_revocation_type,
        hash_algorithm = %config.hash_algorithm,
        "Configuration loaded"
    );

    Ok(LoadedConfig {
        identity: LoggerIdentity::new(key_pair),
        registry,
        bind_address,
        accepted_revocation_type: config.accepted_revocation_type,
        hash_algorithm: config.hash_algorithm,
    })
}

/// Derive `host:port` from a log URL, defaulting the port to 6966
pub fn bind_address_from_url(url: &str) -> Result<String, ConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| ConfigError::InvalidAddress(url.into()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ConfigError::InvalidAddress(url.into()))?;
    let port = parsed.port().unwrap_or(DEFAULT_PORT);
    Ok(format!("{}:{}", host, port))
}
