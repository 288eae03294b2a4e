use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found. Set up a principal first.")]
    NotFound,
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Could not determine home directory")]
    NoHomeDir,
    #[error("No principals configured")]
    NoPrincipals,
    #[error("Principal '{0}' not found")]
    PrincipalNotFound(String),
}

/// Client configuration stored in ~/.vaultshare/config.json
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientConfig {
    pub principals: Vec<PrincipalConfig>,
    #[serde(default)]
    pub current_principal: Option<String>, // Name of current principal
}

/// Principal (device) configuration with cryptographic keys
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PrincipalConfig {
    pub name: String,
    pub user_id: String,
    pub x25519_private_key: String,  // X25519 private key (hex-encoded)
    pub ed25519_private_key: String, // Ed25519 private key (hex-encoded)
    #[serde(default)]
    pub vault_root_keys: BTreeMap<String, String>, // vault id -> root key (hex)
}

impl ClientConfig {
    /// Load config from default path (~/.vaultshare/config.json)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path()?)
    }

    /// Load config from custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Save config to custom path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self)?)?;
        Ok(())
    }

    /// Get default config path (~/.vaultshare/config.json)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".vaultshare")
            .join("config.json"))
    }

    /// Get the current active principal
    pub fn get_current_principal(&self) -> Result<&PrincipalConfig, ConfigError> {
        let principal_name = self
            .current_principal
            .as_ref()
            .or_else(|| self.principals.first().map(|p| &p.name))
            .ok_or(ConfigError::NoPrincipals)?;

        self.get_principal(principal_name)
    }

    /// Get a principal by name
    pub fn get_principal(&self, name: &str) -> Result<&PrincipalConfig, ConfigError> {
        self.principals
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::PrincipalNotFound(name.to_string()))
    }
}

impl PrincipalConfig {
    /// Parse the user id
    pub fn user_uuid(&self) -> Result<Uuid, String> {
        Uuid::parse_str(&self.user_id).map_err(|e| format!("Invalid user id: {}", e))
    }

    /// Get X25519 private key as bytes (32 bytes)
    pub fn get_x25519_private_key_bytes(&self) -> Result<[u8; 32], String> {
        decode_key(&self.x25519_private_key, "X25519 private key")
    }

    /// Get Ed25519 private key as bytes (32 bytes)
    pub fn get_ed25519_private_key_bytes(&self) -> Result<[u8; 32], String> {
        decode_key(&self.ed25519_private_key, "Ed25519 private key")
    }

    /// Root key of a vault, if this principal holds one
    pub fn vault_root_key(&self, vault_id: &Uuid) -> Option<&str> {
        self.vault_root_keys
            .get(&vault_id.to_string())
            .map(String::as_str)
    }
}

fn decode_key(hex_key: &str, what: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(hex_key).map_err(|e| format!("Invalid {} hex: {}", what, e))?;
    bytes
        .try_into()
        .map_err(|_| format!("{} must be exactly 32 bytes", what))
}
