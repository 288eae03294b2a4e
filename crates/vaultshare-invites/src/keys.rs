use vaultshare_config::{ClientConfig, ConfigError, PrincipalConfig};
use vaultshare_crypto::{KeyPairs, Keypair, SigningKeypair};
use vaultshare_model::{KeyError, KeySource, UserId, VaultId};

/// `KeySource` backed by a principal from the client config file.
///
/// Keys are decoded on every call, so edits to the principal are picked up by
/// the next batch.
#[derive(Clone)]
pub struct ConfigKeySource {
    principal: PrincipalConfig,
}

impl ConfigKeySource {
    pub fn new(principal: PrincipalConfig) -> Self {
        Self { principal }
    }

    /// Use the config's current principal
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.get_current_principal()?.clone()))
    }

    pub fn user_id(&self) -> Result<UserId, KeyError> {
        self.principal
            .user_uuid()
            .map(UserId)
            .map_err(KeyError::Invalid)
    }
}

impl KeySource for ConfigKeySource {
    fn current_key_pairs(&self) -> Result<KeyPairs, KeyError> {
        if self.principal.x25519_private_key.is_empty()
            || self.principal.ed25519_private_key.is_empty()
        {
            return Err(KeyError::Unavailable);
        }

        let encryption = self
            .principal
            .get_x25519_private_key_bytes()
            .map_err(KeyError::Invalid)?;
        let signing = self
            .principal
            .get_ed25519_private_key_bytes()
            .map_err(KeyError::Invalid)?;

        Ok(KeyPairs {
            encryption: Keypair::from_secret_bytes(&encryption),
            signing: SigningKeypair::from_secret_bytes(&signing),
        })
    }

    fn vault_root_key(&self, vault_id: &VaultId) -> Result<String, KeyError> {
        self.principal
            .vault_root_key(&vault_id.0)
            .map(str::to_string)
            .ok_or_else(|| KeyError::MissingRootKey(vault_id.clone()))
    }
}
