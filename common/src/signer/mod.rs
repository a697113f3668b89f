use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use anyhow::Error;
use std::str::FromStr;
use tracing::debug;

/// Key material the node signs with.
#[derive(Debug, Clone)]
pub enum Signer {
    /// Key supplied by the operator.
    PrivateKey(PrivateKeySigner),
    /// Freshly generated key that only lives for the current process.
    Ephemeral(PrivateKeySigner),
}

impl Signer {
    pub fn from_private_key(private_key: &str) -> Result<Self, Error> {
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer = PrivateKeySigner::from_str(key)
            .map_err(|e| anyhow::anyhow!("Invalid private key: {e}"))?;
        Ok(Self::PrivateKey(signer))
    }

    pub fn ephemeral() -> Self {
        let signer = PrivateKeySigner::random();
        debug!("Generated ephemeral signer {}", signer.address());
        Self::Ephemeral(signer)
    }

    pub fn address(&self) -> Address {
        self.local().address()
    }

    pub fn local(&self) -> &PrivateKeySigner {
        match self {
            Signer::PrivateKey(signer) | Signer::Ephemeral(signer) => signer,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Signer::Ephemeral(_))
    }
}
