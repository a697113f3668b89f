use super::{AssetTransfer, Postcondition};
use crate::{
    bundle::{BundleEntry, ZERO_GAS_LEG_GAS_LIMIT},
    error::RescueError,
    l1::{ChainReader, bindings::IENSRegistry},
};
use alloy::{
    primitives::{Address, B256, keccak256},
    signers::local::PrivateKeySigner,
    sol_types::{SolCall, SolValue},
};
use std::sync::Arc;
use tracing::debug;

/// EIP-137 name hash. Labels are lower-cased before hashing.
pub fn namehash(name: &str) -> B256 {
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() {
        return B256::ZERO;
    }

    name.rsplit('.').fold(B256::ZERO, |node, label| {
        let label_hash = keccak256(label.to_lowercase().as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        keccak256(buf)
    })
}

pub struct DomainTransfer<R: ChainReader> {
    reader: Arc<R>,
    registry: Address,
    domain: String,
    node: B256,
    sender: PrivateKeySigner,
    recipient: Address,
}

impl<R: ChainReader> DomainTransfer<R> {
    pub fn new(
        reader: Arc<R>,
        registry: Address,
        domain: String,
        sender: PrivateKeySigner,
        recipient: Address,
    ) -> Self {
        let node = namehash(&domain);
        Self {
            reader,
            registry,
            domain,
            node,
            sender,
            recipient,
        }
    }
}

impl<R: ChainReader> AssetTransfer for DomainTransfer<R> {
    fn label(&self) -> &'static str {
        "ENS"
    }

    async fn build_zero_gas_legs(&self) -> Result<Vec<BundleEntry>, RescueError> {
        let signer = self.sender.address();
        let owner = self.reader.domain_owner(self.registry, self.node).await?;
        // Address equality compares bytes, so checksum casing never matters here.
        if owner != signer {
            return Err(RescueError::NotOwner {
                signer,
                domain: self.domain.clone(),
                owner,
            });
        }

        let nonce = self.reader.account_nonce(signer).await?;
        debug!("Domain {} ({}) transfer at nonce {}", self.domain, self.node, nonce);

        let input = IENSRegistry::setOwnerCall {
            node: self.node,
            owner: self.recipient,
        }
        .abi_encode();

        Ok(vec![BundleEntry::zero_gas(
            self.registry,
            input.into(),
            ZERO_GAS_LEG_GAS_LIMIT,
            nonce,
            self.sender.clone(),
        )])
    }

    async fn build_description(&self) -> Result<String, RescueError> {
        Ok(format!(
            "Transfer ENS domain {} from {} to {}",
            self.domain,
            self.sender.address(),
            self.recipient
        ))
    }

    async fn build_postcondition(&self) -> Result<Vec<Postcondition>, RescueError> {
        let payload = IENSRegistry::ownerCall { node: self.node }.abi_encode();
        Ok(vec![Postcondition {
            target: self.registry,
            payload: payload.into(),
            expected: self.recipient.abi_encode().into(),
        }])
    }
}
