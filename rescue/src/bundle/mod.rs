//! Bundle legs and their signed form.
//!
//! Every leg is a legacy transaction. The asset leg always carries a zero gas
//! price; the block producer is paid by the briber leg through the helper
//! contract, never through gas.

use crate::error::RescueError;
use alloy::{
    eips::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, B256, Bytes, U256},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use tracing::info;

/// Gas ceiling for the zero-gas asset leg. Enough for standard `transfer` and `setOwner`.
pub const ZERO_GAS_LEG_GAS_LIMIT: u64 = 120_000;
pub const PERMIT_BRIBER_GAS_LIMIT: u64 = 400_000;
pub const DIRECT_BRIBER_GAS_LIMIT: u64 = 600_000;

#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub nonce: u64,
    pub signer: PrivateKeySigner,
}

impl BundleEntry {
    /// A call that pays nothing for gas.
    pub fn zero_gas(
        to: Address,
        input: Bytes,
        gas_limit: u64,
        nonce: u64,
        signer: PrivateKeySigner,
    ) -> Self {
        Self {
            to,
            input,
            value: U256::ZERO,
            gas_price: 0,
            gas_limit,
            nonce,
            signer,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn from(&self) -> Address {
        self.signer.address()
    }

    fn to_request(&self, chain_id: u64) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.from())
            .with_to(self.to)
            .with_input(self.input.clone())
            .with_value(self.value)
            .with_gas_price(self.gas_price)
            .with_gas_limit(self.gas_limit)
            .with_nonce(self.nonce)
            .with_chain_id(chain_id)
    }
}

/// Orders the legs: asset leg first, briber leg last.
pub fn assemble(
    asset_legs: Vec<BundleEntry>,
    briber_leg: BundleEntry,
) -> Result<Vec<BundleEntry>, RescueError> {
    if asset_legs.len() != 1 {
        return Err(RescueError::Any(anyhow::anyhow!(
            "Expected exactly one asset leg, got {}",
            asset_legs.len()
        )));
    }
    if asset_legs.iter().any(|leg| leg.gas_price != 0) {
        return Err(RescueError::Any(anyhow::anyhow!(
            "Asset leg must not pay for gas"
        )));
    }

    let mut entries = asset_legs;
    entries.push(briber_leg);
    Ok(entries)
}

#[derive(Debug, Clone)]
pub struct SignedLeg {
    pub raw: Bytes,
    pub hash: B256,
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
}

#[derive(Debug, Clone)]
pub struct SignedBundle {
    legs: Vec<SignedLeg>,
}

impl SignedBundle {
    pub async fn sign(entries: &[BundleEntry], chain_id: u64) -> Result<Self, RescueError> {
        let mut legs = Vec::with_capacity(entries.len());
        for entry in entries {
            let wallet = EthereumWallet::from(entry.signer.clone());
            let envelope = entry
                .to_request(chain_id)
                .build(&wallet)
                .await
                .map_err(|e| {
                    RescueError::Any(anyhow::anyhow!(
                        "Failed to sign bundle leg from {}: {e}",
                        entry.from()
                    ))
                })?;

            legs.push(SignedLeg {
                raw: envelope.encoded_2718().into(),
                hash: *envelope.tx_hash(),
                from: entry.from(),
                to: entry.to,
                nonce: entry.nonce,
            });
        }
        Ok(Self { legs })
    }

    pub fn legs(&self) -> &[SignedLeg] {
        &self.legs
    }

    pub fn raw_transactions(&self) -> Vec<Bytes> {
        self.legs.iter().map(|leg| leg.raw.clone()).collect()
    }

    pub fn hashes(&self) -> Vec<B256> {
        self.legs.iter().map(|leg| leg.hash).collect()
    }

    /// Hash of the first leg, the asset transfer.
    pub fn first_hash(&self) -> Option<B256> {
        self.legs.first().map(|leg| leg.hash)
    }

    pub fn log_transactions(&self) {
        for (idx, leg) in self.legs.iter().enumerate() {
            info!(
                "Bundle tx #{}: hash {} | from {} | to {} | nonce {}",
                idx, leg.hash, leg.from, leg.to, leg.nonce
            );
        }
    }
}
