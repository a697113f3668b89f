//! Private bundle relay speaking the Flashbots JSON-RPC dialect.

pub mod resolution;
pub mod types;

pub use resolution::{BundleResolution, ChainResolver, InclusionResolver};
pub use types::{BundleSimulation, LegSimulation};

use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256, Bytes},
    providers::{DynProvider, Provider, ProviderBuilder, ext::MevApi},
    rpc::{
        client::RpcClient,
        types::mev::{EthCallBundle, EthSendBundle},
    },
    signers::local::PrivateKeySigner,
    transports::http::{Http, reqwest::Url},
};
use anyhow::Error;
use std::{future::Future, time::Duration};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub trait BundleRelay: Send + Sync {
    /// `eth_callBundle` for `block`, executed on top of the latest state.
    fn simulate_bundle(
        &self,
        txs: &[Bytes],
        block: u64,
    ) -> impl Future<Output = Result<BundleSimulation, Error>> + Send;

    /// `eth_sendBundle` targeting exactly `block`. Returns the bundle hash when the relay reports one.
    fn send_bundle(
        &self,
        txs: &[Bytes],
        block: u64,
    ) -> impl Future<Output = Result<Option<B256>, Error>> + Send;
}

/// Every request carries an `X-Flashbots-Signature` made with `auth_signer`.
pub struct RelayClient {
    provider: DynProvider,
    /// Identifies the searcher to the relay. Holds no funds.
    auth_signer: PrivateKeySigner,
}

impl RelayClient {
    pub fn new(url: &str, auth_signer: PrivateKeySigner) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid relay URL '{url}': {e}"))?;
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build relay HTTP client: {e}"))?;
        let client = RpcClient::new(Http::with_client(http_client, url), false);

        Ok(Self {
            provider: ProviderBuilder::new().connect_client(client).erased(),
            auth_signer,
        })
    }

    pub fn auth_address(&self) -> Address {
        self.auth_signer.address()
    }
}

impl BundleRelay for RelayClient {
    async fn simulate_bundle(&self, txs: &[Bytes], block: u64) -> Result<BundleSimulation, Error> {
        let bundle = EthCallBundle {
            txs: txs.to_vec(),
            block_number: block,
            state_block_number: BlockNumberOrTag::Latest,
            ..Default::default()
        };
        let response = self
            .provider
            .call_bundle(bundle)
            .with_auth(self.auth_signer.clone())
            .await
            .map_err(|e| anyhow::anyhow!("eth_callBundle for block {block} failed: {e}"))?
            .ok_or_else(|| anyhow::anyhow!("Relay returned no simulation for block {block}"))?;
        debug!(
            "eth_callBundle for block {}: coinbase diff {}, {} results",
            block,
            response.coinbase_diff,
            response.results.len()
        );
        Ok(response.into())
    }

    async fn send_bundle(&self, txs: &[Bytes], block: u64) -> Result<Option<B256>, Error> {
        let bundle = EthSendBundle {
            txs: txs.to_vec(),
            block_number: block,
            ..Default::default()
        };
        let response = self
            .provider
            .send_bundle(bundle)
            .with_auth(self.auth_signer.clone())
            .await
            .map_err(|e| anyhow::anyhow!("eth_sendBundle for block {block} failed: {e}"))?;
        Ok(response.map(|hash| hash.bundle_hash))
    }
}
