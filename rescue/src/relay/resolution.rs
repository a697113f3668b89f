use crate::{bundle::SignedBundle, l1::InclusionView};
use anyhow::Error;
use std::{future::Future, sync::Arc, time::Duration};
use strum::Display;
use tracing::debug;

/// What happened to a bundle once its target block exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BundleResolution {
    BundleIncluded,
    BlockPassedWithoutInclusion,
    AccountNonceTooHigh,
}

pub trait InclusionResolver: Send + Sync {
    fn resolve(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
    ) -> impl Future<Output = Result<BundleResolution, Error>> + Send;
}

impl<T: InclusionResolver> InclusionResolver for Arc<T> {
    fn resolve(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
    ) -> impl Future<Output = Result<BundleResolution, Error>> + Send {
        self.as_ref().resolve(bundle, target_block)
    }
}

/// Resolves by watching the chain until the target block is mined.
pub struct ChainResolver<V: InclusionView> {
    view: Arc<V>,
    poll_interval: Duration,
}

impl<V: InclusionView> ChainResolver<V> {
    pub fn new(view: Arc<V>, poll_interval: Duration) -> Self {
        Self {
            view,
            poll_interval,
        }
    }

    async fn wait_for_block(&self, target_block: u64) -> Result<(), Error> {
        loop {
            let head = self.view.block_number().await?;
            if head >= target_block {
                return Ok(());
            }
            debug!("Waiting for block {}, head is {}", target_block, head);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl<V: InclusionView> InclusionResolver for ChainResolver<V> {
    async fn resolve(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
    ) -> Result<BundleResolution, Error> {
        self.wait_for_block(target_block).await?;

        let block_hashes = self
            .view
            .block_transaction_hashes(target_block)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Block {target_block} not found"))?;

        if bundle
            .legs()
            .iter()
            .all(|leg| block_hashes.contains(&leg.hash))
        {
            return Ok(BundleResolution::BundleIncluded);
        }

        for leg in bundle.legs() {
            let on_chain = self.view.latest_nonce(leg.from).await?;
            if on_chain > leg.nonce {
                debug!(
                    "Nonce of {} moved to {} past the signed {}",
                    leg.from, on_chain, leg.nonce
                );
                return Ok(BundleResolution::AccountNonceTooHigh);
            }
        }

        Ok(BundleResolution::BlockPassedWithoutInclusion)
    }
}
