use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider},
};
use anyhow::Error;

/// Thin read-only view over an execution client.
pub struct ExecutionLayer {
    provider: DynProvider,
    chain_id: u64,
}

impl ExecutionLayer {
    pub async fn new(provider: DynProvider) -> Result<Self, Error> {
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| Error::msg(format!("Failed to get chain ID: {e}")))?;

        Ok(Self { provider, chain_id })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub async fn get_account_nonce(
        &self,
        account: Address,
        block: BlockNumberOrTag,
    ) -> Result<u64, Error> {
        let nonce_str: String = self
            .provider
            .client()
            .request("eth_getTransactionCount", (account, block))
            .await
            .map_err(|e| Error::msg(format!("Failed to get nonce: {e}")))?;

        u64::from_str_radix(nonce_str.trim_start_matches("0x"), 16)
            .map_err(|e| Error::msg(format!("Failed to convert nonce: {e}")))
    }

    pub async fn get_chain_height(&self) -> Result<u64, Error> {
        self.provider.get_block_number().await.map_err(|e| {
            anyhow::anyhow!(
                "[chain_id: {}] Failed to get latest block number: {}",
                self.chain_id,
                e
            )
        })
    }

    pub async fn get_account_balance(&self, account: Address) -> Result<U256, Error> {
        self.provider.get_balance(account).await.map_err(|e| {
            anyhow::anyhow!(
                "[chain_id: {}] Failed to get balance of {}: {}",
                self.chain_id,
                account,
                e
            )
        })
    }

    /// Hashes of the transactions included in the given block.
    /// `None` when the node does not know the block yet.
    pub async fn get_block_transaction_hashes(
        &self,
        number: u64,
    ) -> Result<Option<Vec<B256>>, Error> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "[chain_id: {}] Failed to get block by number ({}): {}",
                    self.chain_id,
                    number,
                    e
                )
            })?;

        Ok(block.map(|block| block.transactions.hashes().collect()))
    }
}
