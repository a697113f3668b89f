use super::bindings::{IENSRegistry, IERC20};
use crate::error::RescueError;
use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256, U256},
    providers::DynProvider,
};
use anyhow::Error;
use common::execution_layer::ExecutionLayer;
use std::future::Future;

/// Read-only queries the planners depend on.
pub trait ChainReader: Send + Sync {
    fn chain_id(&self) -> u64;
    fn token_balance(
        &self,
        token: Address,
        holder: Address,
    ) -> impl Future<Output = Result<U256, RescueError>> + Send;
    fn domain_owner(
        &self,
        registry: Address,
        node: B256,
    ) -> impl Future<Output = Result<Address, RescueError>> + Send;
    /// Nonce at the latest block. Bundle legs land in one block, so mempool transactions are not counted.
    fn account_nonce(&self, account: Address)
    -> impl Future<Output = Result<u64, RescueError>> + Send;
}

pub trait ChainHead: Send + Sync {
    fn block_number(&self) -> impl Future<Output = Result<u64, Error>> + Send;
}

/// Chain state needed to tell whether a bundle landed in a block.
pub trait InclusionView: ChainHead {
    fn block_transaction_hashes(
        &self,
        number: u64,
    ) -> impl Future<Output = Result<Option<Vec<B256>>, Error>> + Send;
    fn latest_nonce(&self, account: Address) -> impl Future<Output = Result<u64, Error>> + Send;
}

pub struct L1Reader {
    execution_layer: ExecutionLayer,
    provider: DynProvider,
}

impl L1Reader {
    pub async fn new(provider: DynProvider) -> Result<Self, Error> {
        let execution_layer = ExecutionLayer::new(provider.clone()).await?;
        Ok(Self {
            execution_layer,
            provider,
        })
    }

    pub async fn native_balance(&self, account: Address) -> Result<U256, RescueError> {
        self.execution_layer
            .get_account_balance(account)
            .await
            .map_err(|e| RescueError::read("native balance", e))
    }
}

impl ChainReader for L1Reader {
    fn chain_id(&self) -> u64 {
        self.execution_layer.chain_id()
    }

    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256, RescueError> {
        IERC20::new(token, &self.provider)
            .balanceOf(holder)
            .call()
            .await
            .map_err(|e| RescueError::read(&format!("balanceOf({holder}) on {token}"), e))
    }

    async fn domain_owner(&self, registry: Address, node: B256) -> Result<Address, RescueError> {
        IENSRegistry::new(registry, &self.provider)
            .owner(node)
            .call()
            .await
            .map_err(|e| RescueError::read(&format!("owner({node}) on {registry}"), e))
    }

    async fn account_nonce(&self, account: Address) -> Result<u64, RescueError> {
        self.execution_layer
            .get_account_nonce(account, BlockNumberOrTag::Latest)
            .await
            .map_err(|e| RescueError::read(&format!("nonce of {account}"), e))
    }
}

impl ChainHead for L1Reader {
    async fn block_number(&self) -> Result<u64, Error> {
        self.execution_layer.get_chain_height().await
    }
}

impl InclusionView for L1Reader {
    async fn block_transaction_hashes(&self, number: u64) -> Result<Option<Vec<B256>>, Error> {
        self.execution_layer
            .get_block_transaction_hashes(number)
            .await
    }

    async fn latest_nonce(&self, account: Address) -> Result<u64, Error> {
        self.execution_layer
            .get_account_nonce(account, BlockNumberOrTag::Latest)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_node_provider, mock_nonce_at};

    #[tokio::test]
    async fn test_account_nonce_is_read_at_latest_block() {
        let mut server = mockito::Server::new_async().await;
        let provider = mock_node_provider(&mut server).await;
        let latest = mock_nonce_at(&mut server, "latest", 7).await;

        let reader = L1Reader::new(provider).await.unwrap();
        assert_eq!(reader.chain_id(), 1);
        assert_eq!(reader.account_nonce(Address::repeat_byte(0x01)).await.unwrap(), 7);
        latest.assert_async().await;
    }
}
