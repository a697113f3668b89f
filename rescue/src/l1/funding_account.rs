use super::bindings::{IMevBriber, IWETH};
use crate::error::RescueError;
use alloy::{
    eips::BlockNumberOrTag,
    network::TransactionBuilder,
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider},
    rpc::types::TransactionRequest,
};
use common::{execution_layer::ExecutionLayer, shared::alloy_tools::check_for_revert_reason};
use std::{future::Future, time::Duration};
use tracing::{info, warn};

const RECEIPT_TIMEOUT: Duration = Duration::from_secs(180);

/// The account that pays the block producer.
///
/// `wrap` and `approve` return only once the transaction is mined, so the
/// next step always observes its effect.
pub trait FundingAccount: Send + Sync {
    fn address(&self) -> Address;
    fn native_balance(&self) -> impl Future<Output = Result<U256, RescueError>> + Send;
    fn wrapped_balance(&self) -> impl Future<Output = Result<U256, RescueError>> + Send;
    fn wrapped_allowance(
        &self,
        spender: Address,
    ) -> impl Future<Output = Result<U256, RescueError>> + Send;
    fn wrap(&self, amount: U256) -> impl Future<Output = Result<B256, RescueError>> + Send;
    fn approve(
        &self,
        spender: Address,
        amount: U256,
    ) -> impl Future<Output = Result<B256, RescueError>> + Send;
    fn permit_nonce(&self, helper: Address)
    -> impl Future<Output = Result<U256, RescueError>> + Send;
    fn account_nonce(&self) -> impl Future<Output = Result<u64, RescueError>> + Send;
}

pub struct L1FundingAccount {
    /// Provider with the funding key as its wallet.
    provider: DynProvider,
    execution_layer: ExecutionLayer,
    address: Address,
    wrapped_currency: Address,
}

impl L1FundingAccount {
    pub async fn new(
        provider: DynProvider,
        address: Address,
        wrapped_currency: Address,
    ) -> Result<Self, anyhow::Error> {
        let execution_layer = ExecutionLayer::new(provider.clone()).await?;
        Ok(Self {
            provider,
            execution_layer,
            address,
            wrapped_currency,
        })
    }

    async fn send_and_confirm(
        &self,
        what: &str,
        tx_request: TransactionRequest,
    ) -> Result<B256, RescueError> {
        let tx_request = tx_request.with_from(self.address);
        let pending_tx = self
            .provider
            .send_transaction(tx_request)
            .await
            .map_err(|e| RescueError::FundingTransaction(format!("{what}: {e}")))?;

        let tx_hash = *pending_tx.tx_hash();
        info!("{} tx hash: {}", what, tx_hash);

        let receipt = pending_tx
            .with_timeout(Some(RECEIPT_TIMEOUT))
            .get_receipt()
            .await
            .map_err(|e| RescueError::FundingTransaction(format!("{what} {tx_hash}: {e}")))?;

        if receipt.status() {
            let block_number = receipt.block_number.unwrap_or_else(|| {
                warn!("Block number not found for transaction {}", tx_hash);
                0
            });
            info!("🌐 {} {} confirmed in block {}", what, tx_hash, block_number);
            return Ok(tx_hash);
        }

        let reason = match receipt.block_number {
            Some(block_number) => {
                check_for_revert_reason(&self.provider, tx_hash, block_number).await
            }
            None => format!("Transaction {tx_hash} reverted"),
        };
        Err(RescueError::FundingTransaction(format!("{what}: {reason}")))
    }
}

impl FundingAccount for L1FundingAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn native_balance(&self) -> Result<U256, RescueError> {
        self.execution_layer
            .get_account_balance(self.address)
            .await
            .map_err(|e| RescueError::read("funding native balance", e))
    }

    async fn wrapped_balance(&self) -> Result<U256, RescueError> {
        IWETH::new(self.wrapped_currency, &self.provider)
            .balanceOf(self.address)
            .call()
            .await
            .map_err(|e| RescueError::read("wrapped currency balance", e))
    }

    async fn wrapped_allowance(&self, spender: Address) -> Result<U256, RescueError> {
        IWETH::new(self.wrapped_currency, &self.provider)
            .allowance(self.address, spender)
            .call()
            .await
            .map_err(|e| RescueError::read(&format!("wrapped currency allowance for {spender}"), e))
    }

    async fn wrap(&self, amount: U256) -> Result<B256, RescueError> {
        let tx_request = IWETH::new(self.wrapped_currency, &self.provider)
            .deposit()
            .value(amount)
            .into_transaction_request();
        self.send_and_confirm("Wrap", tx_request).await
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<B256, RescueError> {
        let tx_request = IWETH::new(self.wrapped_currency, &self.provider)
            .approve(spender, amount)
            .into_transaction_request();
        self.send_and_confirm("Approve", tx_request).await
    }

    async fn permit_nonce(&self, helper: Address) -> Result<U256, RescueError> {
        IMevBriber::new(helper, &self.provider)
            .nonces(self.address)
            .call()
            .await
            .map_err(|e| RescueError::read(&format!("permit nonce on {helper}"), e))
    }

    async fn account_nonce(&self) -> Result<u64, RescueError> {
        self.execution_layer
            .get_account_nonce(self.address, BlockNumberOrTag::Latest)
            .await
            .map_err(|e| RescueError::read("funding account nonce", e))
    }
}
