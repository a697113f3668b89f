use super::{AssetTransfer, Postcondition};
use crate::{
    bundle::{BundleEntry, ZERO_GAS_LEG_GAS_LIMIT},
    error::RescueError,
    l1::{ChainReader, bindings::IERC20},
};
use alloy::{
    primitives::{Address, U256},
    signers::local::PrivateKeySigner,
    sol_types::{SolCall, SolValue},
};
use std::sync::Arc;
use tracing::debug;

pub struct TokenTransfer<R: ChainReader> {
    reader: Arc<R>,
    token: Address,
    sender: PrivateKeySigner,
    recipient: Address,
}

impl<R: ChainReader> TokenTransfer<R> {
    pub fn new(
        reader: Arc<R>,
        token: Address,
        sender: PrivateKeySigner,
        recipient: Address,
    ) -> Self {
        Self {
            reader,
            token,
            sender,
            recipient,
        }
    }

    async fn balance_of(&self, holder: Address) -> Result<U256, RescueError> {
        self.reader.token_balance(self.token, holder).await
    }
}

impl<R: ChainReader> AssetTransfer for TokenTransfer<R> {
    fn label(&self) -> &'static str {
        "erc20"
    }

    async fn build_zero_gas_legs(&self) -> Result<Vec<BundleEntry>, RescueError> {
        let holder = self.sender.address();
        let balance = self.balance_of(holder).await?;
        if balance.is_zero() {
            return Err(RescueError::NoBalance {
                holder,
                token: self.token,
            });
        }

        let nonce = self.reader.account_nonce(holder).await?;
        debug!("Token transfer of {} from {} at nonce {}", balance, holder, nonce);

        let input = IERC20::transferCall {
            to: self.recipient,
            amount: balance,
        }
        .abi_encode();

        Ok(vec![BundleEntry::zero_gas(
            self.token,
            input.into(),
            ZERO_GAS_LEG_GAS_LIMIT,
            nonce,
            self.sender.clone(),
        )])
    }

    async fn build_description(&self) -> Result<String, RescueError> {
        let holder = self.sender.address();
        let balance = self.balance_of(holder).await?;
        Ok(format!(
            "Transfer ERC20 balance {} @ {} from {} to {}",
            balance, self.token, holder, self.recipient
        ))
    }

    async fn build_postcondition(&self) -> Result<Vec<Postcondition>, RescueError> {
        // The helper only sees the final state, so the recipient's existing balance counts.
        let moved = self.balance_of(self.sender.address()).await?;
        let existing = self.balance_of(self.recipient).await?;
        let expected = moved
            .checked_add(existing)
            .ok_or_else(|| anyhow::anyhow!("Expected token balance overflows uint256"))?;

        let payload = IERC20::balanceOfCall {
            account: self.recipient,
        }
        .abi_encode();

        Ok(vec![Postcondition {
            target: self.token,
            payload: payload.into(),
            expected: expected.abi_encode().into(),
        }])
    }
}
