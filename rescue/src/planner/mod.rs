//! Zero-gas asset legs and the on-chain check that proves they executed.

mod domain;
mod token;

pub use domain::{DomainTransfer, namehash};
pub use token::TokenTransfer;

use crate::{bundle::BundleEntry, error::RescueError};
use alloy::primitives::{Address, Bytes};
use std::future::Future;

/// A static call the helper contract runs after the asset legs.
/// The bribe is only paid when the call returns exactly `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Postcondition {
    pub target: Address,
    pub payload: Bytes,
    pub expected: Bytes,
}

impl Postcondition {
    pub fn is_single_word(&self) -> bool {
        self.expected.len() == 32
    }
}

/// Moves one asset out of the compromised account without paying for gas.
pub trait AssetTransfer: Send + Sync {
    /// Short asset label used in failure messages, `erc20` or `ENS`.
    fn label(&self) -> &'static str;

    /// Checks the asset can be moved and builds the legs signed by the compromised key.
    fn build_zero_gas_legs(&self)
    -> impl Future<Output = Result<Vec<BundleEntry>, RescueError>> + Send;

    fn build_description(&self) -> impl Future<Output = Result<String, RescueError>> + Send;

    fn build_postcondition(
        &self,
    ) -> impl Future<Output = Result<Vec<Postcondition>, RescueError>> + Send;
}
