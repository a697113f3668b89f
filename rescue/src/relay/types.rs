use alloy::{
    primitives::U256,
    rpc::types::mev::{EthCallBundleResponse, EthCallBundleTransactionResult},
};

/// Outcome of `eth_callBundle`, reduced to what the rescue decides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSimulation {
    pub coinbase_diff: U256,
    pub legs: Vec<LegSimulation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegSimulation {
    pub gas_used: u64,
    /// Revert data or message reported by the relay.
    pub revert: Option<String>,
}

impl From<EthCallBundleTransactionResult> for LegSimulation {
    fn from(result: EthCallBundleTransactionResult) -> Self {
        Self {
            gas_used: result.gas_used,
            revert: result.revert.map(|revert| revert.to_string()),
        }
    }
}

impl From<EthCallBundleResponse> for BundleSimulation {
    fn from(response: EthCallBundleResponse) -> Self {
        Self {
            coinbase_diff: response.coinbase_diff,
            legs: response.results.into_iter().map(LegSimulation::from).collect(),
        }
    }
}
