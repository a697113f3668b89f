//! Hand-written doubles for the chain, the relay and the funding account.

use crate::{
    bundle::{BundleEntry, SignedBundle, ZERO_GAS_LEG_GAS_LIMIT},
    error::RescueError,
    l1::{ChainHead, ChainReader, FundingAccount, InclusionView},
    relay::{
        BundleRelay, BundleResolution, BundleSimulation, InclusionResolver, LegSimulation,
    },
};
use alloy::{
    primitives::{Address, B256, Bytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use mockito::{Matcher, Mock, ServerGuard};
use anyhow::Error;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

pub async fn signed_bundle(nonces: &[u64]) -> SignedBundle {
    let entries: Vec<BundleEntry> = nonces
        .iter()
        .map(|nonce| {
            BundleEntry::zero_gas(
                Address::repeat_byte(0x11),
                Bytes::from_static(&[0x01]),
                ZERO_GAS_LEG_GAS_LIMIT,
                *nonce,
                PrivateKeySigner::random(),
            )
        })
        .collect();
    SignedBundle::sign(&entries, 1).await.unwrap()
}

pub fn simulation_ok(coinbase_diff: u64, gas_used: &[u64]) -> BundleSimulation {
    BundleSimulation {
        coinbase_diff: U256::from(coinbase_diff),
        legs: gas_used
            .iter()
            .map(|gas_used| LegSimulation {
                gas_used: *gas_used,
                revert: None,
            })
            .collect(),
    }
}

pub fn simulation_reverted() -> BundleSimulation {
    let mut simulation = simulation_ok(0, &[21_000, 60_000]);
    simulation.legs[1].revert = Some("execution reverted".to_string());
    simulation
}

/// Provider backed by a mockito JSON-RPC node that answers `eth_chainId` with 1.
pub async fn mock_node_provider(server: &mut ServerGuard) -> DynProvider {
    server
        .mock("POST", "/")
        .match_body(Matcher::Regex(r#""method":"eth_chainId""#.to_string()))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":0,"result":"0x1"}"#)
        .create_async()
        .await;
    ProviderBuilder::new()
        .connect_http(server.url().parse().unwrap())
        .erased()
}

/// Answers `eth_getTransactionCount` with `nonce`, only when asked at `block_tag`.
pub async fn mock_nonce_at(server: &mut ServerGuard, block_tag: &str, nonce: u64) -> Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""method":"eth_getTransactionCount""#.to_string()),
            Matcher::Regex(format!(r#""{block_tag}"\]"#)),
        ]))
        .with_status(200)
        .with_body(format!(r#"{{"jsonrpc":"2.0","id":1,"result":"{nonce:#x}"}}"#))
        .create_async()
        .await
}

#[derive(Default)]
pub struct MockChainReader {
    token_balances: HashMap<(Address, Address), U256>,
    domain_owners: HashMap<B256, Address>,
    nonces: HashMap<Address, u64>,
    fail: bool,
}

impl MockChainReader {
    pub fn with_token_balance(mut self, token: Address, holder: Address, amount: U256) -> Self {
        self.token_balances.insert((token, holder), amount);
        self
    }

    pub fn with_domain_owner(mut self, node: B256, owner: Address) -> Self {
        self.domain_owners.insert(node, owner);
        self
    }

    pub fn with_nonce(mut self, account: Address, nonce: u64) -> Self {
        self.nonces.insert(account, nonce);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn check(&self) -> Result<(), RescueError> {
        if self.fail {
            return Err(RescueError::Read("node unreachable".to_string()));
        }
        Ok(())
    }
}

impl ChainReader for MockChainReader {
    fn chain_id(&self) -> u64 {
        1
    }

    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256, RescueError> {
        self.check()?;
        Ok(self
            .token_balances
            .get(&(token, holder))
            .copied()
            .unwrap_or_default())
    }

    async fn domain_owner(&self, _registry: Address, node: B256) -> Result<Address, RescueError> {
        self.check()?;
        Ok(self.domain_owners.get(&node).copied().unwrap_or_default())
    }

    async fn account_nonce(&self, account: Address) -> Result<u64, RescueError> {
        self.check()?;
        Ok(self.nonces.get(&account).copied().unwrap_or_default())
    }
}

/// Head advances by one block on every read, starting at `start`.
pub struct MockHead {
    next: AtomicU64,
}

impl MockHead {
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl ChainHead for MockHead {
    async fn block_number(&self) -> Result<u64, Error> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// Head follows the scripted sequence and then stays on its last value.
pub struct MockInclusionView {
    heads: Mutex<VecDeque<u64>>,
    last_head: AtomicU64,
    head_reads: AtomicUsize,
    blocks: Mutex<HashMap<u64, Vec<B256>>>,
    nonces: Mutex<HashMap<Address, u64>>,
}

impl MockInclusionView {
    pub fn new(heads: Vec<u64>) -> Self {
        Self {
            heads: Mutex::new(heads.into()),
            last_head: AtomicU64::new(0),
            head_reads: AtomicUsize::new(0),
            blocks: Mutex::new(HashMap::new()),
            nonces: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_block(&self, number: u64, hashes: Vec<B256>) {
        self.blocks.lock().unwrap().insert(number, hashes);
    }

    pub fn set_nonce(&self, account: Address, nonce: u64) {
        self.nonces.lock().unwrap().insert(account, nonce);
    }

    pub fn head_reads(&self) -> usize {
        self.head_reads.load(Ordering::SeqCst)
    }
}

impl ChainHead for MockInclusionView {
    async fn block_number(&self) -> Result<u64, Error> {
        self.head_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(head) = self.heads.lock().unwrap().pop_front() {
            self.last_head.store(head, Ordering::SeqCst);
        }
        Ok(self.last_head.load(Ordering::SeqCst))
    }
}

impl InclusionView for MockInclusionView {
    async fn block_transaction_hashes(&self, number: u64) -> Result<Option<Vec<B256>>, Error> {
        Ok(self.blocks.lock().unwrap().get(&number).cloned())
    }

    async fn latest_nonce(&self, account: Address) -> Result<u64, Error> {
        Ok(self
            .nonces
            .lock()
            .unwrap()
            .get(&account)
            .copied()
            .unwrap_or_default())
    }
}

/// Scripted relay. Once a script runs out it answers with a paying simulation
/// and an accepted broadcast.
#[derive(Default)]
pub struct MockRelay {
    simulations: Mutex<VecDeque<Result<BundleSimulation, Error>>>,
    sends: Mutex<VecDeque<Result<Option<B256>, Error>>>,
    simulated_blocks: Mutex<Vec<u64>>,
    sent_blocks: Mutex<Vec<u64>>,
}

impl MockRelay {
    pub fn push_simulation(&self, response: Result<BundleSimulation, Error>) {
        self.simulations.lock().unwrap().push_back(response);
    }

    pub fn push_send(&self, response: Result<Option<B256>, Error>) {
        self.sends.lock().unwrap().push_back(response);
    }

    pub fn simulated_blocks(&self) -> Vec<u64> {
        self.simulated_blocks.lock().unwrap().clone()
    }

    pub fn sent_blocks(&self) -> Vec<u64> {
        self.sent_blocks.lock().unwrap().clone()
    }
}

impl BundleRelay for MockRelay {
    async fn simulate_bundle(&self, _txs: &[Bytes], block: u64) -> Result<BundleSimulation, Error> {
        self.simulated_blocks.lock().unwrap().push(block);
        self.simulations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(simulation_ok(50_000_000_000_000_000, &[50_000, 150_000])))
    }

    async fn send_bundle(&self, _txs: &[Bytes], block: u64) -> Result<Option<B256>, Error> {
        self.sent_blocks.lock().unwrap().push(block);
        self.sends
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Some(B256::repeat_byte(0xb0))))
    }
}

/// Answers from a script, then reports the block passed without inclusion.
#[derive(Default)]
pub struct MockResolver {
    outcomes: Mutex<VecDeque<BundleResolution>>,
    targets: Mutex<Vec<u64>>,
}

impl MockResolver {
    pub fn with_outcomes(outcomes: Vec<BundleResolution>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            targets: Mutex::new(Vec::new()),
        }
    }

    pub fn targets(&self) -> Vec<u64> {
        self.targets.lock().unwrap().clone()
    }
}

impl InclusionResolver for MockResolver {
    async fn resolve(
        &self,
        _bundle: &SignedBundle,
        target_block: u64,
    ) -> Result<BundleResolution, Error> {
        self.targets.lock().unwrap().push(target_block);
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(BundleResolution::BlockPassedWithoutInclusion))
    }
}

/// In-memory funding account recording every call in order.
pub struct MockFundingAccount {
    address: Address,
    native: Mutex<U256>,
    wrapped: Mutex<U256>,
    allowance: Mutex<U256>,
    permit_nonce: U256,
    account_nonce: u64,
    revert_approve: bool,
    calls: Mutex<Vec<String>>,
}

impl MockFundingAccount {
    pub fn new(address: Address, native: U256, wrapped: U256, allowance: U256) -> Self {
        Self {
            address,
            native: Mutex::new(native),
            wrapped: Mutex::new(wrapped),
            allowance: Mutex::new(allowance),
            permit_nonce: U256::ZERO,
            account_nonce: 0,
            revert_approve: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_account_nonce(mut self, nonce: u64) -> Self {
        self.account_nonce = nonce;
        self
    }

    pub fn with_permit_nonce(mut self, nonce: U256) -> Self {
        self.permit_nonce = nonce;
        self
    }

    pub fn reverting_approve(mut self) -> Self {
        self.revert_approve = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that would have sent a transaction.
    pub fn transactions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with("wrap") || call.starts_with("approve"))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl FundingAccount for MockFundingAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn native_balance(&self) -> Result<U256, RescueError> {
        self.record("native_balance".to_string());
        Ok(*self.native.lock().unwrap())
    }

    async fn wrapped_balance(&self) -> Result<U256, RescueError> {
        self.record("wrapped_balance".to_string());
        Ok(*self.wrapped.lock().unwrap())
    }

    async fn wrapped_allowance(&self, _spender: Address) -> Result<U256, RescueError> {
        self.record("wrapped_allowance".to_string());
        Ok(*self.allowance.lock().unwrap())
    }

    async fn wrap(&self, amount: U256) -> Result<B256, RescueError> {
        self.record(format!("wrap:{amount}"));
        *self.native.lock().unwrap() -= amount;
        *self.wrapped.lock().unwrap() += amount;
        Ok(B256::repeat_byte(0xaa))
    }

    async fn approve(&self, _spender: Address, amount: U256) -> Result<B256, RescueError> {
        self.record(format!("approve:{amount}"));
        if self.revert_approve {
            return Err(RescueError::FundingTransaction(
                "Approve: execution reverted".to_string(),
            ));
        }
        *self.allowance.lock().unwrap() = amount;
        Ok(B256::repeat_byte(0xbb))
    }

    async fn permit_nonce(&self, _helper: Address) -> Result<U256, RescueError> {
        self.record("permit_nonce".to_string());
        Ok(self.permit_nonce)
    }

    async fn account_nonce(&self) -> Result<u64, RescueError> {
        self.record("account_nonce".to_string());
        Ok(self.account_nonce)
    }
}
