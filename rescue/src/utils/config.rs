use crate::intent::{AssetKind, BriberMode};
use alloy::primitives::{Address, U256, address, utils::{format_ether, parse_ether}};
use anyhow::Error;
use common::config::{ConfigTrait, address_parse_error};
use std::{fmt, str::FromStr, time::Duration};

pub const DEFAULT_RELAY_URL: &str = "http://3.238.87.202";
pub const MEV_BRIBER: Address = address!("f26F7dAa038651F6eFcA888E91ecbeC8e231035e");
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const ENS_REGISTRY: Address = address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

#[derive(Debug, Clone)]
pub struct ContractAddresses {
    pub mev_briber: Address,
    pub weth: Address,
    pub ens_registry: Address,
}

#[derive(Clone)]
pub struct RescueConfig {
    pub relay_url: String,
    pub blocks_in_the_future: u64,
    pub submission_interval: Duration,
    /// `None` when unlimited.
    pub max_broadcast_attempts: Option<u64>,
    pub resolution_poll_interval: Duration,
    pub asset: AssetKind,
    pub recipient: String,
    pub compromised_private_key: String,
    pub funding_private_key: String,
    pub bribe_amount: U256,
    pub briber_mode: BriberMode,
    pub contract_addresses: ContractAddresses,
}

fn read_u64(name: &str, default: &str) -> Result<u64, Error> {
    std::env::var(name)
        .unwrap_or(default.to_string())
        .trim()
        .parse::<u64>()
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", name, e))
}

fn non_zero(name: &str, value: u64) -> Result<u64, Error> {
    if value == 0 {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}

fn read_required(name: &str) -> Result<String, Error> {
    let value = std::env::var(name).map_err(|e| anyhow::anyhow!("Failed to read {}: {}", name, e))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} must not be empty", name);
    }
    Ok(value.trim().to_string())
}

fn read_address(name: &str, default: Address) -> Result<Address, Error> {
    match std::env::var(name) {
        Ok(value) => Address::from_str(value.trim()).map_err(|e| address_parse_error(name, e, &value)),
        Err(_) => Ok(default),
    }
}

impl ConfigTrait for RescueConfig {
    fn read_env_variables() -> Result<Self, Error> {
        const RELAY_URL: &str = "RELAY_URL";
        let relay_url = std::env::var(RELAY_URL).unwrap_or(DEFAULT_RELAY_URL.to_string());

        const BLOCKS_IN_THE_FUTURE: &str = "BLOCKS_IN_THE_FUTURE";
        let blocks_in_the_future =
            non_zero(BLOCKS_IN_THE_FUTURE, read_u64(BLOCKS_IN_THE_FUTURE, "2")?)?;

        const SUBMISSION_INTERVAL_SEC: &str = "SUBMISSION_INTERVAL_SEC";
        let submission_interval = Duration::from_secs(non_zero(
            SUBMISSION_INTERVAL_SEC,
            read_u64(SUBMISSION_INTERVAL_SEC, "13")?,
        )?);

        let max_broadcast_attempts = match read_u64("MAX_BROADCAST_ATTEMPTS", "0")? {
            0 => None,
            max => Some(max),
        };

        const RESOLUTION_POLL_MS: &str = "RESOLUTION_POLL_MS";
        let resolution_poll_interval = Duration::from_millis(non_zero(
            RESOLUTION_POLL_MS,
            read_u64(RESOLUTION_POLL_MS, "1000")?,
        )?);

        const ASSET_KIND: &str = "ASSET_KIND";
        let asset = match read_required(ASSET_KIND)?.to_lowercase().as_str() {
            "erc20" => {
                const TOKEN_ADDRESS: &str = "TOKEN_ADDRESS";
                let token_str = read_required(TOKEN_ADDRESS)?;
                let token = Address::from_str(&token_str)
                    .map_err(|e| address_parse_error(TOKEN_ADDRESS, e, &token_str))?;
                AssetKind::Token(token)
            }
            "ens" => AssetKind::DomainName(read_required("ENS_DOMAIN")?),
            other => anyhow::bail!("{} must be 'erc20' or 'ens', got '{}'", ASSET_KIND, other),
        };

        let recipient = read_required("RECIPIENT_ADDRESS")?;
        let compromised_private_key = read_required("COMPROMISED_PRIVATE_KEY")?;
        let funding_private_key = read_required("FUNDING_PRIVATE_KEY")?;

        const BRIBE_AMOUNT_ETH: &str = "BRIBE_AMOUNT_ETH";
        let bribe_amount = parse_ether(
            std::env::var(BRIBE_AMOUNT_ETH)
                .unwrap_or("0.05".to_string())
                .trim(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", BRIBE_AMOUNT_ETH, e))?;

        const BRIBER_MODE: &str = "BRIBER_MODE";
        let briber_mode = match std::env::var(BRIBER_MODE) {
            Ok(mode) => BriberMode::from_str(mode.trim())
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {} ('{}')", BRIBER_MODE, e, mode))?,
            Err(_) => BriberMode::default(),
        };

        let contract_addresses = ContractAddresses {
            mev_briber: read_address("MEV_BRIBER_ADDRESS", MEV_BRIBER)?,
            weth: read_address("WETH_ADDRESS", WETH)?,
            ens_registry: read_address("ENS_REGISTRY_ADDRESS", ENS_REGISTRY)?,
        };

        Ok(RescueConfig {
            relay_url,
            blocks_in_the_future,
            submission_interval,
            max_broadcast_attempts,
            resolution_poll_interval,
            asset,
            recipient,
            compromised_private_key,
            funding_private_key,
            bribe_amount,
            briber_mode,
            contract_addresses,
        })
    }
}

impl fmt::Display for RescueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "relay url: {}", self.relay_url)?;
        writeln!(f, "asset: {}", self.asset)?;
        writeln!(f, "recipient: {}", self.recipient)?;
        writeln!(
            f,
            "bribe: {} ETH ({} mode)",
            format_ether(self.bribe_amount),
            self.briber_mode
        )?;
        writeln!(f, "blocks in the future: {}", self.blocks_in_the_future)?;
        writeln!(
            f,
            "submission interval: {}s",
            self.submission_interval.as_secs()
        )?;
        match self.max_broadcast_attempts {
            Some(max) => writeln!(f, "max broadcast attempts: {max}")?,
            None => writeln!(f, "max broadcast attempts: unlimited")?,
        }
        writeln!(
            f,
            "resolution poll interval: {}ms",
            self.resolution_poll_interval.as_millis()
        )?;
        write!(
            f,
            "contracts: briber {}, weth {}, ens registry {}",
            self.contract_addresses.mev_briber,
            self.contract_addresses.weth,
            self.contract_addresses.ens_registry
        )
    }
}
