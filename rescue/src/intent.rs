use crate::error::RescueError;
use alloy::primitives::{Address, U256};
use common::signer::Signer;
use std::{fmt, str::FromStr};
use strum::{Display, EnumString};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    Token(Address),
    DomainName(String),
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Token(token) => write!(f, "ERC20 {token}"),
            AssetKind::DomainName(name) => write!(f, "ENS {name}"),
        }
    }
}

/// How the block producer gets paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum BriberMode {
    /// The funding account sends the reward as value from its own nonce.
    #[strum(serialize = "direct")]
    Direct,
    /// The funding account signs a permit, a throwaway account redeems it.
    #[default]
    #[strum(serialize = "permit")]
    PermitRelayed,
}

/// Everything a rescue needs, fixed once it starts.
#[derive(Debug, Clone)]
pub struct RescueIntent {
    pub asset: AssetKind,
    pub compromised: Signer,
    pub funding: Signer,
    pub recipient: Address,
    pub briber_reward: U256,
    pub briber_mode: BriberMode,
}

impl RescueIntent {
    pub fn new(
        asset: AssetKind,
        compromised_private_key: &str,
        funding_private_key: &str,
        recipient: &str,
        briber_reward: U256,
        briber_mode: BriberMode,
    ) -> Result<Self, RescueError> {
        let compromised = Signer::from_private_key(compromised_private_key).map_err(|e| {
            RescueError::InputValidation(format!("compromised private key: {e}"))
        })?;
        let funding = Signer::from_private_key(funding_private_key)
            .map_err(|e| RescueError::InputValidation(format!("funding private key: {e}")))?;
        let recipient = parse_address("recipient", recipient)?;

        if let AssetKind::DomainName(name) = &asset
            && name.trim().is_empty()
        {
            return Err(RescueError::InputValidation(
                "domain name must not be empty".to_string(),
            ));
        }
        if briber_reward.is_zero() {
            return Err(RescueError::InputValidation(
                "briber reward must be greater than zero".to_string(),
            ));
        }
        if compromised.address() == funding.address() {
            return Err(RescueError::InputValidation(
                "funding account must differ from the compromised account".to_string(),
            ));
        }

        if recipient == compromised.address() {
            return Err(RescueError::InputValidation(
                "recipient must differ from the compromised account".to_string(),
            ));
        }

        Ok(Self {
            asset,
            compromised,
            funding,
            recipient,
            briber_reward,
            briber_mode,
        })
    }
}

pub fn parse_address(what: &str, value: &str) -> Result<Address, RescueError> {
    Address::from_str(value.trim())
        .map_err(|e| RescueError::InputValidation(format!("bad {what} address '{value}': {e}")))
}
