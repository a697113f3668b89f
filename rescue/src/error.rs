use alloy::primitives::{Address, U256, utils::format_ether};
use std::fmt;

#[derive(Debug)]
pub enum RescueError {
    /// Malformed key or address; the rescue never starts.
    InputValidation(String),
    /// Node unreachable or a view call reverted.
    Read(String),
    /// The compromised account holds none of the token.
    NoBalance { holder: Address, token: Address },
    /// The compromised account is not the registry owner of the domain.
    NotOwner {
        signer: Address,
        domain: String,
        owner: Address,
    },
    /// Not enough native currency to wrap the missing part of the reward.
    InsufficientFunds {
        have: U256,
        need: U256,
        shortfall: U256,
    },
    /// A wrap or approve transaction could not be sent or reverted.
    FundingTransaction(String),
    /// The bundle reverts, fails its postcondition or does not pay the block producer.
    Simulation(String),
    /// An account nonce moved underneath a signed bundle.
    NonceTooHigh,
    /// The signed permit can no longer be redeemed.
    PermitExpired { deadline: u64 },
    Any(anyhow::Error),
}

impl RescueError {
    pub fn read(context: &str, err: impl fmt::Display) -> Self {
        RescueError::Read(format!("{context}: {err}"))
    }

    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            RescueError::NoBalance { .. } | RescueError::NotOwner { .. }
        )
    }

    pub fn is_funding_error(&self) -> bool {
        matches!(
            self,
            RescueError::InsufficientFunds { .. } | RescueError::FundingTransaction(_)
        )
    }
}

impl fmt::Display for RescueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RescueError::InputValidation(msg) => write!(f, "Invalid input: {msg}"),
            RescueError::Read(msg) => write!(f, "Chain read failed: {msg}"),
            RescueError::NoBalance { holder, token } => write!(
                f,
                "No Token Balance: {holder} does not have any balance of {token}"
            ),
            RescueError::NotOwner {
                signer,
                domain,
                owner,
            } => write!(
                f,
                "{signer} is not the owner of {domain} (current owner: {owner})"
            ),
            RescueError::InsufficientFunds {
                have,
                need,
                shortfall,
            } => write!(
                f,
                "Not enough ETH to bribe the block producer. Have {} ETH, need {} ETH, short by {} ETH",
                format_ether(*have),
                format_ether(*need),
                format_ether(*shortfall)
            ),
            RescueError::FundingTransaction(msg) => {
                write!(f, "Funding transaction failed: {msg}")
            }
            RescueError::Simulation(msg) => write!(f, "Simulation failed: {msg}"),
            RescueError::NonceTooHigh => {
                write!(f, "Account nonce has changed since message signature")
            }
            RescueError::PermitExpired { deadline } => {
                write!(f, "Permit deadline {deadline} has passed")
            }
            RescueError::Any(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RescueError {}

impl From<anyhow::Error> for RescueError {
    fn from(err: anyhow::Error) -> Self {
        RescueError::Any(err)
    }
}
