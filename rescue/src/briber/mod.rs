//! The leg that pays the block producer, and the funding it needs first.

pub mod permit;

pub use permit::{PERMIT_VALIDITY_SECS, SignedPermit};

use crate::{
    bundle::{BundleEntry, DIRECT_BRIBER_GAS_LIMIT, PERMIT_BRIBER_GAS_LIMIT},
    error::RescueError,
    l1::{FundingAccount, bindings::IMevBriber},
    planner::Postcondition,
    submission::{RescueSession, SubmissionState},
};
use alloy::{
    primitives::{Address, B256, Bytes, U256, utils::format_ether},
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use std::sync::Arc;
use tracing::info;

pub struct BriberBuilder<F: FundingAccount> {
    funding: Arc<F>,
    funding_signer: PrivateKeySigner,
    helper: Address,
    chain_id: u64,
    reward: U256,
}

impl<F: FundingAccount> BriberBuilder<F> {
    pub fn new(
        funding: Arc<F>,
        funding_signer: PrivateKeySigner,
        helper: Address,
        chain_id: u64,
        reward: U256,
    ) -> Self {
        Self {
            funding,
            funding_signer,
            helper,
            chain_id,
            reward,
        }
    }

    /// Makes sure the helper can pull the reward in wrapped currency.
    /// Issues no transaction when balance and allowance already suffice.
    pub async fn ensure_funding(&self, session: &RescueSession) -> Result<(), RescueError> {
        let wrapped = self.funding.wrapped_balance().await?;
        if wrapped < self.reward {
            session.advance(SubmissionState::FetchingWrappedCurrency);
            let shortfall = self.reward - wrapped;
            let native = self.funding.native_balance().await?;
            if native < shortfall {
                return Err(RescueError::InsufficientFunds {
                    have: native,
                    need: shortfall,
                    shortfall: shortfall - native,
                });
            }
            info!(
                "Wrapping {} ETH to cover the bribe of {} ETH",
                format_ether(shortfall),
                format_ether(self.reward)
            );
            self.funding.wrap(shortfall).await?;
        }

        let allowance = self.funding.wrapped_allowance(self.helper).await?;
        if allowance < self.reward {
            session.advance(SubmissionState::ApprovingAllowance);
            info!(
                "Approving {} for wrapped currency spending, current allowance {}",
                self.helper, allowance
            );
            self.funding.approve(self.helper, self.reward).await?;
        }

        Ok(())
    }

    /// Direct mode pays the reward as value, so only the native balance matters.
    pub async fn ensure_native_funding(&self) -> Result<(), RescueError> {
        let native = self.funding.native_balance().await?;
        if native < self.reward {
            return Err(RescueError::InsufficientFunds {
                have: native,
                need: self.reward,
                shortfall: self.reward - native,
            });
        }
        Ok(())
    }

    /// Signs once per rescue. The permit nonce is read at signing time.
    pub async fn sign_permit(&self, session: &RescueSession) -> Result<SignedPermit, RescueError> {
        session.advance(SubmissionState::SigningPermit);
        let nonce = self.funding.permit_nonce(self.helper).await?;
        let deadline = u64::try_from(chrono::Utc::now().timestamp())
            .map_err(|e| anyhow::anyhow!("System clock before epoch: {e}"))?
            + PERMIT_VALIDITY_SECS;

        let permit = permit::sign_permit(
            &self.funding_signer,
            self.helper,
            self.chain_id,
            self.reward,
            nonce,
            deadline,
        )
        .await?;
        info!(
            "Signed permit for {} ETH, nonce {}, deadline {}",
            format_ether(self.reward),
            nonce,
            deadline
        );
        Ok(permit)
    }

    /// Sent by a throwaway account that never held anything, so its nonce is 0.
    pub fn build_permit_relayed(
        &self,
        permit: &SignedPermit,
        checks: &[Postcondition],
    ) -> Result<BundleEntry, RescueError> {
        let input = encode_permit_call(permit, checks)?;
        let sender = PrivateKeySigner::random();
        info!("Permit relayed by throwaway account {}", sender.address());
        Ok(BundleEntry::zero_gas(
            self.helper,
            input,
            PERMIT_BRIBER_GAS_LIMIT,
            0,
            sender,
        ))
    }

    pub async fn build_direct(&self, checks: &[Postcondition]) -> Result<BundleEntry, RescueError> {
        let input = encode_direct_call(checks)?;
        let nonce = self.funding.account_nonce().await?;
        Ok(BundleEntry::zero_gas(
            self.helper,
            input,
            DIRECT_BRIBER_GAS_LIMIT,
            nonce,
            self.funding_signer.clone(),
        )
        .with_value(self.reward))
    }
}

struct CheckArgs {
    targets: Vec<Address>,
    payloads: Vec<Bytes>,
}

fn split_checks(checks: &[Postcondition]) -> Result<CheckArgs, RescueError> {
    if checks.is_empty() {
        return Err(RescueError::Any(anyhow::anyhow!(
            "Briber leg needs at least one postcondition"
        )));
    }
    Ok(CheckArgs {
        targets: checks.iter().map(|c| c.target).collect(),
        payloads: checks.iter().map(|c| c.payload.clone()).collect(),
    })
}

/// `Some` when every expected result is a single word and the 32-byte family applies.
fn word_matches(checks: &[Postcondition]) -> Option<Vec<B256>> {
    checks
        .iter()
        .map(|c| c.is_single_word().then(|| B256::from_slice(&c.expected)))
        .collect()
}

fn encode_direct_call(checks: &[Postcondition]) -> Result<Bytes, RescueError> {
    let CheckArgs { targets, payloads } = split_checks(checks)?;
    let input = match word_matches(checks) {
        Some(matches) => IMevBriber::check32BytesAndSendMultiCall {
            targets,
            payloads,
            resultMatches: matches,
        }
        .abi_encode(),
        None => IMevBriber::checkBytesAndSendMultiCall {
            targets,
            payloads,
            resultMatches: checks.iter().map(|c| c.expected.clone()).collect(),
        }
        .abi_encode(),
    };
    Ok(input.into())
}

fn encode_permit_call(
    permit: &SignedPermit,
    checks: &[Postcondition],
) -> Result<Bytes, RescueError> {
    let CheckArgs { targets, payloads } = split_checks(checks)?;
    let deadline = U256::from(permit.deadline);
    let input = match word_matches(checks) {
        Some(matches) => IMevBriber::check32BytesAndSendMultiWETHCall {
            owner: permit.owner,
            spender: permit.spender,
            value: permit.value,
            deadline,
            v: permit.v,
            r: permit.r,
            s: permit.s,
            targets,
            payloads,
            resultMatches: matches,
        }
        .abi_encode(),
        None => IMevBriber::checkBytesAndSendMultiWETHCall {
            owner: permit.owner,
            spender: permit.spender,
            value: permit.value,
            deadline,
            v: permit.v,
            r: permit.r,
            s: permit.s,
            targets,
            payloads,
            resultMatches: checks.iter().map(|c| c.expected.clone()).collect(),
        }
        .abi_encode(),
    };
    Ok(input.into())
}
