use crate::error::RescueError;
use alloy::{
    primitives::{Address, B256, U256},
    signers::{Signer as _, local::PrivateKeySigner},
    sol,
    sol_types::{SolStruct, eip712_domain},
};

/// Lifetime of a signed permit. It is never re-signed.
pub const PERMIT_VALIDITY_SECS: u64 = 60 * 60;

sol! {
    #[derive(Debug)]
    struct Permit {
        address owner;
        address spender;
        uint256 value;
        uint256 nonce;
        uint256 deadline;
    }
}

/// Permit for the helper to pull the reward in wrapped currency, with the split signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPermit {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub nonce: U256,
    pub deadline: u64,
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl SignedPermit {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.deadline
    }
}

pub async fn sign_permit(
    signer: &PrivateKeySigner,
    helper: Address,
    chain_id: u64,
    value: U256,
    nonce: U256,
    deadline: u64,
) -> Result<SignedPermit, RescueError> {
    let permit = Permit {
        owner: signer.address(),
        spender: helper,
        value,
        nonce,
        deadline: U256::from(deadline),
    };
    let hash = permit.eip712_signing_hash(&permit_domain(helper, chain_id));

    let signature = signer
        .sign_hash(&hash)
        .await
        .map_err(|e| RescueError::Any(anyhow::anyhow!("Failed to sign permit: {e}")))?;

    Ok(SignedPermit {
        owner: permit.owner,
        spender: helper,
        value,
        nonce,
        deadline,
        v: u8::from(signature.v()) + 27,
        r: B256::from(signature.r().to_be_bytes::<32>()),
        s: B256::from(signature.s().to_be_bytes::<32>()),
    })
}

fn permit_domain(helper: Address, chain_id: u64) -> alloy::sol_types::Eip712Domain {
    eip712_domain! {
        name: "MEVBriber",
        version: "1",
        chain_id: chain_id,
        verifying_contract: helper,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Signature;

    #[tokio::test]
    async fn test_permit_signature_recovers_owner() {
        let signer = PrivateKeySigner::random();
        let helper = Address::repeat_byte(0xbb);
        let value = U256::from(50_000_000_000_000_000u64);

        let permit = sign_permit(&signer, helper, 1, value, U256::from(3), 1_700_003_600)
            .await
            .unwrap();
        assert_eq!(permit.owner, signer.address());
        assert_eq!(permit.spender, helper);
        assert!(permit.v == 27 || permit.v == 28);

        let typed = Permit {
            owner: signer.address(),
            spender: helper,
            value,
            nonce: U256::from(3),
            deadline: U256::from(1_700_003_600u64),
        };
        let hash = typed.eip712_signing_hash(&permit_domain(helper, 1));
        let signature = Signature::new(
            U256::from_be_bytes(permit.r.0),
            U256::from_be_bytes(permit.s.0),
            permit.v == 28,
        );
        assert_eq!(
            signature.recover_address_from_prehash(&hash).unwrap(),
            signer.address()
        );
    }

    #[tokio::test]
    async fn test_domain_binds_chain_id() {
        let signer = PrivateKeySigner::random();
        let helper = Address::repeat_byte(0xbb);
        let on_mainnet = sign_permit(&signer, helper, 1, U256::from(1), U256::ZERO, 10)
            .await
            .unwrap();
        let on_testnet = sign_permit(&signer, helper, 5, U256::from(1), U256::ZERO, 10)
            .await
            .unwrap();
        assert_ne!(on_mainnet.r, on_testnet.r);
    }

    #[test]
    fn test_expiry() {
        let permit = SignedPermit {
            owner: Address::ZERO,
            spender: Address::ZERO,
            value: U256::ZERO,
            nonce: U256::ZERO,
            deadline: 100,
            v: 27,
            r: B256::ZERO,
            s: B256::ZERO,
        };
        assert!(!permit.is_expired(99));
        assert!(permit.is_expired(100));
    }
}
