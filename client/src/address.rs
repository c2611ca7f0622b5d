//! Deterministic program-derived addresses.
//!
//! Every entity the governance program stores lives at an address computed
//! from a fixed seed string, an entity key and the owning program id:
//!
//! | Entity           | Seeds                                   | Program    |
//! |------------------|-----------------------------------------|------------|
//! | governance state | `"governance_state"`                    | governance |
//! | proposal         | `"proposal"`, id as `u64` LE            | governance |
//! | verified user    | `"verified_user"`, user                 | governance |
//! | vote record      | `"vote"`, id as `u64` LE, voter         | governance |
//! | holding (bond)   | `"bond"`, owner                         | holding    |
//!
//! All functions here are pure.

use {
    crate::numeric::{Numeric, NumericError},
    bondgov_governance_interface::{
        bond,
        constants::{
            BOND_SEED, GOVERNANCE_STATE_SEED, PROPOSAL_SEED, PUBKEY_LEN, VERIFIED_USER_SEED,
            VOTE_RECORD_SEED,
        },
    },
    solana_pubkey::Pubkey,
    thiserror::Error,
};

/// Maximum number of seeds, including the bump seed appended on derivation.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed component.
pub const MAX_SEED_LEN: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("cannot encode identifier: {0}")]
    EncodingOverflow(#[from] NumericError),

    #[error("seed component {index} is {len} bytes (max {MAX_SEED_LEN})")]
    SeedTooLong { index: usize, len: usize },

    #[error("{0} seed components leave no room for the bump seed")]
    TooManySeeds(usize),

    #[error("no bump seed yields an off-curve address")]
    NoViableBump,
}

/// An address together with the bump seed that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Encode a numeric identifier as 8 little-endian bytes.
pub fn encode_id_le(value: impl Into<Numeric>) -> Result<[u8; 8], DerivationError> {
    Ok(value.into().to_u64()?.to_le_bytes())
}

pub fn decode_id_le(bytes: [u8; 8]) -> u64 {
    u64::from_le_bytes(bytes)
}

/// Derive the program address for `seed` followed by `keys`.
pub fn derive_address(
    seed: &[u8],
    keys: &[&[u8]],
    program_id: &Pubkey,
) -> Result<DerivedAddress, DerivationError> {
    let mut seeds: Vec<&[u8]> = Vec::with_capacity(keys.len().saturating_add(1));
    seeds.push(seed);
    seeds.extend_from_slice(keys);

    // One slot is reserved for the bump.
    if seeds.len() >= MAX_SEEDS {
        return Err(DerivationError::TooManySeeds(seeds.len()));
    }
    if let Some((index, component)) = seeds
        .iter()
        .enumerate()
        .find(|(_, component)| component.len() > MAX_SEED_LEN)
    {
        return Err(DerivationError::SeedTooLong {
            index,
            len: component.len(),
        });
    }

    let (address, bump) = Pubkey::try_find_program_address(&seeds, program_id)
        .ok_or(DerivationError::NoViableBump)?;
    Ok(DerivedAddress { address, bump })
}

/// Parse a base58 account address.
pub fn parse_address(text: &str) -> Result<Pubkey, DerivationError> {
    let bytes = bs58::decode(text.trim())
        .into_vec()
        .map_err(|_| DerivationError::InvalidAddress(text.to_string()))?;
    let array: [u8; PUBKEY_LEN] = bytes
        .try_into()
        .map_err(|_| DerivationError::InvalidAddress(text.to_string()))?;
    Ok(Pubkey::new_from_array(array))
}

/// The two program ids every derivation is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAddresses {
    pub governance_program: Pubkey,
    pub holding_program: Pubkey,
}

impl Default for ProgramAddresses {
    fn default() -> Self {
        Self {
            governance_program: bondgov_governance_interface::id(),
            holding_program: bond::id(),
        }
    }
}

impl ProgramAddresses {
    pub fn new(governance_program: Pubkey, holding_program: Pubkey) -> Self {
        Self {
            governance_program,
            holding_program,
        }
    }

    pub fn governance_state(&self) -> Result<DerivedAddress, DerivationError> {
        derive_address(GOVERNANCE_STATE_SEED, &[], &self.governance_program)
    }

    pub fn proposal(&self, id: impl Into<Numeric>) -> Result<DerivedAddress, DerivationError> {
        let id = encode_id_le(id)?;
        derive_address(PROPOSAL_SEED, &[&id[..]], &self.governance_program)
    }

    pub fn verified_user(&self, user: &Pubkey) -> Result<DerivedAddress, DerivationError> {
        derive_address(VERIFIED_USER_SEED, &[user.as_ref()], &self.governance_program)
    }

    pub fn vote_record(
        &self,
        proposal_id: impl Into<Numeric>,
        voter: &Pubkey,
    ) -> Result<DerivedAddress, DerivationError> {
        let id = encode_id_le(proposal_id)?;
        derive_address(
            VOTE_RECORD_SEED,
            &[&id[..], voter.as_ref()],
            &self.governance_program,
        )
    }

    pub fn holding(&self, owner: &Pubkey) -> Result<DerivedAddress, DerivationError> {
        derive_address(BOND_SEED, &[owner.as_ref()], &self.holding_program)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches, proptest::prelude::*};

    fn key(byte: u8) -> Pubkey {
        Pubkey::new_from_array([byte; 32])
    }

    #[test]
    fn test_encode_id_le() {
        assert_eq!(encode_id_le(0u64).unwrap(), [0; 8]);
        assert_eq!(encode_id_le(1u64).unwrap(), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(encode_id_le(256u64).unwrap(), [0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(encode_id_le(u64::MAX).unwrap(), [0xff; 8]);
        assert_eq!(encode_id_le("7").unwrap(), encode_id_le(7u8).unwrap());
    }

    #[test]
    fn test_encode_id_le_overflow() {
        assert_matches!(
            encode_id_le(u128::from(u64::MAX) + 1),
            Err(DerivationError::EncodingOverflow(NumericError::TooLarge(_)))
        );
        assert_matches!(
            encode_id_le(-1i64),
            Err(DerivationError::EncodingOverflow(NumericError::Negative(_)))
        );
        assert_matches!(
            encode_id_le(2.5f64),
            Err(DerivationError::EncodingOverflow(_))
        );
    }

    #[test]
    fn test_parse_address() {
        let pubkey = key(3);
        assert_eq!(parse_address(&pubkey.to_string()).unwrap(), pubkey);
        assert_eq!(
            parse_address("11111111111111111111111111111111").unwrap(),
            Pubkey::new_from_array([0; 32])
        );
        assert_matches!(parse_address("not-base58!"), Err(DerivationError::InvalidAddress(_)));
        // Valid base58, wrong length.
        assert_matches!(parse_address("3mJr7AoUXx2Wqd"), Err(DerivationError::InvalidAddress(_)));
        assert_matches!(parse_address(""), Err(DerivationError::InvalidAddress(_)));
    }

    #[test]
    fn test_seed_limits() {
        let program = key(9);
        let long = [0u8; 33];
        assert_matches!(
            derive_address(b"proposal", &[&long[..]], &program),
            Err(DerivationError::SeedTooLong { index: 1, len: 33 })
        );
        let parts: Vec<&[u8]> = vec![&b"x"[..]; 15];
        assert_matches!(
            derive_address(b"seed", &parts, &program),
            Err(DerivationError::TooManySeeds(16))
        );
        let parts: Vec<&[u8]> = vec![&b"x"[..]; 14];
        assert!(derive_address(b"seed", &parts, &program).is_ok());
    }

    #[test]
    fn test_program_addresses_are_distinct() {
        let addresses = ProgramAddresses::default();
        let user = key(1);
        let state = addresses.governance_state().unwrap();
        let proposal0 = addresses.proposal(0u64).unwrap();
        let proposal1 = addresses.proposal(1u64).unwrap();
        let verified = addresses.verified_user(&user).unwrap();
        let vote = addresses.vote_record(0u64, &user).unwrap();
        let holding = addresses.holding(&user).unwrap();

        let all = [state, proposal0, proposal1, verified, vote, holding];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.address, b.address);
            }
        }
        // Matches the raw derivation.
        let expected = Pubkey::find_program_address(
            &[b"proposal", &1u64.to_le_bytes()],
            &bondgov_governance_interface::id(),
        );
        assert_eq!((proposal1.address, proposal1.bump), expected);
        // Different holding program, different address.
        let other = ProgramAddresses::new(addresses.governance_program, key(4));
        assert_ne!(other.holding(&user).unwrap(), holding);
    }

    proptest! {
        #[test]
        fn prop_derivation_is_deterministic(id in any::<u64>(), voter in any::<[u8; 32]>()) {
            let addresses = ProgramAddresses::default();
            let voter = Pubkey::new_from_array(voter);
            prop_assert_eq!(addresses.proposal(id).unwrap(), addresses.proposal(id).unwrap());
            prop_assert_eq!(
                addresses.vote_record(id, &voter).unwrap(),
                addresses.vote_record(id.to_string(), &voter).unwrap()
            );
        }

        #[test]
        fn prop_id_encoding_round_trips(id in any::<u64>()) {
            prop_assert_eq!(decode_id_le(encode_id_le(id).unwrap()), id);
            prop_assert_eq!(encode_id_le(id.to_string()).unwrap(), id.to_le_bytes());
        }

        #[test]
        fn prop_wide_ids_overflow(id in (u128::from(u64::MAX) + 1)..=u128::MAX) {
            prop_assert!(matches!(
                encode_id_le(id),
                Err(DerivationError::EncodingOverflow(_))
            ));
            prop_assert!(encode_id_le(id.to_string()).is_err());
        }

        #[test]
        fn prop_negative_ids_overflow(id in i64::MIN..0i64) {
            prop_assert!(encode_id_le(id).is_err());
        }
    }
}
