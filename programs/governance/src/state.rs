//! Account state types for the bond governance program.

use {
    crate::constants::ANCHOR_DISCRIMINATOR_LEN,
    borsh::{BorshDeserialize, BorshSerialize},
    serde::{Deserialize, Serialize},
    solana_pubkey::Pubkey,
    std::io,
};

// ---------------------------------------------------------------------------
// Discriminator bytes
// ---------------------------------------------------------------------------

/// Discriminator for `GovernanceState` accounts.
pub const GOVERNANCE_STATE_DISCRIMINATOR: [u8; 8] = [29, 155, 54, 196, 179, 215, 224, 121];

/// Discriminator for `Proposal` accounts.
pub const PROPOSAL_DISCRIMINATOR: [u8; 8] = [26, 94, 189, 187, 116, 136, 53, 33];

/// Discriminator for `VerifiedUser` accounts.
pub const VERIFIED_USER_DISCRIMINATOR: [u8; 8] = [197, 144, 184, 72, 82, 65, 99, 144];

/// Discriminator for `VoteRecord` accounts (existence prevents double-voting).
pub const VOTE_RECORD_DISCRIMINATOR: [u8; 8] = [112, 9, 123, 165, 234, 9, 157, 167];

// ---------------------------------------------------------------------------
// AnchorAccount
// ---------------------------------------------------------------------------

/// An account whose data is an 8-byte discriminator followed by the
/// Borsh-encoded struct.
pub trait AnchorAccount: BorshSerialize + BorshDeserialize {
    /// Leading discriminator bytes.
    const DISCRIMINATOR: [u8; 8];

    /// Struct name, as used for the discriminator preimage.
    const NAME: &'static str;

    /// Deserialise from raw account data (expects leading discriminator).
    ///
    /// Trailing bytes are ignored: accounts are allocated with padding.
    fn try_from_account_data(data: &[u8]) -> Result<Self, io::Error> {
        if data.len() < ANCHOR_DISCRIMINATOR_LEN
            || data[..ANCHOR_DISCRIMINATOR_LEN] != Self::DISCRIMINATOR
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("missing or invalid {} discriminator", Self::NAME),
            ));
        }
        let mut cursor = &data[ANCHOR_DISCRIMINATOR_LEN..];
        BorshDeserialize::deserialize_reader(&mut cursor)
    }

    /// Serialise into raw account data (prepends discriminator).
    fn to_account_data(&self) -> Result<Vec<u8>, io::Error> {
        let mut data = Self::DISCRIMINATOR.to_vec();
        BorshSerialize::serialize(self, &mut data)?;
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// GovernanceState
// ---------------------------------------------------------------------------

/// Singleton governance configuration, stored at the `governance_state` PDA.
///
/// Layout:
///   discriminator   (8)
///   admin           (32)  @ 8
///   voting_period   (8)   @ 40
///   quorum_votes    (8)   @ 48
///   proposal_count  (8)   @ 56
///   = 64 bytes
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct GovernanceState {
    /// Administrator allowed to verify users.
    pub admin: Pubkey,

    /// Voting period length in slots.
    pub voting_period: i64,

    /// Minimum number of votes for a proposal to be decided.
    pub quorum_votes: u64,

    /// Running proposal counter; the next proposal gets this id.
    pub proposal_count: u64,
}

impl GovernanceState {
    pub const SERIALIZED_SIZE: usize = ANCHOR_DISCRIMINATOR_LEN + 32 + 8 + 8 + 8;
}

impl AnchorAccount for GovernanceState {
    const DISCRIMINATOR: [u8; 8] = GOVERNANCE_STATE_DISCRIMINATOR;
    const NAME: &'static str = "GovernanceState";
}

// ---------------------------------------------------------------------------
// Proposal
// ---------------------------------------------------------------------------

/// Lifecycle state of a proposal, in on-chain variant order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ProposalState {
    /// Voting is open.
    Voting,
    /// Voting ended and the proposal passed.
    Succeeded,
    /// Voting ended and the proposal did not pass.
    Failed,
    /// Passed and executed.
    Executed,
}

impl ProposalState {
    /// Borsh variant index.
    pub const fn index(self) -> u8 {
        match self {
            Self::Voting => 0,
            Self::Succeeded => 1,
            Self::Failed => 2,
            Self::Executed => 3,
        }
    }

    pub const fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::Voting),
            1 => Some(Self::Succeeded),
            2 => Some(Self::Failed),
            3 => Some(Self::Executed),
            _ => None,
        }
    }
}

/// On-chain state for a single funding proposal.
///
/// Fixed header:
///   discriminator  (8)
///   id             (8)   @ 8
///   proposer       (32)  @ 16
/// followed by variable-length fields.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    /// Monotonic identifier assigned from `GovernanceState::proposal_count`.
    pub id: u64,

    /// Account that created the proposal.
    pub proposer: Pubkey,

    /// Free-text description.
    pub description: String,

    pub yes_votes: u64,
    pub no_votes: u64,

    /// First slot in which votes are accepted.
    pub start_slot: u64,

    /// Last slot in which votes are accepted.
    pub end_slot: u64,

    pub state: ProposalState,

    /// What the funds are for.
    pub bond_purpose: String,

    /// Sector tag (e.g. "Healthcare").
    pub bond_sector: String,

    /// Requested amount in lamports.
    pub bond_amount: u64,
}

impl AnchorAccount for Proposal {
    const DISCRIMINATOR: [u8; 8] = PROPOSAL_DISCRIMINATOR;
    const NAME: &'static str = "Proposal";
}

// ---------------------------------------------------------------------------
// VerifiedUser
// ---------------------------------------------------------------------------

/// Marks an identity approved by the admin; required to create proposals.
///
/// Layout:
///   discriminator  (8)
///   authority      (32)  @ 8
///   is_verified    (1)   @ 40
///   = 41 bytes
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct VerifiedUser {
    pub authority: Pubkey,
    pub is_verified: bool,
}

impl VerifiedUser {
    pub const SERIALIZED_SIZE: usize = ANCHOR_DISCRIMINATOR_LEN + 32 + 1;
}

impl AnchorAccount for VerifiedUser {
    const DISCRIMINATOR: [u8; 8] = VERIFIED_USER_DISCRIMINATOR;
    const NAME: &'static str = "VerifiedUser";
}

// ---------------------------------------------------------------------------
// VoteRecord: prevents double-voting
// ---------------------------------------------------------------------------

/// Per-(proposal, voter) marker.  Created on first vote; its existence is the
/// "already voted" signal.
///
/// Layout:
///   discriminator  (8)
///   proposal_id    (8)   @ 8
///   voter          (32)  @ 16
///   = 48 bytes
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct VoteRecord {
    pub proposal_id: u64,
    pub voter: Pubkey,
}

impl VoteRecord {
    pub const SERIALIZED_SIZE: usize = ANCHOR_DISCRIMINATOR_LEN + 8 + 32;
}

impl AnchorAccount for VoteRecord {
    const DISCRIMINATOR: [u8; 8] = VOTE_RECORD_DISCRIMINATOR;
    const NAME: &'static str = "VoteRecord";
}

#[cfg(test)]
mod tests {
    use {
        super::*, assert_matches::assert_matches, solana_sha256_hasher::hashv,
        test_case::test_case,
    };

    fn anchor_discriminator(name: &str) -> [u8; 8] {
        let hash = hashv(&[b"account:", name.as_bytes()]).to_bytes();
        let mut out = [0u8; 8];
        out.copy_from_slice(&hash[..8]);
        out
    }

    #[test_case(GovernanceState::NAME, GovernanceState::DISCRIMINATOR; "governance state")]
    #[test_case(Proposal::NAME, Proposal::DISCRIMINATOR; "proposal")]
    #[test_case(VerifiedUser::NAME, VerifiedUser::DISCRIMINATOR; "verified user")]
    #[test_case(VoteRecord::NAME, VoteRecord::DISCRIMINATOR; "vote record")]
    fn test_discriminator_matches_anchor_preimage(name: &str, discriminator: [u8; 8]) {
        assert_eq!(anchor_discriminator(name), discriminator);
    }

    fn sample_proposal() -> Proposal {
        Proposal {
            id: 3,
            proposer: Pubkey::new_from_array([7; 32]),
            description: "Fund the rural clinic network".to_string(),
            yes_votes: 10,
            no_votes: 2,
            start_slot: 100,
            end_slot: 200,
            state: ProposalState::Succeeded,
            bond_purpose: "Clinics".to_string(),
            bond_sector: "Healthcare".to_string(),
            bond_amount: 5_000_000_000,
        }
    }

    #[test]
    fn test_proposal_tolerates_padding() {
        let proposal = sample_proposal();
        let mut data = proposal.to_account_data().unwrap();
        data.resize(data.len() + 64, 0);
        assert_eq!(Proposal::try_from_account_data(&data).unwrap(), proposal);
    }

    #[test]
    fn test_wrong_discriminator_rejected() {
        let data = sample_proposal().to_account_data().unwrap();
        assert_matches!(
            VerifiedUser::try_from_account_data(&data),
            Err(e) if e.kind() == io::ErrorKind::InvalidData
        );
        assert!(Proposal::try_from_account_data(&data[..4]).is_err());
    }

    #[test]
    fn test_fixed_layout_offsets() {
        let state = GovernanceState {
            admin: Pubkey::new_from_array([1; 32]),
            voting_period: 100_000,
            quorum_votes: 3,
            proposal_count: 9,
        };
        let data = state.to_account_data().unwrap();
        assert_eq!(data.len(), GovernanceState::SERIALIZED_SIZE);
        assert_eq!(&data[8..40], &[1; 32]);
        assert_eq!(u64::from_le_bytes(data[56..64].try_into().unwrap()), 9);

        let user = VerifiedUser {
            authority: Pubkey::new_from_array([2; 32]),
            is_verified: true,
        };
        let data = user.to_account_data().unwrap();
        assert_eq!(data.len(), VerifiedUser::SERIALIZED_SIZE);
        assert_eq!(data[40], 1);
    }

    #[test]
    fn test_proposal_state_index() {
        for state in [
            ProposalState::Voting,
            ProposalState::Succeeded,
            ProposalState::Failed,
            ProposalState::Executed,
        ] {
            assert_eq!(ProposalState::from_index(state.index() as u64), Some(state));
            assert_eq!(borsh::to_vec(&state).unwrap(), vec![state.index()]);
        }
        assert_eq!(ProposalState::from_index(4), None);
    }
}
