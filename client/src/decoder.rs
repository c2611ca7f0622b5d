//! Raw account bytes to typed records.
//!
//! Decoding is three-valued.  An account that does not exist is
//! [`DecodedAccount::Absent`]; one that parses is `Decoded`; one that exists
//! but does not parse is `Degraded`, optionally carrying whatever could be
//! read from fixed offsets.  Existence is authoritative on its own, so a
//! degraded record still answers "is there an account here".
//!
//! Nothing in this module returns an error or panics on malformed input.

use {
    bondgov_governance_interface::{
        bond::BondAccount,
        constants::{ANCHOR_DISCRIMINATOR_LEN, PUBKEY_LEN},
        state::{AnchorAccount, GovernanceState, Proposal, VerifiedUser, VoteRecord},
    },
    log::*,
    solana_pubkey::Pubkey,
    std::fmt,
};

/// An account as returned by the RPC boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
    pub owner: Pubkey,
    pub lamports: u64,
    /// Set for deployed programs.
    pub executable: bool,
    pub data: Vec<u8>,
}

/// Why a present account could not be fully decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    OwnerMismatch { expected: Pubkey, actual: Pubkey },
    /// Data shorter than the discriminator or carrying a different one.
    Discriminator,
    /// Discriminator matched but the body did not parse.
    Body(String),
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OwnerMismatch { expected, actual } => {
                write!(f, "owned by {actual}, expected {expected}")
            }
            Self::Discriminator => write!(f, "missing or unexpected discriminator"),
            Self::Body(reason) => write!(f, "malformed body: {reason}"),
        }
    }
}

/// Result of decoding one account.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedAccount<T: AccountLayout> {
    Absent,
    Decoded(T),
    Degraded {
        partial: Option<T::Partial>,
        reason: DecodeFailure,
        data_len: usize,
    },
}

impl<T: AccountLayout> DecodedAccount<T> {
    pub fn exists(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    pub fn decoded(&self) -> Option<&T> {
        match self {
            Self::Decoded(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_decoded(self) -> Option<T> {
        match self {
            Self::Decoded(value) => Some(value),
            _ => None,
        }
    }

    pub fn partial(&self) -> Option<&T::Partial> {
        match self {
            Self::Degraded { partial, .. } => partial.as_ref(),
            _ => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// A decodable account kind with a fixed-offset fallback.
pub trait AccountLayout: AnchorAccount + fmt::Debug + Clone + PartialEq {
    /// Fields readable without a full Borsh decode.
    type Partial: fmt::Debug + Clone + PartialEq;

    /// Minimum data length for the fallback to apply.
    const MIN_FALLBACK_LEN: usize;

    /// Read the fixed-offset fields.  Only called with at least
    /// `MIN_FALLBACK_LEN` bytes.
    fn read_partial(data: &[u8]) -> Option<Self::Partial>;

    fn to_partial(&self) -> Self::Partial;
}

/// Decode `raw` as a `T` owned by `expected_owner`.
pub fn decode_account<T: AccountLayout>(
    address: &Pubkey,
    raw: Option<&RawAccount>,
    expected_owner: &Pubkey,
) -> DecodedAccount<T> {
    let Some(raw) = raw else {
        trace!("{} {address}: absent", T::NAME);
        return DecodedAccount::Absent;
    };

    if raw.owner != *expected_owner {
        warn!(
            "{} {address}: owned by {}, expected {expected_owner}",
            T::NAME,
            raw.owner
        );
        return DecodedAccount::Degraded {
            partial: None,
            reason: DecodeFailure::OwnerMismatch {
                expected: *expected_owner,
                actual: raw.owner,
            },
            data_len: raw.data.len(),
        };
    }

    let data = raw.data.as_slice();
    let reason = if data.len() < ANCHOR_DISCRIMINATOR_LEN
        || data[..ANCHOR_DISCRIMINATOR_LEN] != T::DISCRIMINATOR
    {
        DecodeFailure::Discriminator
    } else {
        match T::try_from_account_data(data) {
            Ok(value) => return DecodedAccount::Decoded(value),
            Err(err) => DecodeFailure::Body(err.to_string()),
        }
    };

    let partial = if data.len() >= T::MIN_FALLBACK_LEN {
        T::read_partial(data)
    } else {
        None
    };
    if partial.is_some() {
        debug!(
            "{} {address}: {reason}; using fixed-offset fallback ({} bytes)",
            T::NAME,
            data.len()
        );
    } else {
        warn!(
            "{} {address}: {reason}; exists but unparseable ({} bytes)",
            T::NAME,
            data.len()
        );
    }
    DecodedAccount::Degraded {
        partial,
        reason,
        data_len: data.len(),
    }
}

// ── Fixed-offset readers ────────────────────────────────────────────────────

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let end = offset.checked_add(8)?;
    let bytes: [u8; 8] = data.get(offset..end)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

fn read_i64(data: &[u8], offset: usize) -> Option<i64> {
    let end = offset.checked_add(8)?;
    let bytes: [u8; 8] = data.get(offset..end)?.try_into().ok()?;
    Some(i64::from_le_bytes(bytes))
}

fn read_pubkey(data: &[u8], offset: usize) -> Option<Pubkey> {
    let end = offset.checked_add(PUBKEY_LEN)?;
    let bytes: [u8; PUBKEY_LEN] = data.get(offset..end)?.try_into().ok()?;
    Some(Pubkey::new_from_array(bytes))
}

// ── Layouts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernanceStatePartial {
    pub admin: Pubkey,
    pub voting_period: i64,
    pub quorum_votes: u64,
    pub proposal_count: u64,
}

impl AccountLayout for GovernanceState {
    type Partial = GovernanceStatePartial;
    const MIN_FALLBACK_LEN: usize = 64;

    fn read_partial(data: &[u8]) -> Option<Self::Partial> {
        Some(GovernanceStatePartial {
            admin: read_pubkey(data, 8)?,
            voting_period: read_i64(data, 40)?,
            quorum_votes: read_u64(data, 48)?,
            proposal_count: read_u64(data, 56)?,
        })
    }

    fn to_partial(&self) -> Self::Partial {
        GovernanceStatePartial {
            admin: self.admin,
            voting_period: self.voting_period,
            quorum_votes: self.quorum_votes,
            proposal_count: self.proposal_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalPartial {
    pub id: u64,
    pub proposer: Pubkey,
}

impl AccountLayout for Proposal {
    type Partial = ProposalPartial;
    const MIN_FALLBACK_LEN: usize = 48;

    fn read_partial(data: &[u8]) -> Option<Self::Partial> {
        Some(ProposalPartial {
            id: read_u64(data, 8)?,
            proposer: read_pubkey(data, 16)?,
        })
    }

    fn to_partial(&self) -> Self::Partial {
        ProposalPartial {
            id: self.id,
            proposer: self.proposer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedUserPartial {
    pub authority: Pubkey,
    pub is_verified: bool,
}

impl AccountLayout for VerifiedUser {
    type Partial = VerifiedUserPartial;
    const MIN_FALLBACK_LEN: usize = 41;

    fn read_partial(data: &[u8]) -> Option<Self::Partial> {
        Some(VerifiedUserPartial {
            authority: read_pubkey(data, 8)?,
            is_verified: *data.get(40)? == 1,
        })
    }

    fn to_partial(&self) -> Self::Partial {
        VerifiedUserPartial {
            authority: self.authority,
            is_verified: self.is_verified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteRecordPartial {
    pub proposal_id: u64,
    pub voter: Pubkey,
}

impl AccountLayout for VoteRecord {
    type Partial = VoteRecordPartial;
    const MIN_FALLBACK_LEN: usize = 48;

    fn read_partial(data: &[u8]) -> Option<Self::Partial> {
        Some(VoteRecordPartial {
            proposal_id: read_u64(data, 8)?,
            voter: read_pubkey(data, 16)?,
        })
    }

    fn to_partial(&self) -> Self::Partial {
        VoteRecordPartial {
            proposal_id: self.proposal_id,
            voter: self.voter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondPartial {
    pub authority: Pubkey,
}

impl AccountLayout for BondAccount {
    type Partial = BondPartial;
    const MIN_FALLBACK_LEN: usize = 40;

    fn read_partial(data: &[u8]) -> Option<Self::Partial> {
        Some(BondPartial {
            authority: read_pubkey(data, 8)?,
        })
    }

    fn to_partial(&self) -> Self::Partial {
        BondPartial {
            authority: self.authority,
        }
    }
}
