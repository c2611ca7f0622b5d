//! Constants for the bond governance program interface.
//!
//! PDA seeds, fixed layout sizes and the form limits the dashboard enforces
//! before a proposal is submitted.

// ---------------------------------------------------------------------------
// PDA seeds
// ---------------------------------------------------------------------------

/// Seed of the singleton governance state account.
pub const GOVERNANCE_STATE_SEED: &[u8] = b"governance_state";

/// Seed prefix of proposal accounts (followed by the id as `u64` LE).
pub const PROPOSAL_SEED: &[u8] = b"proposal";

/// Seed prefix of verified-user accounts (followed by the user's pubkey).
pub const VERIFIED_USER_SEED: &[u8] = b"verified_user";

/// Seed prefix of vote records (followed by proposal id LE and voter pubkey).
pub const VOTE_RECORD_SEED: &[u8] = b"vote";

/// Seed prefix of bond (holding) accounts, owned by the bond program.
pub const BOND_SEED: &[u8] = b"bond";

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Length of the Anchor account / instruction discriminator.
pub const ANCHOR_DISCRIMINATOR_LEN: usize = 8;

/// Length of a serialized pubkey.
pub const PUBKEY_LEN: usize = 32;

/// Width of an encoded proposal id seed.
pub const PROPOSAL_ID_SEED_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Form limits
// ---------------------------------------------------------------------------

/// Minimum proposal description length, in characters.
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Minimum bond purpose length, in characters.
pub const MIN_BOND_PURPOSE_LEN: usize = 5;

/// Sectors a bond proposal may be filed under.
pub const BOND_SECTORS: &[&str] = &[
    "Healthcare",
    "Education",
    "Disaster Relief",
    "Electoral Funding",
    "Infrastructure",
    "Social Welfare",
    "Public Finance",
];

/// Lamports per SOL, for display only.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
