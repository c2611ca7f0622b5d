//! Companion bond program.
//!
//! A bond account at the `["bond", owner]` PDA marks its owner as a bond
//! holder, which is the eligibility gate for voting.

use {
    crate::{
        state::AnchorAccount,
        system_program,
    },
    borsh::{BorshDeserialize, BorshSerialize},
    solana_instruction::{AccountMeta, Instruction},
    solana_pubkey::Pubkey,
};

solana_pubkey::declare_id!("6hPPwfMV5yMR6pCvg1kt2JaAT5FSRjnefuYQ74s62XLL");

/// Discriminator for `BondAccount` accounts.
pub const BOND_ACCOUNT_DISCRIMINATOR: [u8; 8] = [140, 228, 237, 10, 239, 187, 187, 64];

/// `initialize_bond` instruction discriminator.
pub const INITIALIZE_BOND_DISCRIMINATOR: [u8; 8] = [135, 182, 183, 104, 169, 38, 102, 147];

/// A funding bond held by `authority`.
///
/// Fixed header:
///   discriminator  (8)
///   authority      (32)  @ 8
/// followed by variable-length fields.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BondAccount {
    /// Current owner/controller of the bond.
    pub authority: Pubkey,

    /// What the funds are for.
    pub purpose: String,

    /// Sector the funding belongs to.
    pub sector: String,

    /// Amount in lamports.
    pub amount: u64,

    pub is_redeemed: bool,
}

impl AnchorAccount for BondAccount {
    const DISCRIMINATOR: [u8; 8] = BOND_ACCOUNT_DISCRIMINATOR;
    const NAME: &'static str = "BondAccount";
}

/// Arguments of `initialize_bond`.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializeBondArgs {
    pub purpose: String,
    pub sector: String,
    pub amount: u64,
}

/// Build an `initialize_bond` instruction.
///
/// # Accounts expected
///
/// 0. `[writable]` Bond account (the `["bond", issuer]` PDA).
/// 1. `[signer, writable]` Issuer, pays for the account.
/// 2. `[]` System program.
pub fn initialize_bond(
    program_id: &Pubkey,
    bond_account: &Pubkey,
    issuer: &Pubkey,
    args: &InitializeBondArgs,
) -> Instruction {
    let mut data = INITIALIZE_BOND_DISCRIMINATOR.to_vec();
    // Vec<u8> writer cannot fail.
    args.serialize(&mut data).ok();
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*bond_account, false),
            AccountMeta::new(*issuer, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}

/// Decode `initialize_bond` instruction data.
pub fn decode_initialize_bond(data: &[u8]) -> Option<InitializeBondArgs> {
    let (discriminator, body) = data.split_first_chunk::<8>()?;
    if *discriminator != INITIALIZE_BOND_DISCRIMINATOR {
        return None;
    }
    InitializeBondArgs::try_from_slice(body).ok()
}
