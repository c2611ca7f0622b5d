//! Instruction definitions for the bond governance program.
//!
//! Instruction data is the 8-byte Anchor instruction discriminator followed
//! by the Borsh-encoded arguments.  The builders take already-derived
//! account addresses; PDA derivation lives in the client.

use {
    crate::{constants::ANCHOR_DISCRIMINATOR_LEN, system_program},
    borsh::{BorshDeserialize, BorshSerialize},
    solana_instruction::{AccountMeta, Instruction},
    solana_pubkey::Pubkey,
    std::io,
};

// ---------------------------------------------------------------------------
// Discriminator bytes
// ---------------------------------------------------------------------------

pub const INITIALIZE_GOVERNANCE_DISCRIMINATOR: [u8; 8] = [171, 87, 101, 237, 27, 107, 201, 57];
pub const ADD_VERIFIED_USER_DISCRIMINATOR: [u8; 8] = [126, 135, 209, 24, 87, 111, 27, 225];
pub const CREATE_PROPOSAL_DISCRIMINATOR: [u8; 8] = [132, 116, 68, 174, 216, 160, 198, 22];
pub const CAST_VOTE_DISCRIMINATOR: [u8; 8] = [20, 212, 15, 189, 69, 180, 69, 151];
pub const EXECUTE_PROPOSAL_DISCRIMINATOR: [u8; 8] = [186, 60, 116, 133, 108, 128, 111, 28];
pub const CREATE_BOND_VIA_CPI_DISCRIMINATOR: [u8; 8] = [229, 18, 126, 249, 71, 120, 203, 141];

/// Arguments of `create_proposal`, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CreateProposalArgs {
    pub description: String,
    pub bond_purpose: String,
    pub bond_sector: String,
    pub bond_amount: u64,
}

/// Instructions supported by the bond governance program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernanceInstruction {
    /// One-time initialisation of the governance state.
    ///
    /// # Accounts expected
    ///
    /// 0. `[writable]`        : Governance state PDA.
    /// 1. `[signer, writable]`: Admin, pays for the account.
    /// 2. `[]`                : System program.
    InitializeGovernance {
        voting_period: i64,
        quorum_votes: u64,
    },

    /// Admin marks a user as verified.
    ///
    /// # Accounts expected
    ///
    /// 0. `[writable]`        : Verified-user PDA of the user.
    /// 1. `[]`                : User to verify.
    /// 2. `[signer, writable]`: Admin.
    /// 3. `[]`                : System program.
    AddVerifiedUser,

    /// Create a proposal with id `proposal_count`.
    ///
    /// # Accounts expected
    ///
    /// 0. `[writable]`        : Governance state PDA.
    /// 1. `[writable]`        : Proposal PDA for the next id.
    /// 2. `[signer, writable]`: Proposer.
    /// 3. `[]`                : Proposer's verified-user PDA.
    /// 4. `[]`                : System program.
    CreateProposal(CreateProposalArgs),

    /// Cast a vote; the vote record PDA is created on first vote.
    ///
    /// # Accounts expected
    ///
    /// 0. `[writable]`        : Proposal PDA.
    /// 1. `[signer, writable]`: Voter.
    /// 2. `[]`                : Voter's bond account.
    /// 3. `[writable]`        : Vote record PDA (proposal id + voter).
    /// 4. `[]`                : System program.
    CastVote { vote_yes: bool },

    /// Finalise a succeeded proposal.
    ///
    /// # Accounts expected
    ///
    /// 0. `[writable]`        : Proposal PDA.
    /// 1. `[]`                : Governance state PDA.
    ExecuteProposal,

    /// Issue the bond of an executed proposal through the bond program.
    ///
    /// # Accounts expected
    ///
    /// 0. `[writable]`        : Proposal PDA.
    /// 1. `[signer, writable]`: Proposer.
    /// 2. `[writable]`        : New bond account.
    /// 3. `[]`                : Bond program.
    /// 4. `[]`                : System program.
    CreateBondViaCpi,
}

impl GovernanceInstruction {
    pub fn discriminator(&self) -> [u8; 8] {
        match self {
            Self::InitializeGovernance { .. } => INITIALIZE_GOVERNANCE_DISCRIMINATOR,
            Self::AddVerifiedUser => ADD_VERIFIED_USER_DISCRIMINATOR,
            Self::CreateProposal(_) => CREATE_PROPOSAL_DISCRIMINATOR,
            Self::CastVote { .. } => CAST_VOTE_DISCRIMINATOR,
            Self::ExecuteProposal => EXECUTE_PROPOSAL_DISCRIMINATOR,
            Self::CreateBondViaCpi => CREATE_BOND_VIA_CPI_DISCRIMINATOR,
        }
    }

    /// Encode as instruction data.
    pub fn data(&self) -> Vec<u8> {
        let mut data = self.discriminator().to_vec();
        // Writing into a Vec<u8> cannot fail.
        let _ = match self {
            Self::InitializeGovernance {
                voting_period,
                quorum_votes,
            } => (*voting_period, *quorum_votes).serialize(&mut data),
            Self::CreateProposal(args) => args.serialize(&mut data),
            Self::CastVote { vote_yes } => vote_yes.serialize(&mut data),
            Self::AddVerifiedUser | Self::ExecuteProposal | Self::CreateBondViaCpi => Ok(()),
        };
        data
    }

    /// Decode instruction data produced by [`GovernanceInstruction::data`].
    pub fn unpack(data: &[u8]) -> Result<Self, io::Error> {
        if data.len() < ANCHOR_DISCRIMINATOR_LEN {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "instruction data shorter than discriminator",
            ));
        }
        let (discriminator, mut body) = data.split_at(ANCHOR_DISCRIMINATOR_LEN);
        let instruction = match discriminator {
            d if d == INITIALIZE_GOVERNANCE_DISCRIMINATOR => {
                let (voting_period, quorum_votes) =
                    <(i64, u64)>::deserialize_reader(&mut body)?;
                Self::InitializeGovernance {
                    voting_period,
                    quorum_votes,
                }
            }
            d if d == ADD_VERIFIED_USER_DISCRIMINATOR => Self::AddVerifiedUser,
            d if d == CREATE_PROPOSAL_DISCRIMINATOR => {
                Self::CreateProposal(CreateProposalArgs::deserialize_reader(&mut body)?)
            }
            d if d == CAST_VOTE_DISCRIMINATOR => Self::CastVote {
                vote_yes: bool::deserialize_reader(&mut body)?,
            },
            d if d == EXECUTE_PROPOSAL_DISCRIMINATOR => Self::ExecuteProposal,
            d if d == CREATE_BOND_VIA_CPI_DISCRIMINATOR => Self::CreateBondViaCpi,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "unknown instruction discriminator",
                ))
            }
        };
        Ok(instruction)
    }
}

// ── Builders ────────────────────────────────────────────────────────────────
//
// `program_id` is normally `crate::id()`; deployments to other addresses
// pass their own.

pub fn initialize_governance(
    program_id: &Pubkey,
    governance_state: &Pubkey,
    admin: &Pubkey,
    voting_period: i64,
    quorum_votes: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*governance_state, false),
            AccountMeta::new(*admin, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: GovernanceInstruction::InitializeGovernance {
            voting_period,
            quorum_votes,
        }
        .data(),
    }
}

pub fn add_verified_user(
    program_id: &Pubkey,
    verified_user: &Pubkey,
    user: &Pubkey,
    admin: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*verified_user, false),
            AccountMeta::new_readonly(*user, false),
            AccountMeta::new(*admin, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: GovernanceInstruction::AddVerifiedUser.data(),
    }
}

pub fn create_proposal(
    program_id: &Pubkey,
    governance_state: &Pubkey,
    proposal: &Pubkey,
    proposer: &Pubkey,
    proposer_verified_user: &Pubkey,
    args: CreateProposalArgs,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*governance_state, false),
            AccountMeta::new(*proposal, false),
            AccountMeta::new(*proposer, true),
            AccountMeta::new_readonly(*proposer_verified_user, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: GovernanceInstruction::CreateProposal(args).data(),
    }
}

pub fn cast_vote(
    program_id: &Pubkey,
    proposal: &Pubkey,
    voter: &Pubkey,
    voter_bond_account: &Pubkey,
    vote_record: &Pubkey,
    vote_yes: bool,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*proposal, false),
            AccountMeta::new(*voter, true),
            AccountMeta::new_readonly(*voter_bond_account, false),
            AccountMeta::new(*vote_record, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: GovernanceInstruction::CastVote { vote_yes }.data(),
    }
}

pub fn execute_proposal(
    program_id: &Pubkey,
    proposal: &Pubkey,
    governance_state: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*proposal, false),
            AccountMeta::new_readonly(*governance_state, false),
        ],
        data: GovernanceInstruction::ExecuteProposal.data(),
    }
}

pub fn create_bond_via_cpi(
    program_id: &Pubkey,
    proposal: &Pubkey,
    proposer: &Pubkey,
    new_bond_account: &Pubkey,
    bond_program: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*proposal, false),
            AccountMeta::new(*proposer, true),
            AccountMeta::new(*new_bond_account, false),
            AccountMeta::new_readonly(*bond_program, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: GovernanceInstruction::CreateBondViaCpi.data(),
    }
}
