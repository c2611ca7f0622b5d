//! Custom errors reported by the bond governance program.
//!
//! Anchor offsets user errors by 6000; the codes below are the on-chain
//! values found in `InstructionError::Custom`.

use {
    num_derive::{FromPrimitive, ToPrimitive},
    num_traits::{FromPrimitive, ToPrimitive},
    thiserror::Error,
};

/// First custom error code of the governance program.
pub const GOVERNANCE_ERROR_OFFSET: u32 = 6000;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum GovernanceError {
    #[error("You are not a bond holder and cannot vote.")]
    NotBondHolder = 6000,

    #[error("This proposal is not active for voting.")]
    ProposalNotActive,

    #[error("The voting period has ended for this proposal.")]
    VotingPeriodEnded,

    #[error("The voting period is not over yet.")]
    VotingPeriodNotOver,

    #[error("Proposal did not receive enough yes votes to pass.")]
    VoteFailed,

    #[error("The minimum quorum of votes was not reached.")]
    QuorumNotReached,

    #[error("This proposal has not passed the vote yet.")]
    ProposalNotSucceeded,

    #[error("The user creating the proposal is not verified.")]
    UserNotVerified,
}

impl GovernanceError {
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_u32(code)
    }

    pub fn code(self) -> u32 {
        // Every variant has an explicit u32-range discriminant.
        self.to_u32().unwrap_or(GOVERNANCE_ERROR_OFFSET)
    }
}

/// Framework-level error codes the client needs to recognise.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum AnchorErrorCode {
    #[error("A has one constraint was violated")]
    ConstraintHasOne = 2001,

    #[error("A raw constraint was violated")]
    ConstraintRaw = 2003,

    #[error("A seeds constraint was violated")]
    ConstraintSeeds = 2006,

    #[error("The account discriminator was already set on this account")]
    AccountDiscriminatorAlreadySet = 3000,

    #[error("No discriminator was found on this account")]
    AccountDiscriminatorNotFound = 3001,

    #[error("Account discriminator did not match what was expected")]
    AccountDiscriminatorMismatch = 3002,

    #[error("Failed to deserialize the account")]
    AccountDidNotDeserialize = 3003,

    #[error("The given account is owned by a different program than expected")]
    AccountOwnedByWrongProgram = 3007,

    #[error("The program expected this account to be already initialized")]
    AccountNotInitialized = 3012,
}

impl AnchorErrorCode {
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_u32(code)
    }
}

/// Custom code the system program reports when creating an account whose
/// address is already in use.
pub const SYSTEM_ACCOUNT_ALREADY_IN_USE: u32 = 0;
