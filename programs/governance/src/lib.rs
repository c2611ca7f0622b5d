//! Bond Governance program interface
//!
//! Client-side mirror of the on-chain governance program and its companion
//! bond (holding) program.  Nothing here executes program logic; it only
//! describes the wire contract the client needs to talk to them:
//!
//! - account layouts and their 8-byte Anchor discriminators ([`state`],
//!   [`bond`]),
//! - PDA seed constants and form limits ([`constants`]),
//! - instruction encoders ([`instruction`]),
//! - custom program error codes ([`error`]).
//!
//! ## Account layout
//!
//! Every account starts with an 8-byte discriminator followed by the
//! Borsh-encoded struct.  Accounts are allocated with padding, so decoding
//! must tolerate trailing bytes.
//!
//! ## Lifecycle
//!
//! ```text
//!   voting ──▶ succeeded ──▶ executed
//!     │
//!     └─────▶ failed
//! ```
//!
//! Transitions are made exclusively by the program; the client only mirrors
//! the value it reads back.

pub mod bond;
pub mod constants;
pub mod error;
pub mod instruction;
pub mod state;

solana_pubkey::declare_id!("HbD9TyCRmTboM3QuL2h227hEhzKBfL3CTgqtohtGKP92");

/// The native system program, referenced by every account-creating
/// instruction.
pub mod system_program {
    solana_pubkey::declare_id!("11111111111111111111111111111111");
}
