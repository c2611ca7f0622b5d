//! Bond governance client
//!
//! Everything a front end needs to talk to the bond governance program
//! without owning any of the chain logic itself:
//!
//! - **Address derivation**: deterministic PDAs for governance state,
//!   proposals, verified users, vote records and holdings.
//! - **Account decoding**: Anchor accounts decode to `Absent`, `Decoded` or
//!   `Degraded`, so one malformed record never hides the rest.
//! - **Reconciliation**: on-chain proposals merged with locally cached
//!   attachment metadata, sorted for display and summarized.
//! - **Writes**: guarded submissions with classified failures.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────────────────────────────────────────┐
//!  │  Session (one per user context)              │
//!  │  • InFlightGuard / RequestGenerations        │
//!  │  • ProposalBoard (last applied refresh)      │
//!  └──────┬──────────────┬──────────────┬─────────┘
//!         │              │              │
//!  ┌──────▼──────┐ ┌─────▼──────┐ ┌─────▼─────────────┐
//!  │ GovernanceRpc│ │ Transaction│ │ AttachmentStore / │
//!  │ (reads)      │ │ Submitter  │ │ AttachmentUploader│
//!  └──────┬──────┘ └─────┬──────┘ └───────────────────┘
//!         │              │
//!  ┌──────▼──────────────▼────────────────────────┐
//!  │  JSON-RPC node                               │
//!  └──────────────────────────────────────────────┘
//! ```
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`address`]      | PDA derivation and id encoding |
//! | [`decoder`]      | Three-valued account decoding with partial fallback |
//! | [`diagnostics`]  | Node, program and wallet account health report |
//! | [`view`]         | Display-ready proposal, governance and user views |
//! | [`reconcile`]    | Merge, sort, stats and orphan detection |
//! | [`attachment`]   | Attachment records, stores and the pinning client |
//! | [`rpc`]          | JSON-RPC reads and transaction submission |
//! | [`submit_error`] | Classification of failed submissions |
//! | [`guard`]        | Duplicate-action guard and request generations |
//! | [`session`]      | The per-user context tying it together |
//! | [`config`]       | YAML configuration and keypair files |
//! | [`error`]        | Crate-wide error enum |

pub mod address;
pub mod attachment;
pub mod config;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod guard;
pub mod numeric;
pub mod reconcile;
pub mod rpc;
pub mod rpc_response;
pub mod session;
pub mod submit_error;
#[cfg(any(test, feature = "dev-context-only-utils"))]
pub mod test_utils;
pub mod view;

pub use {
    address::{DerivedAddress, ProgramAddresses},
    decoder::{decode_account, DecodedAccount, RawAccount},
    error::{ClientError, Result},
    reconcile::ProposalBoard,
    session::{ProposalDraft, Session},
    view::{ProposalStatus, ProposalView},
};
