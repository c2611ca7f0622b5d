//! Duplicate-submission guard and stale-response tracking.
//!
//! [`InFlightGuard`] hands out at most one [`ActionPermit`] per
//! [`ActionKey`]; the key is released when the permit drops, whether the
//! action succeeded, failed or was cancelled.  [`RequestGenerations`] numbers
//! the loads of each view so a slow response cannot overwrite a newer one.

use {
    crate::view::serialize_pubkey,
    parking_lot::Mutex,
    serde::Serialize,
    solana_pubkey::Pubkey,
    std::{
        collections::{HashMap, HashSet},
        fmt,
        sync::Arc,
    },
};

/// Identity of a user-triggered write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "action")]
pub enum ActionKey {
    InitializeGovernance,
    VerifyUser {
        #[serde(serialize_with = "serialize_pubkey")]
        user: Pubkey,
    },
    CreateProposal {
        #[serde(serialize_with = "serialize_pubkey")]
        proposer: Pubkey,
    },
    CastVote {
        proposal_id: u64,
        #[serde(serialize_with = "serialize_pubkey")]
        voter: Pubkey,
    },
    InitializeHolding {
        #[serde(serialize_with = "serialize_pubkey")]
        owner: Pubkey,
    },
    ExecuteProposal {
        proposal_id: u64,
    },
    IssueBond {
        proposal_id: u64,
    },
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializeGovernance => write!(f, "initialize governance"),
            Self::VerifyUser { user } => write!(f, "verify user {user}"),
            Self::CreateProposal { proposer } => write!(f, "create proposal by {proposer}"),
            Self::CastVote { proposal_id, voter } => {
                write!(f, "vote on proposal {proposal_id} by {voter}")
            }
            Self::InitializeHolding { owner } => write!(f, "initialize holding for {owner}"),
            Self::ExecuteProposal { proposal_id } => write!(f, "execute proposal {proposal_id}"),
            Self::IssueBond { proposal_id } => write!(f, "issue bond for proposal {proposal_id}"),
        }
    }
}

/// Progress of the most recent attempt of an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "detail")]
pub enum ActionStatus {
    #[default]
    Idle,
    Pending,
    /// Transaction id, or a note when no transaction was needed.
    Succeeded(String),
    /// User-facing failure message.
    Failed(String),
}

impl ActionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<ActionKey>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the same action is already running.
    pub fn try_acquire(&self, key: ActionKey) -> Option<ActionPermit> {
        let mut active = self.active.lock();
        if !active.insert(key.clone()) {
            return None;
        }
        Some(ActionPermit {
            key,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, key: &ActionKey) -> bool {
        self.active.lock().contains(key)
    }
}

/// Releases its key on drop.
#[derive(Debug)]
#[must_use = "the action is released as soon as the permit is dropped"]
pub struct ActionPermit {
    key: ActionKey,
    active: Arc<Mutex<HashSet<ActionKey>>>,
}

impl ActionPermit {
    pub fn key(&self) -> &ActionKey {
        &self.key
    }
}

impl Drop for ActionPermit {
    fn drop(&mut self) {
        self.active.lock().remove(&self.key);
    }
}

// ── Request generations ─────────────────────────────────────────────────────

/// Views whose loads are tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Governance,
    ProposalBoard,
    UserStatus,
    VoterStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket {
    view: ViewKind,
    generation: u64,
}

impl GenerationTicket {
    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
pub struct RequestGenerations {
    latest: Mutex<HashMap<ViewKind, u64>>,
}

impl RequestGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load, superseding every earlier ticket for `view`.
    pub fn begin(&self, view: ViewKind) -> GenerationTicket {
        let mut latest = self.latest.lock();
        let generation = latest.entry(view).or_insert(0);
        *generation = generation.wrapping_add(1);
        GenerationTicket {
            view,
            generation: *generation,
        }
    }

    pub fn is_current(&self, ticket: &GenerationTicket) -> bool {
        self.latest.lock().get(&ticket.view).copied() == Some(ticket.generation)
    }
}
