//! View models handed to callers (CLI, dashboards).
//!
//! Views are plain data; addresses are rendered as base58 when serialized.

use {
    crate::{
        attachment::AttachmentRecord,
        decoder::{DecodedAccount, GovernanceStatePartial},
        numeric::Numeric,
    },
    bondgov_governance_interface::{
        bond::BondAccount,
        state::{GovernanceState, Proposal, ProposalState},
    },
    log::*,
    serde::{Serialize, Serializer},
    serde_json::Value,
    solana_pubkey::Pubkey,
    std::fmt,
};

pub(crate) fn serialize_pubkey<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}

pub(crate) fn serialize_opt_pubkey<S: Serializer>(
    key: &Option<Pubkey>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match key {
        Some(key) => serializer.collect_str(key),
        None => serializer.serialize_none(),
    }
}

// ── Status ──────────────────────────────────────────────────────────────────

/// Normalized proposal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Voting,
    Succeeded,
    Executed,
    Failed,
    Unknown,
}

/// A proposal state in any encoding the client may be handed.
#[derive(Debug, Clone, PartialEq)]
pub enum StateRepr {
    /// On-chain variant index.
    Index(u64),
    /// Tag name, e.g. `"voting"` or `"Succeeded"`.
    Tag(String),
    /// Number, numeric string, or single-key object such as `{"voting":{}}`.
    Json(Value),
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 5] = [
        Self::Voting,
        Self::Succeeded,
        Self::Executed,
        Self::Failed,
        Self::Unknown,
    ];

    /// Map any state encoding onto a status.  Unrecognized encodings are
    /// `Unknown`.
    pub fn normalize(repr: &StateRepr) -> Self {
        match repr {
            StateRepr::Index(index) => Self::from_index(*index),
            StateRepr::Tag(tag) => Self::from_tag(tag),
            StateRepr::Json(value) => Self::from_json(value),
        }
    }

    fn from_index(index: u64) -> Self {
        ProposalState::from_index(index).map_or(Self::Unknown, Self::from)
    }

    fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        match tag.to_ascii_lowercase().as_str() {
            "voting" => Self::Voting,
            "succeeded" => Self::Succeeded,
            "executed" => Self::Executed,
            "failed" => Self::Failed,
            _ => Numeric::from(tag)
                .to_u64()
                .map_or(Self::Unknown, Self::from_index),
        }
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(_) => Numeric::from(value)
                .to_u64()
                .map_or(Self::Unknown, Self::from_index),
            Value::String(tag) => Self::from_tag(tag),
            Value::Object(map) if map.len() == 1 => map
                .keys()
                .next()
                .map_or(Self::Unknown, |tag| Self::from_tag(tag)),
            _ => Self::Unknown,
        }
    }

    /// Sort priority; lower sorts first.
    pub fn priority(self) -> u8 {
        match self {
            Self::Voting => 0,
            Self::Succeeded => 1,
            Self::Executed => 2,
            Self::Failed => 3,
            Self::Unknown => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voting => "voting",
            Self::Succeeded => "succeeded",
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl From<ProposalState> for ProposalStatus {
    fn from(state: ProposalState) -> Self {
        match state {
            ProposalState::Voting => Self::Voting,
            ProposalState::Succeeded => Self::Succeeded,
            ProposalState::Failed => Self::Failed,
            ProposalState::Executed => Self::Executed,
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Proposal ────────────────────────────────────────────────────────────────

/// One proposal as shown to users: on-chain fields plus the advisory
/// attachment metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalView {
    #[serde(serialize_with = "serialize_pubkey")]
    pub address: Pubkey,
    pub id: u64,
    #[serde(serialize_with = "serialize_opt_pubkey")]
    pub proposer: Option<Pubkey>,
    pub description: String,
    pub bond_purpose: String,
    pub bond_sector: String,
    pub bond_amount: u64,
    pub yes_votes: u64,
    pub no_votes: u64,
    pub start_slot: u64,
    pub end_slot: u64,
    pub status: ProposalStatus,
    /// The account exists but only partially decoded, or its recorded id
    /// disagrees with the id its address was derived from.
    pub degraded: bool,
    /// Id stored in the account bytes when it differs from `id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_id: Option<u64>,
    pub ipfs_url: Option<String>,
    pub file_name: Option<String>,
    pub attachment_timestamp: Option<u64>,
}

impl ProposalView {
    /// Build a view from a decoded proposal account.  `Absent` yields `None`:
    /// a view never exists without an on-chain account.
    ///
    /// `id` is always `expected_id`, the id the address was derived from.  A
    /// different id in the account bytes is kept in `recorded_id` and marks
    /// the view degraded.
    pub fn from_account(
        address: Pubkey,
        expected_id: u64,
        account: DecodedAccount<Proposal>,
    ) -> Option<Self> {
        let mismatch = |recorded: u64| (recorded != expected_id).then_some(recorded);
        match account {
            DecodedAccount::Absent => None,
            DecodedAccount::Decoded(proposal) => {
                let recorded_id = mismatch(proposal.id);
                if recorded_id.is_some() {
                    warn!(
                        "proposal account {address} records id {} but was derived for {expected_id}",
                        proposal.id
                    );
                }
                Some(Self {
                    address,
                    id: expected_id,
                    proposer: Some(proposal.proposer),
                    description: proposal.description,
                    bond_purpose: proposal.bond_purpose,
                    bond_sector: proposal.bond_sector,
                    bond_amount: proposal.bond_amount,
                    yes_votes: proposal.yes_votes,
                    no_votes: proposal.no_votes,
                    start_slot: proposal.start_slot,
                    end_slot: proposal.end_slot,
                    status: proposal.state.into(),
                    degraded: recorded_id.is_some(),
                    recorded_id,
                    ipfs_url: None,
                    file_name: None,
                    attachment_timestamp: None,
                })
            }
            DecodedAccount::Degraded { partial, .. } => Some(Self {
                address,
                id: expected_id,
                proposer: partial.map(|p| p.proposer),
                description: String::new(),
                bond_purpose: String::new(),
                bond_sector: String::new(),
                bond_amount: 0,
                yes_votes: 0,
                no_votes: 0,
                start_slot: 0,
                end_slot: 0,
                status: ProposalStatus::Unknown,
                degraded: true,
                recorded_id: partial.and_then(|p| mismatch(p.id)),
                ipfs_url: None,
                file_name: None,
                attachment_timestamp: None,
            }),
        }
    }

    pub fn total_votes(&self) -> u64 {
        self.yes_votes.saturating_add(self.no_votes)
    }

    /// Share of yes votes in percent; 0 when nobody voted.
    pub fn yes_percentage(&self) -> f64 {
        let total = self.total_votes();
        if total == 0 {
            0.0
        } else {
            self.yes_votes as f64 / total as f64 * 100.0
        }
    }

    /// Overwrite the attachment fields.
    pub fn apply_attachment(&mut self, record: &AttachmentRecord) {
        self.ipfs_url = Some(record.ipfs_url.clone());
        self.file_name = Some(record.file_name.clone());
        self.attachment_timestamp = Some(record.timestamp);
    }

    pub fn in_voting_window(&self, slot: u64) -> bool {
        self.start_slot <= slot && slot <= self.end_slot
    }

    /// Status for display: a voting proposal past its end slot reads
    /// `expired` even though the program has not moved it on yet.
    pub fn display_status(&self, current_slot: u64) -> &'static str {
        if self.status == ProposalStatus::Voting && current_slot > self.end_slot {
            "expired"
        } else {
            self.status.as_str()
        }
    }
}

/// Aggregates over a set of proposals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalStats {
    pub total: usize,
    pub voting: usize,
    pub succeeded: usize,
    pub executed: usize,
    pub failed: usize,
    pub unknown: usize,
    pub total_requested: u128,
    pub average_requested: f64,
    pub total_votes: u128,
    pub average_votes: f64,
    pub degraded_records: usize,
}

// ── Governance ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceSummary {
    #[serde(serialize_with = "serialize_pubkey")]
    pub address: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub admin: Pubkey,
    pub voting_period: i64,
    pub quorum_votes: u64,
    pub proposal_count: u64,
    pub degraded: bool,
}

impl GovernanceSummary {
    /// `None` when the state account is absent or unreadable.
    pub fn from_account(address: Pubkey, account: &DecodedAccount<GovernanceState>) -> Option<Self> {
        let (fields, degraded) = match account {
            DecodedAccount::Absent => return None,
            DecodedAccount::Decoded(state) => (
                GovernanceStatePartial {
                    admin: state.admin,
                    voting_period: state.voting_period,
                    quorum_votes: state.quorum_votes,
                    proposal_count: state.proposal_count,
                },
                false,
            ),
            DecodedAccount::Degraded { partial, .. } => ((*partial)?, true),
        };
        Some(Self {
            address,
            admin: fields.admin,
            voting_period: fields.voting_period,
            quorum_votes: fields.quorum_votes,
            proposal_count: fields.proposal_count,
            degraded,
        })
    }
}

// ── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BondSummary {
    #[serde(serialize_with = "serialize_pubkey")]
    pub address: Pubkey,
    pub purpose: String,
    pub sector: String,
    pub amount: u64,
    pub is_redeemed: bool,
}

impl BondSummary {
    pub fn new(address: Pubkey, bond: &BondAccount) -> Self {
        Self {
            address,
            purpose: bond.purpose.clone(),
            sector: bond.sector.clone(),
            amount: bond.amount,
            is_redeemed: bond.is_redeemed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    #[serde(serialize_with = "serialize_pubkey")]
    pub user: Pubkey,
    pub is_admin: bool,
    pub is_verified: bool,
    pub is_holder: bool,
    pub holding: Option<BondSummary>,
}

/// Why a voter may not vote right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VoteIneligibility {
    NotHolder,
    AlreadyVoted,
    NotVoting,
    OutsideWindow,
}

impl fmt::Display for VoteIneligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotHolder => "voter does not hold a bond",
            Self::AlreadyVoted => "voter has already voted on this proposal",
            Self::NotVoting => "proposal is not open for voting",
            Self::OutsideWindow => "current slot is outside the voting window",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterStatus {
    pub proposal_id: u64,
    #[serde(serialize_with = "serialize_pubkey")]
    pub voter: Pubkey,
    pub is_holder: bool,
    pub has_voted: bool,
    pub status: ProposalStatus,
    pub start_slot: u64,
    pub end_slot: u64,
    pub current_slot: u64,
}

impl VoterStatus {
    pub fn ineligibility(&self) -> Option<VoteIneligibility> {
        if !self.is_holder {
            Some(VoteIneligibility::NotHolder)
        } else if self.has_voted {
            Some(VoteIneligibility::AlreadyVoted)
        } else if self.status != ProposalStatus::Voting {
            Some(VoteIneligibility::NotVoting)
        } else if !(self.start_slot <= self.current_slot && self.current_slot <= self.end_slot) {
            Some(VoteIneligibility::OutsideWindow)
        } else {
            None
        }
    }

    pub fn can_vote(&self) -> bool {
        self.ineligibility().is_none()
    }
}
