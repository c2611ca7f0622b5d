use {
    crate::cli::{CliConfig, CliError, ProcessResult},
    bondgov_client::{
        address::parse_address,
        attachment::{AttachmentFile, AttachmentRecord},
        diagnostics::{AccountFacts, DiagnosticsReport, ReadOutcome},
        numeric::Numeric,
        reconcile::OrphanReport,
        session::ProposalDraft,
        view::{GovernanceSummary, ProposalStats, StateRepr, UserStatus, VoterStatus},
        ProposalStatus, ProposalView, Session,
    },
    bondgov_governance_interface::constants::{BOND_SECTORS, LAMPORTS_PER_SOL},
    clap::{App, Arg, ArgMatches, SubCommand},
    serde::Serialize,
    solana_pubkey::Pubkey,
    std::{fmt, path::PathBuf},
};

pub const DEFAULT_VOTING_PERIOD: &str = "100";
pub const DEFAULT_QUORUM_VOTES: &str = "1";

const SOL_DECIMALS: usize = 9;

/// Parse a decimal SOL amount into lamports without going through floats.
pub fn parse_sol_amount(text: &str) -> Result<u64, String> {
    let invalid = || format!("invalid SOL amount '{text}'");
    let (whole, fraction) = text.trim().split_once('.').unwrap_or((text.trim(), ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > SOL_DECIMALS
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<width$}", width = SOL_DECIMALS)
            .parse()
            .map_err(|_| invalid())?
    };
    whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|lamports| lamports.checked_add(fraction))
        .ok_or_else(invalid)
}

pub fn format_sol(lamports: u64) -> String {
    let whole = lamports.checked_div(LAMPORTS_PER_SOL).unwrap_or_default();
    let fraction = lamports.checked_rem(LAMPORTS_PER_SOL).unwrap_or_default();
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{fraction:0>width$}", width = SOL_DECIMALS);
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

/// Accepts status names and on-chain indices; `unknown` only when spelled out.
fn parse_status(text: &str) -> Option<ProposalStatus> {
    match ProposalStatus::normalize(&StateRepr::Tag(text.to_string())) {
        ProposalStatus::Unknown if !text.trim().eq_ignore_ascii_case("unknown") => None,
        status => Some(status),
    }
}

/// Whole numbers go through [`Numeric`]: `7`, `+7` and `7.0` are accepted,
/// negatives, fractions and values past `u64::MAX` are not.
fn parse_u64(text: &str) -> Result<u64, String> {
    Numeric::from(text)
        .to_u64()
        .map_err(|err| err.to_string())
}

fn parse_positive_i64(text: &str) -> Result<i64, String> {
    match parse_u64(text).map(i64::try_from) {
        Ok(Ok(value)) if value > 0 => Ok(value),
        _ => Err(format!("'{text}' is not a positive integer")),
    }
}

// ── Validators ──────────────────────────────────────────────────────────────

fn is_valid_pubkey(value: String) -> Result<(), String> {
    parse_address(&value)
        .map(|_| ())
        .map_err(|err| err.to_string())
}

fn is_parsable_u64(value: String) -> Result<(), String> {
    parse_u64(&value).map(|_| ())
}

fn is_positive_i64(value: String) -> Result<(), String> {
    parse_positive_i64(&value).map(|_| ())
}

fn is_sol_amount(value: String) -> Result<(), String> {
    parse_sol_amount(&value).map(|_| ())
}

fn is_valid_sector(value: String) -> Result<(), String> {
    if BOND_SECTORS.contains(&value.as_str()) {
        Ok(())
    } else {
        Err(format!(
            "invalid sector '{value}'. Valid: {}",
            BOND_SECTORS.join(", ")
        ))
    }
}

fn is_valid_status_filter(value: String) -> Result<(), String> {
    if value == "all" || parse_status(&value).is_some() {
        Ok(())
    } else {
        Err(format!(
            "invalid status '{value}'. Valid: all, voting, succeeded, executed, failed, unknown"
        ))
    }
}

fn is_vote_choice(value: String) -> Result<(), String> {
    match value.as_str() {
        "yes" | "no" => Ok(()),
        _ => Err(format!("invalid vote '{value}'. Valid: yes, no")),
    }
}

// ── Commands ────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
pub enum GovernanceCliCommand {
    Info,
    Proposals {
        status: Option<ProposalStatus>,
    },
    Proposal {
        proposal_id: u64,
    },
    UserStatus {
        user: Option<Pubkey>,
    },
    VoterStatus {
        proposal_id: u64,
        voter: Option<Pubkey>,
    },
    InitGovernance {
        voting_period: i64,
        quorum_votes: u64,
    },
    VerifyUser {
        user: Pubkey,
    },
    Propose {
        draft: ProposalDraft,
        attachment: Option<PathBuf>,
    },
    Vote {
        proposal_id: u64,
        vote_yes: bool,
    },
    InitHolding {
        purpose: String,
        sector: String,
        amount: u64,
    },
    Execute {
        proposal_id: u64,
    },
    IssueBond {
        proposal_id: u64,
    },
    Attach {
        proposal_id: u64,
        ipfs_url: String,
        file_name: String,
    },
    AttachmentsPrune {
        dry_run: bool,
    },
    Diagnose {
        user: Option<Pubkey>,
    },
}

impl GovernanceCliCommand {
    /// Whether the command needs the configured keypair.
    pub fn requires_signer(&self) -> bool {
        match self {
            Self::Info
            | Self::Proposals { .. }
            | Self::Proposal { .. }
            | Self::Attach { .. }
            | Self::AttachmentsPrune { .. }
            | Self::Diagnose { .. } => false,
            Self::UserStatus { user } => user.is_none(),
            Self::VoterStatus { voter, .. } => voter.is_none(),
            Self::InitGovernance { .. }
            | Self::VerifyUser { .. }
            | Self::Propose { .. }
            | Self::Vote { .. }
            | Self::InitHolding { .. }
            | Self::Execute { .. }
            | Self::IssueBond { .. } => true,
        }
    }

    /// Whether the configured keypair is used when it can be read.
    pub fn uses_optional_signer(&self) -> bool {
        matches!(self, Self::Diagnose { user: None })
    }
}

// ── Output Structs ──────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct CliGovernanceInfo(pub GovernanceSummary);

impl fmt::Display for CliGovernanceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = &self.0;
        writeln!(f, "Bond Governance")?;
        writeln!(f, "  Address:          {}", summary.address)?;
        writeln!(f, "  Admin:            {}", summary.admin)?;
        writeln!(f, "  Voting Period:    {} slots", summary.voting_period)?;
        writeln!(f, "  Quorum:           {} votes", summary.quorum_votes)?;
        writeln!(f, "  Proposals:        {}", summary.proposal_count)?;
        if summary.degraded {
            writeln!(f, "  (state account only partially decoded)")?;
        }
        Ok(())
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CliProposal {
    #[serde(flatten)]
    pub view: ProposalView,
    pub display_status: String,
    pub yes_percentage: f64,
}

impl CliProposal {
    pub fn new(view: ProposalView, current_slot: u64) -> Self {
        Self {
            display_status: view.display_status(current_slot).to_string(),
            yes_percentage: view.yes_percentage(),
            view,
        }
    }
}

impl fmt::Display for CliProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = &self.view;
        writeln!(f, "Proposal #{}", view.id)?;
        writeln!(f, "  Address:       {}", view.address)?;
        if let Some(proposer) = view.proposer {
            writeln!(f, "  Proposer:      {proposer}")?;
        }
        writeln!(f, "  Status:        {}", self.display_status)?;
        if let Some(recorded) = view.recorded_id {
            writeln!(f, "  Recorded Id:   {recorded} (does not match address)")?;
        }
        if view.degraded {
            writeln!(f, "  (account only partially decoded)")?;
            return Ok(());
        }
        writeln!(f, "  Description:   {}", view.description)?;
        writeln!(f, "  Bond Purpose:  {}", view.bond_purpose)?;
        writeln!(f, "  Bond Sector:   {}", view.bond_sector)?;
        writeln!(f, "  Bond Amount:   {} SOL", format_sol(view.bond_amount))?;
        writeln!(
            f,
            "  Votes:         {} yes / {} no ({:.1}% yes)",
            view.yes_votes, view.no_votes, self.yes_percentage
        )?;
        writeln!(f, "  Voting Slots:  {}..={}", view.start_slot, view.end_slot)?;
        if let (Some(url), Some(name)) = (&view.ipfs_url, &view.file_name) {
            writeln!(f, "  Attachment:    {name} ({url})")?;
        }
        Ok(())
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CliProposalList {
    pub proposals: Vec<CliProposal>,
    pub stats: ProposalStats,
    pub slot: u64,
}

impl fmt::Display for CliProposalList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.proposals.is_empty() {
            return writeln!(f, "No proposals found.");
        }
        writeln!(
            f,
            "{:<6} {:<10} {:>6} {:>6} {:>7} {:>14} {:<18} {:<30}",
            "ID", "Status", "Yes", "No", "Yes %", "Amount (SOL)", "Sector", "Purpose"
        )?;
        writeln!(f, "{}", "-".repeat(102))?;
        for proposal in &self.proposals {
            let view = &proposal.view;
            writeln!(
                f,
                "{:<6} {:<10} {:>6} {:>6} {:>6.1}% {:>14} {:<18} {:<30}",
                view.id,
                proposal.display_status,
                view.yes_votes,
                view.no_votes,
                proposal.yes_percentage,
                format_sol(view.bond_amount),
                truncate(&view.bond_sector, 18),
                truncate(&view.bond_purpose, 30),
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{} proposals: {} voting, {} succeeded, {} executed, {} failed",
            self.stats.total,
            self.stats.voting,
            self.stats.succeeded,
            self.stats.executed,
            self.stats.failed
        )?;
        if self.stats.degraded_records > 0 {
            writeln!(
                f,
                "{} records could only be partially decoded",
                self.stats.degraded_records
            )?;
        }
        Ok(())
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CliDiagnostics {
    #[serde(flatten)]
    pub report: DiagnosticsReport,
    pub problems: Vec<String>,
}

impl From<DiagnosticsReport> for CliDiagnostics {
    fn from(report: DiagnosticsReport) -> Self {
        Self {
            problems: report.problems(),
            report,
        }
    }
}

fn write_account_facts(f: &mut fmt::Formatter<'_>, facts: &AccountFacts) -> fmt::Result {
    if !facts.exists {
        return writeln!(f, "    {}: not found", facts.address);
    }
    writeln!(f, "    Address:     {}", facts.address)?;
    if let Some(owner) = facts.owner {
        writeln!(f, "    Owner:       {owner}")?;
    }
    writeln!(
        f,
        "    Data:        {} bytes, {} lamports{}",
        facts.data_len,
        facts.lamports,
        if facts.executable { ", executable" } else { "" }
    )
}

fn read_label(read: ReadOutcome) -> &'static str {
    match read {
        ReadOutcome::Absent => "absent",
        ReadOutcome::Decoded => "decoded",
        ReadOutcome::Fallback => "fixed-offset fallback",
        ReadOutcome::Unreadable => "unreadable",
    }
}

impl fmt::Display for CliDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.report;
        writeln!(f, "Node")?;
        match (&report.node.version, &report.node.error) {
            (Some(version), _) => writeln!(
                f,
                "  Version:       {} (feature set {})",
                version.solana_core,
                version
                    .feature_set
                    .map_or_else(|| "unknown".to_string(), |set| set.to_string())
            )?,
            (None, Some(error)) => writeln!(f, "  Unreachable:   {error}")?,
            (None, None) => {}
        }
        if let Some(slot) = report.slot {
            writeln!(f, "  Slot:          {slot}")?;
        }
        for program in &report.programs {
            writeln!(
                f,
                "Program {}: {}",
                program.name,
                if program.is_deployed() { "deployed" } else { "NOT DEPLOYED" }
            )?;
            write_account_facts(f, &program.account)?;
        }
        if let Some(governance) = &report.governance {
            writeln!(f, "Governance state: {}", read_label(governance.read))?;
            write_account_facts(f, &governance.account)?;
            if let Some(summary) = &governance.summary {
                writeln!(f, "    Admin:       {}", summary.admin)?;
                writeln!(
                    f,
                    "    Settings:    {} slot voting period, quorum {}, {} proposals",
                    summary.voting_period, summary.quorum_votes, summary.proposal_count
                )?;
            }
        }
        if let Some(wallet) = &report.wallet {
            writeln!(f, "Wallet {}", wallet.wallet)?;
            writeln!(f, "  Admin:         {}", if wallet.is_admin { "yes" } else { "no" })?;
            let verified = &wallet.verified_user;
            writeln!(f, "  Verified user: {}", read_label(verified.read))?;
            write_account_facts(f, &verified.account)?;
            if let (Some(authority), Some(is_verified)) = (verified.authority, verified.is_verified)
            {
                writeln!(f, "    Authority:   {authority}")?;
                writeln!(f, "    Verified:    {is_verified}")?;
            }
            let holding = &wallet.holding;
            writeln!(f, "  Holding:       {}", read_label(holding.read))?;
            write_account_facts(f, &holding.account)?;
            if let Some(amount) = holding.amount {
                writeln!(f, "    Amount:      {} SOL", format_sol(amount))?;
            }
        }
        if self.problems.is_empty() {
            writeln!(f, "No problems found")?;
        } else {
            writeln!(f, "Problems:")?;
            for problem in &self.problems {
                writeln!(f, "  - {problem}")?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Debug)]
pub struct CliUserStatus(pub UserStatus);

impl fmt::Display for CliUserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = &self.0;
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        writeln!(f, "User {}", status.user)?;
        writeln!(f, "  Admin:     {}", yes_no(status.is_admin))?;
        writeln!(f, "  Verified:  {}", yes_no(status.is_verified))?;
        writeln!(f, "  Holder:    {}", yes_no(status.is_holder))?;
        if let Some(holding) = &status.holding {
            writeln!(
                f,
                "  Holding:   {} SOL for {} ({}){}",
                format_sol(holding.amount),
                holding.purpose,
                holding.sector,
                if holding.is_redeemed { ", redeemed" } else { "" }
            )?;
        }
        Ok(())
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CliVoterStatus {
    #[serde(flatten)]
    pub status: VoterStatus,
    pub can_vote: bool,
    pub reason: Option<String>,
}

impl From<VoterStatus> for CliVoterStatus {
    fn from(status: VoterStatus) -> Self {
        let reason = status.ineligibility().map(|reason| reason.to_string());
        Self {
            can_vote: reason.is_none(),
            reason,
            status,
        }
    }
}

impl fmt::Display for CliVoterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Voter {} on proposal #{}",
            self.status.voter, self.status.proposal_id
        )?;
        writeln!(f, "  Holder:        {}", self.status.is_holder)?;
        writeln!(f, "  Has Voted:     {}", self.status.has_voted)?;
        writeln!(f, "  Status:        {}", self.status.status)?;
        writeln!(
            f,
            "  Window:        {}..={} (current slot {})",
            self.status.start_slot, self.status.end_slot, self.status.current_slot
        )?;
        match &self.reason {
            None => writeln!(f, "  Can vote"),
            Some(reason) => writeln!(f, "  Cannot vote: {reason}"),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CliAttachment {
    pub proposal_id: u64,
    #[serde(flatten)]
    pub record: AttachmentRecord,
}

impl fmt::Display for CliAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Attached {} ({}) to proposal #{}",
            self.record.file_name, self.record.ipfs_url, self.proposal_id
        )
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CliPruneResult {
    pub dry_run: bool,
    pub removed: Vec<String>,
    pub pending: Vec<String>,
}

impl CliPruneResult {
    fn from_report(report: OrphanReport, removed: Option<Vec<String>>) -> Self {
        match removed {
            Some(removed) => Self {
                dry_run: false,
                removed,
                pending: report.pending,
            },
            None => Self {
                dry_run: true,
                removed: report.orphans,
                pending: report.pending,
            },
        }
    }
}

impl fmt::Display for CliPruneResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "Would remove" } else { "Removed" };
        if self.removed.is_empty() {
            writeln!(f, "No orphaned attachments.")?;
        } else {
            writeln!(f, "{verb} {} orphaned attachments:", self.removed.len())?;
            for key in &self.removed {
                writeln!(f, "  {key}")?;
            }
        }
        if !self.pending.is_empty() {
            writeln!(
                f,
                "Kept {} entries for proposals not yet on chain",
                self.pending.len()
            )?;
        }
        Ok(())
    }
}

// ── Subcommand Definition (clap) ────────────────────────────────────────────

pub trait GovernanceSubCommands {
    fn governance_subcommands(self) -> Self;
}

fn proposal_id_arg<'a, 'b>(help: &'static str) -> Arg<'a, 'b> {
    Arg::with_name("proposal_id")
        .index(1)
        .value_name("PROPOSAL_ID")
        .takes_value(true)
        .required(true)
        .validator(is_parsable_u64)
        .help(help)
}

impl GovernanceSubCommands for App<'_, '_> {
    fn governance_subcommands(self) -> Self {
        self.subcommand(SubCommand::with_name("info").about("Display the governance state"))
            .subcommand(
                SubCommand::with_name("proposals")
                    .about("List proposals, voting first")
                    .arg(
                        Arg::with_name("status")
                            .long("status")
                            .value_name("STATUS")
                            .takes_value(true)
                            .default_value("all")
                            .validator(is_valid_status_filter)
                            .help("Filter by status: all, voting, succeeded, executed, failed, unknown"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("proposal")
                    .about("Show one proposal")
                    .arg(proposal_id_arg("ID of the proposal")),
            )
            .subcommand(
                SubCommand::with_name("diagnose")
                    .about("Check the node, both programs and a wallet's accounts")
                    .arg(
                        Arg::with_name("user")
                            .index(1)
                            .value_name("PUBKEY")
                            .takes_value(true)
                            .validator(is_valid_pubkey)
                            .help("Wallet to inspect [default: the configured keypair, if readable]"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("user-status")
                    .about("Show admin, verification and holder status of a wallet")
                    .arg(
                        Arg::with_name("user")
                            .index(1)
                            .value_name("PUBKEY")
                            .takes_value(true)
                            .validator(is_valid_pubkey)
                            .help("Wallet to inspect [default: the configured keypair]"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("voter-status")
                    .about("Show whether a wallet can vote on a proposal")
                    .arg(proposal_id_arg("ID of the proposal"))
                    .arg(
                        Arg::with_name("voter")
                            .long("voter")
                            .value_name("PUBKEY")
                            .takes_value(true)
                            .validator(is_valid_pubkey)
                            .help("Wallet to inspect [default: the configured keypair]"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("init-governance")
                    .about("Initialize the governance state with the signer as admin")
                    .arg(
                        Arg::with_name("voting_period")
                            .long("voting-period")
                            .value_name("SLOTS")
                            .takes_value(true)
                            .default_value(DEFAULT_VOTING_PERIOD)
                            .validator(is_positive_i64)
                            .help("Length of the voting window in slots"),
                    )
                    .arg(
                        Arg::with_name("quorum")
                            .long("quorum")
                            .value_name("VOTES")
                            .takes_value(true)
                            .default_value(DEFAULT_QUORUM_VOTES)
                            .validator(is_parsable_u64)
                            .help("Minimum number of votes for a proposal to pass"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("verify-user")
                    .about("Mark a wallet as verified (admin only)")
                    .arg(
                        Arg::with_name("user")
                            .index(1)
                            .value_name("PUBKEY")
                            .takes_value(true)
                            .required(true)
                            .validator(is_valid_pubkey)
                            .help("Wallet to verify"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("propose")
                    .about("Create a bond funding proposal")
                    .arg(
                        Arg::with_name("description")
                            .long("description")
                            .value_name("TEXT")
                            .takes_value(true)
                            .required(true)
                            .help("What the funding is for"),
                    )
                    .arg(
                        Arg::with_name("purpose")
                            .long("purpose")
                            .value_name("TEXT")
                            .takes_value(true)
                            .required(true)
                            .help("Bond purpose"),
                    )
                    .arg(
                        Arg::with_name("sector")
                            .long("sector")
                            .value_name("SECTOR")
                            .takes_value(true)
                            .required(true)
                            .validator(is_valid_sector)
                            .help("Bond sector"),
                    )
                    .arg(
                        Arg::with_name("amount")
                            .long("amount")
                            .value_name("SOL")
                            .takes_value(true)
                            .required(true)
                            .validator(is_sol_amount)
                            .help("Requested amount in SOL"),
                    )
                    .arg(
                        Arg::with_name("attachment")
                            .long("attachment")
                            .value_name("FILE")
                            .takes_value(true)
                            .help("JPEG, PNG or PDF document to pin with the proposal"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("vote")
                    .about("Vote on a proposal")
                    .arg(proposal_id_arg("ID of the proposal to vote on"))
                    .arg(
                        Arg::with_name("vote")
                            .index(2)
                            .value_name("VOTE")
                            .takes_value(true)
                            .required(true)
                            .validator(is_vote_choice)
                            .help("Vote: yes or no"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("init-holding")
                    .about("Create the signer's bond holding account")
                    .arg(
                        Arg::with_name("purpose")
                            .long("purpose")
                            .value_name("TEXT")
                            .takes_value(true)
                            .required(true)
                            .help("Bond purpose"),
                    )
                    .arg(
                        Arg::with_name("sector")
                            .long("sector")
                            .value_name("SECTOR")
                            .takes_value(true)
                            .required(true)
                            .validator(is_valid_sector)
                            .help("Bond sector"),
                    )
                    .arg(
                        Arg::with_name("amount")
                            .long("amount")
                            .value_name("SOL")
                            .takes_value(true)
                            .required(true)
                            .validator(is_sol_amount)
                            .help("Bond amount in SOL"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("execute")
                    .about("Execute a succeeded proposal")
                    .arg(proposal_id_arg("ID of the proposal to execute")),
            )
            .subcommand(
                SubCommand::with_name("issue-bond")
                    .about("Issue the bond of an executed proposal to its proposer")
                    .arg(proposal_id_arg("ID of the executed proposal")),
            )
            .subcommand(
                SubCommand::with_name("attach")
                    .about("Record attachment metadata for a proposal locally")
                    .arg(proposal_id_arg("ID of the proposal"))
                    .arg(
                        Arg::with_name("url")
                            .index(2)
                            .value_name("URL")
                            .takes_value(true)
                            .required(true)
                            .help("Gateway URL of the pinned file"),
                    )
                    .arg(
                        Arg::with_name("name")
                            .index(3)
                            .value_name("NAME")
                            .takes_value(true)
                            .required(true)
                            .help("File name to display"),
                    ),
            )
            .subcommand(
                SubCommand::with_name("attachments-prune")
                    .about("Remove cached attachments whose proposal does not exist")
                    .arg(
                        Arg::with_name("dry_run")
                            .long("dry-run")
                            .takes_value(false)
                            .help("List orphans without removing them"),
                    ),
            )
    }
}

// ── Argument Parsing ────────────────────────────────────────────────────────

fn required<'a>(matches: &'a ArgMatches<'_>, name: &str) -> Result<&'a str, CliError> {
    matches
        .value_of(name)
        .ok_or_else(|| CliError::BadParameter(format!("missing {name}")))
}

fn proposal_id_of(matches: &ArgMatches<'_>) -> Result<u64, CliError> {
    parse_u64(required(matches, "proposal_id")?)
        .map_err(|err| CliError::BadParameter(format!("invalid proposal id: {err}")))
}

fn pubkey_of(matches: &ArgMatches<'_>, name: &str) -> Result<Option<Pubkey>, CliError> {
    matches
        .value_of(name)
        .map(|value| {
            parse_address(value).map_err(|err| CliError::BadParameter(err.to_string()))
        })
        .transpose()
}

fn lamports_of(matches: &ArgMatches<'_>, name: &str) -> Result<u64, CliError> {
    parse_sol_amount(required(matches, name)?).map_err(CliError::BadParameter)
}

pub fn parse_governance_command(matches: &ArgMatches<'_>) -> Result<GovernanceCliCommand, CliError> {
    let command = match matches.subcommand() {
        ("info", Some(_)) => GovernanceCliCommand::Info,
        ("proposals", Some(matches)) => GovernanceCliCommand::Proposals {
            status: matches.value_of("status").and_then(parse_status),
        },
        ("proposal", Some(matches)) => GovernanceCliCommand::Proposal {
            proposal_id: proposal_id_of(matches)?,
        },
        ("diagnose", Some(matches)) => GovernanceCliCommand::Diagnose {
            user: pubkey_of(matches, "user")?,
        },
        ("user-status", Some(matches)) => GovernanceCliCommand::UserStatus {
            user: pubkey_of(matches, "user")?,
        },
        ("voter-status", Some(matches)) => GovernanceCliCommand::VoterStatus {
            proposal_id: proposal_id_of(matches)?,
            voter: pubkey_of(matches, "voter")?,
        },
        ("init-governance", Some(matches)) => GovernanceCliCommand::InitGovernance {
            voting_period: parse_positive_i64(required(matches, "voting_period")?)
                .map_err(|err| CliError::BadParameter(format!("invalid voting period: {err}")))?,
            quorum_votes: parse_u64(required(matches, "quorum")?)
                .map_err(|err| CliError::BadParameter(format!("invalid quorum: {err}")))?,
        },
        ("verify-user", Some(matches)) => GovernanceCliCommand::VerifyUser {
            user: pubkey_of(matches, "user")?
                .ok_or_else(|| CliError::BadParameter("missing user".to_string()))?,
        },
        ("propose", Some(matches)) => GovernanceCliCommand::Propose {
            draft: ProposalDraft {
                description: required(matches, "description")?.to_string(),
                bond_purpose: required(matches, "purpose")?.to_string(),
                bond_sector: required(matches, "sector")?.to_string(),
                bond_amount: lamports_of(matches, "amount")?,
            },
            attachment: matches.value_of("attachment").map(PathBuf::from),
        },
        ("vote", Some(matches)) => GovernanceCliCommand::Vote {
            proposal_id: proposal_id_of(matches)?,
            vote_yes: required(matches, "vote")? == "yes",
        },
        ("init-holding", Some(matches)) => GovernanceCliCommand::InitHolding {
            purpose: required(matches, "purpose")?.to_string(),
            sector: required(matches, "sector")?.to_string(),
            amount: lamports_of(matches, "amount")?,
        },
        ("execute", Some(matches)) => GovernanceCliCommand::Execute {
            proposal_id: proposal_id_of(matches)?,
        },
        ("issue-bond", Some(matches)) => GovernanceCliCommand::IssueBond {
            proposal_id: proposal_id_of(matches)?,
        },
        ("attach", Some(matches)) => GovernanceCliCommand::Attach {
            proposal_id: proposal_id_of(matches)?,
            ipfs_url: required(matches, "url")?.to_string(),
            file_name: required(matches, "name")?.to_string(),
        },
        ("attachments-prune", Some(matches)) => GovernanceCliCommand::AttachmentsPrune {
            dry_run: matches.is_present("dry_run"),
        },
        (name, _) => {
            return Err(CliError::BadParameter(format!(
                "unknown subcommand '{name}'"
            )))
        }
    };
    Ok(command)
}

// ── Command Processing ──────────────────────────────────────────────────────

fn signer_of(session: &Session) -> Result<Pubkey, CliError> {
    session
        .payer()
        .ok_or(CliError::Client(bondgov_client::ClientError::MissingSigner))
}

pub async fn process_governance_command(
    session: &Session,
    config: &CliConfig,
    command: &GovernanceCliCommand,
) -> ProcessResult {
    let output = &config.output_format;
    match command {
        GovernanceCliCommand::Info => match session.governance().await? {
            Some(summary) => output.formatted_string(&CliGovernanceInfo(summary)),
            None => Err(bondgov_client::ClientError::GovernanceNotInitialized.into()),
        },
        GovernanceCliCommand::Proposals { status } => {
            let board = session
                .refresh_proposals()
                .await?
                .or_else(|| session.proposal_board())
                .unwrap_or_default();
            let slot = board.slot;
            let list = CliProposalList {
                proposals: board
                    .proposals
                    .into_iter()
                    .filter(|view| status.is_none_or(|status| view.status == status))
                    .map(|view| CliProposal::new(view, slot))
                    .collect(),
                stats: board.stats,
                slot,
            };
            output.formatted_string(&list)
        }
        GovernanceCliCommand::Proposal { proposal_id } => {
            let view = session
                .proposal(*proposal_id)
                .await?
                .ok_or(bondgov_client::ClientError::ProposalNotFound(*proposal_id))?;
            let slot = session.current_slot().await?;
            output.formatted_string(&CliProposal::new(view, slot))
        }
        GovernanceCliCommand::Diagnose { user } => output.formatted_string(&CliDiagnostics::from(
            session.diagnostics(*user).await?,
        )),
        GovernanceCliCommand::UserStatus { user } => {
            let user = match user {
                Some(user) => *user,
                None => signer_of(session)?,
            };
            output.formatted_string(&CliUserStatus(session.user_status(&user).await?))
        }
        GovernanceCliCommand::VoterStatus { proposal_id, voter } => {
            let voter = match voter {
                Some(voter) => *voter,
                None => signer_of(session)?,
            };
            let status = session.voter_status(*proposal_id, &voter).await?;
            output.formatted_string(&CliVoterStatus::from(status))
        }
        GovernanceCliCommand::InitGovernance {
            voting_period,
            quorum_votes,
        } => output.formatted_string(
            &session
                .initialize_governance(*voting_period, *quorum_votes)
                .await?,
        ),
        GovernanceCliCommand::VerifyUser { user } => {
            output.formatted_string(&session.verify_user(user).await?)
        }
        GovernanceCliCommand::Propose { draft, attachment } => {
            let attachment = attachment
                .as_deref()
                .map(AttachmentFile::from_path)
                .transpose()
                .map_err(bondgov_client::ClientError::from)?;
            output.formatted_string(&session.create_proposal(draft.clone(), attachment).await?)
        }
        GovernanceCliCommand::Vote {
            proposal_id,
            vote_yes,
        } => output.formatted_string(&session.cast_vote(*proposal_id, *vote_yes).await?),
        GovernanceCliCommand::InitHolding {
            purpose,
            sector,
            amount,
        } => output.formatted_string(
            &session
                .initialize_holding(purpose, sector, *amount)
                .await?,
        ),
        GovernanceCliCommand::Execute { proposal_id } => {
            output.formatted_string(&session.execute_proposal(*proposal_id).await?)
        }
        GovernanceCliCommand::IssueBond { proposal_id } => {
            output.formatted_string(&session.issue_bond(*proposal_id).await?)
        }
        GovernanceCliCommand::Attach {
            proposal_id,
            ipfs_url,
            file_name,
        } => {
            let record = session.attach(*proposal_id, ipfs_url.as_str(), file_name.as_str())?;
            output.formatted_string(&CliAttachment {
                proposal_id: *proposal_id,
                record,
            })
        }
        GovernanceCliCommand::AttachmentsPrune { dry_run } => {
            let result = if *dry_run {
                CliPruneResult::from_report(session.orphaned_attachments().await?, None)
            } else {
                let report = session.orphaned_attachments().await?;
                let removed = session.prune_attachments().await?;
                CliPruneResult::from_report(report, Some(removed))
            };
            output.formatted_string(&result)
        }
    }
}
