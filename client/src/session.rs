//! The per-session context every read and write goes through.
//!
//! A [`Session`] owns the chain handle, the optional signer, the attachment
//! store and the concurrency bookkeeping.  Nothing is global: two sessions
//! never share an in-flight guard or a proposal board.

use {
    crate::{
        address::ProgramAddresses,
        attachment::{
            parse_attachment_key, AttachmentError, AttachmentFile, AttachmentRecord,
            AttachmentStore, AttachmentUploader, FileAttachmentStore, PinataUploader,
            UploadedAttachment, PINATA_PIN_FILE_URL,
        },
        config::ClientConfig,
        decoder::{decode_account, DecodedAccount, RawAccount},
        diagnostics::{
            AccountFacts, DiagnosticsReport, GovernanceReport, HoldingReport, NodeReport,
            ProgramReport, VerifiedUserReport, WalletReport,
        },
        error::{ClientError, Result},
        guard::{ActionKey, ActionPermit, ActionStatus, InFlightGuard, RequestGenerations, ViewKind},
        reconcile::{find_orphans, reconcile, OrphanReport, ProposalBoard},
        rpc::{
            GovernanceRpc, HttpRpcClient, KeypairSubmitter, RpcError, TransactionId,
            TransactionSubmitter,
        },
        submit_error::SubmitErrorKind,
        view::{
            BondSummary, GovernanceSummary, ProposalStatus, ProposalView, UserStatus, VoterStatus,
        },
    },
    bondgov_governance_interface::{
        bond::{self, BondAccount, InitializeBondArgs},
        constants::{BOND_SECTORS, MIN_BOND_PURPOSE_LEN, MIN_DESCRIPTION_LEN},
        instruction::{self, CreateProposalArgs},
        state::{GovernanceState, Proposal, VerifiedUser},
    },
    log::*,
    parking_lot::{Mutex, RwLock},
    serde::Serialize,
    solana_keypair::Keypair,
    solana_pubkey::Pubkey,
    std::{
        collections::{BTreeMap, HashMap},
        fmt,
        future::Future,
        ops::Range,
        sync::Arc,
    },
};

/// Upper bound on proposals read by one refresh; the newest are kept.
pub const MAX_LISTED_PROPOSALS: u64 = 10_000;

/// A proposal as entered by its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    pub description: String,
    pub bond_purpose: String,
    pub bond_sector: String,
    /// Requested amount in lamports.
    pub bond_amount: u64,
}

impl ProposalDraft {
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().chars().count() < MIN_DESCRIPTION_LEN {
            return Err(ClientError::InvalidDraft(format!(
                "description must be at least {MIN_DESCRIPTION_LEN} characters"
            )));
        }
        if self.bond_purpose.trim().chars().count() < MIN_BOND_PURPOSE_LEN {
            return Err(ClientError::InvalidDraft(format!(
                "bond purpose must be at least {MIN_BOND_PURPOSE_LEN} characters"
            )));
        }
        if !BOND_SECTORS.contains(&self.bond_sector.as_str()) {
            return Err(ClientError::InvalidDraft(format!(
                "unknown sector {:?}; expected one of: {}",
                self.bond_sector,
                BOND_SECTORS.join(", ")
            )));
        }
        if self.bond_amount == 0 {
            return Err(ClientError::InvalidDraft(
                "bond amount must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn into_args(self) -> CreateProposalArgs {
        CreateProposalArgs {
            description: self.description,
            bond_purpose: self.bond_purpose,
            bond_sector: self.bond_sector,
            bond_amount: self.bond_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "transaction")]
pub enum VerifyOutcome {
    Verified(TransactionId),
    AlreadyVerified,
}

impl fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified(transaction) => write!(f, "verified in {transaction}"),
            Self::AlreadyVerified => f.write_str("already verified"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProposal {
    pub id: u64,
    #[serde(serialize_with = "crate::view::serialize_pubkey")]
    pub address: Pubkey,
    pub transaction: TransactionId,
    pub attachment: Option<AttachmentRecord>,
}

impl fmt::Display for CreatedProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proposal {} created in {}", self.id, self.transaction)
    }
}

fn listed_ids(proposal_count: u64) -> Range<u64> {
    let first = proposal_count.saturating_sub(MAX_LISTED_PROPOSALS);
    if first > 0 {
        warn!("listing only proposals {first}..{proposal_count}");
    }
    first..proposal_count
}

fn verified_flag(account: &DecodedAccount<VerifiedUser>) -> bool {
    match account {
        DecodedAccount::Decoded(user) => user.is_verified,
        DecodedAccount::Degraded {
            partial: Some(partial),
            ..
        } => partial.is_verified,
        _ => false,
    }
}

fn expect_accounts<const N: usize>(accounts: Vec<Option<RawAccount>>) -> Result<[Option<RawAccount>; N]> {
    let len = accounts.len();
    accounts.try_into().map_err(|_| {
        ClientError::Rpc(RpcError::Malformed(format!(
            "expected {N} accounts, got {len}"
        )))
    })
}

pub struct Session {
    rpc: Arc<dyn GovernanceRpc>,
    submitter: Option<Arc<dyn TransactionSubmitter>>,
    attachments: Arc<dyn AttachmentStore>,
    uploader: Option<Arc<dyn AttachmentUploader>>,
    addresses: ProgramAddresses,
    guard: InFlightGuard,
    generations: RequestGenerations,
    action_statuses: Mutex<HashMap<ActionKey, ActionStatus>>,
    board: RwLock<Option<ProposalBoard>>,
}

impl Session {
    pub fn new(
        rpc: Arc<dyn GovernanceRpc>,
        attachments: Arc<dyn AttachmentStore>,
        addresses: ProgramAddresses,
    ) -> Self {
        Self {
            rpc,
            submitter: None,
            attachments,
            uploader: None,
            addresses,
            guard: InFlightGuard::new(),
            generations: RequestGenerations::new(),
            action_statuses: Mutex::default(),
            board: RwLock::default(),
        }
    }

    pub fn with_submitter(mut self, submitter: Arc<dyn TransactionSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn AttachmentUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// HTTP node, file-backed attachment store, and a keypair signer when
    /// one is given.
    pub fn from_config(config: &ClientConfig, keypair: Option<Keypair>) -> Result<Self> {
        config.validate()?;
        let addresses = config.program_addresses()?;
        let rpc = Arc::new(HttpRpcClient::new_with_commitment(
            config.json_rpc_url.as_str(),
            config.commitment.as_str(),
        ));
        let attachments = Arc::new(FileAttachmentStore::new(&config.attachment_store_path));
        let mut session = Self::new(rpc.clone(), attachments, addresses);
        if let Some(keypair) = keypair {
            session = session.with_submitter(Arc::new(
                KeypairSubmitter::new(rpc, keypair).with_confirm_timeout(config.confirm_timeout()),
            ));
        }
        if let Some(jwt) = config.pinata_jwt.as_deref().filter(|jwt| !jwt.is_empty()) {
            session = session.with_uploader(Arc::new(PinataUploader::with_endpoints(
                jwt,
                PINATA_PIN_FILE_URL,
                config.ipfs_gateway.as_str(),
            )));
        }
        Ok(session)
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    /// The signer's address, if a signer is configured.
    pub fn payer(&self) -> Option<Pubkey> {
        self.submitter.as_ref().map(|submitter| submitter.payer())
    }

    fn submitter(&self) -> Result<&Arc<dyn TransactionSubmitter>> {
        self.submitter.as_ref().ok_or(ClientError::MissingSigner)
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    async fn read_governance(&self) -> Result<(Pubkey, DecodedAccount<GovernanceState>)> {
        let address = self.addresses.governance_state()?.address;
        let raw = self.rpc.get_account(&address).await?;
        let account = decode_account(&address, raw.as_ref(), &self.addresses.governance_program);
        Ok((address, account))
    }

    async fn require_governance(&self) -> Result<GovernanceSummary> {
        let (address, account) = self.read_governance().await?;
        GovernanceSummary::from_account(address, &account)
            .ok_or(ClientError::GovernanceNotInitialized)
    }

    /// `None` when governance has not been initialized.
    pub async fn governance(&self) -> Result<Option<GovernanceSummary>> {
        let (address, account) = self.read_governance().await?;
        Ok(GovernanceSummary::from_account(address, &account))
    }

    pub async fn current_slot(&self) -> Result<u64> {
        Ok(self.rpc.get_slot().await?)
    }

    fn cached_attachment(&self, proposal_id: u64) -> Option<AttachmentRecord> {
        self.attachments.get(proposal_id).unwrap_or_else(|err| {
            warn!("attachment lookup for proposal {proposal_id} failed: {err}");
            None
        })
    }

    fn attachment_snapshot(&self) -> BTreeMap<String, AttachmentRecord> {
        self.attachments.snapshot().unwrap_or_else(|err| {
            warn!("attachment store unreadable, listing without attachments: {err}");
            BTreeMap::new()
        })
    }

    pub async fn proposal(&self, proposal_id: u64) -> Result<Option<ProposalView>> {
        let address = self.addresses.proposal(proposal_id)?.address;
        let raw = self.rpc.get_account(&address).await?;
        let account = decode_account::<Proposal>(
            &address,
            raw.as_ref(),
            &self.addresses.governance_program,
        );
        Ok(
            ProposalView::from_account(address, proposal_id, account).map(|mut view| {
                if let Some(record) = self.cached_attachment(proposal_id) {
                    view.apply_attachment(&record);
                }
                view
            }),
        )
    }

    /// Reload every proposal.  Returns `None` when a later refresh started
    /// before this one finished; the board then keeps the later result.
    pub async fn refresh_proposals(&self) -> Result<Option<ProposalBoard>> {
        let ticket = self.generations.begin(ViewKind::ProposalBoard);
        let governance = self.require_governance().await?;
        let ids = listed_ids(governance.proposal_count);
        let addresses = ids
            .clone()
            .map(|id| self.addresses.proposal(id).map(|derived| derived.address))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let accounts = self.rpc.get_multiple_accounts(&addresses).await?;
        let slot = self.rpc.get_slot().await?;

        let program = self.addresses.governance_program;
        let views = ids
            .zip(addresses)
            .zip(accounts)
            .filter_map(|((id, address), raw)| {
                let account = decode_account::<Proposal>(&address, raw.as_ref(), &program);
                ProposalView::from_account(address, id, account)
            })
            .collect();
        let board = reconcile(views, &self.attachment_snapshot(), slot);

        let mut current = self.board.write();
        if !self.generations.is_current(&ticket) {
            debug!(
                "discarding proposal board from superseded refresh {}",
                ticket.generation()
            );
            return Ok(None);
        }
        *current = Some(board.clone());
        Ok(Some(board))
    }

    /// The last board applied by [`Session::refresh_proposals`].
    pub fn proposal_board(&self) -> Option<ProposalBoard> {
        self.board.read().clone()
    }

    pub async fn user_status(&self, user: &Pubkey) -> Result<UserStatus> {
        let governance = self.addresses.governance_state()?.address;
        let verified = self.addresses.verified_user(user)?.address;
        let holding = self.addresses.holding(user)?.address;
        let [governance_raw, verified_raw, holding_raw] = expect_accounts(
            self.rpc
                .get_multiple_accounts(&[governance, verified, holding])
                .await?,
        )?;

        let program = &self.addresses.governance_program;
        let is_admin = GovernanceSummary::from_account(
            governance,
            &decode_account(&governance, governance_raw.as_ref(), program),
        )
        .is_some_and(|summary| summary.admin == *user);
        let is_verified = verified_flag(&decode_account(&verified, verified_raw.as_ref(), program));
        let bond = decode_account::<BondAccount>(
            &holding,
            holding_raw.as_ref(),
            &self.addresses.holding_program,
        );

        Ok(UserStatus {
            user: *user,
            is_admin,
            is_verified,
            is_holder: bond.exists(),
            holding: bond.decoded().map(|bond| BondSummary::new(holding, bond)),
        })
    }

    /// Reads holder, vote-record and proposal state plus the current slot;
    /// nothing is cached between calls.
    pub async fn voter_status(&self, proposal_id: u64, voter: &Pubkey) -> Result<VoterStatus> {
        let proposal = self.addresses.proposal(proposal_id)?.address;
        let vote_record = self.addresses.vote_record(proposal_id, voter)?.address;
        let holding = self.addresses.holding(voter)?.address;
        let [proposal_raw, vote_record_raw, holding_raw] = expect_accounts(
            self.rpc
                .get_multiple_accounts(&[proposal, vote_record, holding])
                .await?,
        )?;
        let current_slot = self.rpc.get_slot().await?;

        let view = ProposalView::from_account(
            proposal,
            proposal_id,
            decode_account(
                &proposal,
                proposal_raw.as_ref(),
                &self.addresses.governance_program,
            ),
        )
        .ok_or(ClientError::ProposalNotFound(proposal_id))?;

        Ok(VoterStatus {
            proposal_id,
            voter: *voter,
            is_holder: holding_raw.is_some(),
            has_voted: vote_record_raw.is_some(),
            status: view.status,
            start_slot: view.start_slot,
            end_slot: view.end_slot,
            current_slot,
        })
    }

    /// Health report for the node, both programs and the accounts of `user`
    /// (or the signer when `user` is `None`).  A node that does not answer
    /// `getVersion` yields a report carrying only the error.
    pub async fn diagnostics(&self, user: Option<Pubkey>) -> Result<DiagnosticsReport> {
        let version = match self.rpc.get_version().await {
            Ok(version) => version,
            Err(err) => {
                warn!("diagnostics: node did not answer getVersion: {err}");
                return Ok(DiagnosticsReport::unreachable(err.to_string()));
            }
        };
        let wallet = match user.or_else(|| self.payer()) {
            Some(wallet) => Some((
                wallet,
                self.addresses.verified_user(&wallet)?.address,
                self.addresses.holding(&wallet)?.address,
            )),
            None => None,
        };
        let governance_program = self.addresses.governance_program;
        let holding_program = self.addresses.holding_program;
        let governance = self.addresses.governance_state()?.address;
        let mut addresses = vec![governance_program, holding_program, governance];
        if let Some((_, verified, holding)) = wallet {
            addresses.extend([verified, holding]);
        }
        let accounts = self.rpc.get_multiple_accounts(&addresses).await?;
        if accounts.len() != addresses.len() {
            return Err(ClientError::Rpc(RpcError::Malformed(format!(
                "expected {} accounts, got {}",
                addresses.len(),
                accounts.len()
            ))));
        }
        let slot = self.rpc.get_slot().await?;
        let raw = |index: usize| accounts.get(index).and_then(Option::as_ref);

        let programs = vec![
            ProgramReport {
                name: "governance",
                account: AccountFacts::new(governance_program, raw(0)),
            },
            ProgramReport {
                name: "holding",
                account: AccountFacts::new(holding_program, raw(1)),
            },
        ];
        let governance = GovernanceReport::new(governance, raw(2), &governance_program);
        let wallet = wallet.map(|(wallet, verified, holding)| WalletReport {
            wallet,
            is_admin: governance
                .summary
                .as_ref()
                .is_some_and(|summary| summary.admin == wallet),
            verified_user: VerifiedUserReport::new(verified, raw(3), &governance_program),
            holding: HoldingReport::new(holding, raw(4), &holding_program),
        });
        let report = DiagnosticsReport {
            node: NodeReport {
                version: Some(version),
                error: None,
            },
            slot: Some(slot),
            programs,
            governance: Some(governance),
            wallet,
        };
        for problem in report.problems() {
            info!("diagnostics: {problem}");
        }
        Ok(report)
    }

    pub fn action_status(&self, key: &ActionKey) -> ActionStatus {
        self.action_statuses
            .lock()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    // ── Attachments ─────────────────────────────────────────────────────────

    pub async fn orphaned_attachments(&self) -> Result<OrphanReport> {
        let governance = self.require_governance().await?;
        let keys = self.attachments.keys()?;
        let candidates: Vec<u64> = keys
            .iter()
            .filter_map(|key| parse_attachment_key(key))
            .filter(|id| *id < governance.proposal_count)
            .collect();
        let addresses = candidates
            .iter()
            .map(|id| self.addresses.proposal(*id).map(|derived| derived.address))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let accounts = self.rpc.get_multiple_accounts(&addresses).await?;
        let onchain_ids: Vec<u64> = candidates
            .into_iter()
            .zip(accounts)
            .filter_map(|(id, account)| account.map(|_| id))
            .collect();
        Ok(find_orphans(
            keys.iter().map(String::as_str),
            governance.proposal_count,
            &onchain_ids,
        ))
    }

    /// Remove orphaned entries.  Pending entries are kept.
    pub async fn prune_attachments(&self) -> Result<Vec<String>> {
        let report = self.orphaned_attachments().await?;
        let mut removed = Vec::with_capacity(report.orphans.len());
        for key in report.orphans {
            if self.attachments.remove(&key)? {
                info!("pruned orphaned attachment {key}");
                removed.push(key);
            }
        }
        Ok(removed)
    }

    /// Record attachment metadata for a proposal by hand.
    pub fn attach(
        &self,
        proposal_id: u64,
        ipfs_url: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<AttachmentRecord> {
        let record = AttachmentRecord::new(ipfs_url, file_name);
        self.attachments.put(proposal_id, record.clone())?;
        Ok(record)
    }

    pub async fn upload_attachment(&self, file: AttachmentFile) -> Result<UploadedAttachment> {
        let uploader = self
            .uploader
            .as_ref()
            .ok_or(AttachmentError::MissingCredentials)?;
        Ok(uploader.upload(file).await?)
    }

    // ── Writes ──────────────────────────────────────────────────────────────

    fn begin_action(&self, key: &ActionKey) -> Result<ActionPermit> {
        let permit = self
            .guard
            .try_acquire(key.clone())
            .ok_or_else(|| ClientError::AlreadyInProgress(key.clone()))?;
        self.action_statuses
            .lock()
            .insert(key.clone(), ActionStatus::Pending);
        Ok(permit)
    }

    fn finish_action<T: fmt::Display>(&self, key: &ActionKey, result: &Result<T>) {
        let status = match result {
            Ok(outcome) => {
                info!("{key}: {outcome}");
                ActionStatus::Succeeded(outcome.to_string())
            }
            Err(err) => {
                warn!("{key} failed: {err}");
                ActionStatus::Failed(err.to_string())
            }
        };
        self.action_statuses.lock().insert(key.clone(), status);
    }

    /// Run `action` under the in-flight guard for `key`.  The future is not
    /// polled when the key is already held.
    async fn run_action<T, F>(&self, key: ActionKey, action: F) -> Result<T>
    where
        T: fmt::Display,
        F: Future<Output = Result<T>>,
    {
        let _permit = self.begin_action(&key)?;
        let result = action.await;
        self.finish_action(&key, &result);
        result
    }

    pub async fn initialize_governance(
        &self,
        voting_period: i64,
        quorum_votes: u64,
    ) -> Result<TransactionId> {
        let submitter = self.submitter()?;
        self.run_action(ActionKey::InitializeGovernance, async {
            if voting_period <= 0 {
                return Err(ClientError::Rejected(
                    "voting period must be positive".to_string(),
                ));
            }
            if quorum_votes == 0 {
                return Err(ClientError::Rejected(
                    "quorum must be at least one vote".to_string(),
                ));
            }
            let (address, account) = self.read_governance().await?;
            if account.exists() {
                return Err(ClientError::Rejected(
                    "governance is already initialized".to_string(),
                ));
            }
            let instruction = instruction::initialize_governance(
                &self.addresses.governance_program,
                &address,
                &submitter.payer(),
                voting_period,
                quorum_votes,
            );
            Ok(submitter.submit(&[instruction]).await?)
        })
        .await
    }

    /// Admin only.  An already verified user is not an error.
    pub async fn verify_user(&self, user: &Pubkey) -> Result<VerifyOutcome> {
        let submitter = self.submitter()?;
        self.run_action(ActionKey::VerifyUser { user: *user }, async {
            let admin = submitter.payer();
            let governance = self.require_governance().await?;
            if governance.admin != admin {
                return Err(ClientError::Rejected(
                    "only the governance admin can verify users".to_string(),
                ));
            }
            let verified = self.addresses.verified_user(user)?.address;
            if self.rpc.get_account(&verified).await?.is_some() {
                return Ok(VerifyOutcome::AlreadyVerified);
            }
            let instruction = instruction::add_verified_user(
                &self.addresses.governance_program,
                &verified,
                user,
                &admin,
            );
            match submitter.submit(&[instruction]).await {
                Ok(transaction) => Ok(VerifyOutcome::Verified(transaction)),
                Err(err) if err.kind == SubmitErrorKind::AlreadyExists => {
                    Ok(VerifyOutcome::AlreadyVerified)
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    /// Submit a proposal under the next id.  An attachment is pinned first
    /// and recorded only once the proposal is on chain.
    pub async fn create_proposal(
        &self,
        draft: ProposalDraft,
        attachment: Option<AttachmentFile>,
    ) -> Result<CreatedProposal> {
        let submitter = self.submitter()?;
        let proposer = submitter.payer();
        self.run_action(ActionKey::CreateProposal { proposer }, async {
            draft.validate()?;
            let uploader = match &attachment {
                Some(file) => {
                    file.validate()?;
                    Some(
                        self.uploader
                            .as_ref()
                            .ok_or(AttachmentError::MissingCredentials)?,
                    )
                }
                None => None,
            };

            let governance = self.require_governance().await?;
            let verified = self.addresses.verified_user(&proposer)?.address;
            let raw = self.rpc.get_account(&verified).await?;
            let account = decode_account::<VerifiedUser>(
                &verified,
                raw.as_ref(),
                &self.addresses.governance_program,
            );
            if !verified_flag(&account) {
                return Err(ClientError::Rejected(format!(
                    "{proposer} is not a verified user"
                )));
            }

            let uploaded = match (attachment, uploader) {
                (Some(file), Some(uploader)) => Some(uploader.upload(file).await?),
                _ => None,
            };

            let id = governance.proposal_count;
            let address = self.addresses.proposal(id)?.address;
            let instruction = instruction::create_proposal(
                &self.addresses.governance_program,
                &governance.address,
                &address,
                &proposer,
                &verified,
                draft.into_args(),
            );
            let transaction = submitter.submit(&[instruction]).await?;

            let attachment = uploaded.map(|uploaded| {
                let record = uploaded.into_record();
                if let Err(err) = self.attachments.put(id, record.clone()) {
                    warn!("proposal {id} created but its attachment was not saved: {err}");
                }
                record
            });
            Ok(CreatedProposal {
                id,
                address,
                transaction,
                attachment,
            })
        })
        .await
    }

    pub async fn cast_vote(&self, proposal_id: u64, vote_yes: bool) -> Result<TransactionId> {
        let submitter = self.submitter()?;
        let voter = submitter.payer();
        self.run_action(ActionKey::CastVote { proposal_id, voter }, async {
            let status = self.voter_status(proposal_id, &voter).await?;
            if let Some(reason) = status.ineligibility() {
                return Err(ClientError::Rejected(reason.to_string()));
            }
            let instruction = instruction::cast_vote(
                &self.addresses.governance_program,
                &self.addresses.proposal(proposal_id)?.address,
                &voter,
                &self.addresses.holding(&voter)?.address,
                &self.addresses.vote_record(proposal_id, &voter)?.address,
                vote_yes,
            );
            Ok(submitter.submit(&[instruction]).await?)
        })
        .await
    }

    /// Create the signer's holding (bond) account.
    pub async fn initialize_holding(
        &self,
        purpose: &str,
        sector: &str,
        amount: u64,
    ) -> Result<TransactionId> {
        let submitter = self.submitter()?;
        let owner = submitter.payer();
        self.run_action(ActionKey::InitializeHolding { owner }, async {
            if purpose.trim().is_empty() || sector.trim().is_empty() {
                return Err(ClientError::Rejected(
                    "purpose and sector are required".to_string(),
                ));
            }
            if amount == 0 {
                return Err(ClientError::Rejected(
                    "amount must be greater than zero".to_string(),
                ));
            }
            let holding = self.addresses.holding(&owner)?.address;
            if self.rpc.get_account(&holding).await?.is_some() {
                return Err(ClientError::Rejected(format!(
                    "{owner} already has a holding account"
                )));
            }
            let instruction = bond::initialize_bond(
                &self.addresses.holding_program,
                &holding,
                &owner,
                &InitializeBondArgs {
                    purpose: purpose.to_string(),
                    sector: sector.to_string(),
                    amount,
                },
            );
            Ok(submitter.submit(&[instruction]).await?)
        })
        .await
    }

    pub async fn execute_proposal(&self, proposal_id: u64) -> Result<TransactionId> {
        let submitter = self.submitter()?;
        self.run_action(ActionKey::ExecuteProposal { proposal_id }, async {
            let view = self
                .proposal(proposal_id)
                .await?
                .ok_or(ClientError::ProposalNotFound(proposal_id))?;
            if view.status != ProposalStatus::Succeeded {
                return Err(ClientError::Rejected(format!(
                    "proposal {proposal_id} is {}; only succeeded proposals can be executed",
                    view.status
                )));
            }
            let instruction = instruction::execute_proposal(
                &self.addresses.governance_program,
                &view.address,
                &self.addresses.governance_state()?.address,
            );
            Ok(submitter.submit(&[instruction]).await?)
        })
        .await
    }

    /// Have the governance program issue the bond of an executed proposal.
    /// Proposer only; the bond lands in the proposer's holding account.
    pub async fn issue_bond(&self, proposal_id: u64) -> Result<TransactionId> {
        let submitter = self.submitter()?;
        self.run_action(ActionKey::IssueBond { proposal_id }, async {
            let proposer = submitter.payer();
            let view = self
                .proposal(proposal_id)
                .await?
                .ok_or(ClientError::ProposalNotFound(proposal_id))?;
            if view.proposer != Some(proposer) {
                return Err(ClientError::Rejected(format!(
                    "only the proposer of proposal {proposal_id} can issue its bond"
                )));
            }
            if view.status != ProposalStatus::Executed {
                return Err(ClientError::Rejected(format!(
                    "proposal {proposal_id} is {}; bonds are issued for executed proposals",
                    view.status
                )));
            }
            let holding = self.addresses.holding(&proposer)?.address;
            if self.rpc.get_account(&holding).await?.is_some() {
                return Err(ClientError::Rejected(format!(
                    "{proposer} already has a holding account"
                )));
            }
            let instruction = instruction::create_bond_via_cpi(
                &self.addresses.governance_program,
                &view.address,
                &proposer,
                &holding,
                &self.addresses.holding_program,
            );
            Ok(submitter.submit(&[instruction]).await?)
        })
        .await
    }
}
