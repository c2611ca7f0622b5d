//! Shared test utilities for bond governance end-to-end tests.
//!
//! Provides a simulated ledger that:
//! - serves account reads and the current slot like a JSON-RPC node
//! - executes governance and holding instructions atomically per transaction
//! - reports failures as structured custom program errors, the way a node does

use {
    async_trait::async_trait,
    bondgov_client::{
        address::ProgramAddresses,
        attachment::{AttachmentStore, MemoryAttachmentStore},
        decoder::RawAccount,
        rpc::{GovernanceRpc, RpcError, TransactionId, TransactionSubmitter},
        rpc_response::RpcVersionInfo,
        submit_error::SubmitError,
        test_utils::MockUploader,
        Session,
    },
    bondgov_governance_interface::{
        bond::{self, BondAccount},
        error::{AnchorErrorCode, GovernanceError, SYSTEM_ACCOUNT_ALREADY_IN_USE},
        instruction::GovernanceInstruction,
        state::{
            AnchorAccount, GovernanceState, Proposal, ProposalState, VerifiedUser, VoteRecord,
        },
    },
    log::*,
    parking_lot::Mutex,
    serde_json::json,
    solana_instruction::Instruction,
    solana_pubkey::Pubkey,
    std::{collections::HashMap, str::FromStr, sync::Arc},
};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Slot the simulated ledger starts at.
pub const GENESIS_SLOT: u64 = 1_000;

/// Lamports credited to every account the ledger creates.
const RENT_EXEMPT_LAMPORTS: u64 = 1_000_000;

// ─────────────────────────────────────────────────────────────────────────────
// Instruction failures
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Failure {
    Custom(u32),
    MissingSignature(Pubkey),
    InvalidData(String),
}

impl Failure {
    fn governance(error: GovernanceError) -> Self {
        Self::Custom(error.code())
    }

    /// The error a node would return for instruction `index`.
    fn into_submit_error(self, index: usize) -> SubmitError {
        match self {
            Self::Custom(code) => SubmitError::classify(
                Some(&json!({ "InstructionError": [index, { "Custom": code }] })),
                &format!(
                    "Transaction simulation failed: Error processing Instruction {index}: custom program error: {code:#x}"
                ),
                vec![format!("Program log: custom program error: {code:#x}")],
            ),
            Self::MissingSignature(key) => SubmitError::classify(
                Some(&json!({ "InstructionError": [index, "MissingRequiredSignature"] })),
                &format!("missing required signature for {key}"),
                Vec::new(),
            ),
            Self::InvalidData(reason) => SubmitError::classify(
                Some(&json!({ "InstructionError": [index, "InvalidInstructionData"] })),
                &reason,
                Vec::new(),
            ),
        }
    }
}

type InstructionResult = Result<(), Failure>;

fn missing_account() -> Failure {
    Failure::Custom(AnchorErrorCode::AccountNotInitialized as u32)
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated ledger
// ─────────────────────────────────────────────────────────────────────────────

struct LedgerState {
    accounts: HashMap<Pubkey, RawAccount>,
    slot: u64,
    transaction_count: u64,
}

/// An in-process ledger holding the governance and holding programs' accounts.
pub struct SimLedger {
    addresses: ProgramAddresses,
    state: Mutex<LedgerState>,
}

impl SimLedger {
    pub fn new(addresses: ProgramAddresses) -> Arc<Self> {
        let loader = Pubkey::from_str("BPFLoaderUpgradeab1e11111111111111111111111").unwrap();
        let accounts = [addresses.governance_program, addresses.holding_program]
            .into_iter()
            .map(|program| {
                let account = RawAccount {
                    owner: loader,
                    lamports: RENT_EXEMPT_LAMPORTS,
                    executable: true,
                    data: vec![2, 0, 0, 0].into_iter().chain([0; 32]).collect(),
                };
                (program, account)
            })
            .collect();
        Arc::new(Self {
            addresses,
            state: Mutex::new(LedgerState {
                accounts,
                slot: GENESIS_SLOT,
                transaction_count: 0,
            }),
        })
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    pub fn slot(&self) -> u64 {
        self.state.lock().slot
    }

    pub fn advance_slots(&self, slots: u64) {
        let mut state = self.state.lock();
        state.slot = state.slot.saturating_add(slots);
        debug!("[LEDGER] advanced to slot {}", state.slot);
    }

    pub fn transaction_count(&self) -> u64 {
        self.state.lock().transaction_count
    }

    /// Write an account directly, bypassing instruction processing.
    pub fn seed<T: AnchorAccount>(&self, address: Pubkey, owner: &Pubkey, account: &T) {
        let data = account
            .to_account_data()
            .expect("in-memory serialization");
        self.state.lock().accounts.insert(
            address,
            RawAccount {
                owner: *owner,
                lamports: RENT_EXEMPT_LAMPORTS,
                executable: false,
                data,
            },
        );
    }

    pub fn read<T: AnchorAccount>(&self, address: &Pubkey) -> Option<T> {
        let state = self.state.lock();
        let account = state.accounts.get(address)?;
        T::try_from_account_data(&account.data).ok()
    }

    /// Move a proposal out of voting once its window has closed, the way the
    /// program's crank does: quorum and a yes majority make it succeed.
    pub fn finalize_proposal(&self, proposal_id: u64) -> Result<ProposalState, String> {
        let address = self
            .addresses
            .proposal(proposal_id)
            .map_err(|err| err.to_string())?
            .address;
        let governance = self
            .read::<GovernanceState>(&self.addresses.governance_state().map_err(|err| err.to_string())?.address)
            .ok_or("governance not initialized")?;
        let mut proposal = self
            .read::<Proposal>(&address)
            .ok_or("proposal not found")?;
        if proposal.state != ProposalState::Voting {
            return Err(format!("proposal {proposal_id} is not voting"));
        }
        if self.slot() <= proposal.end_slot {
            return Err("voting period is not over".to_string());
        }
        let total = proposal.yes_votes.saturating_add(proposal.no_votes);
        proposal.state = if total >= governance.quorum_votes && proposal.yes_votes > proposal.no_votes
        {
            ProposalState::Succeeded
        } else {
            ProposalState::Failed
        };
        info!("[LEDGER] proposal #{proposal_id} finalized as {:?}", proposal.state);
        self.seed(address, &self.addresses.governance_program, &proposal);
        Ok(proposal.state)
    }

    /// Execute `instructions` as one transaction signed by `payer`.
    pub fn process_transaction(
        &self,
        payer: &Pubkey,
        instructions: &[Instruction],
    ) -> Result<TransactionId, SubmitError> {
        let mut state = self.state.lock();
        let slot = state.slot;
        let mut accounts = state.accounts.clone();
        for (index, instruction) in instructions.iter().enumerate() {
            self.process_instruction(&mut accounts, slot, payer, instruction)
                .map_err(|failure| {
                    warn!("[LEDGER] instruction {index} failed: {failure:?}");
                    failure.into_submit_error(index)
                })?;
        }
        state.accounts = accounts;
        state.transaction_count = state.transaction_count.saturating_add(1);
        Ok(TransactionId(format!("sim-tx-{}", state.transaction_count)))
    }

    fn process_instruction(
        &self,
        accounts: &mut HashMap<Pubkey, RawAccount>,
        slot: u64,
        payer: &Pubkey,
        instruction: &Instruction,
    ) -> InstructionResult {
        for meta in instruction.accounts.iter().filter(|meta| meta.is_signer) {
            if meta.pubkey != *payer {
                return Err(Failure::MissingSignature(meta.pubkey));
            }
        }
        let keys: Vec<Pubkey> = instruction.accounts.iter().map(|meta| meta.pubkey).collect();
        let key = |index: usize| {
            keys.get(index)
                .copied()
                .ok_or_else(|| Failure::InvalidData(format!("missing account {index}")))
        };

        if instruction.program_id == self.addresses.holding_program {
            let args = bond::decode_initialize_bond(&instruction.data)
                .ok_or_else(|| Failure::InvalidData("unknown holding instruction".to_string()))?;
            let holding = key(0)?;
            let issuer = key(1)?;
            self.create(
                accounts,
                holding,
                &self.addresses.holding_program,
                &BondAccount {
                    authority: issuer,
                    purpose: args.purpose,
                    sector: args.sector,
                    amount: args.amount,
                    is_redeemed: false,
                },
            )?;
            info!("[LEDGER] holding created for {issuer}");
            return Ok(());
        }
        if instruction.program_id != self.addresses.governance_program {
            return Err(Failure::InvalidData(format!(
                "unknown program {}",
                instruction.program_id
            )));
        }

        let program = self.addresses.governance_program;
        match GovernanceInstruction::unpack(&instruction.data)
            .map_err(|err| Failure::InvalidData(err.to_string()))?
        {
            GovernanceInstruction::InitializeGovernance {
                voting_period,
                quorum_votes,
            } => {
                self.create(
                    accounts,
                    key(0)?,
                    &program,
                    &GovernanceState {
                        admin: key(1)?,
                        voting_period,
                        quorum_votes,
                        proposal_count: 0,
                    },
                )?;
                info!("[LEDGER] governance initialized, admin {}", key(1)?);
            }
            GovernanceInstruction::AddVerifiedUser => {
                let governance: GovernanceState = self.load(
                    accounts,
                    &self.addresses.governance_state().map_err(|err| Failure::InvalidData(err.to_string()))?.address,
                )?;
                if governance.admin != key(2)? {
                    return Err(Failure::Custom(AnchorErrorCode::ConstraintRaw as u32));
                }
                self.create(
                    accounts,
                    key(0)?,
                    &program,
                    &VerifiedUser {
                        authority: key(1)?,
                        is_verified: true,
                    },
                )?;
                info!("[LEDGER] verified {}", key(1)?);
            }
            GovernanceInstruction::CreateProposal(args) => {
                let state_address = key(0)?;
                let mut governance: GovernanceState = self.load(accounts, &state_address)?;
                let verified = self
                    .load::<VerifiedUser>(accounts, &key(3)?)
                    .map_err(|_| Failure::governance(GovernanceError::UserNotVerified))?;
                if !verified.is_verified {
                    return Err(Failure::governance(GovernanceError::UserNotVerified));
                }
                let id = governance.proposal_count;
                let expected = self
                    .addresses
                    .proposal(id)
                    .map_err(|err| Failure::InvalidData(err.to_string()))?
                    .address;
                if key(1)? != expected {
                    return Err(Failure::Custom(AnchorErrorCode::ConstraintSeeds as u32));
                }
                self.create(
                    accounts,
                    expected,
                    &program,
                    &Proposal {
                        id,
                        proposer: key(2)?,
                        description: args.description,
                        yes_votes: 0,
                        no_votes: 0,
                        start_slot: slot,
                        end_slot: slot.saturating_add(u64::try_from(governance.voting_period).unwrap_or(0)),
                        state: ProposalState::Voting,
                        bond_purpose: args.bond_purpose,
                        bond_sector: args.bond_sector,
                        bond_amount: args.bond_amount,
                    },
                )?;
                governance.proposal_count = id.saturating_add(1);
                self.store(accounts, state_address, &program, &governance)?;
                info!("[LEDGER] proposal #{id} created");
            }
            GovernanceInstruction::CastVote { vote_yes } => {
                let proposal_address = key(0)?;
                let voter = key(1)?;
                let mut proposal: Proposal = self.load(accounts, &proposal_address)?;
                if !accounts.contains_key(&key(2)?) {
                    return Err(Failure::governance(GovernanceError::NotBondHolder));
                }
                if proposal.state != ProposalState::Voting {
                    return Err(Failure::governance(GovernanceError::ProposalNotActive));
                }
                if slot > proposal.end_slot {
                    return Err(Failure::governance(GovernanceError::VotingPeriodEnded));
                }
                self.create(
                    accounts,
                    key(3)?,
                    &program,
                    &VoteRecord {
                        proposal_id: proposal.id,
                        voter,
                    },
                )?;
                if vote_yes {
                    proposal.yes_votes = proposal.yes_votes.saturating_add(1);
                } else {
                    proposal.no_votes = proposal.no_votes.saturating_add(1);
                }
                self.store(accounts, proposal_address, &program, &proposal)?;
                info!(
                    "[LEDGER] {voter} voted {} on proposal #{}",
                    if vote_yes { "yes" } else { "no" },
                    proposal.id
                );
            }
            GovernanceInstruction::ExecuteProposal => {
                let proposal_address = key(0)?;
                let mut proposal: Proposal = self.load(accounts, &proposal_address)?;
                if proposal.state != ProposalState::Succeeded {
                    return Err(Failure::governance(GovernanceError::ProposalNotSucceeded));
                }
                proposal.state = ProposalState::Executed;
                self.store(accounts, proposal_address, &program, &proposal)?;
                info!("[LEDGER] proposal #{} executed", proposal.id);
            }
            GovernanceInstruction::CreateBondViaCpi => {
                let proposal: Proposal = self.load(accounts, &key(0)?)?;
                if proposal.proposer != key(1)? {
                    return Err(Failure::Custom(AnchorErrorCode::ConstraintHasOne as u32));
                }
                if proposal.state != ProposalState::Executed {
                    return Err(Failure::governance(GovernanceError::ProposalNotSucceeded));
                }
                self.create(
                    accounts,
                    key(2)?,
                    &self.addresses.holding_program,
                    &BondAccount {
                        authority: proposal.proposer,
                        purpose: proposal.bond_purpose,
                        sector: proposal.bond_sector,
                        amount: proposal.bond_amount,
                        is_redeemed: false,
                    },
                )?;
                info!("[LEDGER] bond issued for proposal #{}", proposal.id);
            }
        }
        Ok(())
    }

    fn load<T: AnchorAccount>(
        &self,
        accounts: &HashMap<Pubkey, RawAccount>,
        address: &Pubkey,
    ) -> Result<T, Failure> {
        let account = accounts.get(address).ok_or_else(missing_account)?;
        T::try_from_account_data(&account.data)
            .map_err(|_| Failure::Custom(AnchorErrorCode::AccountDidNotDeserialize as u32))
    }

    fn store<T: AnchorAccount>(
        &self,
        accounts: &mut HashMap<Pubkey, RawAccount>,
        address: Pubkey,
        owner: &Pubkey,
        account: &T,
    ) -> InstructionResult {
        let data = account
            .to_account_data()
            .map_err(|err| Failure::InvalidData(err.to_string()))?;
        accounts.insert(
            address,
            RawAccount {
                owner: *owner,
                lamports: RENT_EXEMPT_LAMPORTS,
                executable: false,
                data,
            },
        );
        Ok(())
    }

    /// `init` semantics: the address must be unused.
    fn create<T: AnchorAccount>(
        &self,
        accounts: &mut HashMap<Pubkey, RawAccount>,
        address: Pubkey,
        owner: &Pubkey,
        account: &T,
    ) -> InstructionResult {
        if accounts.contains_key(&address) {
            return Err(Failure::Custom(SYSTEM_ACCOUNT_ALREADY_IN_USE));
        }
        self.store(accounts, address, owner, account)
    }
}

#[async_trait]
impl GovernanceRpc for SimLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, RpcError> {
        Ok(self.state.lock().accounts.get(address).cloned())
    }

    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<RawAccount>>, RpcError> {
        let state = self.state.lock();
        Ok(addresses
            .iter()
            .map(|address| state.accounts.get(address).cloned())
            .collect())
    }

    async fn get_slot(&self) -> Result<u64, RpcError> {
        Ok(self.slot())
    }

    async fn get_version(&self) -> Result<RpcVersionInfo, RpcError> {
        Ok(RpcVersionInfo {
            solana_core: "2.1.0".to_string(),
            feature_set: None,
        })
    }
}

/// Signs every transaction as one wallet.
pub struct SimSigner {
    ledger: Arc<SimLedger>,
    payer: Pubkey,
}

impl SimSigner {
    pub fn new(ledger: Arc<SimLedger>, payer: Pubkey) -> Self {
        Self { ledger, payer }
    }
}

#[async_trait]
impl TransactionSubmitter for SimSigner {
    fn payer(&self) -> Pubkey {
        self.payer
    }

    async fn submit(&self, instructions: &[Instruction]) -> Result<TransactionId, SubmitError> {
        self.ledger.process_transaction(&self.payer, instructions)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// One wallet's view of the ledger.
pub struct Participant {
    pub wallet: Pubkey,
    pub session: Session,
    pub uploader: Arc<MockUploader>,
}

/// A session for a fresh wallet with an in-memory attachment store.
pub fn participant(ledger: &Arc<SimLedger>) -> Participant {
    participant_with_store(ledger, Arc::new(MemoryAttachmentStore::new()))
}

pub fn participant_with_store(
    ledger: &Arc<SimLedger>,
    attachments: Arc<dyn AttachmentStore>,
) -> Participant {
    let wallet = Pubkey::new_unique();
    let uploader = Arc::new(MockUploader::default());
    let session = Session::new(ledger.clone(), attachments, *ledger.addresses())
        .with_submitter(Arc::new(SimSigner::new(ledger.clone(), wallet)))
        .with_uploader(uploader.clone());
    Participant {
        wallet,
        session,
        uploader,
    }
}

/// Initialize test logging (idempotent).
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
