//! In-memory stand-ins for a node, a signer and a pinning service.

use {
    crate::{
        attachment::{AttachmentError, AttachmentFile, AttachmentUploader, UploadedAttachment},
        decoder::RawAccount,
        rpc::{GovernanceRpc, RpcError, TransactionId, TransactionSubmitter},
        rpc_response::{JsonRpcErrorObject, RpcVersionInfo},
        submit_error::SubmitError,
    },
    async_trait::async_trait,
    bondgov_governance_interface::state::{AnchorAccount, GovernanceState, Proposal, ProposalState},
    parking_lot::{Mutex, RwLock},
    solana_instruction::Instruction,
    solana_pubkey::Pubkey,
    std::{
        collections::{HashMap, VecDeque},
        sync::{
            atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
            Arc,
        },
    },
    tokio::sync::Notify,
};

/// Serialize `account` the way the program stores it.
pub fn raw_account<T: AnchorAccount>(owner: &Pubkey, account: &T) -> RawAccount {
    RawAccount {
        owner: *owner,
        lamports: 1_000_000,
        executable: false,
        data: account
            .to_account_data()
            .expect("in-memory serialization"),
    }
}

pub fn governance_fixture(admin: Pubkey, proposal_count: u64) -> GovernanceState {
    GovernanceState {
        admin,
        voting_period: 100,
        quorum_votes: 1,
        proposal_count,
    }
}

pub fn proposal_fixture(id: u64, state: ProposalState, yes_votes: u64, no_votes: u64) -> Proposal {
    Proposal {
        id,
        proposer: Pubkey::new_unique(),
        description: format!("Fund public works batch {id}"),
        yes_votes,
        no_votes,
        start_slot: 100,
        end_slot: 200,
        state,
        bond_purpose: "Bridge repair".to_string(),
        bond_sector: "Infrastructure".to_string(),
        bond_amount: 5_000_000_000,
    }
}

/// A pausable point in a mock call.
#[derive(Default)]
struct Gate {
    closed: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
}

impl Gate {
    fn close(&self) {
        *self.closed.lock() = Some(Arc::new(Notify::new()));
    }

    /// Reopen for later callers and release the one waiting.
    fn open(&self) {
        if let Some(notify) = self.closed.lock().take() {
            notify.notify_one();
        }
    }

    async fn pass(&self) {
        let closed = self.closed.lock().clone();
        if let Some(notify) = closed {
            self.entered.notify_one();
            notify.notified().await;
        }
    }

    async fn wait_entered(&self) {
        self.entered.notified().await;
    }
}

#[derive(Default)]
pub struct MockRpc {
    accounts: RwLock<HashMap<Pubkey, RawAccount>>,
    slot: AtomicU64,
    calls: AtomicUsize,
    slot_gate: Gate,
    unreachable: AtomicBool,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_slot(&self, slot: u64) {
        self.slot.store(slot, Ordering::SeqCst);
    }

    pub fn set_account(&self, address: Pubkey, account: RawAccount) {
        self.accounts.write().insert(address, account);
    }

    pub fn store<T: AnchorAccount>(&self, address: Pubkey, owner: &Pubkey, account: &T) {
        self.set_account(address, raw_account(owner, account));
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.accounts.write().remove(address);
    }

    /// Store an executable account at `program`.
    pub fn deploy_program(&self, program: Pubkey, loader: &Pubkey) {
        self.set_account(
            program,
            RawAccount {
                owner: *loader,
                lamports: 1_141_440,
                executable: true,
                data: vec![2, 0, 0, 0].into_iter().chain([7; 32]).collect(),
            },
        );
    }

    /// Fail every call as a node that cannot be reached would.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of RPC calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Hold every `get_slot` call until [`MockRpc::open_slot`].
    pub fn close_slot(&self) {
        self.slot_gate.close();
    }

    pub fn open_slot(&self) {
        self.slot_gate.open();
    }

    pub async fn wait_slot_entered(&self) {
        self.slot_gate.wait_entered().await;
    }

    fn record_call(&self) -> Result<(), RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RpcError::Rpc(JsonRpcErrorObject {
                code: -32000,
                message: "connection refused".to_string(),
                data: None,
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl GovernanceRpc for MockRpc {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, RpcError> {
        self.record_call()?;
        Ok(self.accounts.read().get(address).cloned())
    }

    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<RawAccount>>, RpcError> {
        self.record_call()?;
        let accounts = self.accounts.read();
        Ok(addresses
            .iter()
            .map(|address| accounts.get(address).cloned())
            .collect())
    }

    async fn get_slot(&self) -> Result<u64, RpcError> {
        self.record_call()?;
        self.slot_gate.pass().await;
        Ok(self.slot.load(Ordering::SeqCst))
    }

    async fn get_version(&self) -> Result<RpcVersionInfo, RpcError> {
        self.record_call()?;
        Ok(RpcVersionInfo {
            solana_core: "2.1.0".to_string(),
            feature_set: Some(4_215_500_110),
        })
    }
}

/// Records submissions instead of sending them.
pub struct MockSubmitter {
    payer: Pubkey,
    submitted: Mutex<Vec<Vec<Instruction>>>,
    failures: Mutex<VecDeque<SubmitError>>,
    gate: Gate,
}

impl MockSubmitter {
    pub fn new(payer: Pubkey) -> Self {
        Self {
            payer,
            submitted: Mutex::default(),
            failures: Mutex::default(),
            gate: Gate::default(),
        }
    }

    /// The next submission fails with `error`.
    pub fn fail_next(&self, error: SubmitError) {
        self.failures.lock().push_back(error);
    }

    /// Hold submissions until [`MockSubmitter::open`].
    pub fn close(&self) {
        self.gate.close();
    }

    pub fn open(&self) {
        self.gate.open();
    }

    pub async fn wait_entered(&self) {
        self.gate.wait_entered().await;
    }

    pub fn submissions(&self) -> Vec<Vec<Instruction>> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl TransactionSubmitter for MockSubmitter {
    fn payer(&self) -> Pubkey {
        self.payer
    }

    async fn submit(&self, instructions: &[Instruction]) -> Result<TransactionId, SubmitError> {
        self.gate.pass().await;
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        let mut submitted = self.submitted.lock();
        submitted.push(instructions.to_vec());
        Ok(TransactionId(format!("mock-tx-{}", submitted.len())))
    }
}

/// Pins nothing; returns a CID derived from the file name.
#[derive(Default)]
pub struct MockUploader {
    uploads: Mutex<Vec<String>>,
}

impl MockUploader {
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl AttachmentUploader for MockUploader {
    async fn upload(&self, file: AttachmentFile) -> Result<UploadedAttachment, AttachmentError> {
        file.validate()?;
        self.uploads.lock().push(file.file_name.clone());
        let cid = format!("Qm{}", file.file_name.replace('.', ""));
        Ok(UploadedAttachment {
            url: format!("https://gateway.pinata.cloud/ipfs/{cid}"),
            cid,
            file_name: file.file_name,
        })
    }
}
