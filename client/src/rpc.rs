//! Chain access: account reads and transaction submission.
//!
//! ```text
//!   Session ──► GovernanceRpc ──────────► getAccountInfo / getMultipleAccounts / getSlot
//!          └──► TransactionSubmitter ───► getLatestBlockhash ─► sendTransaction ─► getSignatureStatuses
//! ```
//!
//! Both traits are object safe so tests and the e2e harness can stand in for
//! a node.

use {
    crate::{
        decoder::RawAccount,
        rpc_response::{
            JsonRpcErrorObject, JsonRpcResponse, RpcBlockhash, RpcResponse, RpcSignatureStatus,
            RpcVersionInfo, UiAccount,
        },
        submit_error::{SubmitError, SubmitErrorKind},
    },
    async_trait::async_trait,
    base64::{prelude::BASE64_STANDARD, Engine},
    log::*,
    serde::{de::DeserializeOwned, Serialize},
    serde_json::{json, Value},
    solana_instruction::Instruction,
    solana_keypair::Keypair,
    solana_message::Message,
    solana_pubkey::Pubkey,
    solana_signer::Signer,
    solana_transaction::Transaction,
    std::{
        fmt,
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
        },
        time::Duration,
    },
    thiserror::Error,
};

/// `getMultipleAccounts` accepts at most this many keys per call.
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";
pub const DEFAULT_COMMITMENT: &str = "confirmed";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcErrorObject),

    #[error("malformed RPC response: {0}")]
    Malformed(String),
}

impl From<RpcError> for SubmitError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Transport(err) => SubmitError::new(SubmitErrorKind::Network, err.to_string()),
            RpcError::Rpc(object) => {
                SubmitError::classify(object.transaction_error(), &object.message, object.logs())
            }
            RpcError::Malformed(message) => SubmitError::new(SubmitErrorKind::Unknown, message),
        }
    }
}

/// Base-58 signature of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read access to the chain.
#[async_trait]
pub trait GovernanceRpc: Send + Sync {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, RpcError>;

    /// One entry per address, in order.
    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<RawAccount>>, RpcError>;

    async fn get_slot(&self) -> Result<u64, RpcError>;

    async fn get_version(&self) -> Result<RpcVersionInfo, RpcError>;
}

/// Signs and submits instructions on behalf of one payer.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    fn payer(&self) -> Pubkey;

    /// Submit the instructions as one transaction and wait for confirmation.
    async fn submit(&self, instructions: &[Instruction]) -> Result<TransactionId, SubmitError>;
}

/// Convert a base64-encoded account.
pub fn decode_ui_account(account: UiAccount) -> Result<RawAccount, RpcError> {
    let (payload, encoding) = match account.data.as_slice() {
        [payload, encoding] => (payload, encoding.as_str()),
        other => {
            return Err(RpcError::Malformed(format!(
                "expected [data, encoding], got {} elements",
                other.len()
            )))
        }
    };
    if encoding != "base64" {
        return Err(RpcError::Malformed(format!(
            "unexpected account encoding {encoding}"
        )));
    }
    let data = BASE64_STANDARD
        .decode(payload)
        .map_err(|err| RpcError::Malformed(format!("account data: {err}")))?;
    let owner = account
        .owner
        .parse()
        .map_err(|_| RpcError::Malformed(format!("account owner {}", account.owner)))?;
    Ok(RawAccount {
        owner,
        lamports: account.lamports,
        executable: account.executable,
        data,
    })
}

// ── JSON-RPC over HTTP ──────────────────────────────────────────────────────

pub struct HttpRpcClient {
    url: String,
    commitment: String,
    client: reqwest::Client,
    request_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::new_with_commitment(url, DEFAULT_COMMITMENT)
    }

    pub fn new_with_commitment(url: impl Into<String>, commitment: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            commitment: commitment.into(),
            client,
            request_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn commitment(&self) -> &str {
        &self.commitment
    }

    /// Issue one JSON-RPC call.
    pub async fn send<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!("{method} #{id} -> {}", self.url);
        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let response: JsonRpcResponse<T> = serde_json::from_str(&text)
            .map_err(|err| RpcError::Malformed(format!("{method} (HTTP {status}): {err}")))?;
        if let Some(error) = response.error {
            debug!("{method} #{id} failed: {} {}", error.code, error.message);
            return Err(RpcError::Rpc(error));
        }
        response
            .result
            .ok_or_else(|| RpcError::Malformed(format!("{method}: response has no result")))
    }

    fn account_config(&self) -> Value {
        json!({"encoding": "base64", "commitment": self.commitment})
    }

    pub async fn get_latest_blockhash(&self) -> Result<RpcBlockhash, RpcError> {
        let response: RpcResponse<RpcBlockhash> = self
            .send(
                "getLatestBlockhash",
                json!([{"commitment": self.commitment}]),
            )
            .await?;
        Ok(response.value)
    }

    /// Returns the base-58 signature reported by the node.
    pub async fn send_transaction(&self, transaction: &Transaction) -> Result<String, RpcError> {
        let wire = bincode::serialize(transaction)
            .map_err(|err| RpcError::Malformed(format!("transaction encoding: {err}")))?;
        self.send(
            "sendTransaction",
            json!([
                BASE64_STANDARD.encode(wire),
                {"encoding": "base64", "preflightCommitment": self.commitment},
            ]),
        )
        .await
    }

    pub async fn get_signature_statuses(
        &self,
        signatures: &[String],
    ) -> Result<Vec<Option<RpcSignatureStatus>>, RpcError> {
        let response: RpcResponse<Vec<Option<RpcSignatureStatus>>> = self
            .send("getSignatureStatuses", json!([signatures]))
            .await?;
        Ok(response.value)
    }
}

#[async_trait]
impl GovernanceRpc for HttpRpcClient {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, RpcError> {
        let response: RpcResponse<Option<UiAccount>> = self
            .send(
                "getAccountInfo",
                json!([address.to_string(), self.account_config()]),
            )
            .await?;
        response.value.map(decode_ui_account).transpose()
    }

    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<RawAccount>>, RpcError> {
        let mut accounts = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let keys: Vec<String> = chunk.iter().map(Pubkey::to_string).collect();
            let response: RpcResponse<Vec<Option<UiAccount>>> = self
                .send("getMultipleAccounts", json!([keys, self.account_config()]))
                .await?;
            if response.value.len() != chunk.len() {
                return Err(RpcError::Malformed(format!(
                    "getMultipleAccounts returned {} entries for {} keys",
                    response.value.len(),
                    chunk.len()
                )));
            }
            for account in response.value {
                accounts.push(account.map(decode_ui_account).transpose()?);
            }
        }
        Ok(accounts)
    }

    async fn get_slot(&self) -> Result<u64, RpcError> {
        self.send("getSlot", json!([{"commitment": self.commitment}]))
            .await
    }

    async fn get_version(&self) -> Result<RpcVersionInfo, RpcError> {
        self.send("getVersion", json!([])).await
    }
}

// ── Keypair submitter ───────────────────────────────────────────────────────

fn commitment_rank(level: &str) -> u8 {
    match level {
        "finalized" => 2,
        "confirmed" => 1,
        _ => 0,
    }
}

/// Whether a signature status has reached `commitment`.
pub fn commitment_reached(status: &RpcSignatureStatus, commitment: &str) -> bool {
    let reached = match status.confirmation_status.as_deref() {
        Some(level) => commitment_rank(level),
        // Older nodes: no confirmation count means rooted.
        None if status.confirmations.is_none() => 2,
        None => 0,
    };
    reached >= commitment_rank(commitment)
}

/// Signs with a local keypair and waits for the configured commitment.
pub struct KeypairSubmitter {
    rpc: Arc<HttpRpcClient>,
    keypair: Keypair,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl KeypairSubmitter {
    pub fn new(rpc: Arc<HttpRpcClient>, keypair: Keypair) -> Self {
        Self {
            rpc,
            keypair,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_confirm_timeout(mut self, confirm_timeout: Duration) -> Self {
        self.confirm_timeout = confirm_timeout;
        self
    }

    async fn wait_for_confirmation(&self, signature: &str) -> Result<(), SubmitError> {
        let signatures = [signature.to_string()];
        loop {
            let statuses = self.rpc.get_signature_statuses(&signatures).await?;
            if let Some(Some(status)) = statuses.first() {
                if let Some(err) = &status.err {
                    return Err(SubmitError::classify(
                        Some(err),
                        &format!("transaction {signature} failed: {err}"),
                        vec![],
                    ));
                }
                if commitment_reached(status, self.rpc.commitment()) {
                    return Ok(());
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl TransactionSubmitter for KeypairSubmitter {
    fn payer(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn submit(&self, instructions: &[Instruction]) -> Result<TransactionId, SubmitError> {
        let latest = self.rpc.get_latest_blockhash().await?;
        let mut message = Message::new(instructions, Some(&self.keypair.pubkey()));
        message.recent_blockhash = latest.blockhash.parse().map_err(|_| {
            SubmitError::new(
                SubmitErrorKind::Unknown,
                format!("invalid blockhash {}", latest.blockhash),
            )
        })?;
        let recent_blockhash = message.recent_blockhash.clone();
        let mut transaction = Transaction::new_unsigned(message);
        transaction
            .try_sign(&[&self.keypair], recent_blockhash)
            .map_err(|err| SubmitError::new(SubmitErrorKind::Unknown, err.to_string()))?;
        let signature = transaction
            .signatures
            .first()
            .map(|signature| bs58::encode(signature.as_ref()).into_string())
            .ok_or_else(|| SubmitError::new(SubmitErrorKind::Unknown, "transaction is unsigned"))?;

        info!("submitting {signature} ({} instructions)", instructions.len());
        self.rpc.send_transaction(&transaction).await?;

        tokio::time::timeout(self.confirm_timeout, self.wait_for_confirmation(&signature))
            .await
            .map_err(|_| {
                SubmitError::new(
                    SubmitErrorKind::Timeout,
                    format!(
                        "{signature} not {} after {:?}",
                        self.rpc.commitment(),
                        self.confirm_timeout
                    ),
                )
            })??;
        Ok(TransactionId(signature))
    }
}
