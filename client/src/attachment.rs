//! Off-chain attachment metadata.
//!
//! After a proposal is submitted the client records where its supporting
//! document was pinned, keyed by `"proposal_" + id`.  The cache is advisory:
//! on-chain state always wins, and entries may be lost or go stale.
//!
//! Two stores are provided: [`MemoryAttachmentStore`] and
//! [`FileAttachmentStore`], which keeps a single JSON object on disk.  Both
//! are last-writer-wins.

use {
    async_trait::async_trait,
    log::*,
    parking_lot::{Mutex, RwLock},
    reqwest::multipart::{Form, Part},
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    std::{
        collections::BTreeMap,
        fs, io,
        path::{Path, PathBuf},
        time::{SystemTime, UNIX_EPOCH},
    },
    thiserror::Error,
};

/// Key prefix of attachment entries.
pub const ATTACHMENT_KEY_PREFIX: &str = "proposal_";

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "application/pdf"];

/// Upload size limit (5 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("attachment store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("attachment store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported content type {0:?}; expected JPEG, PNG or PDF")]
    UnsupportedType(String),

    #[error("file is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload rejected: {0}")]
    Upload(String),

    #[error("pinning service credentials are not configured")]
    MissingCredentials,
}

/// Metadata of a pinned file.  Serialized as
/// `{"ipfsUrl": .., "fileName": .., "timestamp": <ms>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub ipfs_url: String,
    pub file_name: String,
    /// Milliseconds since the Unix epoch.  Browser-written stores may hold
    /// it as a float or a string.
    #[serde(deserialize_with = "crate::numeric::deserialize_u64")]
    pub timestamp: u64,
}

impl AttachmentRecord {
    pub fn new(ipfs_url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            ipfs_url: ipfs_url.into(),
            file_name: file_name.into(),
            timestamp: now_millis(),
        }
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub fn attachment_key(proposal_id: u64) -> String {
    format!("{ATTACHMENT_KEY_PREFIX}{proposal_id}")
}

/// Proposal id of a well-formed key.
pub fn parse_attachment_key(key: &str) -> Option<u64> {
    let digits = key.strip_prefix(ATTACHMENT_KEY_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id = digits.parse::<u64>().ok()?;
    // Reject non-canonical spellings such as "proposal_007".
    (attachment_key(id) == key).then_some(id)
}

/// Persistence of attachment records.
pub trait AttachmentStore: Send + Sync {
    fn get(&self, proposal_id: u64) -> Result<Option<AttachmentRecord>, AttachmentError>;

    fn put(&self, proposal_id: u64, record: AttachmentRecord) -> Result<(), AttachmentError>;

    /// Remove an entry by raw key.  Returns whether it existed.
    fn remove(&self, key: &str) -> Result<bool, AttachmentError>;

    /// Every raw key, including malformed ones.
    fn keys(&self) -> Result<Vec<String>, AttachmentError>;

    /// All well-formed records, by key.
    fn snapshot(&self) -> Result<BTreeMap<String, AttachmentRecord>, AttachmentError>;
}

// ── In-memory store ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryAttachmentStore {
    entries: RwLock<BTreeMap<String, AttachmentRecord>>,
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under an arbitrary key, bypassing key formatting.
    pub fn insert_raw(&self, key: impl Into<String>, record: AttachmentRecord) {
        self.entries.write().insert(key.into(), record);
    }
}

impl AttachmentStore for MemoryAttachmentStore {
    fn get(&self, proposal_id: u64) -> Result<Option<AttachmentRecord>, AttachmentError> {
        Ok(self.entries.read().get(&attachment_key(proposal_id)).cloned())
    }

    fn put(&self, proposal_id: u64, record: AttachmentRecord) -> Result<(), AttachmentError> {
        self.entries.write().insert(attachment_key(proposal_id), record);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, AttachmentError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, AttachmentError> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn snapshot(&self) -> Result<BTreeMap<String, AttachmentRecord>, AttachmentError> {
        Ok(self.entries.read().clone())
    }
}

// ── File store ──────────────────────────────────────────────────────────────

/// A single JSON object on disk, rewritten whole on every change.
#[derive(Debug)]
pub struct FileAttachmentStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileAttachmentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, AttachmentError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Map::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Map::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, entries: &Map<String, Value>) -> Result<(), AttachmentError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn parse_entry(key: &str, value: &Value) -> Option<AttachmentRecord> {
        match serde_json::from_value(value.clone()) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("attachment entry {key}: unreadable ({err})");
                None
            }
        }
    }
}

impl AttachmentStore for FileAttachmentStore {
    fn get(&self, proposal_id: u64) -> Result<Option<AttachmentRecord>, AttachmentError> {
        let _guard = self.lock.lock();
        let key = attachment_key(proposal_id);
        Ok(self
            .load()?
            .get(&key)
            .and_then(|value| Self::parse_entry(&key, value)))
    }

    fn put(&self, proposal_id: u64, record: AttachmentRecord) -> Result<(), AttachmentError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(attachment_key(proposal_id), serde_json::to_value(record)?);
        self.store(&entries)
    }

    fn remove(&self, key: &str) -> Result<bool, AttachmentError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.store(&entries)?;
        }
        Ok(existed)
    }

    fn keys(&self) -> Result<Vec<String>, AttachmentError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.keys().cloned().collect())
    }

    fn snapshot(&self) -> Result<BTreeMap<String, AttachmentRecord>, AttachmentError> {
        let _guard = self.lock.lock();
        Ok(self
            .load()?
            .iter()
            .filter_map(|(key, value)| Some((key.clone(), Self::parse_entry(key, value)?)))
            .collect())
    }
}

// ── Upload ──────────────────────────────────────────────────────────────────

/// A file ready to be pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AttachmentFile {
    /// Guess the content type from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "pdf" => "application/pdf",
            other => return Err(AttachmentError::UnsupportedType(other.to_string())),
        };
        Ok(Self {
            file_name,
            content_type: content_type.to_string(),
            bytes: fs::read(path)?,
        })
    }

    pub fn validate(&self) -> Result<(), AttachmentError> {
        validate_upload(&self.content_type, self.bytes.len() as u64)
    }
}

pub fn validate_upload(content_type: &str, size: u64) -> Result<(), AttachmentError> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(AttachmentError::UnsupportedType(content_type.to_string()));
    }
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge {
            size,
            max: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}

/// Result of pinning a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAttachment {
    pub cid: String,
    pub url: String,
    pub file_name: String,
}

impl UploadedAttachment {
    pub fn into_record(self) -> AttachmentRecord {
        AttachmentRecord::new(self.url, self.file_name)
    }
}

#[async_trait]
pub trait AttachmentUploader: Send + Sync {
    async fn upload(&self, file: AttachmentFile) -> Result<UploadedAttachment, AttachmentError>;
}

pub const PINATA_PIN_FILE_URL: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";
pub const PINATA_GATEWAY: &str = "https://gateway.pinata.cloud";

#[derive(Deserialize)]
struct PinFileResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Pins files through Pinata's `pinFileToIPFS` endpoint.
pub struct PinataUploader {
    client: reqwest::Client,
    endpoint: String,
    gateway: String,
    jwt: String,
}

impl PinataUploader {
    pub fn new(jwt: impl Into<String>) -> Self {
        Self::with_endpoints(jwt, PINATA_PIN_FILE_URL, PINATA_GATEWAY)
    }

    pub fn with_endpoints(
        jwt: impl Into<String>,
        endpoint: impl Into<String>,
        gateway: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            gateway: gateway.into(),
            jwt: jwt.into(),
        }
    }

    pub fn gateway_url(&self, cid: &str) -> String {
        format!("{}/ipfs/{cid}", self.gateway.trim_end_matches('/'))
    }
}

#[async_trait]
impl AttachmentUploader for PinataUploader {
    async fn upload(&self, file: AttachmentFile) -> Result<UploadedAttachment, AttachmentError> {
        file.validate()?;
        if self.jwt.is_empty() {
            return Err(AttachmentError::MissingCredentials);
        }
        let AttachmentFile {
            file_name,
            content_type,
            bytes,
        } = file;
        debug!("pinning {file_name} ({} bytes)", bytes.len());
        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(&content_type)?;
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.jwt)
            .multipart(Form::new().part("file", part))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttachmentError::Upload(format!("{status}: {body}")));
        }
        let PinFileResponse { ipfs_hash } = response.json().await?;
        info!("pinned {file_name} as {ipfs_hash}");
        Ok(UploadedAttachment {
            url: self.gateway_url(&ipfs_hash),
            cid: ipfs_hash,
            file_name,
        })
    }
}
