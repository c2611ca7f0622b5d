//! Client configuration, persisted as YAML.
//!
//! The default location is `~/.config/bondgov/config.yml`.  A missing file at
//! the default location yields [`ClientConfig::default`]; a missing file at
//! an explicit path is an error.

use {
    crate::{
        address::{parse_address, ProgramAddresses},
        attachment::PINATA_GATEWAY,
        rpc::{DEFAULT_COMMITMENT, DEFAULT_CONFIRM_TIMEOUT, DEFAULT_RPC_URL},
    },
    serde::{Deserialize, Serialize},
    solana_keypair::Keypair,
    std::{
        fs, io,
        path::{Path, PathBuf},
        time::Duration,
    },
    thiserror::Error,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("keypair file {}: {reason}", .path.display())]
    Keypair { path: PathBuf, reason: String },
}

/// `~/.config/bondgov/config.yml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("bondgov").join("config.yml"))
}

fn default_keypair_path() -> String {
    dirs_next::home_dir()
        .map(|home| home.join(".config").join("solana").join("id.json"))
        .unwrap_or_else(|| PathBuf::from("id.json"))
        .to_string_lossy()
        .into_owned()
}

fn default_attachment_store_path() -> String {
    dirs_next::home_dir()
        .map(|home| {
            home.join(".config")
                .join("bondgov")
                .join("attachments.json")
        })
        .unwrap_or_else(|| PathBuf::from("attachments.json"))
        .to_string_lossy()
        .into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub json_rpc_url: String,
    /// `processed`, `confirmed` or `finalized`.
    pub commitment: String,
    pub keypair_path: String,
    /// Governance program id (base-58).
    pub governance_program_id: String,
    /// Holding (bond) program id (base-58).
    pub holding_program_id: String,
    pub attachment_store_path: String,
    /// Pinata JWT; uploads are disabled without it.
    pub pinata_jwt: Option<String>,
    pub ipfs_gateway: String,
    pub confirm_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let programs = ProgramAddresses::default();
        Self {
            json_rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: DEFAULT_COMMITMENT.to_string(),
            keypair_path: default_keypair_path(),
            governance_program_id: programs.governance_program.to_string(),
            holding_program_id: programs.holding_program.to_string(),
            attachment_store_path: default_attachment_store_path(),
            pinata_jwt: None,
            ipfs_gateway: PINATA_GATEWAY.to_string(),
            confirm_timeout_secs: DEFAULT_CONFIRM_TIMEOUT.as_secs(),
        }
    }
}

impl ClientConfig {
    /// A config pointing at a local validator with a scratch attachment
    /// store under `dir`.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default(dir: &Path) -> Self {
        Self {
            keypair_path: dir.join("id.json").to_string_lossy().into_owned(),
            attachment_store_path: dir.join("attachments.json").to_string_lossy().into_owned(),
            confirm_timeout_secs: 5,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or from the default location when `None`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let text = serde_yaml::to_string(self)?;
        fs::write(path, text).map_err(io_error)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.commitment.as_str() {
            "processed" | "confirmed" | "finalized" => {}
            other => {
                return Err(ConfigError::Invalid {
                    field: "commitment",
                    reason: format!("unknown commitment level {other}"),
                })
            }
        }
        url::Url::parse(&self.json_rpc_url).map_err(|err| ConfigError::Invalid {
            field: "json_rpc_url",
            reason: err.to_string(),
        })?;
        self.program_addresses()?;
        Ok(())
    }

    pub fn program_addresses(&self) -> Result<ProgramAddresses, ConfigError> {
        let parse = |field: &'static str, value: &str| {
            parse_address(value).map_err(|err| ConfigError::Invalid {
                field,
                reason: err.to_string(),
            })
        };
        Ok(ProgramAddresses::new(
            parse("governance_program_id", &self.governance_program_id)?,
            parse("holding_program_id", &self.holding_program_id)?,
        ))
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

/// Read a keypair stored as a JSON array of 64 bytes.
pub fn read_keypair_file(path: &Path) -> Result<Keypair, ConfigError> {
    let keypair_error = |reason: String| ConfigError::Keypair {
        path: path.to_path_buf(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|err| keypair_error(err.to_string()))?;
    let bytes: Vec<u8> =
        serde_json::from_str(&text).map_err(|err| keypair_error(err.to_string()))?;
    Keypair::try_from(&bytes[..]).map_err(|err| keypair_error(err.to_string()))
}

/// Write a keypair as a JSON byte array.
pub fn write_keypair_file(keypair: &Keypair, path: &Path) -> Result<(), ConfigError> {
    let text = serde_json::to_string(&keypair.to_bytes().to_vec())
        .map_err(|err| ConfigError::Keypair {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, text).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
