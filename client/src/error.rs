use {
    crate::{
        address::DerivationError, attachment::AttachmentError, config::ConfigError,
        guard::ActionKey, rpc::RpcError, submit_error::SubmitError,
    },
    thiserror::Error,
};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("{0} is already in progress")]
    AlreadyInProgress(ActionKey),

    /// A pre-check failed; nothing was submitted.
    #[error("{0}")]
    Rejected(String),

    #[error("invalid proposal: {0}")]
    InvalidDraft(String),

    #[error("proposal {0} does not exist")]
    ProposalNotFound(u64),

    #[error("governance state is not initialized")]
    GovernanceNotInitialized,

    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no signing keypair is configured")]
    MissingSigner,
}

pub type Result<T> = std::result::Result<T, ClientError>;
