//! Classification of failed submissions.
//!
//! A failure is classified from the structured transaction error first: the
//! `Custom` code of an `InstructionError` identifies governance errors
//! (6000-6007), the system program's "account already in use" (0) and
//! framework errors such as `AccountNotInitialized` (3012).  Only when no
//! structured error is available are the message and program logs searched
//! for known phrases.

use {
    bondgov_governance_interface::error::{
        AnchorErrorCode, GovernanceError, SYSTEM_ACCOUNT_ALREADY_IN_USE,
    },
    serde::Serialize,
    serde_json::Value,
    std::fmt,
    thiserror::Error,
};

/// System program: account does not have enough lamports.
const SYSTEM_RESULT_WITH_NEGATIVE_LAMPORTS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitErrorKind {
    AlreadyExists,
    NotVerified,
    NotHolder,
    NotEligible,
    VotingClosed,
    NotSucceeded,
    QuorumNotReached,
    MissingAccount,
    InsufficientFunds,
    Cancelled,
    Timeout,
    Network,
    Unknown,
}

impl SubmitErrorKind {
    pub fn from_governance_error(error: GovernanceError) -> Self {
        match error {
            GovernanceError::NotBondHolder => Self::NotHolder,
            GovernanceError::ProposalNotActive | GovernanceError::VotingPeriodEnded => {
                Self::VotingClosed
            }
            GovernanceError::VotingPeriodNotOver => Self::NotEligible,
            GovernanceError::VoteFailed | GovernanceError::ProposalNotSucceeded => {
                Self::NotSucceeded
            }
            GovernanceError::QuorumNotReached => Self::QuorumNotReached,
            GovernanceError::UserNotVerified => Self::NotVerified,
        }
    }

    /// Map an `InstructionError::Custom` code.
    pub fn from_custom_code(code: u32) -> Option<Self> {
        if let Some(error) = GovernanceError::from_code(code) {
            return Some(Self::from_governance_error(error));
        }
        match code {
            SYSTEM_ACCOUNT_ALREADY_IN_USE => Some(Self::AlreadyExists),
            SYSTEM_RESULT_WITH_NEGATIVE_LAMPORTS => Some(Self::InsufficientFunds),
            _ => match AnchorErrorCode::from_code(code)? {
                AnchorErrorCode::AccountNotInitialized => Some(Self::MissingAccount),
                _ => None,
            },
        }
    }

    /// Map a unit `InstructionError` or `TransactionError` variant name.
    fn from_error_name(name: &str) -> Option<Self> {
        match name {
            "AccountAlreadyInitialized" => Some(Self::AlreadyExists),
            "InsufficientFunds" | "InsufficientFundsForFee" | "InsufficientFundsForRent" => {
                Some(Self::InsufficientFunds)
            }
            "AccountNotFound" | "ProgramAccountNotFound" | "UninitializedAccount" => {
                Some(Self::MissingAccount)
            }
            _ => None,
        }
    }

    /// Text fallback.  Case-insensitive phrase matching.
    pub fn from_text(text: &str) -> Self {
        let text = text.to_ascii_lowercase();
        if let Some(kind) = custom_code_in_text(&text).and_then(Self::from_custom_code) {
            return kind;
        }
        const PHRASES: &[(&str, SubmitErrorKind)] = &[
            ("already in use", SubmitErrorKind::AlreadyExists),
            ("already exists", SubmitErrorKind::AlreadyExists),
            ("insufficient funds", SubmitErrorKind::InsufficientFunds),
            ("insufficient lamports", SubmitErrorKind::InsufficientFunds),
            ("accountnotinitialized", SubmitErrorKind::MissingAccount),
            ("usernotverified", SubmitErrorKind::NotVerified),
            ("not verified", SubmitErrorKind::NotVerified),
            ("notbondholder", SubmitErrorKind::NotHolder),
            ("not a bond holder", SubmitErrorKind::NotHolder),
            ("votingperiodended", SubmitErrorKind::VotingClosed),
            ("user rejected", SubmitErrorKind::Cancelled),
            ("cancelled", SubmitErrorKind::Cancelled),
            ("timed out", SubmitErrorKind::Timeout),
            ("timeout", SubmitErrorKind::Timeout),
        ];
        PHRASES
            .iter()
            .find(|(phrase, _)| text.contains(phrase))
            .map_or(Self::Unknown, |(_, kind)| *kind)
    }
}

/// Find `custom program error: 0x..` in lowercase text.
fn custom_code_in_text(text: &str) -> Option<u32> {
    const MARKER: &str = "custom program error: 0x";
    let start = text.find(MARKER)?.checked_add(MARKER.len())?;
    let hex: String = text[start..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    u32::from_str_radix(&hex, 16).ok()
}

impl fmt::Display for SubmitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyExists => "account already exists",
            Self::NotVerified => "user is not verified",
            Self::NotHolder => "not a bond holder",
            Self::NotEligible => "not eligible",
            Self::VotingClosed => "voting is closed",
            Self::NotSucceeded => "proposal has not succeeded",
            Self::QuorumNotReached => "quorum not reached",
            Self::MissingAccount => "required account is missing",
            Self::InsufficientFunds => "insufficient funds",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timed out",
            Self::Network => "network error",
            Self::Unknown => "transaction failed",
        })
    }
}

/// A failed submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SubmitError {
    pub kind: SubmitErrorKind,
    pub message: String,
    /// Program logs, when the node returned them.
    pub logs: Vec<String>,
}

impl SubmitError {
    pub fn new(kind: SubmitErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            logs: Vec::new(),
        }
    }

    /// Classify a failure from whatever the node returned.
    pub fn classify(transaction_error: Option<&Value>, message: &str, logs: Vec<String>) -> Self {
        let kind = transaction_error
            .and_then(classify_transaction_error)
            .unwrap_or_else(|| {
                let mut text = message.to_string();
                for line in &logs {
                    text.push('\n');
                    text.push_str(line);
                }
                SubmitErrorKind::from_text(&text)
            });
        Self {
            kind,
            message: message.to_string(),
            logs,
        }
    }
}

/// Structured classification of a JSON `TransactionError`.
///
/// Shapes handled:
/// `{"InstructionError": [idx, {"Custom": n}]}`,
/// `{"InstructionError": [idx, "Name"]}` and `"Name"`.
pub fn classify_transaction_error(error: &Value) -> Option<SubmitErrorKind> {
    match error {
        Value::String(name) => SubmitErrorKind::from_error_name(name),
        Value::Object(map) => {
            let inner = map.get("InstructionError")?.as_array()?.get(1)?;
            match inner {
                Value::Object(inner) => {
                    let code = inner.get("Custom")?.as_u64()?;
                    SubmitErrorKind::from_custom_code(u32::try_from(code).ok()?)
                }
                Value::String(name) => SubmitErrorKind::from_error_name(name),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json, test_case::test_case};

    #[test_case(json!({"InstructionError": [0, {"Custom": 6000}]}), Some(SubmitErrorKind::NotHolder))]
    #[test_case(json!({"InstructionError": [0, {"Custom": 6002}]}), Some(SubmitErrorKind::VotingClosed))]
    #[test_case(json!({"InstructionError": [0, {"Custom": 6005}]}), Some(SubmitErrorKind::QuorumNotReached))]
    #[test_case(json!({"InstructionError": [0, {"Custom": 6006}]}), Some(SubmitErrorKind::NotSucceeded))]
    #[test_case(json!({"InstructionError": [0, {"Custom": 6007}]}), Some(SubmitErrorKind::NotVerified))]
    #[test_case(json!({"InstructionError": [0, {"Custom": 0}]}), Some(SubmitErrorKind::AlreadyExists))]
    #[test_case(json!({"InstructionError": [1, {"Custom": 3012}]}), Some(SubmitErrorKind::MissingAccount))]
    #[test_case(json!({"InstructionError": [0, {"Custom": 2006}]}), None)]
    #[test_case(json!({"InstructionError": [0, "AccountAlreadyInitialized"]}), Some(SubmitErrorKind::AlreadyExists))]
    #[test_case(json!("InsufficientFundsForFee"), Some(SubmitErrorKind::InsufficientFunds))]
    #[test_case(json!("BlockhashNotFound"), None)]
    #[test_case(json!(42), None)]
    fn test_classify_transaction_error(error: Value, expected: Option<SubmitErrorKind>) {
        assert_eq!(classify_transaction_error(&error), expected);
    }

    #[test]
    fn test_structured_error_wins_over_text() {
        // The message mentions "already in use" but the code says otherwise.
        let error = SubmitError::classify(
            Some(&json!({"InstructionError": [0, {"Custom": 6007}]})),
            "account already in use",
            vec![],
        );
        assert_eq!(error.kind, SubmitErrorKind::NotVerified);
    }

    #[test_case("Allocate: account Address { .. } already in use", SubmitErrorKind::AlreadyExists)]
    #[test_case("Transfer: insufficient lamports 10, need 20", SubmitErrorKind::InsufficientFunds)]
    #[test_case("AnchorError caused by account: verified_user. Error Code: AccountNotInitialized.", SubmitErrorKind::MissingAccount)]
    #[test_case("Error Code: UserNotVerified", SubmitErrorKind::NotVerified)]
    #[test_case("custom program error: 0x1770", SubmitErrorKind::NotHolder)]
    #[test_case("User rejected the request.", SubmitErrorKind::Cancelled)]
    #[test_case("something odd", SubmitErrorKind::Unknown)]
    fn test_text_fallback(text: &str, expected: SubmitErrorKind) {
        assert_eq!(SubmitError::classify(None, text, vec![]).kind, expected);
    }

    #[test]
    fn test_logs_are_searched() {
        let error = SubmitError::classify(
            None,
            "Transaction simulation failed",
            vec!["Program log: Error Code: NotBondHolder.".to_string()],
        );
        assert_eq!(error.kind, SubmitErrorKind::NotHolder);
        assert_eq!(error.logs.len(), 1);
    }
}
