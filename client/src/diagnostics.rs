//! Connection and account health report for troubleshooting a deployment.
//!
//! Nothing here fails on bad chain data: every account is reported with its
//! raw facts, how far its contents could be read, and the fields recovered
//! either by the full decode or by the fixed-offset fallback.

use {
    crate::{
        decoder::{decode_account, AccountLayout, DecodedAccount, RawAccount},
        rpc_response::RpcVersionInfo,
        view::{serialize_opt_pubkey, serialize_pubkey, GovernanceSummary},
    },
    bondgov_governance_interface::{
        bond::BondAccount,
        state::{GovernanceState, VerifiedUser},
    },
    serde::Serialize,
    solana_pubkey::Pubkey,
};

/// Layout-independent facts about one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFacts {
    #[serde(serialize_with = "serialize_pubkey")]
    pub address: Pubkey,
    pub exists: bool,
    #[serde(serialize_with = "serialize_opt_pubkey")]
    pub owner: Option<Pubkey>,
    pub lamports: u64,
    pub executable: bool,
    pub data_len: usize,
}

impl AccountFacts {
    pub fn new(address: Pubkey, raw: Option<&RawAccount>) -> Self {
        match raw {
            Some(raw) => Self {
                address,
                exists: true,
                owner: Some(raw.owner),
                lamports: raw.lamports,
                executable: raw.executable,
                data_len: raw.data.len(),
            },
            None => Self {
                address,
                exists: false,
                owner: None,
                lamports: 0,
                executable: false,
                data_len: 0,
            },
        }
    }
}

/// How much of an account's contents could be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadOutcome {
    Absent,
    Decoded,
    /// Full decode failed; fixed-offset fields were recovered.
    Fallback,
    Unreadable,
}

impl ReadOutcome {
    fn of<T: AccountLayout>(account: &DecodedAccount<T>) -> Self {
        match account {
            DecodedAccount::Absent => Self::Absent,
            DecodedAccount::Decoded(_) => Self::Decoded,
            DecodedAccount::Degraded {
                partial: Some(_), ..
            } => Self::Fallback,
            DecodedAccount::Degraded { partial: None, .. } => Self::Unreadable,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Fallback | Self::Unreadable)
    }
}

fn decode_error<T: AccountLayout>(account: &DecodedAccount<T>) -> Option<String> {
    match account {
        DecodedAccount::Degraded { reason, .. } => Some(reason.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramReport {
    pub name: &'static str,
    #[serde(flatten)]
    pub account: AccountFacts,
}

impl ProgramReport {
    pub fn is_deployed(&self) -> bool {
        self.account.exists && self.account.executable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceReport {
    #[serde(flatten)]
    pub account: AccountFacts,
    pub read: ReadOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
    pub summary: Option<GovernanceSummary>,
}

impl GovernanceReport {
    pub fn new(address: Pubkey, raw: Option<&RawAccount>, program: &Pubkey) -> Self {
        let account = decode_account::<GovernanceState>(&address, raw, program);
        Self {
            account: AccountFacts::new(address, raw),
            read: ReadOutcome::of(&account),
            decode_error: decode_error(&account),
            summary: GovernanceSummary::from_account(address, &account),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUserReport {
    #[serde(flatten)]
    pub account: AccountFacts,
    pub read: ReadOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
    #[serde(serialize_with = "serialize_opt_pubkey")]
    pub authority: Option<Pubkey>,
    pub is_verified: Option<bool>,
}

impl VerifiedUserReport {
    pub fn new(address: Pubkey, raw: Option<&RawAccount>, program: &Pubkey) -> Self {
        let account = decode_account::<VerifiedUser>(&address, raw, program);
        let fields = match &account {
            DecodedAccount::Decoded(user) => Some(user.to_partial()),
            _ => account.partial().copied(),
        };
        Self {
            account: AccountFacts::new(address, raw),
            read: ReadOutcome::of(&account),
            decode_error: decode_error(&account),
            authority: fields.map(|fields| fields.authority),
            is_verified: fields.map(|fields| fields.is_verified),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingReport {
    #[serde(flatten)]
    pub account: AccountFacts,
    pub read: ReadOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
    #[serde(serialize_with = "serialize_opt_pubkey")]
    pub authority: Option<Pubkey>,
    /// Only known after a full decode.
    pub amount: Option<u64>,
}

impl HoldingReport {
    pub fn new(address: Pubkey, raw: Option<&RawAccount>, program: &Pubkey) -> Self {
        let account = decode_account::<BondAccount>(&address, raw, program);
        let authority = match &account {
            DecodedAccount::Decoded(bond) => Some(bond.authority),
            _ => account.partial().map(|partial| partial.authority),
        };
        Self {
            account: AccountFacts::new(address, raw),
            read: ReadOutcome::of(&account),
            decode_error: decode_error(&account),
            authority,
            amount: account.decoded().map(|bond| bond.amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletReport {
    #[serde(serialize_with = "serialize_pubkey")]
    pub wallet: Pubkey,
    pub is_admin: bool,
    pub verified_user: VerifiedUserReport,
    pub holding: HoldingReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
    pub version: Option<RpcVersionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsReport {
    pub node: NodeReport,
    pub slot: Option<u64>,
    pub programs: Vec<ProgramReport>,
    pub governance: Option<GovernanceReport>,
    pub wallet: Option<WalletReport>,
}

impl DiagnosticsReport {
    /// Report for a node that did not answer `getVersion`.
    pub fn unreachable(error: String) -> Self {
        Self {
            node: NodeReport {
                version: None,
                error: Some(error),
            },
            slot: None,
            programs: Vec::new(),
            governance: None,
            wallet: None,
        }
    }

    /// Human-readable problems, empty for a healthy deployment.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Some(error) = &self.node.error {
            problems.push(format!("node unreachable: {error}"));
        }
        for program in &self.programs {
            if !program.account.exists {
                problems.push(format!(
                    "{} program {} not found",
                    program.name, program.account.address
                ));
            } else if !program.account.executable {
                problems.push(format!(
                    "{} program account {} is not executable",
                    program.name, program.account.address
                ));
            }
        }
        if let Some(governance) = &self.governance {
            match (&governance.read, &governance.decode_error) {
                (ReadOutcome::Absent, _) => {
                    problems.push("governance state not initialized".to_string())
                }
                (read, Some(error)) if read.is_degraded() => {
                    problems.push(format!("governance state did not decode: {error}"))
                }
                _ => {}
            }
        }
        if let Some(wallet) = &self.wallet {
            if let (true, Some(error)) = (
                wallet.verified_user.read.is_degraded(),
                &wallet.verified_user.decode_error,
            ) {
                problems.push(format!(
                    "verified-user account {} did not decode: {error}",
                    wallet.verified_user.account.address
                ));
            }
            if let (true, Some(error)) =
                (wallet.holding.read.is_degraded(), &wallet.holding.decode_error)
            {
                problems.push(format!(
                    "holding account {} did not decode: {error}",
                    wallet.holding.account.address
                ));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_utils::{governance_fixture, raw_account},
        bondgov_governance_interface::id,
    };

    #[test]
    fn test_verified_user_fallback_reads_fixed_offsets() {
        let authority = Pubkey::new_unique();
        let address = Pubkey::new_unique();
        // Unknown discriminator, authority at 8..40, flag at 40.
        let mut data = vec![0xee; 8];
        data.extend_from_slice(authority.as_ref());
        data.push(1);
        let raw = RawAccount {
            owner: id(),
            lamports: 5,
            executable: false,
            data,
        };

        let report = VerifiedUserReport::new(address, Some(&raw), &id());
        assert_eq!(report.read, ReadOutcome::Fallback);
        assert_eq!(report.authority, Some(authority));
        assert_eq!(report.is_verified, Some(true));
        assert!(report.decode_error.is_some());
        assert_eq!(report.account.data_len, 41);
        assert_eq!(report.account.lamports, 5);
    }

    #[test]
    fn test_short_verified_user_is_unreadable() {
        let raw = RawAccount {
            owner: id(),
            lamports: 1,
            executable: false,
            data: vec![0; 20],
        };
        let report = VerifiedUserReport::new(Pubkey::new_unique(), Some(&raw), &id());
        assert_eq!(report.read, ReadOutcome::Unreadable);
        assert_eq!(report.authority, None);
        assert_eq!(report.is_verified, None);
    }

    #[test]
    fn test_problems() {
        let admin = Pubkey::new_unique();
        let governance_address = Pubkey::new_unique();
        let healthy = DiagnosticsReport {
            node: NodeReport {
                version: Some(RpcVersionInfo {
                    solana_core: "2.1.0".to_string(),
                    feature_set: None,
                }),
                error: None,
            },
            slot: Some(9),
            programs: vec![],
            governance: Some(GovernanceReport::new(
                governance_address,
                Some(&raw_account(&id(), &governance_fixture(admin, 0))),
                &id(),
            )),
            wallet: None,
        };
        assert!(healthy.problems().is_empty());

        let mut broken = healthy.clone();
        broken.programs.push(ProgramReport {
            name: "holding",
            account: AccountFacts::new(Pubkey::new_unique(), None),
        });
        broken.governance = Some(GovernanceReport::new(governance_address, None, &id()));
        let problems = broken.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].starts_with("holding program"));
        assert_eq!(problems[1], "governance state not initialized");

        let offline = DiagnosticsReport::unreachable("connection refused".to_string());
        assert_eq!(
            offline.problems(),
            vec!["node unreachable: connection refused".to_string()]
        );
    }
}
