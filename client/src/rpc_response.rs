//! JSON-RPC wire types for the endpoints the client calls.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub result: Option<T>,
    pub error: Option<JsonRpcErrorObject>,
}

/// The `error` member of a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    /// The transaction error of a failed preflight simulation, if present.
    pub fn transaction_error(&self) -> Option<&Value> {
        self.data.as_ref()?.get("err").filter(|err| !err.is_null())
    }

    /// Program logs of a failed preflight simulation.
    pub fn logs(&self) -> Vec<String> {
        self.data
            .as_ref()
            .and_then(|data| data.get("logs"))
            .and_then(Value::as_array)
            .map(|logs| {
                logs.iter()
                    .filter_map(|line| line.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ─── Contextual responses ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponseContext {
    pub slot: u64,
}

/// A value wrapped with the slot it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse<T> {
    pub context: RpcResponseContext,
    pub value: T,
}

/// Account as returned with `"encoding": "base64"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiAccount {
    pub lamports: u64,
    /// `[payload, encoding]`.
    pub data: Vec<String>,
    /// Owning program (base-58).
    pub owner: String,
    #[serde(default)]
    pub executable: bool,
    #[serde(default)]
    pub rent_epoch: u64,
    #[serde(default)]
    pub space: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// `getVersion` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RpcVersionInfo {
    pub solana_core: String,
    #[serde(default)]
    pub feature_set: Option<u32>,
}

/// Entry of a `getSignatureStatuses` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcSignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    pub err: Option<Value>,
    pub confirmation_status: Option<String>,
}
