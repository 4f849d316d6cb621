//! HTTP JSON-RPC implementation of [`LedgerClient`].
//!
//! Wraps a blocking `reqwest::Client` with the ledger node's base URL and
//! provides typed methods for each RPC action. Requests carry an `action`
//! field plus action-specific parameters; responses carry either a `result`
//! object or an `error` string.

use quorum_types::LedgerAddress;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::client::{AccountState, Fee, LedgerClient, SignedPayload, SignerEntry};
use crate::error::{LedgerError, LedgerTxHash};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpLedgerClient {
    http: reqwest::blocking::Client,
    node_url: String,
}

impl HttpLedgerClient {
    /// Create a client targeting the given base URL (e.g. `http://127.0.0.1:7076`).
    pub fn new(node_url: impl Into<String>) -> Result<Self, LedgerError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            node_url: node_url.into(),
        })
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    /// Send a JSON-RPC request and return the `result` field.
    fn rpc_call(
        &self,
        action: &str,
        params: serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<serde_json::Value, LedgerError> {
        let mut body = params;
        body.as_object_mut()
            .ok_or_else(|| LedgerError::InvalidResponse("params must be a JSON object".into()))?
            .insert("action".to_string(), serde_json::json!(action));

        debug!(action, "ledger rpc call");

        let mut request = self.http.post(&self.node_url).json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                LedgerError::Timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            } else {
                LedgerError::Transport(format!("request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "ledger returned HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| LedgerError::InvalidResponse(format!("invalid JSON response: {e}")))?;

        if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
            return Err(LedgerError::Rejected(err.to_string()));
        }

        Ok(json.get("result").cloned().unwrap_or(json))
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct FeeResult {
    base_fee: u64,
}

impl LedgerClient for HttpLedgerClient {
    fn submit(
        &self,
        payload: &SignedPayload,
        timeout: Duration,
    ) -> Result<LedgerTxHash, LedgerError> {
        let result = self.rpc_call(
            "submit",
            serde_json::json!({ "transaction": payload }),
            Some(timeout),
        )?;

        let resp: SubmitResult = serde_json::from_value(result)
            .map_err(|e| LedgerError::InvalidResponse(format!("invalid submit response: {e}")))?;
        Ok(LedgerTxHash::new(resp.hash))
    }

    fn load_account_state(&self, address: &LedgerAddress) -> Result<AccountState, LedgerError> {
        let result = self.rpc_call(
            "account_state",
            serde_json::json!({ "account": address.as_str() }),
            None,
        )?;

        serde_json::from_value(result).map_err(|e| {
            LedgerError::InvalidResponse(format!("invalid account_state response: {e}"))
        })
    }

    fn fetch_base_fee(&self) -> Result<Fee, LedgerError> {
        let result = self.rpc_call("base_fee", serde_json::json!({}), None)?;

        let resp: FeeResult = serde_json::from_value(result)
            .map_err(|e| LedgerError::InvalidResponse(format!("invalid base_fee response: {e}")))?;
        Ok(Fee(resp.base_fee))
    }

    fn update_signer_list(
        &self,
        address: &LedgerAddress,
        signers: &[SignerEntry],
    ) -> Result<(), LedgerError> {
        self.rpc_call(
            "update_signers",
            serde_json::json!({ "account": address.as_str(), "signers": signers }),
            None,
        )?;
        Ok(())
    }

    fn activate_account(&self, address: &LedgerAddress) -> Result<(), LedgerError> {
        self.rpc_call(
            "activate_account",
            serde_json::json!({ "account": address.as_str() }),
            None,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_records_node_url() {
        let client = HttpLedgerClient::new("http://127.0.0.1:7076").unwrap();
        assert_eq!(client.node_url(), "http://127.0.0.1:7076");
    }

    #[test]
    fn unreachable_node_is_transport_error() {
        // Reserved TEST-NET-1 address; connect fails fast with no route.
        let client = HttpLedgerClient::new("http://192.0.2.1:1").unwrap();
        let result = client.fetch_base_fee();
        assert!(matches!(
            result,
            Err(LedgerError::Transport(_) | LedgerError::Timeout(_))
        ));
    }
}
