//! Nullable ledger client for deterministic testing.
//!
//! Returns programmable values, records every call, and never touches the
//! network. Swap it in wherever a `LedgerClient` is expected.

use quorum_types::LedgerAddress;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::client::{AccountState, Fee, LedgerClient, SignedPayload, SignerEntry};
use crate::error::{LedgerError, LedgerTxHash};

/// What the next `submit` calls should do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitMode {
    /// Accept and return a hash derived from the submission count.
    Succeed,
    /// Reject with the given reason.
    Reject(String),
    /// Simulate an unbounded-latency call hitting the caller's timeout.
    Timeout,
    /// Fail at the transport layer before reaching the ledger.
    Unavailable(String),
}

#[derive(Default)]
struct NullState {
    submissions: Vec<SignedPayload>,
    accounts: HashMap<LedgerAddress, AccountState>,
    signer_updates: Vec<(LedgerAddress, Vec<SignerEntry>)>,
    activations: Vec<LedgerAddress>,
    base_fee: u64,
    fail_signer_updates: bool,
    fail_activations: bool,
}

pub struct NullLedgerClient {
    submit_mode: Mutex<SubmitMode>,
    state: Mutex<NullState>,
}

impl NullLedgerClient {
    pub fn new() -> Self {
        Self {
            submit_mode: Mutex::new(SubmitMode::Succeed),
            state: Mutex::new(NullState {
                base_fee: 100,
                ..NullState::default()
            }),
        }
    }

    pub fn set_submit_mode(&self, mode: SubmitMode) {
        *self.submit_mode.lock().unwrap() = mode;
    }

    pub fn set_account_state(&self, state: AccountState) {
        let mut inner = self.state.lock().unwrap();
        inner.accounts.insert(state.address.clone(), state);
    }

    pub fn set_base_fee(&self, fee: u64) {
        self.state.lock().unwrap().base_fee = fee;
    }

    pub fn fail_signer_updates(&self, fail: bool) {
        self.state.lock().unwrap().fail_signer_updates = fail;
    }

    pub fn fail_activations(&self, fail: bool) {
        self.state.lock().unwrap().fail_activations = fail;
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submissions.len()
    }

    pub fn last_submission(&self) -> Option<SignedPayload> {
        self.state.lock().unwrap().submissions.last().cloned()
    }

    pub fn signer_update_count(&self) -> usize {
        self.state.lock().unwrap().signer_updates.len()
    }

    pub fn last_signer_update(&self) -> Option<(LedgerAddress, Vec<SignerEntry>)> {
        self.state.lock().unwrap().signer_updates.last().cloned()
    }

    pub fn activations(&self) -> Vec<LedgerAddress> {
        self.state.lock().unwrap().activations.clone()
    }
}

impl Default for NullLedgerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerClient for NullLedgerClient {
    fn submit(
        &self,
        payload: &SignedPayload,
        timeout: Duration,
    ) -> Result<LedgerTxHash, LedgerError> {
        let mode = self.submit_mode.lock().unwrap().clone();
        let mut state = self.state.lock().unwrap();
        state.submissions.push(payload.clone());
        let count = state.submissions.len();
        drop(state);

        match mode {
            SubmitMode::Succeed => Ok(LedgerTxHash::new(format!("null-hash-{count:04}"))),
            SubmitMode::Reject(reason) => Err(LedgerError::Rejected(reason)),
            SubmitMode::Timeout => Err(LedgerError::Timeout(timeout)),
            SubmitMode::Unavailable(reason) => Err(LedgerError::Transport(reason)),
        }
    }

    fn load_account_state(&self, address: &LedgerAddress) -> Result<AccountState, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.accounts.get(address).cloned().unwrap_or(AccountState {
            address: address.clone(),
            sequence: 0,
            balances: Vec::new(),
        }))
    }

    fn fetch_base_fee(&self) -> Result<Fee, LedgerError> {
        Ok(Fee(self.state.lock().unwrap().base_fee))
    }

    fn update_signer_list(
        &self,
        address: &LedgerAddress,
        signers: &[SignerEntry],
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_signer_updates {
            return Err(LedgerError::Transport("signer update unavailable".into()));
        }
        state
            .signer_updates
            .push((address.clone(), signers.to_vec()));
        Ok(())
    }

    fn activate_account(&self, address: &LedgerAddress) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_activations {
            return Err(LedgerError::Transport("activation unavailable".into()));
        }
        state.activations.push(address.clone());
        Ok(())
    }
}
