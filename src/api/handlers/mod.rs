pub mod access;
pub mod cookie;
pub mod filter;
pub mod health;

use crate::gate::{GateError, ProtectionGate};
use tracing::error;

/// Shared handler state, injected with `Extension<Arc<GateState>>`.
#[derive(Clone, Debug)]
pub struct GateState {
    gate: ProtectionGate,
    cookie_secure: bool,
}

impl GateState {
    #[must_use]
    pub fn new(gate: ProtectionGate, cookie_secure: bool) -> Self {
        Self {
            gate,
            cookie_secure,
        }
    }

    #[must_use]
    pub fn gate(&self) -> &ProtectionGate {
        &self.gate
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    /// Run store-backed gate work on the blocking pool.
    ///
    /// # Errors
    /// Returns the work's error, or [`GateError::Store`] if the task panicked.
    pub async fn blocking<T, F>(&self, work: F) -> Result<T, GateError>
    where
        F: FnOnce(&ProtectionGate) -> Result<T, GateError> + Send + 'static,
        T: Send + 'static,
    {
        let gate = self.gate.clone();
        match tokio::task::spawn_blocking(move || work(&gate)).await {
            Ok(result) => result,
            Err(err) => {
                error!("Gate task failed: {err}");
                Err(GateError::Store("gate task failed".to_string()))
            }
        }
    }
}
