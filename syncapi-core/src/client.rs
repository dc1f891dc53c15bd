//! Client facade
//!
//! Construction starts acquisition in the background; [`SyncClient::ready`]
//! is the one-shot ready/error notification. Calls issued before readiness
//! wait for it.

use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;

use crate::config::DaemonConfig;
use crate::error::ClientError;
use crate::params::Params;
use crate::session::{Session, SessionState};

/// Daemon API client. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SyncClient {
    session: Arc<Session>,
}

impl SyncClient {
    /// Create a client and start acquiring a session on the current tokio
    /// runtime. Returns before acquisition finishes; fails with
    /// [`ClientError::NoRuntime`] outside a runtime.
    pub fn new(config: &DaemonConfig) -> Result<Self, ClientError> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        let session = Arc::new(Session::new(config)?);

        let background = Arc::clone(&session);
        runtime.spawn(async move {
            // Outcome is published through readiness
            let _ = background.acquire().await;
        });

        Ok(Self { session })
    }

    /// Create a client and wait until it is ready
    pub async fn connect(config: &DaemonConfig) -> Result<Self, ClientError> {
        let client = Self::new(config)?;
        client.ready().await?;
        Ok(client)
    }

    /// Resolves once: `Ok` when the session became usable, the acquisition
    /// error otherwise. A failed client stays failed.
    pub async fn ready(&self) -> Result<(), ClientError> {
        self.session.ready().await
    }

    pub async fn state(&self) -> SessionState {
        self.session.state().await
    }

    pub async fn token(&self) -> Option<String> {
        self.session.token().await
    }

    pub async fn identity(&self) -> Option<String> {
        self.session.identity().await
    }

    /// Replace the current credentials with freshly acquired ones
    pub async fn reauthenticate(&self) -> Result<(), ClientError> {
        self.session.ready().await?;
        self.session.acquire().await
    }

    /// Generic legacy action, e.g. `getdir` with `dir=/home`
    pub async fn call(&self, action: &str, params: impl Into<Params>) -> Result<Value, ClientError> {
        self.session.call(action, &params.into()).await
    }

    /// Daemon version via the legacy `getversion` action
    pub async fn get_version(&self) -> Result<Value, ClientError> {
        self.call("getversion", Params::new()).await
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_outside_runtime_is_an_error() {
        let result = SyncClient::new(&DaemonConfig::default());
        assert!(matches!(result, Err(ClientError::NoRuntime)));
    }
}
