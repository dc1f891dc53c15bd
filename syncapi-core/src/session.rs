//! Session manager: credential acquisition and authenticated calls
//!
//! A session owns the (identity, token) pair and the cookie jar the daemon
//! pairs with it. State machine:
//!
//! ```text
//! Uninitialized -> Acquiring -> Ready <-> Reacquiring
//!                      |                     |
//!                      +------> Failed <-----+
//! ```
//!
//! Acquisitions are serialized by a single lock, so at most one is in flight.
//! The first acquisition resolves the readiness signal exactly once; later
//! ones only update the credentials.

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::{ApiVariant, DaemonConfig};
use crate::error::{ClientError, ParseError};
use crate::params::{with_auth, AuthFields, Params};
use crate::parse;
use crate::protocol::{self, decode_body, is_invalid_session};
use crate::transport::{store_cookies, Transport};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Acquiring,
    Ready,
    Reacquiring,
    Failed,
}

/// One logical call: verb, path segments under the daemon root, and the
/// caller's parameters (auth fields are merged in at send time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: Vec<String>,
    pub params: Params,
}

impl ApiRequest {
    pub fn new(method: Method, path: &[&str], params: Params) -> Self {
        Self {
            method,
            path: path.iter().map(|s| s.to_string()).collect(),
            params,
        }
    }

    pub fn get(path: &[&str], params: Params) -> Self {
        Self::new(Method::GET, path, params)
    }

    pub fn post(path: &[&str], params: Params) -> Self {
        Self::new(Method::POST, path, params)
    }

    pub fn delete(path: &[&str], params: Params) -> Self {
        Self::new(Method::DELETE, path, params)
    }

    /// Append a path segment (escaped when the URL is built)
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.path.push(segment.into());
        self
    }
}

/// Outcome of the first acquisition, observed by every `ready()` waiter
#[derive(Debug, Clone)]
enum Readiness {
    Pending,
    Ready,
    Failed(Arc<ClientError>),
}

/// Per-call retry position; a call gets one replay at most
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Replay,
}

struct AuthState {
    state: SessionState,
    token: Option<String>,
    identity: Option<String>,
    jar: Arc<Jar>,
    /// Bumped on every successful acquisition
    generation: u64,
}

/// Credentials captured for one request
struct Snapshot {
    token: String,
    identity: Option<String>,
    jar: Arc<Jar>,
    generation: u64,
}

/// Result of a successful acquisition, committed atomically
struct Acquired {
    token: String,
    identity: Option<String>,
    /// Replacement jar (v2 only)
    jar: Option<Arc<Jar>>,
}

pub struct Session {
    transport: Transport,
    variant: ApiVariant,
    preset_identity: Option<String>,
    preset_token: Option<String>,
    auth: RwLock<AuthState>,
    acquire_lock: Mutex<()>,
    readiness: watch::Sender<Readiness>,
}

impl Session {
    /// Create an unacquired session; call [`Session::acquire`] to make it usable
    pub fn new(config: &DaemonConfig) -> Result<Self, ClientError> {
        let transport = Transport::new(config)?;
        let (readiness, _) = watch::channel(Readiness::Pending);

        Ok(Self {
            transport,
            variant: config.api,
            preset_identity: config.identity.clone(),
            preset_token: config.token.clone(),
            auth: RwLock::new(AuthState {
                state: SessionState::Uninitialized,
                token: None,
                identity: None,
                jar: Arc::new(Jar::default()),
                generation: 0,
            }),
            acquire_lock: Mutex::new(()),
            readiness,
        })
    }

    pub async fn state(&self) -> SessionState {
        self.auth.read().await.state
    }

    pub async fn token(&self) -> Option<String> {
        self.auth.read().await.token.clone()
    }

    pub async fn identity(&self) -> Option<String> {
        self.auth.read().await.identity.clone()
    }

    /// Wait for the first acquisition to finish
    pub async fn ready(&self) -> Result<(), ClientError> {
        let mut rx = self.readiness.subscribe();
        let outcome = rx
            .wait_for(|r| !matches!(r, Readiness::Pending))
            .await
            .map_err(|_| ClientError::SessionClosed)?
            .clone();

        match outcome {
            Readiness::Failed(err) => Err(ClientError::SessionFailed(err)),
            _ => Ok(()),
        }
    }

    /// Acquire a fresh identity/token pair, replacing the current one.
    ///
    /// Waits for any acquisition already in flight, then runs its own.
    pub async fn acquire(&self) -> Result<(), ClientError> {
        let _guard = self.acquire_lock.lock().await;
        self.acquire_locked().await
    }

    /// Re-acquire after a call made with credentials of `seen_generation` was
    /// rejected. Skips the round trip if another caller already replaced them.
    async fn reacquire(&self, seen_generation: u64) -> Result<(), ClientError> {
        let _guard = self.acquire_lock.lock().await;

        if self.auth.read().await.generation != seen_generation {
            debug!("credentials already refreshed by a concurrent call");
            return Ok(());
        }

        self.acquire_locked().await
    }

    async fn acquire_locked(&self) -> Result<(), ClientError> {
        {
            let mut auth = self.auth.write().await;
            auth.state = match auth.state {
                SessionState::Ready | SessionState::Reacquiring => SessionState::Reacquiring,
                _ => SessionState::Acquiring,
            };
        }

        let result = match self.variant {
            ApiVariant::V2 => self.fetch_v2().await,
            ApiVariant::Legacy => self.fetch_legacy().await,
        };

        match result {
            Ok(acquired) => {
                {
                    let mut auth = self.auth.write().await;
                    auth.token = Some(acquired.token);
                    auth.identity = acquired.identity;
                    if let Some(jar) = acquired.jar {
                        auth.jar = jar;
                    }
                    auth.generation += 1;
                    auth.state = SessionState::Ready;
                    info!(variant = ?self.variant, generation = auth.generation, "session acquired");
                }
                self.resolve(Readiness::Ready);
                Ok(())
            }
            Err(err) => {
                self.auth.write().await.state = SessionState::Failed;
                error!(variant = ?self.variant, error = %err, "session acquisition failed");

                if self.is_pending() {
                    let err = Arc::new(err);
                    self.resolve(Readiness::Failed(Arc::clone(&err)));
                    Err(ClientError::SessionFailed(err))
                } else {
                    Err(err)
                }
            }
        }
    }

    /// `GET /api/v2/token`: JSON token plus the cookie it is paired with
    async fn fetch_v2(&self) -> Result<Acquired, ClientError> {
        let url = self.transport.url(protocol::V2_TOKEN_PATH, &Params::new())?;
        let resp = self.transport.send(Method::GET, url, None).await?;

        if resp.set_cookies.is_empty() {
            return Err(ParseError::MissingSetCookie.into());
        }
        let token = parse::token_from_json(&resp.body)?;
        let identity = parse::guid_from_set_cookie(resp.set_cookies.iter().map(String::as_str)).ok();

        let jar = Jar::default();
        store_cookies(&jar, &resp.set_cookies, self.transport.base_url());

        Ok(Acquired {
            token,
            identity,
            jar: Some(Arc::new(jar)),
        })
    }

    /// Legacy: GUID cookie from the index page, then the token page.
    /// Preset values only stand in for the first acquisition; once they have
    /// been used, re-acquisition fetches fresh ones.
    async fn fetch_legacy(&self) -> Result<Acquired, ClientError> {
        let (jar, first) = {
            let auth = self.auth.read().await;
            (Arc::clone(&auth.jar), auth.generation == 0)
        };
        let preset_identity = self.preset_identity.as_ref().filter(|_| first);
        let preset_token = self.preset_token.as_ref().filter(|_| first);

        let identity = match preset_identity {
            Some(guid) => {
                store_cookies(&jar, &[format!("GUID={guid}")], self.transport.base_url());
                guid.clone()
            }
            None => {
                let url = self.transport.url(protocol::LEGACY_INDEX_PATH, &Params::new())?;
                let resp = self.transport.send(Method::POST, url, Some(&jar)).await?;
                parse::guid_from_set_cookie(resp.set_cookies.iter().map(String::as_str))?
            }
        };

        let token = match preset_token {
            Some(token) => token.clone(),
            None => {
                let mut url = self.transport.url(protocol::LEGACY_TOKEN_PATH, &Params::new())?;
                url.set_query(Some(&timestamp_millis().to_string()));
                let resp = self.transport.send(Method::POST, url, Some(&jar)).await?;
                parse::token_from_html(&resp.body)?
            }
        };

        Ok(Acquired {
            token,
            identity: Some(identity),
            jar: None,
        })
    }

    /// Issue `request` with the current token. On a transport error or the
    /// invalid-request sentinel, re-acquire once and replay; a second failure
    /// is returned as-is.
    ///
    /// Only the v2 API pairs calls with a replaceable token; a legacy session
    /// gets [`ClientError::UnsupportedVariant`].
    pub async fn execute_authenticated(&self, request: &ApiRequest) -> Result<Value, ClientError> {
        if self.variant != ApiVariant::V2 {
            return Err(ClientError::UnsupportedVariant {
                required: ApiVariant::V2,
                actual: self.variant,
            });
        }

        let mut attempt = Attempt::First;

        loop {
            let snap = self.snapshot().await?;
            let params = with_auth(
                &request.params,
                &AuthFields {
                    token: &snap.token,
                    ..Default::default()
                },
            );
            let url = self.transport.url(&request.path, &params)?;

            let failure = match self
                .transport
                .send(request.method.clone(), url, Some(&snap.jar))
                .await
            {
                Ok(resp) if !is_invalid_session(&resp.body) => return Ok(decode_body(&resp.body)),
                Ok(_) => ClientError::InvalidSession,
                Err(e) => ClientError::Transport(e),
            };

            match attempt {
                Attempt::First => {
                    warn!(
                        method = %request.method,
                        path = %request.path.join("/"),
                        error = %failure,
                        "call rejected, re-acquiring session"
                    );
                    self.reacquire(snap.generation)
                        .await
                        .map_err(|e| ClientError::Unrecoverable(Box::new(e)))?;
                    attempt = Attempt::Replay;
                }
                Attempt::Replay => return Err(failure),
            }
        }
    }

    /// Legacy `GET /gui/?token&guid&action&t`. Single-shot: no re-acquisition.
    pub async fn call(&self, action: &str, params: &Params) -> Result<Value, ClientError> {
        let snap = self.snapshot().await?;
        let params = with_auth(
            params,
            &AuthFields {
                token: &snap.token,
                guid: snap.identity.as_deref(),
                action: Some(action),
                timestamp: Some(timestamp_millis()),
            },
        );
        let url = self.transport.url(protocol::LEGACY_ACTION_PATH, &params)?;

        let resp = self.transport.send(Method::GET, url, Some(&snap.jar)).await?;
        Ok(decode_body(&resp.body))
    }

    /// Current credentials, once the first acquisition has succeeded
    async fn snapshot(&self) -> Result<Snapshot, ClientError> {
        self.ready().await?;

        let auth = self.auth.read().await;
        let token = auth.token.clone().ok_or(ClientError::InvalidSession)?;

        Ok(Snapshot {
            token,
            identity: auth.identity.clone(),
            jar: Arc::clone(&auth.jar),
            generation: auth.generation,
        })
    }

    fn is_pending(&self) -> bool {
        matches!(*self.readiness.borrow(), Readiness::Pending)
    }

    /// Settle readiness; no-op once settled
    fn resolve(&self, outcome: Readiness) {
        self.readiness.send_if_modified(|current| {
            if matches!(current, Readiness::Pending) {
                *current = outcome;
                true
            } else {
                false
            }
        });
    }
}

fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
