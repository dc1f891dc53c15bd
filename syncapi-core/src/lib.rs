//! syncapi-core: Client library for the sync daemon's local HTTP control API
//!
//! This crate provides:
//! - Session acquisition (identity cookie + token) for the `/api/v2` and legacy `/gui` APIs
//! - Transparent one-shot re-authentication when the daemon rejects a token
//! - Folder, secret and event endpoints on top of the authenticated call
//! - TOML configuration with environment overrides

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod params;
pub mod parse;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::SyncClient;
pub use config::{ApiVariant, Config, DaemonConfig};
pub use endpoints::{AddFolderParams, EventsParams, SecretParams};
pub use error::{ClientError, ParseError};
pub use params::Params;
pub use session::{ApiRequest, Session, SessionState};

/// Default port of the daemon's control API
pub const DEFAULT_PORT: u16 = 8888;

/// Default daemon host
pub const DEFAULT_HOST: &str = "localhost";
