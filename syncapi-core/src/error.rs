//! Error types shared by the session, transport and endpoints

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ApiVariant, ConfigError};

/// The daemon answered, but not in the shape acquisition expects
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Response carried no Set-Cookie header")]
    MissingSetCookie,

    #[error("No GUID cookie in Set-Cookie header")]
    MissingGuid,

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response has no data.token field")]
    MissingToken,

    #[error("Token marker not found in HTML body")]
    TokenMarkerNotFound,

    #[error("Daemon returned an empty token")]
    EmptyToken,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Protocol parse error: {0}")]
    Parse(#[from] ParseError),

    /// The daemon answered with its invalid-request sentinel
    #[error("Daemon rejected the session token")]
    InvalidSession,

    /// Re-acquisition after a rejected call failed
    #[error("Re-authentication failed: {0}")]
    Unrecoverable(#[source] Box<ClientError>),

    /// The instance's initial acquisition failed; reconstruct the client
    #[error("Session unavailable: {0}")]
    SessionFailed(#[source] Arc<ClientError>),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// The operation belongs to the other API variant
    #[error("Operation needs the {required:?} API, session uses {actual:?}")]
    UnsupportedVariant {
        required: ApiVariant,
        actual: ApiVariant,
    },

    #[error("No tokio runtime to run session acquisition on")]
    NoRuntime,

    #[error("Session was dropped before acquisition finished")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
