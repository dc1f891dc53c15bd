//! Folder, secret and event endpoints of the `/api/v2` API
//!
//! Each method merges the caller's parameters with the current token and
//! returns the daemon's body verbatim. All of them go through
//! [`Session::execute_authenticated`](crate::session::Session::execute_authenticated),
//! so a rejected token is refreshed and the call replayed once.

use serde_json::Value;

use crate::client::SyncClient;
use crate::error::ClientError;
use crate::params::Params;
use crate::protocol::{V2_EVENTS_PATH, V2_FOLDERS_PATH, V2_SECRET_PATH};
use crate::session::ApiRequest;

/// Parameters for adding a folder
#[derive(Debug, Clone, Default)]
pub struct AddFolderParams {
    /// Local path of the folder
    pub path: String,
    /// Existing secret to join; the daemon generates one when absent
    pub secret: Option<String>,
    /// Add even if the path is not empty
    pub force: bool,
}

impl From<AddFolderParams> for Params {
    fn from(p: AddFolderParams) -> Self {
        Params::new()
            .with("path", p.path)
            .with_opt("secret", p.secret)
            .with_opt("force", p.force.then_some(1))
    }
}

/// Parameters for polling events
#[derive(Debug, Clone, Default)]
pub struct EventsParams {
    /// Return only events after this id
    pub last_id: Option<u64>,
}

impl From<EventsParams> for Params {
    fn from(p: EventsParams) -> Self {
        Params::new().with_opt("id", p.last_id)
    }
}

/// Parameters for generating a secret
#[derive(Debug, Clone, Default)]
pub struct SecretParams {
    /// Derive the secrets of this one instead of generating a new pair
    pub secret: Option<String>,
    /// Request an encrypted secret
    pub encrypted: bool,
}

impl From<SecretParams> for Params {
    fn from(p: SecretParams) -> Self {
        Params::new()
            .with_opt("secret", p.secret)
            .with_opt("type", p.encrypted.then_some("encryption"))
    }
}

impl SyncClient {
    /// `GET /api/v2/folders`
    pub async fn list_folders(&self, params: impl Into<Params>) -> Result<Value, ClientError> {
        let req = ApiRequest::get(V2_FOLDERS_PATH, params.into());
        self.session().execute_authenticated(&req).await
    }

    /// `POST /api/v2/folders`
    pub async fn add_folder(&self, params: impl Into<Params>) -> Result<Value, ClientError> {
        let req = ApiRequest::post(V2_FOLDERS_PATH, params.into());
        self.session().execute_authenticated(&req).await
    }

    /// `POST /api/v2/folders/{id}/link`
    pub async fn folder_link(
        &self,
        folder_id: &str,
        params: impl Into<Params>,
    ) -> Result<Value, ClientError> {
        let req = ApiRequest::post(V2_FOLDERS_PATH, params.into())
            .segment(folder_id)
            .segment("link");
        self.session().execute_authenticated(&req).await
    }

    /// `DELETE /api/v2/folders/{id}`
    pub async fn remove_folder(
        &self,
        folder_id: &str,
        params: impl Into<Params>,
    ) -> Result<Value, ClientError> {
        let req = ApiRequest::delete(V2_FOLDERS_PATH, params.into()).segment(folder_id);
        self.session().execute_authenticated(&req).await
    }

    /// `POST /api/v2/secret`
    pub async fn generate_secret(&self, params: impl Into<Params>) -> Result<Value, ClientError> {
        let req = ApiRequest::post(V2_SECRET_PATH, params.into());
        self.session().execute_authenticated(&req).await
    }

    /// `GET /api/v2/events`
    pub async fn get_events(&self, params: impl Into<Params>) -> Result<Value, ClientError> {
        let req = ApiRequest::get(V2_EVENTS_PATH, params.into());
        self.session().execute_authenticated(&req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_folder_params() {
        let params: Params = AddFolderParams {
            path: "/data/photos".to_string(),
            secret: None,
            force: true,
        }
        .into();

        assert_eq!(params.get("path"), Some("/data/photos"));
        assert_eq!(params.get("force"), Some("1"));
        assert!(params.get("secret").is_none());
    }

    #[test]
    fn test_optional_params_omitted() {
        let events: Params = EventsParams::default().into();
        assert!(events.is_empty());

        let secret: Params = SecretParams {
            secret: Some("AB12".to_string()),
            encrypted: true,
        }
        .into();
        assert_eq!(secret.get("secret"), Some("AB12"));
        assert_eq!(secret.get("type"), Some("encryption"));
    }
}
