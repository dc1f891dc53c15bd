//! HTTP transport to the daemon
//!
//! Thin wrapper over `reqwest` that builds URLs under the daemon root,
//! attaches basic auth to every request, and reads cookies from (and stores
//! `Set-Cookie` values into) a caller-supplied jar. The jar is not baked into
//! the `reqwest::Client` so the session can swap it on re-acquisition.

use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::config::DaemonConfig;
use crate::error::ClientError;
use crate::params::Params;

/// Basic auth credentials
#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: Option<String>,
}

/// Response as the session needs it: cookies and raw body
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub set_cookies: Vec<String>,
    pub body: String,
}

/// Daemon HTTP transport
pub struct Transport {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl Transport {
    pub fn new(config: &DaemonConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let credentials = config.username.clone().map(|username| Credentials {
            username,
            password: config.password.clone(),
        });

        Ok(Self {
            client,
            base_url: config.base_url()?,
            credentials,
        })
    }

    /// Daemon root URL; cookies are scoped to it
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/{segments...}?{params}`
    pub fn url<S: AsRef<str>>(&self, segments: &[S], params: &Params) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .clear()
            .extend(segments);

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        Ok(url)
    }

    /// Issue one request. With a jar, its cookies are attached and the
    /// response's `Set-Cookie` values are stored back into it.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        jar: Option<&Jar>,
    ) -> Result<RawResponse, reqwest::Error> {
        debug!(%method, path = url.path(), "daemon request");

        let mut req = self.client.request(method, url.clone());

        if let Some(ref creds) = self.credentials {
            req = req.basic_auth(&creds.username, creds.password.as_ref());
        }

        if let Some(cookie) = jar.and_then(|j| j.cookies(&url)) {
            req = req.header(COOKIE, cookie);
        }

        let resp = req.send().await?;
        let status = resp.status();

        let set_cookies: Vec<String> = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        if let Some(jar) = jar {
            store_cookies(jar, &set_cookies, &self.base_url);
        }

        let body = resp.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "daemon response");

        Ok(RawResponse {
            set_cookies,
            body,
        })
    }
}

/// Store raw `Set-Cookie` values into `jar`, scoped to `base_url`
pub fn store_cookies(jar: &Jar, set_cookies: &[String], base_url: &Url) {
    for cookie in set_cookies {
        jar.add_cookie_str(cookie, base_url);
    }
}
