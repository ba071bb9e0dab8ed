//! Destination-wiki client.
//!
//! The wiki requires an authenticated session: fetch a login token, log in
//! with it, then fetch the CSRF token used by every subsequent edit. The
//! session cookie jar and the connection pool are owned by the
//! [`WikiPublisher`] value, so they are released on every exit path when it
//! drops — including a publish phase that fails partway.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use biograph_shared::{BiographError, Result};

/// User-Agent string for wiki requests.
const USER_AGENT: &str = concat!("biograph/", env!("CARGO_PKG_VERSION"));

/// Request timeout for wiki calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How an edit treats an existing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if the page already exists.
    CreateOnly,
    /// Replace the page body unconditionally.
    Overwrite,
}

/// Bot credentials for the login handshake.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Authenticated session against the destination wiki.
#[derive(Debug)]
pub struct WikiPublisher {
    client: Client,
    endpoint: Url,
    csrf_token: String,
}

impl WikiPublisher {
    /// Open a session: login-token fetch, login, CSRF-token fetch.
    ///
    /// A rejected login is an [`BiographError::Auth`]; transport failures
    /// are [`BiographError::Network`].
    #[instrument(skip(credentials))]
    pub async fn connect(endpoint: &str, credentials: &Credentials) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            BiographError::config(format!("invalid publisher endpoint {endpoint:?}: {e}"))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BiographError::Network(format!("failed to build HTTP client: {e}")))?;

        let login_token = {
            let result = post(
                &client,
                &endpoint,
                &[("action", "query"), ("meta", "tokens"), ("type", "login")],
            )
            .await?;
            token_from(&result, "logintoken")?
        };

        let login = post(
            &client,
            &endpoint,
            &[
                ("action", "login"),
                ("lgname", &credentials.username),
                ("lgpassword", &credentials.password),
                ("lgtoken", &login_token),
            ],
        )
        .await?;

        match login["login"]["result"].as_str() {
            Some("Success") => {}
            Some(other) => {
                let reason = login["login"]["reason"]
                    .as_str()
                    .unwrap_or(other)
                    .to_string();
                return Err(BiographError::Auth(format!("login rejected: {reason}")));
            }
            None => {
                return Err(BiographError::Auth("login response missing result".into()));
            }
        }

        let csrf_token = {
            let result = post(
                &client,
                &endpoint,
                &[("action", "query"), ("meta", "tokens"), ("type", "csrf")],
            )
            .await?;
            token_from(&result, "csrftoken")?
        };

        info!(user = %credentials.username, "wiki session established");

        Ok(Self {
            client,
            endpoint,
            csrf_token,
        })
    }

    /// Write one page. An edit the wiki rejects is a service failure,
    /// distinct from a transport failure.
    #[instrument(skip(self, text))]
    pub async fn write(&self, title: &str, text: &str, mode: WriteMode) -> Result<()> {
        let mut params = vec![
            ("action", "edit"),
            ("bot", "1"),
            ("title", title),
            ("text", text),
            ("token", self.csrf_token.as_str()),
        ];
        if mode == WriteMode::CreateOnly {
            params.push(("createonly", "1"));
        }

        let result = post(&self.client, &self.endpoint, &params).await?;

        match result["edit"]["result"].as_str() {
            Some("Success") => {
                debug!(title, "page written");
                Ok(())
            }
            other => Err(BiographError::Service(format!(
                "edit of {title:?} not accepted: {}",
                other.unwrap_or("no edit result")
            ))),
        }
    }
}

/// POST one API call and parse its JSON body.
///
/// Transport problems are `Network`; an HTTP error status, an unparsable
/// body, or a top-level API `error` object are `Service`.
async fn post(client: &Client, endpoint: &Url, params: &[(&str, &str)]) -> Result<serde_json::Value> {
    let mut form: Vec<(&str, &str)> = params.to_vec();
    form.push(("format", "json"));
    form.push(("formatversion", "2"));

    let response = client
        .post(endpoint.clone())
        .form(&form)
        .send()
        .await
        .map_err(|e| BiographError::Network(format!("{endpoint}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BiographError::Service(format!("{endpoint}: HTTP {status}")));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| BiographError::Service(format!("{endpoint}: malformed response: {e}")))?;

    if let Some(info) = body["error"]["info"].as_str() {
        return Err(BiographError::Service(info.to_string()));
    }

    Ok(body)
}

/// Pull a named token out of a `meta=tokens` response.
fn token_from(body: &serde_json::Value, name: &str) -> Result<String> {
    body["query"]["tokens"][name]
        .as_str()
        .map(String::from)
        .ok_or_else(|| BiographError::Service(format!("token response missing {name}")))
}
