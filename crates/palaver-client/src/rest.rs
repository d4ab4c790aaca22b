//! Async REST client for the Palaver chat server.

use palaver_common::config::ApiConfig;
use palaver_common::models::{ChatMessage, ProfileUpdate, UserId, UserSummary};
use palaver_common::validation::validate_request;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Async Palaver REST client.
///
/// ```rust,no_run
/// use palaver_client::rest::RestClient;
///
/// #[tokio::main]
/// async fn main() -> palaver_client::Result<()> {
///     let cfg = palaver_common::config::init().map_err(palaver_common::error::PalaverError::from)?;
///     let rest = RestClient::new(&cfg.api)?;
///     for entry in rest.users().await? {
///         println!("{} ({} unread)", entry.user.username, entry.unread);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .default_headers({
                let mut h = reqwest::header::HeaderMap::new();
                if let Some(cookie) = &cfg.session_cookie {
                    h.insert(
                        reqwest::header::COOKIE,
                        reqwest::header::HeaderValue::from_str(&format!("session={cookie}"))
                            .map_err(|e| ClientError::Common(anyhow::anyhow!(e).into()))?,
                    );
                }
                h
            })
            .timeout(cfg.timeout())
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
        })
    }

    // ── Internal ──────────────────────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T> {
        let url = self.url(path);
        let resp = self.client.request(method, &url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.json::<Value>().await.ok();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(status, body.as_ref()),
            });
        }
        Ok(resp.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path).await
    }

    // ── Roster & history ──────────────────────────────────────────────────────

    /// Everyone except the signed-in user, with unread counts.
    pub async fn users(&self) -> Result<Vec<UserSummary>> {
        self.get("/api/users").await
    }

    /// Full conversation with `other`, oldest first.
    ///
    /// The server flags `other`'s messages to us as read while serving this.
    pub async fn messages(&self, other: UserId) -> Result<Vec<ChatMessage>> {
        self.get(&format!("/api/messages/{other}")).await
    }

    // ── Profile ───────────────────────────────────────────────────────────────

    /// Update the signed-in user's "about" line.
    ///
    /// The endpoint is a form post answered by a redirect; landing on the
    /// login page means the session was not accepted.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<()> {
        validate_request(update)?;
        let resp = self
            .client
            .post(self.url("/edit_profile"))
            .form(update)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(status, None),
            });
        }
        if landed_on_login(resp.url()) {
            return Err(ClientError::Api {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: "Unauthorized".into(),
            });
        }
        tracing::info!("Profile updated");
        Ok(())
    }
}

/// Prefer the server's `error` field, fall back to the status line.
fn error_message(status: StatusCode, body: Option<&Value>) -> String {
    body.and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
        .unwrap_or_else(|| status.to_string())
}

fn landed_on_login(url: &Url) -> bool {
    url.path().trim_end_matches('/').ends_with("/login")
}
