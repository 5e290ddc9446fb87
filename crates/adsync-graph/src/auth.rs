//! OAuth2 client-credentials token acquisition.
//!
//! No caching and no retry: every call is one POST to the token endpoint.

use std::fmt;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{AzureConfig, Error, Result};

pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const CLIENT_CREDENTIALS: &str = "client_credentials";

#[derive(Debug, Deserialize)]
struct TokenResponse {
  #[serde(default)]
  access_token: Option<String>,
  #[serde(default)]
  expires_in:   Option<i64>,
}

/// A bearer token. `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
  pub fn secret(&self) -> &str { &self.0 }
}

impl fmt::Debug for AccessToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("AccessToken(<redacted>)") }
}

/// Requests tokens from `{authority_host}/{tenant}/oauth2/v2.0/token`.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct TokenAcquirer {
  http:          reqwest::Client,
  token_url:     String,
  client_id:     String,
  client_secret: String,
}

impl TokenAcquirer {
  pub fn new(http: reqwest::Client, config: &AzureConfig) -> Self {
    let token_url = format!(
      "{}/{}/oauth2/v2.0/token",
      config.authority_host.trim_end_matches('/'),
      config.tenant_id
    );
    Self {
      http,
      token_url,
      client_id: config.client_id.clone(),
      client_secret: config.client_secret.clone(),
    }
  }

  /// POST the client id and secret with `scope` and `grant_type` and return
  /// the `access_token` from the response.
  #[instrument(skip(self), fields(url = %self.token_url))]
  pub async fn acquire(&self, scope: &str, grant_type: &str) -> Result<AccessToken> {
    let params = [
      ("client_id", self.client_id.as_str()),
      ("client_secret", self.client_secret.as_str()),
      ("scope", scope),
      ("grant_type", grant_type),
    ];

    let response = self.http.post(&self.token_url).form(&params).send().await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await?;
      return Err(Error::TokenRequest { status: status.as_u16(), body });
    }

    let token: TokenResponse = response.json().await?;
    let access_token = token
      .access_token
      .filter(|t| !t.is_empty())
      .ok_or(Error::MissingAccessToken)?;

    debug!(expires_in = ?token.expires_in, "acquired access token");
    Ok(AccessToken(access_token))
  }
}
