//! Microsoft Graph access for the adsync synchroniser.
//!
//! Two pieces: [`TokenAcquirer`] obtains client-credentials bearer tokens and
//! [`DirectoryFetcher`] pages through `/users` with them.

pub mod auth;
pub mod directory;
pub mod error;

use std::{fmt, time::Duration};

use serde::Deserialize;

pub use auth::{AccessToken, TokenAcquirer};
pub use directory::{DirectoryFetcher, Page, extract_skip_token};
pub use error::{Error, Result};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Azure AD application and Graph endpoint settings.
#[derive(Deserialize, Clone)]
pub struct AzureConfig {
  pub tenant_id:      String,
  pub client_id:      String,
  pub client_secret:  String,
  #[serde(default = "default_authority_host")]
  pub authority_host: String,
  #[serde(default = "default_graph_host")]
  pub graph_host:     String,
  #[serde(default = "default_api_version")]
  pub api_version:    String,
  /// OAuth2 scope requested for every token.
  #[serde(default = "default_scope")]
  pub scope:          String,
  /// Sent as `$top`; Graph's own default applies when unset.
  #[serde(default)]
  pub page_size:      Option<u32>,
  /// Pages fetched before an empty cursor ends the listing.
  #[serde(default = "default_min_pages")]
  pub min_pages:      u32,
  #[serde(default = "default_max_pages")]
  pub max_pages:      u32,
  /// Per-request timeout. Requests never time out when unset.
  #[serde(default)]
  pub timeout_secs:   Option<u64>,
}

fn default_authority_host() -> String { "https://login.microsoftonline.com".into() }
fn default_graph_host() -> String { "https://graph.microsoft.com".into() }
fn default_api_version() -> String { "v1.0".into() }
fn default_scope() -> String { auth::DEFAULT_SCOPE.into() }
fn default_min_pages() -> u32 { 2 }
fn default_max_pages() -> u32 { 10_000 }

impl AzureConfig {
  /// Settings for `tenant_id` with every optional field at its default.
  pub fn new(
    tenant_id: impl Into<String>,
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
  ) -> Self {
    Self {
      tenant_id:      tenant_id.into(),
      client_id:      client_id.into(),
      client_secret:  client_secret.into(),
      authority_host: default_authority_host(),
      graph_host:     default_graph_host(),
      api_version:    default_api_version(),
      scope:          default_scope(),
      page_size:      None,
      min_pages:      default_min_pages(),
      max_pages:      default_max_pages(),
      timeout_secs:   None,
    }
  }

  /// Build the HTTP client shared by the token and directory requests.
  pub fn http_client(&self) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = self.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
  }
}

impl fmt::Debug for AzureConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AzureConfig")
      .field("tenant_id", &self.tenant_id)
      .field("client_id", &self.client_id)
      .field("client_secret", &"<redacted>")
      .field("authority_host", &self.authority_host)
      .field("graph_host", &self.graph_host)
      .field("api_version", &self.api_version)
      .field("scope", &self.scope)
      .field("page_size", &self.page_size)
      .field("min_pages", &self.min_pages)
      .field("max_pages", &self.max_pages)
      .field("timeout_secs", &self.timeout_secs)
      .finish()
  }
}
