//! Paged listing of directory users.
//!
//! Graph returns users a page at a time; each page but the last carries an
//! `@odata.nextLink` whose `$skiptoken` query parameter is the cursor for the
//! next request. A fresh token is requested for every page.

use adsync_core::directory::{DirectoryUser, SELECT_FIELDS};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::{
  AzureConfig, Error, Result,
  auth::{AccessToken, CLIENT_CREDENTIALS, TokenAcquirer},
};

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UsersResponse {
  #[serde(default)]
  value:     Vec<DirectoryUser>,
  #[serde(rename = "@odata.nextLink")]
  next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ODataError {
  error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
struct ODataErrorBody {
  code:    String,
  message: String,
}

/// One page of the `/users` listing.
#[derive(Debug, Clone, Default)]
pub struct Page {
  pub users:     Vec<DirectoryUser>,
  pub next_link: Option<String>,
}

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Pull the `$skiptoken` cursor out of an `@odata.nextLink`.
///
/// Returns an empty string when there is no link, the link does not parse,
/// or it carries no `$skiptoken`.
pub fn extract_skip_token(next_link: Option<&str>) -> String {
  let Some(link) = next_link else {
    return String::new();
  };

  match Url::parse(link) {
    Ok(url) => url
      .query_pairs()
      .find(|(k, _)| k == "$skiptoken")
      .map(|(_, v)| v.into_owned())
      .unwrap_or_default(),
    Err(e) => {
      warn!(%link, error = %e, "unparseable @odata.nextLink");
      String::new()
    }
  }
}

// ─── Fetcher ─────────────────────────────────────────────────────────────────

pub struct DirectoryFetcher {
  http:      reqwest::Client,
  tokens:    TokenAcquirer,
  users_url: String,
  scope:     String,
  page_size: Option<u32>,
  min_pages: u32,
  max_pages: u32,
}

impl DirectoryFetcher {
  pub fn new(config: &AzureConfig) -> Result<Self> {
    let http = config.http_client()?;
    let tokens = TokenAcquirer::new(http.clone(), config);
    Ok(Self::with_tokens(http, tokens, config))
  }

  pub fn with_tokens(http: reqwest::Client, tokens: TokenAcquirer, config: &AzureConfig) -> Self {
    Self {
      http,
      tokens,
      users_url: format!(
        "{}/{}/users",
        config.graph_host.trim_end_matches('/'),
        config.api_version
      ),
      scope: config.scope.clone(),
      page_size: config.page_size,
      min_pages: config.min_pages,
      max_pages: config.max_pages.max(1),
    }
  }

  /// GET one page. An empty `skip_token` requests the first page.
  #[instrument(skip(self, token))]
  pub async fn fetch_page(&self, token: &AccessToken, skip_token: &str) -> Result<Page> {
    let mut query: Vec<(&str, String)> = vec![("$select", SELECT_FIELDS.to_owned())];
    if let Some(top) = self.page_size {
      query.push(("$top", top.to_string()));
    }
    if !skip_token.is_empty() {
      query.push(("$skiptoken", skip_token.to_owned()));
    }

    let response = self
      .http
      .get(&self.users_url)
      .query(&query)
      .bearer_auth(token.secret())
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
      let (code, message) = match serde_json::from_str::<ODataError>(&body) {
        Ok(e) => (e.error.code, e.error.message),
        Err(_) => ("unknown".to_owned(), body),
      };
      return Err(Error::Graph { status: status.as_u16(), code, message });
    }

    let page: UsersResponse = serde_json::from_str(&body)?;
    Ok(Page { users: page.value, next_link: page.next_link })
  }

  /// Fetch every page and return the users in listing order.
  ///
  /// Stops once at least `min_pages` pages were read and the latest page had
  /// no cursor. With the default `min_pages` of 2, a listing that fits in one
  /// page is requested twice and its users appear twice in the result.
  #[instrument(skip(self))]
  pub async fn fetch_all(&self) -> Result<Vec<DirectoryUser>> {
    let mut users = Vec::new();
    let mut skip_token = String::new();
    let mut pages = 0u32;

    loop {
      let token = self.tokens.acquire(&self.scope, CLIENT_CREDENTIALS).await?;
      let page = self.fetch_page(&token, &skip_token).await?;
      pages += 1;

      debug!(page = pages, count = page.users.len(), has_next = page.next_link.is_some(), "fetched page");
      users.extend(page.users);
      skip_token = extract_skip_token(page.next_link.as_deref());

      if pages >= self.min_pages && skip_token.is_empty() {
        break;
      }
      if pages >= self.max_pages {
        return Err(Error::PageLimit(self.max_pages));
      }
    }

    info!(pages, users = users.len(), "directory listing complete");
    Ok(users)
  }
}
