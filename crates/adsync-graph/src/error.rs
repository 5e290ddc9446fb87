//! Error types for `adsync-graph`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("token request failed with status {status}: {body}")]
  TokenRequest { status: u16, body: String },

  #[error("token response has no access_token")]
  MissingAccessToken,

  #[error("graph request failed with status {status}: {code} - {message}")]
  Graph { status: u16, code: String, message: String },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("directory listing exceeded {0} pages")]
  PageLimit(u32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
