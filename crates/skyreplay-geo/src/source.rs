//! Where boundary documents come from.

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One candidate location for the boundary dataset. Configured as an ordered
/// list; see [`crate::BoundaryCache::load`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BoundarySource {
  Http { url: String },
  File { path: PathBuf },
}

impl BoundarySource {
  /// Fetch the raw document. Timeouts are applied by the caller.
  pub async fn fetch(&self, client: &reqwest::Client) -> Result<String> {
    match self {
      Self::Http { url } => {
        let resp = client.get(url).send().await?;
        if !resp.status().is_success() {
          return Err(Error::Status(resp.status().as_u16()));
        }
        Ok(resp.text().await?)
      }
      Self::File { path } => Ok(tokio::fs::read_to_string(path).await?),
    }
  }
}

impl fmt::Display for BoundarySource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Http { url } => f.write_str(url),
      Self::File { path } => write!(f, "file://{}", path.display()),
    }
  }
}
