//! Credit-check port.
//!
//! Installing a skin costs one credit. Accounting rules live outside this
//! crate; the manager only asks whether the next install is allowed.

use std::collections::BTreeMap;
use std::future::Future;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditDecision {
    pub granted: bool,
    /// Credits left after this decision, when the ledger tracks them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
}

impl CreditDecision {
    pub fn granted(remaining: Option<u32>) -> Self {
        Self {
            granted: true,
            remaining,
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: false,
            remaining: Some(0),
        }
    }
}

#[derive(Debug, Error)]
pub enum CreditError {
    #[error("Failed to access credit ledger {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credit ledger {path} is invalid: {source}")]
    Invalid {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Consumes a usage credit before an install.
///
/// A denied credit is a normal outcome (`granted: false`), not an error.
pub trait CreditLedger: Send + Sync {
    fn try_consume_credit(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<CreditDecision, CreditError>> + Send;
}

/// Grants every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnlimitedCredits;

impl CreditLedger for UnlimitedCredits {
    async fn try_consume_credit(&self, _user_id: &str) -> Result<CreditDecision, CreditError> {
        Ok(CreditDecision::granted(None))
    }
}

/// Remaining credits per user in a JSON object, e.g. `{"local": 3}`.
///
/// Unknown users have no credits. A grant is persisted before it is returned.
#[derive(Debug)]
pub struct FileCreditLedger {
    path: Utf8PathBuf,
    lock: Mutex<()>,
}

impl FileCreditLedger {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    async fn read(&self) -> Result<BTreeMap<String, u32>, CreditError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(CreditError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|source| CreditError::Invalid {
            path: self.path.clone(),
            source,
        })
    }

    /// Credits currently left for `user_id`.
    pub async fn remaining(&self, user_id: &str) -> Result<u32, CreditError> {
        Ok(self.read().await?.get(user_id).copied().unwrap_or(0))
    }
}

impl CreditLedger for FileCreditLedger {
    async fn try_consume_credit(&self, user_id: &str) -> Result<CreditDecision, CreditError> {
        let _guard = self.lock.lock().await;
        let mut credits = self.read().await?;

        let Some(left) = credits.get_mut(user_id).filter(|left| **left > 0) else {
            tracing::info!(user_id, "Install credit denied");
            return Ok(CreditDecision::denied());
        };
        *left -= 1;
        let remaining = *left;

        let contents =
            serde_json::to_string_pretty(&credits).map_err(|source| CreditError::Invalid {
                path: self.path.clone(),
                source,
        })?;
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|source| CreditError::Io {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(user_id, remaining, "Install credit consumed");
        Ok(CreditDecision::granted(Some(remaining)))
    }
}

/// Ledger selected from configuration.
#[derive(Debug)]
pub enum CreditSource {
    Unlimited(UnlimitedCredits),
    File(FileCreditLedger),
}

impl CreditSource {
    pub fn from_file(path: Option<Utf8PathBuf>) -> Self {
        match path {
            Some(path) => CreditSource::File(FileCreditLedger::new(path)),
            None => CreditSource::Unlimited(UnlimitedCredits),
        }
    }
}

impl CreditLedger for CreditSource {
    async fn try_consume_credit(&self, user_id: &str) -> Result<CreditDecision, CreditError> {
        match self {
            CreditSource::Unlimited(ledger) => ledger.try_consume_credit(user_id).await,
            CreditSource::File(ledger) => ledger.try_consume_credit(user_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger_with(dir: &TempDir, contents: &str) -> FileCreditLedger {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("credits.json")).unwrap();
        std::fs::write(&path, contents).unwrap();
        FileCreditLedger::new(path)
    }

    #[tokio::test]
    async fn test_file_ledger_decrements_until_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, r#"{"local": 2}"#);

        assert_eq!(
            ledger.try_consume_credit("local").await.unwrap(),
            CreditDecision::granted(Some(1))
        );
        assert_eq!(
            ledger.try_consume_credit("local").await.unwrap(),
            CreditDecision::granted(Some(0))
        );
        assert!(!ledger.try_consume_credit("local").await.unwrap().granted);
        assert_eq!(ledger.remaining("local").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_denied() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, r#"{"someone-else": 5}"#);

        assert!(!ledger.try_consume_credit("local").await.unwrap().granted);
        assert_eq!(ledger.remaining("someone-else").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_invalid_ledger_is_an_error() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_with(&dir, "not json");

        assert!(matches!(
            ledger.try_consume_credit("local").await,
            Err(CreditError::Invalid { .. })
        ));
    }

    #[tokio::test]
    async fn test_unlimited_always_grants() {
        let source = CreditSource::from_file(None);
        assert!(source.try_consume_credit("anyone").await.unwrap().granted);
    }
}
