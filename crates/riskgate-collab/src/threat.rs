//! Threat-feed collaborator: suspicious activity and anomaly records.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use riskgate_core::{AccountId, ThreatRecord};

use crate::error::{CollabError, CollabResult};
use crate::BoxFuture;

/// Threat-feed contract consumed by the threat gate and the sweep task.
pub trait ThreatFeed: Send + Sync {
    /// Suspicious-activity records for an account.
    fn suspicious_activity<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> BoxFuture<'a, CollabResult<Vec<ThreatRecord>>>;

    /// Anomaly records for an account.
    fn anomalies<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> BoxFuture<'a, CollabResult<Vec<ThreatRecord>>>;
}

/// In-memory threat feed used for tests and local wiring.
#[derive(Default)]
pub struct InMemoryThreatFeed {
    suspicious: RwLock<HashMap<AccountId, Vec<ThreatRecord>>>,
    anomalies: RwLock<HashMap<AccountId, Vec<ThreatRecord>>>,
    unavailable: AtomicBool,
}

impl InMemoryThreatFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_suspicious(&self, record: ThreatRecord) {
        self.suspicious
            .write()
            .entry(record.account_id.clone())
            .or_default()
            .push(record);
    }

    pub fn add_anomaly(&self, record: ThreatRecord) {
        self.anomalies
            .write()
            .entry(record.account_id.clone())
            .or_default()
            .push(record);
    }

    /// Make every subsequent call fail with `CollabError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn guard(&self) -> CollabResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollabError::Unavailable("threat feed offline".to_string()));
        }
        Ok(())
    }
}

impl ThreatFeed for InMemoryThreatFeed {
    fn suspicious_activity<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> BoxFuture<'a, CollabResult<Vec<ThreatRecord>>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self
                .suspicious
                .read()
                .get(account)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn anomalies<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> BoxFuture<'a, CollabResult<Vec<ThreatRecord>>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self
                .anomalies
                .read()
                .get(account)
                .cloned()
                .unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_records_per_account() {
        let feed = InMemoryThreatFeed::new();
        let account = AccountId::from("acct-1");
        feed.add_suspicious(ThreatRecord {
            account_id: account.clone(),
            description: "login burst".to_string(),
            observed_at: Utc::now(),
        });

        let records = feed.suspicious_activity(&account).await.unwrap();
        assert_eq!(records.len(), 1);

        let other = AccountId::from("acct-2");
        assert!(feed.suspicious_activity(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_mode() {
        let feed = InMemoryThreatFeed::new();
        feed.set_unavailable(true);

        let account = AccountId::from("acct-1");
        assert!(matches!(
            feed.anomalies(&account).await.unwrap_err(),
            CollabError::Unavailable(_)
        ));
    }
}
