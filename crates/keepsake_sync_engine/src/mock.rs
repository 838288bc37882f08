//! In-memory remote store.

use crate::error::{SyncError, SyncResult};
use crate::remote::{AccountStatus, RecordId, RemoteIdentity, RemoteStore, SubscriptionDescriptor};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Identity token returned by a fresh [`MockRemote`].
pub const MOCK_IDENTITY: &str = "_mock_user";

/// Call counters of a [`MockRemote`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    /// `resolve_identity` calls.
    pub resolve: usize,
    /// `fetch_record` calls.
    pub fetch: usize,
    /// `upsert_record` calls.
    pub upsert: usize,
    /// `list_subscriptions` calls.
    pub list: usize,
    /// `register_subscription` calls.
    pub register: usize,
    /// `delete_subscription` calls.
    pub delete: usize,
}

impl MockCalls {
    /// Calls that needed a resolved record id.
    pub fn record_calls(&self) -> usize {
        self.fetch + self.upsert + self.list + self.register + self.delete
    }
}

#[derive(Debug, Default)]
struct Counters {
    resolve: AtomicUsize,
    fetch: AtomicUsize,
    upsert: AtomicUsize,
    list: AtomicUsize,
    register: AtomicUsize,
    delete: AtomicUsize,
}

/// A remote store kept in memory.
///
/// Useful for tests and for running an app without a backend. Account
/// status, latency and failures can be changed at any time.
#[derive(Debug)]
pub struct MockRemote {
    status: Mutex<AccountStatus>,
    identity: Mutex<RemoteIdentity>,
    records: Mutex<HashMap<RecordId, Vec<u8>>>,
    subscriptions: Mutex<Vec<SubscriptionDescriptor>>,
    latency: Mutex<Duration>,
    fail_fetch: AtomicBool,
    fail_upsert: AtomicBool,
    fail_subscriptions: AtomicBool,
    calls: Counters,
}

impl MockRemote {
    /// Creates an available, empty store.
    pub fn new() -> Self {
        Self {
            status: Mutex::new(AccountStatus::Available),
            identity: Mutex::new(RemoteIdentity::new(MOCK_IDENTITY)),
            records: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
            fail_fetch: AtomicBool::new(false),
            fail_upsert: AtomicBool::new(false),
            fail_subscriptions: AtomicBool::new(false),
            calls: Counters::default(),
        }
    }

    /// Sets the account status reported by `resolve_identity`.
    pub fn set_status(&self, status: AccountStatus) {
        *self.status.lock() = status;
    }

    /// Sets the identity token.
    pub fn set_identity(&self, identity: impl Into<String>) {
        *self.identity.lock() = RemoteIdentity::new(identity);
    }

    /// Returns the identity token.
    pub fn identity(&self) -> RemoteIdentity {
        self.identity.lock().clone()
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Makes `fetch_record` fail.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Makes `upsert_record` fail.
    pub fn set_fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    /// Makes every subscription call fail.
    pub fn set_fail_subscriptions(&self, fail: bool) {
        self.fail_subscriptions.store(fail, Ordering::SeqCst);
    }

    /// Stores record bytes directly.
    pub fn put_record(&self, id: &RecordId, bytes: Vec<u8>) {
        self.records.lock().insert(id.clone(), bytes);
    }

    /// Returns the stored record bytes.
    pub fn record(&self, id: &RecordId) -> Option<Vec<u8>> {
        self.records.lock().get(id).cloned()
    }

    /// Adds a subscription directly.
    pub fn put_subscription(&self, descriptor: SubscriptionDescriptor) {
        self.subscriptions.lock().push(descriptor);
    }

    /// Returns the registered subscriptions.
    pub fn subscriptions(&self) -> Vec<SubscriptionDescriptor> {
        self.subscriptions.lock().clone()
    }

    /// Returns a snapshot of the call counters.
    pub fn calls(&self) -> MockCalls {
        MockCalls {
            resolve: self.calls.resolve.load(Ordering::SeqCst),
            fetch: self.calls.fetch.load(Ordering::SeqCst),
            upsert: self.calls.upsert.load(Ordering::SeqCst),
            list: self.calls.list.load(Ordering::SeqCst),
            register: self.calls.register.load(Ordering::SeqCst),
            delete: self.calls.delete.load(Ordering::SeqCst),
        }
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_subscriptions(&self) -> SyncResult<()> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(SyncError::remote_retryable("subscription service unavailable"));
        }
        Ok(())
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn resolve_identity(&self) -> SyncResult<RemoteIdentity> {
        self.calls.resolve.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        match *self.status.lock() {
            AccountStatus::Available => Ok(self.identity()),
            status => Err(SyncError::AccountUnavailable(status)),
        }
    }

    async fn fetch_record(&self, id: &RecordId) -> SyncResult<Option<Vec<u8>>> {
        self.calls.fetch.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SyncError::remote_retryable("network unreachable"));
        }
        Ok(self.record(id))
    }

    async fn upsert_record(&self, id: &RecordId, bytes: Vec<u8>) -> SyncResult<()> {
        self.calls.upsert.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(SyncError::remote_retryable("network unreachable"));
        }
        self.put_record(id, bytes);
        Ok(())
    }

    async fn list_subscriptions(&self, id: &RecordId) -> SyncResult<Vec<SubscriptionDescriptor>> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check_subscriptions()?;
        Ok(self
            .subscriptions
            .lock()
            .iter()
            .filter(|s| s.record_id == *id)
            .cloned()
            .collect())
    }

    async fn register_subscription(&self, descriptor: &SubscriptionDescriptor) -> SyncResult<()> {
        self.calls.register.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check_subscriptions()?;
        self.put_subscription(descriptor.clone());
        Ok(())
    }

    async fn delete_subscription(&self, id: &str) -> SyncResult<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check_subscriptions()?;
        let mut subscriptions = self.subscriptions.lock();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        if subscriptions.len() == before {
            return Err(SyncError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Triggers;

    #[tokio::test]
    async fn unavailable_account() {
        let remote = MockRemote::new();
        remote.set_status(AccountStatus::NoAccount);
        let err = remote.resolve_identity().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::AccountUnavailable(AccountStatus::NoAccount)
        ));
        assert_eq!(remote.calls().resolve, 1);
    }

    #[tokio::test]
    async fn records_roundtrip() {
        let remote = MockRemote::new();
        let id = RecordId::derive("i", &remote.identity());
        assert!(remote.fetch_record(&id).await.unwrap().is_none());

        remote.upsert_record(&id, vec![1, 2, 3]).await.unwrap();
        assert_eq!(remote.fetch_record(&id).await.unwrap(), Some(vec![1, 2, 3]));

        remote.set_fail_fetch(true);
        assert!(remote.fetch_record(&id).await.unwrap_err().is_retryable());
        assert_eq!(remote.calls().fetch, 3);
        assert_eq!(remote.calls().upsert, 1);
    }

    #[tokio::test]
    async fn subscriptions_crud() {
        let remote = MockRemote::new();
        let descriptor = SubscriptionDescriptor {
            id: "sub".into(),
            record_type: "Model".into(),
            record_id: RecordId::from_name("iuser"),
            triggers: Triggers::ALL,
            silent: true,
        };
        let record = descriptor.record_id.clone();
        remote.register_subscription(&descriptor).await.unwrap();
        assert_eq!(
            remote.list_subscriptions(&record).await.unwrap(),
            vec![descriptor.clone()]
        );
        let elsewhere = RecordId::from_name("iother");
        assert!(remote.list_subscriptions(&elsewhere).await.unwrap().is_empty());

        remote.delete_subscription("sub").await.unwrap();
        assert!(remote.subscriptions().is_empty());
        assert!(remote
            .delete_subscription("sub")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
