//! Configuration for the sync engine.

use crate::remote::{RecordId, RemoteIdentity, SubscriptionDescriptor, Triggers};
use keepsake_storage::FileCache;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory holding the local cache file.
    pub directory: PathBuf,
    /// Remote record type.
    pub record_type: String,
    /// Prefix joined to the remote identity to form the record name.
    pub record_prefix: String,
    /// Quiet period before pending writes are flushed to the cache.
    pub debounce: Duration,
    /// Minimum spacing between executed pulls.
    pub pull_throttle: Duration,
    /// Default wait for [`await_notification_default`](crate::SyncEngine::await_notification_default).
    pub notify_timeout: Duration,
    /// Timeout applied to each remote call.
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Creates a configuration storing its cache in `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            record_type: "Model".into(),
            record_prefix: "i".into(),
            debounce: Duration::from_millis(250),
            pull_throttle: Duration::from_secs(1),
            notify_timeout: Duration::from_secs(13),
            request_timeout: Duration::from_secs(13),
        }
    }

    /// Sets the remote record type.
    pub fn with_record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = record_type.into();
        self
    }

    /// Sets the record name prefix.
    pub fn with_record_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.record_prefix = prefix.into();
        self
    }

    /// Sets the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the pull throttle window.
    pub fn with_pull_throttle(mut self, throttle: Duration) -> Self {
        self.pull_throttle = throttle;
        self
    }

    /// Sets the notification timeout.
    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Sets the per-call remote timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Name of the local cache file.
    pub fn file_name(&self) -> String {
        FileCache::default_file_name(&self.record_type)
    }

    /// Full path of the local cache file.
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(self.file_name())
    }

    /// Remote record name for `identity`.
    pub fn record_id(&self, identity: &RemoteIdentity) -> RecordId {
        RecordId::derive(&self.record_prefix, identity)
    }

    /// The change subscription the engine keeps registered for `record`.
    pub fn subscription(&self, record: &RecordId) -> SubscriptionDescriptor {
        SubscriptionDescriptor {
            id: format!("{}.{}", self.record_type, record),
            record_type: self.record_type.clone(),
            record_id: record.clone(),
            triggers: Triggers::ALL,
            silent: true,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.record_type, "Model");
        assert_eq!(config.record_prefix, "i");
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.pull_throttle, Duration::from_secs(1));
        assert_eq!(config.notify_timeout, Duration::from_secs(13));
        assert_eq!(config.request_timeout, Duration::from_secs(13));
    }

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("/data")
            .with_record_type("Settings")
            .with_record_prefix("u")
            .with_debounce(Duration::from_millis(10))
            .with_pull_throttle(Duration::ZERO)
            .with_notify_timeout(Duration::from_secs(1))
            .with_request_timeout(Duration::from_secs(2));

        assert_eq!(config.directory, PathBuf::from("/data"));
        assert_eq!(config.record_type, "Settings");
        assert_eq!(config.debounce, Duration::from_millis(10));
        assert_eq!(config.pull_throttle, Duration::ZERO);
        assert_eq!(config.notify_timeout, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert!(config.file_name().starts_with("Settings."));
        assert_eq!(
            config.file_path(),
            PathBuf::from("/data").join(config.file_name())
        );
        assert_eq!(
            config.record_id(&RemoteIdentity::new("abc")).as_str(),
            "uabc"
        );
    }

    #[test]
    fn subscription_targets_record() {
        let config = SyncConfig::default();
        let record = config.record_id(&RemoteIdentity::new("user"));
        let subscription = config.subscription(&record);

        assert_eq!(subscription.record_type, "Model");
        assert_eq!(subscription.record_id, record);
        assert_eq!(subscription.triggers, Triggers::ALL);
        assert!(subscription.silent);
        assert!(subscription.matches(&config.subscription(&record)));
    }
}
