//! Remote store abstraction.

use crate::error::SyncResult;
use async_trait::async_trait;
use std::fmt;

/// State of the remote account as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// Signed in and usable.
    Available,
    /// No account is signed in.
    NoAccount,
    /// Access is blocked by policy.
    Restricted,
    /// The store could not tell.
    CouldNotDetermine,
    /// Signed in but temporarily unusable.
    TemporarilyUnavailable,
}

impl AccountStatus {
    /// Returns true if the status may change without user action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AccountStatus::CouldNotDetermine | AccountStatus::TemporarilyUnavailable
        )
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AccountStatus::Available => "available",
            AccountStatus::NoAccount => "no account",
            AccountStatus::Restricted => "restricted",
            AccountStatus::CouldNotDetermine => "could not determine",
            AccountStatus::TemporarilyUnavailable => "temporarily unavailable",
        };
        f.write_str(text)
    }
}

/// Opaque token identifying the remote user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteIdentity(String);

impl RemoteIdentity {
    /// Wraps a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of the remote record holding the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    /// Derives the record name from an identity: `prefix + identity`.
    pub fn derive(prefix: &str, identity: &RemoteIdentity) -> Self {
        Self(format!("{prefix}{identity}"))
    }

    /// Wraps an existing record name.
    pub fn from_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the record name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record changes that fire a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triggers {
    /// Fire when the record is created.
    pub on_create: bool,
    /// Fire when the record is updated.
    pub on_update: bool,
    /// Fire when the record is deleted.
    pub on_delete: bool,
}

impl Triggers {
    /// Every kind of change.
    pub const ALL: Self = Self {
        on_create: true,
        on_update: true,
        on_delete: true,
    };
}

/// A change subscription registered with the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDescriptor {
    /// Store-side identifier, used for deletion.
    pub id: String,
    /// Record type the subscription filters on.
    pub record_type: String,
    /// Record the subscription filters on.
    pub record_id: RecordId,
    /// Changes that fire.
    pub triggers: Triggers,
    /// Deliver as a silent (content-available) notification.
    pub silent: bool,
}

impl SubscriptionDescriptor {
    /// Returns true if both subscriptions have the same configuration.
    ///
    /// The store-side id is ignored.
    pub fn matches(&self, other: &SubscriptionDescriptor) -> bool {
        self.record_type == other.record_type
            && self.record_id == other.record_id
            && self.triggers == other.triggers
            && self.silent == other.silent
    }
}

/// A remote durable record store.
///
/// Implementations talk to the actual backend. All calls may fail; the
/// engine logs and absorbs every error.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Resolves the signed-in user.
    ///
    /// Returns [`SyncError::AccountUnavailable`](crate::SyncError::AccountUnavailable)
    /// when the account cannot be used.
    async fn resolve_identity(&self) -> SyncResult<RemoteIdentity>;

    /// Fetches the record's payload bytes, or `None` if it does not exist.
    async fn fetch_record(&self, id: &RecordId) -> SyncResult<Option<Vec<u8>>>;

    /// Creates or overwrites the record's payload.
    async fn upsert_record(&self, id: &RecordId, bytes: Vec<u8>) -> SyncResult<()>;

    /// Lists the change subscriptions that filter on the record `id`.
    ///
    /// Subscriptions on other records are not returned, so reconciliation
    /// never touches them.
    async fn list_subscriptions(&self, id: &RecordId) -> SyncResult<Vec<SubscriptionDescriptor>>;

    /// Registers a change subscription.
    async fn register_subscription(&self, descriptor: &SubscriptionDescriptor) -> SyncResult<()>;

    /// Deletes the subscription with the given store-side id.
    async fn delete_subscription(&self, id: &str) -> SyncResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, record: &str) -> SubscriptionDescriptor {
        SubscriptionDescriptor {
            id: id.into(),
            record_type: "Model".into(),
            record_id: RecordId::from_name(record),
            triggers: Triggers::ALL,
            silent: true,
        }
    }

    #[test]
    fn record_id_is_prefix_plus_identity() {
        let id = RecordId::derive("i", &RemoteIdentity::new("_abc123"));
        assert_eq!(id.as_str(), "i_abc123");
        assert_eq!(id.to_string(), "i_abc123");
    }

    #[test]
    fn descriptor_match_ignores_id() {
        let a = descriptor("one", "iuser");
        let b = descriptor("two", "iuser");
        assert!(a.matches(&b));

        let other_record = descriptor("one", "iother");
        assert!(!a.matches(&other_record));

        let mut loud = descriptor("one", "iuser");
        loud.silent = false;
        assert!(!a.matches(&loud));

        let mut updates_only = descriptor("one", "iuser");
        updates_only.triggers = Triggers {
            on_create: false,
            on_update: true,
            on_delete: false,
        };
        assert!(!a.matches(&updates_only));
    }

    #[test]
    fn transient_statuses() {
        assert!(AccountStatus::TemporarilyUnavailable.is_transient());
        assert!(AccountStatus::CouldNotDetermine.is_transient());
        assert!(!AccountStatus::NoAccount.is_transient());
        assert!(!AccountStatus::Available.is_transient());
    }
}
