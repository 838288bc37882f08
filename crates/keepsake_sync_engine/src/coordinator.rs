//! Remote coordinator.
//!
//! Owns everything the engine knows about the remote side: the resolved
//! record id, the pull throttle and push coalescing. It never awaits remote
//! I/O itself; each call runs on its own task and reports back through the
//! outcome channel.

use crate::actor::Command;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::gate::ReadyGate;
use crate::remote::{RecordId, RemoteIdentity, RemoteStore, SubscriptionDescriptor};
use keepsake_codec::{Archive, Envelope};
use keepsake_storage::LocalCache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Requests accepted by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request {
    Pull,
    Push,
}

enum Outcome {
    Resolved(SyncResult<RemoteIdentity>),
    Pushed,
}

pub(crate) struct Coordinator<A: Archive> {
    config: SyncConfig,
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
    engine: mpsc::UnboundedSender<Command<A>>,
    gate: ReadyGate,
    outcomes: mpsc::UnboundedSender<Outcome>,
    record: Option<RecordId>,
    resolving: bool,
    pull_waiting: bool,
    push_waiting: bool,
    last_pull: Option<Instant>,
    pushing: bool,
    push_again: bool,
    reconciled: bool,
}

impl<A: Archive> Coordinator<A> {
    /// Spawns the coordinator task. It stops once every request sender is gone.
    pub(crate) fn spawn(
        runtime: &Handle,
        config: SyncConfig,
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn LocalCache>,
        engine: mpsc::UnboundedSender<Command<A>>,
        gate: ReadyGate,
        requests: mpsc::UnboundedReceiver<Request>,
    ) {
        let (outcomes, outcome_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            config,
            remote,
            cache,
            engine,
            gate,
            outcomes,
            record: None,
            resolving: false,
            pull_waiting: false,
            push_waiting: false,
            last_pull: None,
            pushing: false,
            push_again: false,
            reconciled: false,
        };
        runtime.spawn(coordinator.run(requests, outcome_rx));
    }

    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut outcomes: mpsc::UnboundedReceiver<Outcome>,
    ) {
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => self.on_request(request),
                    None => break,
                },
                Some(outcome) = outcomes.recv() => self.on_outcome(outcome),
            }
        }
        trace!("coordinator stopped");
    }

    fn on_request(&mut self, request: Request) {
        if self.record.is_some() {
            match request {
                Request::Pull => self.pull(),
                Request::Push => self.push(),
            }
            return;
        }

        match request {
            Request::Pull => self.pull_waiting = true,
            Request::Push => self.push_waiting = true,
        }
        if self.resolving {
            trace!(?request, "identity resolution in flight, request queued");
            return;
        }

        self.resolving = true;
        let remote = Arc::clone(&self.remote);
        let outcomes = self.outcomes.clone();
        let limit = self.config.request_timeout;
        tokio::spawn(async move {
            let result = bounded(limit, remote.resolve_identity()).await;
            let _ = outcomes.send(Outcome::Resolved(result));
        });
    }

    fn on_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Resolved(Ok(identity)) => {
                let record = self.config.record_id(&identity);
                info!(record = %record, "remote identity resolved");
                self.resolving = false;
                self.record = Some(record.clone());

                if !self.reconciled {
                    self.reconciled = true;
                    self.reconcile(record);
                }
                if std::mem::take(&mut self.pull_waiting) {
                    self.pull();
                }
                if std::mem::take(&mut self.push_waiting) {
                    self.push();
                }
            }
            Outcome::Resolved(Err(error)) => {
                warn!(%error, "remote identity unavailable, dropping queued requests");
                self.resolving = false;
                self.pull_waiting = false;
                self.push_waiting = false;
                self.gate.fire();
            }
            Outcome::Pushed => {
                self.pushing = false;
                if std::mem::take(&mut self.push_again) {
                    self.push();
                }
            }
        }
    }

    fn pull(&mut self) {
        let Some(record) = self.record.clone() else {
            return;
        };
        let now = Instant::now();
        if let Some(last) = self.last_pull {
            if now.duration_since(last) < self.config.pull_throttle {
                trace!(record = %record, "pull throttled");
                return;
            }
        }
        self.last_pull = Some(now);

        debug!(record = %record, "pulling");
        let remote = Arc::clone(&self.remote);
        let engine = self.engine.clone();
        let limit = self.config.request_timeout;
        tokio::spawn(async move {
            let candidate = match bounded(limit, remote.fetch_record(&record)).await {
                Ok(Some(bytes)) => match Envelope::<A>::try_decode(&bytes) {
                    Ok(envelope) => Some(envelope.into_payload()),
                    Err(error) => {
                        warn!(record = %record, %error, "remote record undecodable");
                        None
                    }
                },
                Ok(None) => {
                    debug!(record = %record, "remote record absent");
                    None
                }
                Err(error) if error.is_retryable() => {
                    debug!(record = %record, %error, "fetch failed");
                    None
                }
                Err(error) => {
                    warn!(record = %record, %error, "fetch failed");
                    None
                }
            };
            let _ = engine.send(Command::RemoteFetched(candidate));
        });
    }

    fn push(&mut self) {
        let Some(record) = self.record.clone() else {
            return;
        };
        if self.pushing {
            trace!(record = %record, "push in flight, coalescing");
            self.push_again = true;
            return;
        }
        self.pushing = true;

        let remote = Arc::clone(&self.remote);
        let cache = Arc::clone(&self.cache);
        let outcomes = self.outcomes.clone();
        let limit = self.config.request_timeout;
        tokio::spawn(async move {
            match upload(remote, cache, &record, limit).await {
                Ok(()) => {}
                Err(error) if error.is_retryable() => {
                    debug!(record = %record, %error, "push failed");
                }
                Err(error) => warn!(record = %record, %error, "push failed"),
            }
            let _ = outcomes.send(Outcome::Pushed);
        });
    }

    fn reconcile(&self, record: RecordId) {
        let remote = Arc::clone(&self.remote);
        let intended = self.config.subscription(&record);
        let limit = self.config.request_timeout;
        tokio::spawn(async move {
            if let Err(error) = reconcile_subscriptions(remote, &intended, limit).await {
                warn!(record = %record, %error, "subscription reconciliation failed");
            }
        });
    }
}

async fn upload(
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
    record: &RecordId,
    limit: Duration,
) -> SyncResult<()> {
    let bytes = tokio::task::spawn_blocking(move || cache.read())
        .await
        .map_err(|e| SyncError::Io(std::io::Error::other(e)))??;
    let Some(bytes) = bytes else {
        debug!(record = %record, "no local cache, nothing to push");
        return Ok(());
    };

    let len = bytes.len();
    bounded(limit, remote.upsert_record(record, bytes)).await?;
    debug!(record = %record, bytes = len, "pushed");
    Ok(())
}

async fn reconcile_subscriptions(
    remote: Arc<dyn RemoteStore>,
    intended: &SubscriptionDescriptor,
    limit: Duration,
) -> SyncResult<()> {
    let existing = bounded(limit, remote.list_subscriptions(&intended.record_id)).await?;

    // other record types sharing the record belong to other documents
    let mut kept: Option<String> = None;
    for subscription in existing
        .into_iter()
        .filter(|s| s.record_type == intended.record_type)
    {
        if kept.is_none() && subscription.matches(intended) {
            kept = Some(subscription.id);
            continue;
        }
        if kept.as_deref() == Some(subscription.id.as_str()) {
            continue;
        }
        debug!(id = %subscription.id, "deleting stale subscription");
        match bounded(limit, remote.delete_subscription(&subscription.id)).await {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {}
            Err(error) => return Err(error),
        }
    }

    if kept.is_none() {
        bounded(limit, remote.register_subscription(intended)).await?;
        info!(id = %intended.id, record = %intended.record_id, "subscription registered");
    }
    Ok(())
}

async fn bounded<T>(limit: Duration, call: impl Future<Output = SyncResult<T>>) -> SyncResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(SyncError::Timeout))
}
