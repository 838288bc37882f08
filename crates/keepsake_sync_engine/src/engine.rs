//! Public engine handle.

use crate::actor::{Actor, Command};
use crate::config::SyncConfig;
use crate::coordinator::{Coordinator, Request};
use crate::error::{SyncError, SyncResult};
use crate::gate::ReadyGate;
use crate::publisher::{Publisher, Subscriber, Subscription};
use crate::remote::RemoteStore;
use keepsake_codec::Archive;
use keepsake_storage::{FileCache, LocalCache};
use parking_lot::RwLock;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

/// Lifecycle phase of a [`SyncEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// Constructed; the actor has not started.
    Uninitialized,
    /// Reading local state.
    Loading,
    /// Local state is loaded or the first remote check has concluded.
    Ready,
}

impl EnginePhase {
    /// Returns true once the engine is ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, EnginePhase::Ready)
    }
}

/// Keeps one [`Archive`] document in sync between a local cache and a
/// remote store.
///
/// Local edits win immediately and are written to the cache after a quiet
/// period, then pushed. Remote state is pulled on start and on demand, and
/// replaces the local model only when its timestamp is newer.
///
/// The engine must be created inside a Tokio runtime. Dropping it flushes
/// any pending write and stops its tasks.
///
/// # Example
///
/// ```rust,ignore
/// let engine = SyncEngine::<Settings>::open(SyncConfig::new(dir), remote)?;
/// let _sub = engine.subscribe(|settings| println!("{settings:?}")).await;
/// engine.mutate(|settings| settings.theme = Theme::Dark).await;
/// ```
pub struct SyncEngine<A: Archive> {
    config: SyncConfig,
    commands: mpsc::UnboundedSender<Command<A>>,
    requests: mpsc::UnboundedSender<Request>,
    snapshot: Arc<RwLock<A>>,
    gate: ReadyGate,
    phase: Arc<RwLock<EnginePhase>>,
    emissions: watch::Receiver<u64>,
}

impl<A: Archive> SyncEngine<A> {
    /// Creates an engine over the given cache and remote store and starts
    /// loading local state.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a Tokio runtime or if the
    /// fan-out dispatcher thread cannot be spawned.
    pub fn new(
        config: SyncConfig,
        cache: Arc<dyn LocalCache>,
        remote: Arc<dyn RemoteStore>,
    ) -> SyncResult<Self> {
        let runtime = Handle::try_current().map_err(|e| SyncError::Io(io::Error::other(e)))?;
        let (emitted, emissions) = watch::channel(0);
        let publisher = Publisher::spawn(emitted)?;

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (requests, request_rx) = mpsc::unbounded_channel();
        let snapshot = Arc::new(RwLock::new(A::default()));
        let gate = ReadyGate::new();
        let phase = Arc::new(RwLock::new(EnginePhase::Uninitialized));

        Coordinator::spawn(
            &runtime,
            config.clone(),
            remote,
            Arc::clone(&cache),
            commands.clone(),
            gate.clone(),
            request_rx,
        );

        let actor = Actor::new(
            cache,
            config.debounce,
            Arc::clone(&snapshot),
            publisher,
            gate.clone(),
            Arc::clone(&phase),
            commands.clone(),
            requests.clone(),
        );
        runtime.spawn(actor.run(command_rx));

        debug!(record_type = %config.record_type, "engine started");
        Ok(Self {
            config,
            commands,
            requests,
            snapshot,
            gate,
            phase,
            emissions,
        })
    }

    /// Creates an engine caching to `config.file_path()`.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn open(config: SyncConfig, remote: Arc<dyn RemoteStore>) -> SyncResult<Self> {
        let cache = Arc::new(FileCache::new(config.file_path()));
        Self::new(config, cache, remote)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Replaces the model with a local edit.
    ///
    /// The model is stamped with the current time, or with its previous
    /// timestamp if that is later, fanned out, then written and pushed after
    /// the debounce window. Returns the stamped
    /// model.
    pub async fn update(&self, model: A) -> A {
        self.mutate(move |current| *current = model).await
    }

    /// Applies `edit` to the current model as a local edit.
    ///
    /// See [`update`](Self::update).
    pub async fn mutate<F>(&self, edit: F) -> A
    where
        F: FnOnce(&mut A) + Send + 'static,
    {
        let (done, applied) = oneshot::channel();
        let command = Command::Edit {
            edit: Box::new(edit),
            done,
        };
        if self.commands.send(command).is_err() {
            return self.model();
        }
        match applied.await {
            Ok(model) => model,
            Err(_) => self.model(),
        }
    }

    /// Registers a subscriber.
    ///
    /// Returns after `callback` has received the current model. Later
    /// changes are delivered on the fan-out thread, in order, until the
    /// returned handle is dropped.
    pub async fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let (subscriber, handle) = Subscriber::new(Arc::new(callback));
        let (done, replayed) = oneshot::channel();
        if self
            .commands
            .send(Command::Subscribe { subscriber, done })
            .is_ok()
        {
            let _ = replayed.await;
        }
        handle
    }

    /// Number of live subscribers, after pruning dead handles.
    pub async fn subscriber_count(&self) -> usize {
        let (reply, count) = oneshot::channel();
        if self.commands.send(Command::SubscriberCount(reply)).is_err() {
            return 0;
        }
        count.await.unwrap_or(0)
    }

    /// Snapshot of the authoritative model.
    pub fn model(&self) -> A {
        self.snapshot.read().clone()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> EnginePhase {
        if self.gate.is_ready() {
            return EnginePhase::Ready;
        }
        *self.phase.read()
    }

    /// The readiness signal.
    pub fn ready(&self) -> ReadyGate {
        self.gate.clone()
    }

    /// Requests a pull from the remote store.
    pub fn pull(&self) {
        let _ = self.requests.send(Request::Pull);
    }

    /// Requests a push of the local cache to the remote store.
    pub fn push(&self) {
        let _ = self.requests.send(Request::Push);
    }

    /// Pulls, then waits up to `timeout` for the next fan-out.
    ///
    /// Returns true if subscribers were notified in time. Replays to new
    /// subscribers do not count.
    pub async fn await_notification(&self, timeout: Duration) -> bool {
        let mut emissions = self.emissions.clone();
        emissions.borrow_and_update();
        self.pull();
        matches!(
            tokio::time::timeout(timeout, emissions.changed()).await,
            Ok(Ok(()))
        )
    }

    /// [`await_notification`](Self::await_notification) with the configured timeout.
    pub async fn await_notification_default(&self) -> bool {
        self.await_notification(self.config.notify_timeout).await
    }
}

impl<A: Archive> Drop for SyncEngine<A> {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

impl<A: Archive> std::fmt::Debug for SyncEngine<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("record_type", &self.config.record_type)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRemote;
    use keepsake_codec::{CodecResult, Reader, Writer};
    use keepsake_storage::InMemoryCache;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Flag {
        on: bool,
        timestamp: u32,
    }

    impl Archive for Flag {
        const VERSION: u8 = 1;

        fn timestamp(&self) -> u32 {
            self.timestamp
        }

        fn set_timestamp(&mut self, timestamp: u32) {
            self.timestamp = timestamp;
        }

        fn write_payload(&self, writer: &mut Writer) -> CodecResult<()> {
            writer.put_bool(self.on);
            Ok(())
        }

        fn read_payload(reader: &mut Reader<'_>) -> CodecResult<Self> {
            Ok(Self {
                on: reader.bool()?,
                timestamp: 0,
            })
        }
    }

    #[test]
    fn phase_readiness() {
        assert!(!EnginePhase::Uninitialized.is_ready());
        assert!(!EnginePhase::Loading.is_ready());
        assert!(EnginePhase::Ready.is_ready());
    }

    #[test]
    fn new_outside_runtime_fails() {
        let result = SyncEngine::<Flag>::new(
            SyncConfig::default(),
            Arc::new(InMemoryCache::new()),
            Arc::new(MockRemote::new()),
        );
        assert!(matches!(result, Err(SyncError::Io(_))));
    }

    #[tokio::test]
    async fn runs_on_current_thread_runtime() {
        let engine = SyncEngine::<Flag>::new(
            SyncConfig::default().with_debounce(Duration::from_millis(5)),
            Arc::new(InMemoryCache::new()),
            Arc::new(MockRemote::new()),
        )
        .unwrap();

        assert!(engine.ready().wait_timeout(Duration::from_secs(2)).await);
        let flag = engine.mutate(|flag| flag.on = true).await;
        assert!(flag.on);
        assert_eq!(engine.model(), flag);
        assert!(format!("{engine:?}").contains("Model"));
    }
}
