//! The engine actor.
//!
//! A single task owns the authoritative model, the subscriber list and the
//! pending write. Every change to those three goes through its mailbox, so
//! no two mutations race. Blocking file work and remote I/O run elsewhere and
//! post their results back as commands.

use crate::coordinator::Request;
use crate::engine::EnginePhase;
use crate::error::{SyncError, SyncResult};
use crate::gate::ReadyGate;
use crate::publisher::{Publisher, Subscriber};
use keepsake_codec::{unix_now, Archive, Envelope};
use keepsake_storage::LocalCache;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// A local edit applied inside the actor.
pub(crate) type Edit<A> = Box<dyn FnOnce(&mut A) + Send>;

pub(crate) enum Command<A> {
    Edit {
        edit: Edit<A>,
        done: oneshot::Sender<A>,
    },
    Subscribe {
        subscriber: Subscriber<A>,
        done: oneshot::Sender<()>,
    },
    SubscriberCount(oneshot::Sender<usize>),
    RemoteFetched(Option<A>),
    Flushed {
        ok: bool,
        push: bool,
    },
    Shutdown,
}

/// A write waiting for the debounce window to close.
struct PendingWrite<A> {
    model: A,
    push: bool,
}

pub(crate) struct Actor<A: Archive> {
    cache: Arc<dyn LocalCache>,
    debounce: Duration,
    model: A,
    snapshot: Arc<RwLock<A>>,
    publisher: Publisher<A>,
    pending: Option<PendingWrite<A>>,
    deadline: Option<Instant>,
    flushing: bool,
    closing: bool,
    gate: ReadyGate,
    phase: Arc<RwLock<EnginePhase>>,
    mailbox: mpsc::UnboundedSender<Command<A>>,
    coordinator: mpsc::UnboundedSender<Request>,
}

impl<A: Archive> Actor<A> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        cache: Arc<dyn LocalCache>,
        debounce: Duration,
        snapshot: Arc<RwLock<A>>,
        publisher: Publisher<A>,
        gate: ReadyGate,
        phase: Arc<RwLock<EnginePhase>>,
        mailbox: mpsc::UnboundedSender<Command<A>>,
        coordinator: mpsc::UnboundedSender<Request>,
    ) -> Self {
        Self {
            cache,
            debounce,
            model: A::default(),
            snapshot,
            publisher,
            pending: None,
            deadline: None,
            flushing: false,
            closing: false,
            gate,
            phase,
            mailbox,
            coordinator,
        }
    }

    /// Loads local state, then serves the mailbox until shutdown.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command<A>>) {
        self.load().await;

        loop {
            let command = match self.deadline {
                Some(deadline) if !self.flushing && !self.closing => tokio::select! {
                    command = commands.recv() => command,
                    () = sleep_until(deadline) => {
                        self.start_flush();
                        continue;
                    }
                },
                _ => commands.recv().await,
            };
            let Some(command) = command else { break };

            if self.handle(command).await {
                break;
            }
        }
        trace!("engine actor stopped");
    }

    /// Returns true when the actor should stop.
    async fn handle(&mut self, command: Command<A>) -> bool {
        match command {
            Command::Edit { edit, done } => {
                let mut model = self.model.clone();
                edit(&mut model);
                // never behind a remote state already accepted from a faster clock
                model.set_timestamp(unix_now().max(self.model.timestamp()));
                debug!(timestamp = model.timestamp(), "local edit");
                self.replace(model);
                self.enqueue(true);
                let _ = done.send(self.model.clone());
            }
            Command::Subscribe { subscriber, done } => {
                self.publisher.add(subscriber, self.model.clone(), done);
            }
            Command::SubscriberCount(reply) => {
                let _ = reply.send(self.publisher.prune());
            }
            Command::RemoteFetched(candidate) => self.on_remote(candidate),
            Command::Flushed { ok, push } => {
                self.flushing = false;
                if ok && push && !self.closing {
                    let _ = self.coordinator.send(Request::Push);
                }
                if self.closing {
                    self.flush_now().await;
                    return true;
                }
            }
            Command::Shutdown => {
                if self.flushing {
                    self.closing = true;
                } else {
                    self.flush_now().await;
                    return true;
                }
            }
        }
        false
    }

    async fn load(&mut self) {
        *self.phase.write() = EnginePhase::Loading;

        let cache = Arc::clone(&self.cache);
        let read = tokio::task::spawn_blocking(move || {
            if let Err(error) = cache.exclude_from_backup() {
                warn!(%error, "could not exclude cache from backup");
            }
            cache.read()
        })
        .await;

        let loaded = match read {
            Ok(Ok(Some(bytes))) => match Envelope::<A>::try_decode(&bytes) {
                Ok(envelope) => Some(envelope.into_payload()),
                Err(error) => {
                    warn!(%error, bytes = bytes.len(), "local cache undecodable, starting empty");
                    None
                }
            },
            Ok(Ok(None)) => None,
            Ok(Err(error)) => {
                warn!(%error, "local cache unreadable, starting empty");
                None
            }
            Err(error) => {
                warn!(%error, "cache read task failed");
                None
            }
        };

        match loaded {
            Some(model) => {
                info!(timestamp = model.timestamp(), "local state loaded");
                self.replace(model);
            }
            None => info!("no local state"),
        }

        self.fire_ready();
        let _ = self.coordinator.send(Request::Pull);
    }

    fn on_remote(&mut self, candidate: Option<A>) {
        let local = self.model.timestamp();
        match candidate {
            Some(candidate) if candidate.timestamp() > local => {
                debug!(remote = candidate.timestamp(), local, "remote state accepted");
                self.replace(candidate);
                self.enqueue(false);
            }
            Some(candidate) => {
                debug!(remote = candidate.timestamp(), local, "remote state is stale");
                self.request_push();
            }
            None => {
                debug!(local, "no usable remote state");
                self.request_push();
            }
        }
        self.fire_ready();
    }

    fn request_push(&self) {
        if self.model.timestamp() == 0 {
            trace!("untouched default, nothing to push");
            return;
        }
        let _ = self.coordinator.send(Request::Push);
    }

    fn fire_ready(&self) {
        if self.gate.fire() {
            debug!("engine ready");
        }
    }

    /// Replaces the authoritative model and fans it out.
    fn replace(&mut self, model: A) {
        self.model = model;
        *self.snapshot.write() = self.model.clone();
        self.publisher.publish(&self.model);
    }

    fn enqueue(&mut self, push: bool) {
        let push = push || self.pending.as_ref().is_some_and(|p| p.push);
        self.pending = Some(PendingWrite {
            model: self.model.clone(),
            push,
        });
        self.deadline = Some(Instant::now() + self.debounce);
    }

    fn start_flush(&mut self) {
        let Some(write) = self.pending.take() else {
            self.deadline = None;
            return;
        };
        self.deadline = None;
        self.flushing = true;

        let cache = Arc::clone(&self.cache);
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let push = write.push;
            let ok = persist_blocking(cache, write.model).await;
            let _ = mailbox.send(Command::Flushed { ok, push });
        });
    }

    /// Writes the pending model immediately, skipping the debounce.
    async fn flush_now(&mut self) {
        self.deadline = None;
        if let Some(write) = self.pending.take() {
            persist_blocking(Arc::clone(&self.cache), write.model).await;
        }
    }
}

async fn persist_blocking<A: Archive>(cache: Arc<dyn LocalCache>, model: A) -> bool {
    let result = tokio::task::spawn_blocking(move || persist(cache.as_ref(), &model))
        .await
        .map_err(|e| SyncError::Io(std::io::Error::other(e)))
        .and_then(|r| r);

    match result {
        Ok(bytes) => {
            debug!(bytes, "local cache flushed");
            true
        }
        Err(error) => {
            warn!(%error, "local cache write failed");
            false
        }
    }
}

fn persist<A: Archive>(cache: &dyn LocalCache, model: &A) -> SyncResult<usize> {
    let bytes = Envelope::new(model.clone()).encode()?;
    cache.write_atomic(&bytes)?;
    Ok(bytes.len())
}
