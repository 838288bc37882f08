//! Subscriber fan-out.
//!
//! The engine actor owns a [`Publisher`] holding the live subscriber list.
//! Deliveries themselves run on one dedicated dispatcher thread, so every
//! subscriber sees updates in the same order regardless of which event
//! produced them.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tokio::sync::{oneshot, watch};
use tracing::{trace, warn};

/// Name of the dispatcher thread.
pub const DISPATCHER_THREAD: &str = "keepsake-fanout";

/// Delivery callback.
pub type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Handle returned by [`subscribe`](crate::SyncEngine::subscribe).
///
/// Deliveries stop once the handle is dropped or cancelled; the engine
/// forgets it on its next fan-out.
#[derive(Debug)]
#[must_use = "dropping the subscription stops deliveries"]
pub struct Subscription {
    live: Arc<AtomicBool>,
}

impl Subscription {
    pub(crate) fn new(live: Arc<AtomicBool>) -> Self {
        Self { live }
    }

    /// Stops deliveries without dropping the handle.
    pub fn cancel(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Returns true until the subscription is cancelled.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub(crate) struct Subscriber<A> {
    live: Arc<AtomicBool>,
    callback: Callback<A>,
}

impl<A> Subscriber<A> {
    pub(crate) fn new(callback: Callback<A>) -> (Self, Subscription) {
        let live = Arc::new(AtomicBool::new(true));
        let handle = Subscription::new(Arc::clone(&live));
        (Self { live, callback }, handle)
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl<A> Clone for Subscriber<A> {
    fn clone(&self) -> Self {
        Self {
            live: Arc::clone(&self.live),
            callback: Arc::clone(&self.callback),
        }
    }
}

enum Job<A> {
    Replay {
        model: A,
        target: Subscriber<A>,
        done: oneshot::Sender<()>,
    },
    Deliver {
        model: A,
        targets: Vec<Subscriber<A>>,
    },
}

/// Live subscriber list plus the sending half of the dispatcher.
pub(crate) struct Publisher<A> {
    subscribers: Vec<Subscriber<A>>,
    jobs: mpsc::Sender<Job<A>>,
}

impl<A: Clone + Send + 'static> Publisher<A> {
    /// Starts the dispatcher thread. Each completed fan-out bumps `emissions`.
    pub(crate) fn spawn(emissions: watch::Sender<u64>) -> std::io::Result<Self> {
        let (jobs, rx) = mpsc::channel::<Job<A>>();
        thread::Builder::new()
            .name(DISPATCHER_THREAD.into())
            .spawn(move || dispatch(rx, emissions))?;
        Ok(Self {
            subscribers: Vec::new(),
            jobs,
        })
    }

    /// Adds a subscriber and queues the replay of `model` to it.
    pub(crate) fn add(
        &mut self,
        subscriber: Subscriber<A>,
        model: A,
        done: oneshot::Sender<()>,
    ) {
        self.subscribers.push(subscriber.clone());
        let _ = self.jobs.send(Job::Replay {
            model,
            target: subscriber,
            done,
        });
    }

    /// Fans `model` out to every live subscriber, pruning dead ones first.
    pub(crate) fn publish(&mut self, model: &A) {
        self.prune();
        let _ = self.jobs.send(Job::Deliver {
            model: model.clone(),
            targets: self.subscribers.clone(),
        });
    }

    /// Drops dead subscribers and returns how many remain.
    pub(crate) fn prune(&mut self) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(Subscriber::is_live);
        let pruned = before - self.subscribers.len();
        if pruned > 0 {
            trace!(pruned, live = self.subscribers.len(), "pruned dead subscribers");
        }
        self.subscribers.len()
    }
}

fn dispatch<A>(jobs: mpsc::Receiver<Job<A>>, emissions: watch::Sender<u64>) {
    for job in jobs {
        match job {
            Job::Replay {
                model,
                target,
                done,
            } => {
                deliver(&target, &model);
                let _ = done.send(());
            }
            Job::Deliver { model, targets } => {
                for target in &targets {
                    deliver(target, &model);
                }
                emissions.send_modify(|count| *count = count.wrapping_add(1));
            }
        }
    }
    trace!("dispatcher stopped");
}

fn deliver<A>(target: &Subscriber<A>, model: &A) {
    if !target.is_live() {
        return;
    }
    let callback = target.callback.as_ref();
    if panic::catch_unwind(AssertUnwindSafe(|| callback(model))).is_err() {
        warn!("subscriber panicked during delivery");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder() -> (Callback<u32>, Arc<Mutex<Vec<(String, u32)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: Callback<u32> = Arc::new(move |value: &u32| {
            let name = thread::current().name().unwrap_or_default().to_string();
            sink.lock().push((name, *value));
        });
        (callback, seen)
    }

    async fn subscribe(
        publisher: &mut Publisher<u32>,
        callback: Callback<u32>,
        model: u32,
    ) -> Subscription {
        let (subscriber, handle) = Subscriber::new(callback);
        let (done, wait) = oneshot::channel();
        publisher.add(subscriber, model, done);
        wait.await.unwrap();
        handle
    }

    #[tokio::test]
    async fn replay_then_deliver_on_dispatcher_thread() {
        let (emissions, mut counter) = watch::channel(0u64);
        let mut publisher = Publisher::spawn(emissions).unwrap();
        let (callback, seen) = recorder();

        let _handle = subscribe(&mut publisher, callback, 7).await;
        assert_eq!(*seen.lock(), vec![(DISPATCHER_THREAD.to_string(), 7)]);
        // replays are not emissions
        assert_eq!(*counter.borrow_and_update(), 0);

        publisher.publish(&8);
        counter.changed().await.unwrap();
        assert_eq!(*counter.borrow(), 1);
        assert_eq!(seen.lock().last().unwrap().1, 8);
    }

    #[tokio::test]
    async fn dead_handles_are_pruned() {
        let (emissions, mut counter) = watch::channel(0u64);
        let mut publisher = Publisher::spawn(emissions).unwrap();
        let (first, first_seen) = recorder();
        let (second, second_seen) = recorder();

        let kept = subscribe(&mut publisher, first, 1).await;
        let dropped = subscribe(&mut publisher, second, 1).await;
        assert_eq!(publisher.prune(), 2);

        drop(dropped);
        publisher.publish(&2);
        counter.changed().await.unwrap();

        assert_eq!(publisher.prune(), 1);
        assert_eq!(first_seen.lock().len(), 2);
        assert_eq!(second_seen.lock().len(), 1);

        kept.cancel();
        assert!(!kept.is_live());
        assert_eq!(publisher.prune(), 0);
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_stop_dispatch() {
        let (emissions, mut counter) = watch::channel(0u64);
        let mut publisher = Publisher::spawn(emissions).unwrap();
        let (callback, seen) = recorder();

        let bad: Callback<u32> = Arc::new(|value: &u32| {
            if *value == 2 {
                panic!("boom");
            }
        });
        let _bad = subscribe(&mut publisher, bad, 1).await;
        let _good = subscribe(&mut publisher, callback, 1).await;

        publisher.publish(&2);
        publisher.publish(&3);
        counter.wait_for(|n| *n >= 2).await.unwrap();

        let values: Vec<u32> = seen.lock().iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
