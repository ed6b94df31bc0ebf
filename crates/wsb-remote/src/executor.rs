//! Sequential notification executor
//!
//! WAAPI transports may invoke subscription callbacks from any thread. The
//! engine requires one-at-a-time delivery in emit order, across all topics.
//! Every notification is queued on a single channel and handed to its sink by
//! one blocking worker, so handlers may themselves block on remote calls.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use wsb_core::{NotificationSink, RemoteEvent};

enum Job {
    Deliver(NotificationSink, RemoteEvent),
    Flush(oneshot::Sender<()>),
}

/// Single callback context shared by every subscription of a session
#[derive(Clone)]
pub struct SequentialExecutor {
    tx: mpsc::UnboundedSender<Job>,
}

impl SequentialExecutor {
    /// Start the worker on the current tokio runtime
    ///
    /// The worker exits once every clone of the executor has been dropped.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        Self::spawn_on(&Handle::current())
    }

    pub fn spawn_on(handle: &Handle) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = handle.spawn_blocking(move || {
            while let Some(job) = rx.blocking_recv() {
                match job {
                    Job::Deliver(sink, event) => sink(event),
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("notification executor stopped");
        });
        (SequentialExecutor { tx }, worker)
    }

    /// Queue an event for delivery; false once the worker has stopped
    pub fn dispatch(&self, sink: &NotificationSink, event: RemoteEvent) -> bool {
        let topic = event.topic();
        if self.tx.send(Job::Deliver(Arc::clone(sink), event)).is_err() {
            tracing::warn!(%topic, "notification dropped: executor stopped");
            return false;
        }
        true
    }

    /// Wrap a sink so that calls are routed through this executor
    pub fn wrap(&self, sink: NotificationSink) -> NotificationSink {
        let executor = self.clone();
        Arc::new(move |event| {
            executor.dispatch(&sink, event);
        })
    }

    /// Wait until everything queued before this call has been delivered
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Job::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}
