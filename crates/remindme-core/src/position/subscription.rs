//! Cancellable position feed.
//!
//! A subscription owns a spawned feed task and the receiving end of a
//! bounded channel. Cancelling (or dropping) the subscription aborts the
//! task; whatever [`SensorGuard`] the task holds is dropped with it, which
//! releases the sensor.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{PositionError, PositionSample};

/// Samples buffered between the feed and a slow subscriber.
const FEED_CAPACITY: usize = 16;

type FeedItem = Result<PositionSample, PositionError>;

/// Producer side of a subscription, handed to the feed task.
pub struct PositionFeed {
    tx: mpsc::Sender<FeedItem>,
}

impl PositionFeed {
    /// Deliver a sample. Returns `false` once the subscriber is gone.
    pub async fn send(&self, sample: PositionSample) -> bool {
        self.tx.send(Ok(sample)).await.is_ok()
    }

    /// Deliver a sensor error. Returns `false` once the subscriber is gone.
    pub async fn fail(&self, error: PositionError) -> bool {
        self.tx.send(Err(error)).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Handle to a running position feed.
pub struct PositionSubscription {
    rx: mpsc::Receiver<FeedItem>,
    task: Option<JoinHandle<()>>,
}

impl PositionSubscription {
    /// Spawn `producer` on the current runtime as the feed of a new subscription.
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(PositionFeed) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let task = tokio::spawn(producer(PositionFeed { tx }));
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Next sample or sensor error; `None` when the feed has ended or the
    /// subscription was cancelled.
    pub async fn next(&mut self) -> Option<FeedItem> {
        if self.task.is_none() {
            return None;
        }
        self.rx.recv().await
    }

    /// Stop the feed. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.rx.close();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for PositionSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs a release hook exactly once, when dropped.
pub struct SensorGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SensorGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for SensorGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
