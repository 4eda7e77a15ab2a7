//! Collaborators the activation engine talks to.
//!
//! The engine never touches storage, platform notification APIs, or the
//! permission dialog directly; it goes through these traits.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::FireTrigger;
use crate::position::PositionSource;
use crate::reminder::Reminder;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to fetch active reminders: {0}")]
    FetchFailed(String),

    #[error("Reminder '{0}' not found")]
    NotFound(String),

    #[error("Failed to persist reminder flag: {0}")]
    Storage(String),
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Delivery through '{sink}' failed: {message}")]
    Failed { sink: String, message: String },
}

/// Answer of the notification permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
    /// The platform has no notification facility at all.
    Unsupported,
}

/// What a delivery sink can do besides showing text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCapabilities {
    pub sound: bool,
    pub vibration: bool,
    /// Alert stays until dismissed.
    pub persistent: bool,
}

/// Source of the reminders the engine evaluates.
///
/// Owned by the persistence layer. The engine only reads from it, apart
/// from the two one-way flag writes.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// All reminders that are not completed, in a stable order.
    async fn active_reminders(&self) -> Result<Vec<Reminder>, SnapshotError>;

    /// Record that the location trigger fired.
    async fn mark_notified(&self, id: &str) -> Result<(), SnapshotError>;

    /// Record that the time trigger fired, so time logic skips it for good.
    async fn mark_time_activated(&self, id: &str) -> Result<(), SnapshotError>;
}

#[async_trait]
pub trait PermissionBroker: Send + Sync {
    async fn request_notification_permission(&self) -> Permission;
}

/// Shows a fired reminder to the user.
///
/// Best-effort: the engine logs a failure and moves on.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    fn capabilities(&self) -> DeliveryCapabilities {
        DeliveryCapabilities::default()
    }

    async fn present(&self, reminder: &Reminder, trigger: &FireTrigger)
        -> Result<(), DeliveryError>;
}

/// Everything an [`ActivationEngine`](super::ActivationEngine) needs from
/// the outside world.
#[derive(Clone)]
pub struct Collaborators {
    pub positions: Arc<dyn PositionSource>,
    pub snapshots: Arc<dyn SnapshotProvider>,
    pub permissions: Arc<dyn PermissionBroker>,
    pub delivery: Arc<dyn DeliverySink>,
}
