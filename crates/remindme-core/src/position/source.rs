use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::PositionSubscription;
use crate::geo::Location;

/// Why the sensor could not produce a sample.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionError {
    #[error("User denied the request for geolocation")]
    PermissionDenied,

    #[error("Location information is unavailable")]
    Unavailable,

    #[error("The request to get the user location timed out")]
    Timeout,

    #[error("Unknown location error: {0}")]
    Unknown(String),
}

impl PositionError {
    /// Only timeouts are worth waiting out; every other failure is final
    /// for the stream that produced it.
    pub fn is_transient(&self) -> bool {
        matches!(self, PositionError::Timeout)
    }
}

impl From<tokio::time::error::Elapsed> for PositionError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        PositionError::Timeout
    }
}

/// Sensor request options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOptions {
    /// Upper bound on a single one-shot read.
    pub timeout: Duration,
    /// Oldest cached fix the sensor may return. Zero forces a fresh fix.
    pub maximum_age: Duration,
    pub high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
            high_accuracy: true,
        }
    }
}

/// One reading from the sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSample {
    pub location: Location,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
}

impl PositionSample {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            timestamp: Utc::now(),
            accuracy_m: None,
        }
    }
}

/// A platform location sensor.
///
/// Implementors provide the raw read and the watch feed; the timeout on
/// one-shot reads is applied by [`current_position`](Self::current_position).
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Read one fresh sample, however long the sensor takes.
    async fn read_position(&self, opts: &PositionOptions) -> Result<PositionSample, PositionError>;

    /// Start an independent continuous feed.
    ///
    /// The feed must release the sensor when the subscription is cancelled
    /// or dropped, and when the feed itself ends.
    fn watch_position(&self, opts: &PositionOptions) -> PositionSubscription;

    /// One-shot fetch bounded by `opts.timeout`.
    async fn current_position(
        &self,
        opts: &PositionOptions,
    ) -> Result<PositionSample, PositionError> {
        tokio::time::timeout(opts.timeout, self.read_position(opts)).await?
    }
}
