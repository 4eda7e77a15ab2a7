//! Reference position sources.
//!
//! [`ReplaySource`] plays back a recorded track, which is how the CLI and
//! the integration tests stand in for a real sensor. [`FixedSource`] always
//! reports the same place.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    PositionError, PositionOptions, PositionSample, PositionSource, PositionSubscription,
    SensorGuard,
};
use crate::error::CoreError;
use crate::geo::Location;

/// A sensor failure recorded in a track file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorFault {
    PermissionDenied,
    Unavailable,
    Timeout,
    Unknown,
}

impl From<SensorFault> for PositionError {
    fn from(fault: SensorFault) -> Self {
        match fault {
            SensorFault::PermissionDenied => PositionError::PermissionDenied,
            SensorFault::Unavailable => PositionError::Unavailable,
            SensorFault::Timeout => PositionError::Timeout,
            SensorFault::Unknown => PositionError::Unknown("recorded sensor fault".into()),
        }
    }
}

/// One entry of a recorded track.
///
/// ```json
/// [
///   { "latitude": 40.7128, "longitude": -74.0060 },
///   { "error": "timeout", "delay_ms": 2000 },
///   { "latitude": 40.7130, "longitude": -74.0062, "delay_ms": 5000 }
/// ]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackPoint {
    Fault {
        error: SensorFault,
        #[serde(default)]
        delay_ms: u64,
    },
    Sample {
        latitude: f64,
        longitude: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accuracy_m: Option<f64>,
        #[serde(default)]
        delay_ms: u64,
    },
}

impl TrackPoint {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        TrackPoint::Sample {
            latitude,
            longitude,
            accuracy_m: None,
            delay_ms: 0,
        }
    }

    pub fn fault(error: SensorFault) -> Self {
        TrackPoint::Fault { error, delay_ms: 0 }
    }

    pub fn after(self, delay: Duration) -> Self {
        let delay_ms = delay.as_millis() as u64;
        match self {
            TrackPoint::Fault { error, .. } => TrackPoint::Fault { error, delay_ms },
            TrackPoint::Sample {
                latitude,
                longitude,
                accuracy_m,
                ..
            } => TrackPoint::Sample {
                latitude,
                longitude,
                accuracy_m,
                delay_ms,
            },
        }
    }

    fn delay(&self) -> Duration {
        match self {
            TrackPoint::Fault { delay_ms, .. } | TrackPoint::Sample { delay_ms, .. } => {
                Duration::from_millis(*delay_ms)
            }
        }
    }

    fn reading(&self) -> Result<PositionSample, PositionError> {
        match self {
            TrackPoint::Fault { error, .. } => Err((*error).into()),
            TrackPoint::Sample {
                latitude,
                longitude,
                accuracy_m,
                ..
            } => Ok(PositionSample {
                accuracy_m: *accuracy_m,
                ..PositionSample::new(Location::new(*latitude, *longitude))
            }),
        }
    }
}

/// Plays back a recorded track.
///
/// One-shot reads walk the track with a cursor (each read consumes one
/// point, the last point repeats). Every watch replays the whole track from
/// the start, honouring each point's delay; a non-transient fault ends that
/// feed after it has been delivered.
pub struct ReplaySource {
    track: Arc<Vec<TrackPoint>>,
    cursor: AtomicUsize,
    active_watches: Arc<AtomicUsize>,
}

impl ReplaySource {
    pub fn new(track: Vec<TrackPoint>) -> Self {
        Self {
            track: Arc::new(track),
            cursor: AtomicUsize::new(0),
            active_watches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Load a JSON track file (an array of [`TrackPoint`]s).
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let track: Vec<TrackPoint> = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), points = track.len(), "loaded position track");
        Ok(Self::new(track))
    }

    pub fn len(&self) -> usize {
        self.track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }

    /// Number of watch feeds currently holding the sensor.
    pub fn active_watches(&self) -> usize {
        self.active_watches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionSource for ReplaySource {
    async fn read_position(&self, _opts: &PositionOptions) -> Result<PositionSample, PositionError> {
        let last = match self.track.len().checked_sub(1) {
            Some(last) => last,
            None => return Err(PositionError::Unavailable),
        };
        let index = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1).min(last)))
            .unwrap_or(last);
        let point = &self.track[index];
        tokio::time::sleep(point.delay()).await;
        point.reading()
    }

    fn watch_position(&self, _opts: &PositionOptions) -> PositionSubscription {
        let track = Arc::clone(&self.track);
        let active = Arc::clone(&self.active_watches);
        active.fetch_add(1, Ordering::SeqCst);
        // Acquired here so a feed aborted before its first poll still releases.
        let guard = SensorGuard::new(move || {
            active.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!("replay sensor released");
        });
        PositionSubscription::spawn(move |feed| async move {
            let _guard = guard;
            for point in track.iter() {
                tokio::time::sleep(point.delay()).await;
                match point.reading() {
                    Ok(sample) => {
                        if !feed.send(sample).await {
                            return;
                        }
                    }
                    Err(error) => {
                        let terminal = !error.is_transient();
                        if !feed.fail(error).await || terminal {
                            return;
                        }
                    }
                }
            }
        })
    }
}

/// Always reports the same location. Watching emits it every `interval`.
pub struct FixedSource {
    reading: Result<Location, PositionError>,
    interval: Duration,
}

impl FixedSource {
    pub fn new(location: Location, interval: Duration) -> Self {
        Self {
            reading: Ok(location),
            interval,
        }
    }

    /// A source whose every reading fails with `error`.
    pub fn failing(error: PositionError, interval: Duration) -> Self {
        Self {
            reading: Err(error),
            interval,
        }
    }

    fn sample(&self) -> Result<PositionSample, PositionError> {
        self.reading.clone().map(PositionSample::new)
    }
}

#[async_trait]
impl PositionSource for FixedSource {
    async fn read_position(&self, _opts: &PositionOptions) -> Result<PositionSample, PositionError> {
        self.sample()
    }

    fn watch_position(&self, _opts: &PositionOptions) -> PositionSubscription {
        let reading = self.sample();
        let interval = self.interval;
        PositionSubscription::spawn(move |feed| async move {
            loop {
                match &reading {
                    Ok(sample) => {
                        if !feed.send(sample.clone()).await {
                            return;
                        }
                    }
                    Err(e) => {
                        let terminal = !e.is_transient();
                        if !feed.fail(e.clone()).await || terminal {
                            return;
                        }
                    }
                }
                tokio::time::sleep(interval).await;
            }
        })
    }
}
