//! Retry with exponential backoff for one-shot position reads.
//!
//! Only timeouts are retried. A denied permission or a missing sensor will
//! not get better by waiting, so those return immediately. Watch feeds are
//! never retried here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{PositionError, PositionOptions, PositionSample, PositionSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt number `attempt + 1` (attempts count from 1).
    ///
    /// The product is clamped to `max_delay` before it becomes a `Duration`,
    /// so any attempt count is safe.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let multiplier = if self.multiplier.is_finite() {
            self.multiplier.max(1.0)
        } else {
            1.0
        };
        let cap = self.max_delay.as_secs_f64();
        let secs = self.initial_delay.as_secs_f64() * multiplier.powi(exponent);
        if secs.is_finite() && secs < cap {
            Duration::from_secs_f64(secs)
        } else {
            self.max_delay
        }
    }
}

/// `current_position`, retried with backoff while the sensor times out.
pub async fn current_position_with_retry(
    source: &dyn PositionSource,
    opts: &PositionOptions,
    policy: &RetryPolicy,
) -> Result<PositionSample, PositionError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match source.current_position(opts).await {
            Ok(sample) => return Ok(sample),
            Err(err) if err.is_transient() && attempt < attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    "position request timed out, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{ReplaySource, SensorFault, TrackPoint};

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(2), Duration::from_secs(10));
        assert_eq!(policy.delay_after(3), Duration::from_secs(20));
        assert_eq!(policy.delay_after(4), Duration::from_secs(30));
        assert_eq!(policy.delay_after(10), Duration::from_secs(30));
    }

    #[test]
    fn backoff_caps_for_large_attempt_counts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(70), Duration::from_secs(30));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(30));

        let runaway = RetryPolicy {
            multiplier: f64::INFINITY,
            ..RetryPolicy::default()
        };
        assert_eq!(runaway.delay_after(1), Duration::from_secs(5));
        assert_eq!(runaway.delay_after(3), Duration::from_secs(5));

        let nan = RetryPolicy {
            multiplier: f64::NAN,
            ..RetryPolicy::default()
        };
        assert_eq!(nan.delay_after(40), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn many_attempts_against_a_stuck_sensor_time_out_cleanly() {
        let source = ReplaySource::new(vec![TrackPoint::fault(SensorFault::Timeout)]);
        let policy = RetryPolicy {
            max_attempts: 70,
            ..RetryPolicy::default()
        };
        let started = tokio::time::Instant::now();
        let err = current_position_with_retry(&source, &PositionOptions::default(), &policy)
            .await
            .unwrap_err();
        assert_eq!(err, PositionError::Timeout);
        // 5 + 10 + 20, then 66 waits at the 30s cap.
        assert_eq!(started.elapsed(), Duration::from_secs(35 + 66 * 30));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_timeouts_until_success() {
        let source = ReplaySource::new(vec![
            TrackPoint::fault(SensorFault::Timeout),
            TrackPoint::fault(SensorFault::Timeout),
            TrackPoint::at(3.0, 4.0),
        ]);
        let started = tokio::time::Instant::now();
        let sample = current_position_with_retry(
            &source,
            &PositionOptions::default(),
            &RetryPolicy::default(),
        )
        .await
        .unwrap();
        assert_eq!(sample.location.latitude, 3.0);
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let source = ReplaySource::new(vec![TrackPoint::fault(SensorFault::Timeout)]);
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let err = current_position_with_retry(&source, &PositionOptions::default(), &policy)
            .await
            .unwrap_err();
        assert_eq!(err, PositionError::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn permission_denied_is_not_retried() {
        let source = ReplaySource::new(vec![
            TrackPoint::fault(SensorFault::PermissionDenied),
            TrackPoint::at(3.0, 4.0),
        ]);
        let started = tokio::time::Instant::now();
        let err = current_position_with_retry(
            &source,
            &PositionOptions::default(),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, PositionError::PermissionDenied);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
