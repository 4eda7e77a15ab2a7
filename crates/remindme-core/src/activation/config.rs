use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::position::PositionOptions;

/// Firing margin used where background timers only wake up every few minutes.
const COARSE_FIRING_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Tunables of the activation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How often time-based reminders are re-evaluated without a new sample.
    pub tick_interval: Duration,
    /// A due reminder still fires while `now - scheduled_time` is below this.
    pub firing_margin: Duration,
    /// Forget which reminders fired this session when monitoring stops.
    pub clear_notified_on_stop: bool,
    /// Options passed to the position watch.
    pub position: PositionOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(30),
            firing_margin: Duration::from_secs(60),
            clear_notified_on_stop: false,
            position: PositionOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with a widened firing margin, for platforms that schedule
    /// background work coarsely.
    pub fn coarse_background() -> Self {
        Self {
            firing_margin: COARSE_FIRING_MARGIN,
            ..Self::default()
        }
    }

    /// Tick period, never zero.
    pub(crate) fn tick_period(&self) -> Duration {
        self.tick_interval.max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.tick_interval, Duration::from_secs(30));
        assert_eq!(cfg.firing_margin, Duration::from_secs(60));
        assert!(!cfg.clear_notified_on_stop);
    }

    #[test]
    fn coarse_background_widens_margin_only() {
        let cfg = EngineConfig::coarse_background();
        assert_eq!(cfg.firing_margin, Duration::from_secs(300));
        assert_eq!(cfg.tick_interval, Duration::from_secs(30));
    }

    #[test]
    fn zero_tick_interval_is_clamped() {
        let cfg = EngineConfig {
            tick_interval: Duration::ZERO,
            ..EngineConfig::default()
        };
        assert!(cfg.tick_period() > Duration::ZERO);
    }
}
