use chrono::{DateTime, Utc};
use tokio::time::{Interval, MissedTickBehavior};

use crate::position::{PositionError, PositionSample, PositionSubscription};

/// Resources held while monitoring. Dropping the session releases them:
/// the position feed is cancelled and the ticker stops.
pub(crate) struct MonitoringSession {
    subscription: PositionSubscription,
    ticker: Interval,
    pub(crate) started_at: DateTime<Utc>,
}

/// The next thing the engine has to react to.
pub(crate) enum Input {
    Tick,
    Position(Option<Result<PositionSample, PositionError>>),
}

impl MonitoringSession {
    pub(crate) fn new(subscription: PositionSubscription, period: std::time::Duration) -> Self {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            subscription,
            ticker,
            started_at: Utc::now(),
        }
    }

    /// Wait for a tick or a position feed item, ticks first when both are ready.
    pub(crate) async fn next_input(&mut self) -> Input {
        tokio::select! {
            biased;
            _ = self.ticker.tick() => Input::Tick,
            item = self.subscription.next() => Input::Position(item),
        }
    }
}

impl Drop for MonitoringSession {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}
