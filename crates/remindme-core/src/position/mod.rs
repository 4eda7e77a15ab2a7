//! Location sensor abstraction.
//!
//! A [`PositionSource`] supplies position samples; it never decides
//! anything about reminders. Two access patterns exist:
//!
//! - a one-shot [`PositionSource::current_position`] with a timeout, and
//! - a continuous [`PositionSource::watch_position`] returning a cancellable
//!   [`PositionSubscription`].
//!
//! Retrying after a timeout is the caller's business; see [`retry`].

mod replay;
pub mod retry;
mod source;
mod subscription;

pub use replay::{FixedSource, ReplaySource, SensorFault, TrackPoint};
pub use retry::{current_position_with_retry, RetryPolicy};
pub use source::{PositionError, PositionOptions, PositionSample, PositionSource};
pub use subscription::{PositionFeed, PositionSubscription, SensorGuard};
