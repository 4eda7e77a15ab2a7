//! Reference delivery sinks and permission brokers.
//!
//! Every sink implements [`DeliverySink`](crate::activation::DeliverySink);
//! the engine does not know which one it talks to.

mod permission;
mod sinks;

pub use permission::{ConfigPermission, StaticPermission};
pub use sinks::{FanoutSink, LogSink, MemorySink, TerminalSink};
