pub mod config;
pub mod geo;
pub mod locate;
pub mod monitor;
pub mod reminder;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use remindme_core::position::{FixedSource, ReplaySource};
use remindme_core::{Location, PositionSource};

/// Where positions come from: a recorded track or a fixed spot.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PositionArgs {
    /// JSON track file to replay (array of samples and sensor faults)
    #[arg(long)]
    pub track: Option<PathBuf>,
    /// Fixed position as "lat,lon"
    #[arg(long, allow_hyphen_values = true)]
    pub at: Option<String>,
}

impl PositionArgs {
    /// Build the position source. `every` is how often a fixed position is
    /// reported while watching.
    pub fn source(
        &self,
        every: Duration,
    ) -> Result<Arc<dyn PositionSource>, Box<dyn std::error::Error>> {
        if let Some(path) = &self.track {
            return Ok(Arc::new(ReplaySource::load(path)?));
        }
        match &self.at {
            Some(at) => Ok(Arc::new(FixedSource::new(Location::parse(at)?, every))),
            None => Err("either --track or --at is required".into()),
        }
    }
}
