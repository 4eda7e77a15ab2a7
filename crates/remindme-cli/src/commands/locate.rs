use std::time::Duration;

use clap::Args;
use remindme_core::position::current_position_with_retry;
use remindme_core::{
    distance_meters, format_distance, Config, PositionSample, ReminderDb, ReminderFilter,
};
use serde::Serialize;

use super::PositionArgs;

#[derive(Args)]
pub struct LocateArgs {
    #[command(flatten)]
    pub position: PositionArgs,
}

#[derive(Serialize)]
struct NearbyReminder {
    id: String,
    title: String,
    distance_m: f64,
    distance: String,
    radius_m: f64,
    inside: bool,
}

#[derive(Serialize)]
struct LocateOutput {
    sample: PositionSample,
    reminders: Vec<NearbyReminder>,
}

pub fn run(args: LocateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = ReminderDb::open()?;
    let source = args.position.source(Duration::from_secs(1))?;

    let rt = tokio::runtime::Runtime::new()?;
    let sample = rt.block_on(current_position_with_retry(
        source.as_ref(),
        &config.position_options(),
        &config.retry_policy(),
    ))?;

    let mut nearby: Vec<NearbyReminder> = db
        .list(&ReminderFilter::active())?
        .iter()
        .filter_map(|r| {
            let (center, radius_m) = r.geofence()?;
            let distance_m = distance_meters(center, &sample.location);
            Some(NearbyReminder {
                id: r.id.clone(),
                title: r.title.clone(),
                distance_m,
                distance: format_distance(distance_m),
                radius_m,
                inside: distance_m <= radius_m,
            })
        })
        .collect();
    nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

    let output = LocateOutput {
        sample,
        reminders: nearby,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
