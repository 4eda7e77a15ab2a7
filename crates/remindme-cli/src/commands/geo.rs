use clap::Subcommand;
use remindme_core::{distance_meters, format_distance, is_within_radius, Location};

#[derive(Subcommand)]
pub enum GeoAction {
    /// Great-circle distance between two points
    Distance {
        /// First point as "lat,lon"
        #[arg(allow_hyphen_values = true)]
        from: String,
        /// Second point as "lat,lon"
        #[arg(allow_hyphen_values = true)]
        to: String,
    },
    /// Whether a point lies inside a circular geofence
    Within {
        /// Geofence center as "lat,lon"
        #[arg(allow_hyphen_values = true)]
        center: String,
        /// Point to test as "lat,lon"
        #[arg(allow_hyphen_values = true)]
        target: String,
        /// Radius in meters
        radius: f64,
    },
}

pub fn run(action: GeoAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        GeoAction::Distance { from, to } => {
            let from = Location::parse(&from)?;
            let to = Location::parse(&to)?;
            let meters = distance_meters(&from, &to);
            println!("{} ({meters} m)", format_distance(meters));
        }
        GeoAction::Within {
            center,
            target,
            radius,
        } => {
            let center = Location::parse(&center)?;
            let target = Location::parse(&target)?;
            let meters = distance_meters(&center, &target);
            let verdict = if is_within_radius(&center, &target, radius) {
                "inside"
            } else {
                "outside"
            };
            println!(
                "{verdict}: {} from center, radius {}",
                format_distance(meters),
                format_distance(radius)
            );
        }
    }
    Ok(())
}
