use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "remindme", version, about = "RemindMe CLI: location and time reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reminder management
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Distance and geofence calculations
    Geo {
        #[command(subcommand)]
        action: commands::geo::GeoAction,
    },
    /// Take one position reading and show distances to active reminders
    Locate(commands::locate::LocateArgs),
    /// Run the activation engine until Ctrl-C or the position feed ends
    Monitor(commands::monitor::MonitorArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Monitor(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Reminder { action } => commands::reminder::run(action),
        Commands::Geo { action } => commands::geo::run(action),
        Commands::Locate(args) => commands::locate::run(args),
        Commands::Monitor(args) => commands::monitor::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
