use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use remindme_core::activation::DeliverySink;
use remindme_core::delivery::{ConfigPermission, FanoutSink, LogSink, TerminalSink};
use remindme_core::{ActivationEngine, Collaborators, Config, Event, ReminderDb};

use super::PositionArgs;

#[derive(Args)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub position: PositionArgs,
    /// Seconds between time-reminder checks (overrides engine.tick_interval_secs)
    #[arg(long)]
    pub tick_secs: Option<u64>,
    /// Firing margin in seconds (overrides engine.firing_margin_secs)
    #[arg(long)]
    pub margin_secs: Option<u64>,
    /// Seconds between readings of a fixed --at position
    #[arg(long, default_value = "10")]
    pub sample_secs: u64,
    /// Stop after this many seconds
    #[arg(long)]
    pub for_secs: Option<u64>,
    /// Only print events; do not show fired reminders on the terminal
    #[arg(long)]
    pub quiet: bool,
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "could not serialize event"),
    }
}

pub fn run(args: MonitorArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut engine_config = config.engine_config();
    if let Some(secs) = args.tick_secs {
        engine_config.tick_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = args.margin_secs {
        engine_config.firing_margin = Duration::from_secs(secs);
    }

    let positions = args
        .position
        .source(Duration::from_secs(args.sample_secs.max(1)))?;
    let mut sinks: Vec<Arc<dyn DeliverySink>> = vec![Arc::new(LogSink)];
    if !args.quiet {
        sinks.push(Arc::new(TerminalSink::with_writer(
            std::io::stderr(),
            config.notifications.sound,
        )));
    }

    let collaborators = Collaborators {
        positions,
        snapshots: Arc::new(ReminderDb::open()?),
        permissions: Arc::new(ConfigPermission::from_config(&config)),
        delivery: Arc::new(FanoutSink::new(sinks)),
    };
    let mut engine = ActivationEngine::new(engine_config, collaborators);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        if let Some(event) = engine.start().await? {
            print_event(&event);
        }

        let for_secs = args.for_secs;
        let shutdown = async move {
            match for_secs {
                Some(secs) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                    }
                }
                None => {
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        };
        engine.run_until(shutdown, print_event).await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}
