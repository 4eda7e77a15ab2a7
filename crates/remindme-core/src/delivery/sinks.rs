use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::activation::{DeliveryCapabilities, DeliveryError, DeliverySink};
use crate::events::FireTrigger;
use crate::geo::format_distance;
use crate::reminder::Reminder;

/// Render a fired reminder the way the terminal shows it.
fn render(reminder: &Reminder, trigger: &FireTrigger) -> String {
    let mut out = format!("📍 {}\n", reminder.title);
    if !reminder.description.is_empty() {
        out.push_str(&format!("   {}\n", reminder.description));
    }
    match trigger {
        FireTrigger::Location { distance_m } => {
            out.push_str(&format!("   {} from the spot\n", format_distance(*distance_m)));
        }
        FireTrigger::Time { scheduled_for, .. } => {
            out.push_str(&format!(
                "   scheduled for {}\n",
                scheduled_for.format("%Y-%m-%d %H:%M UTC")
            ));
        }
    }
    out
}

/// Prints fired reminders to a writer, stdout by default.
pub struct TerminalSink<W = Stdout> {
    out: Mutex<W>,
    bell: bool,
}

impl TerminalSink<Stdout> {
    pub fn stdout(bell: bool) -> Self {
        Self::with_writer(io::stdout(), bell)
    }
}

impl<W: Write + Send + 'static> TerminalSink<W> {
    pub fn with_writer(out: W, bell: bool) -> Self {
        Self {
            out: Mutex::new(out),
            bell,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, text: &str) -> io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("terminal writer poisoned"))?;
        if self.bell {
            out.write_all(b"\x07")?;
        }
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

#[async_trait]
impl<W: Write + Send + 'static> DeliverySink for TerminalSink<W> {
    fn name(&self) -> &str {
        "terminal"
    }

    fn capabilities(&self) -> DeliveryCapabilities {
        DeliveryCapabilities {
            sound: self.bell,
            ..DeliveryCapabilities::default()
        }
    }

    async fn present(&self, reminder: &Reminder, trigger: &FireTrigger) -> Result<(), DeliveryError> {
        self.write(&render(reminder, trigger))
            .map_err(|e| DeliveryError::Failed {
                sink: self.name().to_string(),
                message: e.to_string(),
            })
    }
}

/// Emits fired reminders as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl DeliverySink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn present(&self, reminder: &Reminder, trigger: &FireTrigger) -> Result<(), DeliveryError> {
        tracing::info!(
            reminder_id = %reminder.id,
            title = %reminder.title,
            category = %reminder.category,
            ?trigger,
            "reminder delivered"
        );
        Ok(())
    }
}

/// Presents to every inner sink. Fails only if all of them fail.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn DeliverySink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn DeliverySink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl DeliverySink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    fn capabilities(&self) -> DeliveryCapabilities {
        self.sinks
            .iter()
            .map(|s| s.capabilities())
            .fold(DeliveryCapabilities::default(), |acc, c| DeliveryCapabilities {
                sound: acc.sound || c.sound,
                vibration: acc.vibration || c.vibration,
                persistent: acc.persistent || c.persistent,
            })
    }

    async fn present(&self, reminder: &Reminder, trigger: &FireTrigger) -> Result<(), DeliveryError> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.present(reminder, trigger).await {
                tracing::debug!(sink = sink.name(), error = %e, "sink failed");
                failures.push(e.to_string());
            }
        }
        if !self.sinks.is_empty() && failures.len() == self.sinks.len() {
            return Err(DeliveryError::Failed {
                sink: self.name().to_string(),
                message: failures.join("; "),
            });
        }
        Ok(())
    }
}

/// Keeps delivered reminders in memory, for embedders that poll and for
/// tests.
#[derive(Default)]
pub struct MemorySink {
    presented: Mutex<Vec<(Reminder, FireTrigger)>>,
    fail: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `present` fail (after recording) until switched off.
    pub fn fail_deliveries(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn presented(&self) -> Vec<(Reminder, FireTrigger)> {
        self.lock().clone()
    }

    pub fn presented_ids(&self) -> Vec<String> {
        self.lock().iter().map(|(r, _)| r.id.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Reminder, FireTrigger)>> {
        self.presented
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DeliverySink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn present(&self, reminder: &Reminder, trigger: &FireTrigger) -> Result<(), DeliveryError> {
        self.lock().push((reminder.clone(), trigger.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::Failed {
                sink: self.name().to_string(),
                message: "delivery disabled".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Location;
    use crate::reminder::NewReminder;
    use chrono::{TimeZone, Utc};

    fn milk() -> Reminder {
        NewReminder::at_location("Buy milk", Location::new(1.0, 1.0), 100.0)
            .with_description("2 liters")
            .into_reminder("r1".into(), Utc::now())
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn terminal_sink_prints_pin_title_and_description() {
        let sink = TerminalSink::with_writer(Vec::new(), false);
        sink.present(&milk(), &FireTrigger::Location { distance_m: 42.0 })
            .await
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.starts_with("📍 Buy milk\n"));
        assert!(text.contains("   2 liters\n"));
        assert!(text.contains("42m from the spot"));
    }

    #[tokio::test]
    async fn terminal_sink_rings_bell_when_enabled() {
        let sink = TerminalSink::with_writer(Vec::new(), true);
        assert!(sink.capabilities().sound);
        let trigger = FireTrigger::Time {
            scheduled_for: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            late_by_ms: 0,
        };
        sink.present(&milk(), &trigger).await.unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.starts_with('\x07'));
        assert!(text.contains("scheduled for 2024-05-01 09:30 UTC"));
    }

    #[tokio::test]
    async fn terminal_sink_reports_write_errors() {
        let sink = TerminalSink::with_writer(BrokenWriter, false);
        let err = sink
            .present(&milk(), &FireTrigger::Location { distance_m: 1.0 })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("terminal"));
    }

    #[tokio::test]
    async fn fanout_fails_only_when_every_sink_fails() {
        let ok = Arc::new(MemorySink::new());
        let bad = Arc::new(MemorySink::new());
        bad.fail_deliveries(true);
        let sinks: Vec<Arc<dyn DeliverySink>> = vec![ok.clone(), bad.clone()];
        let fanout = FanoutSink::new(sinks);
        let trigger = FireTrigger::Location { distance_m: 3.0 };

        assert!(fanout.present(&milk(), &trigger).await.is_ok());
        assert_eq!(ok.presented_ids(), vec!["r1".to_string()]);
        assert_eq!(bad.presented_ids(), vec!["r1".to_string()]);

        ok.fail_deliveries(true);
        assert!(fanout.present(&milk(), &trigger).await.is_err());
    }

    #[tokio::test]
    async fn empty_fanout_succeeds() {
        let fanout = FanoutSink::new(Vec::new());
        assert!(fanout.is_empty());
        assert!(fanout
            .present(&milk(), &FireTrigger::Location { distance_m: 0.0 })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn log_sink_never_fails() {
        assert!(LogSink
            .present(&milk(), &FireTrigger::Location { distance_m: 0.0 })
            .await
            .is_ok());
    }
}
