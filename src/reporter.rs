use bytesize::ByteSize;

use crate::events::{Event, EventSink};
use crate::stats::RunStatistics;

/// Reporter aggregates events and produces human or JSON output.
pub struct Reporter {
    events: Vec<Event>,
    json_mode: bool,
    #[cfg(feature = "cli")]
    progress: Option<indicatif::ProgressBar>,
}

impl Reporter {
    pub fn new(json_mode: bool) -> Self {
        Self {
            events: Vec::new(),
            json_mode,
            #[cfg(feature = "cli")]
            progress: None,
        }
    }

    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[cfg(feature = "cli")]
    fn track(&mut self, event: &Event) {
        match event {
            Event::RunStarted { total_files, .. } if !self.json_mode => {
                let bar = indicatif::ProgressBar::new(*total_files as u64);
                bar.set_style(
                    indicatif::ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}")
                        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
                );
                self.progress = Some(bar);
            }
            Event::FileMoved { source, .. } | Event::FileSkipped { path: source } | Event::FileFailed { path: source, .. } => {
                if let Some(bar) = &self.progress {
                    bar.set_message(source.display().to_string());
                    bar.inc(1);
                }
            }
            Event::RunCompleted { .. } | Event::RunCancelled { .. } => {
                if let Some(bar) = self.progress.take() {
                    bar.finish_and_clear();
                }
            }
            _ => {}
        }
    }

    /// Human-readable run summary.
    pub fn summary(stats: &RunStatistics) -> String {
        let mut out = format!(
            "{} of {} files processed: {} moved ({}), {} left in place, {} failed in {}",
            stats.processed_files,
            stats.total_files,
            stats.moved_files,
            ByteSize::b(stats.bytes_moved),
            stats.skipped_files,
            stats.errors.len(),
            humantime::format_duration(round_to_millis(stats.active_duration())),
        );
        if !stats.paused.is_zero() {
            out.push_str(&format!(
                " (paused {})",
                humantime::format_duration(round_to_millis(stats.paused))
            ));
        }
        for err in &stats.errors {
            out.push_str(&format!("\n  {}: {}", err.path.display(), err.message));
        }
        out
    }
}

fn round_to_millis(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(d.as_millis() as u64)
}

impl EventSink for Reporter {
    fn record(&mut self, event: Event) {
        if self.json_mode {
            // Emit JSON line to stdout
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{}", line);
            }
        }
        #[cfg(feature = "cli")]
        self.track(&event);
        self.events.push(event);
    }
}
