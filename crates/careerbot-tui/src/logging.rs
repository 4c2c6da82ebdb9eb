use std::collections::HashMap;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tracing::{
    Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const STATUS_CHANNEL_CAPACITY: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLevel {
    Warning,
    Error,
}

/// A WARN or ERROR event, condensed for the status line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    pub level: StatusLevel,
    pub text: String,
}

struct FieldVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: HashMap::new(),
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let value = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), value.to_string());
        }
    }
}

/// Forwards WARN and ERROR events to the UI so failures are visible while
/// the log itself goes to a file.
pub struct StatusLayer {
    sender: Sender<StatusEntry>,
}

impl StatusLayer {
    pub fn new() -> (Self, Receiver<StatusEntry>) {
        let (tx, rx) = channel(STATUS_CHANNEL_CAPACITY);
        (Self { sender: tx }, rx)
    }
}

impl<S> Layer<S> for StatusLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let level = match *event.metadata().level() {
            Level::ERROR => StatusLevel::Error,
            Level::WARN => StatusLevel::Warning,
            _ => return,
        };

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        let message = visitor.message.unwrap_or_default();
        let text = match visitor.fields.get("error") {
            Some(error) => format!("{message}: {error}"),
            None => message,
        };

        // Drop when full rather than block the emitting task
        let _ = self.sender.try_send(StatusEntry { level, text });
    }
}

pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("careerbot")
        .join("careerbot.log")
}

/// Install the global subscriber: an `EnvFilter` (default `info`), a plain
/// fmt layer appending to `log_path`, and the [`StatusLayer`].
pub fn init(log_path: &Path) -> Result<Receiver<StatusEntry>> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (status_layer, status_rx) = StatusLayer::new();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(status_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(status_rx)
}
