pub mod transcript_exporter;

pub use transcript_exporter::{ExportError, ExportFormat, export_transcript, render_transcript};
