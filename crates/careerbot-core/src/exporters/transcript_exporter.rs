use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::conversation::Message;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write transcript: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize transcript: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Output format of a transcript export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Text => "chat-history.txt",
            Self::Markdown => "chat-history.md",
            Self::Json => "chat-history.json",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Text => Self::Markdown,
            Self::Markdown => Self::Json,
            Self::Json => Self::Text,
        }
    }
}

#[derive(Serialize)]
struct JsonTranscript<'a> {
    exported_at: String,
    messages: &'a [Message],
}

/// Render the transcript in `format`. Pure; see [`export_transcript`] for
/// writing it out.
pub fn render_transcript(messages: &[Message], format: ExportFormat) -> Result<String, ExportError> {
    let rendered = match format {
        ExportFormat::Text => messages
            .iter()
            .map(|m| format!("{}: {}", m.sender.label(), m.text))
            .collect::<Vec<_>>()
            .join("\n"),
        ExportFormat::Markdown => {
            let mut out = String::from("# CareerBot conversation\n");
            for message in messages {
                out.push_str(&format!("\n**{}:** {}\n", message.sender.label(), message.text));
            }
            out
        }
        ExportFormat::Json => serde_json::to_string_pretty(&JsonTranscript {
            exported_at: Utc::now().to_rfc3339(),
            messages,
        })?,
    };
    Ok(rendered)
}

/// Write the transcript into `dir` and return the written path.
///
/// The file is written to a temporary sibling first and renamed into place,
/// so an interrupted export never leaves a truncated file behind.
pub async fn export_transcript(
    messages: &[Message],
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let content = render_transcript(messages, format)?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format.file_name());
    let temp_path = path.with_extension(format!("{}.tmp", std::process::id()));
    tokio::fs::write(&temp_path, &content).await?;
    tokio::fs::rename(&temp_path, &path).await?;

    info!(path = %path.display(), entries = messages.len(), "Exported transcript");
    Ok(path)
}
