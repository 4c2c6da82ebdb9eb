pub mod attachment_validation;
pub mod preview;

use std::path::{Path, PathBuf};

use tracing::info;

pub use attachment_validation::{AttachmentError, MAX_FILE_SIZE, is_pdf, mime_for, validate_attachment};
pub use preview::{PREVIEW_CHARS, pdf_preview};

use crate::api::FileUpload;

/// A file the user picked, held in memory until it is uploaded or replaced.
#[derive(Clone, Debug)]
pub struct Attachment {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub is_pdf: bool,
    /// First characters of a PDF's raw bytes; `None` for other files.
    pub preview: Option<String>,
    bytes: Vec<u8>,
}

impl Attachment {
    pub fn mime(&self) -> &'static str {
        mime_for(&self.path, self.is_pdf)
    }

    pub fn to_upload(&self) -> FileUpload {
        FileUpload {
            file_name: self.file_name.clone(),
            mime: self.mime().to_string(),
            bytes: self.bytes.clone(),
        }
    }
}

/// Validate and read the file at `path`.
pub async fn load_attachment(path: &Path) -> Result<Attachment, AttachmentError> {
    let size = validate_attachment(path).await?;
    let bytes = tokio::fs::read(path).await?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let is_pdf = is_pdf(path, &bytes);
    let preview = is_pdf.then(|| pdf_preview(&bytes));

    info!(file = %file_name, size, is_pdf, "Attachment selected");
    Ok(Attachment {
        path: path.to_path_buf(),
        file_name,
        size,
        is_pdf,
        preview,
        bytes,
    })
}
