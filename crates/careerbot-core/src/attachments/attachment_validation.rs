//! Checks applied to a file before it is attached to the conversation.

use std::path::Path;

use thiserror::Error;

pub const MAX_FILE_SIZE: u64 = 5_242_880; // 5MB
pub const PDF_EXTENSION: &str = "pdf";

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file is {size} bytes, the limit is {max}")]
    TooLarge { size: u64, max: u64 },

    #[error("not a regular file: {0}")]
    NotAFile(String),

    #[error("failed to read attachment: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate existence and size, returning the file size.
pub async fn validate_attachment(path: &Path) -> Result<u64, AttachmentError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| AttachmentError::NotFound(path.display().to_string()))?;

    if !metadata.is_file() {
        return Err(AttachmentError::NotAFile(path.display().to_string()));
    }

    let size = metadata.len();
    if size > MAX_FILE_SIZE {
        return Err(AttachmentError::TooLarge {
            size,
            max: MAX_FILE_SIZE,
        });
    }
    Ok(size)
}

pub fn is_pdf_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(PDF_EXTENSION))
}

/// PDF by extension or by the `%PDF` header.
pub fn is_pdf(path: &Path, bytes: &[u8]) -> bool {
    is_pdf_extension(path) || bytes.starts_with(PDF_MAGIC)
}

/// Content type sent with an upload, guessed from the extension.
pub fn mime_for(path: &Path, is_pdf: bool) -> &'static str {
    if is_pdf {
        return "application/pdf";
    }
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn create_test_file(path: &Path, size: u64) -> std::io::Result<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(&vec![0u8; size as usize])?;
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_file_at_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        create_test_file(&path, MAX_FILE_SIZE).unwrap();

        assert_eq!(validate_attachment(&path).await.unwrap(), MAX_FILE_SIZE);
    }

    #[tokio::test]
    async fn test_validate_file_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.pdf");
        create_test_file(&path, MAX_FILE_SIZE + 1).unwrap();

        assert!(matches!(
            validate_attachment(&path).await,
            Err(AttachmentError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_attachment(&dir.path().join("nope.pdf")).await,
            Err(AttachmentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_attachment(dir.path()).await,
            Err(AttachmentError::NotAFile(_))
        ));
    }

    #[test]
    fn test_pdf_detection() {
        assert!(is_pdf(Path::new("cv.PDF"), b""));
        assert!(is_pdf(Path::new("cv.bin"), b"%PDF-1.7"));
        assert!(!is_pdf(Path::new("notes.txt"), b"hello"));
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(mime_for(Path::new("cv.bin"), true), "application/pdf");
        assert_eq!(mime_for(Path::new("notes.TXT"), false), "text/plain");
        assert_eq!(mime_for(Path::new("blob"), false), "application/octet-stream");
    }
}
