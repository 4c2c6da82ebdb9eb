use super::error::ApiResult;
use crate::BoxFuture;
use crate::conversation::Message;

/// A file ready to be sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// The remote answer service. Every call carries the caller's bearer token
/// and is attempted exactly once.
pub trait ChatBackend: Send + Sync + 'static {
    /// Prior transcript for the signed-in user; empty when there is none
    fn fetch_history(&self, token: String) -> BoxFuture<'static, ApiResult<Vec<Message>>>;

    /// Ask a question and get the answer text back
    fn ask(&self, token: String, question: String) -> BoxFuture<'static, ApiResult<String>>;

    /// Upload a document for the service to index
    fn upload(&self, token: String, file: FileUpload) -> BoxFuture<'static, ApiResult<String>>;

    /// Names of the documents the user has uploaded
    fn list_files(&self, token: String) -> BoxFuture<'static, ApiResult<Vec<String>>>;
}
