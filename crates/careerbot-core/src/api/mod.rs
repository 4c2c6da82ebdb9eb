pub mod backend;
pub mod client;
pub mod error;
pub mod types;

pub use backend::{ChatBackend, FileUpload};
pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use types::{AskRequest, AskResponse, FilesResponse, HistoryEntry, HistoryResponse};
