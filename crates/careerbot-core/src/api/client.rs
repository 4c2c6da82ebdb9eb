use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use super::backend::{ChatBackend, FileUpload};
use super::error::{ApiError, ApiResult};
use super::types::{AskRequest, AskResponse, FilesResponse, HistoryResponse, UploadResponse};
use crate::BoxFuture;
use crate::config::ClientConfig;
use crate::conversation::Message;

const HISTORY_PATH: &str = "/api/history";
const ASK_PATH: &str = "/api/ask";
const UPLOAD_PATH: &str = "/api/upload";
const FILES_PATH: &str = "/api/files";

/// HTTP client for the answer service.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    history_url: String,
    ask_url: String,
    upload_url: String,
    files_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("CareerBot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            history_url: config.endpoint(HISTORY_PATH),
            ask_url: config.endpoint(ASK_PATH),
            upload_url: config.endpoint(UPLOAD_PATH),
            files_url: config.endpoint(FILES_PATH),
        })
    }
}

/// Turn non-success statuses into errors, keeping the body for diagnostics.
async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "(failed to read body)".to_string());
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

impl ChatBackend for ApiClient {
    fn fetch_history(&self, token: String) -> BoxFuture<'static, ApiResult<Vec<Message>>> {
        let http = self.http.clone();
        let url = self.history_url.clone();

        Box::pin(async move {
            let response = http.get(&url).bearer_auth(&token).send().await?;
            let response = check_status(response).await?;
            let history: HistoryResponse = response.json().await?;
            let messages = history.into_messages();
            debug!(count = messages.len(), "Fetched history");
            Ok(messages)
        })
    }

    fn ask(&self, token: String, question: String) -> BoxFuture<'static, ApiResult<String>> {
        let http = self.http.clone();
        let url = self.ask_url.clone();

        Box::pin(async move {
            debug!(question_len = question.len(), "Asking question");
            let response = http
                .post(&url)
                .bearer_auth(&token)
                .json(&AskRequest {
                    question: &question,
                })
                .send()
                .await?;
            let response = check_status(response).await?;
            let answer: AskResponse = response.json().await?;
            Ok(answer.answer)
        })
    }

    fn upload(&self, token: String, file: FileUpload) -> BoxFuture<'static, ApiResult<String>> {
        let http = self.http.clone();
        let url = self.upload_url.clone();

        Box::pin(async move {
            let size = file.bytes.len();
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name.clone())
                .mime_str(&file.mime)?;
            let form = Form::new().part("file", part);

            let response = http
                .post(&url)
                .bearer_auth(&token)
                .multipart(form)
                .send()
                .await?;
            let response = check_status(response).await?;
            let uploaded: UploadResponse = response.json().await?;

            info!(file = %file.file_name, size, "Uploaded file");
            Ok(uploaded.message)
        })
    }

    fn list_files(&self, token: String) -> BoxFuture<'static, ApiResult<Vec<String>>> {
        let http = self.http.clone();
        let url = self.files_url.clone();

        Box::pin(async move {
            let response = http.get(&url).bearer_auth(&token).send().await?;
            let response = check_status(response).await?;
            let files: FilesResponse = response.json().await?;
            Ok(files.files)
        })
    }
}
