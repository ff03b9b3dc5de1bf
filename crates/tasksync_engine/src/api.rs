use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tasksync_core::{HistoryEntry, PrepareOptions, Task, TaskId};
use tasksync_logging::sync_debug;
use url::Url;

use crate::device::{DeviceId, DEVICE_ID_HEADER};
use crate::{ApiError, EngineEvent, FailureKind};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Root of the task API, including its `/api` prefix.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// The server's task endpoints. Every call carries the device identity.
#[async_trait::async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError>;

    async fn prepare(&self, url: &str, options: &PrepareOptions) -> Result<TaskId, ApiError>;

    /// `None` downloads every track.
    async fn start(&self, task_id: &str, selected_indices: Option<&[usize]>)
        -> Result<(), ApiError>;

    async fn cancel(&self, task_id: &str) -> Result<(), ApiError>;

    async fn delete(&self, task_id: &str) -> Result<(), ApiError>;

    /// Short-lived token authorizing one artifact download.
    async fn download_token(&self, task_id: &str) -> Result<String, ApiError>;

    async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError>;

    fn download_file_url(&self, task_id: &str, token: &str) -> String;
}

#[derive(Serialize)]
struct PrepareBody<'a> {
    url: &'a str,
    options: &'a PrepareOptions,
}

#[derive(Serialize)]
struct StartBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_indices: Option<&'a [usize]>,
}

#[derive(Deserialize)]
struct PrepareResponse {
    task_id: TaskId,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ReqwestTaskApi {
    client: reqwest::Client,
    base: Url,
    device_id: DeviceId,
}

impl ReqwestTaskApi {
    pub fn new(settings: &ApiSettings, device_id: DeviceId) -> Result<Self, ApiError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as an API root", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            base,
            device_id,
        })
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// `{base}/{segments...}`, each segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, segments: &[&str]) -> RequestBuilder {
        self.client
            .get(self.endpoint(segments))
            .header(DEVICE_ID_HEADER, self.device_id.as_str())
    }

    fn post_json<B: Serialize>(&self, segments: &[&str], body: &B) -> Result<RequestBuilder, ApiError> {
        let payload = serde_json::to_vec(body)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        Ok(self
            .client
            .post(self.endpoint(segments))
            .header(DEVICE_ID_HEADER, self.device_id.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(payload))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        let detail = error_detail(&body).unwrap_or_else(|| status.to_string());
        Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), detail))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl TaskApi for ReqwestTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.send_json(self.get(&["tasks"])).await
    }

    async fn prepare(&self, url: &str, options: &PrepareOptions) -> Result<TaskId, ApiError> {
        let request = self.post_json(&["prepare"], &PrepareBody { url, options })?;
        let response: PrepareResponse = self.send_json(request).await?;
        sync_debug!("prepare accepted as task {}", response.task_id);
        Ok(response.task_id)
    }

    async fn start(
        &self,
        task_id: &str,
        selected_indices: Option<&[usize]>,
    ) -> Result<(), ApiError> {
        let request = self.post_json(&["start", task_id], &StartBody { selected_indices })?;
        self.send(request).await.map(drop)
    }

    async fn cancel(&self, task_id: &str) -> Result<(), ApiError> {
        let request = self.post_json(&["cancel", task_id], &serde_json::json!({}))?;
        self.send(request).await.map(drop)
    }

    async fn delete(&self, task_id: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.endpoint(&["delete", task_id]))
            .header(DEVICE_ID_HEADER, self.device_id.as_str());
        self.send(request).await.map(drop)
    }

    async fn download_token(&self, task_id: &str) -> Result<String, ApiError> {
        let response: TokenResponse = self.send_json(self.get(&["download_token", task_id])).await?;
        Ok(response.token)
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        self.send_json(self.get(&["history"])).await
    }

    fn download_file_url(&self, task_id: &str, token: &str) -> String {
        let mut url = self.endpoint(&["download_file", task_id]);
        url.query_pairs_mut().append_pair("token", token);
        url.to_string()
    }
}

/// FastAPI-style `{"detail": ...}`; validation errors carry a list instead of a string.
fn error_detail(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
