//! Client for the ECMWF Web API dataset service.
//!
//! A retrieval is a small job on the server side:
//!
//! 1. `POST {url}/datasets/{dataset}/requests` submits the request and answers
//!    with a `Location` to poll.
//! 2. `GET {location}` until `status` is `complete` (or `aborted`), waiting
//!    `Retry-After` seconds between polls.
//! 3. `GET {href}` downloads the result file.
//! 4. `DELETE {location}` releases the job on the server.

use crate::domain::model::RetrievalRequest;
use crate::domain::ports::RetrievalClient;
use crate::utils::error::{EtlError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, FROM, LOCATION, RETRY_AFTER};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.ecmwf.int/v1";
const API_KEY_HEADER: &str = "x-ecmwf-key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub key: String,
    pub email: String,
    pub poll_interval_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            key: "${ECMWF_API_KEY}".to_string(),
            email: "${ECMWF_API_EMAIL}".to_string(),
            poll_interval_seconds: 30,
            connect_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TaskStatus {
    status: Option<String>,
    name: Option<String>,
    href: Option<String>,
    size: Option<u64>,
    reason: Option<String>,
}

struct ApiReply {
    location: Option<String>,
    retry_after: Option<Duration>,
    /// The server answered with a redirect that reqwest already followed.
    redirected: bool,
    task: TaskStatus,
}

pub struct EcmwfClient {
    client: Client,
    base_url: String,
    poll_interval: Duration,
}

impl EcmwfClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(FROM, Self::header_value("fetch.server.email", &config.email)?);
        headers.insert(
            HeaderName::from_static(API_KEY_HEADER),
            Self::header_value("fetch.server.key", &config.key)?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
        })
    }

    /// Overrides the wait between polls when the server sends no `Retry-After`.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn header_value(field: &str, value: &str) -> Result<HeaderValue> {
        HeaderValue::from_str(value).map_err(|e| EtlError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: format!("Not usable as an HTTP header: {}", e),
        })
    }

    fn retrieval_error(target: &str, reason: impl Into<String>) -> EtlError {
        EtlError::RetrievalError {
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    async fn call(
        &self,
        method: Method,
        url: &str,
        body: Option<&RetrievalRequest>,
        target: &str,
    ) -> Result<ApiReply> {
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::trace!("{} {} -> {}", method, url, status);

        let location = Self::location(&response, url);
        let redirected = Url::parse(url)
            .map(|requested| &requested != response.url())
            .unwrap_or(false);
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let text = response.text().await?;
        let parsed: std::result::Result<TaskStatus, _> = if text.trim().is_empty() {
            Ok(TaskStatus::default())
        } else {
            serde_json::from_str(&text)
        };

        if !status.is_success() {
            let reason = parsed
                .ok()
                .and_then(|task| task.reason)
                .unwrap_or_else(|| format!("HTTP {} from {}", status, url));
            return Err(Self::retrieval_error(target, reason));
        }

        let task = parsed.map_err(|e| {
            Self::retrieval_error(target, format!("unexpected reply from {}: {}", url, e))
        })?;

        Ok(ApiReply {
            location,
            retry_after,
            redirected,
            task,
        })
    }

    fn location(response: &Response, request_url: &str) -> Option<String> {
        let Some(raw) = response.headers().get(LOCATION).and_then(|v| v.to_str().ok()) else {
            // 303 已被 reqwest 跟隨時，最終的 URL 就是 job 位置
            return (response.url().as_str() != request_url).then(|| response.url().to_string());
        };
        match Url::parse(request_url).and_then(|base| base.join(raw)) {
            Ok(url) => Some(url.to_string()),
            Err(_) => Some(raw.to_string()),
        }
    }

    async fn download(&self, href: &str, destination: &Path, expected_size: Option<u64>) -> Result<u64> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut response = self.client.get(href).send().await?.error_for_status()?;
        let mut file = tokio::fs::File::create(destination).await?;
        let mut received: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
        }
        file.flush().await?;

        if let Some(expected) = expected_size {
            if expected != received {
                return Err(EtlError::ProcessingError {
                    message: format!(
                        "size mismatch for {}: expected {} bytes, received {}",
                        destination.display(),
                        expected,
                        received
                    ),
                });
            }
        }
        Ok(received)
    }

    async fn cleanup(&self, location: &str, target: &str) {
        if let Err(e) = self.call(Method::DELETE, location, None, target).await {
            tracing::debug!("Could not release job {}: {}", location, e);
        }
    }
}

#[async_trait::async_trait]
impl RetrievalClient for EcmwfClient {
    async fn retrieve(&self, request: &RetrievalRequest, destination: &Path) -> Result<()> {
        let target = request.target();
        let dataset = request
            .dataset()
            .ok_or_else(|| Self::retrieval_error(target, "request has no 'dataset'"))?;

        let submit_url = format!("{}/datasets/{}/requests", self.base_url, dataset);
        let reply = self
            .call(Method::POST, &submit_url, Some(request), target)
            .await?;

        let location = reply
            .location
            .or_else(|| {
                reply
                    .task
                    .name
                    .as_ref()
                    .map(|name| format!("{}/{}", submit_url, name))
            })
            .ok_or_else(|| Self::retrieval_error(target, "server returned no job location"))?;
        tracing::debug!(
            "Request for {} submitted (id {})",
            target,
            reply.task.name.as_deref().unwrap_or("?")
        );

        let mut task = reply.task;
        let mut redirected = reply.redirected;
        let mut wait = reply.retry_after.unwrap_or(self.poll_interval);
        let mut last_status = String::new();
        let mut submitted = true;

        loop {
            let status = task.status.clone().unwrap_or_default();
            if status != last_status {
                let shown = if status.is_empty() { "submitted" } else { status.as_str() };
                tracing::debug!("{}: {}", target, shown);
                last_status = status.clone();
            }

            match status.as_str() {
                "complete" => break,
                "aborted" | "failed" => {
                    let reason = task.reason.unwrap_or_else(|| status.clone());
                    return Err(Self::retrieval_error(target, reason));
                }
                // 完成的 job 會以 303 轉到沒有 status 的結果資源
                "" if task.href.is_some() || redirected => break,
                "queued" | "active" => {}
                "" if submitted => {}
                other => {
                    let shown = if other.is_empty() { "no status" } else { other };
                    return Err(Self::retrieval_error(
                        target,
                        format!("unexpected reply from {} ({})", location, shown),
                    ));
                }
            }

            tokio::time::sleep(wait).await;
            let reply = self.call(Method::GET, &location, None, target).await?;
            wait = reply.retry_after.unwrap_or(self.poll_interval);
            redirected = reply.redirected;
            task = reply.task;
            submitted = false;
        }

        let href = task
            .href
            .ok_or_else(|| Self::retrieval_error(target, "completed job has no result link"))?;

        match self.download(&href, destination, task.size).await {
            Ok(bytes) => tracing::debug!("Downloaded {} bytes to {}", bytes, destination.display()),
            Err(e) => {
                // 不留下不完整的檔案
                let _ = tokio::fs::remove_file(destination).await;
                return Err(e);
            }
        }

        self.cleanup(&location, target).await;
        Ok(())
    }
}
