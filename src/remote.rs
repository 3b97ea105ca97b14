//! Client for the remote task/staff/auth backend
//!
//! Every request carries the headers of the injected [`HeaderProvider`].
//! Errors are classified where they happen: transport failures are
//! `Network`, HTTP failures are classified by status code.

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::error::{ClientError, ErrorKind};
use crate::models::{Priority, StaffMember, StaffPatch, Task, TaskPatch};
use crate::session::{HeaderProvider, Role};

/// Exponential backoff for idempotent fetches
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// retries are used up. The delay doubles after every failed attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && e.is_retryable() => {
                attempt += 1;
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying request"
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Doubled backoff delay, pinned at `Duration::MAX` instead of overflowing
fn next_delay(delay: Duration) -> Duration {
    delay.saturating_mul(2)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub staff_id: String,
    pub department: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Typed access to the remote backend
#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    headers: Arc<dyn HeaderProvider>,
    retry: RetryPolicy,
}

impl RemoteClient {
    pub fn new(
        config: &RemoteConfig,
        headers: Arc<dyn HeaderProvider>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers,
            retry: RetryPolicy::from_config(config),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .headers(self.headers.headers())
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        Err(ClientError::from_status(status.as_u16(), message))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        self.execute(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ClientError {
                kind: ErrorKind::Server,
                status: None,
                message: format!("Unexpected response body: {}", e),
            })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        self.execute(builder).await.map(|_| ())
    }

    // -- auth --------------------------------------------------------------

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.send(self.request(Method::POST, "/auth/login").json(request))
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.send(self.request(Method::POST, "/auth/register").json(request))
            .await
    }

    /// Whether the current session token is still accepted
    pub async fn validate(&self) -> Result<bool, ClientError> {
        match self
            .send_empty(self.request(Method::GET, "/auth/validate"))
            .await
        {
            Ok(()) => Ok(true),
            Err(e) if matches!(e.status, Some(401) | Some(403)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        self.send(self.request(Method::GET, "/users/profile")).await
    }

    // -- tasks -------------------------------------------------------------

    /// Fetch the task list, retrying transient failures with backoff
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        retry_with_backoff(self.retry, || {
            self.send::<Vec<Task>>(self.request(Method::GET, "/tasks"))
        })
        .await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ClientError> {
        self.send(self.request(Method::POST, "/tasks").json(task))
            .await
    }

    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, ClientError> {
        self.send(
            self.request(Method::PATCH, &format!("/tasks/{}", id))
                .json(patch),
        )
        .await
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, &format!("/tasks/{}", id)))
            .await
    }

    /// Staff hands a finished task over for admin review
    pub async fn submit_task(&self, id: &str) -> Result<Task, ClientError> {
        self.send(self.request(Method::POST, &format!("/tasks/{}/submit", id)))
            .await
    }

    /// Admin approves or rejects a submitted task
    pub async fn review_task(&self, id: &str, approved: bool) -> Result<Task, ClientError> {
        self.send(
            self.request(Method::POST, &format!("/tasks/{}/review", id))
                .json(&serde_json::json!({ "approved": approved })),
        )
        .await
    }

    // -- staff -------------------------------------------------------------

    pub async fn list_staff(&self) -> Result<Vec<StaffMember>, ClientError> {
        self.send(self.request(Method::GET, "/staff")).await
    }

    pub async fn update_staff(
        &self,
        id: &str,
        patch: &StaffPatch,
    ) -> Result<StaffMember, ClientError> {
        self.send(
            self.request(Method::PATCH, &format!("/staff/{}", id))
                .json(patch),
        )
        .await
    }

    pub async fn delete_staff(&self, id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, &format!("/staff/{}", id)))
            .await
    }
}
