use std::sync::Arc;
use std::time::Duration;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::config::ApiConfig;
use crate::errors::HarvesterError;

/// Called once when the session cannot be recovered by a silent refresh.
pub trait SessionExpiredHandler: Send + Sync {
    fn on_session_expired(&self);
}

impl<F> SessionExpiredHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_session_expired(&self) {
        self()
    }
}

/// Handler that only logs; used when no caller needs to react to logout.
pub struct LogSessionExpired;

impl SessionExpiredHandler for LogSessionExpired {
    fn on_session_expired(&self) {
        warn!("Session expired and could not be refreshed");
    }
}

/// Result of a single HTTP attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Ok(Value),
    /// The credentials were rejected; a refresh may fix it.
    Retryable(HarvesterError),
    Failed(HarvesterError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthState {
    Initial,
    Refreshed,
}

/// Credentialed JSON transport with one silent refresh-and-retry on 401.
pub struct Transport {
    client: Client,
    base_url: String,
    token: Option<String>,
    refresh_path: String,
    request_timeout: Duration,
    on_expired: Arc<dyn SessionExpiredHandler>,
}

impl Transport {
    pub fn new(config: &ApiConfig, on_expired: Arc<dyn SessionExpiredHandler>) -> Result<Self, HarvesterError> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| HarvesterError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            refresh_path: config.paths.refresh.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            on_expired,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_json(&self, path: &str, timeout: Duration) -> Result<Value, HarvesterError> {
        self.execute(Method::GET, path, None, timeout).await
    }

    pub async fn post_json(&self, path: &str, body: Value, timeout: Duration) -> Result<Value, HarvesterError> {
        self.execute(Method::POST, path, Some(body), timeout).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, HarvesterError> {
        let mut state = AuthState::Initial;

        loop {
            match self.attempt(&method, path, body.as_ref(), timeout).await {
                AttemptOutcome::Ok(value) => return Ok(value),
                AttemptOutcome::Failed(e) => return Err(e),
                AttemptOutcome::Retryable(e) => match state {
                    AuthState::Initial => {
                        debug!(path, error = %e, "Request unauthorized, refreshing session");
                        if !self.refresh().await {
                            return Err(self.expire());
                        }
                        state = AuthState::Refreshed;
                    }
                    AuthState::Refreshed => {
                        warn!(path, "Request still unauthorized after refresh");
                        return Err(self.expire());
                    }
                },
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        timeout: Duration,
    ) -> AttemptOutcome {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url).timeout(timeout);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => return AttemptOutcome::Failed(map_send_error(&url, e)),
        };

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return AttemptOutcome::Retryable(HarvesterError::Authentication(format!(
                "{} {} returned 401",
                method, path
            )));
        }
        if !status.is_success() {
            let message = error_message(resp).await;
            return AttemptOutcome::Failed(HarvesterError::Api { status: status.as_u16(), message });
        }

        match resp.json::<Value>().await {
            Ok(value) => AttemptOutcome::Ok(value),
            Err(e) => AttemptOutcome::Failed(HarvesterError::InvalidResponse(format!(
                "{} {}: {}",
                method, path, e
            ))),
        }
    }

    async fn refresh(&self) -> bool {
        let url = format!("{}{}", self.base_url, self.refresh_path);
        let mut request = self.client.post(&url).timeout(self.request_timeout);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Session refreshed");
                true
            }
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "Session refresh rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                false
            }
        }
    }

    fn expire(&self) -> HarvesterError {
        self.on_expired.on_session_expired();
        HarvesterError::Authentication("authentication failed".into())
    }
}

fn map_send_error(url: &str, e: reqwest::Error) -> HarvesterError {
    if e.is_timeout() {
        HarvesterError::Timeout(format!("Request to {} timed out", url))
    } else {
        HarvesterError::Network(format!("Request to {} failed: {}", url, e))
    }
}

/// Best-effort error text: JSON `detail`/`error`/`message`, else raw body.
async fn error_message(resp: Response) -> String {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    if let Ok(value) = serde_json::from_str::<Value>(&text) {
        for key in ["detail", "error", "message"] {
            if let Some(msg) = value.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    if text.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        crate::utils::truncation::truncate_error(text.trim())
    }
}
