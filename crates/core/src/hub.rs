use crate::error::ServiceError;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INFERENCE_URL.to_string(),
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Thin JSON client for a hosted inference API. One attempt per call.
#[derive(Debug, Clone)]
pub struct HubClient {
    base_url: Url,
    api_token: Option<String>,
    client: Client,
}

impl HubClient {
    pub fn new(config: &HubConfig) -> Result<Self, ServiceError> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: Url::parse(&base)?,
            api_token: config
                .api_token
                .as_ref()
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            client,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ServiceError> {
        let url = self.endpoint(path)?;
        let mut request = self.client.post(url.clone()).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::BackendResponse {
                backend: url.to_string(),
                details: error_details(status, &body),
            });
        }

        Ok(response.json().await?)
    }
}

/// Prefers the API's `{"error": ...}` message; gateways often answer with HTML.
fn error_details(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| {
            payload
                .pointer("/error")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .map(|message| format!("{status}: {message}"))
        .unwrap_or_else(|| {
            let snippet = body.trim().chars().take(200).collect::<String>();
            if snippet.is_empty() {
                status.to_string()
            } else {
                format!("{status}: {snippet}")
            }
        })
}
