use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};

use super::error::DeepSeekError;
use super::types::{ChatRequest, ChatResponse};

const API_URL: &str = "https://api.deepseek.com";
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

pub struct DeepSeekClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl DeepSeekClient {
    pub fn new(api_key: String) -> Result<Self, DeepSeekError> {
        Self::with_base_url(api_key, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, DeepSeekError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, DeepSeekError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        let body = ensure_success(response).await?.json::<ChatResponse>().await?;
        Ok(body)
    }
}

/// Passes 2xx replies through; anything else becomes a [`DeepSeekError`].
async fn ensure_success(response: Response) -> Result<Response, DeepSeekError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(DeepSeekError::RateLimited {
            retry_after_ms: retry_after_ms(response.headers()),
        });
    }

    // An empty error body still deserves a readable message.
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => body,
        _ => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    Err(DeepSeekError::ApiError {
        status: status.as_u16(),
        message,
    })
}

/// `Retry-After` given in whole seconds, or one second when absent.
fn retry_after_ms(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER_MS, |secs| secs.saturating_mul(1000))
}
