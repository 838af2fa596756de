//! Remote rewrite service
//!
//! The core only sees [`Rewriter`]: one call from prompt + text to rewritten
//! text. [`OpenRouterClient`] implements it against OpenRouter's
//! OpenAI-compatible chat-completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::constants::remote;
use crate::error::RemoteCallError;

/// One rewrite call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub system_prompt: String,
    pub user_text: String,
    pub model_id: String,
    pub api_key: String,
    /// Page origin, sent as `HTTP-Referer`
    pub origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResponse {
    pub text: String,
}

#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(&self, request: RewriteRequest) -> Result<RewriteResponse, RemoteCallError>;
}

// ==============================================================================
// Chat-completions wire types
// ==============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenRouter client
pub struct OpenRouterClient {
    api_url: String,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new() -> Self {
        Self::with_url(remote::API_URL.to_string())
    }

    /// Client for another OpenAI-compatible endpoint
    pub fn with_url(api_url: String) -> Self {
        Self {
            api_url,
            client: reqwest::Client::new(),
        }
    }
}

impl Default for OpenRouterClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rewriter for OpenRouterClient {
    async fn rewrite(&self, request: RewriteRequest) -> Result<RewriteResponse, RemoteCallError> {
        let body = ChatRequest {
            model: &request.model_id,
            messages: [
                ChatMessage { role: "system", content: &request.system_prompt },
                ChatMessage { role: "user", content: &request.user_text },
            ],
        };

        let mut builder = self
            .client
            .post(&self.api_url)
            .bearer_auth(&request.api_key)
            .header("X-Title", remote::CLIENT_TITLE)
            .json(&body);
        if let Some(origin) = &request.origin {
            builder = builder.header("HTTP-Referer", origin);
        }

        debug!(model = %request.model_id, chars = request.user_text.chars().count(), "Sending rewrite request");
        let response = builder
            .send()
            .await
            .map_err(|e| RemoteCallError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            error!(status = status, "Rewrite request rejected");
            return Err(RemoteCallError::Api { status, message });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RemoteCallError::Malformed(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(RemoteCallError::EmptyResponse)?;

        Ok(RewriteResponse { text })
    }
}
