//! OpenRouter (OpenAI-compatible) chat completion client.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use lessonpath_shared::{LessonpathError, ModelProfile, ModelsConfig, OpenRouterConfig, Result};

use crate::{CompletionError, CompletionService, PromptRequest, SYSTEM_INSTRUCTION};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("lessonpath/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in a [`CompletionError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Completion client for OpenRouter's `/chat/completions` endpoint.
pub struct OpenRouterClient {
    http: Client,
    endpoint: url::Url,
    models: ModelsConfig,
}

impl OpenRouterClient {
    /// Build a client with auth and attribution headers baked in.
    ///
    /// `models` is the profile table every request is resolved against.
    pub fn new(api_key: &str, settings: &OpenRouterConfig, models: ModelsConfig) -> Result<Self> {
        let endpoint = settings.completions_url()?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| LessonpathError::config("API key contains invalid header characters"))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(site_url) = &settings.site_url {
            if let Ok(val) = HeaderValue::from_str(site_url) {
                headers.insert("HTTP-Referer", val);
            }
        }
        if let Ok(val) = HeaderValue::from_str(&settings.app_name) {
            headers.insert("X-Title", val);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                LessonpathError::Completion(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            endpoint,
            models,
        })
    }
}

#[async_trait]
impl CompletionService for OpenRouterClient {
    fn model_for(&self, profile: ModelProfile) -> String {
        self.models.resolve(profile).to_string()
    }

    #[instrument(skip_all, fields(profile = %request.profile))]
    async fn complete(&self, request: &PromptRequest) -> std::result::Result<String, CompletionError> {
        let model = self.models.resolve(request.profile);
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };

        debug!(model, max_tokens = request.max_output_tokens, "completion request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(CompletionError::from_reqwest)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(CompletionError::from_reqwest)?;

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| CompletionError::Decode(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(CompletionError::Provider(error.message));
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}
