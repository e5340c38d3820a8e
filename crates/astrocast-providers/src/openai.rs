//! Client for the OpenAI Chat Completions API.

use async_trait::async_trait;
use astrocast_core::ProviderSettings;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::http::{build_client, check_status, endpoint, read_json};
use crate::provider::{
    Completion, CompletionRequest, GenerativeProvider, ProviderStream, StreamEvent, TokenUsage,
};
use crate::sse::{event_stream, SseStep};

pub const PROVIDER_ID: &str = "openai";

const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const DONE_SENTINEL: &str = "[DONE]";

pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    priority: u8,
}

impl OpenAiProvider {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(settings: &ProviderSettings, timeout_secs: u64) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: settings
                .api_key
                .clone()
                .filter(|_| settings.is_configured()),
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            priority: settings.priority,
        })
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured {
                provider: PROVIDER_ID.to_owned(),
            })?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        };

        tracing::debug!(model = %self.model, stream, "sending openai chat completion request");

        let response = self
            .client
            .post(endpoint(&self.base_url, COMPLETIONS_PATH))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        check_status(PROVIDER_ID, response).await
    }
}

#[async_trait]
impl GenerativeProvider for OpenAiProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let response = self.send(request, false).await?;
        let parsed: ChatResponse = read_json(response, "openai chat completion").await?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse {
                provider: PROVIDER_ID.to_owned(),
            });
        }

        Ok(Completion {
            text,
            usage: parsed.usage.map(Into::into).unwrap_or_default(),
            model: parsed.model,
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ProviderStream, ProviderError> {
        let response = self.send(request, true).await?;
        Ok(event_stream(PROVIDER_ID, response, interpret_chunk))
    }
}

fn interpret_chunk(data: &str) -> Result<SseStep, ProviderError> {
    if data.trim() == DONE_SENTINEL {
        return Ok(SseStep::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| ProviderError::Deserialize {
        context: "openai stream chunk".to_owned(),
        source: e,
    })?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream {
            provider: PROVIDER_ID.to_owned(),
            message: error.message,
        });
    }

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|t| !t.is_empty())
        .map(StreamEvent::Delta);
    // Usage normally arrives alone in the last chunk with empty `choices`;
    // compatible servers may attach it to a content chunk.
    let usage = chunk.usage.map(|u| StreamEvent::Usage(u.into()));
    Ok(match (text, usage) {
        (Some(text), Some(usage)) => SseStep::EmitMany(vec![text, usage]),
        (Some(event), None) | (None, Some(event)) => SseStep::Emit(event),
        (None, None) => SseStep::Skip,
    })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(u: Usage) -> Self {
        TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}
