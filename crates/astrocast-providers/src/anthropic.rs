//! Client for the Anthropic Messages API.

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

pub const PROVIDER_ID: &str = "anthropic";

const MESSAGES_PATH: &str = "/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    priority: u8,
}

impl AnthropicProvider {
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

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured {
                provider: PROVIDER_ID.to_owned(),
            })
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let api_key = self.api_key()?;
        let body = MessagesRequest {
            model: &self.model,
            system: &request.system,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        };

        tracing::debug!(model = %self.model, stream, "sending anthropic messages request");

        let response = self
            .client
            .post(endpoint(&self.base_url, MESSAGES_PATH))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;
        check_status(PROVIDER_ID, response).await
    }
}

#[async_trait]
impl GenerativeProvider for AnthropicProvider {
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
        let parsed: MessagesResponse = read_json(response, "anthropic messages response").await?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse {
                provider: PROVIDER_ID.to_owned(),
            });
        }

        Ok(Completion {
            text,
            usage: parsed.usage.into(),
            model: parsed.model,
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ProviderStream, ProviderError> {
        let response = self.send(request, true).await?;
        Ok(event_stream(PROVIDER_ID, response, interpret_event))
    }
}

fn interpret_event(data: &str) -> Result<SseStep, ProviderError> {
    let event: StreamPayload =
        serde_json::from_str(data).map_err(|e| ProviderError::Deserialize {
            context: "anthropic stream event".to_owned(),
            source: e,
        })?;

    Ok(match event {
        StreamPayload::MessageStart { message } => {
            SseStep::Emit(StreamEvent::Usage(message.usage.into()))
        }
        StreamPayload::ContentBlockDelta { delta } => match delta.text {
            Some(text) if !text.is_empty() => SseStep::Emit(StreamEvent::Delta(text)),
            _ => SseStep::Skip,
        },
        StreamPayload::MessageDelta { usage: Some(usage) } => {
            SseStep::Emit(StreamEvent::Usage(usage.into()))
        }
        StreamPayload::MessageStop => SseStep::Done,
        StreamPayload::Error { error } => {
            return Err(ProviderError::Stream {
                provider: PROVIDER_ID.to_owned(),
                message: format!("{}: {}", error.kind, error.message),
            });
        }
        StreamPayload::MessageDelta { usage: None } | StreamPayload::Other => SseStep::Skip,
    })
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(u: Usage) -> Self {
        TokenUsage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamPayload {
    MessageStart {
        message: StartMessage,
    },
    ContentBlockDelta {
        delta: BlockDelta,
    },
    MessageDelta {
        #[serde(default)]
        usage: Option<Usage>,
    },
    MessageStop,
    Error {
        error: ApiError,
    },
    /// `ping`, `content_block_start`, `content_block_stop`.
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct StartMessage {
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct BlockDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}
