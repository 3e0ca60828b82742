mod gemini;
mod openai;
mod scripted;
mod settings;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use voyage_core::Prompt;

pub use gemini::{GeminiConfig, GeminiProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use scripted::ScriptedProvider;
pub use settings::{ProviderKind, ProviderSettings, OFFLINE_REPLY};

/// A function the model may call instead of (or alongside) replying with text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: Prompt,
    pub function: Option<FunctionSpec>,
}

impl CompletionRequest {
    pub fn text(prompt: Prompt) -> Self {
        Self {
            prompt,
            function: None,
        }
    }

    pub fn with_function(prompt: Prompt, function: FunctionSpec) -> Self {
        Self {
            prompt,
            function: Some(function),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON arguments exactly as the provider returned them.
    pub arguments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: Option<String>,
    pub function_call: Option<FunctionCall>,
}

impl Completion {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
        }
    }

    pub fn from_function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            text: None,
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.function_call.is_none()
            && self
                .text
                .as_deref()
                .map(|text| text.trim().is_empty())
                .unwrap_or(true)
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider} response could not be decoded: {source}")]
    Decode {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned neither text nor a function call")]
    EmptyReply { provider: &'static str },
    #[error("scripted provider has no replies left")]
    Exhausted,
    #[error("{provider} is selected but {variable} is not set")]
    MissingApiKey {
        provider: &'static str,
        variable: &'static str,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn model(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;
}

#[derive(Clone)]
pub enum Provider {
    OpenAi(OpenAiProvider),
    Gemini(GeminiProvider),
    Scripted(ScriptedProvider),
}

impl Provider {
    pub fn openai(client: reqwest::Client, config: OpenAiConfig) -> Self {
        Self::OpenAi(OpenAiProvider::new(client, config))
    }

    pub fn gemini(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self::Gemini(GeminiProvider::new(client, config))
    }

    pub fn scripted(provider: ScriptedProvider) -> Self {
        Self::Scripted(provider)
    }
}

impl ChatProvider for Provider {
    fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi(provider) => provider.name(),
            Provider::Gemini(provider) => provider.name(),
            Provider::Scripted(provider) => provider.name(),
        }
    }

    fn model(&self) -> &str {
        match self {
            Provider::OpenAi(provider) => provider.model(),
            Provider::Gemini(provider) => provider.model(),
            Provider::Scripted(provider) => provider.model(),
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        match self {
            Provider::OpenAi(provider) => provider.complete(request).await,
            Provider::Gemini(provider) => provider.complete(request).await,
            Provider::Scripted(provider) => provider.complete(request).await,
        }
    }
}

async fn read_error_body(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    body.chars().take(500).collect()
}
