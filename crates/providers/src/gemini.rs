use serde_json::{json, Value};
use tracing::debug;
use voyage_core::{Prompt, Role};

use crate::{
    read_error_body, ChatProvider, Completion, CompletionRequest, FunctionCall, ProviderError,
};

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gemini-1.5-flash-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

/// `generateContent` client for Google Gemini models.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }
}

impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let payload = build_payload(request);
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        debug!(model = %self.config.model, turns = request.prompt.turns.len(), "calling gemini");

        let response = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body: read_error_body(response).await,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|source| ProviderError::Decode {
                provider: PROVIDER,
                source,
            })?;
        let completion = extract_completion(&body);
        if completion.is_empty() {
            return Err(ProviderError::EmptyReply { provider: PROVIDER });
        }
        Ok(completion)
    }
}

fn build_payload(request: &CompletionRequest) -> Value {
    let mut payload = json!({
        "systemInstruction": { "parts": [{ "text": request.prompt.system }] },
        "contents": contents(&request.prompt),
    });

    if let (Some(function), Some(object)) = (request.function.as_ref(), payload.as_object_mut()) {
        object.insert(
            "tools".to_string(),
            json!([{ "functionDeclarations": [function] }]),
        );
    }
    payload
}

fn contents(prompt: &Prompt) -> Vec<Value> {
    prompt
        .turns
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.content }] })
        })
        .collect()
}

fn extract_completion(body: &Value) -> Completion {
    let Some(parts) = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
    else {
        return Completion::default();
    };

    let mut chunks = Vec::new();
    let mut function_call = None;
    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            chunks.push(text);
        }
        if function_call.is_none() {
            function_call = part.get("functionCall").and_then(|call| {
                Some(FunctionCall {
                    name: call.get("name")?.as_str()?.to_string(),
                    arguments: call
                        .get("args")
                        .map(Value::to_string)
                        .unwrap_or_else(|| "{}".to_string()),
                })
            });
        }
    }

    let text = chunks.concat();
    Completion {
        text: (!text.trim().is_empty()).then_some(text),
        function_call,
    }
}
