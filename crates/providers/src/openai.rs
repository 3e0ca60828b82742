use serde_json::{json, Value};
use tracing::debug;
use voyage_core::Prompt;

use crate::{
    read_error_body, ChatProvider, Completion, CompletionRequest, FunctionCall, ProviderError,
};

const PROVIDER: &str = "openai";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, config: OpenAiConfig) -> Self {
        Self { client, config }
    }
}

impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let payload = build_payload(&self.config.model, request);
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(model = %self.config.model, turns = request.prompt.turns.len(), "calling openai");

        let response = self
            .client
            .post(url)
            .bearer_auth(self.config.api_key.as_str())
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

fn build_payload(model: &str, request: &CompletionRequest) -> Value {
    let mut payload = json!({
        "model": model,
        "messages": messages(&request.prompt),
    });

    if let (Some(function), Some(object)) = (request.function.as_ref(), payload.as_object_mut()) {
        object.insert(
            "tools".to_string(),
            json!([{ "type": "function", "function": function }]),
        );
        object.insert("tool_choice".to_string(), json!("auto"));
    }
    payload
}

fn messages(prompt: &Prompt) -> Vec<Value> {
    let mut messages = Vec::with_capacity(prompt.turns.len() + 1);
    messages.push(json!({ "role": "system", "content": prompt.system }));
    for turn in &prompt.turns {
        messages.push(json!({ "role": turn.role.as_code(), "content": turn.content }));
    }
    messages
}

fn extract_completion(body: &Value) -> Completion {
    let Some(message) = body.pointer("/choices/0/message") else {
        return Completion::default();
    };

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .filter(|text| !text.trim().is_empty());

    let function_call = message
        .pointer("/tool_calls/0/function")
        .or_else(|| message.get("function_call"))
        .and_then(|call| {
            Some(FunctionCall {
                name: call.get("name")?.as_str()?.to_string(),
                arguments: call
                    .get("arguments")
                    .and_then(Value::as_str)
                    .unwrap_or("{}")
                    .to_string(),
            })
        });

    Completion {
        text,
        function_call,
    }
}
