use std::time::Duration;

use tracing::warn;

use crate::{GeminiConfig, OpenAiConfig, Provider, ProviderError, ScriptedProvider};

pub const OFFLINE_REPLY: &str = "Voyage Planner is running without a model provider. \
Set OPENAI_API_KEY or GOOGLE_API_KEY to receive generated travel plans.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Scripted,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "gemini" | "google" => Some(Self::Gemini),
            "scripted" | "offline" => Some(Self::Scripted),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Scripted => "scripted",
        }
    }
}

/// Everything needed to construct a [`Provider`], however it was configured.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: Option<ProviderKind>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub google_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: None,
            openai_api_key: None,
            openai_model: None,
            openai_base_url: None,
            google_api_key: None,
            gemini_model: None,
            gemini_base_url: None,
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(6),
        }
    }
}

impl ProviderSettings {
    /// Explicit choice wins; otherwise the first provider with a key, else scripted.
    pub fn resolved_kind(&self) -> ProviderKind {
        if let Some(kind) = self.kind {
            return kind;
        }
        if present(&self.openai_api_key).is_some() {
            ProviderKind::OpenAi
        } else if present(&self.google_api_key).is_some() {
            ProviderKind::Gemini
        } else {
            ProviderKind::Scripted
        }
    }

    pub fn build(&self) -> Result<Provider, ProviderError> {
        match self.resolved_kind() {
            ProviderKind::OpenAi => {
                let key = present(&self.openai_api_key).ok_or(ProviderError::MissingApiKey {
                    provider: "openai",
                    variable: "OPENAI_API_KEY",
                })?;
                let mut config = OpenAiConfig::new(key);
                if let Some(model) = present(&self.openai_model) {
                    config.model = model.to_string();
                }
                if let Some(base_url) = present(&self.openai_base_url) {
                    config.base_url = base_url.to_string();
                }
                Ok(Provider::openai(self.http_client()?, config))
            }
            ProviderKind::Gemini => {
                let key = present(&self.google_api_key).ok_or(ProviderError::MissingApiKey {
                    provider: "gemini",
                    variable: "GOOGLE_API_KEY",
                })?;
                let mut config = GeminiConfig::new(key);
                if let Some(model) = present(&self.gemini_model) {
                    config.model = model.to_string();
                }
                if let Some(base_url) = present(&self.gemini_base_url) {
                    config.base_url = base_url.to_string();
                }
                Ok(Provider::gemini(self.http_client()?, config))
            }
            ProviderKind::Scripted => {
                warn!("no model provider configured; replies come from the offline script");
                Ok(Provider::scripted(ScriptedProvider::offline(OFFLINE_REPLY)))
            }
        }
    }

    fn http_client(&self) -> Result<reqwest::Client, ProviderError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(ProviderError::Client)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
