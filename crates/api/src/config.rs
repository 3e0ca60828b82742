use std::env;
use std::time::Duration;

use voyage_core::{HistoryPolicy, PlannerMode};
use voyage_providers::{ProviderKind, ProviderSettings};

const DEFAULT_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    pub provider: ProviderSettings,
    pub planner_mode: PlannerMode,
    pub history: HistoryPolicy,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            provider: ProviderSettings::default(),
            planner_mode: PlannerMode::Structured,
            history: HistoryPolicy::Full,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 30,
            allowed_origins: normalize_origins(DEFAULT_ORIGINS),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let seconds = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        let provider = ProviderSettings {
            kind: lookup("VOYAGE_PROVIDER").and_then(|value| ProviderKind::parse(&value)),
            openai_api_key: lookup("OPENAI_API_KEY"),
            openai_model: lookup("VOYAGE_OPENAI_MODEL"),
            openai_base_url: lookup("VOYAGE_OPENAI_BASE_URL"),
            google_api_key: lookup("GOOGLE_API_KEY"),
            gemini_model: lookup("VOYAGE_GEMINI_MODEL"),
            gemini_base_url: lookup("VOYAGE_GEMINI_BASE_URL"),
            request_timeout: seconds(
                "VOYAGE_HTTP_TIMEOUT_SECONDS",
                defaults.provider.request_timeout,
            ),
            connect_timeout: seconds(
                "VOYAGE_HTTP_CONNECT_TIMEOUT_SECONDS",
                defaults.provider.connect_timeout,
            ),
        };

        Self {
            bind: lookup("VOYAGE_BIND")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.bind),
            provider,
            planner_mode: lookup("VOYAGE_PLANNER_MODE")
                .and_then(|value| PlannerMode::parse(&value))
                .unwrap_or(defaults.planner_mode),
            history: lookup("VOYAGE_HISTORY")
                .and_then(|value| HistoryPolicy::parse(&value))
                .unwrap_or(defaults.history),
            rate_limit_window: seconds("VOYAGE_RATE_LIMIT_WINDOW_SECONDS", defaults.rate_limit_window),
            rate_limit_max: lookup("VOYAGE_RATE_LIMIT_MAX")
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(defaults.rate_limit_max),
            allowed_origins: lookup("VOYAGE_ALLOWED_ORIGINS")
                .map(|value| normalize_origins(value.split(',')))
                .filter(|origins| !origins.is_empty())
                .unwrap_or(defaults.allowed_origins),
        }
    }
}

fn normalize_origins<'a>(origins: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    origins
        .into_iter()
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> ApiConfig {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.planner_mode, PlannerMode::Structured);
        assert_eq!(config.history, HistoryPolicy::Full);
        assert_eq!(config.rate_limit_max, 30);
        assert_eq!(config.provider.resolved_kind(), ProviderKind::Scripted);
        assert!(config
            .allowed_origins
            .contains(&"http://localhost:3000".to_string()));
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let config = config_from(&[
            ("VOYAGE_PLANNER_MODE", "extraction"),
            ("VOYAGE_HISTORY", "snapshot"),
            ("VOYAGE_RATE_LIMIT_MAX", "lots"),
            ("VOYAGE_ALLOWED_ORIGINS", "https://trips.example.com/, ,http://localhost:4000"),
            ("GOOGLE_API_KEY", "g-key"),
            ("VOYAGE_HTTP_TIMEOUT_SECONDS", "15"),
        ]);
        assert_eq!(config.planner_mode, PlannerMode::Extraction);
        assert_eq!(config.history, HistoryPolicy::Snapshot);
        assert_eq!(config.rate_limit_max, 30);
        assert_eq!(
            config.allowed_origins,
            vec!["https://trips.example.com", "http://localhost:4000"]
        );
        assert_eq!(config.provider.resolved_kind(), ProviderKind::Gemini);
        assert_eq!(config.provider.request_timeout, Duration::from_secs(15));
    }
}
