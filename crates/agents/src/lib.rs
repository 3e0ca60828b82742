use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, instrument};
use voyage_core::{
    interpret_function_arguments, interpret_plan_reply, ConversationTurn, GeneratedPlan,
    HistoryPolicy, ParseOutcome, PlannerMode, PromptBuilder, TripDetailsUpdate, TripRequest,
    TRIP_UPDATE_FUNCTION,
};
use voyage_observability::AppMetrics;
use voyage_providers::{ChatProvider, Completion, CompletionRequest, FunctionSpec, ProviderError};

/// One chat turn as posted by the front-end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnInput {
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    #[serde(default)]
    pub travel_data: TripRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerReply {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<GeneratedPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_trip_details: Option<TripDetailsUpdate>,
}

impl PlannerReply {
    fn message_only(message: String) -> Self {
        Self {
            message,
            plan: None,
            updated_trip_details: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model call failed: {0}")]
    Upstream(#[from] ProviderError),
}

pub struct TravelAgent<P>
where
    P: ChatProvider,
{
    provider: Arc<P>,
    builder: PromptBuilder,
    metrics: Arc<AppMetrics>,
}

impl<P> Clone for TravelAgent<P>
where
    P: ChatProvider,
{
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            builder: self.builder,
            metrics: self.metrics.clone(),
        }
    }
}

impl<P> TravelAgent<P>
where
    P: ChatProvider,
{
    pub fn new(
        provider: Arc<P>,
        mode: PlannerMode,
        history: HistoryPolicy,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            provider,
            builder: PromptBuilder::new(mode, history),
            metrics,
        }
    }

    pub fn mode(&self) -> PlannerMode {
        self.builder.mode()
    }

    pub fn history_policy(&self) -> HistoryPolicy {
        self.builder.history()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    #[instrument(skip_all, fields(mode = self.builder.mode().as_code(), turns = input.messages.len()))]
    pub async fn respond(&self, input: &ChatTurnInput) -> Result<PlannerReply, AgentError> {
        let started = Instant::now();
        self.metrics.inc_request();

        let outcome = match self.builder.mode() {
            PlannerMode::Itinerary => self.itinerary_turn(input).await,
            PlannerMode::Structured => self.structured_turn(input).await,
            PlannerMode::Extraction => self.extraction_turn(input).await,
        };
        // Failed turns count toward latency too.
        self.metrics.observe_latency(started.elapsed());
        let reply = outcome?;

        info!(
            provider = self.provider.name(),
            model = %self.provider.model(),
            has_plan = reply.plan.is_some(),
            has_update = reply.updated_trip_details.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat turn handled"
        );
        Ok(reply)
    }

    async fn itinerary_turn(&self, input: &ChatTurnInput) -> Result<PlannerReply, AgentError> {
        let prompt = self.builder.build(&input.travel_data, &input.messages);
        let completion = self.call(CompletionRequest::text(prompt)).await?;
        let text = self.require_text(completion)?;
        Ok(PlannerReply::message_only(text.trim().to_string()))
    }

    async fn structured_turn(&self, input: &ChatTurnInput) -> Result<PlannerReply, AgentError> {
        let prompt = self.builder.build(&input.travel_data, &input.messages);
        let completion = self.call(CompletionRequest::text(prompt)).await?;
        let text = self.require_text(completion)?;

        let interpreted = interpret_plan_reply(&text);
        if !interpreted.plan.is_parsed() {
            self.metrics.inc_unparsed_reply();
        }

        Ok(PlannerReply {
            message: interpreted.message,
            plan: interpreted.plan.into_parsed(),
            updated_trip_details: None,
        })
    }

    async fn extraction_turn(&self, input: &ChatTurnInput) -> Result<PlannerReply, AgentError> {
        let prompt = self.builder.build(&input.travel_data, &input.messages);
        let completion = self
            .call(CompletionRequest::with_function(
                prompt,
                trip_update_function(),
            ))
            .await?;

        let Some(call) = completion
            .function_call
            .as_ref()
            .filter(|call| call.name == TRIP_UPDATE_FUNCTION)
        else {
            // The model answered directly; no follow-up call is needed.
            let text = self.require_text(completion)?;
            return Ok(PlannerReply::message_only(text.trim().to_string()));
        };

        let update = match interpret_function_arguments(&call.arguments) {
            ParseOutcome::Parsed(update) => update,
            ParseOutcome::Unparsed(_) => {
                self.metrics.inc_unparsed_reply();
                TripDetailsUpdate::default()
            }
        };
        let trip = input.travel_data.clone().with_update(&update);

        let follow_up = self.builder.build_follow_up(&trip, &input.messages);
        let completion = self.call(CompletionRequest::text(follow_up)).await?;
        let text = self.require_text(completion)?;

        Ok(PlannerReply {
            message: text.trim().to_string(),
            plan: None,
            updated_trip_details: (!update.is_empty()).then_some(update),
        })
    }

    async fn call(&self, request: CompletionRequest) -> Result<Completion, AgentError> {
        self.metrics.inc_upstream_call();
        match self.provider.complete(&request).await {
            Ok(completion) => Ok(completion),
            Err(err) => {
                self.metrics.inc_upstream_failure();
                error!(provider = self.provider.name(), error = %err, "model call failed");
                Err(err.into())
            }
        }
    }

    fn require_text(&self, completion: Completion) -> Result<String, AgentError> {
        completion
            .text
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                self.metrics.inc_upstream_failure();
                AgentError::Upstream(ProviderError::EmptyReply {
                    provider: self.provider.name(),
                })
            })
    }
}

/// Declaration offered to the model in extraction mode.
pub fn trip_update_function() -> FunctionSpec {
    FunctionSpec {
        name: TRIP_UPDATE_FUNCTION.to_string(),
        description: "Update the user's trip details with any values stated in the conversation."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "destination": { "type": "string", "description": "City, region or country" },
                "startDate": { "type": "string", "description": "Trip start date, YYYY-MM-DD" },
                "endDate": { "type": "string", "description": "Trip end date, YYYY-MM-DD" },
                "dates": { "type": "string", "description": "Free-text dates when exact days are unknown" },
                "interests": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Activities or themes the user wants"
                },
                "adults": { "type": "integer", "description": "Number of adult travellers" },
                "children": { "type": "integer", "description": "Number of children" },
                "budget": { "type": "string", "description": "Budget as stated, e.g. '150 USD per day'" }
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_core::{Budget, Role, FALLBACK_PLAN_MESSAGE};
    use voyage_providers::ScriptedProvider;

    fn agent(mode: PlannerMode, provider: ScriptedProvider) -> TravelAgent<ScriptedProvider> {
        TravelAgent::new(
            Arc::new(provider),
            mode,
            HistoryPolicy::Full,
            AppMetrics::shared(),
        )
    }

    fn input(text: &str) -> ChatTurnInput {
        ChatTurnInput {
            messages: vec![ConversationTurn::user(text)],
            travel_data: TripRequest {
                destination: "Porto".to_string(),
                ..TripRequest::default()
            },
        }
    }

    #[tokio::test]
    async fn itinerary_mode_returns_reply_text() {
        let provider = ScriptedProvider::with_replies([Completion::from_text("  Day 1: Ribeira  ")]);
        let reply = agent(PlannerMode::Itinerary, provider.clone())
            .respond(&input("plan it"))
            .await
            .unwrap();

        assert_eq!(reply.message, "Day 1: Ribeira");
        assert!(reply.plan.is_none());
        let sent = provider.requests();
        assert!(sent[0].prompt.system.contains("Porto"));
        assert_eq!(sent[0].prompt.turns.last().map(|t| t.role), Some(Role::User));
    }

    #[tokio::test]
    async fn structured_mode_degrades_to_message_on_bad_json() {
        let provider = ScriptedProvider::with_replies([Completion::from_text("{broken\n---\n")]);
        let agent = agent(PlannerMode::Structured, provider);
        let reply = agent.respond(&input("plan it")).await.unwrap();

        assert!(reply.plan.is_none());
        assert_eq!(reply.message, FALLBACK_PLAN_MESSAGE);
        assert_eq!(agent.metrics.snapshot().unparsed_replies_total, 1);
    }

    #[tokio::test]
    async fn extraction_mode_merges_two_calls() {
        let provider = ScriptedProvider::with_replies([
            Completion::from_function_call(
                TRIP_UPDATE_FUNCTION,
                r#"{"destination":"Lisbon","budget":"100 EUR per day"}"#,
            ),
            Completion::from_text("Lisbon it is! When would you like to go?"),
        ]);
        let reply = agent(PlannerMode::Extraction, provider.clone())
            .respond(&input("Actually make it Lisbon, about 100 EUR a day"))
            .await
            .unwrap();

        let update = reply.updated_trip_details.expect("update should be returned");
        assert_eq!(update.destination.as_deref(), Some("Lisbon"));
        assert_eq!(update.budget, Some(Budget::Note("100 EUR per day".to_string())));
        assert_eq!(reply.message, "Lisbon it is! When would you like to go?");

        let sent = provider.requests();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].function.is_some());
        assert!(sent[1].function.is_none());
        assert!(sent[1].prompt.system.contains("Destination: Lisbon"));
    }

    #[tokio::test]
    async fn extraction_mode_with_bad_arguments_still_replies() {
        let provider = ScriptedProvider::with_replies([
            Completion::from_function_call(TRIP_UPDATE_FUNCTION, "{not json"),
            Completion::from_text("Tell me more about your trip."),
        ]);
        let reply = agent(PlannerMode::Extraction, provider)
            .respond(&input("hmm"))
            .await
            .unwrap();

        assert!(reply.updated_trip_details.is_none());
        assert_eq!(reply.message, "Tell me more about your trip.");
    }

    #[tokio::test]
    async fn upstream_failure_is_an_error() {
        let provider = ScriptedProvider::new();
        provider.push_failure("invalid api key");
        let agent = agent(PlannerMode::Itinerary, provider);

        let err = agent.respond(&input("hi")).await.unwrap_err();
        assert!(err.to_string().contains("invalid api key"));
        let snapshot = agent.metrics.snapshot();
        assert_eq!(snapshot.upstream_failures_total, 1);
        assert_eq!(snapshot.latency_samples, 1);
    }
}
