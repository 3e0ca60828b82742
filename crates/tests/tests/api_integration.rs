use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use voyage_api::{build_router, ApiConfig, ApiState, CHAT_FAILURE_MESSAGE};
use voyage_core::{PlannerMode, MAX_CHILDREN, TRIP_UPDATE_FUNCTION};
use voyage_providers::{Completion, Provider, ScriptedProvider};

const PLAN_REPLY: &str = r#"```json
{
  "destination": "Lisbon, Portugal",
  "duration": "4 Days, 3 Nights",
  "flights": [{ "airline": "TAP", "price": "EUR 180" }],
  "accommodations": [{ "name": "Casa Alfama", "pricePerNight": "EUR 95" }],
  "dailyItinerary": [
    { "day": 1, "activities": ["Tram 28", "Sao Jorge Castle"], "dining": ["Time Out Market"] }
  ],
  "estimatedTotal": "EUR 950"
}
```
---
Here's a relaxed four days in Lisbon with plenty of pastel de nata."#;

fn app_with(provider: &ScriptedProvider, config: ApiConfig) -> Router {
    build_router(ApiState::new(Provider::scripted(provider.clone()), &config))
}

fn app(provider: &ScriptedProvider) -> Router {
    app_with(provider, ApiConfig::default())
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn lisbon_chat() -> Value {
    json!({
        "messages": [{ "role": "user", "content": "Plan my Lisbon trip" }],
        "travelData": {
            "destination": "Lisbon",
            "dates": { "start": "2025-09-10", "end": "2025-09-14" },
            "interests": ["food", "history"],
            "group": { "adults": 2, "children": 0 },
            "budget": { "accommodation": 100, "food": 50, "activities": 30, "currency": "EUR" }
        }
    })
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_provider_and_mode() {
    let app = app(&ScriptedProvider::new());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = json_body(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["provider"], "scripted");
    assert_eq!(parsed["mode"], "structured");
    assert!(parsed["metrics"].get("requests_total").is_some());
}

#[tokio::test]
async fn chat_returns_plan_and_message() {
    let provider = ScriptedProvider::with_replies([Completion::from_text(PLAN_REPLY)]);
    let app = app(&provider);

    let response = app.oneshot(chat_request(lisbon_chat())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let parsed = json_body(response).await;
    assert_eq!(
        parsed["message"],
        "Here's a relaxed four days in Lisbon with plenty of pastel de nata."
    );
    assert_eq!(parsed["plan"]["destination"], "Lisbon, Portugal");
    assert_eq!(parsed["plan"]["accommodations"][0]["pricePerNight"], "EUR 95");
    assert_eq!(parsed["plan"]["dailyItinerary"][0]["day"], 1);
    assert!(parsed.get("error").is_none());

    let sent = provider.requests();
    let system = &sent[0].prompt.system;
    assert!(system.contains("Lisbon"));
    assert!(system.contains("2025-09-10 to 2025-09-14"));
    assert!(system.contains("food, history"));
    assert!(system.contains("180 EUR per day"));
}

#[tokio::test]
async fn malformed_plan_degrades_to_message() {
    let provider = ScriptedProvider::with_replies([Completion::from_text(
        "{ \"destination\": \"Lisbon\", \n---\nSorry, here is the gist of your plan.",
    )]);
    let app = app(&provider);

    let response = app.oneshot(chat_request(lisbon_chat())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["message"], "Sorry, here is the gist of your plan.");
    assert!(parsed.get("plan").is_none());
}

#[tokio::test]
async fn reply_without_separator_is_all_message() {
    let provider =
        ScriptedProvider::with_replies([Completion::from_text("Which month works best for you?")]);
    let app = app(&provider);

    let response = app.oneshot(chat_request(lisbon_chat())).await.unwrap();
    let parsed = json_body(response).await;
    assert_eq!(parsed["message"], "Which month works best for you?");
    assert!(parsed.get("plan").is_none());
}

#[tokio::test]
async fn upstream_failure_returns_generic_error() {
    let provider = ScriptedProvider::new();
    provider.push_failure("quota exceeded");
    let app = app(&provider);

    let response = app.oneshot(chat_request(lisbon_chat())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let parsed = json_body(response).await;
    assert_eq!(parsed, json!({ "error": CHAT_FAILURE_MESSAGE }));
}

#[tokio::test]
async fn placeholder_fields_render_as_not_specified() {
    let provider = ScriptedProvider::with_replies([Completion::from_text("Where would you like to go?")]);
    let app = app(&provider);

    let body = json!({
        "messages": [],
        "travelData": {
            "destination": "Not set",
            "dates": "Not set",
            "interests": "Not set",
            "groupSize": "Not set",
            "budget": "Not set"
        }
    });
    let response = app.oneshot(chat_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = provider.requests();
    let system = &sent[0].prompt.system;
    assert!(system.contains("- Destination: Not specified"));
    assert!(system.contains("- Dates: Not specified"));
    assert!(system.contains("- Budget: Not specified"));
    assert!(!system.contains("null"));
    // An empty transcript still opens with a user turn.
    assert_eq!(sent[0].prompt.turns.len(), 1);
}

#[tokio::test]
async fn extraction_mode_returns_updated_trip_details() {
    let provider = ScriptedProvider::with_replies([
        Completion::from_function_call(
            TRIP_UPDATE_FUNCTION,
            r#"{"destination":"Porto","startDate":"2025-10-01","endDate":"2025-10-05"}"#,
        ),
        Completion::from_text("Porto in October sounds lovely. Any must-see spots?"),
    ]);
    let config = ApiConfig {
        planner_mode: PlannerMode::Extraction,
        ..ApiConfig::default()
    };
    let app = app_with(&provider, config);

    let response = app.oneshot(chat_request(lisbon_chat())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(
        parsed["message"],
        "Porto in October sounds lovely. Any must-see spots?"
    );
    assert_eq!(parsed["updatedTripDetails"]["destination"], "Porto");
    assert_eq!(parsed["updatedTripDetails"]["startDate"], "2025-10-01");

    let sent = provider.requests();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].prompt.system.contains("2025-10-01 to 2025-10-05"));
}

#[tokio::test]
async fn malformed_request_body_is_rejected() {
    let app = app(&ScriptedProvider::new());

    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from("{\"messages\": 42"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn rate_limit_rejects_burst_from_one_client() {
    let provider = ScriptedProvider::offline("Tell me more.");
    let config = ApiConfig {
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 2,
        ..ApiConfig::default()
    };
    let app = app_with(&provider, config);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(chat_request(lisbon_chat()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(chat_request(lisbon_chat()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(json_body(response).await["error"], "rate_limited");

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn huge_child_count_is_clamped() {
    let provider = ScriptedProvider::with_replies([Completion::from_text("Sounds like a big family trip!")]);
    let app = app(&provider);

    let body = json!({
        "messages": [{ "role": "user", "content": "Plan something for everyone" }],
        "travelData": { "destination": "Lisbon", "group": { "adults": 1, "children": 4_000_000_000u32 } }
    });
    let response = app.oneshot(chat_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = provider.requests();
    assert!(sent[0].prompt.system.contains(&format!("{MAX_CHILDREN} children")));
    assert!(!sent[0].prompt.system.contains("4000000000"));
}
