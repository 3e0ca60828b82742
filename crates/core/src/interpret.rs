use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{GeneratedPlan, TripDetailsUpdate};
use crate::prompt::PLAN_SEPARATOR;

pub const FALLBACK_PLAN_MESSAGE: &str = "Here is your travel plan!";

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z]*\n?").expect("valid code fence regex"));

const LOG_PREVIEW_GRAPHEMES: usize = 160;

/// Result of reading structured data out of model text.
///
/// `Unparsed` keeps the raw candidate so callers can log or show it; it is an
/// expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    Unparsed(String),
}

impl<T> ParseOutcome<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Unparsed(_) => None,
        }
    }

    pub fn into_parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Unparsed(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

pub type PlanOutcome = ParseOutcome<GeneratedPlan>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretedReply {
    pub message: String,
    pub plan: PlanOutcome,
}

/// Splits a structured-mode reply into its JSON plan and chat message.
pub fn interpret_plan_reply(raw: &str) -> InterpretedReply {
    let Some((candidate, trailing)) = raw.split_once(PLAN_SEPARATOR) else {
        return InterpretedReply {
            message: non_empty_or_fallback(raw),
            plan: ParseOutcome::Unparsed(raw.to_string()),
        };
    };

    let plan = parse_json_block::<GeneratedPlan>(candidate);
    if let ParseOutcome::Unparsed(block) = &plan {
        warn!(preview = %preview(block), "model plan block is not valid plan JSON");
    }

    InterpretedReply {
        message: non_empty_or_fallback(trailing),
        plan,
    }
}

/// Reads `update_trip_details` arguments; malformed payloads degrade to `Unparsed`.
pub fn interpret_function_arguments(arguments: &str) -> ParseOutcome<TripDetailsUpdate> {
    let outcome = parse_json_block::<TripDetailsUpdate>(arguments);
    if let ParseOutcome::Unparsed(block) = &outcome {
        warn!(preview = %preview(block), "function call arguments are not valid trip details");
    }
    outcome
}

pub fn parse_json_block<T: DeserializeOwned>(block: &str) -> ParseOutcome<T> {
    let cleaned = strip_code_fences(block);
    match serde_json::from_str::<T>(&cleaned) {
        Ok(value) => ParseOutcome::Parsed(value),
        Err(_) => ParseOutcome::Unparsed(block.trim().to_string()),
    }
}

pub fn strip_code_fences(block: &str) -> String {
    CODE_FENCE.replace_all(block, "").trim().to_string()
}

fn non_empty_or_fallback(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        FALLBACK_PLAN_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn preview(text: &str) -> String {
    let graphemes = text.graphemes(true).collect::<Vec<_>>();
    if graphemes.len() <= LOG_PREVIEW_GRAPHEMES {
        text.to_string()
    } else {
        graphemes[..LOG_PREVIEW_GRAPHEMES].concat() + "..."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLAN_JSON: &str = r#"{
      "destination": "Paris, France",
      "duration": "4 Days, 3 Nights",
      "flights": [{ "airline": "Air France", "price": "USD 640" }],
      "accommodations": [{ "name": "Hotel Lutetia", "pricePerNight": "USD 410" }],
      "dailyItinerary": [
        { "day": 1, "activities": ["Louvre"], "dining": ["Le Comptoir"] }
      ],
      "estimatedTotal": "USD 3200"
    }"#;

    #[test]
    fn fenced_plan_and_message_are_split() {
        let raw = format!("```json\n{PLAN_JSON}\n```\n---\n  I've crafted a wonderful trip to Paris!  \n");
        let reply = interpret_plan_reply(&raw);

        let expected: GeneratedPlan = serde_json::from_str(PLAN_JSON).unwrap();
        assert_eq!(reply.plan, ParseOutcome::Parsed(expected));
        assert_eq!(reply.message, "I've crafted a wonderful trip to Paris!");
    }

    #[test]
    fn plan_fields_round_trip_to_camel_case() {
        let reply = interpret_plan_reply(&format!("{PLAN_JSON}\n---\nEnjoy!"));
        let plan = reply.plan.parsed().expect("plan should parse");
        let value = serde_json::to_value(plan).unwrap();
        assert_eq!(value["accommodations"][0]["pricePerNight"], json!("USD 410"));
        assert_eq!(value["dailyItinerary"][0]["day"], json!(1));
    }

    #[test]
    fn malformed_json_keeps_message() {
        let reply = interpret_plan_reply("{ \"destination\": \"Rome\", oops }\n---\nHere you go.");
        assert!(!reply.plan.is_parsed());
        assert_eq!(reply.message, "Here you go.");
    }

    #[test]
    fn malformed_json_without_message_uses_fallback() {
        let reply = interpret_plan_reply("not json at all\n---\n   ");
        assert!(reply.plan.parsed().is_none());
        assert_eq!(reply.message, FALLBACK_PLAN_MESSAGE);
    }

    #[test]
    fn missing_separator_means_whole_text_is_message() {
        let raw = "  Paris is lovely in spring. Want me to draft a plan?  ";
        let reply = interpret_plan_reply(raw);
        assert_eq!(reply.message, raw.trim());
        assert!(reply.plan.parsed().is_none());
    }

    #[test]
    fn splits_on_first_separator_only() {
        let reply = interpret_plan_reply(&format!("{PLAN_JSON}\n---\nDay one --- then day two."));
        assert!(reply.plan.is_parsed());
        assert_eq!(reply.message, "Day one --- then day two.");
    }

    #[test]
    fn function_arguments_parse_fail_soft() {
        let parsed = interpret_function_arguments(r#"{"destination":"Bali","interests":"surfing"}"#);
        let update = parsed.into_parsed().expect("arguments should parse");
        assert_eq!(update.destination.as_deref(), Some("Bali"));
        assert_eq!(update.interests, Some(vec!["surfing".to_string()]));

        let broken = interpret_function_arguments("{\"destination\": ");
        assert_eq!(broken, ParseOutcome::Unparsed("{\"destination\":".to_string()));
    }

    #[test]
    fn preview_truncates_on_grapheme_boundary() {
        let text = "é".repeat(LOG_PREVIEW_GRAPHEMES + 5);
        let shortened = preview(&text);
        assert!(shortened.ends_with("..."));
        assert_eq!(shortened.graphemes(true).count(), LOG_PREVIEW_GRAPHEMES + 3);
    }
}
