use serde::{Deserialize, Serialize};

use crate::models::{
    is_unset_text, Budget, ChildAgeBand, ConversationTurn, DateRange, GroupComposition,
    HistoryPolicy, PlannerMode, Role, TripRequest,
};

pub const NOT_SPECIFIED: &str = "Not specified";
pub const PLAN_SEPARATOR: &str = "---";
pub const TRIP_UPDATE_FUNCTION: &str = "update_trip_details";

const SNAPSHOT_REQUEST: &str = "Please generate my travel plan from the trip details above.";
const KICKOFF_REQUEST: &str = "Let's start planning my trip.";

pub const PLAN_SCHEMA_EXAMPLE: &str = r#"{
  "destination": "City, Country",
  "duration": "X Days, Y Nights",
  "flights": [
    { "airline": "Airline Name", "price": "USD XXX" }
  ],
  "accommodations": [
    { "name": "Hotel Name", "pricePerNight": "USD XXX" }
  ],
  "dailyItinerary": [
    {
      "day": 1,
      "activities": ["Activity 1", "Activity 2"],
      "dining": ["Restaurant for Lunch", "Restaurant for Dinner"]
    }
  ],
  "estimatedTotal": "USD XXXX"
}"#;

/// Directive plus the turns to replay, ready for a provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub turns: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    mode: PlannerMode,
    history: HistoryPolicy,
}

impl PromptBuilder {
    pub fn new(mode: PlannerMode, history: HistoryPolicy) -> Self {
        Self { mode, history }
    }

    pub fn mode(&self) -> PlannerMode {
        self.mode
    }

    pub fn history(&self) -> HistoryPolicy {
        self.history
    }

    pub fn system_directive(&self, trip: &TripRequest) -> String {
        match self.mode {
            PlannerMode::Itinerary => itinerary_directive(trip),
            PlannerMode::Structured => structured_plan_directive(trip),
            PlannerMode::Extraction => extraction_directive(trip),
        }
    }

    pub fn build(&self, trip: &TripRequest, history: &[ConversationTurn]) -> Prompt {
        Prompt {
            system: self.system_directive(trip),
            turns: self.replayed_turns(history),
        }
    }

    /// Second call of extraction mode: a plain conversational directive over the merged trip.
    pub fn build_follow_up(&self, trip: &TripRequest, history: &[ConversationTurn]) -> Prompt {
        Prompt {
            system: itinerary_directive(trip),
            turns: self.replayed_turns(history),
        }
    }

    fn replayed_turns(&self, history: &[ConversationTurn]) -> Vec<ConversationTurn> {
        match self.history {
            HistoryPolicy::Snapshot => vec![ConversationTurn::user(SNAPSHOT_REQUEST)],
            HistoryPolicy::Full => {
                let mut turns = history
                    .iter()
                    .filter(|turn| !turn.content.trim().is_empty())
                    .cloned()
                    .collect::<Vec<_>>();
                // Providers reject a transcript that opens with an assistant turn.
                if turns.first().map(|turn| turn.role) != Some(Role::User) {
                    turns.insert(0, ConversationTurn::user(KICKOFF_REQUEST));
                }
                turns
            }
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(PlannerMode::Structured, HistoryPolicy::Full)
    }
}

pub fn trip_details_block(trip: &TripRequest) -> String {
    [
        format!("- Destination: {}", render_text(&trip.destination)),
        format!("- Dates: {}", render_dates(&trip.dates)),
        format!("- Interests: {}", render_interests(trip)),
        format!("- Group: {}", render_group(&trip.group)),
        format!("- Budget: {}", render_budget(trip.budget.as_ref())),
    ]
    .join("\n")
}

pub fn itinerary_directive(trip: &TripRequest) -> String {
    format!(
        "You are a friendly and knowledgeable travel assistant. Your goal is to help the user plan their perfect trip based on their preferences.\n\
         Here is the user's travel data:\n\
         {details}\n\n\
         Based on this information, generate an initial, detailed, day-by-day travel itinerary. Be creative and suggest specific places, restaurants, and activities.\n\
         After presenting the initial plan, engage the user in a conversation to refine the itinerary. Be proactive in asking questions to better understand their needs.\n\
         Format your responses clearly. Use markdown for lists and emphasis.",
        details = trip_details_block(trip),
    )
}

pub fn structured_plan_directive(trip: &TripRequest) -> String {
    format!(
        "You are a helpful travel planning assistant. The user wants to plan a trip.\n\n\
         User's trip details:\n\
         {details}\n\n\
         Your task:\n\
         1. Create a detailed, personalized travel plan based on the user's details.\n\
         2. The plan MUST be valid JSON that follows this exact structure:\n\
         ```json\n{schema}\n```\n\
         3. After the JSON block, write the separator line {separator}\n\
         4. Finally, write a friendly, conversational message summarizing the plan. This message is shown to the user in the chat.\n\
         After the first plan, keep refining it with the user; every reply uses the same JSON, {separator}, message layout.",
        details = trip_details_block(trip),
        schema = PLAN_SCHEMA_EXAMPLE,
        separator = PLAN_SEPARATOR,
    )
}

pub fn extraction_directive(trip: &TripRequest) -> String {
    format!(
        "You are a travel planning assistant collecting trip preferences from a conversation.\n\
         Trip details known so far:\n\
         {details}\n\n\
         Read the user's latest message. If it mentions a destination, dates, interests, group size or budget, \
         call the `{function}` function with only the fields the user stated. Use YYYY-MM-DD for dates.",
        details = trip_details_block(trip),
        function = TRIP_UPDATE_FUNCTION,
    )
}

fn render_text(value: &str) -> String {
    if is_unset_text(value) {
        NOT_SPECIFIED.to_string()
    } else {
        value.trim().to_string()
    }
}

fn render_dates(dates: &DateRange) -> String {
    if !dates.has_any_date() {
        return dates
            .description
            .as_deref()
            .map(render_text)
            .unwrap_or_else(|| NOT_SPECIFIED.to_string());
    }

    let start = dates
        .start
        .map(|value| value.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());
    let end = dates
        .end
        .map(|value| value.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());

    match dates.duration_days() {
        Some(days) => format!("{start} to {end} ({days} days)"),
        None => format!("{start} to {end}"),
    }
}

fn render_interests(trip: &TripRequest) -> String {
    let interests = trip.all_interests();
    if interests.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        interests.join(", ")
    }
}

fn render_group(group: &GroupComposition) -> String {
    let adults = if group.adults == 1 {
        "1 adult".to_string()
    } else {
        format!("{} adults", group.adults)
    };
    if group.children == 0 {
        return adults;
    }

    let ages = group
        .children_ages
        .iter()
        .filter(|band| **band != ChildAgeBand::Unspecified)
        .map(|band| band.label())
        .collect::<Vec<_>>();
    if ages.is_empty() {
        format!("{adults}, {} children", group.children)
    } else {
        format!("{adults}, {} children (ages {})", group.children, ages.join(", "))
    }
}

fn render_budget(budget: Option<&Budget>) -> String {
    match budget {
        Some(Budget::Daily(daily)) => format!(
            "{} {} per day (accommodation {}, food {}, activities {})",
            daily.daily_total(),
            daily.currency,
            daily.accommodation,
            daily.food,
            daily.activities
        ),
        Some(Budget::Note(note)) => render_text(note),
        None => NOT_SPECIFIED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::DailyBudget;

    fn full_trip() -> TripRequest {
        TripRequest {
            destination: "Kyoto, Japan".to_string(),
            dates: DateRange::new(
                NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
                NaiveDate::from_ymd_opt(2025, 4, 9).unwrap(),
            ),
            interests: vec!["culture".to_string(), "food".to_string()],
            custom_interests: vec!["tea ceremonies".to_string()],
            group: GroupComposition::new(2, 0),
            budget: Some(Budget::Daily(DailyBudget {
                accommodation: 180,
                food: 60,
                activities: 40,
                currency: "JPY".to_string(),
            })),
        }
    }

    #[test]
    fn restates_every_known_field() {
        let prompt = structured_plan_directive(&full_trip());

        assert!(prompt.contains("Kyoto, Japan"));
        assert!(prompt.contains("2025-04-02 to 2025-04-09"));
        assert!(prompt.contains("culture, food, tea ceremonies"));
        assert!(prompt.contains("280 JPY per day"));
        assert!(prompt.contains("accommodation 180, food 60, activities 40"));
        assert!(prompt.contains("2 adults"));
    }

    #[test]
    fn missing_dates_render_placeholder() {
        let trip = TripRequest {
            destination: "Oslo".to_string(),
            ..TripRequest::default()
        };
        let prompt = itinerary_directive(&trip);

        assert!(prompt.contains("- Dates: Not specified\n"));
        assert!(prompt.contains("- Budget: Not specified"));
        assert!(!prompt.contains("None"));
        assert!(!prompt.contains("null"));

        let dates = DateRange {
            start: NaiveDate::from_ymd_opt(2025, 4, 2),
            ..DateRange::default()
        };
        assert_eq!(render_dates(&dates), "2025-04-02 to Not specified");
    }

    #[test]
    fn structured_directive_embeds_schema_and_separator() {
        let prompt = structured_plan_directive(&full_trip());
        assert!(prompt.contains(PLAN_SCHEMA_EXAMPLE));
        assert!(prompt.contains("\"pricePerNight\""));
        assert!(prompt.contains(PLAN_SEPARATOR));
    }

    #[test]
    fn children_ages_are_listed_when_known() {
        let mut group = GroupComposition::new(2, 2);
        group.children_ages[0] = ChildAgeBand::Infant;
        assert_eq!(render_group(&group), "2 adults, 2 children (ages 0-2 years)");
    }

    #[test]
    fn full_history_prepends_kickoff_before_assistant_greeting() {
        let builder = PromptBuilder::new(PlannerMode::Itinerary, HistoryPolicy::Full);
        let history = vec![
            ConversationTurn::assistant("Where are you dreaming of going?"),
            ConversationTurn::user("Somewhere warm"),
        ];
        let prompt = builder.build(&TripRequest::default(), &history);

        assert_eq!(prompt.turns.len(), 3);
        assert_eq!(prompt.turns[0].role, Role::User);
        assert_eq!(prompt.turns[2].content, "Somewhere warm");
    }

    #[test]
    fn snapshot_policy_ignores_history() {
        let builder = PromptBuilder::new(PlannerMode::Structured, HistoryPolicy::Snapshot);
        let history = vec![ConversationTurn::user("make it cheaper")];
        let prompt = builder.build(&full_trip(), &history);

        assert_eq!(prompt.turns, vec![ConversationTurn::user(SNAPSHOT_REQUEST)]);
    }
}
