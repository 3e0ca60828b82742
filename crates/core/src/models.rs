use chrono::{DateTime, NaiveDate};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    #[serde(alias = "model")]
    Assistant,
}

impl Role {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Which request strategy the planner runs for a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerMode {
    /// Conversational itinerary text, no structured plan.
    Itinerary,
    /// JSON plan block, `---`, then a chat message.
    Structured,
    /// Function-call field extraction followed by a conversational reply.
    Extraction,
}

impl PlannerMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "itinerary" | "chat" | "conversational" => Some(Self::Itinerary),
            "structured" | "plan" | "json" => Some(Self::Structured),
            "extraction" | "function_call" | "function-call" | "tools" => Some(Self::Extraction),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Itinerary => "itinerary",
            Self::Structured => "structured",
            Self::Extraction => "extraction",
        }
    }
}

/// How much of the conversation is replayed to the model on each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    Full,
    Snapshot,
}

impl HistoryPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "full" | "history" | "conversation" => Some(Self::Full),
            "snapshot" | "latest" | "form" => Some(Self::Snapshot),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Snapshot => "snapshot",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DateRangeWire")]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Free-text dates ("mid June") when the client has no calendar values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            description: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn has_any_date(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Whole days between start and end; `None` unless both are set and ordered.
    pub fn duration_days(&self) -> Option<i64> {
        let (start, end) = (self.start?, self.end?);
        let days = (end - start).num_days();
        (days >= 0).then_some(days)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DateRangeWire {
    Bounds {
        #[serde(default, alias = "startDate", deserialize_with = "lenient_date")]
        start: Option<NaiveDate>,
        #[serde(default, alias = "endDate", deserialize_with = "lenient_date")]
        end: Option<NaiveDate>,
        #[serde(default)]
        description: Option<String>,
    },
    Text(String),
}

impl From<DateRangeWire> for DateRange {
    fn from(wire: DateRangeWire) -> Self {
        match wire {
            DateRangeWire::Bounds {
                start,
                end,
                description,
            } => Self {
                start,
                end,
                description: description.filter(|value| !is_unset_text(value)),
            },
            DateRangeWire::Text(text) => {
                if let Some((start, end)) = text.split_once(" to ") {
                    if let (Some(start), Some(end)) =
                        (parse_calendar_date(start), parse_calendar_date(end))
                    {
                        return Self::new(start, end);
                    }
                }
                Self {
                    start: None,
                    end: None,
                    description: Some(text.trim().to_string()).filter(|value| !is_unset_text(value)),
                }
            }
        }
    }
}

/// Child age bands offered by the group step, keyed by their representative age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AgeBandWire", into = "u8")]
pub enum ChildAgeBand {
    Unspecified,
    Infant,
    Preschool,
    SchoolAge,
}

impl ChildAgeBand {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unspecified => "age not given",
            Self::Infant => "0-2 years",
            Self::Preschool => "3-5 years",
            Self::SchoolAge => "6-12 years",
        }
    }
}

/// Unknown codes and non-numeric values read as `Unspecified`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AgeBandWire {
    Code(u64),
    Other(de::IgnoredAny),
}

impl From<AgeBandWire> for ChildAgeBand {
    fn from(wire: AgeBandWire) -> Self {
        match wire {
            AgeBandWire::Code(1) => Self::Infant,
            AgeBandWire::Code(4) => Self::Preschool,
            AgeBandWire::Code(9) => Self::SchoolAge,
            AgeBandWire::Code(_) | AgeBandWire::Other(_) => Self::Unspecified,
        }
    }
}

impl From<ChildAgeBand> for u8 {
    fn from(value: ChildAgeBand) -> Self {
        match value {
            ChildAgeBand::Unspecified => 0,
            ChildAgeBand::Infant => 1,
            ChildAgeBand::Preschool => 4,
            ChildAgeBand::SchoolAge => 9,
        }
    }
}

/// Upper bound on children per trip; larger counts are clamped.
pub const MAX_CHILDREN: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "GroupWire")]
pub struct GroupComposition {
    pub adults: u32,
    pub children: u32,
    pub children_ages: Vec<ChildAgeBand>,
}

impl GroupComposition {
    pub fn new(adults: u32, children: u32) -> Self {
        Self {
            adults: adults.max(1),
            children: 0,
            children_ages: Vec::new(),
        }
        .with_children(children)
    }

    /// Sets the child count (clamped to [`MAX_CHILDREN`]), keeping known ages.
    pub fn with_children(mut self, children: u32) -> Self {
        self.children = children.min(MAX_CHILDREN);
        self.children_ages
            .resize(self.children as usize, ChildAgeBand::Unspecified);
        self
    }
}

impl Default for GroupComposition {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GroupWire {
    Size(u32),
    Text(String),
    Detailed {
        #[serde(default = "default_adults")]
        adults: u32,
        #[serde(default)]
        children: u32,
        #[serde(default, rename = "childrenAges", alias = "children_ages")]
        children_ages: Vec<ChildAgeBand>,
    },
}

impl From<GroupWire> for GroupComposition {
    fn from(wire: GroupWire) -> Self {
        match wire {
            GroupWire::Size(size) => Self::new(size, 0),
            // "2", "2 adults" or a placeholder such as "Not set".
            GroupWire::Text(text) => text
                .split_whitespace()
                .next()
                .and_then(|count| count.parse::<u32>().ok())
                .map(|size| Self::new(size, 0))
                .unwrap_or_default(),
            GroupWire::Detailed {
                adults,
                children,
                children_ages,
            } => Self {
                adults: adults.max(1),
                children: 0,
                children_ages,
            }
            .with_children(children),
        }
    }
}

fn default_adults() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBudget {
    #[serde(default)]
    pub accommodation: u32,
    #[serde(default)]
    pub food: u32,
    #[serde(default)]
    pub activities: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl DailyBudget {
    pub fn daily_total(&self) -> u64 {
        u64::from(self.accommodation) + u64::from(self.food) + u64::from(self.activities)
    }
}

impl Default for DailyBudget {
    fn default() -> Self {
        Self {
            accommodation: 0,
            food: 0,
            activities: 0,
            currency: default_currency(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Budget as either per-category daily amounts or a free-text note ("mid-range").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Budget {
    Daily(DailyBudget),
    Note(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    #[serde(default)]
    pub destination: String,
    #[serde(default, alias = "duration", deserialize_with = "null_as_default")]
    pub dates: DateRange,
    #[serde(default, deserialize_with = "string_list")]
    pub interests: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub custom_interests: Vec<String>,
    #[serde(default, alias = "groupSize", deserialize_with = "null_as_default")]
    pub group: GroupComposition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
}

impl TripRequest {
    /// Selected tags followed by free-text additions, blanks removed.
    pub fn all_interests(&self) -> Vec<&str> {
        self.interests
            .iter()
            .chain(self.custom_interests.iter())
            .map(|value| value.trim())
            .filter(|value| !is_unset_text(value))
            .collect()
    }

    pub fn daily_budget(&self) -> Option<&DailyBudget> {
        match self.budget.as_ref() {
            Some(Budget::Daily(daily)) => Some(daily),
            _ => None,
        }
    }

    /// Daily total times trip length, when both are known.
    pub fn estimated_trip_cost(&self) -> Option<u64> {
        let days = u64::try_from(self.dates.duration_days()?).ok()?;
        Some(self.daily_budget()?.daily_total() * days)
    }

    pub fn with_update(mut self, update: &TripDetailsUpdate) -> Self {
        if let Some(destination) = update
            .destination
            .as_deref()
            .filter(|value| !is_unset_text(value))
        {
            self.destination = destination.trim().to_string();
        }
        if let Some(start) = update.start_date {
            self.dates.start = Some(start);
        }
        if let Some(end) = update.end_date {
            self.dates.end = Some(end);
        }
        if let Some(description) = update
            .dates
            .as_deref()
            .filter(|value| !is_unset_text(value))
        {
            self.dates.description = Some(description.trim().to_string());
        }
        if let Some(interests) = update.interests.as_ref() {
            self.interests = interests.clone();
        }
        if let Some(adults) = update.adults {
            self.group.adults = adults.max(1);
        }
        if let Some(children) = update.children {
            self.group = self.group.with_children(children);
        }
        if let Some(budget) = update.budget.as_ref() {
            self.budget = Some(budget.clone());
        }
        self
    }
}

/// Partial trip fields produced by the model's `update_trip_details` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetailsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_date"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_date"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_string_list"
    )]
    pub interests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adults: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
}

impl TripDetailsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOption {
    pub airline: String,
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationOption {
    pub name: String,
    pub price_per_night: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub day: u32,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub dining: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    pub destination: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub flights: Vec<FlightOption>,
    #[serde(default)]
    pub accommodations: Vec<AccommodationOption>,
    #[serde(default)]
    pub daily_itinerary: Vec<ItineraryDay>,
    #[serde(default)]
    pub estimated_total: String,
}

/// Blank strings and the "Not set"/"Not specified" placeholders clients send for empty fields.
pub fn is_unset_text(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("not set")
        || trimmed.eq_ignore_ascii_case("not specified")
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (browser `toISOString`).
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|value| value.date_naive())
        })
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_calendar_date(value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date `{value}`"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringListWire {
    Many(Vec<String>),
    One(String),
}

impl StringListWire {
    fn into_values(self) -> Vec<String> {
        let values = match self {
            Self::Many(values) => values,
            Self::One(value) => vec![value],
        };
        values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !is_unset_text(value))
            .collect()
    }
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringListWire>::deserialize(deserializer)?
        .map(StringListWire::into_values)
        .unwrap_or_default())
}

fn optional_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringListWire>::deserialize(deserializer)?.map(StringListWire::into_values))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
