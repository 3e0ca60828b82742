use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{is_unset_text, Budget, DailyBudget, DateRange, GroupComposition, TripRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Destination,
    Dates,
    Interests,
    Budget,
    Summary,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        Self::Destination,
        Self::Dates,
        Self::Interests,
        Self::Budget,
        Self::Summary,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Destination => 0,
            Self::Dates => 1,
            Self::Interests => 2,
            Self::Budget => 3,
            Self::Summary => 4,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Destination => "Where to?",
            Self::Dates => "When?",
            Self::Interests => "What interests you?",
            Self::Budget => "Budget & group",
            Self::Summary => "Review",
        }
    }

    fn following(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    fn preceding(self) -> Option<Self> {
        self.index().checked_sub(1).map(|idx| Self::ALL[idx])
    }
}

/// The values a step commits to the trip when the user presses "next".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSubmission {
    Destination(String),
    Dates {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    Interests {
        selected: Vec<String>,
        custom: Vec<String>,
    },
    Budget {
        budget: DailyBudget,
        group: GroupComposition,
    },
    Confirm,
}

impl StepSubmission {
    pub fn step(&self) -> WizardStep {
        match self {
            Self::Destination(_) => WizardStep::Destination,
            Self::Dates { .. } => WizardStep::Dates,
            Self::Interests { .. } => WizardStep::Interests,
            Self::Budget { .. } => WizardStep::Budget,
            Self::Confirm => WizardStep::Summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("{step:?} step is missing required field `{field}`")]
    MissingField {
        step: WizardStep,
        field: &'static str,
    },
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("currency code must not be empty")]
    MissingCurrency,
    #[error("submission for {submitted:?} does not match current step {current:?}")]
    StepMismatch {
        current: WizardStep,
        submitted: WizardStep,
    },
}

/// Linear trip wizard. Each transition consumes the wizard and returns the next one,
/// so the collected trip is only ever changed by an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wizard {
    step: WizardStep,
    trip: TripRequest,
}

impl Wizard {
    pub fn new() -> Self {
        Self::from_trip(TripRequest::default())
    }

    pub fn from_trip(trip: TripRequest) -> Self {
        Self {
            step: WizardStep::Destination,
            trip,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn trip(&self) -> &TripRequest {
        &self.trip
    }

    pub fn into_trip(self) -> TripRequest {
        self.trip
    }

    pub fn is_complete(&self) -> bool {
        self.step == WizardStep::Summary
    }

    /// Fraction of the progress bar filled, 0.0 at the first step and 1.0 at review.
    pub fn progress(&self) -> f32 {
        self.step.index() as f32 / (WizardStep::ALL.len() - 1) as f32
    }

    pub fn next(self, submission: StepSubmission) -> Result<Self, WizardError> {
        if self.step == WizardStep::Summary {
            return Ok(self);
        }
        if submission.step() != self.step {
            return Err(WizardError::StepMismatch {
                current: self.step,
                submitted: submission.step(),
            });
        }

        let Wizard { step, trip } = self;
        let trip = apply_submission(trip, submission)?;
        Ok(Self {
            step: step.following().unwrap_or(step),
            trip,
        })
    }

    pub fn back(self) -> Self {
        Self {
            step: self.step.preceding().unwrap_or(self.step),
            trip: self.trip,
        }
    }
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_submission(
    mut trip: TripRequest,
    submission: StepSubmission,
) -> Result<TripRequest, WizardError> {
    match submission {
        StepSubmission::Destination(destination) => {
            if is_unset_text(&destination) {
                return Err(WizardError::MissingField {
                    step: WizardStep::Destination,
                    field: "destination",
                });
            }
            trip.destination = destination.trim().to_string();
        }
        StepSubmission::Dates { start, end } => {
            let start = start.ok_or(WizardError::MissingField {
                step: WizardStep::Dates,
                field: "start",
            })?;
            let end = end.ok_or(WizardError::MissingField {
                step: WizardStep::Dates,
                field: "end",
            })?;
            if end < start {
                return Err(WizardError::EndBeforeStart { start, end });
            }
            trip.dates = DateRange::new(start, end);
        }
        StepSubmission::Interests { selected, custom } => {
            let selected = clean_tags(selected);
            let custom = clean_tags(custom);
            if selected.is_empty() && custom.is_empty() {
                return Err(WizardError::MissingField {
                    step: WizardStep::Interests,
                    field: "interests",
                });
            }
            trip.interests = selected;
            trip.custom_interests = custom;
        }
        StepSubmission::Budget { budget, group } => {
            if budget.currency.trim().is_empty() {
                return Err(WizardError::MissingCurrency);
            }
            let adults = group.adults.max(1);
            trip.group = GroupComposition { adults, ..group };
            trip.budget = Some(Budget::Daily(DailyBudget {
                currency: budget.currency.trim().to_uppercase(),
                ..budget
            }));
        }
        StepSubmission::Confirm => {}
    }
    Ok(trip)
}

fn clean_tags(values: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !cleaned.iter().any(|existing| existing == value) {
            cleaned.push(value.to_string());
        }
    }
    cleaned
}
