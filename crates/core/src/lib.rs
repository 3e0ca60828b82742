pub mod interpret;
pub mod models;
pub mod prompt;
pub mod wizard;

pub use interpret::{
    interpret_function_arguments, interpret_plan_reply, InterpretedReply, ParseOutcome,
    PlanOutcome, FALLBACK_PLAN_MESSAGE,
};
pub use models::*;
pub use prompt::{
    Prompt, PromptBuilder, NOT_SPECIFIED, PLAN_SCHEMA_EXAMPLE, PLAN_SEPARATOR,
    TRIP_UPDATE_FUNCTION,
};
pub use wizard::{StepSubmission, Wizard, WizardError, WizardStep};
