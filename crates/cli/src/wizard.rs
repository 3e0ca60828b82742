use std::io::{BufRead, Write};

use anyhow::Result;
use voyage_core::prompt::trip_details_block;
use voyage_core::{
    is_unset_text, parse_calendar_date, ChildAgeBand, DailyBudget, GroupComposition,
    StepSubmission, TripRequest, Wizard, WizardStep,
};

enum Answer<T = String> {
    Text(T),
    Back,
    Eof,
}

enum StepInput {
    Submit(StepSubmission),
    Back,
    Cancel,
}

/// Walks the terminal user through the trip wizard.
///
/// Returns `None` when the user declines at review or input runs out.
pub fn run_wizard<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Option<TripRequest>> {
    let mut wizard = Wizard::new();
    writeln!(out, "Plan a trip. Type 'back' at any prompt to return to the previous step.")?;

    loop {
        let step = wizard.step();
        writeln!(
            out,
            "\n[{}/{}] {} ({:.0}%)",
            step.index() + 1,
            WizardStep::ALL.len(),
            step.title(),
            wizard.progress() * 100.0
        )?;

        let step_input = match step {
            WizardStep::Destination => read_destination(input, out)?,
            WizardStep::Dates => read_dates(input, out)?,
            WizardStep::Interests => read_interests(input, out)?,
            WizardStep::Budget => read_budget(input, out)?,
            WizardStep::Summary => {
                writeln!(out, "{}", trip_details_block(wizard.trip()))?;
                match ask(input, out, "Generate my plan? [Y/n]")? {
                    Answer::Eof => StepInput::Cancel,
                    Answer::Back => StepInput::Back,
                    Answer::Text(text) if text.eq_ignore_ascii_case("n") => StepInput::Cancel,
                    Answer::Text(_) => return Ok(Some(wizard.into_trip())),
                }
            }
        };

        match step_input {
            StepInput::Cancel => return Ok(None),
            StepInput::Back => wizard = wizard.back(),
            StepInput::Submit(submission) => match wizard.clone().next(submission) {
                Ok(next) => wizard = next,
                Err(err) => writeln!(out, "  {err}")?,
            },
        }
    }
}

fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<Answer> {
    write!(out, "{label}: ")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Answer::Eof);
    }
    let line = line.trim();
    if line.eq_ignore_ascii_case("back") {
        return Ok(Answer::Back);
    }
    Ok(Answer::Text(line.to_string()))
}

macro_rules! answer_or_return {
    ($answer:expr) => {
        match $answer {
            Answer::Text(text) => text,
            Answer::Back => return Ok(StepInput::Back),
            Answer::Eof => return Ok(StepInput::Cancel),
        }
    };
}

fn read_destination<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<StepInput> {
    let destination = answer_or_return!(ask(input, out, "Destination")?);
    Ok(StepInput::Submit(StepSubmission::Destination(destination)))
}

fn read_dates<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<StepInput> {
    let start = answer_or_return!(ask(input, out, "Start date (YYYY-MM-DD)")?);
    let end = answer_or_return!(ask(input, out, "End date (YYYY-MM-DD)")?);

    let start_date = parse_calendar_date(&start);
    let end_date = parse_calendar_date(&end);
    for (raw, parsed) in [(&start, start_date), (&end, end_date)] {
        if parsed.is_none() && !raw.is_empty() {
            writeln!(out, "  could not read `{raw}` as a date")?;
        }
    }

    Ok(StepInput::Submit(StepSubmission::Dates {
        start: start_date,
        end: end_date,
    }))
}

fn read_interests<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<StepInput> {
    let selected = answer_or_return!(ask(
        input,
        out,
        "Interests (comma separated, e.g. food, museums, hiking)"
    )?);
    let custom = answer_or_return!(ask(input, out, "Anything else? (optional)")?);

    Ok(StepInput::Submit(StepSubmission::Interests {
        selected: split_list(&selected),
        custom: split_list(&custom),
    }))
}

fn read_budget<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<StepInput> {
    let accommodation = answer_or_return!(ask_amount(input, out, "Accommodation per day")?);
    let food = answer_or_return!(ask_amount(input, out, "Food per day")?);
    let activities = answer_or_return!(ask_amount(input, out, "Activities per day")?);
    let currency = answer_or_return!(ask(input, out, "Currency [USD]")?);
    let adults = answer_or_return!(ask_amount(input, out, "Adults [1]")?);
    let children = answer_or_return!(ask_amount(input, out, "Children [0]")?);

    let mut group = GroupComposition::new(adults.max(1), children);
    for index in 0..group.children as usize {
        let label = format!("Age of child {}", index + 1);
        let age = answer_or_return!(ask(input, out, &label)?);
        group.children_ages[index] = age_band(&age);
    }

    let currency = if is_unset_text(&currency) {
        "USD".to_string()
    } else {
        currency
    };

    Ok(StepInput::Submit(StepSubmission::Budget {
        budget: DailyBudget {
            accommodation,
            food,
            activities,
            currency,
        },
        group,
    }))
}

/// Re-asks until the answer is a whole number; blank means zero.
fn ask_amount<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
) -> Result<Answer<u32>> {
    loop {
        match ask(input, out, label)? {
            Answer::Back => return Ok(Answer::Back),
            Answer::Eof => return Ok(Answer::Eof),
            Answer::Text(text) if text.is_empty() => return Ok(Answer::Text(0)),
            Answer::Text(text) => match text.parse::<u32>() {
                Ok(value) => return Ok(Answer::Text(value)),
                Err(_) => writeln!(out, "  please enter a whole number")?,
            },
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn age_band(raw: &str) -> ChildAgeBand {
    match raw.trim().parse::<u8>() {
        Ok(0..=2) => ChildAgeBand::Infant,
        Ok(3..=5) => ChildAgeBand::Preschool,
        Ok(6..=12) => ChildAgeBand::SchoolAge,
        _ => ChildAgeBand::Unspecified,
    }
}
