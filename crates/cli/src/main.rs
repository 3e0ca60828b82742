mod wizard;

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use voyage_agents::{ChatTurnInput, PlannerReply, TravelAgent};
use voyage_core::{
    interpret_plan_reply, ConversationTurn, GeneratedPlan, HistoryPolicy, PlannerMode,
    PromptBuilder, TripRequest,
};
use voyage_observability::{init_tracing, AppMetrics};
use voyage_providers::{ChatProvider, Provider, ProviderKind, ProviderSettings};

#[derive(Debug, Parser)]
#[command(name = "voyage")]
#[command(about = "Voyage Planner CLI")]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct SettingsArgs {
    /// openai, gemini or scripted; picked from available keys when omitted.
    #[arg(long, env = "VOYAGE_PROVIDER", global = true)]
    provider: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "VOYAGE_OPENAI_MODEL", global = true)]
    openai_model: Option<String>,

    #[arg(long, env = "VOYAGE_OPENAI_BASE_URL", global = true)]
    openai_base_url: Option<String>,

    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true, global = true)]
    google_api_key: Option<String>,

    #[arg(long, env = "VOYAGE_GEMINI_MODEL", global = true)]
    gemini_model: Option<String>,

    #[arg(long, env = "VOYAGE_GEMINI_BASE_URL", global = true)]
    gemini_base_url: Option<String>,

    /// itinerary, structured or extraction.
    #[arg(long, env = "VOYAGE_PLANNER_MODE", default_value = "structured", global = true)]
    mode: String,

    /// full or snapshot.
    #[arg(long, env = "VOYAGE_HISTORY", default_value = "full", global = true)]
    history: String,

    #[arg(long, env = "VOYAGE_HTTP_TIMEOUT_SECONDS", default_value_t = 60, global = true)]
    timeout_seconds: u64,
}

impl SettingsArgs {
    fn planner_mode(&self) -> Result<PlannerMode> {
        PlannerMode::parse(&self.mode)
            .with_context(|| format!("unknown planner mode `{}`", self.mode))
    }

    fn history_policy(&self) -> Result<HistoryPolicy> {
        HistoryPolicy::parse(&self.history)
            .with_context(|| format!("unknown history policy `{}`", self.history))
    }

    fn provider_settings(&self) -> Result<ProviderSettings> {
        let kind = self
            .provider
            .as_deref()
            .map(|value| {
                ProviderKind::parse(value).with_context(|| format!("unknown provider `{value}`"))
            })
            .transpose()?;

        Ok(ProviderSettings {
            kind,
            openai_api_key: self.openai_api_key.clone(),
            openai_model: self.openai_model.clone(),
            openai_base_url: self.openai_base_url.clone(),
            google_api_key: self.google_api_key.clone(),
            gemini_model: self.gemini_model.clone(),
            gemini_base_url: self.gemini_base_url.clone(),
            request_timeout: Duration::from_secs(self.timeout_seconds),
            ..ProviderSettings::default()
        })
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Collect trip details step by step, then chat with the planner.
    Plan {
        /// Skip the wizard and start from a saved trip (JSON).
        #[arg(long)]
        trip: Option<PathBuf>,
    },
    /// Print the system directive that would be sent for a trip.
    Prompt {
        #[arg(long)]
        trip: PathBuf,
    },
    /// Split a raw model reply into its plan and message.
    Interpret {
        /// Reads stdin when omitted.
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InterpretOutput {
    message: String,
    plan: Option<GeneratedPlan>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("voyage_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Plan { trip } => {
            let trip = match trip {
                Some(path) => load_trip(&path)?,
                None => {
                    let stdin = io::stdin();
                    let mut input = stdin.lock();
                    let Some(trip) = wizard::run_wizard(&mut input, &mut io::stdout())? else {
                        println!("No plan requested.");
                        return Ok(());
                    };
                    trip
                }
            };
            let agent = build_agent(&cli.settings)?;
            run_chat(&agent, trip).await?;
        }
        Command::Prompt { trip } => {
            let trip = load_trip(&trip)?;
            let builder = PromptBuilder::new(
                cli.settings.planner_mode()?,
                cli.settings.history_policy()?,
            );
            println!("{}", builder.system_directive(&trip));
        }
        Command::Interpret { file } => {
            let raw = match file {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("failed reading {}", path.display()))?,
                None => {
                    let mut raw = String::new();
                    io::stdin().read_to_string(&mut raw)?;
                    raw
                }
            };
            let interpreted = interpret_plan_reply(&raw);
            let output = InterpretOutput {
                message: interpreted.message,
                plan: interpreted.plan.into_parsed(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn build_agent(settings: &SettingsArgs) -> Result<TravelAgent<Provider>> {
    let provider = settings
        .provider_settings()?
        .build()
        .context("failed to initialize model provider")?;
    tracing::info!(provider = provider.name(), model = %provider.model(), "provider ready");

    Ok(TravelAgent::new(
        Arc::new(provider),
        settings.planner_mode()?,
        settings.history_policy()?,
        AppMetrics::shared(),
    ))
}

fn load_trip(path: &Path) -> Result<TripRequest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading trip file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid trip JSON in {}", path.display()))
}

async fn run_chat(agent: &TravelAgent<Provider>, mut trip: TripRequest) -> Result<()> {
    let mut messages: Vec<ConversationTurn> = Vec::new();

    println!("\nVoyage Planner chat mode. type 'exit' to quit.");
    if let Some(reply) = send(agent, &messages, &trip).await {
        messages.push(ConversationTurn::assistant(reply.message.clone()));
        show_reply(&reply);
    }

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }
        if message.is_empty() {
            continue;
        }

        messages.push(ConversationTurn::user(message));
        match send(agent, &messages, &trip).await {
            Some(reply) => {
                if let Some(update) = reply.updated_trip_details.as_ref() {
                    trip = trip.with_update(update);
                }
                messages.push(ConversationTurn::assistant(reply.message.clone()));
                show_reply(&reply);
            }
            None => {
                // Keep the transcript as it was before the failed turn.
                messages.pop();
            }
        }
    }

    Ok(())
}

async fn send(
    agent: &TravelAgent<Provider>,
    messages: &[ConversationTurn],
    trip: &TripRequest,
) -> Option<PlannerReply> {
    let input = ChatTurnInput {
        messages: messages.to_vec(),
        travel_data: trip.clone(),
    };
    match agent.respond(&input).await {
        Ok(reply) => Some(reply),
        Err(err) => {
            eprintln!("\nFailed to process chat request: {err}. Please try again.\n");
            None
        }
    }
}

fn show_reply(reply: &PlannerReply) {
    println!("\n{}\n", reply.message);

    if let Some(plan) = reply.plan.as_ref() {
        println!("{}", render_plan(plan));
    }
    if let Some(update) = reply.updated_trip_details.as_ref() {
        if let Ok(json) = serde_json::to_string(update) {
            println!("Updated trip details: {json}\n");
        }
    }
}

fn render_plan(plan: &GeneratedPlan) -> String {
    let mut lines = vec![format!("== {} ({}) ==", plan.destination, plan.duration)];

    if !plan.flights.is_empty() {
        lines.push("Flights:".to_string());
        for flight in &plan.flights {
            lines.push(format!("  - {}: {}", flight.airline, flight.price));
        }
    }
    if !plan.accommodations.is_empty() {
        lines.push("Stay:".to_string());
        for stay in &plan.accommodations {
            lines.push(format!("  - {}: {} per night", stay.name, stay.price_per_night));
        }
    }
    for day in &plan.daily_itinerary {
        lines.push(format!("Day {}:", day.day));
        for activity in &day.activities {
            lines.push(format!("  * {activity}"));
        }
        if !day.dining.is_empty() {
            lines.push(format!("  dining: {}", day.dining.join(", ")));
        }
    }
    if !plan.estimated_total.is_empty() {
        lines.push(format!("Estimated total: {}", plan.estimated_total));
    }

    lines.push(String::new());
    lines.join("\n")
}
