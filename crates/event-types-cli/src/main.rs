//! `evtype` CLI — check calendar events against declarative event types.
//!
//! ## Usage
//!
//! ```sh
//! # Print the derived JSON Schema of every declared type
//! evtype schema --types types.json
//!
//! # Validate an event (stdin) against its type; exits 1 when invalid
//! cat event.json | evtype validate --types types.json
//!
//! # Validate with other events in scope and a fixed clock
//! evtype validate --types types.json --event event.json --events calendar.json \
//!     --now 2026-03-01T09:00:00Z
//!
//! # Render an event for display
//! evtype render --types types.json --event event.json --user user.json
//!
//! # Ask whether a user may perform an action
//! evtype can deletable --types types.json --event event.json --user user.json
//!
//! # Expand a recurring event into concrete occurrences
//! evtype expand --event event.json --limit 10
//! ```
//!
//! Set `RUST_LOG` (or pass `-v`) to see evaluation logs on stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use event_types::{
    compile_all, expand_occurrences, parse_declarations, CompiledEventType, Event, RenderContext,
    ValidationContext,
};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "evtype",
    version,
    about = "Validate, render, and authorize calendar events against declarative event types"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file (writes to stdout if omitted)
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Log evaluation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Where the event type declarations come from.
#[derive(Args)]
struct TypeArgs {
    /// JSON file holding one declaration or an array of declarations
    #[arg(long)]
    types: String,
    /// Declaration id to use (defaults to the event's `type`)
    #[arg(long = "type")]
    type_id: Option<String>,
}

/// The event under evaluation and the acting user.
#[derive(Args)]
struct EventArgs {
    /// Event JSON file (reads from stdin if omitted)
    #[arg(short, long)]
    event: Option<String>,
    /// JSON file describing the acting user
    #[arg(long)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the derived JSON Schema of the declared types
    Schema {
        #[command(flatten)]
        types: TypeArgs,
    },
    /// Validate an event; exits with status 1 when it is invalid
    Validate {
        #[command(flatten)]
        types: TypeArgs,
        #[command(flatten)]
        target: EventArgs,
        /// JSON array of other events in scope, for conflict rules
        #[arg(long)]
        events: Option<String>,
        /// Current instant (RFC 3339) for advance-window checks
        #[arg(long)]
        now: Option<String>,
    },
    /// Render an event's display properties
    Render {
        #[command(flatten)]
        types: TypeArgs,
        #[command(flatten)]
        target: EventArgs,
    },
    /// Print whether the user may perform an action on the event
    Can {
        /// Behavior name, e.g. draggable, resizable, editable, deletable
        action: String,
        #[command(flatten)]
        types: TypeArgs,
        #[command(flatten)]
        target: EventArgs,
    },
    /// Expand a recurring event into concrete occurrences
    Expand {
        /// Event JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        event: Option<String>,
        /// Maximum number of occurrences
        #[arg(long)]
        limit: Option<u16>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output.as_deref();

    match cli.command {
        Commands::Schema { types } => {
            let compiled = load_types(&types.types)?;
            let schema = match &types.type_id {
                Some(id) => find_type(&compiled, id)?.schema.clone(),
                None => Value::Object(
                    compiled
                        .iter()
                        .map(|t| (t.id.clone(), t.schema.clone()))
                        .collect(),
                ),
            };
            write_output(output, &to_pretty(&schema)?)?;
        }
        Commands::Validate {
            types,
            target,
            events,
            now,
        } => {
            let compiled = load_types(&types.types)?;
            let event = load_event(target.event.as_deref())?;
            let event_type = select_type(&compiled, &types, &event)?;
            let user = load_user(target.user.as_deref())?;
            let others = match events.as_deref() {
                Some(path) => load_events(path)?,
                None => Vec::new(),
            };

            let mut ctx = ValidationContext::default().with_events(&others);
            if let Some(now) = now.as_deref() {
                ctx = ctx.at(parse_now(now)?);
            }
            if let Some(user) = &user {
                ctx = ctx.as_user(user);
            }

            let result = event_type.validate(&event, &ctx);
            write_output(output, &to_pretty(&result)?)?;
            if !result.valid {
                io::stdout().flush().context("Failed to flush stdout")?;
                process::exit(1);
            }
        }
        Commands::Render { types, target } => {
            let compiled = load_types(&types.types)?;
            let event = load_event(target.event.as_deref())?;
            let event_type = select_type(&compiled, &types, &event)?;
            let user = load_user(target.user.as_deref())?;

            let rendered = event_type.render(&event, &RenderContext { user: user.as_ref() });
            write_output(output, &to_pretty(&rendered)?)?;
        }
        Commands::Can {
            action,
            types,
            target,
        } => {
            let compiled = load_types(&types.types)?;
            let event = load_event(target.event.as_deref())?;
            let event_type = select_type(&compiled, &types, &event)?;
            let user = load_user(target.user.as_deref())?;

            let allowed = event_type.can_perform(&action, &event, user.as_ref());
            write_output(output, &format!("{}\n", allowed))?;
        }
        Commands::Expand { event, limit } => {
            let event = load_event(event.as_deref())?;
            let occurrences = expand_occurrences(&event, limit)
                .with_context(|| format!("Failed to expand event '{}'", event.id))?;
            write_output(output, &to_pretty(&occurrences)?)?;
        }
    }

    Ok(())
}

/// Install a stderr subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_types(path: &str) -> Result<Vec<CompiledEventType>> {
    let text = read_input(Some(path))?;
    let declarations = parse_declarations(&text)
        .with_context(|| format!("Failed to parse event type declarations: {}", path))?;
    debug!(path, count = declarations.len(), "loaded declarations");
    Ok(compile_all(&declarations))
}

fn find_type<'a>(compiled: &'a [CompiledEventType], id: &str) -> Result<&'a CompiledEventType> {
    compiled.iter().find(|t| t.id == id).ok_or_else(|| {
        let known: Vec<&str> = compiled.iter().map(|t| t.id.as_str()).collect();
        anyhow::anyhow!(
            "Unknown event type: '{}'. Declared types: {}",
            id,
            known.join(", ")
        )
    })
}

/// The declaration named by `--type`, else the one matching the event's type.
fn select_type<'a>(
    compiled: &'a [CompiledEventType],
    types: &TypeArgs,
    event: &Event,
) -> Result<&'a CompiledEventType> {
    find_type(compiled, types.type_id.as_deref().unwrap_or(&event.event_type))
}

fn load_event(path: Option<&str>) -> Result<Event> {
    let text = read_input(path)?;
    Event::from_json(&text).context("Failed to parse event")
}

fn load_events(path: &str) -> Result<Vec<Event>> {
    let text = read_input(Some(path))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse events (expected a JSON array): {}", path))
}

fn load_user(path: Option<&str>) -> Result<Option<Value>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = read_input(Some(path))?;
    let user = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse user: {}", path))?;
    Ok(Some(user))
}

fn parse_now(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid --now timestamp (expected RFC 3339): {}", raw))
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    json.push('\n');
    Ok(json)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
