use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::Value as JsonValue;

use std::io;
use std::path::{Path, PathBuf};

use crate::card::{self, CardView, EntityDisplay};
use crate::config::{self, CardConfig};
use crate::hass::Hass;
use crate::rules::{self, ConditionalRule};
use crate::template::{self, EvalContext, Value};

use super::error::CommandError;
use super::output::{self, EvalData, MatchData, OutputMode, PathData, TemplatesData, VerifyData};

type CommandResult = Result<(), CommandError>;

#[derive(Parser)]
#[command(name = "acard")]
#[command(about = "Evaluate area card templates and state rules against a state snapshot")]
#[command(version)]
pub struct Cli {
    /// Path to card config (overrides ACARD_CONFIG env var and default location)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path to state snapshot (overrides ACARD_STATES env var and default location)
    #[arg(long, global = true)]
    pub states: Option<String>,

    /// User identity as JSON, replaces the user of the snapshot
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log evaluation details to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a template against the state snapshot
    Eval {
        /// Template such as "${state == 'on'}"; anything else is echoed back
        template: String,

        /// Entity bound to `state`
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Match state rules against the current value of an entity
    Match {
        /// Entity whose value is matched
        #[arg(short, long)]
        entity: String,

        /// Rules as a JSON5 list, e.g. "[{value: 20, operator: '>', color: 'red'}]"
        #[arg(short, long)]
        rules: String,

        /// Match against this value instead of the entity's current value
        #[arg(long)]
        value: Option<String>,
    },

    /// Resolve every entity of the card
    Render,

    /// List entities read by templates in the card config
    Templates,

    /// Card configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current card configuration
    Show,
    /// Show card configuration file path
    Path,
    /// Validate card configuration file
    Verify,
    /// Print an example card configuration
    Default,
}

pub fn execute(cli: Cli) -> CommandResult {
    let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet);

    match cli.command {
        Commands::Eval {
            ref template,
            ref entity,
        } => {
            let hass = load_states(cli.states.as_deref())?;
            let user = parse_user(cli.user.as_deref())?;
            let ctx = eval_context(&hass, user.as_ref());

            let value = template::evaluate(entity.as_deref(), template, &ctx)
                .map_err(|e| with_entity_suggestions(e.into(), entity.as_deref(), &hass))?;

            match output_mode {
                OutputMode::Json => output::print_json(&EvalData {
                    template: template.clone(),
                    entity: entity.clone(),
                    is_template: template::is_template(template),
                    value_type: value.type_of(),
                    value: value.to_json(),
                }),
                OutputMode::Text => println!("{}", display_value(&value)),
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Match {
            ref entity,
            rules: ref rules_json,
            ref value,
        } => {
            let hass = load_states(cli.states.as_deref())?;
            let user = parse_user(cli.user.as_deref())?;
            let ctx = eval_context(&hass, user.as_ref());

            let rules: Vec<ConditionalRule> = json5::from_str(rules_json)
                .map_err(|e| CommandError::invalid_args(format!("invalid rules: {}", e)))?;

            let explicit = value.as_deref().map(parse_value);
            let current = match &explicit {
                Some(json) => Value::from_json(json),
                None => match hass.state(entity) {
                    Some(state) => card::current_value(state),
                    None => {
                        return Err(CommandError::entity_not_found(
                            entity,
                            hass.suggest_entities(entity),
                        ))
                    }
                },
            };

            let matched = rules::match_rules(Some(entity), &rules, &current, &ctx)
                .map_err(|e| with_entity_suggestions(e.into(), Some(entity), &hass))?;
            let index = matched.and_then(|m| rules.iter().position(|r| std::ptr::eq(r, m)));

            match output_mode {
                OutputMode::Json => output::print_json(&MatchData {
                    entity: entity.clone(),
                    value: current.to_json(),
                    index,
                    rule: matched.cloned(),
                }),
                OutputMode::Text => match (index, matched) {
                    (Some(index), Some(rule)) => {
                        let rule =
                            serde_json::to_string(rule).context("Failed to serialize rule")?;
                        println!("rule {} matched: {}", index, rule);
                    }
                    _ => println!("no rule matched {}", display_value(&current)),
                },
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Render => {
            let card_config = load_config(cli.config.as_deref())?;
            let hass = load_states(cli.states.as_deref())?;
            let user = parse_user(cli.user.as_deref())?;
            let ctx = eval_context(&hass, user.as_ref());

            let card = card::render_card(&card_config, &ctx)?;

            match output_mode {
                OutputMode::Json => output::print_json(&card),
                OutputMode::Text => print_card(&card),
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Templates => {
            let card_config = load_config(cli.config.as_deref())?;
            let hass = load_states(cli.states.as_deref())?;

            let raw = serde_json::to_value(&card_config).context("Failed to serialize config")?;
            let entities = card::templated_entities(&raw, &hass);

            match output_mode {
                OutputMode::Json => output::print_json(&TemplatesData { entities }),
                OutputMode::Text => {
                    for entity in &entities {
                        println!("{}", entity);
                    }
                }
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Config { ref command } => match command {
            ConfigCommands::Show => {
                let card_config = load_config(cli.config.as_deref())?;
                print_config(&card_config, output_mode)
            }
            ConfigCommands::Path => {
                let path = config::get_config_path(cli.config.as_deref())?;
                match output_mode {
                    OutputMode::Json => output::print_json(&PathData {
                        path: path.display().to_string(),
                        exists: path.exists(),
                    }),
                    OutputMode::Text => println!("{}", path.display()),
                    OutputMode::Quiet => {}
                }
                Ok(())
            }
            ConfigCommands::Default => {
                let card_config = config::default_with_examples();
                print_config(&card_config, output_mode)
            }
            ConfigCommands::Verify => {
                let path = config::get_config_path(cli.config.as_deref())?;
                let errors = config::verify(&path).map_err(config_error)?;
                verify_output(&path, errors, output_mode)
            }
        },

        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "acard", &mut io::stdout());
            Ok(())
        }
    }
}

fn verify_output(path: &Path, errors: Vec<String>, output_mode: OutputMode) -> CommandResult {
    if errors.is_empty() {
        match output_mode {
            OutputMode::Json => output::print_json(&VerifyData {
                path: path.display().to_string(),
                valid: true,
                errors,
            }),
            OutputMode::Text => println!("✓ Configuration is valid: {}", path.display()),
            OutputMode::Quiet => {}
        }
        return Ok(());
    }

    if !output_mode.is_json() && !output_mode.is_quiet() {
        println!(
            "✗ Configuration has {} error(s): {}",
            errors.len(),
            path.display()
        );
        println!();
        for error in &errors {
            println!("  - {}", error);
        }
    }

    Err(CommandError::config("configuration validation failed").with_details(errors))
}

fn print_config(card_config: &CardConfig, output_mode: OutputMode) -> CommandResult {
    match output_mode {
        OutputMode::Json => output::print_json(card_config),
        OutputMode::Text => {
            let json =
                serde_json::to_string_pretty(card_config).context("Failed to serialize config")?;
            println!("{}", json);
        }
        OutputMode::Quiet => {}
    }
    Ok(())
}

fn config_error(e: anyhow::Error) -> CommandError {
    CommandError::config(format!("{:#}", e))
}

fn load_config(explicit: Option<&str>) -> Result<CardConfig, CommandError> {
    let path = config::get_config_path(explicit).map_err(config_error)?;
    config::load(&path).map_err(config_error)
}

fn load_states(explicit: Option<&str>) -> Result<Hass, CommandError> {
    let path: PathBuf = config::get_states_path(explicit)
        .map_err(|e| CommandError::states(format!("{:#}", e)))?;

    if !path.exists() {
        return Err(CommandError::states(format!(
            "State snapshot not found: {}",
            path.display()
        )));
    }

    Hass::load(&path).map_err(|e| CommandError::states(format!("{:#}", e)))
}

fn parse_user(user: Option<&str>) -> Result<Option<JsonValue>, CommandError> {
    user.map(|u| {
        serde_json::from_str(u)
            .map_err(|e| CommandError::invalid_args(format!("invalid --user JSON: {}", e)))
    })
    .transpose()
}

fn eval_context<'a>(hass: &'a Hass, user: Option<&'a JsonValue>) -> EvalContext<'a> {
    let ctx = EvalContext::new(hass);
    match user {
        Some(user) => ctx.with_user(user),
        None => ctx,
    }
}

/// attach near-miss entity ids when the failure is a missing entity
fn with_entity_suggestions(
    mut error: CommandError,
    entity: Option<&str>,
    hass: &Hass,
) -> CommandError {
    if error.code == super::exit_codes::ENTITY_NOT_FOUND {
        if let Some(entity) = entity {
            error.suggestions = hass.suggest_entities(entity);
        }
    }
    error
}

/// `--value` as JSON5 when it parses, otherwise as a plain string
fn parse_value(value: &str) -> JsonValue {
    json5::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()))
}

fn display_value(value: &Value<'_>) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Markup(markup) => markup.to_string(),
        Value::Undefined => "undefined".to_string(),
        other => other.to_json().to_string(),
    }
}

fn print_card(card: &CardView) {
    if card.title.is_empty() {
        println!("(untitled) [size {}]", card.size);
    } else {
        println!("{} [size {}]", card.title, card.size);
    }
    if let Some(icon) = &card.icon {
        println!("icon: {}", icon);
    }
    if let Some(image) = &card.image {
        println!("image: {}", image);
    }

    let sections = [
        ("title", &card.title_entities),
        ("sensors", &card.sensors),
        ("buttons", &card.buttons),
    ];
    for (name, entities) in sections {
        if entities.is_empty() {
            continue;
        }
        println!("{}:", name);
        for entity in entities {
            println!("  {}", describe_entity(entity));
        }
    }

    if !card.templated_entities.is_empty() {
        println!("templated: {}", card.templated_entities.join(", "));
    }
}

fn describe_entity(display: &EntityDisplay) -> String {
    match display {
        EntityDisplay::Shown(view) => {
            let mut parts = vec![view.entity.clone()];
            if let Some(text) = &view.state_text {
                parts.push(text.clone());
            }
            if let Some(icon) = &view.icon {
                parts.push(format!("icon={}", icon));
            }
            if let Some(color) = &view.color {
                parts.push(format!("color={}", color));
            }
            if view.active {
                parts.push("active".to_string());
            }
            parts.join("  ")
        }
        EntityDisplay::Hidden { entity } => format!("{}  (hidden)", entity),
        EntityDisplay::Unavailable { entity } => format!("{}  (unavailable)", entity),
    }
}
