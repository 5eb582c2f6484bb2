mod report;

use clap::{Parser, Subcommand, ValueEnum};
use form_rules::{
    Answers, FormDefinition, GraphValidation, PropertyType, answers_schema, evaluate_visibility,
    sanitize_answers, validate_form, validate_visibility_graph,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "FORM_RULES_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Check form definitions and answers against their visibility rules",
    long_about = "Runs the form rule engine over JSON files: rule graph checks, visibility, validation, sanitizing and schemas"
)]
struct Cli {
    /// Output mode for reports.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Check a form definition's structure and visibility rule graph.
    Check {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
    /// List the fields visible for a set of answers.
    Visibility {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the answers JSON object.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Validate the visible answers of a form.
    Validate {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Produce the submission payload from raw answers.
    Sanitize {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Fail instead of dropping invalid fields.
        #[arg(long)]
        strict: bool,
        /// Write the payload to a file instead of stdout.
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
    },
    /// Show the comparators a rule may use on a field type.
    Comparators {
        /// Property type (text, email, number, select, multi_select, date, files, url, phone).
        #[arg(long = "type", value_name = "TYPE")]
        field_type: String,
    },
    /// Print the form definition JSON Schema, or the answers schema of a form.
    Schema {
        #[arg(long, value_name = "FORM")]
        form: Option<PathBuf>,
        #[arg(long, value_name = "ANSWERS", requires = "form")]
        answers: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing();
    let format = cli.format;
    match cli.command {
        Command::Check { form } => run_check(&form, format),
        Command::Visibility { form, answers } => run_visibility(&form, &answers, format),
        Command::Validate { form, answers } => run_validate(&form, &answers, format),
        Command::Sanitize {
            form,
            answers,
            strict,
            out,
        } => run_sanitize(&form, &answers, strict, out.as_deref(), format),
        Command::Comparators { field_type } => run_comparators(&field_type, format),
        Command::Schema { form, answers } => run_schema(form.as_deref(), answers.as_deref()),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_form(path: &Path) -> CliResult<FormDefinition> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read form {}: {err}", path.display()))?;
    let definition: FormDefinition = serde_json::from_str(&contents)
        .map_err(|err| format!("invalid form definition {}: {err}", path.display()))?;
    debug!(form = %definition.id, properties = definition.properties.len(), "loaded form");
    Ok(definition)
}

fn load_answers(path: &Path) -> CliResult<Answers> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read answers {}: {err}", path.display()))?;
    match serde_json::from_str(&contents)? {
        Value::Object(map) => Ok(map),
        _ => Err(format!("answers in {} must be a JSON object", path.display()).into()),
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_check(form_path: &Path, format: OutputFormat) -> CliResult<()> {
    let definition = load_form(form_path)?;
    let structure = definition.check_structure();
    let graph = validate_visibility_graph(&definition);

    match format {
        OutputFormat::Json => print_json(&json!({
            "structureError": structure.as_ref().err().map(|err| err.to_string()),
            "graph": graph,
        }))?,
        OutputFormat::Text => {
            match &structure {
                Ok(()) => println!("Structure: ok"),
                Err(err) => println!("Structure: {err}"),
            }
            report::describe_graph(&graph);
        }
    }

    structure?;
    ensure_graph_valid(&graph)
}

fn ensure_graph_valid(graph: &GraphValidation) -> CliResult<()> {
    if graph.is_valid {
        Ok(())
    } else {
        Err(format!("{} rule error(s) found", graph.errors().count()).into())
    }
}

fn run_visibility(form_path: &Path, answers_path: &Path, format: OutputFormat) -> CliResult<()> {
    let definition = load_form(form_path)?;
    let answers = load_answers(answers_path)?;
    let visible = evaluate_visibility(&definition, &answers);
    let (shown, hidden): (Vec<&str>, Vec<&str>) = definition
        .property_ids()
        .partition(|id| visible.contains(*id));

    match format {
        OutputFormat::Json => print_json(&json!({ "visible": shown, "hidden": hidden })),
        OutputFormat::Text => {
            report::describe_fields("Visible fields", &shown);
            report::describe_fields("Hidden fields", &hidden);
            Ok(())
        }
    }
}

fn run_validate(form_path: &Path, answers_path: &Path, format: OutputFormat) -> CliResult<()> {
    let definition = load_form(form_path)?;
    let answers = load_answers(answers_path)?;
    let visible = evaluate_visibility(&definition, &answers);
    let result = validate_form(&definition.properties, &answers, &visible);

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => report::describe_validation(&result),
    }

    if result.is_valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_sanitize(
    form_path: &Path,
    answers_path: &Path,
    strict: bool,
    out: Option<&Path>,
    format: OutputFormat,
) -> CliResult<()> {
    let definition = load_form(form_path)?;
    let answers = load_answers(answers_path)?;
    let visible = evaluate_visibility(&definition, &answers);

    if strict {
        let result = validate_form(&definition.properties, &answers, &visible);
        if !result.is_valid {
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => report::describe_validation(&result),
            }
            return Err("validation failed".into());
        }
    }

    let sanitized = Value::Object(sanitize_answers(&definition.properties, &answers, &visible));
    let rendered = serde_json::to_string_pretty(&sanitized)?;
    match out {
        Some(path) => {
            fs::write(path, format!("{rendered}\n"))?;
            info!(path = %path.display(), "wrote sanitized answers");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn run_comparators(field_type: &str, format: OutputFormat) -> CliResult<()> {
    let kind: PropertyType = field_type.parse()?;
    let names: Vec<&str> = kind
        .available_comparators()
        .iter()
        .map(|comparator| comparator.as_str())
        .collect();
    match format {
        OutputFormat::Json => print_json(&names),
        OutputFormat::Text => {
            println!("{}", names.join("\n"));
            Ok(())
        }
    }
}

fn run_schema(form_path: Option<&Path>, answers_path: Option<&Path>) -> CliResult<()> {
    let Some(form_path) = form_path else {
        return print_json(&schemars::schema_for!(FormDefinition));
    };
    let definition = load_form(form_path)?;
    let answers = match answers_path {
        Some(path) => load_answers(path)?,
        None => Answers::new(),
    };
    let visible = evaluate_visibility(&definition, &answers);
    print_json(&answers_schema(&definition, &visible))
}
