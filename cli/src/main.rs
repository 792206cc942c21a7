use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use flagtree_core::{Convention, OptionParser, SchemaDocument, Value, render_man_page, render_man_page_today};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "flagtree")]
#[command(about = "Parse argument vectors against declarative option schemas")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse arguments against a schema and print the bound values.
    Parse(ParseArgs),
    /// Print the help text of a schema, optionally for a subcommand path.
    Help(HelpArgs),
    /// Print a roff man page for a schema.
    Man(ManArgs),
    /// Validate one or more schema files.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Schema document (YAML, or JSON with a .json extension).
    #[arg(long)]
    schema: PathBuf,
    /// Use the Windows option convention regardless of the schema.
    #[arg(long)]
    windows: bool,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Output format for the parse report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// Arguments to parse (pass them after `--`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Debug, Args)]
struct HelpArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Subcommand path to show help for.
    path: Vec<String>,
}

#[derive(Debug, Args)]
struct ManArgs {
    /// Schema document (YAML, or JSON with a .json extension).
    #[arg(long)]
    schema: PathBuf,
    /// Date printed in the page header, as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<String>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema files to validate.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ParseReport {
    commands: Vec<String>,
    values: Vec<CommandValues>,
    remaining: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CommandValues {
    command: String,
    options: BTreeMap<String, Value>,
    arguments: BTreeMap<String, Value>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Help(args) => run_help(args),
        Command::Man(args) => run_man(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_parser(args: &SchemaArgs) -> Result<OptionParser, String> {
    let mut doc = SchemaDocument::load(&args.schema)
        .map_err(|e| format!("failed to load {}: {e}", args.schema.display()))?;
    if args.windows {
        doc.parser.convention = Convention::Windows;
    }
    debug!(schema = %args.schema.display(), command = %doc.command.name, "loaded schema");
    doc.into_parser()
        .map_err(|e| format!("{}: {e}", args.schema.display()))
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let mut parser = load_parser(&args.schema)?;

    let parsed = match parser.parse(args.args) {
        Ok(parsed) => parsed,
        Err(err) if err.is_help() => {
            print!("{}", err.message);
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };

    let values = parser
        .command()
        .active_chain()
        .into_iter()
        .map(|command| CommandValues {
            command: command.name.clone(),
            options: command.bound_values(),
            arguments: command.positional_values(),
        })
        .collect();
    let report = ParseReport {
        commands: parsed.commands,
        values,
        remaining: parsed.remaining,
    };

    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|e| format!("JSON serialization failed: {e}"))?,
        OutputFormat::Yaml => {
            serde_yaml::to_string(&report).map_err(|e| format!("YAML serialization failed: {e}"))?
        }
    };
    println!("{rendered}");
    Ok(())
}

fn run_help(args: HelpArgs) -> Result<(), String> {
    let mut parser = load_parser(&args.schema)?;
    if !parser.config().help_flag {
        if !args.path.is_empty() {
            return Err("the schema disables the help flag; cannot select a subcommand path".to_string());
        }
        print!("{}", parser.help());
        return Ok(());
    }

    let mut argv = args.path;
    argv.push("--help".to_string());
    match parser.parse(argv) {
        Err(err) if err.is_help() => {
            print!("{}", err.message);
            Ok(())
        }
        Err(err) => Err(err.to_string()),
        Ok(_) => Err("help was not produced".to_string()),
    }
}

fn run_man(args: ManArgs) -> Result<(), String> {
    let doc = SchemaDocument::load(&args.schema)
        .map_err(|e| format!("failed to load {}: {e}", args.schema.display()))?;
    let parser = doc
        .into_parser()
        .map_err(|e| format!("{}: {e}", args.schema.display()))?;

    let page = match args.date.as_deref() {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| format!("invalid --date `{raw}': {e}"))?;
            render_man_page(parser.command(), date)
        }
        None => render_man_page_today(parser.command()),
    };
    print!("{page}");
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut names = Vec::new();
    for path in &args.inputs {
        let doc = SchemaDocument::load(path)
            .map_err(|e| format!("failed to load {}: {e}", path.display()))?;
        let parser = doc
            .into_parser()
            .map_err(|e| format!("{}: {e}", path.display()))?;
        names.push(parser.command().name.clone());
    }
    println!(
        "Validated {} schema file(s): {}.",
        args.inputs.len(),
        names.join(", ")
    );
    Ok(())
}
