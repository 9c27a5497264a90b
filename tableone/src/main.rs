//! # tableone
//!
//! A CLI tool for building stratified descriptive statistics tables
//! ("Table 1") from a JSON request document.
//!
//! ## Overview
//!
//! tableone is built on top of tableonelib. It reads a request holding the
//! data, column metadata, the variables to summarize and the grouping
//! variables, builds the table and prints it as a terminal table or as the
//! serialized table model.
//!
//! ## Usage
//!
//! ```bash
//! # Build the table described by a request file
//! tableone request.json
//!
//! # Read the request from stdin
//! cat request.json | tableone -
//!
//! # Four significant digits, an overall column on the left
//! tableone request.json --digits 4 --overall left
//!
//! # Output the table model as JSON
//! tableone request.json --output json
//!
//! # Swap rows and columns
//! tableone request.json --transpose
//! ```

mod input;
mod logging;
mod render;

use std::path::Path;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use outstanding::cli::{App, CommandContext, HandlerResult, Output, RunResult};
use outstanding::OutputMode;
use tableonelib::query::DEFAULT_OVERALL_LABEL;
use tableonelib::{build_table, Overall, PercentMode, Placement, TableOptions};
use tracing::debug;

use input::Request;
use render::{create_theme, table_context, TABLE_TEMPLATE};

/// Arguments shared by the root command and `build`
fn table_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("request")
            .help("Request document (JSON); '-' reads stdin")
            .default_value("-"),
    )
    .arg(
        Arg::new("digits")
            .short('d')
            .long("digits")
            .value_parser(clap::value_parser!(usize))
            .help("Significant digits for continuous statistics"),
    )
    .arg(
        Arg::new("digits-pct")
            .long("digits-pct")
            .value_parser(clap::value_parser!(usize))
            .help("Decimal places for percentages"),
    )
    .arg(
        Arg::new("overall")
            .long("overall")
            .num_args(0..=1)
            .default_missing_value("right")
            .value_parser(["left", "right"])
            .help("Add an overall column at the left or right edge"),
    )
    .arg(
        Arg::new("overall-label")
            .long("overall-label")
            .help("Header of the overall column"),
    )
    .arg(
        Arg::new("percent")
            .long("percent")
            .value_parser(["column", "row"])
            .help("Normalize category percentages within columns or within rows"),
    )
    .arg(
        Arg::new("no-n")
            .long("no-n")
            .action(ArgAction::SetTrue)
            .help("Hide stratum sizes under the column headers"),
    )
    .arg(
        Arg::new("transpose")
            .short('t')
            .long("transpose")
            .action(ArgAction::SetTrue)
            .help("Swap rows and columns"),
    )
    .arg(Arg::new("caption").long("caption").help("Table caption"))
    .arg(Arg::new("footnote").long("footnote").help("Table footnote"))
    .arg(
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .help("Log pipeline details to stderr (-v debug, -vv trace)"),
    )
}

/// Build the clap Command structure
fn build_command() -> Command {
    table_args(
        Command::new("tableone")
            .version(env!("CARGO_PKG_VERSION"))
            .author("Arthur Debert")
            .about("Stratified descriptive statistics tables (\"Table 1\")"),
    )
    .subcommand(table_args(
        Command::new("build").about("Build a table from a request (default command)"),
    ))
}

/// Apply command-line overrides on top of the request's options
fn apply_overrides(
    mut options: TableOptions,
    matches: &ArgMatches,
) -> anyhow::Result<TableOptions> {
    if let Some(&digits) = matches.get_one::<usize>("digits") {
        options = options.digits(digits);
    }
    if let Some(&digits_pct) = matches.get_one::<usize>("digits-pct") {
        options = options.digits_pct(digits_pct);
    }

    let label = matches.get_one::<String>("overall-label");
    let placement = matches.get_one::<String>("overall");
    if label.is_some() || placement.is_some() {
        let current = options.overall.clone();
        let placement = match placement {
            Some(p) => p.parse::<Placement>().map_err(anyhow::Error::msg)?,
            None => current.as_ref().map(|o| o.placement).unwrap_or_default(),
        };
        let label = label
            .cloned()
            .or_else(|| current.map(|o| o.label))
            .unwrap_or_else(|| DEFAULT_OVERALL_LABEL.to_string());
        options = options.overall(Overall { label, placement });
    }

    if let Some(percent) = matches.get_one::<String>("percent") {
        let mode = match percent.as_str() {
            "row" => PercentMode::Row,
            _ => PercentMode::Column,
        };
        options = options.percent_mode(mode);
    }
    if matches.get_flag("no-n") {
        options = options.without_n();
    }
    if matches.get_flag("transpose") {
        options = options.transpose(true);
    }
    if let Some(caption) = matches.get_one::<String>("caption") {
        options = options.caption(caption.clone());
    }
    if let Some(footnote) = matches.get_one::<String>("footnote") {
        options = options.footnote(footnote.clone());
    }
    Ok(options)
}

/// Handler for the build command
fn build_handler(matches: &ArgMatches, ctx: &CommandContext) -> HandlerResult<serde_json::Value> {
    logging::init(matches.get_count("verbose"));

    let path = matches
        .get_one::<String>("request")
        .map(|s| s.as_str())
        .unwrap_or("-");
    let request = Request::load(Path::new(path))?;
    let dataset = request.dataset()?;
    let options = apply_overrides(request.options(), matches)?;
    debug!(
        records = dataset.len(),
        variables = request.variables.len(),
        "loaded request"
    );

    let table = build_table(&dataset, &request.metadata, &request.table_request(), &options)?;

    // For JSON mode, return the table model itself
    if ctx.output_mode.is_structured() {
        return Ok(Output::Render(serde_json::to_value(&table)?));
    }

    Ok(Output::Render(serde_json::to_value(table_context(&table))?))
}

fn main() -> ExitCode {
    let cmd = build_command();
    let theme = create_theme();

    let result = App::builder()
        .theme(theme)
        .command("build", build_handler, TABLE_TEMPLATE)
        .run_to_string(cmd, std::env::args());

    match result {
        RunResult::Handled(output) => {
            if !output.is_empty() {
                if output.starts_with("Error:") {
                    eprintln!("{}", output);
                    return ExitCode::FAILURE;
                }
                print!("{}", output);
            }
            ExitCode::SUCCESS
        }
        RunResult::Binary(_, _) => ExitCode::SUCCESS,
        RunResult::NoMatch(matches) => {
            // no subcommand: treat as build
            match run_default(&matches) {
                Ok(output) => {
                    print!("{}", output);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Output mode requested through outstanding's `--output` flag
fn output_mode(matches: &ArgMatches) -> OutputMode {
    match matches.get_one::<String>("_output_mode").map(String::as_str) {
        Some("json") => OutputMode::Json,
        Some("text") => OutputMode::Text,
        Some("term-debug") => OutputMode::TermDebug,
        Some("term") => OutputMode::Term,
        _ => OutputMode::Auto,
    }
}

/// Run the build handler outside of outstanding's dispatch
fn run_default(matches: &ArgMatches) -> anyhow::Result<String> {
    let ctx = CommandContext {
        output_mode: output_mode(matches),
        command_path: vec![],
    };
    match build_handler(matches, &ctx)? {
        Output::Render(value) => render_value(ctx.output_mode, &value),
        Output::Silent | Output::Binary { .. } => Ok(String::new()),
    }
}

/// Pretty JSON for structured modes, the table template otherwise
fn render_value(mode: OutputMode, value: &serde_json::Value) -> anyhow::Result<String> {
    if mode.is_structured() {
        return Ok(format!("{}\n", serde_json::to_string_pretty(value)?));
    }
    outstanding::render(TABLE_TEMPLATE, value, &create_theme()).map_err(|e| anyhow::anyhow!("{e}"))
}
