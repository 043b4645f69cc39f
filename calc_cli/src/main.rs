//! # Ortcalc CLI Application
//!
//! Terminal front end for the fire-safety calculators and project files.
//!
//! ```text
//! ortcalc evacuation --input route.json
//! ortcalc fire-risk --input - --json < warehouse.json
//! ortcalc project new depot.ort --engineer "A. Seitkali" --facility "Fuel depot"
//! ortcalc project add depot.ort ngps --input depot.json --label "Depot"
//! ortcalc project show depot.ort
//! ortcalc report depot.ort --out depot.pdf
//! ```
//!
//! Validation failures are listed field by field and exit with status 2.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;
use tracing::{debug, Level};

use calc_core::calculations::{parse_form, CalculationOutcome, CalculatorKind};
use calc_core::errors::CalcError;
use calc_core::file_io::{edit_project, load_project_with_lock_check, load_settings, write_bytes_atomic};
use calc_core::project::Project;
use calc_core::report::render_project_pdf;
use calc_core::settings::GlobalSettings;
use calc_core::save_project;

/// Exit status for rejected input
const EXIT_INVALID_INPUT: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "ortcalc", version, about = "Fire-safety calculators: evacuation time, fire risk, NGPS")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Estimate evacuation time for one escape route
    Evacuation(CalcArgs),
    /// Score the fire risk of a building
    FireRisk(CalcArgs),
    /// Determine whether an NGPS unit or fire post is needed
    Ngps(CalcArgs),
    /// Create and edit .ort project files
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Render a project to PDF
    Report {
        /// Project file
        path: PathBuf,
        /// Output PDF
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Debug, Args)]
struct CalcArgs {
    /// JSON form, or `-` for stdin
    #[arg(short, long)]
    input: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Settings JSON overriding the default policies
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum ProjectCommand {
    /// Create an empty project
    New {
        path: PathBuf,
        #[arg(long)]
        engineer: String,
        #[arg(long)]
        facility: String,
        #[arg(long, default_value = "")]
        organization: String,
    },
    /// Add a calculation from a JSON form
    Add {
        path: PathBuf,
        /// evacuation, fire-risk or ngps
        kind: CalculatorKind,
        #[arg(short, long)]
        input: PathBuf,
        /// Overrides the label in the form
        #[arg(long)]
        label: Option<String>,
    },
    /// Calculate every item and print a summary
    Show {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Remove an item by id (or unique id prefix)
    Remove { path: PathBuf, id: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<CalcError>() {
            Some(CalcError::ValidationFailed { errors }) => {
                eprintln!("Invalid input:");
                for e in errors {
                    eprintln!("  - {}", e);
                }
                ExitCode::from(EXIT_INVALID_INPUT)
            }
            _ => {
                eprintln!("Error: {:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}

fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Evacuation(args) => calculate(CalculatorKind::Evacuation, &args),
        Command::FireRisk(args) => calculate(CalculatorKind::FireRisk, &args),
        Command::Ngps(args) => calculate(CalculatorKind::Ngps, &args),
        Command::Project(cmd) => project(cmd),
        Command::Report { path, out } => report(&path, &out),
    }
}

fn calculate(kind: CalculatorKind, args: &CalcArgs) -> Result<()> {
    let body = read_input(&args.input)?;
    let settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => GlobalSettings::default(),
    };

    let item = parse_form(kind, &body)?;
    let outcome = item.calculate(&settings)?;
    debug!(kind = %kind, "calculation finished");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.result_json()?)?);
    } else {
        print_outcome(item.label(), &outcome);
    }
    Ok(())
}

fn project(cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::New {
            path,
            engineer,
            facility,
            organization,
        } => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            let project = Project::new(engineer, facility, organization);
            save_project(&project, &path)?;
            println!("Created {}", path.display());
        }
        ProjectCommand::Add {
            path,
            kind,
            input,
            label,
        } => {
            let mut item = parse_form(kind, &read_input(&input)?)?;
            if let Some(label) = label {
                item.set_label(label);
            }
            let id = edit_project(&path, &user_id(), |p| Ok(p.add_item(item)))
                .with_context(|| format!("adding to {}", path.display()))?;
            println!("Added {} item {}", kind, id);
        }
        ProjectCommand::Show { path, json } => show(&path, json)?,
        ProjectCommand::Remove { path, id } => {
            let (id, removed) = edit_project(&path, &user_id(), |p| {
                let id = p.resolve_id(&id)?;
                let item = p.remove_item(&id).ok_or_else(|| CalcError::ItemNotFound { id: id.to_string() })?;
                Ok((id, item))
            })?;
            println!("Removed {} '{}' ({})", removed.calc_type(), removed.label(), id);
        }
    }
    Ok(())
}

fn show(path: &Path, json: bool) -> Result<()> {
    let (project, lock) = load_project_with_lock_check(path)?;
    let evaluated = project.evaluate();

    if json {
        let items = evaluated
            .iter()
            .map(|e| -> Result<serde_json::Value, CalcError> {
                let entry = match &e.outcome {
                    Ok(outcome) => json!({
                        "id": e.id,
                        "label": e.item.label(),
                        "type": e.item.kind(),
                        "result": outcome.result_json()?,
                    }),
                    Err(err) => json!({
                        "id": e.id,
                        "label": e.item.label(),
                        "type": e.item.kind(),
                        "error": err,
                    }),
                };
                Ok(entry)
            })
            .collect::<Result<Vec<_>, CalcError>>()?;
        let doc = json!({ "meta": project.meta, "settings": project.settings, "items": items });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let meta = &project.meta;
    println!("{}", meta.facility);
    println!("Engineer: {}", meta.engineer);
    if !meta.organization.is_empty() {
        println!("Organization: {}", meta.organization);
    }
    println!("Modified: {}", meta.modified.format("%Y-%m-%d %H:%M UTC"));
    if let Some(lock) = lock {
        println!("Locked by {} since {}", lock.holder(), lock.locked_at.format("%Y-%m-%d %H:%M"));
    }
    println!();

    if evaluated.is_empty() {
        println!("No calculations.");
        return Ok(());
    }

    println!("{:<8}  {:<16}  {:<24}  RESULT", "ID", "TYPE", "LABEL");
    for e in &evaluated {
        let verdict = match &e.outcome {
            Ok(outcome) if outcome.needs_attention() => format!("! {}", outcome.headline()),
            Ok(outcome) => outcome.headline(),
            Err(err) => format!("not calculated: {}", err),
        };
        println!(
            "{:<8}  {:<16}  {:<24}  {}",
            e.short_id(),
            e.item.calc_type(),
            truncate(e.item.label(), 24),
            verdict
        );
    }
    Ok(())
}

fn report(path: &Path, out: &Path) -> Result<()> {
    let (project, _) = load_project_with_lock_check(path)?;
    let pdf = render_project_pdf(&project)?;
    write_bytes_atomic(&pdf, out)?;
    println!("Wrote {} bytes to {}", pdf.len(), out.display());
    Ok(())
}

fn print_outcome(label: &str, outcome: &CalculationOutcome) {
    if !label.is_empty() {
        println!("{}", label);
    }
    match outcome {
        CalculationOutcome::Evacuation(r) => {
            println!(
                "Evacuation time: {:.2} min (permitted {:.0} min)  {}",
                r.evacuation_time_min,
                r.required_time_min,
                r.status.display_name()
            );
            println!("Bottleneck: {}", r.bottleneck);
            let segments: Vec<String> = r
                .per_segment_throughput
                .iter()
                .map(|(s, q)| format!("{} {:.1}", s, q))
                .collect();
            println!("Throughput (people/min): {}", segments.join(", "));
            println!(
                "Breakdown: queue {:.2} + corridor {:.2} + stair {:.2} min, smoke x{:.2}, mobility x{:.2}",
                r.queue_time_min, r.horizontal_time_min, r.stair_time_min, r.smoke_multiplier, r.mobility_multiplier
            );
        }
        CalculationOutcome::FireRisk(r) => {
            println!("Fire risk: {:.1} / 100  {}", r.total_risk, r.risk_level.display_name());
            for f in &r.factors {
                if f.contribution != 0.0 {
                    println!("  {:<28} {:>+8.2}", f.name, f.contribution);
                }
            }
        }
        CalculationOutcome::Ngps(r) => {
            println!("{}", outcome.headline());
            if r.unit_type != calc_core::calculations::ngps::UnitType::NotRequired {
                println!(
                    "Staff: {} per shift, {} (3 shifts), {} (4 shifts)",
                    r.staff_per_shift, r.staff_for_3_shifts, r.staff_for_4_shifts
                );
            }
            println!("Basis: {}", r.justification);
        }
    }

    let heading = match outcome {
        CalculationOutcome::Ngps(_) => "Details:",
        _ => "Recommendations:",
    };
    println!("{}", heading);
    for note in outcome.notes() {
        println!("  - {}", note);
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut body = String::new();
        io::stdin().read_to_string(&mut body).context("reading stdin")?;
        Ok(body)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

/// Name recorded in lock files
fn user_id() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "ortcalc".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_calculator_command() {
        let cli = Cli::parse_from(["ortcalc", "-vv", "fire-risk", "--input", "-", "--json"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::FireRisk(args) => {
                assert_eq!(args.input, PathBuf::from("-"));
                assert!(args.json);
                assert!(args.settings.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_project_add() {
        let cli = Cli::parse_from([
            "ortcalc", "project", "add", "depot.ort", "fire_risk", "--input", "w.json", "--label", "North",
        ]);
        match cli.command {
            Command::Project(ProjectCommand::Add { kind, label, .. }) => {
                assert_eq!(kind, CalculatorKind::FireRisk);
                assert_eq!(label.as_deref(), Some("North"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let parsed = Cli::try_parse_from(["ortcalc", "project", "add", "p.ort", "sprinkler", "--input", "x"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 24), "short");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
