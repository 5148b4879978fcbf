use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use ocr_table_checker::{
    CorrectionSession, ImageLocator, InvalidReason, Phase, ScanReport, SessionState, Step,
    ValidationConfig, prefix_decimals_in_file, scan_file,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE_DIR: &str = "output";

#[derive(Debug, Parser)]
#[command(
    name = "tablecheck",
    version,
    about = "Review and correct OCR-produced table CSVs cell by cell"
)]
struct Cli {
    /// Log progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Walk through invalid and outlier cells interactively.
    Check(CheckArgs),
    /// List the cells that need attention without editing anything.
    Scan(ScanArgs),
    /// Prefix numeric cells outside the first column with a decimal point.
    PrefixDecimals(PrefixArgs),
}

#[derive(Debug, Args)]
struct ValidationArgs {
    /// JSON file with validation settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lower bound for cell values; enables the min/max check.
    #[arg(long, allow_hyphen_values = true)]
    min: Option<f64>,

    /// Upper bound for cell values; enables the min/max check.
    #[arg(long, allow_hyphen_values = true)]
    max: Option<f64>,

    /// Enable the std dev outlier check, optionally with a threshold.
    #[arg(
        long,
        value_name = "THRESHOLD",
        num_args = 0..=1,
        default_missing_value = "2"
    )]
    std_dev: Option<f64>,

    /// Accept the literal text "nan" as a valid value.
    #[arg(long)]
    ignore_nan: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// CSV produced by the OCR stage.
    #[arg(short, long)]
    csv: PathBuf,

    /// Folder holding row_N/col_M.png cell images for this table.
    #[arg(long, conflicts_with = "base")]
    images: Option<PathBuf>,

    /// Output root used to infer the image folder from the CSV location.
    #[arg(long, default_value = DEFAULT_BASE_DIR)]
    base: PathBuf,

    #[command(flatten)]
    validation: ValidationArgs,
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(short, long)]
    csv: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    validation: ValidationArgs,
}

#[derive(Debug, Args)]
struct PrefixArgs {
    #[arg(short, long)]
    csv: PathBuf,

    /// Count the cells that would change without saving.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Confirm(String),
    Keep,
    Clear,
    Goto(usize, usize),
    Recheck,
    Save,
    Status,
    Help,
    Quit,
}

const HELP: &str = "\
  <text>      store <text> in the current cell and move on
  <enter>     keep the current value and move on
  :clear      empty the current cell and move on
  :goto R C   jump to row R, column C (1-based)
  :recheck    re-run validation from the current cell
  :save       save the CSV now
  :status     show the session state
  :quit       stop without saving";

fn parse_command(line: &str) -> Result<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Command::Keep);
    }
    let Some(rest) = trimmed.strip_prefix(':') else {
        return Ok(Command::Confirm(line.trim_end_matches(['\r', '\n']).to_string()));
    };

    let mut parts = rest.split_whitespace();
    let command = match parts.next().unwrap_or_default() {
        "clear" | "c" => Command::Clear,
        "goto" | "g" => {
            let mut coord = || -> Result<usize> {
                let value = parts
                    .next()
                    .ok_or_else(|| anyhow!("usage: :goto ROW COL"))?;
                let number: usize = value
                    .parse()
                    .with_context(|| format!("invalid number '{value}'"))?;
                number
                    .checked_sub(1)
                    .ok_or_else(|| anyhow!("rows and columns are 1-based"))
            };
            let row = coord()?;
            let col = coord()?;
            Command::Goto(row, col)
        }
        "recheck" | "r" => Command::Recheck,
        "save" | "s" => Command::Save,
        "status" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        other => anyhow::bail!("unknown command ':{other}' (try :help)"),
    };
    Ok(command)
}

fn build_config(args: &ValidationArgs) -> Result<ValidationConfig> {
    let mut config = match &args.config {
        Some(path) => ValidationConfig::from_json_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => ValidationConfig::default(),
    };

    if args.min.is_some() || args.max.is_some() {
        config.use_min_max = true;
    }
    if let Some(min) = args.min {
        config.min_value = min;
    }
    if let Some(max) = args.max {
        config.max_value = max;
    }
    if let Some(threshold) = args.std_dev {
        config.use_std_dev = true;
        config.std_dev_threshold = threshold;
    }
    if args.ignore_nan {
        config.ignore_nan_literal = true;
    }

    config.validate().context("invalid validation settings")?;
    Ok(config)
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::InvalidPass => "invalid",
        Phase::OutlierPass => "outlier",
    }
}

fn print_prompt(out: &mut impl Write, session: &CorrectionSession) -> io::Result<()> {
    let Some(pos) = session.current() else {
        return Ok(());
    };
    let value = session.current_value().unwrap_or_default();
    let preview = session
        .preview()
        .map_or_else(|| "no preview".to_string(), |path| path.display().to_string());
    writeln!(
        out,
        "[{} pass] {pos}: {value:?} ({preview})",
        phase_label(session.phase())
    )?;
    write!(out, "> ")?;
    out.flush()
}

fn print_status(out: &mut impl Write, session: &CorrectionSession) -> io::Result<()> {
    let status = session.status();
    let position = status
        .position
        .map_or_else(|| "-".to_string(), |pos| pos.to_string());
    writeln!(
        out,
        "state={:?} pass={} position={position} outliers={} unsaved={}",
        status.state,
        phase_label(status.phase),
        status.outlier_count,
        status.unsaved_changes
    )
}

enum Outcome {
    Completed,
    Quit,
}

fn apply(
    session: &mut CorrectionSession,
    command: Command,
    out: &mut impl Write,
) -> Result<Option<Outcome>> {
    let step = match command {
        Command::Confirm(value) => Some(session.confirm(&value)?),
        Command::Keep => {
            let value = session.current_value().unwrap_or_default().to_string();
            Some(session.confirm(&value)?)
        }
        Command::Clear => Some(session.clear()?),
        Command::Goto(row, col) => {
            session.jump(row, col)?;
            None
        }
        Command::Recheck => Some(session.reclassify()?),
        Command::Save => {
            session.save()?;
            writeln!(out, "saved {}", session.path().display())?;
            None
        }
        Command::Status => {
            print_status(out, session)?;
            None
        }
        Command::Help => {
            writeln!(out, "{HELP}")?;
            None
        }
        Command::Quit => return Ok(Some(Outcome::Quit)),
    };

    if matches!(step, Some(Step::Completed))
        || (session.state() == SessionState::Done && !session.has_unsaved_changes())
    {
        return Ok(Some(Outcome::Completed));
    }
    Ok(None)
}

fn locator_for(args: &CheckArgs) -> Option<ImageLocator> {
    match &args.images {
        Some(dir) => Some(ImageLocator::new(dir)),
        None => ImageLocator::for_csv(&args.base, &args.csv),
    }
}

fn run_check(args: &CheckArgs) -> Result<Outcome> {
    let config = build_config(&args.validation)?;
    let mut session = CorrectionSession::open(&args.csv, config)
        .with_context(|| format!("failed to load '{}'", args.csv.display()))?;
    if let Some(locator) = locator_for(args) {
        tracing::info!(dir = %locator.table_dir().display(), "using cell images");
        session = session.with_locator(locator);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Step::Completed = session.start().context("failed to start session")? {
        writeln!(out, "No invalid or outlier cells; saved {}", args.csv.display())?;
        return Ok(Outcome::Completed);
    }

    print_prompt(&mut out, &session)?;
    for line in stdin.lock().lines() {
        let line = line.context("failed to read input")?;
        let outcome =
            parse_command(&line).and_then(|command| apply(&mut session, command, &mut out));
        match outcome {
            Ok(Some(Outcome::Completed)) => {
                writeln!(
                    out,
                    "No more invalid or outlier cells! CSV has been saved to: {}",
                    session.path().display()
                )?;
                return Ok(Outcome::Completed);
            }
            Ok(Some(Outcome::Quit)) => break,
            Ok(None) => {}
            Err(error) => writeln!(out, "error: {error:#}")?,
        }
        if session.state() == SessionState::Done {
            writeln!(out, "all cells reviewed but not saved; use :save to retry")?;
        }
        print_prompt(&mut out, &session)?;
    }

    if session.has_unsaved_changes() {
        writeln!(out, "quitting with unsaved changes")?;
    }
    Ok(Outcome::Quit)
}

fn describe_reason(reason: &InvalidReason) -> String {
    match reason {
        InvalidReason::Blank => "blank".to_string(),
        InvalidReason::Placeholder => "placeholder".to_string(),
        InvalidReason::NanLiteral => "nan literal".to_string(),
        InvalidReason::NotNumeric => "not a number".to_string(),
        InvalidReason::OutOfRange { min, max, .. } => format!("outside [{min}, {max}]"),
    }
}

fn print_report(out: &mut impl Write, report: &ScanReport) -> io::Result<()> {
    for cell in &report.invalid {
        writeln!(
            out,
            "invalid  {}: {:?} ({})",
            cell.pos,
            cell.value,
            describe_reason(&cell.reason)
        )?;
    }
    for cell in &report.outliers {
        writeln!(
            out,
            "outlier  {}: {:?} (mean {:.3}, std dev {:.3})",
            cell.pos, cell.value, cell.mean, cell.std_dev
        )?;
    }
    writeln!(
        out,
        "{} cell(s) need attention in {} row(s)",
        report.attention_count(),
        report.row_count
    )
}

fn run_scan(args: &ScanArgs) -> Result<ScanReport> {
    let config = build_config(&args.validation)?;
    let report = scan_file(&args.csv, &config)
        .with_context(|| format!("failed to scan '{}'", args.csv.display()))?;

    let mut out = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report).context("failed to write report")?;
        writeln!(out)?;
    } else {
        print_report(&mut out, &report)?;
    }
    Ok(report)
}

fn run_prefix(args: &PrefixArgs) -> Result<usize> {
    let changed = prefix_decimals_in_file(&args.csv, args.dry_run)
        .with_context(|| format!("failed to update '{}'", args.csv.display()))?;
    let verb = if args.dry_run { "would change" } else { "changed" };
    println!("{verb} {changed} cell(s) in {}", display_name(&args.csv));
    Ok(changed)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "ocr_table_checker=info,tablecheck=info"
    } else {
        "ocr_table_checker=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let result = match &cli.command {
        Commands::Check(args) => run_check(args).map(|outcome| match outcome {
            Outcome::Completed => ExitCode::SUCCESS,
            Outcome::Quit => ExitCode::from(2),
        }),
        Commands::Scan(args) => run_scan(args).map(|report| {
            if report.needs_attention() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }),
        Commands::PrefixDecimals(args) => run_prefix(args).map(|_| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
