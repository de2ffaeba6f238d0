use crate::error::{AppError, Result};
use clap::{CommandFactory, FromArgMatches, Parser};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Command line surface of the health report exporter.
///
/// clap's built-in help flag is disabled: a help token anywhere in argv must
/// win over every other argument, so it is detected before clap runs.
#[derive(Debug, Parser)]
#[command(name = "health-report")]
#[command(about = "Convert an Apple Health export into PDF reports")]
#[command(disable_help_flag = true, args_override_self = true)]
#[command(override_usage = "health-report --type <TYPE> --input <FILE> [--output <FILE>] [--no-daily-table]\n       \
                            health-report --type <TYPE> <INPUT> [OUTPUT]")]
#[command(after_help = "Report types:\n  heart       heart rate samples and resting heart rate\n  \
                        sleep       sleep analysis per night\n  \
                        medication  logged medication doses\n\n\
                        Examples:\n  health-report --type heart --input export.xml\n  \
                        health-report -t sleep -i export.zip -o sleep.pdf --no-daily-table")]
struct Cli {
    /// Report type: heart, sleep or medication
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    report_type: Option<String>,

    /// Path to the Apple Health export (export.xml or export.zip)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Path of the PDF to write (defaults to a per-type file name)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Leave the per-day table out of the report
    #[arg(long)]
    no_daily_table: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print this help
    #[arg(short, long)]
    help: bool,
}

/// The report a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Heart,
    Sleep,
    Medication,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Heart, ReportKind::Sleep, ReportKind::Medication];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Heart => "heart",
            ReportKind::Sleep => "sleep",
            ReportKind::Medication => "medication",
        }
    }

    /// File name used when no `--output` is given.
    pub fn default_output(self) -> &'static str {
        match self {
            ReportKind::Heart => "heart_rate_report.pdf",
            ReportKind::Sleep => "sleep_report.pdf",
            ReportKind::Medication => "medication_report.pdf",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let expected: Vec<&str> = ReportKind::ALL.iter().map(|k| k.as_str()).collect();
                AppError::Usage(format!(
                    "Invalid report type '{}' (expected one of: {})",
                    s,
                    expected.join(", ")
                ))
            })
    }
}

/// Options as they come off the command line, nothing checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncheckedOptions {
    pub report_type: Option<String>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub include_daily_table: bool,
    pub help: bool,
    pub verbose: bool,
    /// `--` flags that were not recognised and were skipped.
    pub ignored: Vec<String>,
}

impl Default for UncheckedOptions {
    fn default() -> Self {
        Self {
            report_type: None,
            input: None,
            output: None,
            include_daily_table: true,
            help: false,
            verbose: false,
            ignored: Vec::new(),
        }
    }
}

/// Validated configuration for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub kind: ReportKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub include_daily_table: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Help,
    Options(UncheckedOptions),
}

/// Flags that take a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueFlag {
    Type,
    Input,
    Output,
}

impl ValueFlag {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "--type" | "-t" => Some(ValueFlag::Type),
            "--input" | "-i" => Some(ValueFlag::Input),
            "--output" | "-o" => Some(ValueFlag::Output),
            _ => None,
        }
    }

    fn from_long_name(name: &str) -> Option<Self> {
        Self::from_token(&format!("--{}", name))
    }

    fn long(self) -> &'static str {
        match self {
            ValueFlag::Type => "--type",
            ValueFlag::Input => "--input",
            ValueFlag::Output => "--output",
        }
    }

    /// `--input=<value>`, so clap takes a value starting with `-` as is.
    fn with_value(self, value: &OsStr) -> OsString {
        let mut arg = OsString::from(format!("{}=", self.long()));
        arg.push(value);
        arg
    }
}

const BOOLEAN_LONG_FLAGS: [&str; 3] = ["--no-daily-table", "--verbose", "--help"];
const BOOLEAN_SHORT_FLAGS: [char; 2] = ['v', 'h'];

/// argv split into what clap parses and what is a legacy positional.
#[derive(Debug, Default)]
struct Partitioned {
    flags: Vec<OsString>,
    positionals: Vec<(usize, PathBuf)>,
    ignored: Vec<String>,
    last_input: Option<usize>,
    last_output: Option<usize>,
}

impl Partitioned {
    fn note(&mut self, flag: ValueFlag, index: usize) {
        match flag {
            ValueFlag::Input => self.last_input = Some(index),
            ValueFlag::Output => self.last_output = Some(index),
            ValueFlag::Type => {}
        }
    }
}

fn is_short_cluster(token: &str) -> bool {
    token.len() > 1
        && token
            .strip_prefix('-')
            .is_some_and(|rest| rest.chars().all(|c| BOOLEAN_SHORT_FLAGS.contains(&c)))
}

/// Walk argv once. Known flags (and the value after a value flag) go to
/// clap, unknown `--` flags are skipped, every other token is positional.
fn partition(args: Vec<OsString>) -> Partitioned {
    let mut out = Partitioned::default();
    let mut tokens = args.into_iter().enumerate();
    while let Some((index, token)) = tokens.next() {
        let text = token.to_string_lossy().into_owned();
        if let Some(flag) = ValueFlag::from_token(&text) {
            out.note(flag, index);
            match tokens.next() {
                Some((_, value)) => out.flags.push(flag.with_value(&value)),
                None => out.flags.push(token),
            }
        } else if let Some(long) = text.strip_prefix("--") {
            let value_flag = long
                .split_once('=')
                .and_then(|(name, _)| ValueFlag::from_long_name(name));
            if let Some(flag) = value_flag {
                out.note(flag, index);
                out.flags.push(token);
            } else if BOOLEAN_LONG_FLAGS.contains(&text.as_str()) {
                out.flags.push(token);
            } else {
                out.ignored.push(text);
            }
        } else if is_short_cluster(&text) {
            out.flags.push(token);
        } else {
            out.positionals.push((index, PathBuf::from(token)));
        }
    }
    out
}

/// Assignment made by one argv token, replayed in argv order.
enum Assignment {
    Input(PathBuf),
    Output(PathBuf),
    Positional(PathBuf),
}

/// Parse argv (without the program name).
///
/// Returns [`Parsed::Help`] for an empty argv or a help token anywhere,
/// before anything else is looked at. Tokens not starting with `--` that
/// are not known short flags fill `input`, then `output`.
pub fn parse<I, T>(args: I) -> Result<Parsed>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.is_empty()
        || args
            .iter()
            .any(|a| matches!(a.to_str(), Some("--help") | Some("-h")))
    {
        return Ok(Parsed::Help);
    }

    let partitioned = partition(args);
    let matches = Cli::command()
        .no_binary_name(true)
        .try_get_matches_from(&partitioned.flags)
        .map_err(|e| AppError::Usage(clap_message(&e)))?;
    let cli = Cli::from_arg_matches(&matches).map_err(|e| AppError::Usage(clap_message(&e)))?;
    if cli.help {
        return Ok(Parsed::Help);
    }

    let mut assignments: Vec<(usize, Assignment)> = Vec::new();
    if let (Some(index), Some(path)) = (partitioned.last_input, cli.input) {
        assignments.push((index, Assignment::Input(path)));
    }
    if let (Some(index), Some(path)) = (partitioned.last_output, cli.output) {
        assignments.push((index, Assignment::Output(path)));
    }
    assignments.extend(
        partitioned
            .positionals
            .into_iter()
            .map(|(index, path)| (index, Assignment::Positional(path))),
    );
    assignments.sort_by_key(|(index, _)| *index);

    let mut options = UncheckedOptions {
        report_type: cli.report_type,
        include_daily_table: !cli.no_daily_table,
        help: cli.help,
        verbose: cli.verbose,
        ignored: partitioned.ignored,
        ..UncheckedOptions::default()
    };
    for (_, assignment) in assignments {
        match assignment {
            Assignment::Input(path) => options.input = Some(path),
            Assignment::Output(path) => options.output = Some(path),
            Assignment::Positional(path) => {
                if options.input.is_none() {
                    options.input = Some(path);
                } else if options.output.is_none() {
                    options.output = Some(path);
                }
            }
        }
    }

    Ok(Parsed::Options(options))
}

/// The only way from [`UncheckedOptions`] to an [`ExportConfig`].
pub fn validate(options: UncheckedOptions) -> Result<ExportConfig> {
    let input = options
        .input
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| AppError::Usage("Missing required argument: --input <FILE>".to_string()))?;
    let kind: ReportKind = options
        .report_type
        .ok_or_else(|| {
            AppError::Usage("Missing required argument: --type <heart|sleep|medication>".to_string())
        })?
        .parse()?;
    if !input.exists() {
        return Err(AppError::InputNotFound(input));
    }
    let output = options
        .output
        .unwrap_or_else(|| PathBuf::from(kind.default_output()));

    Ok(ExportConfig {
        kind,
        input,
        output,
        include_daily_table: options.include_daily_table,
        verbose: options.verbose,
    })
}

/// Usage text printed for help and after every usage error.
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

fn clap_message(e: &clap::Error) -> String {
    let rendered = e.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).trim().to_string()
}
