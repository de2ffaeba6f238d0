use crate::config::{self, ExportConfig, Parsed};
use crate::error::{AppError, Result};
use crate::exporters::ReportExporter;
use log::{LevelFilter, debug, info, warn};
use std::ffi::OsString;
use std::time::{Duration, Instant};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Prefix of every failure line on the console.
pub const FAILURE_MARKER: &str = "❌";

/// Parse, validate and dispatch one invocation. Returns the process exit code.
pub async fn run<I, T, X>(args: I, exporter: &X) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    X: ReportExporter + ?Sized,
{
    let options = match config::parse(args) {
        Ok(Parsed::Help) => {
            println!("{}", config::usage());
            return EXIT_SUCCESS;
        }
        Ok(Parsed::Options(options)) => options,
        Err(e) => return usage_failure(&e),
    };
    init_logging(options.verbose);
    for flag in &options.ignored {
        warn!("Ignoring unrecognised flag '{}'", flag);
    }

    let config = match config::validate(options) {
        Ok(config) => config,
        Err(e) => return usage_failure(&e),
    };

    print!("{}", status_block(&config));
    match dispatch(&config, exporter).await {
        Ok(elapsed) => {
            println!("⏱️  Completed in {:.1}s", elapsed.as_secs_f64());
            println!("✅ Export completed successfully!");
            println!("📄 Report saved to: {}", config.output.display());
            EXIT_SUCCESS
        }
        Err(e) => {
            debug!("Export error: {:?}", e);
            eprintln!("{} Export failed: {}", FAILURE_MARKER, failure_message(&e));
            EXIT_FAILURE
        }
    }
}

/// Invoke the exporter for `config.kind` and time it.
pub async fn dispatch<X>(config: &ExportConfig, exporter: &X) -> Result<Duration>
where
    X: ReportExporter + ?Sized,
{
    let start = Instant::now();
    info!("Exporting {} report", config.kind);
    exporter
        .export(
            config.kind,
            &config.input,
            &config.output,
            config.include_daily_table,
        )
        .await?;
    Ok(start.elapsed())
}

/// The block printed before an export starts.
pub fn status_block(config: &ExportConfig) -> String {
    format!(
        "📊 Health report export\n   Input:       {}\n   Type:        {}\n   Output:      {}\n   Daily table: {}\n",
        config.input.display(),
        config.kind,
        config.output.display(),
        if config.include_daily_table { "yes" } else { "no" }
    )
}

/// Console text for an error; never empty.
pub fn failure_message(e: &AppError) -> String {
    let message = e.to_string();
    if message.trim().is_empty() {
        "unknown error".to_string()
    } else {
        message
    }
}

fn usage_failure(e: &AppError) -> i32 {
    eprintln!("{} {}", FAILURE_MARKER, failure_message(e));
    eprintln!();
    println!("{}", config::usage());
    EXIT_FAILURE
}

/// Logger at `Info`, or `Debug` when verbose. Filters added afterwards win.
pub fn logger_builder(verbose: bool) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    builder
}

fn init_logging(verbose: bool) {
    let result = logger_builder(verbose).parse_default_env().try_init();
    if result.is_err() {
        debug!("Logger already initialised");
    }
}
