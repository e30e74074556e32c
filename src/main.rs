//! Paramstack CLI entrypoint.
//!
//! This is the main entrypoint for the paramstack command-line tool.

use std::io::Write;
use std::process::ExitCode;

use paramstack::cli::{Cli, OutputFormatter};
use paramstack::converter::Converter;
use paramstack::document::DocumentLoader;
use paramstack::error::Result;
use paramstack::settings::{Settings, load_dotenv};

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system on stderr.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Runs one conversion.
fn run(cli: &Cli) -> Result<()> {
    let input = cli.input_path();

    load_dotenv(input.and_then(std::path::Path::parent))?;

    let mut settings = Settings::from_env()?;
    cli.apply_to(&mut settings);
    debug!("Settings: {settings:?}");

    let targets = cli.invalidation_targets()?;

    let loader = DocumentLoader::new();
    let document = match input {
        Some(path) => loader.load_file(path)?,
        None => {
            info!("Reading document from stdin");
            loader.load_reader(std::io::stdin().lock())?
        }
    };

    let conversion = Converter::new(settings).convert(document, targets)?;

    if cli.summary {
        let formatter = OutputFormatter::new(cli.summary_format);
        eprintln!("{}", formatter.format_summary(&conversion));
    }

    if cli.check {
        info!("Check passed, no template written");
        return Ok(());
    }

    match cli.output_path() {
        Some(path) => {
            std::fs::write(path, &conversion.template)?;
            info!("Template written to: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(conversion.template.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
