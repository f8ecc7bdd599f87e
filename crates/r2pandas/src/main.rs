use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};
use r2pandas::{Config, Diagnostic, translate, with_header};

#[derive(Parser, Debug)]
#[command(name = "r2pandas")]
#[command(about = "Translate R data-wrangling scripts into Python/pandas")]
#[command(version)]
struct Cli {
    /// R source file to translate, or `-` for stdin
    input: PathBuf,

    /// Write the translation here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file layered over the user and project files
    #[arg(long)]
    config: Option<PathBuf>,

    /// Normalize every bare identifier, not only known naming contexts
    #[arg(long)]
    aggressive_identifiers: bool,

    /// Normalize quoted column names in column-selection contexts
    #[arg(long)]
    normalize_literal_columns: bool,

    /// Omit the import header
    #[arg(long)]
    no_header: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.aggressive_identifiers {
        config.aggressive_identifier_normalization = true;
    }
    if cli.normalize_literal_columns {
        config.normalize_literal_column_strings = true;
    }

    if cli.show_config {
        let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
        io::stdout().lock().write_all(rendered.as_bytes())?;
        return Ok(ExitCode::SUCCESS);
    }

    let source = read_input(&cli.input)?;
    let display_name = cli.input.display().to_string();

    match translate(&source, &config) {
        Ok(translation) => {
            report(&display_name, &translation.diagnostics)?;
            let text = if cli.no_header {
                translation.text
            } else {
                with_header(&translation.text)
            };
            write_output(cli.output.as_deref(), &text)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            report(&display_name, &failure.diagnostics)?;
            debug!("{failure}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;
        return Ok(source);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Print diagnostics to stderr as `path:line: severity: message`
fn report(path: &str, diagnostics: &[Diagnostic]) -> Result<()> {
    let mut stderr = io::stderr().lock();
    for diagnostic in diagnostics {
        writeln!(
            stderr,
            "{path}:{}: {}: {} [{}]",
            diagnostic.line,
            diagnostic.severity,
            diagnostic.message,
            diagnostic.kind.code()
        )?;
    }
    Ok(())
}
