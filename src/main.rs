//! # smsthread CLI
//!
//! Command-line interface for the smsthread library.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use smsthread::SmsError;
use smsthread::cli::Args;
use smsthread::config::{BuildConfig, RenderConfig};
use smsthread::conversation::Archive;
use smsthread::output::write_conversations;
use smsthread::parser::BackupParser;

fn main() {
    let args = <Args as ClapParser>::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), SmsError> {
    let total_start = Instant::now();

    let locale = args.resolve_locale()?;
    let numbers = args.carrier_numbers();
    create_output_dir(&args.output)?;

    let parser = BackupParser::new(
        BuildConfig::new(&args.output).with_carrier_number(numbers.dummy()),
    );

    // Step 1: Parse every input into one archive
    let mut archive = Archive::new();
    for input in &args.input {
        println!("Parsing conversations from {}", input.display());
        let parse_start = Instant::now();
        let produced = parser.parse(input, &mut archive)?;
        tracing::debug!(
            file = %input.display(),
            entries = produced,
            seconds = parse_start.elapsed().as_secs_f64(),
            "Parsed backup"
        );
    }

    println!(
        "Parsed {} messages in {} conversations with {} known user names",
        archive.entries,
        archive.conversations.len(),
        archive.known_users.len()
    );

    // Step 2: Render
    let config = RenderConfig::new(numbers.real()).with_locale(locale);
    let files = write_conversations(
        &args.output,
        &archive.conversations,
        &archive.known_users,
        &config,
    )?;
    println!("Dumped messages to {} conversation HTML files", files);

    tracing::debug!(
        seconds = total_start.elapsed().as_secs_f64(),
        "Finished"
    );
    Ok(())
}

/// Creates the output directory. An existing directory is fine.
fn create_output_dir(path: &Path) -> Result<(), SmsError> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(err) => Err(err.into()),
    }
}
