//! Main entry point for the stagezip CLI application.
//!
//! Lists ZIP archives, pipes single entries to stdout, or stages the payload
//! entry as a plain file and prints its path.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tracing_subscriber::EnvFilter;

use stagezip::{ArchiveSession, Cli, ZipContext};

/// Application entry point.
///
/// Every archive opened during the run is closed by the cleanup sweep
/// before exiting, including on error paths.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let ctx = ZipContext::new();
    let result = run(&ctx, &cli);
    ctx.cleanup_all_open_sessions();

    result
}

/// Install the stderr log subscriber. `RUST_LOG` overrides `-q`.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatch on the selected mode.
fn run(ctx: &ZipContext, cli: &Cli) -> Result<()> {
    let allowed = cli.allowed_extensions();
    let allowed = allowed.as_deref();

    if cli.list || cli.verbose {
        let session = ctx.open(&cli.file)?;
        return list_entries(&session, cli.verbose);
    }

    if cli.pipe {
        let session = ctx.open(&cli.file)?;
        let name = match &cli.entry {
            Some(name) => name.clone(),
            None => session.find_payload(allowed)?,
        };
        let data = session.extract_to_memory(&name)?;
        session.close();

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&data).context("failed to write to stdout")?;
        stdout.flush()?;
        return Ok(());
    }

    let staged = match &cli.entry {
        Some(name) => {
            let session = ctx.open(&cli.file)?;
            session.extract_to_temp_file(name)?
        }
        None => ctx
            .extract_payload_to_temp(&cli.file, allowed)
            .with_context(|| format!("failed to stage payload of '{}'", cli.file))?,
    };
    println!("{}", staged.display());

    Ok(())
}

/// List entries of the archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just entry names, one per line
/// - Verbose format (`-v`): Table with sizes and compression ratio
fn list_entries(session: &ArchiveSession, verbose: bool) -> Result<()> {
    let entries = session.list_entries()?;

    if !verbose {
        for entry in entries {
            println!("{}", entry.name);
        }
        return Ok(());
    }

    println!("{:>10}  {:>10}  {:>5}  Name", "Length", "Size", "Cmpr");
    println!("{}", "-".repeat(50));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        println!(
            "{:>10}  {:>10}  {}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            entry.name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(50));
    println!(
        "{:>10}  {:>10}  {}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        file_count
    );

    Ok(())
}

/// Percentage saved by compression, formatted to five columns.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}
