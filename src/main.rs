//! duscope: disk usage analyser for hierarchical file stores.
//!
//! Thin binary entry point. All logic lives in the `duscope-core`
//! and `duscope-session` crates.

mod cli;
mod shell;

use anyhow::{bail, Context};
use clap::Parser;
use cli::Cli;
use duscope_core::fs::{FilesystemClient, LocalFs};
use duscope_core::model::RemotePath;
use duscope_core::report::ScanReport;
use duscope_core::scanner::NameFilter;
use duscope_session::{ScanStart, Session, SessionPhase};
use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the shell's stdout stays clean.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("duscope starting");

    let mut client = LocalFs::new(&cli.base);
    if let Some(trash) = &cli.trash {
        client = client.with_trash(trash);
    }
    let client: Arc<dyn FilesystemClient> = Arc::new(client);

    let filter = NameFilter::new(&cli.include, &cli.exclude).context("invalid name filter")?;
    if !filter.is_empty() {
        tracing::info!(
            "Name filter: include {:?}, exclude {:?}",
            filter.include_patterns(),
            filter.exclude_patterns()
        );
    }
    let mut session = Session::new(client);

    let requested = RemotePath::parse(&cli.path);
    let yes = cli.yes;
    let start = session
        .resolve_and_scan(&requested, filter, |resolved| {
            yes || shell::ask(&resolved.prompt())
        })
        .with_context(|| format!("cannot scan {requested}"))?;
    if let ScanStart::Declined { .. } = start {
        println!("Nothing scanned.");
        return Ok(());
    }

    shell::show_scan_progress(&mut session);
    match session.phase {
        SessionPhase::Results => {}
        _ => bail!(
            "scan failed: {}",
            session.scan_failure.as_deref().unwrap_or("unknown error")
        ),
    }

    if cli.export_json.is_some() || cli.export_csv.is_some() {
        let tree = session.tree().context("scan produced no tree")?;
        let report = ScanReport::build(&tree.read(), cli.top);
        if let Some(path) = &cli.export_json {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            report.write_json(BufWriter::new(file))?;
            tracing::info!("JSON report written to {}", path.display());
        }
        if let Some(path) = &cli.export_csv {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            report.write_csv(BufWriter::new(file))?;
            tracing::info!("CSV report written to {}", path.display());
        }
    }

    shell::run(&mut session, cli.top)
}
