/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 */

use anyhow::Result;
use clap::Parser;
use pubgen::{FillOptions, fill_bibliography};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pubgen")]
#[command(about = "Fill the bibliography of a document from BibTeX sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Document to fill (defaults to test.docx)
    target: Option<PathBuf>,

    /// BibTeX sources; later sources override earlier ones (defaults to test.bib)
    sources: Vec<PathBuf>,

    /// Paragraph marking where the bibliography goes
    #[arg(long, default_value = pubgen::fill::DEFAULT_MARK)]
    mark: String,

    /// Writer configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the filled document (defaults to the document's directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Keep the generated-region marks visible
    #[arg(long)]
    visible_marks: bool,

    /// Do not number the entries
    #[arg(long)]
    unnumbered: bool,

    /// Abbreviate author lists
    #[arg(long)]
    terse: bool,

    /// Log debugging detail
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "pubgen=debug,pubgen_writers=debug,pubgen_bibtex=debug"
    } else {
        "pubgen=info,pubgen_writers=info,pubgen_bibtex=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let report = fill_bibliography(&FillOptions {
        target: cli.target,
        sources: cli.sources,
        mark: cli.mark,
        config: cli.config,
        output_dir: cli.output_dir,
        visible_marks: cli.visible_marks,
        unnumbered: cli.unnumbered,
        terse: cli.terse,
    })?;
    tracing::info!(
        "{} citation(s) added, {} missing",
        report.added.len(),
        report.missing.len()
    );
    Ok(())
}
