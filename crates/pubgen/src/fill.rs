/*
 * fill.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Regenerate the bibliography of a word-processing document.
//!
//! The document is scanned for bracketed citation keys, the matching
//! entries are looked up in the BibTeX sources, and the region of the
//! bibliography mark is rewritten with one numbered paragraph per entry.

use anyhow::{Context, Result};
use pubgen_bibtex::Bibliography;
use pubgen_writers::{
    CitationOptions, DocxWriter, Line, LineOptions, SectionKind, SectionOptions, Writer,
    WriterConfig, with_section, with_target,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_MARK: &str = "#bibtexlist";
pub const DEFAULT_TARGET: &str = "test.docx";
pub const DEFAULT_SOURCE: &str = "test.bib";

#[derive(Debug, Clone)]
pub struct FillOptions {
    pub target: Option<PathBuf>,
    pub sources: Vec<PathBuf>,
    pub mark: String,
    pub config: Option<PathBuf>,
    /// Where the filled document is written; defaults to the target's directory.
    pub output_dir: Option<PathBuf>,
    pub visible_marks: bool,
    pub unnumbered: bool,
    pub terse: bool,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            target: None,
            sources: Vec::new(),
            mark: DEFAULT_MARK.to_string(),
            config: None,
            output_dir: None,
            visible_marks: false,
            unnumbered: false,
            terse: false,
        }
    }
}

impl FillOptions {
    /// Target and sources, falling back to `test.docx` and `test.bib` when
    /// either is missing.
    fn inputs(&self) -> (PathBuf, Vec<PathBuf>) {
        match &self.target {
            Some(target) if !self.sources.is_empty() => (target.clone(), self.sources.clone()),
            _ => {
                debug!("Using default inputs {} and {}", DEFAULT_TARGET, DEFAULT_SOURCE);
                (
                    PathBuf::from(DEFAULT_TARGET),
                    vec![PathBuf::from(DEFAULT_SOURCE)],
                )
            }
        }
    }

    fn writer_config(&self, target: &Path) -> Result<WriterConfig> {
        let config = match &self.config {
            Some(path) => WriterConfig::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => WriterConfig::default(),
        };
        let output_dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => target
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        Ok(config
            .with_output_dir(output_dir)
            .with_multi_sheet(true)
            .with_edit_mode(true)
            .with_visible_marks(self.visible_marks))
    }

    fn section_options(&self) -> SectionOptions {
        let citation = CitationOptions {
            terse: self.terse,
            ..CitationOptions::default()
        };
        let options = SectionOptions {
            numbered: !self.unnumbered,
            ..SectionOptions::default()
        };
        let options = if self.unnumbered {
            options
        } else {
            options.with_reset_count()
        };
        options.with_citation(citation)
    }
}

/// What a fill run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Keys written to the bibliography, in order.
    pub added: Vec<String>,
    /// Keys cited by the document but absent from every source.
    pub missing: Vec<String>,
}

pub fn fill_bibliography(options: &FillOptions) -> Result<FillReport> {
    let (target, sources) = options.inputs();
    let config = options.writer_config(&target)?;
    let bibliography = Bibliography::load_all(&sources)?;
    info!(
        "Loaded {} entries from {} source(s)",
        bibliography.len(),
        sources.len()
    );

    let mut writer = DocxWriter::new(&config);
    let report = with_target(&mut writer, &target, |w| {
        let cited = w.cited_keys(&options.mark)?;
        debug!("Document cites {} key(s)", cited.len());
        write_bibliography(w, options, &bibliography, &cited)
    })
    .with_context(|| format!("Failed to fill {}", target.display()))?;
    Ok(report)
}

/// Write the `cited` entries into the bibliography section of an open
/// writer. The section is closed even when a write fails.
pub fn write_bibliography<W: Writer + ?Sized>(
    writer: &mut W,
    options: &FillOptions,
    bibliography: &Bibliography,
    cited: &[String],
) -> pubgen_writers::Result<FillReport> {
    let section = options.section_options();
    with_section(writer, &options.mark, SectionKind::Bibliography, &section, |w| {
        let mut report = FillReport::default();
        for key in cited {
            match bibliography.get(key) {
                Some(entry) => {
                    info!("Adding citation {}", key);
                    w.write_line(Line::Citation(entry), &LineOptions::default())?;
                    report.added.push(key.clone());
                }
                None => {
                    warn!("Cannot find bibtex key {}", key);
                    report.missing.push(key.clone());
                }
            }
        }
        Ok(report)
    })
}
