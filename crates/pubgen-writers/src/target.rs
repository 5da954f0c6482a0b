/*
 * target.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Output file naming for file-backed writers.

use crate::config::WriterConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_ ]+").unwrap());

/// Turn a section name into a file-name-safe token.
///
/// Characters whose compatibility decomposition is not plain ASCII are
/// dropped, as is anything outside `[A-Za-z0-9_ ]`. Spaces become
/// underscores and doubled underscores collapse, so `"Résumé & Co"`
/// becomes `"Rsum_Co"`.
pub fn normalize(name: &str) -> String {
    let folded: String = name
        .trim()
        .chars()
        .filter_map(|c| {
            let decomposed: String = c.nfkd().collect();
            decomposed.is_ascii().then_some(decomposed)
        })
        .collect();
    DISALLOWED
        .replace_all(&folded, "")
        .replace(' ', "_")
        .replace("__", "_")
}

/// File name of `path` without directory or extension.
pub fn basename(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Where a file-backed writer puts its output.
#[derive(Debug, Clone)]
pub struct OutputTarget {
    output_dir: PathBuf,
    extension: String,
    multi_sheet: bool,
    edit_requested: bool,
    edit_mode: bool,
    base: String,
    source: Option<PathBuf>,
}

impl OutputTarget {
    pub fn new(config: &WriterConfig, default_extension: &str) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            extension: config
                .extension
                .clone()
                .unwrap_or_else(|| default_extension.to_string()),
            multi_sheet: config.multi_sheet_output,
            edit_requested: config.edit_mode,
            edit_mode: config.edit_mode,
            base: String::new(),
            source: None,
        }
    }

    /// Backends without an editing story never edit.
    pub fn without_editing(mut self) -> Self {
        self.edit_requested = false;
        self.edit_mode = false;
        self
    }

    /// Bind to a target path. Editing is turned off when the target does
    /// not exist yet.
    pub fn open(&mut self, path: &Path) {
        self.base = basename(path);
        self.source = Some(path.to_path_buf());
        self.edit_mode = self.edit_requested;
        if self.edit_mode && !path.exists() {
            tracing::warn!(
                "Cannot edit {}: file does not exist, writing a new document",
                path.display()
            );
            self.edit_mode = false;
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// The path given to [`OutputTarget::open`].
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn multi_sheet(&self) -> bool {
        self.multi_sheet
    }

    /// One file per section unless editing or writing a multi-section file.
    pub fn file_per_section(&self) -> bool {
        !(self.edit_mode || self.multi_sheet)
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn set_extension(&mut self, extension: &str) {
        self.extension = extension.to_string();
    }

    /// The whole-document output file.
    pub fn filename(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", self.base, self.extension))
    }

    /// The output file of one section.
    pub fn section_filename(&self, section: &str) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}{}",
            self.base,
            normalize(section),
            self.extension
        ))
    }

    pub fn ensure_output_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Résumé & Co"), "Rsum_Co");
        assert_eq!(normalize("Test Table"), "Test_Table");
        assert_eq!(normalize("  #bibtexlist "), "bibtexlist");
        assert_eq!(normalize("x & y"), "x_y");
    }

    #[test]
    fn test_normalize_folds_compatibility_forms() {
        // The fi ligature decomposes to plain ASCII
        assert_eq!(normalize("\u{FB01}le"), "file");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename(Path::new("dir/report.docx")), "report");
        assert_eq!(basename(Path::new("report")), "report");
    }

    #[test]
    fn test_filenames() {
        let config = WriterConfig::default().with_output_dir("out");
        let mut target = OutputTarget::new(&config, ".csv");
        target.open(Path::new("data/test.bib"));
        assert_eq!(target.filename(), PathBuf::from("out/test.csv"));
        assert_eq!(
            target.section_filename("Test Table"),
            PathBuf::from("out/test-Test_Table.csv")
        );
        assert!(target.file_per_section());
    }

    #[test]
    fn test_missing_target_disables_editing() {
        let config = WriterConfig::default().with_edit_mode(true);
        let mut target = OutputTarget::new(&config, ".docx");
        target.open(Path::new("/nonexistent/dir/report.docx"));
        assert!(!target.edit_mode());
        assert!(target.file_per_section());
    }
}
