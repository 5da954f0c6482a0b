/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Writer configuration.
//!
//! Every backend is built from a [`WriterConfig`]. The same structure can
//! be loaded from a TOML file:
//!
//! ```toml
//! numbered = true
//! output-dir = "out"
//! multi-sheet-output = false
//! edit-mode = true
//! visible-marks = false
//! ```

use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct WriterConfig {
    /// Initial numbering of every section kind.
    pub numbered: bool,
    pub output_dir: PathBuf,
    /// Write every section into one output file instead of one per section.
    pub multi_sheet_output: bool,
    /// Edit marked regions of an existing document in place.
    pub edit_mode: bool,
    /// Leave generated-region marks visible in edited documents.
    pub visible_marks: bool,
    /// Overrides the field separator of delimited-text backends.
    pub separator: Option<String>,
    /// Overrides the output file extension, including the leading dot.
    pub extension: Option<String>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            numbered: false,
            output_dir: PathBuf::from("."),
            multi_sheet_output: false,
            edit_mode: false,
            visible_marks: false,
            separator: None,
            extension: None,
        }
    }
}

impl WriterConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_numbered(mut self, numbered: bool) -> Self {
        self.numbered = numbered;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_multi_sheet(mut self, multi: bool) -> Self {
        self.multi_sheet_output = multi;
        self
    }

    pub fn with_edit_mode(mut self, edit: bool) -> Self {
        self.edit_mode = edit;
        self
    }

    pub fn with_visible_marks(mut self, visible: bool) -> Self {
        self.visible_marks = visible;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WriterConfig::from_toml_str("").unwrap();
        assert_eq!(config, WriterConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_parse_values() {
        let config = WriterConfig::from_toml_str(
            r#"
numbered = true
output-dir = "out"
edit-mode = true
separator = "\t"
"#,
        )
        .unwrap();
        assert!(config.numbered);
        assert!(config.edit_mode);
        assert!(!config.multi_sheet_output);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.separator.as_deref(), Some("\t"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = WriterConfig::from_toml_str("colour = \"red\"").unwrap_err();
        assert!(err.to_string().contains("colour"), "Got: {}", err);
    }
}
