/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for BibTeX scanning.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for BibTeX operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// A source that could not be read as BibTeX.
///
/// Scanning stops at the first malformed line: there is no partial result.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Error in {}, line {line}: {content}: {reason}", file.display())]
    Syntax {
        file: PathBuf,
        /// 1-based line number.
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Cannot read {}: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub(crate) fn syntax(
        file: impl Into<PathBuf>,
        line: usize,
        content: &str,
        reason: impl Into<String>,
    ) -> Self {
        ParseError::Syntax {
            file: file.into(),
            line,
            content: content.to_string(),
            reason: reason.into(),
        }
    }

    /// The 1-based line of a syntax error.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { line, .. } => Some(*line),
            ParseError::Io { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_names_file_and_line() {
        let err = ParseError::syntax("refs.bib", 12, "@article", "missing '{'");
        assert_eq!(
            err.to_string(),
            "Error in refs.bib, line 12: @article: missing '{'"
        );
        assert_eq!(err.line(), Some(12));
    }
}
