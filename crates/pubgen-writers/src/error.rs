/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for the writers.

use crate::state::Phase;
use thiserror::Error;

/// Errors raised by writer backends.
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: pubgen_xml::Error,
    },

    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Cannot {operation} while the writer is {phase}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Unknown writer: {0}")]
    UnknownWriter(String),
}

impl WriterError {
    pub(crate) fn xml(part: &str, source: pubgen_xml::Error) -> Self {
        WriterError::Xml {
            part: part.to_string(),
            source,
        }
    }
}

/// Result type alias for writer operations.
pub type Result<T> = std::result::Result<T, WriterError>;
