/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Section writers for plain text, CSV, TeX, workbooks and word-processing
//! documents.
//!
//! Every backend implements the [`Writer`] contract: open a target, write
//! named sections of a given [`SectionKind`] made of a title and lines,
//! then close. Lines are rows of [`Value`]s or [`Citable`] entries, which
//! hand each backend a list of tagged [`Fragment`]s to style.
//!
//! Backends that edit existing documents (`xlsx`, `docx`) locate the
//! region of each section by name and regenerate only that region.
//!
//! # Example
//!
//! ```rust
//! use pubgen_writers::{ConsoleWriter, SectionKind, SectionOptions, Writer, values};
//! use std::path::Path;
//!
//! let mut w = ConsoleWriter::with_sink(false, Vec::new());
//! w.open(Path::new("inventory")).unwrap();
//! w.open_section("Items", SectionKind::List, &SectionOptions::numbered()).unwrap();
//! w.write_values(&values!["apples", 3]).unwrap();
//! w.write_values(&values!["pears", 2.5]).unwrap();
//! w.close_section().unwrap();
//! w.close().unwrap();
//!
//! let out = String::from_utf8(w.into_sink()).unwrap();
//! assert_eq!(out, "[1] apples 3\n[2] pears 2.5\n");
//! ```

pub mod config;
pub mod contract;
pub mod error;
pub mod fragment;
pub mod ooxml;
pub mod options;
pub mod registry;
pub mod scope;
pub mod state;
pub mod target;
pub mod value;
pub mod writers;

pub use config::WriterConfig;
pub use contract::{Line, Writer};
pub use error::{Result, WriterError};
pub use fragment::{
    CitationOptions, Citable, Fragment, FragmentTag, KeyStyle, render_entry, render_plain,
};
pub use options::{LineOptions, SectionOptions, TitleOptions};
pub use registry::WriterRegistry;
pub use scope::{with_section, with_target};
pub use state::{Phase, SectionKind, SectionState};
pub use target::{OutputTarget, normalize};
pub use value::{Value, join_values};
pub use writers::console::ConsoleWriter;
pub use writers::docx::DocxWriter;
pub use writers::multi::MultiWriter;
pub use writers::skip::SkipWriter;
pub use writers::tex::TexWriter;
pub use writers::tex_reader::TexTableReader;
pub use writers::text::TextWriter;
pub use writers::xlsx::XlsxWriter;
