/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! BibTeX sources as citable records.
//!
//! Sources are scanned line by line into [`BibEntry`] records gathered in a
//! [`Bibliography`]. Entries implement [`pubgen_writers::Citable`], so any
//! writer can render them:
//!
//! ```rust
//! use pubgen_bibtex::parse_str;
//! use pubgen_writers::{CitationOptions, render_entry};
//! use std::path::Path;
//!
//! let source = "@article{J20, author={Jezequel, J-M}, title={Testing Publication Generator}, journal={IXXX}, year={2020}}";
//! let bib = parse_str(source, Path::new("refs.bib")).unwrap();
//! let options = CitationOptions { key_style: None, ..CitationOptions::default() };
//! assert_eq!(
//!     render_entry(bib.get("J20").unwrap(), &options),
//!     "J-M Jezequel. Testing Publication Generator, IXXX, 2020. "
//! );
//! ```

pub mod bibliography;
pub mod error;
pub mod parser;
pub mod record;

pub use bibliography::Bibliography;
pub use error::{ParseError, Result};
pub use parser::{clean_bib_entry, clean_year_entry, parse_file, parse_str};
pub use record::{BibEntry, EntryKind, month_name};
