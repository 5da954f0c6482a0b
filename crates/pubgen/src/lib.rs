/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Fill the bibliography region of a document from BibTeX sources.

pub mod fill;

pub use fill::{FillOptions, FillReport, fill_bibliography, write_bibliography};
