/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Office Open XML plumbing shared by the workbook and word-processing
//! backends.

pub mod package;
pub mod sheetml;
pub mod wordml;
