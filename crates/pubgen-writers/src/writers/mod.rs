/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Format backends.

pub mod console;
pub mod docx;
pub mod multi;
pub mod skip;
pub mod tex;
pub mod tex_reader;
pub mod text;
pub mod xlsx;
