/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Per-call options for the writer contract.
//!
//! Each backend reads the options it understands and ignores the rest,
//! so one set of calls drives every backend.

use crate::fragment::CitationOptions;

/// Options for [`crate::Writer::open_section`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionOptions {
    /// Prefix lines of this section with a running `[n] ` number.
    pub numbered: bool,
    /// Restart the running number for this section's kind.
    pub reset_count: bool,
    /// How bibliography entries are rendered in this section.
    pub citation: CitationOptions,
}

impl SectionOptions {
    pub fn numbered() -> Self {
        Self {
            numbered: true,
            ..Self::default()
        }
    }

    pub fn with_reset_count(mut self) -> Self {
        self.reset_count = true;
        self
    }

    pub fn with_citation(mut self, citation: CitationOptions) -> Self {
        self.citation = citation;
        self
    }
}

/// Options for [`crate::Writer::write_title`].
#[derive(Debug, Clone, PartialEq)]
pub struct TitleOptions {
    /// Heading level; 0 is the document title.
    pub level: usize,
    /// Write the title even when editing an existing document.
    pub always: bool,
    pub style: LineOptions,
}

impl Default for TitleOptions {
    fn default() -> Self {
        Self {
            level: 1,
            always: false,
            style: LineOptions::default(),
        }
    }
}

impl TitleOptions {
    pub fn level(level: usize) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn always(mut self) -> Self {
        self.always = true;
        self
    }
}

/// Options for [`crate::Writer::write_line`] and [`crate::Writer::append`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineOptions {
    /// Insert a fresh row instead of overwriting (workbooks only).
    pub insert_mode: bool,
    pub bold: bool,
    pub italic: bool,
    pub href: Option<String>,
}

impl LineOptions {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::default()
        }
    }

    pub fn inserting() -> Self {
        Self {
            insert_mode: true,
            ..Self::default()
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }
}
