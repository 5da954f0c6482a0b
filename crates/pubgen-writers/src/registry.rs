/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Registry of named writer presets.
//!
//! A preset is a factory turning a base [`WriterConfig`] into a configured
//! backend. The registry is built once at start-up and looked up by name.

use crate::config::WriterConfig;
use crate::contract::Writer;
use crate::error::{Result, WriterError};
use crate::state::SectionKind;
use crate::writers::console::ConsoleWriter;
use crate::writers::docx::DocxWriter;
use crate::writers::tex::TexWriter;
use crate::writers::text::TextWriter;
use crate::writers::xlsx::XlsxWriter;
use std::collections::BTreeMap;

type Factory = Box<dyn Fn(&WriterConfig) -> Box<dyn Writer>>;

pub struct WriterRegistry {
    factories: BTreeMap<String, Factory>,
}

impl WriterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Create a registry holding every built-in preset.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("txt", |c| Box::new(TextWriter::plain(c)));
        registry.register("csv", |c| Box::new(TextWriter::csv(c)));
        registry.register("tex", |c| Box::new(TexWriter::new(&c.clone().with_multi_sheet(false))));
        registry.register("latex-article", |c| {
            Box::new(TexWriter::new(&c.clone().with_multi_sheet(true)))
        });
        registry.register("bbl", |c| Box::new(TexWriter::bibliography(c)));
        registry.register("xlsx", |c| Box::new(XlsxWriter::new(c)));
        registry.register("xlsx-multisheets", |c| {
            Box::new(XlsxWriter::new(&c.clone().with_multi_sheet(true)))
        });
        registry.register("xlsx-edit", |c| {
            Box::new(XlsxWriter::new(
                &c.clone().with_multi_sheet(true).with_edit_mode(true),
            ))
        });
        registry.register("docx", |c| Box::new(DocxWriter::new(c)));
        registry.register("docx-multisheets", |c| {
            Box::new(DocxWriter::new(&c.clone().with_multi_sheet(true)))
        });
        registry.register("console", |c| Box::new(ConsoleWriter::stdout(c.numbered)));
        registry
    }

    /// Register a preset, replacing any previous one of the same name.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&WriterConfig) -> Box<dyn Writer> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn create(&self, name: &str, config: &WriterConfig) -> Result<Box<dyn Writer>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| WriterError::UnknownWriter(name.to_string()))?;
        tracing::debug!("Creating '{}' writer", name);
        Ok(factory(config))
    }

    /// Registered preset names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of the presets rendering `kind` natively.
    pub fn supporting(&self, kind: SectionKind, config: &WriterConfig) -> Vec<&str> {
        self.factories
            .iter()
            .filter(|(_, factory)| factory(config).supports(kind))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl Default for WriterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for WriterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writers::skip::SkipWriter;

    #[test]
    fn test_default_presets() {
        let registry = WriterRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec![
                "bbl",
                "console",
                "csv",
                "docx",
                "docx-multisheets",
                "latex-article",
                "tex",
                "txt",
                "xlsx",
                "xlsx-edit",
                "xlsx-multisheets",
            ]
        );
    }

    #[test]
    fn test_unknown_writer() {
        let registry = WriterRegistry::with_defaults();
        let err = registry
            .create("odt", &WriterConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, WriterError::UnknownWriter(ref name) if name == "odt"));
    }

    #[test]
    fn test_supporting_kind() {
        let registry = WriterRegistry::with_defaults();
        let tables = registry.supporting(SectionKind::Table, &WriterConfig::default());
        assert!(tables.contains(&"csv"));
        assert!(tables.contains(&"xlsx"));
        assert!(!tables.contains(&"bbl"));
        let lists = registry.supporting(SectionKind::List, &WriterConfig::default());
        assert!(!lists.contains(&"csv"));
        assert!(!lists.contains(&"xlsx"));
    }

    #[test]
    fn test_register_custom() {
        let mut registry = WriterRegistry::new();
        assert!(!registry.contains("skip"));
        registry.register("skip", |_| Box::new(SkipWriter::new()));
        let writer = registry.create("skip", &WriterConfig::default()).unwrap();
        assert!(writer.supports(SectionKind::Text));
    }
}
