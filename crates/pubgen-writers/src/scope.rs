/*
 * scope.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Scoped helpers that pair every open with its close.

use crate::contract::Writer;
use crate::error::Result;
use crate::options::SectionOptions;
use crate::state::SectionKind;
use std::path::Path;

/// Open `target`, run `body`, and close the writer even when `body` fails.
///
/// The body's error takes precedence over an error raised while closing.
pub fn with_target<W, T>(
    writer: &mut W,
    target: &Path,
    body: impl FnOnce(&mut W) -> Result<T>,
) -> Result<T>
where
    W: Writer + ?Sized,
{
    writer.open(target)?;
    let result = body(writer);
    let closed = writer.close();
    let value = result?;
    closed?;
    Ok(value)
}

/// Open a section, run `body`, and close the section even when `body` fails.
pub fn with_section<W, T>(
    writer: &mut W,
    name: &str,
    kind: SectionKind,
    options: &SectionOptions,
    body: impl FnOnce(&mut W) -> Result<T>,
) -> Result<T>
where
    W: Writer + ?Sized,
{
    writer.open_section(name, kind, options)?;
    let result = body(writer);
    let closed = writer.close_section();
    let value = result?;
    closed?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriterError;
    use crate::writers::console::ConsoleWriter;
    use crate::{LineOptions, values};

    #[test]
    fn test_section_closed_after_body_error() {
        let mut writer = ConsoleWriter::with_sink(false, std::io::sink());
        let result: Result<()> = with_target(&mut writer, Path::new("t"), |w| {
            let inner: Result<()> = with_section(w, "s", SectionKind::Text, &SectionOptions::default(), |w| {
                w.write_values(&values!["x"])?;
                Err(WriterError::InvalidDocument("boom".to_string()))
            });
            assert!(inner.is_err());
            // The section was closed, so a new one can be opened
            with_section(w, "t", SectionKind::Text, &SectionOptions::default(), |w| {
                w.write_line(crate::Line::Values(&values!["y"]), &LineOptions::default())
            })
        });
        assert!(result.is_ok(), "Got: {:?}", result);
    }
}
