/*
 * tex.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! LaTeX output: sectioning, `tabular` tables, `thebibliography` entries
//! and `enumerate`/`itemize` lists.

use crate::config::WriterConfig;
use crate::contract::{Line, Writer};
use crate::error::Result;
use crate::fragment::{Fragment, FragmentTag, render_plain};
use crate::options::{LineOptions, SectionOptions, TitleOptions};
use crate::state::{SectionKind, SectionState};
use crate::target::{OutputTarget, basename, normalize};
use crate::value::Value;
use crate::writers::text::TextOutput;
use std::path::Path;

const PREAMBLE: &str = "\\documentclass[11pt]{article}\n\
\\usepackage[T1]{fontenc}\n\
\\usepackage[utf8]{inputenc}\n\
\\begin{document}\n";

const HEADINGS: [&str; 5] = ["title", "section", "subsection", "subsubsection", "paragraph"];

const SPECIAL: &str = "#\\%_$^&";

const ROW_END: &str = "\\\\\\hline";

/// Backslash-escape the characters TeX treats specially.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn styled(text: &str, options: &LineOptions) -> String {
    let mut text = text.to_string();
    if options.italic {
        text = format!("{{\\it {}}}", text);
    }
    if options.bold {
        text = format!("{{\\bf {}}}", text);
    }
    text
}

fn heading(text: &str, level: usize) -> String {
    if level == 0 {
        format!("\\title{{{}}}\n\\maketitle\n", text)
    } else {
        let command = HEADINGS[level.min(HEADINGS.len() - 1)];
        format!("\\{}{{{}}}\n", command, text)
    }
}

fn join_escaped(values: &[Value], separator: &str) -> String {
    values
        .iter()
        .map(|v| escape(&v.to_string()))
        .collect::<Vec<_>>()
        .join(separator)
}

/// One fragment of a `thebibliography` item.
fn bbl_fragment(fragment: &Fragment) -> String {
    match fragment.tag {
        FragmentTag::Key => format!("\\bibitem{{{}}}", fragment.text),
        FragmentTag::Authors => {
            format!("\n{}.", escape(fragment.text.trim_end().trim_end_matches('.')))
        }
        FragmentTag::Title => format!("\n\\newblock {{{}}}. ", escape(fragment.text.trim())),
        FragmentTag::Venue => format!("\n\\newblock {{\\em {}}}, ", escape(fragment.bare_text())),
        FragmentTag::Plain => escape(&fragment.text),
    }
}

fn trim_lines(text: &str) -> String {
    text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

enum TexSection {
    Skip,
    Text,
    Table { header: bool, pending: Vec<Value> },
    Bibliography { begun: bool, items: usize },
    List { environment: &'static str },
}

/// Writes TeX sources, one `.tex` (or `.bbl`) file per section or a whole
/// article in multi-section mode.
pub struct TexWriter {
    state: SectionState,
    output: TextOutput,
    fixed_extension: bool,
    section: TexSection,
}

impl TexWriter {
    pub fn new(config: &WriterConfig) -> Self {
        Self::with_kinds(config, config.numbered, &SectionKind::ALL)
    }

    /// Numbered `.bbl` output of bibliography sections only.
    pub fn bibliography(config: &WriterConfig) -> Self {
        Self::with_kinds(config, true, &[SectionKind::Bibliography])
    }

    fn with_kinds(config: &WriterConfig, numbered: bool, kinds: &[SectionKind]) -> Self {
        Self {
            state: SectionState::new(numbered, kinds),
            output: TextOutput::new(OutputTarget::new(config, ".tex").without_editing()),
            fixed_extension: config.extension.is_some(),
            section: TexSection::Skip,
        }
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.output.write_raw(text)
    }

    fn table_header(&self, width: usize) -> String {
        let label = format!(
            "{}-{}",
            self.state.target(),
            normalize(self.state.section_name().unwrap_or_default())
        );
        let mut columns = String::from("|l|");
        for _ in 1..width {
            columns.push_str("r|");
        }
        format!("\\label{{{}}}\\begin{{tabular}}{{{}}}\\hline", label, columns)
    }

    /// Write one table row, emitting the header first if needed.
    fn table_row(&mut self, cells: &[Value]) -> Result<()> {
        let needs_header = matches!(self.section, TexSection::Table { header: false, .. });
        if needs_header {
            let header = self.table_header(cells.len());
            self.write(&header)?;
            if let TexSection::Table { header, .. } = &mut self.section {
                *header = true;
            }
        }
        let row = format!("\n{}{}", join_escaped(cells, " & "), ROW_END);
        self.write(&row)
    }

    fn flush_pending(&mut self) -> Result<()> {
        let pending = match &mut self.section {
            TexSection::Table { pending, .. } if !pending.is_empty() => std::mem::take(pending),
            _ => return Ok(()),
        };
        self.table_row(&pending)
    }

    fn begin_bibliography(&mut self) -> Result<()> {
        if let TexSection::Bibliography { begun: false, .. } = self.section {
            self.write("\\begin{thebibliography}{100}\n")?;
            if let TexSection::Bibliography { begun, .. } = &mut self.section {
                *begun = true;
            }
        }
        Ok(())
    }

    fn next_bibitem(&mut self) -> usize {
        match &mut self.section {
            TexSection::Bibliography { items, .. } => {
                *items += 1;
                *items
            }
            _ => 0,
        }
    }

    fn bibliography_item(&mut self, line: Line<'_>) -> Result<()> {
        self.begin_bibliography()?;
        let number = self.next_bibitem();
        let item = match line {
            Line::Citation(citable) => {
                let fragments = citable.fragments(self.state.citation());
                let mut item = String::new();
                if !fragments.iter().any(|f| f.tag == FragmentTag::Key) {
                    item.push_str(&format!("\\bibitem{{{}}}", citable.citation_key()));
                }
                for fragment in &fragments {
                    item.push_str(&bbl_fragment(fragment));
                }
                item
            }
            Line::Values(values) => {
                let key = format!(
                    "{}-{}",
                    normalize(self.state.section_name().unwrap_or_default()),
                    number
                );
                format!("\\bibitem{{{}}}\n{}", key, join_escaped(values, " "))
            }
        };
        self.write(&format!("\n{}\n", trim_lines(&item)))
    }

    fn plain_text(&self, line: Line<'_>) -> String {
        match line {
            Line::Values(values) => join_escaped(values, " "),
            Line::Citation(citable) => {
                let text: String = citable
                    .fragments(self.state.citation())
                    .iter()
                    .map(render_plain)
                    .collect();
                escape(text.trim_end())
            }
        }
    }
}

impl Writer for TexWriter {
    fn supported_kinds(&self) -> &[SectionKind] {
        self.state.supported_kinds()
    }

    fn open(&mut self, target: &Path) -> Result<()> {
        self.state.open(&basename(target))?;
        self.output.open(target)?;
        if self.output.target.multi_sheet() {
            self.write(PREAMBLE)?;
        }
        Ok(())
    }

    fn open_section(
        &mut self,
        name: &str,
        kind: SectionKind,
        options: &SectionOptions,
    ) -> Result<()> {
        let Some(kind) = self.state.open_section(name, kind, options)? else {
            self.section = TexSection::Skip;
            return Ok(());
        };
        if !self.output.target.multi_sheet() && !self.fixed_extension {
            let extension = if kind == SectionKind::Bibliography {
                ".bbl"
            } else {
                ".tex"
            };
            self.output.target.set_extension(extension);
        }
        self.output.open_section(name)?;

        self.section = match kind {
            SectionKind::Text => TexSection::Text,
            SectionKind::Table => TexSection::Table {
                header: false,
                pending: Vec::new(),
            },
            SectionKind::Bibliography => TexSection::Bibliography {
                begun: false,
                items: 0,
            },
            SectionKind::List => {
                let environment = if self.state.is_numbered() {
                    "enumerate"
                } else {
                    "itemize"
                };
                self.write(&format!("\\begin{{{}}}\n", environment))?;
                TexSection::List { environment }
            }
        };
        Ok(())
    }

    fn write_title(&mut self, title: &[Value], options: &TitleOptions) -> Result<()> {
        self.state.require_section("write a title")?;
        if matches!(self.section, TexSection::Skip) {
            return Ok(());
        }
        self.state.start_title();
        let multi = self.output.target.multi_sheet();
        match self.section {
            TexSection::Skip => {}
            TexSection::Text => {
                let text = styled(&join_escaped(title, " "), &options.style);
                self.write(&heading(&text, options.level))?;
            }
            TexSection::Table { .. } => {
                self.flush_pending()?;
                self.table_row(title)?;
            }
            TexSection::Bibliography { begun, .. } => {
                let text = join_escaped(title, " ");
                if multi && !begun {
                    self.write(&heading(&text, options.level))?;
                } else {
                    self.write(&format!("% {}\n", text))?;
                }
            }
            TexSection::List { .. } => {
                let text = join_escaped(title, " ");
                self.write(&format!("% {}\n", text))?;
            }
        }
        self.state.finish_title();
        Ok(())
    }

    fn write_line(&mut self, line: Line<'_>, options: &LineOptions) -> Result<()> {
        self.state.require_section("write a line")?;
        if matches!(self.section, TexSection::Skip) {
            return Ok(());
        }
        self.state.start_new_line();
        match self.section {
            TexSection::Skip => Ok(()),
            TexSection::Text => {
                let text = format!(
                    "{}{}\n\n",
                    self.state.line_prefix(),
                    styled(&self.plain_text(line), options)
                );
                self.write(&text)
            }
            TexSection::Table { .. } => {
                self.flush_pending()?;
                let cells: Vec<Value> = match line {
                    Line::Values(values) => values.to_vec(),
                    Line::Citation(citable) => citable
                        .fragments(self.state.citation())
                        .iter()
                        .map(|f| Value::from(f.bare_text()))
                        .collect(),
                };
                self.table_row(&cells)
            }
            TexSection::Bibliography { .. } => self.bibliography_item(line),
            TexSection::List { .. } => {
                let text = format!("\\item {}\n", styled(&self.plain_text(line), options));
                self.write(&text)
            }
        }
    }

    fn append(&mut self, fragment: &Fragment, options: &LineOptions) -> Result<()> {
        self.state.require_section("append")?;
        if let TexSection::Table { pending, .. } = &mut self.section {
            pending.push(Value::from(fragment.bare_text()));
            return Ok(());
        }
        match self.section {
            TexSection::Skip | TexSection::Table { .. } => Ok(()),
            TexSection::Bibliography { .. } => {
                self.begin_bibliography()?;
                self.write(&bbl_fragment(fragment))
            }
            TexSection::Text | TexSection::List { .. } => {
                let text = styled(&escape(&render_plain(fragment)), options);
                self.write(&text)
            }
        }
    }

    fn start_new_line(&mut self) -> Result<()> {
        self.state.require_section("start a new line")?;
        match self.section {
            TexSection::Skip => return Ok(()),
            TexSection::Table { .. } => self.flush_pending()?,
            TexSection::Text => self.write("\n\n")?,
            TexSection::List { .. } => self.write("\n\\item ")?,
            TexSection::Bibliography { .. } => self.write("\n")?,
        }
        self.state.start_new_line();
        if matches!(self.section, TexSection::Text) {
            let prefix = self.state.line_prefix();
            self.write(&prefix)?;
        }
        Ok(())
    }

    fn close_section(&mut self) -> Result<()> {
        self.state.require_section("close a section")?;
        match self.section {
            TexSection::Skip => return self.state.close_section(),
            TexSection::Text => {}
            TexSection::Table { .. } => {
                self.flush_pending()?;
                if let TexSection::Table { header: true, .. } = self.section {
                    self.write("\n\\end{tabular}\n")?;
                }
            }
            TexSection::Bibliography { begun, .. } => {
                if begun {
                    self.write("\n\\end{thebibliography}\n")?;
                }
            }
            TexSection::List { environment } => {
                self.write(&format!("\\end{{{}}}\n", environment))?;
            }
        }
        self.section = TexSection::Skip;
        self.state.close_section()?;
        self.output.close_section()
    }

    fn close(&mut self) -> Result<()> {
        self.state.close()?;
        if self.output.target.multi_sheet() {
            self.write("\\end{document}\n")?;
        }
        self.output.close()
    }
}
