/*
 * tex_round_trip.rs
 * Copyright (c) 2025 Posit, PBC
 */

use chrono::NaiveDate;
use pubgen_writers::{
    Citable, CitationOptions, Fragment, LineOptions, SectionKind, SectionOptions, TexTableReader,
    TexWriter, TitleOptions, Value, Writer, WriterConfig, values, with_section, with_target,
};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[test]
fn test_table_reads_back_with_types() {
    let dir = tempfile::tempdir().unwrap();
    let config = WriterConfig::default().with_output_dir(dir.path());
    let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let rows = vec![
        values!["Line 1", "%èé&à_$", 666_666_666_666_i64, -0.14],
        values!["Line 2", date, true, 2.0],
    ];

    let mut writer = TexWriter::new(&config);
    with_target(&mut writer, Path::new("report.docx"), |w| {
        with_section(w, "Results", SectionKind::Table, &SectionOptions::default(), |w| {
            w.write_title(&values!["Name", "Text", "Big", "Small"], &TitleOptions::default())?;
            for row in &rows {
                w.write_values(row)?;
            }
            Ok(())
        })
    })
    .unwrap();

    let path = dir.path().join("report-Results.tex");
    let source = std::fs::read_to_string(&path).unwrap();
    assert!(
        source.starts_with("\\label{report-Results}\\begin{tabular}{|l|r|r|r|}\\hline"),
        "Got: {}",
        source
    );

    let read: Vec<Vec<Value>> = TexTableReader::new(BufReader::new(File::open(&path).unwrap()))
        .collect::<std::io::Result<_>>()
        .unwrap();
    assert_eq!(read.len(), 3, "Got: {:?}", read);
    assert_eq!(read[0], values!["Name", "Text", "Big", "Small"]);
    assert_eq!(read[1], rows[0], "Got: {:?}", read[1]);
    assert_eq!(read[2], rows[1], "Got: {:?}", read[2]);
}

struct Entry;

impl Citable for Entry {
    fn citation_key(&self) -> &str {
        "J20"
    }

    fn fragments(&self, options: &CitationOptions) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        if options.key_style.is_some() {
            fragments.push(Fragment::key("J20"));
        }
        fragments.push(Fragment::authors("J-M Jezequel. "));
        fragments.push(Fragment::title("Testing Publication Generator"));
        fragments.push(Fragment::venue("IXXX, "));
        fragments.push(Fragment::plain("2020. "));
        fragments
    }
}

#[test]
fn test_bibliography_section_writes_bbl() {
    let dir = tempfile::tempdir().unwrap();
    let config = WriterConfig::default().with_output_dir(dir.path());
    let mut writer = TexWriter::bibliography(&config);
    with_target(&mut writer, Path::new("refs.docx"), |w| {
        with_section(w, "biblio", SectionKind::Bibliography, &SectionOptions::numbered(), |w| {
            w.write_citation(&Entry)
        })?;
        // Only bibliographies are rendered by this preset
        with_section(w, "notes", SectionKind::Text, &SectionOptions::default(), |w| {
            w.write_line(pubgen_writers::Line::Values(&values!["dropped"]), &LineOptions::default())
        })
    })
    .unwrap();

    let bbl = std::fs::read_to_string(dir.path().join("refs-biblio.bbl")).unwrap();
    assert!(bbl.starts_with("\\begin{thebibliography}{100}\n"), "Got: {}", bbl);
    assert!(
        bbl.contains("\\bibitem{J20}\nJ-M Jezequel.\n\\newblock {Testing Publication Generator}.\n\\newblock {\\em IXXX}, 2020.\n"),
        "Got: {}",
        bbl
    );
    assert!(bbl.ends_with("\\end{thebibliography}\n"), "Got: {}", bbl);
    assert!(!dir.path().join("refs-notes.bbl").exists());
    assert!(!dir.path().join("refs-notes.tex").exists());
}
