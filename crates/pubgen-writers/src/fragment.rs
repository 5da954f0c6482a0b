/*
 * fragment.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tagged pieces of text produced by citable records.
//!
//! A record never renders itself into a particular format. Instead it
//! yields a sequence of [`Fragment`]s, each tagged with the role it plays
//! in the entry, and every backend decides how to style each role.

/// The role a fragment plays in a rendered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentTag {
    Key,
    Authors,
    Title,
    Venue,
    Plain,
}

/// A piece of an entry, with an optional hyperlink target.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub tag: FragmentTag,
    pub text: String,
    pub href: Option<String>,
}

impl Fragment {
    pub fn new(tag: FragmentTag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
            href: None,
        }
    }

    pub fn key(text: impl Into<String>) -> Self {
        Self::new(FragmentTag::Key, text)
    }

    pub fn authors(text: impl Into<String>) -> Self {
        Self::new(FragmentTag::Authors, text)
    }

    pub fn title(text: impl Into<String>) -> Self {
        Self::new(FragmentTag::Title, text)
    }

    pub fn venue(text: impl Into<String>) -> Self {
        Self::new(FragmentTag::Venue, text)
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(FragmentTag::Plain, text)
    }

    pub fn with_href(mut self, href: Option<String>) -> Self {
        self.href = href;
        self
    }

    /// Text with the rendering punctuation removed, for cell-per-fragment
    /// backends.
    pub fn bare_text(&self) -> &str {
        self.text.trim().trim_end_matches([',', '.']).trim_end()
    }
}

/// How the bracketed key of an entry is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyStyle {
    /// The entry's own citation key.
    #[default]
    Key,
    /// The value of the named field, falling back to the citation key.
    Field(String),
}

/// Rendering choices passed to [`Citable::fragments`].
#[derive(Debug, Clone, PartialEq)]
pub struct CitationOptions {
    /// `None` renders the entry without a key fragment.
    pub key_style: Option<KeyStyle>,
    pub terse: bool,
    /// Authors listed before "et al" in terse mode.
    pub max_terse_authors: usize,
    pub show_month: bool,
}

impl Default for CitationOptions {
    fn default() -> Self {
        Self {
            key_style: Some(KeyStyle::Key),
            terse: false,
            max_terse_authors: 6,
            show_month: false,
        }
    }
}

impl CitationOptions {
    pub fn terse() -> Self {
        Self {
            terse: true,
            ..Self::default()
        }
    }
}

/// Anything that can be written as a bibliography entry.
pub trait Citable {
    /// The key used to cite this entry.
    fn citation_key(&self) -> &str;

    /// The fragments of this entry, in rendering order.
    fn fragments(&self, options: &CitationOptions) -> Vec<Fragment>;
}

/// Plain-text rendering of a fragment: the key is bracketed and the title
/// is followed by a comma, everything else is written as is.
pub fn render_plain(fragment: &Fragment) -> String {
    match fragment.tag {
        FragmentTag::Key => format!("[{}] ", fragment.text),
        FragmentTag::Title => format!("{}, ", fragment.text),
        FragmentTag::Authors | FragmentTag::Venue | FragmentTag::Plain => fragment.text.clone(),
    }
}

/// Concatenated plain rendering of a whole entry.
pub fn render_entry(citable: &dyn Citable, options: &CitationOptions) -> String {
    citable
        .fragments(options)
        .iter()
        .map(render_plain)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample;

    impl Citable for Sample {
        fn citation_key(&self) -> &str {
            "S1"
        }

        fn fragments(&self, options: &CitationOptions) -> Vec<Fragment> {
            let mut out = Vec::new();
            if options.key_style.is_some() {
                out.push(Fragment::key("S1"));
            }
            out.push(Fragment::authors("A. Author. "));
            out.push(Fragment::title("A Title"));
            out.push(Fragment::plain("2021. "));
            out
        }
    }

    #[test]
    fn test_render_plain_by_tag() {
        assert_eq!(render_plain(&Fragment::key("J20")), "[J20] ");
        assert_eq!(render_plain(&Fragment::title("T")), "T, ");
        assert_eq!(render_plain(&Fragment::venue("IXXX, ")), "IXXX, ");
    }

    #[test]
    fn test_render_entry() {
        let text = render_entry(&Sample, &CitationOptions::default());
        assert_eq!(text, "[S1] A. Author. A Title, 2021. ");

        let options = CitationOptions {
            key_style: None,
            ..CitationOptions::default()
        };
        assert_eq!(render_entry(&Sample, &options), "A. Author. A Title, 2021. ");
    }

    #[test]
    fn test_bare_text() {
        assert_eq!(Fragment::venue("IXXX, ").bare_text(), "IXXX");
        assert_eq!(Fragment::authors("J-M Jezequel. ").bare_text(), "J-M Jezequel");
        assert_eq!(Fragment::plain("2020. ").bare_text(), "2020");
    }
}
