//! Conversion between native blanks (`<<blank|text>>`) and package clozes
//! (`{{cN::text}}`).

use crate::error::Result;
use regex::{Captures, Regex};
use std::collections::BTreeSet;

/// Compiled blank and cloze patterns.
#[derive(Debug, Clone)]
pub struct ClozeSyntax {
    blank: Regex,
    cloze: Regex,
}

impl ClozeSyntax {
    pub fn new() -> Result<Self> {
        Ok(Self {
            blank: Regex::new(r"(?s)<<blank\|(.*?)>>")?,
            // Color runs (`{{name|text}}`) may nest inside a cloze body or hint.
            cloze: Regex::new(
                r"(?s)\{\{c(\d+)::((?:\{\{[a-z]+\|.*?\}\}|.)*?)(?:::((?:\{\{[a-z]+\|.*?\}\}|.)*?))?\}\}",
            )?,
        })
    }

    /// Whether the text contains a native blank.
    pub fn has_blanks(&self, text: &str) -> bool {
        self.blank.is_match(text)
    }

    /// Whether the text contains a package cloze.
    pub fn has_cloze(&self, text: &str) -> bool {
        self.cloze.is_match(text)
    }

    /// Number blanks as clozes in order of appearance.
    ///
    /// `next` is the ordinal given to the first blank and is advanced past the
    /// last one, so consecutive fields of one note keep counting.
    pub fn blanks_to_cloze(&self, text: &str, next: &mut usize) -> String {
        self.blank
            .replace_all(text, |caps: &Captures| {
                let n = *next;
                *next += 1;
                format!("{{{{c{}::{}}}}}", n, &caps[1])
            })
            .into_owned()
    }

    /// Rewrite every cloze as a native blank, dropping ordinal and hint.
    pub fn cloze_to_blanks(&self, text: &str) -> String {
        self.cloze
            .replace_all(text, |caps: &Captures| format!("<<blank|{}>>", &caps[2]))
            .into_owned()
    }

    /// Distinct cloze ordinals across the given texts.
    pub fn ordinals<'a, I>(&self, texts: I) -> BTreeSet<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        texts
            .into_iter()
            .flat_map(|text| self.cloze.captures_iter(text))
            .filter_map(|caps| caps[1].parse().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_blanks_sequentially() {
        let syntax = ClozeSyntax::new().unwrap();
        let mut next = 1;
        let front = syntax.blanks_to_cloze("<<blank|Paris>> is in <<blank|France>>", &mut next);
        let back = syntax.blanks_to_cloze("see <<blank|Europe>>", &mut next);
        assert_eq!(front, "{{c1::Paris}} is in {{c2::France}}");
        assert_eq!(back, "see {{c3::Europe}}");
        assert_eq!(next, 4);
    }

    #[test]
    fn converts_clozes_to_blanks() {
        let syntax = ClozeSyntax::new().unwrap();
        assert_eq!(
            syntax.cloze_to_blanks("{{c2::Tokyo::capital}} and {{c1::Osaka}}"),
            "<<blank|Tokyo>> and <<blank|Osaka>>"
        );
    }

    #[test]
    fn keeps_color_runs_inside_clozes() {
        let syntax = ClozeSyntax::new().unwrap();
        assert_eq!(
            syntax.cloze_to_blanks("{{c1::{{red|Paris}}}} is a city"),
            "<<blank|{{red|Paris}}>> is a city"
        );
        assert_eq!(
            syntax.cloze_to_blanks("{{c2::hot {{orange|sun}} rays::{{blue|hint}}}} and {{green|grass}}"),
            "<<blank|hot {{orange|sun}} rays>> and {{green|grass}}"
        );
        let ords = syntax.ordinals(["{{c1::{{red|a}}}}", "{{c4::b}}"]);
        assert_eq!(ords.into_iter().collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn collects_distinct_ordinals() {
        let syntax = ClozeSyntax::new().unwrap();
        let ords = syntax.ordinals(["{{c1::a}} {{c1::b}}", "{{c3::c}}"]);
        assert_eq!(ords.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn detects_markers() {
        let syntax = ClozeSyntax::new().unwrap();
        assert!(syntax.has_blanks("x <<blank|y>>"));
        assert!(!syntax.has_blanks("x << y >>"));
        assert!(syntax.has_cloze("{{c12::y}}"));
        assert!(!syntax.has_cloze("{{red|y}}"));
    }
}
