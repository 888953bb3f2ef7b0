//! Field normalization: package HTML to native lightweight markup.
//!
//! Substitutions run in a fixed order: line breaks, block elements, lists,
//! bold, color runs, tag stripping, character references, blank-line
//! collapsing.

use crate::error::Result;
use flashcard_core::markup::{decode_entities, parse_css_color};
use flashcard_core::{CoreError, InterchangeSettings, Palette};
use regex::{Captures, Regex};

/// Compiled substitution rules for one settings value.
#[derive(Debug, Clone)]
pub struct HtmlNormalizer {
    palette: Palette,
    line_break: Regex,
    block: Regex,
    list: Regex,
    bold_open_nested: Regex,
    bold_close_nested: Regex,
    bold: Regex,
    span: Regex,
    style_attr: Regex,
    font: Regex,
    tag: Regex,
    blank_lines: Regex,
}

impl HtmlNormalizer {
    pub fn new(settings: &InterchangeSettings) -> Result<Self> {
        let block_tags = settings
            .block_tags
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            palette: settings.palette(),
            line_break: Regex::new(r"(?i)<br\b[^>]*>")?,
            block: Regex::new(&format!(r"(?i)</?(?:{})\b[^>]*>", block_tags))?,
            list: Regex::new(r"(?i)<(/?)(ol|ul|dl|li|dt|dd)\b[^>]*>")?,
            bold_open_nested: Regex::new(r"(?i)<(?:b|strong)\b[^>]*>\s*<(?:b|strong)\b[^>]*>")?,
            bold_close_nested: Regex::new(r"(?i)</(?:b|strong)\s*>\s*</(?:b|strong)\s*>")?,
            bold: Regex::new(r"(?is)<(?:b|strong)\b[^>]*>(.*?)</(?:b|strong)\s*>")?,
            span: Regex::new(r"(?is)<span\b([^>]*)>(.*?)</span\s*>")?,
            style_attr: Regex::new(r#"(?is)\bstyle\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            font: Regex::new(r#"(?is)<font\b[^>]*?\bcolor\s*=\s*["']?([^"'\s>]+)["']?[^>]*>(.*?)</font\s*>"#)?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            blank_lines: Regex::new(r"\n(?:[ \t]*\n){2,}")?,
        })
    }

    /// Normalize one field, falling back to the untouched input if
    /// normalization fails.
    pub fn process_html_content(&self, html: &str) -> String {
        match self.normalize(html) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Keeping original field content, normalization failed: {}", e);
                html.to_string()
            }
        }
    }

    /// Normalize one field.
    pub fn normalize(&self, html: &str) -> std::result::Result<String, CoreError> {
        let text = html.replace("\r\n", "\n");
        let text = self.line_break.replace_all(&text, "\n");
        let text = self.block.replace_all(&text, "\n");
        let text = self.number_lists(&text);
        let text = self.collapse_bold(&text);
        let text = self.bold.replace_all(&text, "**${1}**");
        let text = self.span.replace_all(&text, |caps: &Captures| {
            let color = self.span_color(&caps[1]);
            self.wrap_color(color, &caps[2])
        });
        let text = self.font.replace_all(&text, |caps: &Captures| {
            self.wrap_color(parse_css_color(&caps[1]), &caps[2])
        });
        let text = self.tag.replace_all(&text, "");
        let text = decode_entities(&text)?;
        let text = self.blank_lines.replace_all(&text, "\n\n");
        Ok(text.trim().to_string())
    }

    fn number_lists(&self, text: &str) -> String {
        let mut counter = 0usize;
        self.list
            .replace_all(text, |caps: &Captures| {
                let closing = !caps[1].is_empty();
                match caps[2].to_ascii_lowercase().as_str() {
                    "li" if !closing => {
                        counter += 1;
                        format!("\n{}. ", counter)
                    }
                    "ol" | "ul" | "dl" if !closing => {
                        counter = 0;
                        "\n".to_string()
                    }
                    _ => "\n".to_string(),
                }
            })
            .into_owned()
    }

    fn collapse_bold(&self, text: &str) -> String {
        let mut current = text.to_string();
        loop {
            let next = self.bold_open_nested.replace_all(&current, "<b>");
            let next = self.bold_close_nested.replace_all(&next, "</b>").into_owned();
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn span_color(&self, attrs: &str) -> Option<flashcard_core::Rgb> {
        let caps = self.style_attr.captures(attrs)?;
        let style = caps.get(1).or_else(|| caps.get(2))?.as_str();
        style.split(';').find_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            if prop.trim().eq_ignore_ascii_case("color") {
                parse_css_color(value)
            } else {
                None
            }
        })
    }

    fn wrap_color(&self, color: Option<flashcard_core::Rgb>, inner: &str) -> String {
        let name = color.and_then(|c| self.palette.classify(c));
        match name {
            Some(name) if !inner.trim().is_empty() => format!("{{{{{}|{}}}}}", name, inner),
            _ => inner.to_string(),
        }
    }
}
