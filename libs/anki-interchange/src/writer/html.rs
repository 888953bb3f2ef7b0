//! Render native lightweight markup as package HTML.

use crate::error::Result;
use flashcard_core::markup::escape_html;
use flashcard_core::Palette;
use regex::{Captures, Regex};

/// Renders `**bold**`, `{{color|text}}` and line breaks.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    palette: Palette,
    bold: Regex,
    color: Regex,
}

impl HtmlRenderer {
    pub fn new(palette: Palette) -> Result<Self> {
        Ok(Self {
            palette,
            bold: Regex::new(r"(?s)\*\*(.+?)\*\*")?,
            color: Regex::new(r"(?s)\{\{([a-z]+)\|(.*?)\}\}")?,
        })
    }

    /// Convert native text to HTML. Text outside markup is escaped so the
    /// reader recovers it verbatim.
    pub fn render(&self, text: &str) -> String {
        let escaped = escape_html(text);
        let bolded = self.bold.replace_all(&escaped, "<b>${1}</b>");
        let colored = self.color.replace_all(&bolded, |caps: &Captures| {
            match self.palette.rgb_of(&caps[1]) {
                Some(rgb) => format!(
                    "<span style=\"color: rgb({}, {}, {});\">{}</span>",
                    rgb.r, rgb.g, rgb.b, &caps[2]
                ),
                None => caps[0].to_string(),
            }
        });
        colored.replace("\r\n", "\n").replace('\n', "<br>")
    }
}
