//! Markup tables: HTML escaping, character references and the named-color
//! palette used by `{{color|text}}` runs.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn distance_sq(&self, other: &Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// Palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedColor {
    pub name: String,
    pub rgb: Rgb,
}

impl NamedColor {
    pub fn new(name: &str, rgb: Rgb) -> Self {
        Self {
            name: name.to_string(),
            rgb,
        }
    }
}

/// Named colors plus the thresholds used to snap arbitrary colors onto them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<NamedColor>,
    dark_channel_max: u8,
    dominant_channel_min: u8,
}

impl Palette {
    pub fn new(colors: Vec<NamedColor>, dark_channel_max: u8, dominant_channel_min: u8) -> Self {
        Self {
            colors,
            dark_channel_max,
            dominant_channel_min,
        }
    }

    pub fn colors(&self) -> &[NamedColor] {
        &self.colors
    }

    /// Look up a palette color by name.
    pub fn rgb_of(&self, name: &str) -> Option<Rgb> {
        self.colors.iter().find(|c| c.name == name).map(|c| c.rgb)
    }

    /// Map a color to a palette name.
    ///
    /// Near-black (every channel below the dark threshold) is no color. A
    /// single channel above the dominant threshold with the other two below
    /// the dark threshold is that primary directly. Anything else snaps to
    /// the nearest palette entry by Euclidean distance.
    pub fn classify(&self, color: Rgb) -> Option<&str> {
        let dark = self.dark_channel_max;
        if color.r < dark && color.g < dark && color.b < dark {
            return None;
        }

        let dominant = self.dominant_channel_min;
        let primary = if color.r > dominant && color.g < dark && color.b < dark {
            Some("red")
        } else if color.g > dominant && color.r < dark && color.b < dark {
            Some("green")
        } else if color.b > dominant && color.r < dark && color.g < dark {
            Some("blue")
        } else {
            None
        };
        if let Some(name) = primary {
            if let Some(entry) = self.colors.iter().find(|c| c.name == name) {
                return Some(entry.name.as_str());
            }
        }

        self.colors
            .iter()
            .min_by_key(|c| c.rgb.distance_sq(&color))
            .map(|c| c.name.as_str())
    }
}

/// Parse a CSS color value: `rgb(r, g, b)`, `rgba(r, g, b, a)`, `#rrggbb` or `#rgb`.
pub fn parse_css_color(value: &str) -> Option<Rgb> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = value.to_ascii_lowercase();
    let inner = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let channels: Vec<u8> = inner
        .split(',')
        .take(3)
        .map(|part| part.trim().parse::<u16>().ok().map(|v| v.min(255) as u8))
        .collect::<Option<Vec<_>>>()?;
    match channels.as_slice() {
        [r, g, b] => Some(Rgb::new(*r, *g, *b)),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Rgb::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Rgb::new(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

/// Escape the characters HTML treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode named and numeric character references.
///
/// Unknown named references are kept verbatim. A numeric reference that is
/// not a valid code point is an error.
pub fn decode_entities(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let end = candidate
            .char_indices()
            .take(12)
            .find(|(_, c)| *c == ';')
            .map(|(i, _)| i);

        let Some(end) = end else {
            out.push('&');
            rest = &candidate[1..];
            continue;
        };

        let name = &candidate[1..end];
        match decode_reference(name)? {
            Some(c) => out.push(c),
            None => out.push_str(&candidate[..=end]),
        }
        rest = &candidate[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn decode_reference(name: &str) -> Result<Option<char>> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => num.parse::<u32>(),
        }
        .map_err(|_| CoreError::InvalidEntity(format!("&{};", name)))?;
        return char::from_u32(code)
            .map(Some)
            .ok_or_else(|| CoreError::InvalidEntity(format!("&{};", name)));
    }

    Ok(match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    })
}
