//! Color mini-language
//!
//! Supported forms:
//! - Literal: `[r, g, b]` with each channel in [0, 255]
//! - Hex: `#RRGGBB` (case-insensitive)
//! - Named: `__blue__` etc., resolved against `NAMED_COLORS`

use serde_json::Value;

use super::viewport::symbolic_name;
use crate::pattern::BuildError;

pub type Rgb = (u8, u8, u8);

pub const WHITE: Rgb = (255, 255, 255);
pub const BLACK: Rgb = (0, 0, 0);
pub const BLUE: Rgb = (0, 0, 255);

/// Named color table (names are matched lowercase)
pub const NAMED_COLORS: &[(&str, Rgb)] = &[
    ("white", WHITE),
    ("black", BLACK),
    ("blue", BLUE),
    ("red", (255, 0, 0)),
    ("green", (0, 255, 0)),
    ("yellow", (255, 255, 0)),
    ("cyan", (0, 255, 255)),
    ("magenta", (255, 0, 255)),
    ("gray", (128, 128, 128)),
];

pub fn named_color(name: &str) -> Option<Rgb> {
    NAMED_COLORS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, rgb)| *rgb)
}

fn parse_hex(s: &str) -> Option<Rgb> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn parse_channel(value: &Value) -> Option<u8> {
    value.as_u64().and_then(|v| u8::try_from(v).ok())
}

/// Resolve a color token
pub fn resolve_color(token: &Value) -> Result<Rgb, BuildError> {
    let bad = || BuildError::BadColor(token.to_string());
    match token {
        Value::Array(items) => match items.as_slice() {
            [r, g, b] => Ok((
                parse_channel(r).ok_or_else(bad)?,
                parse_channel(g).ok_or_else(bad)?,
                parse_channel(b).ok_or_else(bad)?,
            )),
            _ => Err(bad()),
        },
        Value::String(s) if s.starts_with('#') => parse_hex(s).ok_or_else(bad),
        Value::String(s) => symbolic_name(s)
            .and_then(|name| named_color(&name))
            .ok_or_else(bad),
        _ => Err(bad()),
    }
}
