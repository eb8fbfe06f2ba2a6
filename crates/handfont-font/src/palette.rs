//! Color slots and palette resolution.

use serde::{Deserialize, Serialize};

/// Named color layer of a glyph. Declaration order is palette order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteSlot {
    Primary,
    Accent,
    Secondary,
}

impl PaletteSlot {
    pub const ALL: [PaletteSlot; 3] = [Self::Primary, Self::Accent, Self::Secondary];

    /// Fixed CPAL entry index.
    #[inline]
    pub fn index(self) -> u16 {
        match self {
            Self::Primary => 0,
            Self::Accent => 1,
            Self::Secondary => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Accent => "accent",
            Self::Secondary => "secondary",
        }
    }

    /// Parse a slot tag; surrounding whitespace and case are ignored.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|slot| slot.name().eq_ignore_ascii_case(tag))
    }
}

impl std::fmt::Display for PaletteSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// RGBA color with components in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    /// 8-bit `[r, g, b, a]`.
    pub fn to_bytes(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.to_bytes();
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color {input:?}: {reason}")]
pub struct InvalidColor {
    pub input: String,
    pub reason: &'static str,
}

/// Parse `#RRGGBB` or `#RRGGBBAA`; the leading `#` is optional.
pub fn parse_hex_color(input: &str) -> Result<Rgba, InvalidColor> {
    let fail = |reason| InvalidColor {
        input: input.to_string(),
        reason,
    };
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 && hex.len() != 8 {
        return Err(fail("expected 6 or 8 hex digits"));
    }
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(fail("non-hex digit"));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map(|v| v as f32 / 255.0)
            .map_err(|_| fail("non-hex digit"))
    };
    Ok(Rgba {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
        a: if hex.len() == 8 { channel(6)? } else { 1.0 },
    })
}

/// Built-in slot colors, used when even the configured defaults are unusable.
const BUILTIN: [Rgba; 3] = [
    Rgba::opaque(0x00, 0x00, 0x00),
    Rgba::opaque(0xff, 0x99, 0x00),
    Rgba::opaque(0xff, 0xff, 0xff),
];

/// Default slot colors handed to the assembler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub primary: String,
    pub accent: String,
    pub secondary: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            primary: "#000000".to_string(),
            accent: "#ff9900".to_string(),
            secondary: "#ffffff".to_string(),
        }
    }
}

impl PaletteConfig {
    pub fn get(&self, slot: PaletteSlot) -> &str {
        match slot {
            PaletteSlot::Primary => &self.primary,
            PaletteSlot::Accent => &self.accent,
            PaletteSlot::Secondary => &self.secondary,
        }
    }
}

/// Per-build palette request; any entry may be left out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteRequest {
    pub primary: Option<String>,
    pub accent: Option<String>,
    pub secondary: Option<String>,
}

impl PaletteRequest {
    pub fn get(&self, slot: PaletteSlot) -> Option<&str> {
        match slot {
            PaletteSlot::Primary => self.primary.as_deref(),
            PaletteSlot::Accent => self.accent.as_deref(),
            PaletteSlot::Secondary => self.secondary.as_deref(),
        }
    }
}

/// Where a resolved slot color came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSource {
    Requested,
    Default,
    Builtin,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedColor {
    pub color: Rgba,
    pub source: ColorSource,
}

/// The three slot colors of one build, in palette order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub entries: [ResolvedColor; 3],
}

impl Palette {
    /// Resolve each slot: requested color, else configured default, else built-in.
    ///
    /// Malformed colors are logged and skipped, never fatal.
    pub fn resolve(request: Option<&PaletteRequest>, defaults: &PaletteConfig) -> Self {
        let entries = PaletteSlot::ALL.map(|slot| resolve_slot(slot, request, defaults));
        Self { entries }
    }

    pub fn color(&self, slot: PaletteSlot) -> Rgba {
        self.entries[slot.index() as usize].color
    }

    pub fn colors(&self) -> [Rgba; 3] {
        self.entries.map(|e| e.color)
    }
}

fn resolve_slot(
    slot: PaletteSlot,
    request: Option<&PaletteRequest>,
    defaults: &PaletteConfig,
) -> ResolvedColor {
    if let Some(raw) = request.and_then(|r| r.get(slot)) {
        match parse_hex_color(raw) {
            Ok(color) => {
                return ResolvedColor {
                    color,
                    source: ColorSource::Requested,
                }
            }
            Err(e) => log::warn!("{slot} color: {e}; using default"),
        }
    }
    match parse_hex_color(defaults.get(slot)) {
        Ok(color) => ResolvedColor {
            color,
            source: ColorSource::Default,
        },
        Err(e) => {
            log::warn!("default {slot} color: {e}; using built-in");
            ResolvedColor {
                color: BUILTIN[slot.index() as usize],
                source: ColorSource::Builtin,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_short_and_alpha_forms() {
        let c = parse_hex_color("#ff9900").expect("rgb");
        assert_relative_eq!(c.r, 1.0);
        assert_relative_eq!(c.g, 0.6);
        assert_relative_eq!(c.b, 0.0);
        assert_relative_eq!(c.a, 1.0);

        let c = parse_hex_color(" 00000080 ").expect("rgba without hash");
        assert_eq!(c.to_bytes(), [0, 0, 0, 0x80]);
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
        assert!(parse_hex_color("").is_err());
        assert!(parse_hex_color("#ff00ff00ff").is_err());
    }

    #[test]
    fn slot_tags_are_case_insensitive() {
        assert_eq!(PaletteSlot::parse(" Accent "), Some(PaletteSlot::Accent));
        assert_eq!(PaletteSlot::parse("SECONDARY"), Some(PaletteSlot::Secondary));
        assert_eq!(PaletteSlot::parse("tertiary"), None);
    }

    #[test]
    fn bad_entries_fall_back_per_slot() {
        let request = PaletteRequest {
            primary: Some("#123456".into()),
            accent: Some("orange".into()),
            secondary: None,
        };
        let palette = Palette::resolve(Some(&request), &PaletteConfig::default());
        let sources: Vec<ColorSource> = palette.entries.iter().map(|e| e.source).collect();
        assert_eq!(
            sources,
            vec![ColorSource::Requested, ColorSource::Default, ColorSource::Default]
        );
        assert_eq!(palette.color(PaletteSlot::Primary).to_bytes(), [0x12, 0x34, 0x56, 0xff]);
        assert_eq!(palette.color(PaletteSlot::Accent).to_hex(), "#ff9900ff");
        assert_eq!(palette.color(PaletteSlot::Secondary).to_hex(), "#ffffffff");
    }

    #[test]
    fn broken_defaults_use_builtin_colors() {
        let defaults = PaletteConfig {
            primary: "nope".into(),
            ..PaletteConfig::default()
        };
        let palette = Palette::resolve(None, &defaults);
        assert_eq!(palette.entries[0].source, ColorSource::Builtin);
        assert_eq!(palette.color(PaletteSlot::Primary).to_bytes(), [0, 0, 0, 255]);
    }
}
