//! Read a built font back for diagnostics.

use std::path::Path;

use serde::{Deserialize, Serialize};
use ttf_parser::{name_id, Face};

use crate::color_tables::{decode_colr_v0, decode_cpal_v0};
use crate::sfnt::Sfnt;
use crate::FontBuildError;

/// Probe set used when no characters are requested.
pub const DEFAULT_PROBE: &str = "Aa0,äß";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphMetrics {
    pub glyph_id: u16,
    pub name: Option<String>,
    pub advance: Option<u16>,
    /// `[x_min, y_min, x_max, y_max]`; `None` for empty outlines.
    pub bbox: Option<[i16; 4]>,
    /// COLR layers of this glyph, 0 when it has none.
    pub color_layers: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharCoverage {
    pub ch: char,
    pub codepoint: u32,
    pub glyph: Option<GlyphMetrics>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSummary {
    pub base_glyphs: usize,
    pub layer_records: usize,
    /// First palette as `#rrggbbaa`.
    pub palette: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontReport {
    pub family: Option<String>,
    pub subfamily: Option<String>,
    pub glyph_count: u16,
    pub units_per_em: u16,
    pub chars: Vec<CharCoverage>,
    /// Probed characters without a cmap entry, in probe order.
    pub missing: String,
    pub color: Option<ColorSummary>,
}

impl FontReport {
    pub fn covers(&self, ch: char) -> bool {
        self.chars.iter().any(|c| c.ch == ch && c.glyph.is_some())
    }
}

fn font_name(face: &Face<'_>, id: u16) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == id && n.is_unicode())
        .find_map(|n| n.to_string())
}

/// Inspect font bytes, probing `chars` (or [`DEFAULT_PROBE`] when empty).
pub fn inspect_font(data: &[u8], chars: &str) -> Result<FontReport, FontBuildError> {
    let face = Face::parse(data, 0).map_err(|e| FontBuildError::InvalidFont(e.to_string()))?;
    let sfnt = Sfnt::parse(data)?;

    let layers = sfnt.table(b"COLR").map(decode_colr_v0).transpose()?;
    let palette = sfnt.table(b"CPAL").map(decode_cpal_v0).transpose()?;
    let color = match (&layers, palette) {
        (None, None) => None,
        (layers, palette) => Some(ColorSummary {
            base_glyphs: layers.as_ref().map_or(0, |l| l.bases.len()),
            layer_records: layers.as_ref().map_or(0, |l| l.layer_count()),
            palette: palette
                .unwrap_or_default()
                .iter()
                .map(|[r, g, b, a]| format!("#{r:02x}{g:02x}{b:02x}{a:02x}"))
                .collect(),
        }),
    };

    let probe = if chars.is_empty() { DEFAULT_PROBE } else { chars };
    let mut coverage = Vec::new();
    let mut missing = String::new();
    for ch in probe.chars() {
        let glyph = face.glyph_index(ch).map(|gid| GlyphMetrics {
            glyph_id: gid.0,
            name: face.glyph_name(gid).map(str::to_string),
            advance: face.glyph_hor_advance(gid),
            bbox: face
                .glyph_bounding_box(gid)
                .map(|r| [r.x_min, r.y_min, r.x_max, r.y_max]),
            color_layers: layers
                .as_ref()
                .and_then(|l| l.layers(gid.0))
                .map_or(0, <[_]>::len),
        });
        if glyph.is_none() {
            missing.push(ch);
        }
        coverage.push(CharCoverage {
            ch,
            codepoint: u32::from(ch),
            glyph,
        });
    }
    if !missing.is_empty() {
        log::info!("characters missing from cmap: {missing:?}");
    }

    Ok(FontReport {
        family: font_name(&face, name_id::FAMILY),
        subfamily: font_name(&face, name_id::SUBFAMILY),
        glyph_count: face.number_of_glyphs(),
        units_per_em: face.units_per_em(),
        chars: coverage,
        missing,
        color,
    })
}

pub fn inspect_file(path: &Path, chars: &str) -> Result<FontReport, FontBuildError> {
    if !path.is_file() {
        return Err(FontBuildError::InputNotFound(path.to_path_buf()));
    }
    let data = std::fs::read(path).map_err(|e| FontBuildError::io(path, e))?;
    inspect_font(&data, chars)
}
