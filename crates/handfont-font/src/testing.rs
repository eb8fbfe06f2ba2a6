//! In-process stand-ins for the external tools.
//!
//! [`StubCompiler`] writes a small but well-formed TrueType file (no
//! outlines) honoring the glyph names, codepoints and advance rules of the
//! build script, which is enough to exercise cmap, naming and color-table
//! code paths without FontForge or potrace installed.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;

use crate::sfnt::Sfnt;
use crate::tools::{BuildScript, FontCompiler, Placement, ToolOutput, Tracer};
use crate::FontBuildError;

/// Square outline returned by [`StubTracer`].
pub const SQUARE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><path d="M10 10 H90 V90 H10 Z"/></svg>"#;

/// Glyph description for [`minimal_font`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StubGlyph {
    pub name: String,
    pub codepoint: Option<u32>,
    pub advance: u16,
}

impl StubGlyph {
    pub fn new(name: impl Into<String>, codepoint: Option<u32>, advance: u16) -> Self {
        Self {
            name: name.into(),
            codepoint,
            advance,
        }
    }
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn head(ascent: i16, descent: i16) -> Vec<u8> {
    let mut t = Vec::with_capacity(54);
    push_u32(&mut t, 0x0001_0000); // version
    push_u32(&mut t, 0x0001_0000); // fontRevision
    push_u32(&mut t, 0); // checkSumAdjustment
    push_u32(&mut t, 0x5F0F_3CF5); // magicNumber
    push_u16(&mut t, 0x000B); // flags
    push_u16(&mut t, 1000); // unitsPerEm
    t.extend_from_slice(&[0; 16]); // created, modified
    push_i16(&mut t, 0);
    push_i16(&mut t, -descent);
    push_i16(&mut t, 1000);
    push_i16(&mut t, ascent);
    push_u16(&mut t, 0); // macStyle
    push_u16(&mut t, 8); // lowestRecPPEM
    push_i16(&mut t, 2); // fontDirectionHint
    push_i16(&mut t, 0); // indexToLocFormat
    push_i16(&mut t, 0); // glyphDataFormat
    t
}

fn hhea(ascent: i16, descent: i16, max_advance: u16, num_metrics: u16) -> Vec<u8> {
    let mut t = Vec::with_capacity(36);
    push_u32(&mut t, 0x0001_0000);
    push_i16(&mut t, ascent);
    push_i16(&mut t, -descent);
    push_i16(&mut t, 0); // lineGap
    push_u16(&mut t, max_advance);
    push_i16(&mut t, 0); // minLeftSideBearing
    push_i16(&mut t, 0); // minRightSideBearing
    push_i16(&mut t, max_advance as i16); // xMaxExtent
    push_i16(&mut t, 1); // caretSlopeRise
    push_i16(&mut t, 0); // caretSlopeRun
    push_i16(&mut t, 0); // caretOffset
    t.extend_from_slice(&[0; 8]); // reserved
    push_i16(&mut t, 0); // metricDataFormat
    push_u16(&mut t, num_metrics);
    t
}

fn cmap_format12(mut map: Vec<(u32, u16)>) -> Vec<u8> {
    map.sort_unstable();
    let mut t = Vec::new();
    push_u16(&mut t, 0); // version
    push_u16(&mut t, 1); // numTables
    push_u16(&mut t, 3); // Windows
    push_u16(&mut t, 10); // Unicode full repertoire
    push_u32(&mut t, 12);
    push_u16(&mut t, 12); // format
    push_u16(&mut t, 0);
    push_u32(&mut t, 16 + 12 * map.len() as u32);
    push_u32(&mut t, 0); // language
    push_u32(&mut t, map.len() as u32);
    for (cp, gid) in map {
        push_u32(&mut t, cp);
        push_u32(&mut t, cp);
        push_u32(&mut t, u32::from(gid));
    }
    t
}

/// `post` version 2 with every glyph name stored explicitly.
fn post_v2(names: &[&str]) -> Vec<u8> {
    let mut t = Vec::new();
    push_u32(&mut t, 0x0002_0000);
    t.extend_from_slice(&[0; 28]); // italicAngle .. maxMemType1
    push_u16(&mut t, names.len() as u16);
    for i in 0..names.len() {
        push_u16(&mut t, 258 + i as u16);
    }
    for name in names {
        let bytes = name.as_bytes();
        t.push(bytes.len().min(255) as u8);
        t.extend_from_slice(&bytes[..bytes.len().min(255)]);
    }
    t
}

fn name_table(records: &[(u16, &str)]) -> Vec<u8> {
    let mut storage = Vec::new();
    let mut t = Vec::new();
    push_u16(&mut t, 0);
    push_u16(&mut t, records.len() as u16);
    push_u16(&mut t, (6 + 12 * records.len()) as u16);
    for (id, text) in records {
        let utf16: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        push_u16(&mut t, 3); // Windows
        push_u16(&mut t, 1); // Unicode BMP
        push_u16(&mut t, 0x0409);
        push_u16(&mut t, *id);
        push_u16(&mut t, utf16.len() as u16);
        push_u16(&mut t, storage.len() as u16);
        storage.extend_from_slice(&utf16);
    }
    t.extend_from_slice(&storage);
    t
}

/// A TrueType file with `.notdef` followed by `glyphs`.
pub fn minimal_font(family: &str, glyphs: &[StubGlyph], ascent: u32, descent: u32) -> Vec<u8> {
    let ascent = i16::try_from(ascent).unwrap_or(i16::MAX);
    let descent = i16::try_from(descent).unwrap_or(i16::MAX);

    let mut names = vec![".notdef"];
    let mut advances = vec![500u16];
    let mut map = Vec::new();
    for (i, g) in glyphs.iter().enumerate() {
        names.push(&g.name);
        advances.push(g.advance);
        if let Some(cp) = g.codepoint {
            map.push((cp, (i + 1) as u16));
        }
    }
    let num_glyphs = names.len() as u16;
    let max_advance = advances.iter().copied().max().unwrap_or(0);

    let mut hmtx = Vec::new();
    for adv in &advances {
        push_u16(&mut hmtx, *adv);
        push_i16(&mut hmtx, 0);
    }
    let mut maxp = Vec::new();
    push_u32(&mut maxp, 0x0000_5000);
    push_u16(&mut maxp, num_glyphs);

    let ps_name: String = family.split_whitespace().collect();
    let mut font = Sfnt::new(0x0001_0000);
    font.set_table(*b"head", head(ascent, descent));
    font.set_table(*b"hhea", hhea(ascent, descent, max_advance, num_glyphs));
    font.set_table(*b"maxp", maxp);
    font.set_table(*b"hmtx", hmtx);
    font.set_table(*b"cmap", cmap_format12(map));
    font.set_table(*b"post", post_v2(&names));
    font.set_table(
        *b"name",
        name_table(&[(1, family), (2, "Regular"), (4, family), (6, &ps_name)]),
    );
    font.to_bytes()
}

/// [`FontCompiler`] that writes [`minimal_font`] instead of running a tool.
///
/// Fitted glyphs get `advance`; followers copy their base. A space glyph is
/// added unless the script encodes U+0020.
#[derive(Clone, Debug)]
pub struct StubCompiler {
    pub advance: u16,
    calls: Cell<usize>,
}

impl Default for StubCompiler {
    fn default() -> Self {
        Self {
            advance: 600,
            calls: Cell::new(0),
        }
    }
}

impl StubCompiler {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl FontCompiler for StubCompiler {
    fn compile(&self, script: &BuildScript, _workdir: &Path) -> Result<ToolOutput, FontBuildError> {
        self.calls.set(self.calls.get() + 1);
        let mut widths: HashMap<&str, u16> = HashMap::new();
        let mut glyphs = Vec::new();
        for import in &script.glyphs {
            if !import.svg.is_file() {
                return Err(FontBuildError::ExternalToolFailure {
                    tool: "stub-compiler".to_string(),
                    reason: format!("missing outline {}", import.svg.display()),
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
            let advance = match &import.placement {
                Placement::FitToInk => self.advance,
                Placement::FollowBase(base) => widths.get(base.as_str()).copied().unwrap_or(0),
            };
            widths.insert(&import.name, advance);
            glyphs.push(StubGlyph::new(import.name.clone(), import.codepoint, advance));
        }
        if !script.has_codepoint(32) {
            let space = u16::try_from(script.metrics.space_width).unwrap_or(u16::MAX);
            glyphs.push(StubGlyph::new("space", Some(32), space));
        }

        let bytes = minimal_font(&script.family, &glyphs, script.metrics.ascent, script.metrics.descent);
        std::fs::write(&script.output, bytes).map_err(|e| FontBuildError::io(&script.output, e))?;
        Ok(ToolOutput {
            status: Some(0),
            stdout: format!("OK glyphs: {}", script.glyphs.len()),
            stderr: String::new(),
        })
    }
}

/// Compiler that "succeeds" without writing anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentCompiler;

impl FontCompiler for SilentCompiler {
    fn compile(&self, _script: &BuildScript, _workdir: &Path) -> Result<ToolOutput, FontBuildError> {
        Ok(ToolOutput {
            status: Some(0),
            stdout: "nothing to do".to_string(),
            stderr: "warning: no glyphs generated".to_string(),
        })
    }
}

/// [`Tracer`] that writes [`SQUARE_SVG`] for every input.
#[derive(Debug, Default)]
pub struct StubTracer {
    calls: Cell<usize>,
}

impl StubTracer {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Tracer for StubTracer {
    fn trace(&self, bilevel: &Path, svg_out: &Path) -> Result<(), FontBuildError> {
        self.calls.set(self.calls.get() + 1);
        if !bilevel.is_file() {
            return Err(FontBuildError::InputNotFound(bilevel.to_path_buf()));
        }
        std::fs::write(svg_out, SQUARE_SVG).map_err(|e| FontBuildError::io(svg_out, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttf_parser::{Face, GlyphId};

    #[test]
    fn minimal_font_is_readable() {
        let glyphs = vec![
            StubGlyph::new("uni0041", Some(0x41), 640),
            StubGlyph::new("uni0041.primary", None, 640),
            StubGlyph::new("space", Some(0x20), 500),
        ];
        let bytes = minimal_font("Stub Hand", &glyphs, 900, 200);
        let face = Face::parse(&bytes, 0).expect("parse");
        assert_eq!(face.number_of_glyphs(), 4);
        let a = face.glyph_index('A').expect("A mapped");
        assert_eq!(a, GlyphId(1));
        assert_eq!(face.glyph_name(a), Some("uni0041"));
        assert_eq!(face.glyph_name(GlyphId(2)), Some("uni0041.primary"));
        assert_eq!(face.glyph_hor_advance(a), Some(640));
        assert_eq!(face.glyph_index(' '), Some(GlyphId(3)));
        assert!(face.glyph_index('B').is_none());
    }
}
