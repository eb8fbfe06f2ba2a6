use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ToolOutput;
use crate::FontBuildError;

/// PostScript-style name of the glyph encoding `codepoint` (`uni0041`, `u1F600`).
pub fn glyph_name(codepoint: u32) -> String {
    if codepoint <= 0xFFFF {
        format!("uni{codepoint:04X}")
    } else {
        format!("u{codepoint:05X}")
    }
}

/// Vertical metrics and spacing rules for a build, in font units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontMetrics {
    pub side_bearing: i32,
    pub space_width: u32,
    pub ascent: u32,
    pub descent: u32,
    /// Four-character OS/2 vendor id.
    pub vendor: String,
}

/// How an imported outline is positioned horizontally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "base", rename_all = "snake_case")]
pub enum Placement {
    /// Shift so the ink starts at the side bearing; advance = ink end + side bearing.
    FitToInk,
    /// Reuse the shift and advance width computed for the named glyph.
    FollowBase(String),
}

/// One outline to bring into the font.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphImport {
    pub name: String,
    /// Encoded glyphs get a cmap entry; layer glyphs stay unencoded.
    pub codepoint: Option<u32>,
    pub svg: PathBuf,
    pub placement: Placement,
}

/// Everything an outline compiler needs to produce one font file.
///
/// Imports are ordered so every `FollowBase` target precedes its followers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildScript {
    pub family: String,
    pub output: PathBuf,
    pub metrics: FontMetrics,
    pub glyphs: Vec<GlyphImport>,
}

impl BuildScript {
    /// PostScript font name: the family without whitespace.
    pub fn font_name(&self) -> String {
        self.family.split_whitespace().collect()
    }

    /// Vendor id clipped or space-padded to four characters.
    pub fn vendor_id(&self) -> String {
        let mut v: String = self.metrics.vendor.chars().take(4).collect();
        while v.chars().count() < 4 {
            v.push(' ');
        }
        v
    }

    pub fn encoded(&self) -> impl Iterator<Item = &GlyphImport> {
        self.glyphs.iter().filter(|g| g.codepoint.is_some())
    }

    pub fn has_codepoint(&self, cp: u32) -> bool {
        self.glyphs.iter().any(|g| g.codepoint == Some(cp))
    }
}

/// Turns vector outlines into a font binary at `script.output`.
///
/// Implementations report a tool that could not run or exited non-zero as
/// [`FontBuildError::ExternalToolFailure`]; checking that the output exists
/// is left to the caller.
pub trait FontCompiler {
    fn compile(&self, script: &BuildScript, workdir: &Path) -> Result<ToolOutput, FontBuildError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(family: &str, vendor: &str) -> BuildScript {
        BuildScript {
            family: family.to_string(),
            output: PathBuf::from("out.ttf"),
            metrics: FontMetrics {
                side_bearing: 50,
                space_width: 500,
                ascent: 900,
                descent: 200,
                vendor: vendor.to_string(),
            },
            glyphs: vec![],
        }
    }

    #[test]
    fn glyph_names_follow_unicode_conventions() {
        assert_eq!(glyph_name(0x41), "uni0041");
        assert_eq!(glyph_name(0xDF), "uni00DF");
        assert_eq!(glyph_name(0x1F600), "u1F600");
    }

    #[test]
    fn names_and_vendor_are_normalized() {
        let s = script("My Hand  Font", "AB");
        assert_eq!(s.font_name(), "MyHandFont");
        assert_eq!(s.vendor_id(), "AB  ");
        assert_eq!(script("x", "TOOLONG").vendor_id(), "TOOL");
    }
}
