//! Letter -> codepoint mapping for a build request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::FontBuildError;

/// How a glyph source is stored on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Bitmap (PNG and friends); traced to outlines before compilation.
    Raster,
    /// SVG outline, imported as is.
    Vector,
}

impl SourceKind {
    /// Classify a file by extension; `None` for anything unrecognized.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "svg" => Some(Self::Vector),
            "png" | "jpg" | "jpeg" | "bmp" | "pgm" | "pbm" | "tif" | "tiff" => Some(Self::Raster),
            _ => None,
        }
    }
}

/// The default source for one letter, as kept by the glyph store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphSource {
    pub letter: String,
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl GlyphSource {
    pub fn new(letter: impl Into<String>, path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self {
            letter: letter.into(),
            path: path.into(),
            kind,
        }
    }

    /// Collect sources from a directory of `<letter>.<ext>` or
    /// `<letter>_<variant>.<ext>` files.
    ///
    /// Sources are ordered by letter, then by numeric variant, so `A_3`
    /// precedes `A_10` and a bare `A` precedes both. Non-numeric suffixes
    /// come last, by file name. Files whose extension is not a known glyph
    /// format are skipped.
    pub fn scan_dir(dir: &Path) -> Result<Vec<GlyphSource>, FontBuildError> {
        if !dir.is_dir() {
            return Err(FontBuildError::InputNotFound(dir.to_path_buf()));
        }
        let entries = std::fs::read_dir(dir).map_err(|e| FontBuildError::io(dir, e))?;
        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| FontBuildError::io(dir, e))?.path();
            let Some(kind) = SourceKind::from_path(&path) else {
                continue;
            };
            let Some(stem) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(GlyphFileStem::parse)
            else {
                log::debug!("skipping {}: no letter in file name", path.display());
                continue;
            };
            found.push((stem, path, kind));
        }
        found.sort_by(|(a, pa, _), (b, pb, _)| a.sort_key().cmp(&b.sort_key()).then(pa.cmp(pb)));

        Ok(found
            .into_iter()
            .map(|(stem, path, kind)| GlyphSource::new(stem.letter.to_string(), path, kind))
            .collect())
    }
}

/// Letter and variant encoded in a glyph file stem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphFileStem {
    pub letter: char,
    /// `None` for a bare `<letter>` stem.
    pub variant: Option<GlyphVariant>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlyphVariant {
    Index(u32),
    /// A suffix that is not a number.
    Named,
}

impl GlyphFileStem {
    /// Parse `A`, `A_3` or `A_whatever`; `None` when the stem does not start
    /// with a single letter.
    pub fn parse(stem: &str) -> Option<Self> {
        let mut chars = stem.chars();
        let letter = chars.next()?;
        let rest = chars.as_str();
        let variant = if rest.is_empty() {
            None
        } else {
            let suffix = rest.strip_prefix('_')?;
            Some(match suffix.parse::<u32>() {
                Ok(n) => GlyphVariant::Index(n),
                Err(_) => GlyphVariant::Named,
            })
        };
        Some(Self { letter, variant })
    }

    fn sort_key(&self) -> (char, u8, u32) {
        match self.variant {
            None => (self.letter, 0, 0),
            Some(GlyphVariant::Index(n)) => (self.letter, 1, n),
            Some(GlyphVariant::Named) => (self.letter, 2, 0),
        }
    }
}

/// One letter that made it into the font.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedGlyph {
    pub letter: char,
    pub codepoint: u32,
    pub path: PathBuf,
}

impl MappedGlyph {
    /// Stable scratch-file stem, e.g. `u0041`.
    pub fn file_stem(&self) -> String {
        format!("u{:04X}", self.codepoint)
    }
}

/// Ordered letters of one build, all backed by sources of a single kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodepointMapping {
    pub kind: SourceKind,
    pub glyphs: Vec<MappedGlyph>,
}

impl CodepointMapping {
    #[inline]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappedGlyph> {
        self.glyphs.iter()
    }

    pub fn get(&self, letter: char) -> Option<&MappedGlyph> {
        self.glyphs.iter().find(|g| g.letter == letter)
    }

    pub fn codepoints(&self) -> Vec<u32> {
        self.glyphs.iter().map(|g| g.codepoint).collect()
    }
}

/// Select the letters a build can use.
///
/// A source is taken when its letter is exactly one character, that
/// character is in `alphabet`, the source is of `kind` and its file exists
/// (vector sources must also end in `.svg`). The first source seen for a
/// letter wins; later duplicates are ignored.
pub fn map_codepoints(
    sources: &[GlyphSource],
    alphabet: &str,
    kind: SourceKind,
) -> Result<CodepointMapping, FontBuildError> {
    let mut glyphs: Vec<MappedGlyph> = Vec::new();

    for src in sources {
        if src.kind != kind {
            continue;
        }
        let mut chars = src.letter.chars();
        let (Some(letter), None) = (chars.next(), chars.next()) else {
            log::debug!("skipping multi-character letter {:?}", src.letter);
            continue;
        };
        if !alphabet.contains(letter) {
            continue;
        }
        if !src.path.is_file() {
            log::debug!("skipping {letter:?}: {} does not exist", src.path.display());
            continue;
        }
        if kind == SourceKind::Vector && !has_svg_extension(&src.path) {
            continue;
        }
        if glyphs.iter().any(|g| g.letter == letter) {
            log::warn!(
                "duplicate source for {letter:?} ignored: {}",
                src.path.display()
            );
            continue;
        }
        glyphs.push(MappedGlyph {
            letter,
            codepoint: u32::from(letter),
            path: src.path.clone(),
        });
    }

    if glyphs.is_empty() {
        return Err(FontBuildError::NoUsableGlyphs {
            alphabet: alphabet.to_string(),
        });
    }
    log::info!("mapped {} of {} alphabet letters", glyphs.len(), alphabet.chars().count());
    Ok(CodepointMapping { kind, glyphs })
}

fn has_svg_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, b"x").expect("write");
        p
    }

    #[test]
    fn filters_by_alphabet_length_and_existence() {
        let dir = TempDir::new().expect("tmp");
        let a = touch(&dir, "A.png");
        let z = touch(&dir, "Z.png");
        let ae = touch(&dir, "AE.png");
        let sources = vec![
            GlyphSource::new("A", &a, SourceKind::Raster),
            GlyphSource::new("Z", &z, SourceKind::Raster),
            GlyphSource::new("AE", &ae, SourceKind::Raster),
            GlyphSource::new("B", dir.path().join("missing.png"), SourceKind::Raster),
        ];
        let m = map_codepoints(&sources, "AB", SourceKind::Raster).expect("mapping");
        assert_eq!(m.len(), 1);
        assert_eq!(m.glyphs[0].letter, 'A');
        assert_eq!(m.glyphs[0].codepoint, 65);
        assert_eq!(m.glyphs[0].file_stem(), "u0041");
    }

    #[test]
    fn first_source_wins_on_duplicates() {
        let dir = TempDir::new().expect("tmp");
        let first = touch(&dir, "A_1.png");
        let second = touch(&dir, "A_2.png");
        let sources = vec![
            GlyphSource::new("A", &first, SourceKind::Raster),
            GlyphSource::new("A", &second, SourceKind::Raster),
        ];
        let m = map_codepoints(&sources, "A", SourceKind::Raster).expect("mapping");
        assert_eq!(m.len(), 1);
        assert_eq!(m.get('A').map(|g| g.path.clone()), Some(first));
    }

    #[test]
    fn vector_sources_need_svg_extension_and_matching_kind() {
        let dir = TempDir::new().expect("tmp");
        let svg = touch(&dir, "a.SVG");
        let txt = touch(&dir, "b.txt");
        let png = touch(&dir, "c.png");
        let sources = vec![
            GlyphSource::new("a", &svg, SourceKind::Vector),
            GlyphSource::new("b", &txt, SourceKind::Vector),
            GlyphSource::new("c", &png, SourceKind::Raster),
        ];
        let m = map_codepoints(&sources, "abc", SourceKind::Vector).expect("mapping");
        assert_eq!(m.codepoints(), vec![u32::from('a')]);
    }

    #[test]
    fn empty_mapping_is_an_error() {
        let err = map_codepoints(&[], "ABC", SourceKind::Raster).unwrap_err();
        assert!(matches!(err, FontBuildError::NoUsableGlyphs { .. }));
    }

    #[test]
    fn non_ascii_letters_map_to_their_scalar_value() {
        let dir = TempDir::new().expect("tmp");
        let p = touch(&dir, "sz.png");
        let sources = vec![GlyphSource::new("ß", &p, SourceKind::Raster)];
        let m = map_codepoints(&sources, "ÄÖÜß", SourceKind::Raster).expect("mapping");
        assert_eq!(m.glyphs[0].codepoint, 0xDF);
        assert_eq!(m.glyphs[0].file_stem(), "u00DF");
    }

    #[test]
    fn scan_dir_reads_letter_prefixed_files() {
        let dir = TempDir::new().expect("tmp");
        touch(&dir, "A_0.png");
        touch(&dir, "B.svg");
        touch(&dir, "notes.txt");
        touch(&dir, "CD_1.png");
        let found = GlyphSource::scan_dir(dir.path()).expect("scan");
        let letters: Vec<(&str, SourceKind)> =
            found.iter().map(|s| (s.letter.as_str(), s.kind)).collect();
        assert_eq!(
            letters,
            vec![("A", SourceKind::Raster), ("B", SourceKind::Vector)]
        );
    }

    #[test]
    fn scan_dir_orders_variants_numerically() {
        let dir = TempDir::new().expect("tmp");
        for name in ["A_10.png", "A_3.png", "A_x.png", "B_2.png", "A.png", "__1.png"] {
            touch(&dir, name);
        }
        let found = GlyphSource::scan_dir(dir.path()).expect("scan");
        let names: Vec<String> = found
            .iter()
            .filter_map(|s| s.path.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(
            names,
            vec!["A.png", "A_3.png", "A_10.png", "A_x.png", "B_2.png", "__1.png"]
        );

        // the lowest variant is the one a build uses
        let m = map_codepoints(&found, "A", SourceKind::Raster).expect("mapping");
        assert_eq!(m.get('A').map(|g| g.path.clone()), Some(dir.path().join("A.png")));
    }

    #[test]
    fn stems_split_into_letter_and_variant() {
        assert_eq!(
            GlyphFileStem::parse("A_12"),
            Some(GlyphFileStem { letter: 'A', variant: Some(GlyphVariant::Index(12)) })
        );
        assert_eq!(
            GlyphFileStem::parse("ß"),
            Some(GlyphFileStem { letter: 'ß', variant: None })
        );
        assert_eq!(
            GlyphFileStem::parse("__0"),
            Some(GlyphFileStem { letter: '_', variant: Some(GlyphVariant::Index(0)) })
        );
        assert_eq!(GlyphFileStem::parse("CD_1"), None);
        assert_eq!(GlyphFileStem::parse(""), None);
    }
}
