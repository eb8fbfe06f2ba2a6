//! COLR v0 / CPAL v0 construction and injection.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use ttf_parser::{Face, GlyphId};

use crate::sfnt::Sfnt;
use crate::{FontBuildError, Palette, PaletteSlot, Rgba};

const COLR_HEADER_LEN: usize = 14;
const CPAL_HEADER_LEN: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub glyph_id: u16,
    pub palette_index: u16,
}

/// Base glyph id -> ordered layers, sorted by glyph id as COLR requires.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTable {
    pub bases: BTreeMap<u16, Vec<LayerRecord>>,
}

impl LayerTable {
    pub fn layer_count(&self) -> usize {
        self.bases.values().map(Vec::len).sum()
    }

    pub fn layers(&self, base: u16) -> Option<&[LayerRecord]> {
        self.bases.get(&base).map(Vec::as_slice)
    }
}

/// Palette and layer table injected into one font.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorFontTable {
    pub palette: Vec<Rgba>,
    pub layers: LayerTable,
}

/// Name of the layer glyph holding `slot` of `base`.
pub fn layer_glyph_name(base: &str, slot: PaletteSlot) -> String {
    format!("{base}.{slot}")
}

/// Build the layer table of a compiled font.
///
/// Every glyph reachable through a Unicode cmap becomes a base glyph. Its
/// layers are the glyphs named `<base>.<slot>`, checked in palette order; a
/// glyph without any gets a single layer of itself at index 0.
pub fn build_layer_table(face: &Face<'_>) -> LayerTable {
    let mut by_name: HashMap<&str, u16> = HashMap::new();
    for id in 0..face.number_of_glyphs() {
        if let Some(name) = face.glyph_name(GlyphId(id)) {
            by_name.entry(name).or_insert(id);
        }
    }

    let mut encoded: BTreeSet<u16> = BTreeSet::new();
    if let Some(cmap) = face.tables().cmap {
        for subtable in cmap.subtables {
            if !subtable.is_unicode() {
                continue;
            }
            subtable.codepoints(|cp| {
                if let Some(gid) = subtable.glyph_index(cp) {
                    if gid.0 != 0 {
                        encoded.insert(gid.0);
                    }
                }
            });
        }
    }

    let mut bases = BTreeMap::new();
    for gid in encoded {
        let layers: Vec<LayerRecord> = face
            .glyph_name(GlyphId(gid))
            .map(|base| {
                PaletteSlot::ALL
                    .into_iter()
                    .filter_map(|slot| {
                        by_name
                            .get(layer_glyph_name(base, slot).as_str())
                            .map(|&glyph_id| LayerRecord {
                                glyph_id,
                                palette_index: slot.index(),
                            })
                    })
                    .collect()
            })
            .unwrap_or_default();
        let layers = if layers.is_empty() {
            vec![LayerRecord {
                glyph_id: gid,
                palette_index: PaletteSlot::Primary.index(),
            }]
        } else {
            layers
        };
        bases.insert(gid, layers);
    }
    LayerTable { bases }
}

pub fn encode_colr_v0(table: &LayerTable) -> Vec<u8> {
    let num_bases = table.bases.len();
    let num_layers = table.layer_count();
    let layers_offset = COLR_HEADER_LEN + num_bases * 6;

    let mut out = Vec::with_capacity(layers_offset + num_layers * 4);
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&(num_bases as u16).to_be_bytes());
    out.extend_from_slice(&(COLR_HEADER_LEN as u32).to_be_bytes());
    out.extend_from_slice(&(layers_offset as u32).to_be_bytes());
    out.extend_from_slice(&(num_layers as u16).to_be_bytes());

    let mut first = 0u16;
    for (gid, layers) in &table.bases {
        out.extend_from_slice(&gid.to_be_bytes());
        out.extend_from_slice(&first.to_be_bytes());
        out.extend_from_slice(&(layers.len() as u16).to_be_bytes());
        first += layers.len() as u16;
    }
    for layer in table.bases.values().flatten() {
        out.extend_from_slice(&layer.glyph_id.to_be_bytes());
        out.extend_from_slice(&layer.palette_index.to_be_bytes());
    }
    out
}

/// One palette; records are stored BGRA.
pub fn encode_cpal_v0(colors: &[Rgba]) -> Vec<u8> {
    let n = colors.len() as u16;
    let mut out = Vec::with_capacity(CPAL_HEADER_LEN + 2 + colors.len() * 4);
    out.extend_from_slice(&0u16.to_be_bytes()); // version
    out.extend_from_slice(&n.to_be_bytes()); // numPaletteEntries
    out.extend_from_slice(&1u16.to_be_bytes()); // numPalettes
    out.extend_from_slice(&n.to_be_bytes()); // numColorRecords
    out.extend_from_slice(&((CPAL_HEADER_LEN + 2) as u32).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // colorRecordIndices[0]
    for c in colors {
        let [r, g, b, a] = c.to_bytes();
        out.extend_from_slice(&[b, g, r, a]);
    }
    out
}

fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

fn be_u32(data: &[u8], at: usize) -> Option<usize> {
    data.get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize)
}

/// Read back a version 0 COLR table.
pub fn decode_colr_v0(data: &[u8]) -> Result<LayerTable, FontBuildError> {
    let bad = || FontBuildError::InvalidFont("malformed COLR table".to_string());
    if be_u16(data, 0).ok_or_else(bad)? != 0 {
        return Err(FontBuildError::InvalidFont("only COLR version 0 is supported".into()));
    }
    let num_bases = be_u16(data, 2).ok_or_else(bad)? as usize;
    let bases_at = be_u32(data, 4).ok_or_else(bad)?;
    let layers_at = be_u32(data, 8).ok_or_else(bad)?;
    let num_layers = be_u16(data, 12).ok_or_else(bad)? as usize;

    let mut bases = BTreeMap::new();
    for i in 0..num_bases {
        let rec = bases_at + i * 6;
        let gid = be_u16(data, rec).ok_or_else(bad)?;
        let first = be_u16(data, rec + 2).ok_or_else(bad)? as usize;
        let count = be_u16(data, rec + 4).ok_or_else(bad)? as usize;
        if first + count > num_layers {
            return Err(bad());
        }
        let mut layers = Vec::with_capacity(count);
        for l in first..first + count {
            let at = layers_at + l * 4;
            layers.push(LayerRecord {
                glyph_id: be_u16(data, at).ok_or_else(bad)?,
                palette_index: be_u16(data, at + 2).ok_or_else(bad)?,
            });
        }
        bases.insert(gid, layers);
    }
    Ok(LayerTable { bases })
}

/// First palette of a CPAL table as 8-bit RGBA.
pub fn decode_cpal_v0(data: &[u8]) -> Result<Vec<[u8; 4]>, FontBuildError> {
    let bad = || FontBuildError::InvalidFont("malformed CPAL table".to_string());
    let entries = be_u16(data, 2).ok_or_else(bad)? as usize;
    let records_at = be_u32(data, 8).ok_or_else(bad)?;
    let first = be_u16(data, CPAL_HEADER_LEN).ok_or_else(bad)? as usize;
    (0..entries)
        .map(|i| {
            let at = records_at + (first + i) * 4;
            data.get(at..at + 4)
                .map(|c| [c[2], c[1], c[0], c[3]])
                .ok_or_else(bad)
        })
        .collect()
}

/// Add COLR and CPAL to a compiled font.
///
/// The file is rewritten through a sibling temporary file and renamed into
/// place, so a failure leaves the original untouched.
pub fn inject_color_tables(font_path: &Path, palette: &Palette) -> Result<ColorFontTable, FontBuildError> {
    let data = std::fs::read(font_path).map_err(|e| FontBuildError::io(font_path, e))?;
    let face = Face::parse(&data, 0)
        .map_err(|e| FontBuildError::InvalidFont(format!("{}: {e}", font_path.display())))?;
    let layers = build_layer_table(&face);
    let colors = palette.colors().to_vec();

    let mut sfnt = Sfnt::parse(&data)?;
    sfnt.set_table(*b"COLR", encode_colr_v0(&layers));
    sfnt.set_table(*b"CPAL", encode_cpal_v0(&colors));
    let bytes = sfnt.to_bytes();

    let dir = font_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| FontBuildError::io(dir, e))?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| FontBuildError::io(tmp.path(), e))?;
    tmp.persist(font_path)
        .map_err(|e| FontBuildError::io(font_path, e.error))?;

    log::info!(
        "injected COLR ({} base glyphs, {} layers) and CPAL ({} entries) into {}",
        layers.bases.len(),
        layers.layer_count(),
        colors.len(),
        font_path.display()
    );
    Ok(ColorFontTable {
        palette: colors,
        layers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LayerTable {
        let mut bases = BTreeMap::new();
        bases.insert(
            3,
            vec![
                LayerRecord { glyph_id: 7, palette_index: 0 },
                LayerRecord { glyph_id: 8, palette_index: 2 },
            ],
        );
        bases.insert(1, vec![LayerRecord { glyph_id: 1, palette_index: 0 }]);
        LayerTable { bases }
    }

    #[test]
    fn colr_layout_is_sorted_with_contiguous_layers() {
        let bytes = encode_colr_v0(&table());
        assert_eq!(bytes.len(), 14 + 2 * 6 + 3 * 4);
        // base records: gid 1 first (layers 0..1), then gid 3 (layers 1..3)
        assert_eq!(&bytes[14..26], &[0, 1, 0, 0, 0, 1, 0, 3, 0, 1, 0, 2]);
        assert_eq!(decode_colr_v0(&bytes).expect("decode"), table());
    }

    #[test]
    fn cpal_stores_bgra() {
        let colors = [Rgba::opaque(0x11, 0x22, 0x33), Rgba::opaque(0xff, 0x99, 0x00)];
        let bytes = encode_cpal_v0(&colors);
        assert_eq!(bytes.len(), 14 + 8);
        assert_eq!(&bytes[14..18], &[0x33, 0x22, 0x11, 0xff]);
        let back = decode_cpal_v0(&bytes).expect("decode");
        assert_eq!(back, vec![[0x11, 0x22, 0x33, 0xff], [0xff, 0x99, 0x00, 0xff]]);
    }

    #[test]
    fn truncated_colr_is_rejected() {
        let bytes = encode_colr_v0(&table());
        assert!(decode_colr_v0(&bytes[..20]).is_err());
    }
}
