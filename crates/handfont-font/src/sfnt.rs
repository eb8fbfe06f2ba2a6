//! Minimal sfnt container access: read the table directory, swap tables,
//! write a new file with fresh checksums.

use crate::FontBuildError;

pub type Tag = [u8; 4];

const TRUETYPE: u32 = 0x0001_0000;
const OPENTYPE_CFF: u32 = u32::from_be_bytes(*b"OTTO");
const APPLE_TRUE: u32 = u32::from_be_bytes(*b"true");
const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;
const HEAD_ADJUSTMENT_OFFSET: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SfntTable {
    pub tag: Tag,
    pub data: Vec<u8>,
}

/// An sfnt font held as a list of raw tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sfnt {
    pub version: u32,
    pub tables: Vec<SfntTable>,
}

fn invalid(msg: impl Into<String>) -> FontBuildError {
    FontBuildError::InvalidFont(msg.into())
}

fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

fn be_u32(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Sum of big-endian u32 words, the last one zero-padded.
pub fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

impl Sfnt {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            tables: Vec::new(),
        }
    }

    /// Parse a single-font sfnt file. Collections are rejected.
    pub fn parse(data: &[u8]) -> Result<Self, FontBuildError> {
        let version = be_u32(data, 0).ok_or_else(|| invalid("file shorter than sfnt header"))?;
        if version != TRUETYPE && version != OPENTYPE_CFF && version != APPLE_TRUE {
            return Err(invalid(format!("unsupported sfnt version 0x{version:08X}")));
        }
        let num_tables = be_u16(data, 4).ok_or_else(|| invalid("truncated sfnt header"))?;

        let mut tables = Vec::with_capacity(num_tables as usize);
        for i in 0..num_tables as usize {
            let rec = 12 + i * 16;
            let (Some(tag), Some(offset), Some(length)) = (
                data.get(rec..rec + 4),
                be_u32(data, rec + 8),
                be_u32(data, rec + 12),
            ) else {
                return Err(invalid("truncated table directory"));
            };
            let (offset, length) = (offset as usize, length as usize);
            let body = data
                .get(offset..offset.saturating_add(length))
                .ok_or_else(|| invalid(format!("table {} out of bounds", tag_str(tag))))?;
            let mut t = [0u8; 4];
            t.copy_from_slice(tag);
            tables.push(SfntTable {
                tag: t,
                data: body.to_vec(),
            });
        }
        Ok(Self { version, tables })
    }

    pub fn table(&self, tag: &Tag) -> Option<&[u8]> {
        self.tables
            .iter()
            .find(|t| &t.tag == tag)
            .map(|t| t.data.as_slice())
    }

    /// Replace the table with `tag`, or add it.
    pub fn set_table(&mut self, tag: Tag, data: Vec<u8>) {
        match self.tables.iter_mut().find(|t| t.tag == tag) {
            Some(t) => t.data = data,
            None => self.tables.push(SfntTable { tag, data }),
        }
    }

    pub fn remove_table(&mut self, tag: &Tag) -> Option<Vec<u8>> {
        let idx = self.tables.iter().position(|t| &t.tag == tag)?;
        Some(self.tables.remove(idx).data)
    }

    /// Serialize with tables sorted by tag, 4-byte aligned, per-table
    /// checksums and a recomputed `head.checkSumAdjustment`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut tables: Vec<&SfntTable> = self.tables.iter().collect();
        tables.sort_by_key(|t| t.tag);

        let num_tables = tables.len() as u16;
        let entry_selector = if num_tables > 0 {
            15 - num_tables.leading_zeros() as u16
        } else {
            0
        };
        let search_range = (1u16 << entry_selector).wrapping_mul(16);
        let range_shift = num_tables.wrapping_mul(16).saturating_sub(search_range);

        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&num_tables.to_be_bytes());
        out.extend_from_slice(&search_range.to_be_bytes());
        out.extend_from_slice(&entry_selector.to_be_bytes());
        out.extend_from_slice(&range_shift.to_be_bytes());

        let mut offset = 12 + tables.len() * 16;
        let mut head_offset = None;
        for t in &tables {
            let data = if &t.tag == b"head" {
                head_offset = Some(offset);
                zeroed_adjustment(&t.data)
            } else {
                t.data.clone()
            };
            out.extend_from_slice(&t.tag);
            out.extend_from_slice(&table_checksum(&data).to_be_bytes());
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(t.data.len() as u32).to_be_bytes());
            offset += t.data.len().next_multiple_of(4);
        }
        for t in &tables {
            if &t.tag == b"head" {
                out.extend_from_slice(&zeroed_adjustment(&t.data));
            } else {
                out.extend_from_slice(&t.data);
            }
            out.resize(out.len().next_multiple_of(4), 0);
        }

        if let Some(at) = head_offset {
            let at = at + HEAD_ADJUSTMENT_OFFSET;
            if at + 4 <= out.len() {
                let adjustment = CHECKSUM_MAGIC.wrapping_sub(table_checksum(&out));
                out[at..at + 4].copy_from_slice(&adjustment.to_be_bytes());
            }
        }
        out
    }
}

fn zeroed_adjustment(head: &[u8]) -> Vec<u8> {
    let mut head = head.to_vec();
    if let Some(slot) = head.get_mut(HEAD_ADJUSTMENT_OFFSET..HEAD_ADJUSTMENT_OFFSET + 4) {
        slot.fill(0);
    }
    head
}

pub(crate) fn tag_str(tag: &[u8]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}
