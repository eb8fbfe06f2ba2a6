//! Font synthesis for handfont.
//!
//! Glyph sources (letter-named PNG or SVG files) are mapped onto Unicode
//! codepoints, brought into SVG form with an external tracer, and compiled
//! into a TrueType font with an external compiler. Color builds split each
//! outline into palette slots and add COLR/CPAL tables to the result.
//!
//! ```no_run
//! use handfont_font::{
//!     map_codepoints, FontAssembler, FontForgeCompiler, GlyphSource, PotraceTracer, SourceKind,
//! };
//!
//! let sources = GlyphSource::scan_dir("glyphs".as_ref())?;
//! let mapping = map_codepoints(&sources, "ABC", SourceKind::Raster)?;
//! let compiler = FontForgeCompiler::locate()?;
//! let tracer = PotraceTracer::locate(PotraceTracer::DEFAULT_TIMEOUT)?;
//! let outcome = FontAssembler::new(&compiler, &tracer)
//!     .build_monochrome(&mapping, "My Hand", "MyHand.ttf".as_ref())?;
//! println!("{} glyphs", outcome.glyphs);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod assembler;
mod color_tables;
mod error;
mod inspect;
mod layers;
mod mapping;
mod palette;
mod readiness;
mod sfnt;
mod tools;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use assembler::{AssemblerConfig, BuildOutcome, ColorMode, FontAssembler};
pub use color_tables::{
    build_layer_table, decode_colr_v0, decode_cpal_v0, encode_colr_v0, encode_cpal_v0,
    inject_color_tables, layer_glyph_name, ColorFontTable, LayerRecord, LayerTable,
};
pub use error::FontBuildError;
pub use inspect::{
    inspect_file, inspect_font, CharCoverage, ColorSummary, FontReport, GlyphMetrics,
    DEFAULT_PROBE,
};
pub use layers::{decompose_file, decompose_svg, Decomposition, SlotAssignment, SlotLayers, SLOT_ATTR};
pub use mapping::{
    map_codepoints, CodepointMapping, GlyphFileStem, GlyphSource, GlyphVariant, MappedGlyph,
    SourceKind,
};
pub use palette::{
    parse_hex_color, ColorSource, InvalidColor, Palette, PaletteConfig, PaletteRequest,
    PaletteSlot, ResolvedColor, Rgba,
};
pub use readiness::{language_status, languages_status, Language, LanguageStatus};
pub use sfnt::{table_checksum, Sfnt, SfntTable, Tag};
pub use tools::{
    find_executable, glyph_name, render_script, run_tool, write_bilevel_pgm, BuildScript,
    FontCompiler, FontForgeCompiler, FontMetrics, GlyphImport, Placement, PotraceTracer,
    ToolError, ToolOutput, Tracer,
};
