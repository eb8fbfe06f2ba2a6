use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use handfont_core::TemplateGeometry;
use handfont_font::{
    language_status, map_codepoints, AssemblerConfig, BuildOutcome, ColorMode, FontAssembler,
    FontCompiler, GlyphFileStem, GlyphSource, GlyphVariant, LanguageStatus, PaletteConfig,
    PaletteRequest, SourceKind, Tracer,
};
use handfont_print::{write_png, PrintError};
use handfont_segment::{GlyphCandidate, SegmentationReport, Segmenter, SegmenterParams};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::Error;

/// Segment an encoded scan with default parameters.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(scan, geometry, letters), fields(bytes = scan.len()))
)]
pub fn segment(
    scan: &[u8],
    geometry: &TemplateGeometry,
    letters: &str,
) -> Result<Vec<GlyphCandidate>, Error> {
    let report = segment_with_report(scan, geometry, letters, &SegmenterParams::default())?;
    Ok(report.into_candidates())
}

/// Segment an encoded scan and keep the diagnostics.
pub fn segment_with_report(
    scan: &[u8],
    geometry: &TemplateGeometry,
    letters: &str,
    params: &SegmenterParams,
) -> Result<SegmentationReport, Error> {
    let segmenter = Segmenter::new(geometry.clone(), params.clone());
    Ok(segmenter.segment_bytes(scan, letters)?)
}

/// Segment a scan on disk, optionally writing diagnostic images to `debug_dir`.
pub fn segment_file(
    path: &Path,
    geometry: &TemplateGeometry,
    letters: &str,
    params: &SegmenterParams,
    debug_dir: Option<&Path>,
) -> Result<SegmentationReport, Error> {
    let mut segmenter = Segmenter::new(geometry.clone(), params.clone());
    if let Some(dir) = debug_dir {
        segmenter = segmenter.with_debug_dir(dir);
    }
    Ok(segmenter.segment_file(path, letters)?)
}

/// File name of variant `variant` of `letter`, `None` for letters that cannot
/// be part of a file name.
pub fn candidate_file_name(letter: char, variant: u32) -> Option<String> {
    if letter.is_control() || matches!(letter, '/' | '\\' | '.' | ':') {
        return None;
    }
    Some(format!("{letter}_{variant}.png"))
}

/// Write candidates as `<letter>_<variant>.png` into `out_dir`.
///
/// Variants already present in `out_dir` are kept: each letter continues
/// after its highest existing index, so the first export of a letter stays
/// its default in [`GlyphSource::scan_dir`] order.
pub fn export_candidates(
    candidates: &[GlyphCandidate],
    out_dir: &Path,
    dpi: u32,
) -> Result<Vec<PathBuf>, Error> {
    std::fs::create_dir_all(out_dir).map_err(PrintError::from)?;
    let mut next_variant = existing_variants(out_dir)?;
    let mut written = Vec::with_capacity(candidates.len());
    for c in candidates {
        let variant = next_variant.entry(c.letter).or_insert(0);
        let Some(mut name) = candidate_file_name(c.letter, *variant) else {
            log::warn!("cell {}: letter {:?} has no file name, skipped", c.cell_index, c.letter);
            continue;
        };
        while out_dir.join(&name).exists() && *variant < u32::MAX {
            *variant += 1;
            name = format!("{}_{}.png", c.letter, *variant);
        }
        *variant = variant.saturating_add(1);
        let path = out_dir.join(name);
        write_png(&path, &c.image, dpi)?;
        log::debug!("cell {} -> {}", c.cell_index, path.display());
        written.push(path);
    }
    Ok(written)
}

/// Next free variant index per letter already exported to `dir`.
fn existing_variants(dir: &Path) -> Result<HashMap<char, u32>, Error> {
    let mut next = HashMap::new();
    let entries = std::fs::read_dir(dir).map_err(PrintError::from)?;
    for entry in entries {
        let path = entry.map_err(PrintError::from)?.path();
        let Some(stem) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(GlyphFileStem::parse)
        else {
            continue;
        };
        if let Some(GlyphVariant::Index(n)) = stem.variant {
            let slot = next.entry(stem.letter).or_insert(0);
            *slot = (*slot).max(n.saturating_add(1));
        }
    }
    Ok(next)
}

/// Everything a font build needs apart from the external tools.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildRequest {
    pub sources: Vec<GlyphSource>,
    pub alphabet: String,
    pub family: String,
    pub mode: ColorMode,
    pub source_kind: SourceKind,
    pub palette: Option<PaletteRequest>,
    pub palette_defaults: PaletteConfig,
    pub assembler: AssemblerConfig,
    pub output: PathBuf,
}

impl BuildRequest {
    /// Monochrome build from raster sources with default settings.
    pub fn new(
        sources: Vec<GlyphSource>,
        alphabet: impl Into<String>,
        family: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sources,
            alphabet: alphabet.into(),
            family: family.into(),
            mode: ColorMode::Monochrome,
            source_kind: SourceKind::Raster,
            palette: None,
            palette_defaults: PaletteConfig::default(),
            assembler: AssemblerConfig::default(),
            output: output.into(),
        }
    }

    /// Switch to a color build from vector sources.
    pub fn color(mut self, palette: Option<PaletteRequest>) -> Self {
        self.mode = ColorMode::Color;
        self.source_kind = SourceKind::Vector;
        self.palette = palette;
        self
    }

    /// Alphabet coverage of the sources this request would actually use.
    ///
    /// A letter counts once it has an existing source of `source_kind`.
    pub fn readiness(&self) -> LanguageStatus {
        let covered: BTreeSet<String> = self
            .sources
            .iter()
            .filter(|s| s.kind == self.source_kind && s.path.is_file())
            .map(|s| s.letter.clone())
            .collect();
        language_status(&self.family, &self.alphabet, &covered)
    }
}

/// Build a font and return the path it was written to.
pub fn build_font(
    request: &BuildRequest,
    compiler: &dyn FontCompiler,
    tracer: &dyn Tracer,
) -> Result<PathBuf, Error> {
    Ok(build_font_with_outcome(request, compiler, tracer)?.output)
}

/// Build a font and report what went into it.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(request, compiler, tracer),
        fields(family = %request.family, mode = ?request.mode)
    )
)]
pub fn build_font_with_outcome(
    request: &BuildRequest,
    compiler: &dyn FontCompiler,
    tracer: &dyn Tracer,
) -> Result<BuildOutcome, Error> {
    let mapping = map_codepoints(&request.sources, &request.alphabet, request.source_kind)?;
    let assembler = FontAssembler::new(compiler, tracer)
        .with_config(request.assembler.clone())
        .with_palette_defaults(request.palette_defaults.clone());
    let outcome = match request.mode {
        ColorMode::Monochrome => {
            assembler.build_monochrome(&mapping, &request.family, &request.output)?
        }
        ColorMode::Color => assembler.build_color(
            &mapping,
            &request.family,
            &request.output,
            request.palette.as_ref(),
        )?,
    };
    Ok(outcome)
}
