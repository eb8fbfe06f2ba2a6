use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::color_tables::{inject_color_tables, layer_glyph_name, ColorFontTable};
use crate::layers::{decompose_file, SlotAssignment};
use crate::mapping::{CodepointMapping, MappedGlyph, SourceKind};
use crate::tools::{
    glyph_name, write_bilevel_pgm, BuildScript, FontCompiler, FontMetrics, GlyphImport, Placement,
    ToolOutput, Tracer,
};
use crate::{FontBuildError, Palette, PaletteConfig, PaletteRequest};

/// Spacing, metrics and tool limits of a build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub side_bearing: i32,
    pub space_width: u32,
    pub ascent: u32,
    pub descent: u32,
    pub vendor: String,
    /// Per-glyph tracer timeout in seconds.
    pub tracer_timeout_s: f64,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            side_bearing: 50,
            space_width: 500,
            ascent: 900,
            descent: 200,
            vendor: "HFNT".to_string(),
            tracer_timeout_s: 5.0,
        }
    }
}

impl AssemblerConfig {
    pub fn tracer_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.tracer_timeout_s).unwrap_or(Duration::from_secs(5))
    }

    fn metrics(&self) -> FontMetrics {
        FontMetrics {
            side_bearing: self.side_bearing,
            space_width: self.space_width,
            ascent: self.ascent,
            descent: self.descent,
            vendor: self.vendor.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    Monochrome,
    Color,
}

/// What a finished build produced.
#[derive(Clone, Debug, Serialize)]
pub struct BuildOutcome {
    pub output: PathBuf,
    pub mode: ColorMode,
    /// Encoded glyphs (letters), excluding the space.
    pub glyphs: usize,
    /// Layer glyphs imported for a color build.
    pub layer_glyphs: usize,
    pub color: Option<ColorFontTable>,
    pub compiler: ToolOutput,
}

/// Drives outline preparation, compilation and color-table injection.
///
/// Intermediate files live in a scratch directory that is removed on every
/// exit path; the output path is only written once the font is complete.
pub struct FontAssembler<'a> {
    compiler: &'a dyn FontCompiler,
    tracer: &'a dyn Tracer,
    config: AssemblerConfig,
    palette_defaults: PaletteConfig,
}

impl<'a> FontAssembler<'a> {
    pub fn new(compiler: &'a dyn FontCompiler, tracer: &'a dyn Tracer) -> Self {
        Self {
            compiler,
            tracer,
            config: AssemblerConfig::default(),
            palette_defaults: PaletteConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AssemblerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_palette_defaults(mut self, defaults: PaletteConfig) -> Self {
        self.palette_defaults = defaults;
        self
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Build a single-color font.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, mapping), fields(glyphs = mapping.len()))
    )]
    pub fn build_monochrome(
        &self,
        mapping: &CodepointMapping,
        family: &str,
        output: &Path,
    ) -> Result<BuildOutcome, FontBuildError> {
        let scratch = Scratch::new()?;
        let outlines = self.prepare_outlines(mapping, &scratch)?;

        let glyphs = outlines
            .iter()
            .map(|(g, svg)| GlyphImport {
                name: glyph_name(g.codepoint),
                codepoint: Some(g.codepoint),
                svg: svg.clone(),
                placement: Placement::FitToInk,
            })
            .collect();
        let script = self.script(family, &scratch, glyphs);
        let compiler = self.compile(&script, &scratch, output)?;

        publish(&script.output, output)?;
        log::info!("built {} ({} glyphs)", output.display(), mapping.len());
        Ok(BuildOutcome {
            output: output.to_path_buf(),
            mode: ColorMode::Monochrome,
            glyphs: mapping.len(),
            layer_glyphs: 0,
            color: None,
            compiler,
        })
    }

    /// Build a layered color font: COLR/CPAL on top of the compiled outlines.
    ///
    /// Each outline is split into palette slots; `palette` entries that are
    /// missing or malformed fall back to the configured defaults.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, mapping, palette), fields(glyphs = mapping.len()))
    )]
    pub fn build_color(
        &self,
        mapping: &CodepointMapping,
        family: &str,
        output: &Path,
        palette: Option<&PaletteRequest>,
    ) -> Result<BuildOutcome, FontBuildError> {
        let scratch = Scratch::new()?;
        let outlines = self.prepare_outlines(mapping, &scratch)?;

        let mut assignment = SlotAssignment::new();
        for (g, svg) in &outlines {
            assignment.insert(g.letter, decompose_file(svg)?);
        }
        let glyphs = self.color_imports(&outlines, &assignment, &scratch)?;
        let layer_glyphs = glyphs.iter().filter(|g| g.codepoint.is_none()).count();

        let script = self.script(family, &scratch, glyphs);
        let compiler = self.compile(&script, &scratch, output)?;

        let palette = Palette::resolve(palette, &self.palette_defaults);
        let color = inject_color_tables(&script.output, &palette)?;

        publish(&script.output, output)?;
        log::info!(
            "built color font {} ({} glyphs, {} layer glyphs)",
            output.display(),
            mapping.len(),
            layer_glyphs
        );
        Ok(BuildOutcome {
            output: output.to_path_buf(),
            mode: ColorMode::Color,
            glyphs: mapping.len(),
            layer_glyphs,
            color: Some(color),
            compiler,
        })
    }

    /// Bring every source into the scratch directory as SVG.
    fn prepare_outlines<'m>(
        &self,
        mapping: &'m CodepointMapping,
        scratch: &Scratch,
    ) -> Result<Vec<(&'m MappedGlyph, PathBuf)>, FontBuildError> {
        let mut out = Vec::with_capacity(mapping.len());
        for g in mapping.iter() {
            if !g.path.is_file() {
                return Err(FontBuildError::InputNotFound(g.path.clone()));
            }
            let svg = scratch.svg.join(format!("{}.svg", g.file_stem()));
            match mapping.kind {
                SourceKind::Vector => {
                    std::fs::copy(&g.path, &svg).map_err(|e| FontBuildError::io(&g.path, e))?;
                }
                SourceKind::Raster => {
                    let pgm = scratch.bitmaps.join(format!("{}.pgm", g.file_stem()));
                    write_bilevel_pgm(&g.path, &pgm)?;
                    self.tracer.trace(&pgm, &svg)?;
                    ensure_traced(&svg)?;
                }
            }
            out.push((g, svg));
        }
        Ok(out)
    }

    fn color_imports(
        &self,
        outlines: &[(&MappedGlyph, PathBuf)],
        assignment: &SlotAssignment,
        scratch: &Scratch,
    ) -> Result<Vec<GlyphImport>, FontBuildError> {
        let mut imports = Vec::new();
        for (g, _) in outlines {
            let Some(layers) = assignment.get(&g.letter) else {
                continue;
            };
            let Some(base_slot) = layers.base_slot() else {
                continue;
            };
            let base = glyph_name(g.codepoint);

            let mut slot_files = Vec::new();
            for (slot, doc) in &layers.layers {
                let path = scratch.svg.join(format!("{}.{slot}.svg", g.file_stem()));
                std::fs::write(&path, doc).map_err(|e| FontBuildError::io(&path, e))?;
                slot_files.push((*slot, path));
            }

            for (slot, path) in &slot_files {
                if *slot == base_slot {
                    imports.push(GlyphImport {
                        name: base.clone(),
                        codepoint: Some(g.codepoint),
                        svg: path.clone(),
                        placement: Placement::FitToInk,
                    });
                }
            }
            for (slot, path) in slot_files {
                imports.push(GlyphImport {
                    name: layer_glyph_name(&base, slot),
                    codepoint: None,
                    svg: path,
                    placement: Placement::FollowBase(base.clone()),
                });
            }
        }
        Ok(imports)
    }

    fn script(&self, family: &str, scratch: &Scratch, glyphs: Vec<GlyphImport>) -> BuildScript {
        BuildScript {
            family: family.to_string(),
            output: scratch.dir.path().join("font.ttf"),
            metrics: self.config.metrics(),
            glyphs,
        }
    }

    fn compile(
        &self,
        script: &BuildScript,
        scratch: &Scratch,
        output: &Path,
    ) -> Result<ToolOutput, FontBuildError> {
        let out = self.compiler.compile(script, scratch.dir.path())?;
        let produced = std::fs::metadata(&script.output)
            .map(|m| m.len())
            .unwrap_or(0);
        if produced == 0 {
            return Err(FontBuildError::FontCompilationFailed {
                output: output.to_path_buf(),
                log: out.combined(),
            });
        }
        Ok(out)
    }
}

struct Scratch {
    dir: TempDir,
    svg: PathBuf,
    bitmaps: PathBuf,
}

impl Scratch {
    fn new() -> Result<Self, FontBuildError> {
        let dir = tempfile::Builder::new()
            .prefix("handfont-build-")
            .tempdir()
            .map_err(|e| FontBuildError::io(std::env::temp_dir(), e))?;
        let svg = dir.path().join("svg");
        let bitmaps = dir.path().join("bitmap");
        for d in [&svg, &bitmaps] {
            std::fs::create_dir_all(d).map_err(|e| FontBuildError::io(d, e))?;
        }
        Ok(Self { dir, svg, bitmaps })
    }
}

fn ensure_traced(svg: &Path) -> Result<(), FontBuildError> {
    let size = std::fs::metadata(svg).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(FontBuildError::ExternalToolFailure {
            tool: "tracer".to_string(),
            reason: format!("no SVG produced at {}", svg.display()),
            stdout: String::new(),
            stderr: String::new(),
        });
    }
    Ok(())
}

/// Copy the finished font next to `output`, then rename it into place.
fn publish(built: &Path, output: &Path) -> Result<(), FontBuildError> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| FontBuildError::io(dir, e))?;

    let bytes = std::fs::read(built).map_err(|e| FontBuildError::io(built, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| FontBuildError::io(dir, e))?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| FontBuildError::io(output, e))?;
    tmp.persist(output)
        .map_err(|e| FontBuildError::io(output, e.error))?;
    Ok(())
}
