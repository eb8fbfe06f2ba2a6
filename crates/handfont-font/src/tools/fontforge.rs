use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::{find_executable, run_tool, BuildScript, FontCompiler, Placement, ToolOutput};
use crate::FontBuildError;

const PROGRAMS: &[&str] = &["fontforge", "fontforge-nox"];

/// [`FontCompiler`] backed by FontForge's Python scripting.
#[derive(Clone, Debug)]
pub struct FontForgeCompiler {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FontForgeCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Find `fontforge` (or `fontforge-nox`) on `PATH`.
    pub fn locate() -> Result<Self, FontBuildError> {
        find_executable(PROGRAMS)
            .map(Self::new)
            .ok_or_else(|| FontBuildError::ExternalToolFailure {
                tool: "fontforge".to_string(),
                reason: "fontforge binary not found on PATH".to_string(),
                stdout: String::new(),
                stderr: String::new(),
            })
    }

    /// Kill the compiler after `timeout`; unbounded by default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl FontCompiler for FontForgeCompiler {
    fn compile(&self, script: &BuildScript, workdir: &Path) -> Result<ToolOutput, FontBuildError> {
        let script_path = workdir.join("build_font.py");
        std::fs::write(&script_path, render_script(script))
            .map_err(|e| FontBuildError::io(&script_path, e))?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-lang=py").arg("-script").arg(&script_path).current_dir(workdir);
        let out = run_tool("fontforge", cmd, self.timeout)?;
        log::debug!("fontforge: {}", out.stdout.trim());
        Ok(out)
    }
}

/// JSON string literals are valid Python string literals.
fn py_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn py_path(p: &Path) -> String {
    py_str(&p.to_string_lossy())
}

/// Render the FontForge Python program for `script`.
pub fn render_script(script: &BuildScript) -> String {
    let m = &script.metrics;
    let mut py = String::new();
    let _ = writeln!(py, "import fontforge, psMat");
    let _ = writeln!(py);
    let _ = writeln!(py, "font = fontforge.font()");
    let _ = writeln!(py, "font.encoding = \"UnicodeFull\"");
    let _ = writeln!(py, "font.familyname = {}", py_str(&script.family));
    let _ = writeln!(py, "font.fontname = {}", py_str(&script.font_name()));
    let _ = writeln!(py, "font.fullname = {}", py_str(&script.family));
    let _ = writeln!(py, "font.ascent = {}", m.ascent);
    let _ = writeln!(py, "font.descent = {}", m.descent);
    let _ = writeln!(py, "pad = {}", m.side_bearing);
    let _ = writeln!(py, "shifts = {{}}");
    let _ = writeln!(py, "widths = {{}}");
    let _ = writeln!(py, "count = 0");
    py.push_str(
        r#"
def load(cp, name, path):
    g = font.createChar(cp, name)
    g.importOutlines(path)
    g.removeOverlap()
    g.simplify()
    return g

def fit(g):
    xmin, ymin, xmax, ymax = g.boundingBox()
    shifts[g.glyphname] = pad - xmin
    g.transform(psMat.translate(pad - xmin, 0))
    xmin, ymin, xmax, ymax = g.boundingBox()
    g.width = int(xmax + pad)
    widths[g.glyphname] = g.width

def follow(g, base):
    g.transform(psMat.translate(shifts[base], 0))
    g.width = widths[base]

"#,
    );

    for glyph in &script.glyphs {
        let cp = glyph.codepoint.map_or(-1, i64::from);
        let _ = writeln!(
            py,
            "g = load({cp}, {}, {})",
            py_str(&glyph.name),
            py_path(&glyph.svg)
        );
        match &glyph.placement {
            Placement::FitToInk => {
                let _ = writeln!(py, "fit(g)");
            }
            Placement::FollowBase(base) => {
                let _ = writeln!(py, "follow(g, {})", py_str(base));
            }
        }
        let _ = writeln!(py, "count += 1");
    }

    let _ = writeln!(py);
    let _ = writeln!(py, "if 32 not in [gg.unicode for gg in font.glyphs()]:");
    let _ = writeln!(py, "    sp = font.createChar(32)");
    let _ = writeln!(py, "    sp.width = {}", m.space_width);
    let _ = writeln!(py);
    let _ = writeln!(py, "font.os2_family_class = 2057");
    let _ = writeln!(py, "font.os2_weight = 400");
    let _ = writeln!(py, "font.os2_width = 5");
    let _ = writeln!(py, "font.os2_fstype = 0");
    let _ = writeln!(py, "font.os2_vendor = {}", py_str(&script.vendor_id()));
    let _ = writeln!(py, "font.generate({})", py_path(&script.output));
    let _ = writeln!(py, "print(\"OK glyphs:\", count)");
    py
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FontMetrics, GlyphImport};

    fn script() -> BuildScript {
        BuildScript {
            family: "Hand \"Quoted\"".to_string(),
            output: PathBuf::from("/tmp/work/out.ttf"),
            metrics: FontMetrics {
                side_bearing: 50,
                space_width: 500,
                ascent: 900,
                descent: 200,
                vendor: "HFNT".to_string(),
            },
            glyphs: vec![
                GlyphImport {
                    name: "uni0041".to_string(),
                    codepoint: Some(0x41),
                    svg: PathBuf::from("/tmp/work/svg/u0041.primary.svg"),
                    placement: Placement::FitToInk,
                },
                GlyphImport {
                    name: "uni0041.accent".to_string(),
                    codepoint: None,
                    svg: PathBuf::from("/tmp/work/svg/u0041.accent.svg"),
                    placement: Placement::FollowBase("uni0041".to_string()),
                },
            ],
        }
    }

    #[test]
    fn script_imports_each_glyph_in_order() {
        let py = render_script(&script());
        let base = py
            .find(r#"g = load(65, "uni0041", "/tmp/work/svg/u0041.primary.svg")"#)
            .expect("base import");
        let layer = py
            .find(r#"g = load(-1, "uni0041.accent", "/tmp/work/svg/u0041.accent.svg")"#)
            .expect("layer import");
        assert!(base < layer);
        assert!(py.contains(r#"follow(g, "uni0041")"#));
        assert_eq!(py.matches("count += 1").count(), 2);
    }

    #[test]
    fn script_sets_metrics_and_escapes_strings() {
        let py = render_script(&script());
        assert!(py.contains(r#"font.familyname = "Hand \"Quoted\"""#));
        assert!(py.contains(r#"font.fontname = "Hand\"Quoted\"""#));
        assert!(py.contains("font.ascent = 900"));
        assert!(py.contains("font.descent = 200"));
        assert!(py.contains("pad = 50"));
        assert!(py.contains("    sp.width = 500"));
        assert!(py.contains(r#"font.os2_vendor = "HFNT""#));
        assert!(py.contains(r#"font.generate("/tmp/work/out.ttf")"#));
    }

    #[test]
    fn missing_fontforge_is_a_tool_failure() {
        let compiler = FontForgeCompiler::new("/nonexistent/fontforge");
        let dir = tempfile::TempDir::new().expect("tmp");
        let err = compiler.compile(&script(), dir.path()).unwrap_err();
        assert!(matches!(err, FontBuildError::ExternalToolFailure { .. }));
        assert!(dir.path().join("build_font.py").is_file());
    }
}
