use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder};

use super::{find_executable, run_tool};
use crate::FontBuildError;

/// Converts a bilevel bitmap into an SVG outline.
pub trait Tracer {
    fn trace(&self, bilevel: &Path, svg_out: &Path) -> Result<(), FontBuildError>;
}

/// Threshold a glyph image at 50 % and store it as a binary PGM.
///
/// Ink (dark) becomes 0 and background 255, the polarity potrace expects.
pub fn write_bilevel_pgm(src: &Path, pgm_out: &Path) -> Result<(), FontBuildError> {
    if !src.is_file() {
        return Err(FontBuildError::InputNotFound(src.to_path_buf()));
    }
    let img = image::open(src)
        .map_err(|source| FontBuildError::DecodeFailure {
            path: src.to_path_buf(),
            source,
        })?
        .to_luma8();
    let (w, h) = img.dimensions();
    let bilevel: Vec<u8> = img
        .as_raw()
        .iter()
        .map(|&v| if v > 127 { 255 } else { 0 })
        .collect();

    let file = File::create(pgm_out).map_err(|e| FontBuildError::io(pgm_out, e))?;
    PnmEncoder::new(BufWriter::new(file))
        .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
        .write_image(&bilevel, w, h, ExtendedColorType::L8)
        .map_err(|e| FontBuildError::io(pgm_out, std::io::Error::other(e)))
}

/// [`Tracer`] running the `potrace` binary with a bounded timeout.
#[derive(Clone, Debug)]
pub struct PotraceTracer {
    program: PathBuf,
    timeout: Duration,
}

impl PotraceTracer {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Find `potrace` on `PATH`.
    pub fn locate(timeout: Duration) -> Result<Self, FontBuildError> {
        find_executable(&["potrace"])
            .map(|p| Self::new(p, timeout))
            .ok_or_else(|| FontBuildError::ExternalToolFailure {
                tool: "potrace".to_string(),
                reason: "potrace binary not found on PATH".to_string(),
                stdout: String::new(),
                stderr: String::new(),
            })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Tracer for PotraceTracer {
    fn trace(&self, bilevel: &Path, svg_out: &Path) -> Result<(), FontBuildError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(bilevel).arg("--svg").arg("-o").arg(svg_out);
        run_tool("potrace", cmd, Some(self.timeout))?;
        Ok(())
    }
}
