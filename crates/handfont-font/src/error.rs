use std::path::PathBuf;

/// Errors that abort a font build.
///
/// A build is all-or-nothing: the first failing stage ends it and nothing is
/// written to the output path.
#[derive(thiserror::Error, Debug)]
pub enum FontBuildError {
    #[error("glyph source not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("no usable glyphs for alphabet {alphabet:?}")]
    NoUsableGlyphs { alphabet: String },
    #[error("{tool} failed: {reason}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    ExternalToolFailure {
        tool: String,
        reason: String,
        stdout: String,
        stderr: String,
    },
    #[error("font compiler produced no usable output at {}\n{log}", output.display())]
    FontCompilationFailed { output: PathBuf, log: String },
    #[error("could not decode glyph image {}: {source}", path.display())]
    DecodeFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid SVG in {}: {reason}", path.display())]
    InvalidSvg { path: PathBuf, reason: String },
    #[error("invalid font binary: {0}")]
    InvalidFont(String),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FontBuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
