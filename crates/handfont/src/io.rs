//! JSON configuration files for the handfont binary.

use std::fs;
use std::path::{Path, PathBuf};

use handfont_font::{
    AssemblerConfig, ColorMode, FontBuildError, GlyphSource, PaletteConfig, PaletteRequest,
    SourceKind,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::BuildRequest;

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load any serde type from a JSON file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, IoError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write any serde type to disk as pretty JSON.
pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), IoError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn default_family() -> String {
    "Handfont".to_string()
}

/// A font build described in JSON.
///
/// Sources come from `glyph_dir` (scanned for `<letter>.<ext>` and
/// `<letter>_*.<ext>` files) followed by the explicit `sources`; the first
/// source of a letter wins. Relative paths are taken as given, i.e. relative
/// to the working directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub glyph_dir: Option<PathBuf>,
    #[serde(default)]
    pub sources: Vec<GlyphSource>,
    pub alphabet: String,
    #[serde(default = "default_family")]
    pub family: String,
    #[serde(default)]
    pub mode: ColorMode,
    /// Kind of source to build from; color builds default to vector.
    #[serde(default)]
    pub source_kind: Option<SourceKind>,
    #[serde(default)]
    pub palette: Option<PaletteRequest>,
    #[serde(default)]
    pub palette_defaults: PaletteConfig,
    #[serde(default)]
    pub assembler: AssemblerConfig,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// FontForge executable; searched on `PATH` when absent.
    #[serde(default)]
    pub fontforge: Option<PathBuf>,
    /// potrace executable; searched on `PATH` when absent.
    #[serde(default)]
    pub potrace: Option<PathBuf>,
}

impl BuildConfig {
    pub fn new(alphabet: impl Into<String>) -> Self {
        Self {
            glyph_dir: None,
            sources: Vec::new(),
            alphabet: alphabet.into(),
            family: default_family(),
            mode: ColorMode::Monochrome,
            source_kind: None,
            palette: None,
            palette_defaults: PaletteConfig::default(),
            assembler: AssemblerConfig::default(),
            output_path: None,
            fontforge: None,
            potrace: None,
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        load_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        write_json(self, path)
    }

    /// Resolve the output font path (`<Family>.ttf` by default).
    pub fn output_path(&self) -> PathBuf {
        self.output_path.clone().unwrap_or_else(|| {
            let stem: String = self.family.split_whitespace().collect();
            PathBuf::from(format!("{stem}.ttf"))
        })
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind.unwrap_or(match self.mode {
            ColorMode::Monochrome => SourceKind::Raster,
            ColorMode::Color => SourceKind::Vector,
        })
    }

    /// Gather sources and settle defaults into a [`BuildRequest`].
    pub fn to_request(&self) -> Result<BuildRequest, FontBuildError> {
        let mut sources = match &self.glyph_dir {
            Some(dir) => GlyphSource::scan_dir(dir)?,
            None => Vec::new(),
        };
        sources.extend(self.sources.iter().cloned());
        Ok(BuildRequest {
            sources,
            alphabet: self.alphabet.clone(),
            family: self.family.clone(),
            mode: self.mode,
            source_kind: self.source_kind(),
            palette: self.palette.clone(),
            palette_defaults: self.palette_defaults.clone(),
            assembler: self.assembler.clone(),
            output: self.output_path(),
        })
    }
}
