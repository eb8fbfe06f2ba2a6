use handfont_core::TemplateError;
use handfont_font::FontBuildError;
use handfont_print::PrintError;
use handfont_segment::SegmentError;

use crate::io::IoError;

/// Errors produced by the facade helpers and the CLI.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Font(#[from] FontBuildError),

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error(transparent)]
    Config(#[from] IoError),

    #[error("{count} alphabet letter(s) have no glyph: {missing}")]
    MissingGlyphs { missing: String, count: usize },
}
