use std::path::PathBuf;

/// Errors that abort segmentation of a page.
///
/// Geometric failures (no markers, rejected quad) are not errors; they show
/// up as a [`crate::WarpOutcome`] in the report.
#[derive(thiserror::Error, Debug)]
pub enum SegmentError {
    #[error("scan not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("failed to read scan {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode scan image: {0}")]
    DecodeFailure(#[from] image::ImageError),
}
