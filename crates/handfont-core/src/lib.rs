//! Core types shared by the handfont crates.
//!
//! Template geometry, 8-bit gray images, binary ink masks and projective
//! transforms. Nothing here performs I/O apart from the logger.

mod homography;
mod image;
mod logger;
mod mask;
mod template;

pub use homography::{
    homography_from_4pt, warp_perspective_gray, warp_perspective_interleaved, Homography,
};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use mask::RasterMask;
pub use template::{
    mm_to_px, FiducialSpec, GridSpec, PaperSpec, PixelRect, TemplateError, TemplateGeometry,
    TemplateSpec, DEFAULT_DPI,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level};
