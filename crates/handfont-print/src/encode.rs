use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use handfont_core::GrayImage;

#[derive(thiserror::Error, Debug)]
pub enum PrintError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("png encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("image is empty or its buffer does not match {width}x{height}")]
    BadImage { width: usize, height: usize },
}

/// Encode an 8-bit gray page as PNG, recording `dpi` in the pHYs chunk.
pub fn encode_png(img: &GrayImage, dpi: u32) -> Result<Vec<u8>, PrintError> {
    let mut out = Vec::new();
    write_png_to(&mut out, img, dpi)?;
    Ok(out)
}

pub fn write_png(path: &Path, img: &GrayImage, dpi: u32) -> Result<(), PrintError> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    write_png_to(&mut w, img, dpi)?;
    w.flush()?;
    Ok(())
}

fn write_png_to<W: Write>(w: W, img: &GrayImage, dpi: u32) -> Result<(), PrintError> {
    if img.width == 0 || img.height == 0 || img.data.len() != img.width * img.height {
        return Err(PrintError::BadImage {
            width: img.width,
            height: img.height,
        });
    }

    let mut encoder = png::Encoder::new(w, img.width as u32, img.height as u32);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Eight);
    if dpi > 0 {
        let ppm = (dpi as f64 / 0.0254).round() as u32;
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
    }
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&img.data)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_png_signature() {
        let img = GrayImage::filled(8, 4, 200);
        let bytes = encode_png(&img, 300).expect("encode");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let img = GrayImage {
            width: 4,
            height: 4,
            data: vec![0; 3],
        };
        assert!(matches!(
            encode_png(&img, 300),
            Err(PrintError::BadImage { .. })
        ));
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.png");
        write_png(&path, &GrayImage::filled(3, 3, 0), 100).expect("write");
        assert!(std::fs::metadata(&path).expect("meta").len() > 8);
    }
}
