use std::path::Path;

use anyhow::{Context, Result};

/// RGBA8 pixels decoded from an image file, rows bottom-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// `width × height × 4` bytes.
    pub pixels: Vec<u8>,
}

/// Decodes image files into 4-channel pixel buffers.
///
/// The returned buffer is owned by the caller and released when dropped.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage>;
}

/// [`ImageDecoder`] backed by the `image` crate.
///
/// Any format the crate was built with is accepted. Rows are flipped so the
/// first row in memory is the bottom of the picture, matching GL texture
/// coordinates.
#[derive(Debug, Clone, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let mut rgba = image::open(path)
            .with_context(|| format!("failed to read image {}", path.display()))?
            .to_rgba8();
        image::imageops::flip_vertical_in_place(&mut rgba);

        Ok(DecodedImage {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_bottom_row_first() {
        let path = std::env::temp_dir().join(format!("ziggurat-decode-{}.png", std::process::id()));
        let mut img = image::RgbaImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        img.save(&path).unwrap();

        let decoded = ImageCrateDecoder.decode(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!((decoded.width, decoded.height), (1, 2));
        assert_eq!(decoded.pixels, [0, 0, 255, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ImageCrateDecoder
            .decode(Path::new("/definitely/not/here.png"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to read image"));
    }
}
