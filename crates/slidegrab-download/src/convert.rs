//! Slide image conversion and storage.

use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions a slide may have been stored under
const SLIDE_EXTENSIONS: [&str; 3] = ["jpg", "png", "webp"];

/// Decode `bytes` and re-encode as JPEG, flattening transparency onto white.
pub fn convert_to_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = flatten_onto_white(&decoded);

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(out)
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| -> u8 {
            let value = (u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255;
            u8::try_from(value).unwrap_or(u8::MAX)
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Extension for raw bytes that could not be decoded.
pub fn raw_extension(content_type: Option<&str>) -> &'static str {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.contains("webp") {
        "webp"
    } else if content_type.contains("png") {
        "png"
    } else {
        "jpg"
    }
}

/// The slide already on disk for `target`, under any stored extension.
pub fn existing_slide(target: &Path) -> Option<PathBuf> {
    SLIDE_EXTENSIONS
        .iter()
        .map(|ext| target.with_extension(ext))
        .find(|path| path.is_file())
}

/// Store a downloaded slide at `target` as JPEG; when the bytes cannot be
/// decoded they are written unchanged with an extension from
/// `content_type`. Returns the path written.
pub fn save_slide(bytes: &[u8], content_type: Option<&str>, target: &Path, quality: u8) -> Result<PathBuf> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    match convert_to_jpeg(bytes, quality) {
        Ok(jpeg) => {
            let path = target.with_extension("jpg");
            fs::write(&path, jpeg)?;
            debug!("Saved {}", path.display());
            Ok(path)
        }
        Err(e) => {
            warn!("Image conversion failed, keeping original bytes: {}", e);
            let path = target.with_extension(raw_extension(content_type));
            fs::write(&path, bytes)?;
            Ok(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_with_alpha() -> Vec<u8> {
        let image = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([200, 10, 10, 255])
            }
        });
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_transparency_becomes_white() {
        let jpeg = convert_to_jpeg(&png_with_alpha(), 95).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();

        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let transparent = decoded.get_pixel(0, 0).0;
        assert!(transparent.iter().all(|c| *c > 240), "got {transparent:?}");
        let opaque = decoded.get_pixel(3, 3).0;
        assert!(opaque[0] > 150 && opaque[1] < 80, "got {opaque:?}");
    }

    #[test]
    fn test_raw_extension() {
        assert_eq!(raw_extension(Some("image/webp")), "webp");
        assert_eq!(raw_extension(Some("IMAGE/PNG")), "png");
        assert_eq!(raw_extension(Some("application/octet-stream")), "jpg");
        assert_eq!(raw_extension(None), "jpg");
    }

    #[test]
    fn test_save_slide_converts() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("deck").join("Deck_001.jpg");

        let saved = save_slide(&png_with_alpha(), Some("image/png"), &target, 90).unwrap();

        assert_eq!(saved, target);
        assert_eq!(existing_slide(&target), Some(target.clone()));
    }

    #[test]
    fn test_save_slide_keeps_undecodable_bytes() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("Deck_002.jpg");

        let saved = save_slide(b"not an image", Some("image/webp"), &target, 90).unwrap();

        assert_eq!(saved, dir.path().join("Deck_002.webp"));
        assert_eq!(fs::read(&saved).unwrap(), b"not an image");
        assert_eq!(existing_slide(&target), Some(saved));
    }

    #[test]
    fn test_no_existing_slide() {
        let dir = TempDir::new().unwrap();
        assert_eq!(existing_slide(&dir.path().join("Deck_003.jpg")), None);
    }
}
