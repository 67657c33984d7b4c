//! Avatar image handling: upload constraints and normalization.
//!
//! Uploads are capped at 1MB and must arrive with a jpg/jpeg/png filename.
//! Whatever comes in is decoded, resized to a fixed 250x250, and re-encoded
//! as PNG before it is stored, so the fetch endpoint can always answer with
//! `image/png`.

use crate::error::AppError;
use image::{imageops::FilterType, ImageFormat};
use lazy_static::lazy_static;
use std::io::Cursor;

/// Maximum accepted upload size, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 1_000_000;

/// Stored avatars are square, this many pixels per side.
pub const AVATAR_SIZE: u32 = 250;

lazy_static! {
    static ref ALLOWED_EXTENSION: regex::Regex =
        regex::Regex::new(r"(?i)\.(jpe?g|png)$").unwrap();
}

/// Checks the uploaded filename against the jpg/jpeg/png allow-list.
pub fn has_allowed_extension(filename: &str) -> bool {
    ALLOWED_EXTENSION.is_match(filename)
}

/// Decodes an uploaded image, resizes it to [`AVATAR_SIZE`] square, and
/// re-encodes it as PNG.
///
/// Fails with a 400 if the bytes are not a decodable image; the resize and
/// encode are CPU-bound and run synchronously in the handler.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|_| AppError::BadRequest("Please provide a jpg, jpeg or png file".into()))?;

    let resized = decoded.resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AppError::InternalServerError(format!("Failed to encode avatar: {}", e)))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_extension_allow_list() {
        assert!(has_allowed_extension("me.png"));
        assert!(has_allowed_extension("me.jpg"));
        assert!(has_allowed_extension("holiday.photo.JPEG"));
        assert!(!has_allowed_extension("me.gif"));
        assert!(!has_allowed_extension("me.png.exe"));
        assert!(!has_allowed_extension("png"));
    }

    #[test]
    fn test_normalize_resizes_to_fixed_square() {
        let bytes = sample_png(10, 40);
        let normalized = normalize(&bytes).unwrap();

        let result = image::load_from_memory(&normalized).unwrap();
        assert_eq!(result.dimensions(), (AVATAR_SIZE, AVATAR_SIZE));
    }

    #[test]
    fn test_normalize_outputs_png() {
        let bytes = sample_png(300, 300);
        let normalized = normalize(&bytes).unwrap();

        // PNG magic number.
        assert_eq!(&normalized[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_normalize_rejects_non_image_bytes() {
        match normalize(b"definitely not an image") {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Please provide a jpg, jpeg or png file")
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }
}
