use base64::{Engine as _, engine::general_purpose::STANDARD};
use egui::ColorImage;
use image::ImageFormat;
use std::path::Path;

use crate::errors::AppError;

/// Read an image file into a `data:` URL suitable for storing in a text column.
///
/// The file is not validated as an image; unknown content is tagged
/// `application/octet-stream`.
pub fn encode_file(path: &Path) -> Result<String, AppError> {
    let bytes = std::fs::read(path).map_err(|source| AppError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Read {} bytes of image data from {}", bytes.len(), path.display());
    Ok(encode_bytes(&bytes))
}

pub fn encode_bytes(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type(bytes), STANDARD.encode(bytes))
}

fn mime_type(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        Ok(ImageFormat::Ico) => "image/x-icon",
        Ok(ImageFormat::Avif) => "image/avif",
        _ => "application/octet-stream",
    }
}

/// Extract the raw bytes from a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let rest = url.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    STANDARD.decode(payload).ok()
}

/// Decode a stored image into pixels, shrinking it to fit `max_side`.
///
/// Returns `None` when the payload is not a decodable image; the caller shows
/// a placeholder instead.
pub fn to_color_image(url: &str, max_side: u32) -> Option<ColorImage> {
    let bytes = decode_data_url(url)?;
    let mut img = match image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(err) => {
            log::warn!("Stored image could not be decoded: {err}");
            return None;
        }
    };
    if img.width() > max_side || img.height() > max_side {
        img = img.thumbnail(max_side, max_side);
    }
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let buf = ImageBuffer::from_pixel(width, height, Rgba([200u8, 10, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(buf)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn png_is_tagged_and_round_trips() {
        let bytes = png_bytes(2, 2);
        let url = encode_bytes(&bytes);
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url).unwrap(), bytes);
    }

    #[test]
    fn unknown_bytes_are_accepted() {
        let url = encode_bytes(b"not an image");
        assert!(url.starts_with("data:application/octet-stream;base64,"));
        assert!(to_color_image(&url, 64).is_none());
    }

    #[test]
    fn large_images_are_shrunk() {
        let url = encode_bytes(&png_bytes(200, 100));
        let img = to_color_image(&url, 50).unwrap();
        assert!(img.size[0] <= 50 && img.size[1] <= 50);

        let small = to_color_image(&encode_bytes(&png_bytes(3, 4)), 50).unwrap();
        assert_eq!(small.size, [3, 4]);
    }

    #[test]
    fn missing_file_is_an_image_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = encode_file(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, AppError::ImageRead { .. }));
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(decode_data_url("http://example.com/a.png").is_none());
        assert!(decode_data_url("data:image/png,raw").is_none());
    }
}
