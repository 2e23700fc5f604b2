//! PNG encoding and thumbnails for stored photos

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use super::errors::StorageError;

/// Thumbnails fit within this box, keeping aspect ratio
pub const THUMBNAIL_SIZE: u32 = 100;

/// Convert to 8-bit RGB, or RGBA when the source has an alpha channel.
pub fn normalize_image(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    normalize_image(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, StorageError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Downscale to fit within `THUMBNAIL_SIZE`. Smaller images are not enlarged.
pub fn make_thumbnail(image: &DynamicImage) -> DynamicImage {
    if image.width() <= THUMBNAIL_SIZE && image.height() <= THUMBNAIL_SIZE {
        return image.clone();
    }
    image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
}

/// `data:image/png;base64,...` for embedding a thumbnail in the manifest
pub fn thumbnail_data_url(thumbnail: &DynamicImage) -> Result<String, StorageError> {
    let png = encode_png(thumbnail)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}
