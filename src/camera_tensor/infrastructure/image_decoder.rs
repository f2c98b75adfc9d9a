use std::io::Cursor;
use std::path::Path;

use image::io::Reader as ImageReader;
use image::DynamicImage;

use super::error::InfrastructureError;
use crate::domain::image::{ChannelOrder, Image};

/// Decodes an encoded PNG/JPEG/BMP stream into a BGR image.
pub fn decode_bytes(image_bytes: &[u8]) -> Result<Image, InfrastructureError> {
    let reader = ImageReader::new(Cursor::new(image_bytes))
        .with_guessed_format()
        .map_err(InfrastructureError::IoError)?;
    log::debug!(target: "decoder", "guessed format: {:?}", reader.format());
    let decoded = reader.decode().map_err(InfrastructureError::ImageLibError)?;
    from_dynamic(decoded)
}

/// Reads and decodes an image file.
pub fn open(path: &Path) -> Result<Image, InfrastructureError> {
    if !path.is_file() {
        return Err(InfrastructureError::FileNotFound(path.to_path_buf()));
    }
    let decoded = ImageReader::open(path)
        .map_err(InfrastructureError::IoError)?
        .with_guessed_format()
        .map_err(InfrastructureError::IoError)?
        .decode()
        .map_err(InfrastructureError::ImageLibError)?;
    from_dynamic(decoded)
}

/// Stores the pixels in bitmap (B,G,R) order.
pub fn from_dynamic(decoded: DynamicImage) -> Result<Image, InfrastructureError> {
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut data = rgb.into_raw();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    Ok(Image::packed(width, height, ChannelOrder::Bgr, data)?)
}
