use std::path::Path;

use crate::domain::annotation::Annotation;
use crate::domain::conversion::{ConversionParameters, ElementType, Tensor};
use crate::domain::image::Image;
use crate::domain::jpeg_data::JpegData;
use crate::infrastructure::error::InfrastructureError;

/// Pixel work the service delegates: decoding, tensor conversion and export.
#[cfg_attr(test, mockall::automock)]
pub trait FrameProcessor {
    fn decode(&self, image_bytes: &[u8]) -> Result<Image, InfrastructureError>;

    fn to_tensor(
        &self,
        image: &Image,
        params: &ConversionParameters,
        element_type: ElementType,
    ) -> Result<Tensor, InfrastructureError>;

    fn file_to_tensor(
        &self,
        path: &Path,
        params: &ConversionParameters,
        element_type: ElementType,
    ) -> Result<Tensor, InfrastructureError>;

    fn render_annotations(
        &self,
        image: &Image,
        annotations: &[Annotation],
    ) -> Result<JpegData, InfrastructureError>;

    /// Encodes a raw gray, R,G,B or R,G,B,A buffer.
    fn pixel_to_jpeg(
        &self,
        raw_pixel: &[u8],
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<JpegData, InfrastructureError>;

    fn supports_jpeg_encoding(&self) -> bool;
}
