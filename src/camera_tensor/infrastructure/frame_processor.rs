use std::path::Path;

use super::annotation_renderer::{jpeg_encoding_supported, AnnotationRenderer};
use super::error::InfrastructureError;
use super::{image_decoder, pixel_tensor_converter};
use crate::domain::annotation::Annotation;
use crate::domain::conversion::{byte_len, ConversionParameters, ElementType, Tensor};
use crate::domain::frame_processor_trait::FrameProcessor;
use crate::domain::image::Image;
use crate::domain::jpeg_data::JpegData;

pub struct DefaultFrameProcessor {
    renderer: AnnotationRenderer,
}

impl DefaultFrameProcessor {
    pub fn new(renderer: AnnotationRenderer) -> Self {
        Self { renderer }
    }
}

impl FrameProcessor for DefaultFrameProcessor {
    fn decode(&self, image_bytes: &[u8]) -> Result<Image, InfrastructureError> {
        image_decoder::decode_bytes(image_bytes)
    }

    fn to_tensor(
        &self,
        image: &Image,
        params: &ConversionParameters,
        element_type: ElementType,
    ) -> Result<Tensor, InfrastructureError> {
        let (width, height) = params.output_dimensions(image.width(), image.height());
        let mut bytes = vec![0u8; byte_len(width, height, element_type)?];
        pixel_tensor_converter::convert_into_bytes(image, &mut bytes, element_type, params)?;
        Ok(Tensor {
            width,
            height,
            element_type,
            bytes,
        })
    }

    fn file_to_tensor(
        &self,
        path: &Path,
        params: &ConversionParameters,
        element_type: ElementType,
    ) -> Result<Tensor, InfrastructureError> {
        let image = image_decoder::open(path)?;
        self.to_tensor(&image, params, element_type)
    }

    fn render_annotations(
        &self,
        image: &Image,
        annotations: &[Annotation],
    ) -> Result<JpegData, InfrastructureError> {
        self.renderer.render(image, annotations)
    }

    fn pixel_to_jpeg(
        &self,
        raw_pixel: &[u8],
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<JpegData, InfrastructureError> {
        self.renderer.pixel_to_jpeg(raw_pixel, width, height, channels)
    }

    fn supports_jpeg_encoding(&self) -> bool {
        jpeg_encoding_supported()
    }
}
