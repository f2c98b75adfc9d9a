use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};

use super::error::InfrastructureError;
use crate::domain::annotation::{Annotation, PixelRect};
use crate::domain::color::Color;
use crate::domain::error::DomainError;
use crate::domain::image::Image;
use crate::domain::jpeg_data::JpegData;

pub const STROKE_WIDTH: i32 = 3;
pub const LABEL_FONT_SIZE: f32 = 20.0;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Whether this build can produce JPEG streams.
pub fn jpeg_encoding_supported() -> bool {
    cfg!(feature = "jpeg-export")
}

fn ensure_encoder() -> Result<(), InfrastructureError> {
    if jpeg_encoding_supported() {
        Ok(())
    } else {
        Err(InfrastructureError::NotSupported(
            "JPEG encoding is not compiled into this build".to_string(),
        ))
    }
}

/// Draws detection rectangles and labels onto a frame and exports it as JPEG.
pub struct AnnotationRenderer {
    font: Option<Font<'static>>,
    color: Rgb<u8>,
    jpeg_quality: u8,
    max_dimension: Option<u32>,
}

impl AnnotationRenderer {
    pub fn new(color: Color) -> Self {
        Self {
            font: None,
            color: Rgb([color.r, color.g, color.b]),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_dimension: None,
        }
    }

    pub fn set_font_bytes(&mut self, font_data: Vec<u8>) -> Result<(), InfrastructureError> {
        let font = Font::try_from_vec(font_data).ok_or_else(|| {
            InfrastructureError::ImageProcessingError("Failed to load font".to_string())
        })?;
        self.font = Some(font);
        Ok(())
    }

    pub fn load_font_file(&mut self, path: &Path) -> Result<(), InfrastructureError> {
        if !path.is_file() {
            return Err(InfrastructureError::FileNotFound(path.to_path_buf()));
        }
        let font_data = std::fs::read(path)?;
        self.set_font_bytes(font_data)
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Frames larger than `max_dimension` on either side are downscaled
    /// before drawing.
    pub fn with_max_dimension(mut self, max_dimension: Option<u32>) -> Self {
        self.max_dimension = max_dimension.filter(|m| *m > 0);
        self
    }

    pub fn render(
        &self,
        image: &Image,
        annotations: &[Annotation],
    ) -> Result<JpegData, InfrastructureError> {
        ensure_encoder()?;

        let canvas = RgbImage::from_raw(image.width(), image.height(), image.to_rgb_packed())
            .ok_or_else(|| {
                InfrastructureError::ImageProcessingError("pixel buffer does not match dimensions".to_string())
            })?;
        let mut canvas = self.fit(canvas);
        self.draw_annotations(&mut canvas, annotations);

        let (width, height) = canvas.dimensions();
        let raw = encode_jpeg(canvas.as_raw(), width, height, ColorType::Rgb8, self.jpeg_quality)?;
        log::debug!(
            target: "renderer",
            "exported {}x{} frame with {} annotations ({} bytes)",
            width,
            height,
            annotations.len(),
            raw.len()
        );
        Ok(JpegData::new(raw, width, height))
    }

    /// Encodes a raw R,G,B (or gray, or R,G,B,A) pixel buffer.
    pub fn pixel_to_jpeg(
        &self,
        raw_pixel: &[u8],
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<JpegData, InfrastructureError> {
        ensure_encoder()?;
        if width == 0 || height == 0 {
            return Err(DomainError::InvalidImage(format!("dimensions must be positive, got {}x{}", width, height)).into());
        }
        let needed = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(channels as usize))
            .ok_or_else(|| DomainError::InvalidImage(format!("{}x{} frame is too large", width, height)))?;
        if raw_pixel.len() < needed {
            return Err(DomainError::InvalidImage(format!(
                "raw buffer holds {} bytes, expected {}",
                raw_pixel.len(),
                needed
            ))
            .into());
        }
        let raw_pixel = &raw_pixel[..needed];

        let raw = match channels {
            1 => encode_jpeg(raw_pixel, width, height, ColorType::L8, self.jpeg_quality)?,
            3 => encode_jpeg(raw_pixel, width, height, ColorType::Rgb8, self.jpeg_quality)?,
            4 => {
                let rgb: Vec<u8> = raw_pixel
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect();
                encode_jpeg(&rgb, width, height, ColorType::Rgb8, self.jpeg_quality)?
            }
            other => {
                return Err(DomainError::InvalidImage(format!("unsupported channel count {}", other)).into())
            }
        };
        Ok(JpegData::new(raw, width, height))
    }

    fn fit(&self, canvas: RgbImage) -> RgbImage {
        let Some(max) = self.max_dimension else {
            return canvas;
        };
        let (width, height) = canvas.dimensions();
        let longest = width.max(height);
        if longest <= max {
            return canvas;
        }
        let ratio = max as f32 / longest as f32;
        let new_width = ((width as f32 * ratio).round() as u32).max(1);
        let new_height = ((height as f32 * ratio).round() as u32).max(1);
        imageops::resize(&canvas, new_width, new_height, FilterType::Triangle)
    }

    pub(crate) fn draw_annotations(&self, canvas: &mut RgbImage, annotations: &[Annotation]) {
        for annotation in annotations {
            let Some(rect) = annotation.rect else {
                continue;
            };
            let px = rect.to_pixels(canvas.width(), canvas.height());
            self.draw_rect(canvas, &px);

            if let Some(label) = &annotation.label {
                match &self.font {
                    Some(font) => draw_text_mut(
                        canvas,
                        self.color,
                        px.left.round() as i32,
                        px.top.round() as i32,
                        Scale::uniform(LABEL_FONT_SIZE),
                        font,
                        label,
                    ),
                    None => log::warn!(target: "renderer", "no font configured, skipping label '{}'", label),
                }
            }
        }
    }

    /// The stroke is centered on the rectangle edge.
    fn draw_rect(&self, canvas: &mut RgbImage, px: &PixelRect) {
        let left = px.left.round() as i32;
        let top = px.top.round() as i32;
        let width = px.width().round() as i32;
        let height = px.height().round() as i32;

        let half = STROKE_WIDTH / 2;
        for offset in -half..STROKE_WIDTH - half {
            let w = width + 2 * offset;
            let h = height + 2 * offset;
            if w <= 0 || h <= 0 {
                continue;
            }
            let outline = Rect::at(left - offset, top - offset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, outline, self.color);
        }
    }
}

fn encode_jpeg(
    raw: &[u8],
    width: u32,
    height: u32,
    color_type: ColorType,
    quality: u8,
) -> Result<Vec<u8>, InfrastructureError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode(raw, width, height, color_type)
        .map_err(InfrastructureError::ImageLibError)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotation::NormalizedRect;
    use crate::domain::image::ChannelOrder;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn black(width: u32, height: u32) -> Image {
        Image::packed(width, height, ChannelOrder::Bgr, vec![0; (width * height * 3) as usize]).unwrap()
    }

    #[test]
    fn test_draw_annotations_outlines_rectangle() {
        let renderer = AnnotationRenderer::new(Color::RED);
        let mut canvas = RgbImage::new(100, 100);
        let annotations = vec![Annotation::new(NormalizedRect::new(0.2, 0.2, 0.8, 0.6), None)];

        renderer.draw_annotations(&mut canvas, &annotations);

        // Left edge spans x=19..=21, top edge y=19..=21.
        assert_eq!(*canvas.get_pixel(20, 40), RED);
        assert_eq!(*canvas.get_pixel(19, 40), RED);
        assert_eq!(*canvas.get_pixel(21, 40), RED);
        assert_eq!(*canvas.get_pixel(50, 20), RED);
        assert_eq!(*canvas.get_pixel(23, 40), BLACK);
        assert_eq!(*canvas.get_pixel(50, 40), BLACK);
    }

    #[test]
    fn test_draw_annotations_skips_missing_rect_and_label_without_font() {
        let renderer = AnnotationRenderer::new(Color::RED);
        let mut canvas = RgbImage::new(10, 10);
        let annotations = vec![
            Annotation { rect: None, label: Some("ignored".to_string()) },
            Annotation::new(NormalizedRect::new(0.0, 0.0, 0.0, 0.0), Some("cat".to_string())),
        ];
        renderer.draw_annotations(&mut canvas, &annotations);
        assert_eq!(*canvas.get_pixel(5, 5), BLACK);
    }

    #[test]
    fn test_load_font_file_missing() {
        let mut renderer = AnnotationRenderer::new(Color::RED);
        let result = renderer.load_font_file(Path::new("/no/font.ttf"));
        assert!(matches!(result, Err(InfrastructureError::FileNotFound(_))));
        assert!(renderer.font.is_none());
    }

    #[test]
    fn test_set_font_bytes_rejects_garbage() {
        let result = AnnotationRenderer::new(Color::RED).set_font_bytes(vec![1, 2, 3]);
        assert!(matches!(result, Err(InfrastructureError::ImageProcessingError(_))));
    }

    #[cfg(feature = "jpeg-export")]
    #[test]
    fn test_render_produces_jpeg() {
        let renderer = AnnotationRenderer::new(Color::RED);
        let annotations = vec![Annotation::new(NormalizedRect::new(0.1, 0.1, 0.9, 0.9), None)];
        let jpeg = renderer.render(&black(64, 48), &annotations).unwrap();

        assert_eq!(&jpeg.raw[..2], &[0xFF, 0xD8]);
        assert_eq!((jpeg.width, jpeg.height), (64, 48));

        let decoded = image::load_from_memory(&jpeg.raw).unwrap().to_rgb8();
        let edge = decoded.get_pixel(32, 5);
        assert!(edge[0] > 150 && edge[1] < 100, "expected a red edge, got {:?}", edge);
    }

    #[cfg(feature = "jpeg-export")]
    #[test]
    fn test_render_downscales_to_max_dimension() {
        let renderer = AnnotationRenderer::new(Color::RED).with_max_dimension(Some(100));
        let jpeg = renderer.render(&black(400, 200), &[]).unwrap();
        assert_eq!((jpeg.width, jpeg.height), (100, 50));
    }

    #[cfg(feature = "jpeg-export")]
    #[test]
    fn test_pixel_to_jpeg_channels() {
        let renderer = AnnotationRenderer::new(Color::RED).with_jpeg_quality(75);
        assert!(renderer.pixel_to_jpeg(&[128; 4 * 4], 4, 4, 1).is_ok());
        assert!(renderer.pixel_to_jpeg(&[128; 4 * 4 * 3], 4, 4, 3).is_ok());
        assert!(renderer.pixel_to_jpeg(&[128; 4 * 4 * 4], 4, 4, 4).is_ok());

        let result = renderer.pixel_to_jpeg(&[128; 4 * 4 * 2], 4, 4, 2);
        assert!(matches!(result, Err(InfrastructureError::Domain(DomainError::InvalidImage(_)))));

        let result = renderer.pixel_to_jpeg(&[128; 10], 4, 4, 3);
        assert!(matches!(result, Err(InfrastructureError::Domain(DomainError::InvalidImage(_)))));
    }

    #[cfg(not(feature = "jpeg-export"))]
    #[test]
    fn test_render_not_supported_without_encoder() {
        let renderer = AnnotationRenderer::new(Color::RED);
        let result = renderer.render(&black(4, 4), &[]);
        assert!(matches!(result, Err(InfrastructureError::NotSupported(_))));
    }
}
