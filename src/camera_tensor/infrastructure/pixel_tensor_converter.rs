//! Image to tensor conversion.
//!
//! Steps run in a fixed order: resize to the target size, flip rows, read
//! the three stored channels, optionally exchange channel 0 and channel 2,
//! normalize with `(value - mean) * scale`, then narrow to the destination
//! element type. The destination is always caller-owned.

use std::borrow::Cow;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::domain::conversion::{
    byte_len, element_count, ConversionParameters, ElementType, ResizeFilter, TensorBuffer,
};
use crate::domain::error::DomainError;
use crate::domain::image::Image;

/// Converts `image` into `dest`, whose length must equal
/// `out_width * out_height * 3`. On error `dest` is left untouched.
pub fn convert(
    image: &Image,
    dest: TensorBuffer<'_>,
    params: &ConversionParameters,
) -> Result<(), DomainError> {
    let (width, height) = params.output_dimensions(image.width(), image.height());
    let expected = element_count(width, height)?;
    if dest.len() != expected {
        return Err(DomainError::BufferSizeMismatch {
            expected,
            actual: dest.len(),
        });
    }

    let source = resized(image, width, height, params.resize_filter)?;
    log::trace!(
        target: "converter",
        "{}x{} -> {}x{} {}",
        image.width(),
        image.height(),
        width,
        height,
        dest.element_type().name()
    );

    match dest {
        TensorBuffer::Float32(buf) => walk(&source, params, |i, v| buf[i] = v),
        TensorBuffer::UInt8(buf) => {
            let cast = params.integer_cast;
            walk(&source, params, |i, v| buf[i] = cast.apply(v));
        }
    }
    Ok(())
}

/// Writes the tensor as native-endian bytes at the start of `dest`.
///
/// `dest` may be larger than needed; bytes past the tensor are not touched.
/// Returns the number of bytes written.
pub fn convert_into_bytes(
    image: &Image,
    dest: &mut [u8],
    element_type: ElementType,
    params: &ConversionParameters,
) -> Result<usize, DomainError> {
    let (width, height) = params.output_dimensions(image.width(), image.height());
    let needed = byte_len(width, height, element_type)?;
    if dest.len() < needed {
        return Err(DomainError::BufferSizeMismatch {
            expected: needed,
            actual: dest.len(),
        });
    }

    match element_type {
        ElementType::UInt8 => convert(image, TensorBuffer::UInt8(&mut dest[..needed]), params)?,
        ElementType::Float32 => {
            let source = resized(image, width, height, params.resize_filter)?;
            walk(&source, params, |i, v| {
                let at = i * 4;
                dest[at..at + 4].copy_from_slice(&v.to_ne_bytes());
            });
        }
    }
    Ok(needed)
}

fn filter_type(filter: ResizeFilter) -> FilterType {
    match filter {
        ResizeFilter::Nearest => FilterType::Nearest,
        ResizeFilter::Triangle => FilterType::Triangle,
        ResizeFilter::CatmullRom => FilterType::CatmullRom,
        ResizeFilter::Gaussian => FilterType::Gaussian,
        ResizeFilter::Lanczos3 => FilterType::Lanczos3,
    }
}

/// Resamples only when the size changes. The resized copy keeps the
/// source channel order; the `Rgb` pixel type is just a 3-channel container.
fn resized(
    image: &Image,
    width: u32,
    height: u32,
    filter: ResizeFilter,
) -> Result<Cow<'_, Image>, DomainError> {
    if (width, height) == (image.width(), image.height()) {
        return Ok(Cow::Borrowed(image));
    }
    let buffer = RgbImage::from_raw(image.width(), image.height(), image.to_packed())
        .ok_or_else(|| DomainError::InvalidImage("pixel buffer does not match dimensions".to_string()))?;
    let scaled = imageops::resize(&buffer, width, height, filter_type(filter));
    Image::packed(width, height, image.order(), scaled.into_raw()).map(Cow::Owned)
}

fn walk(source: &Image, params: &ConversionParameters, mut emit: impl FnMut(usize, f32)) {
    let (first, last) = if params.swap_red_blue { (2, 0) } else { (0, 2) };
    let height = source.height();
    let mut idx = 0;
    for out_y in 0..height {
        let src_y = if params.flip_vertical { height - 1 - out_y } else { out_y };
        for px in source.row(src_y).chunks_exact(3) {
            emit(idx, params.normalize(px[first]));
            emit(idx + 1, params.normalize(px[1]));
            emit(idx + 2, params.normalize(px[last]));
            idx += 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversion::IntegerCast;
    use crate::domain::image::ChannelOrder;
    use proptest::prelude::*;

    fn uniform(width: u32, height: u32, px: [u8; 3]) -> Image {
        let data = px.repeat((width * height) as usize);
        Image::packed(width, height, ChannelOrder::Bgr, data).unwrap()
    }

    fn to_f32(image: &Image, params: &ConversionParameters) -> Vec<f32> {
        let (w, h) = params.output_dimensions(image.width(), image.height());
        let mut out = vec![0.0f32; element_count(w, h).unwrap()];
        convert(image, TensorBuffer::Float32(&mut out), params).unwrap();
        out
    }

    fn image_strategy() -> impl Strategy<Value = Image> {
        (1u32..6, 1u32..6)
            .prop_flat_map(|(w, h)| {
                (Just(w), Just(h), prop::collection::vec(any::<u8>(), (w * h * 3) as usize))
            })
            .prop_map(|(w, h, data)| Image::packed(w, h, ChannelOrder::Bgr, data).unwrap())
    }

    #[test]
    fn test_swap_scenario() {
        let image = uniform(2, 2, [10, 20, 30]);
        let params = ConversionParameters {
            swap_red_blue: true,
            ..Default::default()
        };
        assert_eq!(to_f32(&image, &params), [30.0f32, 20.0, 10.0].repeat(4));
    }

    #[test]
    fn test_normalization_scenario() {
        let image = uniform(2, 2, [10, 20, 30]);
        let params = ConversionParameters {
            mean: 10.0,
            scale: 2.0,
            ..Default::default()
        };
        assert_eq!(to_f32(&image, &params), [0.0f32, 20.0, 40.0].repeat(4));
    }

    #[test]
    fn test_uint8_output_and_cast_modes() {
        let image = uniform(1, 1, [200, 10, 100]);
        let mut params = ConversionParameters {
            scale: 2.0,
            ..Default::default()
        };

        let mut out = [0u8; 3];
        convert(&image, TensorBuffer::UInt8(&mut out), &params).unwrap();
        assert_eq!(out, [255, 20, 200]);

        params.integer_cast = IntegerCast::Wrap;
        convert(&image, TensorBuffer::UInt8(&mut out), &params).unwrap();
        assert_eq!(out, [144, 20, 200]);
    }

    #[test]
    fn test_padded_rows_are_skipped() {
        let data = vec![1, 2, 3, 9, 9, 4, 5, 6];
        let image = Image::new(1, 2, 5, ChannelOrder::Bgr, data).unwrap();
        let out = to_f32(&image, &ConversionParameters::default());
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_buffer_size_mismatch_leaves_destination_untouched() {
        let image = uniform(2, 2, [10, 20, 30]);
        let mut out = vec![7.0f32; 11];
        let result = convert(&image, TensorBuffer::Float32(&mut out), &ConversionParameters::default());
        assert_eq!(
            result,
            Err(DomainError::BufferSizeMismatch { expected: 12, actual: 11 })
        );
        assert!(out.iter().all(|v| *v == 7.0));

        let mut too_long = vec![7u8; 13];
        assert!(convert(&image, TensorBuffer::UInt8(&mut too_long), &ConversionParameters::default()).is_err());
        assert!(too_long.iter().all(|v| *v == 7));
    }

    #[test]
    fn test_resize_to_target_dimensions() {
        let image = uniform(2, 2, [10, 20, 30]);
        let params = ConversionParameters {
            target_width: 3,
            target_height: 5,
            resize_filter: ResizeFilter::Nearest,
            ..Default::default()
        };
        let out = to_f32(&image, &params);
        assert_eq!(out, [10.0f32, 20.0, 30.0].repeat(15));
    }

    #[test]
    fn test_convert_into_bytes_float32() {
        let image = uniform(1, 1, [1, 2, 3]);
        let mut region = vec![0xAAu8; 16];
        let written =
            convert_into_bytes(&image, &mut region, ElementType::Float32, &ConversionParameters::default())
                .unwrap();
        assert_eq!(written, 12);
        let values: Vec<f32> = region[..12]
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert_eq!(&region[12..], &[0xAA; 4]);
    }

    #[test]
    fn test_oversized_target_is_rejected_without_writing() {
        let image = uniform(1, 1, [1, 2, 3]);
        let params = ConversionParameters {
            target_width: i32::MAX,
            target_height: i32::MAX,
            ..Default::default()
        };
        let mut region = vec![0u8; 16];
        let result = convert_into_bytes(&image, &mut region, ElementType::Float32, &params);
        assert!(result.is_err());
        assert!(region.iter().all(|v| *v == 0));
    }

    #[test]
    fn test_convert_into_bytes_too_small() {
        let image = uniform(2, 1, [1, 2, 3]);
        let mut region = vec![0u8; 23];
        let result =
            convert_into_bytes(&image, &mut region, ElementType::Float32, &ConversionParameters::default());
        assert_eq!(
            result,
            Err(DomainError::BufferSizeMismatch { expected: 24, actual: 23 })
        );
        assert!(region.iter().all(|v| *v == 0));
    }

    proptest! {
        #[test]
        fn prop_identity_parameters_copy_bytes(image in image_strategy()) {
            let out = to_f32(&image, &ConversionParameters::default());
            let expected: Vec<f32> = image.to_packed().into_iter().map(f32::from).collect();
            prop_assert_eq!(out, expected);
        }

        #[test]
        fn prop_swap_exchanges_outer_channels(image in image_strategy()) {
            let plain = to_f32(&image, &ConversionParameters::default());
            let swapped = to_f32(&image, &ConversionParameters { swap_red_blue: true, ..Default::default() });
            for (p, s) in plain.chunks_exact(3).zip(swapped.chunks_exact(3)) {
                prop_assert_eq!(p[0], s[2]);
                prop_assert_eq!(p[1], s[1]);
                prop_assert_eq!(p[2], s[0]);
            }
        }

        #[test]
        fn prop_flip_reverses_rows(image in image_strategy()) {
            let row_len = image.width() as usize * 3;
            let height = image.height() as usize;
            let plain = to_f32(&image, &ConversionParameters::default());
            let flipped = to_f32(&image, &ConversionParameters { flip_vertical: true, ..Default::default() });
            for i in 0..height {
                let j = height - 1 - i;
                prop_assert_eq!(&flipped[i * row_len..(i + 1) * row_len], &plain[j * row_len..(j + 1) * row_len]);
            }
        }

        #[test]
        fn prop_same_size_resize_is_identity(image in image_strategy()) {
            let plain = to_f32(&image, &ConversionParameters::default());
            let params = ConversionParameters {
                target_width: image.width() as i32,
                target_height: image.height() as i32,
                resize_filter: ResizeFilter::Lanczos3,
                ..Default::default()
            };
            prop_assert_eq!(to_f32(&image, &params), plain);
        }

        #[test]
        fn prop_normalization_is_affine(image in image_strategy(), mean in -255.0f32..255.0, scale in -4.0f32..4.0) {
            let params = ConversionParameters { mean, scale, ..Default::default() };
            let out = to_f32(&image, &params);
            for (v, o) in image.to_packed().into_iter().zip(out) {
                prop_assert_eq!(o, (f32::from(v) - mean) * scale);
            }

            let (w, h) = (image.width(), image.height());
            let mut bytes = vec![0u8; element_count(w, h).unwrap()];
            convert(&image, TensorBuffer::UInt8(&mut bytes), &params).unwrap();
            for (v, o) in image.to_packed().into_iter().zip(bytes) {
                prop_assert_eq!(o, IntegerCast::Saturate.apply((f32::from(v) - mean) * scale));
            }
        }

        #[test]
        fn prop_wrap_keeps_low_byte_of_truncation(image in image_strategy(), mean in -255.0f32..255.0, scale in -4.0f32..4.0) {
            let params = ConversionParameters { mean, scale, integer_cast: IntegerCast::Wrap, ..Default::default() };
            let mut bytes = vec![0u8; element_count(image.width(), image.height()).unwrap()];
            convert(&image, TensorBuffer::UInt8(&mut bytes), &params).unwrap();
            for (v, o) in image.to_packed().into_iter().zip(bytes) {
                let truncated = ((f32::from(v) - mean) * scale).trunc() as i64;
                prop_assert_eq!(o, truncated.rem_euclid(256) as u8);
            }
        }
    }
}
