pub mod annotation;
pub mod color;
pub mod conversion;
pub mod error;
pub mod frame_processor_trait;
pub mod image;
pub mod jpeg_data;
