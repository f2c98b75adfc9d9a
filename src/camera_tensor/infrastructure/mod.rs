pub mod annotation_renderer;
pub mod axum_handler;
pub mod camera_snapshot_fetcher;
pub mod error;
pub mod file_storage;
pub mod frame_processor;
pub mod image_decoder;
pub mod log_file;
pub mod pixel_tensor_converter;
