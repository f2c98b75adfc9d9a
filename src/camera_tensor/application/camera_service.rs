use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ApplicationError;
use crate::domain::annotation::Annotation;
use crate::domain::conversion::{ConversionParameters, ElementType, Tensor};
use crate::domain::error::DomainError;
use crate::domain::frame_processor_trait::FrameProcessor;
use crate::domain::jpeg_data::JpegData;
use crate::infrastructure::camera_snapshot_fetcher::{DefaultCameraSnapshotFetcher, SnapshotLocation};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::file_storage::LocalFileStorage;

/// Per-request changes to the configured conversion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConversionOverrides {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub mean: Option<f32>,
    pub scale: Option<f32>,
    pub flip_vertical: Option<bool>,
    pub swap_red_blue: Option<bool>,
    pub element_type: Option<String>,
}

pub const DEFAULT_MAX_INPUT_DIMENSION: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capabilities {
    pub jpeg_encoding: bool,
    pub element_types: Vec<&'static str>,
}

pub struct CameraService {
    frame_processor: Arc<dyn FrameProcessor + Send + Sync>,
    snapshot_fetcher: DefaultCameraSnapshotFetcher,
    file_storage: LocalFileStorage,
    defaults: ConversionParameters,
    default_element_type: ElementType,
    max_input_dimension: u32,
}

impl CameraService {
    pub fn new(
        frame_processor: Arc<dyn FrameProcessor + Send + Sync>,
        snapshot_fetcher: DefaultCameraSnapshotFetcher,
        file_storage: LocalFileStorage,
        defaults: ConversionParameters,
        default_element_type: ElementType,
    ) -> Self {
        Self {
            frame_processor,
            snapshot_fetcher,
            file_storage,
            defaults,
            default_element_type,
            max_input_dimension: DEFAULT_MAX_INPUT_DIMENSION,
        }
    }

    /// Largest `width`/`height` a request may ask for.
    pub fn with_max_input_dimension(mut self, max_input_dimension: u32) -> Self {
        self.max_input_dimension = max_input_dimension;
        self
    }

    fn bounded(&self, name: &str, value: i32) -> Result<i32, DomainError> {
        if value > 0 && value as u32 > self.max_input_dimension {
            return Err(DomainError::InvalidParameters(format!(
                "{} {} exceeds the limit of {}",
                name, value, self.max_input_dimension
            )));
        }
        Ok(value)
    }

    fn resolve(
        &self,
        overrides: &ConversionOverrides,
    ) -> Result<(ConversionParameters, ElementType), ApplicationError> {
        let mut params = self.defaults.clone();
        if let Some(width) = overrides.width {
            params.target_width = self.bounded("width", width)?;
        }
        if let Some(height) = overrides.height {
            params.target_height = self.bounded("height", height)?;
        }
        if let Some(mean) = overrides.mean {
            params.mean = mean;
        }
        if let Some(scale) = overrides.scale {
            params.scale = scale;
        }
        if let Some(flip) = overrides.flip_vertical {
            params.flip_vertical = flip;
        }
        if let Some(swap) = overrides.swap_red_blue {
            params.swap_red_blue = swap;
        }
        let element_type = match &overrides.element_type {
            Some(name) => name.parse()?,
            None => self.default_element_type,
        };
        Ok((params, element_type))
    }

    pub async fn tensor_from_bytes(
        &self,
        image_data: Vec<u8>,
        overrides: ConversionOverrides,
    ) -> Result<Tensor, ApplicationError> {
        let (params, element_type) = self.resolve(&overrides)?;
        let processor = Arc::clone(&self.frame_processor);
        let tensor = run_blocking(move || {
            let image = processor.decode(&image_data)?;
            processor.to_tensor(&image, &params, element_type)
        })
        .await?;
        log::info!(
            target: "service",
            "converted frame to {:?} {}",
            tensor.shape(),
            tensor.element_type.name()
        );
        Ok(tensor)
    }

    pub async fn tensor_from_url(
        &self,
        url: String,
        overrides: ConversionOverrides,
    ) -> Result<Tensor, ApplicationError> {
        if let SnapshotLocation::File(path) = SnapshotLocation::classify(&url)? {
            let (params, element_type) = self.resolve(&overrides)?;
            let path = self.snapshot_fetcher.resolve_file(&path).await?;
            let processor = Arc::clone(&self.frame_processor);
            return run_blocking(move || processor.file_to_tensor(&path, &params, element_type)).await;
        }
        let image_data = self.snapshot_fetcher.fetch_snapshot(&url).await?;
        self.tensor_from_bytes(image_data, overrides).await
    }

    fn ensure_jpeg_export(&self) -> Result<(), ApplicationError> {
        if self.frame_processor.supports_jpeg_encoding() {
            Ok(())
        } else {
            Err(InfrastructureError::NotSupported("JPEG export is not available in this build".to_string()).into())
        }
    }

    pub async fn annotate_bytes(
        &self,
        image_data: Vec<u8>,
        annotations: Vec<Annotation>,
    ) -> Result<JpegData, ApplicationError> {
        self.ensure_jpeg_export()?;
        let processor = Arc::clone(&self.frame_processor);
        run_blocking(move || {
            let image = processor.decode(&image_data)?;
            processor.render_annotations(&image, &annotations)
        })
        .await
    }

    /// Annotates the frame at `url`, optionally keeping a copy in the capture directory.
    pub async fn annotate_url(
        &self,
        url: String,
        annotations: Vec<Annotation>,
        save: bool,
    ) -> Result<(JpegData, Option<PathBuf>), ApplicationError> {
        let image_data = self.snapshot_fetcher.fetch_snapshot(&url).await?;
        let jpeg = self.annotate_bytes(image_data, annotations).await?;
        let saved = if save {
            Some(self.file_storage.save_snapshot(&jpeg.raw).await?)
        } else {
            None
        };
        Ok((jpeg, saved))
    }

    /// Encodes an undecoded gray / R,G,B / R,G,B,A pixel buffer as JPEG.
    pub async fn encode_pixels(
        &self,
        raw_pixel: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<JpegData, ApplicationError> {
        self.ensure_jpeg_export()?;
        let processor = Arc::clone(&self.frame_processor);
        run_blocking(move || processor.pixel_to_jpeg(&raw_pixel, width, height, channels)).await
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            jpeg_encoding: self.frame_processor.supports_jpeg_encoding(),
            element_types: vec![ElementType::Float32.name(), ElementType::UInt8.name()],
        }
    }
}

/// Runs CPU-bound pixel work on the blocking pool.
async fn run_blocking<T, F>(task: F) -> Result<T, ApplicationError>
where
    F: FnOnce() -> Result<T, InfrastructureError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApplicationError::FrameProcessingFailed(format!("worker task failed: {}", e)))?
        .map_err(ApplicationError::from)
}
