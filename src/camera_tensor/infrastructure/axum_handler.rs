use crate::application::error::ApplicationError;
use axum::{
    body::{Body, Bytes},
    extract::{Json, Multipart, Query, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::application::camera_service::{CameraService, ConversionOverrides};
use crate::domain::annotation::Annotation;
use crate::domain::conversion::Tensor;
use crate::domain::jpeg_data::JpegData;

pub const TENSOR_SHAPE_HEADER: &str = "x-tensor-shape";
pub const TENSOR_DTYPE_HEADER: &str = "x-tensor-dtype";
pub const TENSOR_BYTE_ORDER_HEADER: &str = "x-tensor-byte-order";
pub const IMAGE_WIDTH_HEADER: &str = "x-image-width";
pub const IMAGE_HEIGHT_HEADER: &str = "x-image-height";
pub const SNAPSHOT_PATH_HEADER: &str = "x-snapshot-path";

#[derive(Clone)]
pub struct AppState {
    pub camera_service: Arc<CameraService>,
}

#[derive(Deserialize, Debug)]
pub struct FetchTensorParams {
    pub url: String,
    #[serde(default)]
    pub overrides: ConversionOverrides,
}

#[derive(Deserialize, Debug)]
pub struct AnnotateParams {
    pub url: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub save: bool,
}

/// Layout of a raw pixel upload.
#[derive(Deserialize, Debug)]
pub struct PixelParams {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_channels")]
    pub channels: u8,
}

fn default_channels() -> u8 {
    3
}

fn byte_order() -> &'static str {
    if cfg!(target_endian = "little") {
        "little"
    } else {
        "big"
    }
}

pub fn tensor_response(tensor: Tensor) -> Result<Response<Body>, ApplicationError> {
    let shape = tensor
        .shape()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",");
    Response::builder()
        .header(CONTENT_TYPE, "application/octet-stream")
        .header(TENSOR_SHAPE_HEADER, shape)
        .header(TENSOR_DTYPE_HEADER, tensor.element_type.name())
        .header(TENSOR_BYTE_ORDER_HEADER, byte_order())
        .body(Body::from(tensor.bytes))
        .map_err(|e| ApplicationError::FrameProcessingFailed(format!("Failed to build tensor response: {}", e)))
}

pub fn jpeg_response(
    jpeg: JpegData,
    saved_path: Option<String>,
) -> Result<Response<Body>, ApplicationError> {
    let mut builder = Response::builder()
        .header(CONTENT_TYPE, "image/jpeg")
        .header(IMAGE_WIDTH_HEADER, jpeg.width)
        .header(IMAGE_HEIGHT_HEADER, jpeg.height);
    if let Some(path) = saved_path {
        builder = builder.header(SNAPSHOT_PATH_HEADER, path);
    }
    builder
        .body(Body::from(jpeg.raw))
        .map_err(|e| ApplicationError::FrameProcessingFailed(format!("Failed to build jpeg response: {}", e)))
}

pub async fn upload_tensor_handler(
    State(state): State<Arc<AppState>>,
    Query(overrides): Query<ConversionOverrides>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApplicationError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApplicationError::InvalidRequest(format!("Multipart error: {}", e)))?
        .ok_or_else(|| ApplicationError::InvalidRequest("multipart body has no image field".to_string()))?;
    let data = field
        .bytes()
        .await
        .map_err(|e| ApplicationError::InvalidRequest(format!("Failed to read bytes from multipart field: {}", e)))?;

    let tensor = state
        .camera_service
        .tensor_from_bytes(data.to_vec(), overrides)
        .await?;
    tensor_response(tensor)
}

pub async fn fetch_tensor_handler(
    State(state): State<Arc<AppState>>,
    Json(params): Json<FetchTensorParams>,
) -> Result<impl IntoResponse, ApplicationError> {
    let tensor = state
        .camera_service
        .tensor_from_url(params.url, params.overrides)
        .await?;
    tensor_response(tensor)
}

pub async fn annotate_handler(
    State(state): State<Arc<AppState>>,
    Json(params): Json<AnnotateParams>,
) -> Result<impl IntoResponse, ApplicationError> {
    let (jpeg, saved) = state
        .camera_service
        .annotate_url(params.url, params.annotations, params.save)
        .await?;
    jpeg_response(jpeg, saved.map(|p| p.display().to_string()))
}

pub async fn encode_pixels_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PixelParams>,
    body: Bytes,
) -> Result<impl IntoResponse, ApplicationError> {
    let jpeg = state
        .camera_service
        .encode_pixels(body.to_vec(), params.width, params.height, params.channels)
        .await?;
    jpeg_response(jpeg, None)
}

pub async fn capabilities_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.camera_service.capabilities())
}
