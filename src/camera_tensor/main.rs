mod application;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header::HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use application::camera_service::CameraService;
use application::settings::Settings;
use domain::color::Color;
use infrastructure::annotation_renderer::AnnotationRenderer;
use infrastructure::axum_handler::{
    annotate_handler, capabilities_handler, encode_pixels_handler, fetch_tensor_handler,
    upload_tensor_handler, AppState, IMAGE_HEIGHT_HEADER, IMAGE_WIDTH_HEADER, SNAPSHOT_PATH_HEADER,
    TENSOR_BYTE_ORDER_HEADER, TENSOR_DTYPE_HEADER, TENSOR_SHAPE_HEADER,
};
use infrastructure::camera_snapshot_fetcher::DefaultCameraSnapshotFetcher;
use infrastructure::file_storage::LocalFileStorage;
use infrastructure::frame_processor::DefaultFrameProcessor;
use infrastructure::log_file::CappedLogFile;

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Sends records to the configured log file, or stderr when there is none.
fn init_logging(settings: &Settings) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    let mut sink_error = None;
    if let Some(path) = &settings.log_file {
        match CappedLogFile::open(path, settings.log_file_max_bytes) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(err) => sink_error = Some((path, err)),
        }
    }
    builder.init();
    if let Some((path, err)) = sink_error {
        log::warn!(target: "main", "log file {} unavailable, logging to stderr: {}", path.display(), err);
    }
}

fn build_renderer(settings: &Settings) -> AnnotationRenderer {
    let mut renderer = AnnotationRenderer::new(Color::from_hex(&settings.highlight_color))
        .with_jpeg_quality(settings.jpeg_quality)
        .with_max_dimension(settings.max_export_dimension);
    if let Some(font_path) = &settings.font_path {
        // Rectangles still render without a font; only labels are lost.
        if let Err(err) = renderer.load_font_file(font_path) {
            log::error!(target: "main", "font {} unavailable, labels will be skipped: {}", font_path.display(), err);
        }
    }
    renderer
}

fn router(state: Arc<AppState>, allowed_origins: Vec<HeaderValue>) -> Router {
    let exposed = [
        TENSOR_SHAPE_HEADER,
        TENSOR_DTYPE_HEADER,
        TENSOR_BYTE_ORDER_HEADER,
        IMAGE_WIDTH_HEADER,
        IMAGE_HEIGHT_HEADER,
        SNAPSHOT_PATH_HEADER,
    ]
    .map(HeaderName::from_static);

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(vec![HeaderName::from_static("content-type")])
        .expose_headers(exposed);

    Router::new()
        .route("/tensor", post(upload_tensor_handler))
        .route("/tensor/fetch", post(fetch_tensor_handler))
        .route("/annotate", post(annotate_handler))
        .route("/jpeg", post(encode_pixels_handler))
        .route("/capabilities", get(capabilities_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
}

/// Writes the settings back on exit. Failure is logged, never fatal.
fn save_settings(settings: &Settings, path: &std::path::Path) -> bool {
    match settings.save(path) {
        Ok(()) => true,
        Err(err) => {
            log::warn!(target: "main", "could not save settings: {}", err);
            false
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!(target: "main", "failed to listen for ctrl-c: {}", err);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_path = Settings::path_from_env();
    let settings = Settings::read(&settings_path)
        .with_context(|| format!("loading {}", settings_path.display()))?;
    init_logging(&settings);
    log::info!(target: "main", "settings from {}", settings_path.display());
    if let Err(err) = settings.seed_if_missing(&settings_path) {
        log::warn!(target: "main", "could not write default settings: {}", err);
    }

    let frame_processor = Arc::new(DefaultFrameProcessor::new(build_renderer(&settings)));
    let snapshot_fetcher = DefaultCameraSnapshotFetcher::new(Duration::from_secs(settings.fetch_timeout_secs))?
        .with_snapshot_root(settings.snapshot_root.clone());
    let camera_service = CameraService::new(
        frame_processor,
        snapshot_fetcher,
        LocalFileStorage::new(&settings.capture_dir),
        settings.conversion_parameters()?,
        settings.element_type()?,
    )
    .with_max_input_dimension(settings.max_input_dimension);
    let state = Arc::new(AppState {
        camera_service: Arc::new(camera_service),
    });

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind_addr '{}'", settings.bind_addr))?;
    log::info!(target: "main", "Startup \"camera_tensor\" on {}", addr);

    axum::Server::bind(&addr)
        .serve(router(state, settings.cors_origins()?).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    save_settings(&settings, &settings_path);
    log::info!(target: "main", "Exit \"camera_tensor\"");
    Ok(())
}
