use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use axum::http::HeaderValue;

use super::camera_service::DEFAULT_MAX_INPUT_DIMENSION;
use super::error::ApplicationError;
use crate::domain::conversion::{ConversionParameters, ElementType};
use crate::domain::error::DomainError;

pub const SETTINGS_PATH_ENV: &str = "CAMERA_TENSOR_SETTINGS";
pub const DEFAULT_SETTINGS_FILE: &str = "Settings.json";

/// Contents of `Settings.json`. Missing keys take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    pub input_width: i32,
    pub input_height: i32,
    pub max_input_dimension: u32,
    pub input_mean: f32,
    pub input_scale: f32,
    pub flip_vertical: bool,
    pub swap_red_blue: bool,
    pub element_type: String,
    pub integer_cast: String,
    pub resize_filter: String,
    pub font_path: Option<PathBuf>,
    pub highlight_color: String,
    pub jpeg_quality: u8,
    pub max_export_dimension: Option<u32>,
    pub capture_dir: PathBuf,
    pub snapshot_root: Option<PathBuf>,
    pub fetch_timeout_secs: u64,
    pub allowed_origins: Vec<String>,
    pub log_file: Option<PathBuf>,
    pub log_file_max_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3300".to_string(),
            input_width: -1,
            input_height: -1,
            max_input_dimension: DEFAULT_MAX_INPUT_DIMENSION,
            input_mean: 0.0,
            input_scale: 1.0,
            flip_vertical: false,
            swap_red_blue: false,
            element_type: "float32".to_string(),
            integer_cast: "saturate".to_string(),
            resize_filter: "triangle".to_string(),
            font_path: None,
            highlight_color: "#FF0000".to_string(),
            jpeg_quality: 90,
            max_export_dimension: None,
            capture_dir: PathBuf::from("captures"),
            snapshot_root: None,
            fetch_timeout_secs: 10,
            allowed_origins: Vec::new(),
            log_file: None,
            log_file_max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }

    /// Reads the settings file, falling back to defaults when it is absent.
    pub fn read(path: &Path) -> Result<Self, ApplicationError> {
        if !path.exists() {
            log::info!(target: "settings", "{} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            ApplicationError::ConfigurationError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let settings: Settings = serde_json::from_str(&text).map_err(|e| {
            ApplicationError::ConfigurationError(format!("cannot parse {}: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ApplicationError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApplicationError::ConfigurationError(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| ApplicationError::ConfigurationError(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| {
            ApplicationError::ConfigurationError(format!("cannot write {}: {}", path.display(), e))
        })
    }

    /// Writes the defaults next to the program on first start so they can be edited.
    pub fn seed_if_missing(&self, path: &Path) -> Result<bool, ApplicationError> {
        if path.exists() {
            return Ok(false);
        }
        self.save(path)?;
        log::info!(target: "settings", "wrote default settings to {}", path.display());
        Ok(true)
    }

    pub fn validate(&self) -> Result<(), ApplicationError> {
        self.conversion_parameters()?;
        self.element_type()?;
        if !self.input_scale.is_finite() || !self.input_mean.is_finite() {
            return Err(DomainError::InvalidParameters("mean and scale must be finite".to_string()).into());
        }
        let limit = i64::from(self.max_input_dimension);
        if i64::from(self.input_width) > limit || i64::from(self.input_height) > limit {
            return Err(DomainError::InvalidParameters(format!(
                "input size {}x{} exceeds max_input_dimension {}",
                self.input_width, self.input_height, self.max_input_dimension
            ))
            .into());
        }
        self.cors_origins()?;
        Ok(())
    }

    /// Origins allowed to call the service from a browser. Empty means
    /// same-origin only.
    pub fn cors_origins(&self) -> Result<Vec<HeaderValue>, ApplicationError> {
        self.allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| {
                    ApplicationError::ConfigurationError(format!("invalid origin '{}': {}", origin, e))
                })
            })
            .collect()
    }

    pub fn conversion_parameters(&self) -> Result<ConversionParameters, DomainError> {
        Ok(ConversionParameters {
            target_width: self.input_width,
            target_height: self.input_height,
            mean: self.input_mean,
            scale: self.input_scale,
            flip_vertical: self.flip_vertical,
            swap_red_blue: self.swap_red_blue,
            integer_cast: self.integer_cast.parse()?,
            resize_filter: self.resize_filter.parse()?,
        })
    }

    pub fn element_type(&self) -> Result<ElementType, DomainError> {
        self.element_type.parse()
    }
}
