pub mod camera_service;
pub mod error;
pub mod settings;
