//! Backend for the plant disease detector: accepts a leaf photo on
//! `POST /predict`, forwards it to a hosted classifier and returns the top
//! label with its confidence.

pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod upload;

use actix_cors::Cors;
use actix_web::web;

use crate::config::{Config, UploadSettings};
use crate::error::InferenceError;
use crate::inference::InferenceClient;

/// Shared, read-only state handed to every worker.
pub struct AppState {
    pub inference: InferenceClient,
    pub uploads: UploadSettings,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, InferenceError> {
        Ok(Self {
            inference: InferenceClient::new(&config.model)?,
            uploads: config.uploads.clone(),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(handlers::index)))
        .service(web::resource("/predict").route(web::post().to(handlers::predict)));
}

/// Browser and mobile clients call from other origins.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}
