use actix_multipart::Multipart;
use actix_web::{
    web::{self, Bytes},
    HttpResponse,
};
use futures_util::StreamExt;
use tracing::{debug, instrument, warn, Instrument};
use uuid::Uuid;

use crate::error::PredictError;
use crate::models::PredictionResponse;
use crate::upload::EphemeralUpload;
use crate::AppState;

/// Multipart field that carries the leaf photo.
pub const IMAGE_FIELD: &str = "image";

pub const LIVENESS_MESSAGE: &str = "🌿 Plant Disease Detector Backend is Running!";

pub async fn index() -> &'static str {
    LIVENESS_MESSAGE
}

#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn predict(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, PredictError> {
    // Only the first `image` file part is kept; everything else, including
    // plain form values named `image`, is drained.
    let mut upload = None;
    while let Some(item) = payload.next().await {
        let mut field = item?;
        let disposition = field.content_disposition();
        let is_image = disposition.get_name() == Some(IMAGE_FIELD)
            && disposition.get_filename().is_some();

        if is_image && upload.is_none() {
            upload = Some(EphemeralUpload::receive(&state.uploads, &mut field).await?);
        } else {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
        }
    }

    let upload = upload.ok_or(PredictError::MissingImage)?;
    if upload.is_empty() {
        warn!("uploaded image is empty");
    }
    debug!(bytes = upload.len(), path = %upload.path().display(), "image received");
    let image = Bytes::from(upload.read().await?);

    // Runs detached so a dropped connection neither aborts the model call
    // nor skips the cleanup.
    let client = state.inference.clone();
    let outcome = actix_rt::spawn(
        async move {
            let outcome = client.classify(image).await;
            upload.release().await;
            outcome
        }
        .in_current_span(),
    )
    .await
    .map_err(|e| PredictError::Task(e.to_string()))?;

    let prediction = outcome?;
    Ok(HttpResponse::Ok().json(PredictionResponse::from(prediction)))
}
