//! Staging of one request's image on disk.
//!
//! An [`EphemeralUpload`] owns a uniquely named file in the upload directory.
//! The file is removed by [`EphemeralUpload::release`] or, on any early exit,
//! when the guard is dropped. Either way it goes away exactly once.

use std::fs;
use std::io::Write;
use std::path::Path;

use actix_multipart::Field;
use actix_web::web::{self, Bytes};
use futures_util::StreamExt;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use crate::config::UploadSettings;
use crate::error::PredictError;

pub struct EphemeralUpload {
    file: NamedTempFile,
    len: usize,
    max_bytes: usize,
}

impl EphemeralUpload {
    pub async fn create(settings: &UploadSettings) -> Result<Self, PredictError> {
        let dir = settings.dir.clone();
        let file = web::block(move || {
            Builder::new()
                .prefix("leaf-")
                .suffix(".upload")
                .tempfile_in(dir)
        })
        .await??;

        debug!(path = %file.path().display(), "created ephemeral upload");
        Ok(Self {
            file,
            len: 0,
            max_bytes: settings.max_bytes,
        })
    }

    /// Stream a multipart field into a fresh upload.
    pub async fn receive(settings: &UploadSettings, field: &mut Field) -> Result<Self, PredictError> {
        let mut upload = Self::create(settings).await?;
        while let Some(chunk) = field.next().await {
            upload = upload.append(chunk?).await?;
        }
        Ok(upload)
    }

    pub async fn append(mut self, data: Bytes) -> Result<Self, PredictError> {
        if self.len + data.len() > self.max_bytes {
            return Err(PredictError::UploadTooLarge {
                limit: self.max_bytes,
            });
        }
        self.len += data.len();

        let upload = web::block(move || self.file.write_all(&data).map(|_| self)).await??;
        Ok(upload)
    }

    pub async fn read(&self) -> Result<Vec<u8>, PredictError> {
        let path = self.path().to_path_buf();
        let bytes = web::block(move || fs::read(path)).await??;
        Ok(bytes)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Delete the file now and report failures. If the blocking pool is gone
    /// the closure is dropped, which still removes the file.
    pub async fn release(self) {
        let path = self.path().to_path_buf();
        match web::block(move || self.file.close()).await {
            Ok(Ok(())) => debug!(path = %path.display(), "released ephemeral upload"),
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "failed to remove upload"),
            Err(e) => warn!(path = %path.display(), error = %e, "upload removal task failed"),
        }
    }
}
