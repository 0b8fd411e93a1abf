//! Upload coordination.
//! Two-phase uploads: `issue_upload_target` hands out a store-generated name
//! and the PUT URL for it, then the client writes the bytes in a separate
//! request. On the way back out, `serve` pipes the store's chunked reader
//! straight into the HTTP response body so transport backpressure reaches the
//! file read and nothing is buffered whole.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header;
use axum::response::Response;
use futures_util::StreamExt;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::objectstore::{is_valid_name, ObjectMeta, ObjectStore, DEFAULT_BUCKET};

/// Issued before the client performs the actual write. Ephemeral: nothing is
/// persisted until bytes arrive on the PUT.
#[derive(Debug, Clone, Serialize)]
pub struct UploadTarget {
    pub name: String,
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
}

pub struct UploadCoordinator {
    store: Arc<ObjectStore>,
    public_base: String,
}

impl UploadCoordinator {
    pub fn new(store: Arc<ObjectStore>, public_base: impl Into<String>) -> Self {
        let public_base = public_base.into().trim_end_matches('/').to_string();
        Self { store, public_base }
    }

    /// Generate a name (the store is the naming authority) and the URL the
    /// client PUTs to. Uploads default to jpeg when no type is given, which
    /// is what the editor front-end sends.
    pub fn issue_upload_target(&self, content_type: Option<&str>) -> AppResult<UploadTarget> {
        let name = self.store.generate_name(content_type.unwrap_or("image/jpeg"))?;
        let upload_url = format!("{}/files/{}", self.public_base, name);
        Ok(UploadTarget { name, upload_url })
    }

    /// Stream a request body into the store under a previously issued name.
    /// Any mid-stream failure drops the writer uncommitted, so no partial
    /// object ever becomes readable.
    pub async fn receive(&self, name: &str, content_type: &str, body: Body) -> AppResult<ObjectMeta> {
        if !is_valid_name(name) {
            return Err(AppError::validation("Invalid upload name"));
        }
        let mut writer = self.store.open_write(name, DEFAULT_BUCKET, content_type).await?;
        let mut stream = body.into_data_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AppError::io(format!("upload stream failed: {}", e)))?;
            writer.write_chunk(&chunk).await?;
        }
        writer.commit().await
    }

    /// Chunked response for a stored object, propagating its content type.
    /// Absent objects surface as `NotFound` for the handler to map to 404.
    pub async fn serve(&self, name: &str) -> AppResult<Response> {
        let (reader, meta) = self.store.open_read(name).await?;
        let stream = futures_util::stream::try_unfold(reader, |mut r| async move {
            match r.read_chunk().await {
                Ok(Some(chunk)) => Ok(Some((chunk, r))),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            }
        });
        Response::builder()
            .header(header::CONTENT_TYPE, meta.content_type)
            .header(header::CONTENT_LENGTH, meta.size)
            .body(Body::from_stream(stream))
            .map_err(|e| AppError::internal(format!("response build failed: {}", e)))
    }
}
