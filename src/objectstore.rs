//!
//! inkpress object store
//! ---------------------
//! Filesystem-backed chunked binary storage for uploaded images. Objects live
//! under a managed root as `objects/<name>` with a sidecar metadata document
//! in `meta/<name>.json`; in-flight writes stream into `tmp/<name>.partial`
//! and are renamed into place only on commit, so an object either appears
//! whole or never appears at all.
//!
//! Key responsibilities:
//! - Name generation: this store is the sole naming authority. Names are
//!   derived from cryptographically random bytes plus a content-type
//!   extension, never from filenames or content.
//! - Bounded-memory I/O: both directions move fixed-size chunks, never whole
//!   objects.
//! - Abort safety: a writer dropped before commit removes its partial file;
//!   nothing becomes visible to `open_read`.
//! - Immutability: objects are write-once. A name with a committed object
//!   behind it can never be reopened for writing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::error::{AppError, AppResult};

pub const DEFAULT_BUCKET: &str = "blog-images";
pub const READ_CHUNK_BYTES: usize = 64 * 1024;

const NAME_STEM_BYTES: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMeta {
    pub name: String,
    pub bucket: String,
    pub content_type: String,
    pub size: u64,
    /// Commit time in epoch milliseconds.
    pub created_at: i64,
}

pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Open (or initialize) a store rooted at the given folder.
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        for sub in ["objects", "meta", "tmp"] {
            std::fs::create_dir_all(root.join(sub))?;
        }
        Ok(Self { root })
    }

    fn object_path(&self, name: &str) -> PathBuf { self.root.join("objects").join(name) }
    fn meta_path(&self, name: &str) -> PathBuf { self.root.join("meta").join(format!("{}.json", name)) }
    fn tmp_path(&self, name: &str) -> PathBuf { self.root.join("tmp").join(format!("{}.partial", name)) }

    /// Generate a fresh object name: 16 random bytes hex-encoded plus an
    /// extension derived from the content type. Callers must not invent
    /// names. An exhausted entropy source is an internal error, never a
    /// predictable name.
    pub fn generate_name(&self, content_type: &str) -> AppResult<String> {
        let mut bytes = [0u8; NAME_STEM_BYTES];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| AppError::internal(format!("entropy source failed: {}", e)))?;
        let mut stem = String::with_capacity(NAME_STEM_BYTES * 2);
        use std::fmt::Write as _;
        for b in &bytes { let _ = write!(&mut stem, "{:02x}", b); }
        Ok(format!("{}.{}", stem, extension_for(content_type)))
    }

    /// Objects are write-once: a name that already resolves to a committed
    /// object cannot be opened for writing again.
    pub async fn open_write(&self, name: &str, bucket: &str, content_type: &str) -> AppResult<ObjectWriter> {
        if !is_valid_name(name) {
            return Err(AppError::validation("Invalid upload name"));
        }
        match tokio::fs::metadata(self.object_path(name)).await {
            Ok(_) => return Err(AppError::duplicate("Object already exists")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let tmp = self.tmp_path(name);
        let file = tokio::fs::File::create(&tmp).await?;
        Ok(ObjectWriter {
            file: Some(file),
            tmp,
            final_path: self.object_path(name),
            meta_path: self.meta_path(name),
            name: name.to_string(),
            bucket: bucket.to_string(),
            content_type: content_type.to_string(),
            written: 0,
            committed: false,
        })
    }

    /// Open an object for chunked reading. Unknown names are `NotFound`;
    /// partial writes are never visible here.
    pub async fn open_read(&self, name: &str) -> AppResult<(ObjectReader, ObjectMeta)> {
        if !is_valid_name(name) {
            return Err(AppError::not_found("no such object"));
        }
        let path = self.object_path(name);
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::not_found("no such object"));
            }
            Err(e) => return Err(e.into()),
        };
        let meta = self.read_meta(name, &file).await?;
        Ok((ObjectReader { file }, meta))
    }

    /// Existence/metadata lookup without opening a read stream.
    pub async fn stat(&self, name: &str) -> AppResult<Option<ObjectMeta>> {
        if !is_valid_name(name) { return Ok(None); }
        let path = self.object_path(name);
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(self.read_meta(name, &file).await?))
    }

    async fn read_meta(&self, name: &str, file: &tokio::fs::File) -> AppResult<ObjectMeta> {
        match tokio::fs::read_to_string(self.meta_path(name)).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| AppError::internal(format!("corrupt object metadata {}: {}", name, e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Sidecar lost; fall back to what the filesystem still knows.
                let size = file.metadata().await?.len();
                Ok(ObjectMeta {
                    name: name.to_string(),
                    bucket: DEFAULT_BUCKET.to_string(),
                    content_type: content_type_for(name).to_string(),
                    size,
                    created_at: 0,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Accept only names this store could have generated: a 32-char lowercase hex
/// stem plus a short alphanumeric extension. Anything else (including path
/// separators) is rejected before touching the filesystem.
pub fn is_valid_name(name: &str) -> bool {
    let Some((stem, ext)) = name.split_once('.') else { return false; };
    stem.len() == NAME_STEM_BYTES * 2
        && stem.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        && !ext.is_empty()
        && ext.len() <= 5
        && ext.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpeg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, e)| e) {
        Some("jpeg") | Some("jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Chunked write sink. Either `commit` runs to completion or the object does
/// not appear: bytes stream into a partial file that only a successful commit
/// renames into the visible tree.
pub struct ObjectWriter {
    file: Option<tokio::fs::File>,
    tmp: PathBuf,
    final_path: PathBuf,
    meta_path: PathBuf,
    name: String,
    bucket: String,
    content_type: String,
    written: u64,
    committed: bool,
}

impl ObjectWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> AppResult<()> {
        let file = self.file.as_mut()
            .ok_or_else(|| AppError::internal("write after commit"))?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 { self.written }

    /// Flush and fsync the partial file, persist the metadata sidecar, then
    /// atomically rename into the objects tree.
    pub async fn commit(mut self) -> AppResult<ObjectMeta> {
        let mut file = self.file.take()
            .ok_or_else(|| AppError::internal("double commit"))?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        let meta = ObjectMeta {
            name: self.name.clone(),
            bucket: self.bucket.clone(),
            content_type: self.content_type.clone(),
            size: self.written,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        let text = serde_json::to_string_pretty(&meta)
            .map_err(|e| AppError::internal(format!("serialize object metadata: {}", e)))?;
        tokio::fs::write(&self.meta_path, text).await?;
        if let Err(e) = tokio::fs::rename(&self.tmp, &self.final_path).await {
            // Do not leave a sidecar for an object that never appeared.
            let _ = tokio::fs::remove_file(&self.meta_path).await;
            return Err(e.into());
        }
        self.committed = true;
        debug!(target: "inkpress::objectstore", "object committed: name={} size={}", meta.name, meta.size);
        Ok(meta)
    }
}

impl Drop for ObjectWriter {
    fn drop(&mut self) {
        if !self.committed {
            // Abandoned mid-upload (client disconnect or stream error): close
            // the handle and discard the partial file.
            self.file.take();
            let _ = std::fs::remove_file(&self.tmp);
        }
    }
}

/// Chunked read source over a committed object.
pub struct ObjectReader {
    file: tokio::fs::File,
}

impl ObjectReader {
    /// Read the next chunk, up to `READ_CHUNK_BYTES`; `None` at end of object.
    pub async fn read_chunk(&mut self) -> AppResult<Option<Vec<u8>>> {
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        let n = self.file.read(&mut buf).await?;
        if n == 0 { return Ok(None); }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_are_well_formed_and_distinct() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(tmp.path()).unwrap();
        let a = store.generate_name("image/png").unwrap();
        let b = store.generate_name("image/png").unwrap();
        assert!(a.ends_with(".png"));
        assert!(is_valid_name(&a));
        assert_ne!(a, b);
        assert!(store.generate_name("image/jpeg").unwrap().ends_with(".jpeg"));
        assert!(store.generate_name("text/html").unwrap().ends_with(".bin"));
    }

    #[tokio::test]
    async fn open_write_rejects_invented_names_as_validation() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(tmp.path()).unwrap();
        let r = store.open_write("kitten.png", DEFAULT_BUCKET, "image/png").await;
        assert!(matches!(r, Err(AppError::Validation { .. })));
    }

    #[test]
    fn name_validation_rejects_client_invented_names() {
        assert!(!is_valid_name("kitten.png"));
        assert!(!is_valid_name("../../etc/passwd"));
        assert!(!is_valid_name("0123456789abcdef0123456789abcdef"));
        assert!(!is_valid_name("0123456789ABCDEF0123456789ABCDEF.png"));
        assert!(!is_valid_name("0123456789abcdef0123456789abcdef."));
        assert!(is_valid_name("0123456789abcdef0123456789abcdef.png"));
    }
}
