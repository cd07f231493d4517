use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use folio_error::{FolioError, Result};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

/// Incremental state of a resumable upload. The terminal event is the
/// return value of the upload itself, never a progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub transferred: u64,
    pub total: u64,
}

/// Write-only object storage: bytes in, durable public URL out.
#[allow(async_fn_in_trait)]
pub trait ObjectStorage: Send + Sync {
    /// One-shot upload (avatar images).
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<Url>;

    /// Progress-reporting upload (project images). The URL resolves
    /// only after the final byte has landed; callers must not observe
    /// a half-uploaded object.
    async fn upload_resumable(
        &self,
        path: &str,
        bytes: Vec<u8>,
        progress: UnboundedSender<UploadProgress>,
    ) -> Result<Url>;
}

/// Storage path for a project image, namespaced by upload timestamp and
/// original filename.
pub fn project_image_path(millis: i64, filename: &str) -> String {
    format!("project-images/{millis}-{filename}")
}

/// Storage path for an avatar image, namespaced by upload timestamp and
/// file extension.
pub fn avatar_image_path(millis: i64, extension: &str) -> String {
    format!("profile-images/avatar-{millis}.{extension}")
}

/// In-memory [`ObjectStorage`] for tests and local development.
/// Retains every uploaded blob; `set_fail_uploads` turns the next
/// uploads into hard failures.
#[derive(Clone, Default)]
pub struct MemoryObjectStorage {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    fail_uploads: Arc<AtomicBool>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    fn public_url(path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("memfs://objects/{path}"))?)
    }

    fn store(&self, path: &str, bytes: Vec<u8>) -> Result<Url> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(FolioError::upload("injected upload failure"));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_owned(), bytes);
        Self::public_url(path)
    }
}

impl ObjectStorage for MemoryObjectStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<Url> {
        self.store(path, bytes)
    }

    async fn upload_resumable(
        &self,
        path: &str,
        bytes: Vec<u8>,
        progress: UnboundedSender<UploadProgress>,
    ) -> Result<Url> {
        let total = bytes.len() as u64;
        // Four staged progress reports, then the terminal result.
        for step in 1..=4u64 {
            if self.fail_uploads.load(Ordering::SeqCst) && step > 1 {
                return Err(FolioError::upload("injected upload failure"));
            }
            let _ = progress.send(UploadProgress {
                transferred: total * step / 4,
                total,
            });
            tokio::task::yield_now().await;
        }
        self.store(path, bytes)
    }
}

/// [`ObjectStorage`] backed by a plain HTTP endpoint: objects are PUT
/// under `endpoint`/path and served back from `public_base`/path.
pub struct HttpObjectStorage {
    client: reqwest::Client,
    endpoint: Url,
    public_base: Url,
}

impl HttpObjectStorage {
    pub fn new(endpoint: Url, public_base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            public_base,
        }
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<Url> {
        let target = self.endpoint.join(path)?;
        let response = self.client.put(target).body(bytes).send().await?;
        if !response.status().is_success() {
            return Err(FolioError::upload(format!(
                "storage endpoint returned {}",
                response.status()
            )));
        }
        log::debug!("uploaded object to {path}");
        Ok(self.public_base.join(path)?)
    }
}

impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<Url> {
        self.put(path, bytes).await
    }

    async fn upload_resumable(
        &self,
        path: &str,
        bytes: Vec<u8>,
        progress: UnboundedSender<UploadProgress>,
    ) -> Result<Url> {
        let total = bytes.len() as u64;
        let _ = progress.send(UploadProgress {
            transferred: 0,
            total,
        });
        let url = self.put(path, bytes).await?;
        let _ = progress.send(UploadProgress {
            transferred: total,
            total,
        });
        Ok(url)
    }
}
