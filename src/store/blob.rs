use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::RwLock;

use super::{ObjectMetadata, compute_hash};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const META_SUFFIX: &str = ".meta.json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Object bytes together with the content type they were stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Key/value blob storage.
///
/// `put` must be all-or-nothing: a reader sees either the previous object or
/// the complete new one.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>>;
}

/// Stores each object as a file under `base_dir` with a JSON metadata sidecar.
///
/// Files are named by the SHA-256 of the key, so any key string maps to one
/// flat, fixed-length name. The sidecar records the original key.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(file_name(key))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}{META_SUFFIX}", file_name(key)))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        self.base_dir.join(format!(".{name}.{stamp}-{seq}.tmp"))
    }

    async fn read_metadata(&self, key: &str) -> Result<Option<ObjectMetadata>> {
        let path = self.meta_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        match serde_json::from_slice::<ObjectMetadata>(&bytes) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(err) => {
                tracing::warn!(key, error = %err, "ignoring unreadable object metadata");
                Ok(None)
            }
        }
    }
}

fn file_name(key: &str) -> String {
    compute_hash(key.as_bytes())
}

#[async_trait]
impl BlobStore for LocalFileStorage {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        fs::create_dir_all(&self.base_dir)
            .await
            .with_context(|| format!("create {}", self.base_dir.display()))?;

        let metadata = ObjectMetadata {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: data.len(),
            created_at: Utc::now().to_rfc3339(),
        };
        let meta_json = serde_json::to_vec(&metadata)?;

        let name = file_name(key);
        let data_tmp = self.temp_path(&name);
        let meta_tmp = self.temp_path(&format!("{name}{META_SUFFIX}"));
        let meta_path = self.meta_path(key);
        let mut meta_placed = false;
        let written = async {
            fs::write(&data_tmp, data).await?;
            fs::write(&meta_tmp, &meta_json).await?;
            // Metadata lands first; readers only see an object once its data file exists.
            fs::rename(&meta_tmp, &meta_path).await?;
            meta_placed = true;
            fs::rename(&data_tmp, self.resolve_path(key)).await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&data_tmp).await;
            let _ = fs::remove_file(&meta_tmp).await;
            if meta_placed {
                let _ = fs::remove_file(&meta_path).await;
            }
            return Err(err).with_context(|| format!("write object {key}"));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>> {
        let path = self.resolve_path(key);
        let data = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        let content_type = self
            .read_metadata(key)
            .await?
            .map(|metadata| metadata.content_type)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        Ok(Some(StoredBlob { data, content_type }))
    }
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let blob = StoredBlob {
            data: data.to_vec(),
            content_type: content_type.to_string(),
        };
        self.objects.write().await.insert(key.to_string(), blob);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>> {
        Ok(self.objects.read().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn local_storage_round_trips_with_content_type() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("objects"));

        storage.put("abc.png", b"\x89PNG", "image/png").await.unwrap();
        let blob = storage.get("abc.png").await.unwrap().unwrap();

        assert_eq!(blob.data, b"\x89PNG");
        assert_eq!(blob.content_type, "image/png");
    }

    #[tokio::test]
    async fn local_storage_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf());

        assert!(storage.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn local_storage_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf());
        storage.put("k", b"data", "text/plain").await.unwrap();
        storage.put("k", b"data", "text/plain").await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        let name = file_name("k");
        assert_eq!(names, vec![name.clone(), format!("{name}.meta.json")]);
    }

    #[tokio::test]
    async fn awkward_keys_stay_inside_base_dir() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("objects");
        let storage = LocalFileStorage::new(base.clone());
        let long = "9".repeat(4096);
        let keys = ["../escape", "a/b/c", long.as_str()];

        for key in keys {
            storage.put(key, key.as_bytes(), "text/plain").await.unwrap();
        }
        for key in keys {
            assert_eq!(storage.get(key).await.unwrap().unwrap().data, key.as_bytes());
        }
        assert!(!dir.path().join("escape").exists());
        assert_eq!(std::fs::read_dir(&base).unwrap().count(), keys.len() * 2);

        let meta: ObjectMetadata =
            serde_json::from_slice(&std::fs::read(storage.meta_path("a/b/c")).unwrap()).unwrap();
        assert_eq!(meta.key, "a/b/c");
    }

    #[tokio::test]
    async fn failed_data_rename_leaves_no_sidecar() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf());
        let blocker = storage.resolve_path("k");
        std::fs::create_dir_all(blocker.join("occupied")).unwrap();

        assert!(storage.put("k", b"data", "text/plain").await.is_err());

        assert!(!storage.meta_path("k").exists());
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![file_name("k")]);
    }

    #[tokio::test]
    async fn missing_sidecar_falls_back_to_default_content_type() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf());
        std::fs::write(storage.resolve_path("raw"), b"bytes").unwrap();

        let blob = storage.get("raw").await.unwrap().unwrap();
        assert_eq!(blob.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn memory_store_overwrites_in_place() {
        let store = MemoryBlobStore::new();
        store.put("k", b"one", "text/plain").await.unwrap();
        store.put("k", b"one", "text/plain").await.unwrap();

        assert_eq!(store.object_count().await, 1);
        assert_eq!(store.get("k").await.unwrap().unwrap().data, b"one");
    }
}
