use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::handle::BlobHandle;
use super::traits::{BlobStore, BoxReader};

/// Filesystem-backed blob store.
///
/// Blobs live in a Git-style sharded directory layout keyed by handle:
/// `{base_path}/{first 2 hex chars}/{remaining 30 hex chars}`
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store rooted at `base_path`.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Compute the filesystem path for a handle.
    fn blob_path(&self, handle: &BlobHandle) -> PathBuf {
        self.base_path
            .join(handle.shard_prefix())
            .join(handle.shard_suffix())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self, handle: &BlobHandle) -> PathBuf {
        self.base_path.join(".tmp").join(handle.to_hex())
    }

    /// Move a fully written temp file into its sharded location.
    async fn commit_temp(
        &self,
        temp_path: &PathBuf,
        handle: &BlobHandle,
    ) -> Result<(), StorageError> {
        let blob_path = self.blob_path(handle);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        if let Err(e) = fs::rename(temp_path, &blob_path).await {
            let _ = fs::remove_file(temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, data: &[u8]) -> Result<BlobHandle, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let handle = BlobHandle::generate();
        let temp_path = self.temp_path(&handle);

        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        self.commit_temp(&temp_path, &handle).await?;
        Ok(handle)
    }

    async fn put_stream(&self, mut reader: BoxReader) -> Result<BlobHandle, StorageError> {
        let handle = BlobHandle::generate();
        let temp_path = self.temp_path(&handle);
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        let mut temp_file = fs::File::create(&temp_path).await?;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                drop(temp_file);
                let _ = fs::remove_file(&temp_path).await;
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        drop(temp_file);

        self.commit_temp(&temp_path, &handle).await?;
        Ok(handle)
    }

    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader, StorageError> {
        let blob_path = self.blob_path(handle);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(handle.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(handle);
        Ok(fs::try_exists(&blob_path).await?)
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(handle);
        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, handle: &BlobHandle) -> Result<u64, StorageError> {
        let blob_path = self.blob_path(handle);
        match fs::metadata(&blob_path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(handle.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
