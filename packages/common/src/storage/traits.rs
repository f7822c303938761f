use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::handle::BlobHandle;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Handle-addressed blob storage.
///
/// Every `put` stores a fresh blob under a new opaque handle; the store
/// performs no content deduplication of its own.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return the handle of the new blob.
    async fn put(&self, data: &[u8]) -> Result<BlobHandle, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(reader).await
    }

    /// Store data from an async reader and return the handle of the new blob.
    async fn put_stream(&self, reader: BoxReader) -> Result<BlobHandle, StorageError>;

    /// Retrieve all bytes of a blob.
    async fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(handle).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, handle: &BlobHandle) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, handle: &BlobHandle) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, handle: &BlobHandle) -> Result<u64, StorageError>;
}
