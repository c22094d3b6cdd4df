use anyhow::{Result, bail};
use rand::RngCore;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

/// Manages on-disk storage for uploaded product images.
///
/// Assets live as flat files under `{dir}/{filename}` and are referenced
/// elsewhere by filename only. At most one asset is live per product:
/// replacement stores the new file before deleting the old one, so a
/// product never references a filename that does not exist on disk.
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// On-disk path for a stored asset.
    pub fn path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Write content under a generated name and return the filename.
    ///
    /// The name is `{unix_millis}-{random hex}.{ext}` — the random component
    /// keeps concurrent uploads within the same millisecond from colliding.
    pub async fn store(&self, content: &[u8], extension: &str) -> Result<String> {
        let ext = sanitize_extension(extension)?;

        let mut suffix = [0u8; 4];
        rand::rng().fill_bytes(&mut suffix);
        let filename = format!(
            "{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            hex::encode(suffix),
            ext
        );

        fs::write(self.path(&filename), content).await?;
        Ok(filename)
    }

    /// Store a new asset, then delete the one it supersedes.
    ///
    /// Delete happens only after the new file is confirmed on disk; a
    /// failure to remove the old file is logged, not surfaced.
    pub async fn replace(&self, old: Option<&str>, content: &[u8], extension: &str) -> Result<String> {
        let filename = self.store(content, extension).await?;
        if let Some(old) = old {
            if let Err(e) = self.delete(old).await {
                warn!("Failed to delete replaced asset {}: {}", old, e);
            }
        }
        Ok(filename)
    }

    /// Delete a stored asset. Idempotent: a missing file is not an error.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        if filename.contains(['/', '\\']) || filename.contains("..") {
            bail!("Refusing to delete suspicious filename: {}", filename);
        }

        match fs::remove_file(self.path(filename)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Asset {} already gone", filename);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Uploaded filenames are untrusted; only a short alphanumeric extension
/// survives into the generated name.
fn sanitize_extension(extension: &str) -> Result<String> {
    let ext = extension.to_ascii_lowercase();
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("Invalid file extension: {:?}", extension);
    }
    Ok(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_store() -> ImageStore {
        let dir = std::env::temp_dir().join(format!("vitrine-assets-{}", Uuid::new_v4()));
        ImageStore::new(dir).await.unwrap()
    }

    #[tokio::test]
    async fn store_generates_distinct_names() {
        let store = test_store().await;

        let a = store.store(b"cat", "png").await.unwrap();
        let b = store.store(b"dog", "png").await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));

        assert_eq!(fs::read(store.path(&a)).await.unwrap(), b"cat");
        assert_eq!(fs::read(store.path(&b)).await.unwrap(), b"dog");
    }

    #[tokio::test]
    async fn replace_removes_previous_asset() {
        let store = test_store().await;

        let old = store.store(b"cat", "png").await.unwrap();
        let new = store.replace(Some(&old), b"dog", "jpg").await.unwrap();

        assert!(!store.path(&old).exists());
        assert_eq!(fs::read(store.path(&new)).await.unwrap(), b"dog");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = test_store().await;

        let name = store.store(b"cat", "png").await.unwrap();
        store.delete(&name).await.unwrap();
        store.delete(&name).await.unwrap();
        assert!(!store.path(&name).exists());
    }

    #[tokio::test]
    async fn rejects_traversal_and_bad_extensions() {
        let store = test_store().await;

        assert!(store.store(b"x", "p/ng").await.is_err());
        assert!(store.store(b"x", "").await.is_err());
        assert!(store.delete("../etc/passwd").await.is_err());
    }
}
