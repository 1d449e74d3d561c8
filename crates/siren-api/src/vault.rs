//! Content-addressed on-disk storage for rider media.
//!
//! Files live at `<root>/<kind>/<sha256>.<ext>`. Writing the same bytes twice
//! lands on the same path, so re-uploads are idempotent.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use siren_core::media::{MediaArtifact, MediaKind, MediaVault};
use tokio::fs;
use uuid::Uuid;

/// Where a payload landed.
#[derive(Debug, Clone)]
pub struct StoredBlob {
  pub content_hash: String,
  pub byte_len:     u64,
}

#[derive(Debug, Clone)]
pub struct DiskMediaVault {
  root: PathBuf,
}

impl DiskMediaVault {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  fn path_for(&self, kind: MediaKind, content_hash: &str, file_name: &str) -> PathBuf {
    self
      .root
      .join(kind.as_str())
      .join(format!("{content_hash}.{}", extension(file_name, kind)))
  }

  /// Hash `bytes` and write them under their digest.
  pub async fn write(
    &self,
    kind: MediaKind,
    file_name: &str,
    bytes: &[u8],
  ) -> std::io::Result<StoredBlob> {
    let content_hash = hex::encode(Sha256::digest(bytes));
    let path = self.path_for(kind, &content_hash, file_name);

    if fs::try_exists(&path).await? {
      tracing::debug!(path = %path.display(), "media already stored");
    } else {
      if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
      }
      // Readers must never observe a partially written blob. Concurrent
      // writers of the same content each get their own temp file.
      let tmp = path.with_extension(format!("{}.partial", Uuid::new_v4()));
      fs::write(&tmp, bytes).await?;
      if let Err(e) = fs::rename(&tmp, &path).await {
        let _ = fs::remove_file(&tmp).await;
        if !fs::try_exists(&path).await? {
          return Err(e);
        }
        tracing::debug!(path = %path.display(), "media stored by a concurrent writer");
      }
    }

    Ok(StoredBlob { content_hash, byte_len: bytes.len() as u64 })
  }
}

/// The stored file extension: the client's, if it is short and alphanumeric,
/// else a default for the kind.
fn extension(file_name: &str, kind: MediaKind) -> String {
  Path::new(file_name)
    .extension()
    .and_then(|e| e.to_str())
    .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
    .map(str::to_ascii_lowercase)
    .unwrap_or_else(|| match kind {
      MediaKind::Image => "jpg".to_owned(),
      MediaKind::Audio => "mp3".to_owned(),
    })
}

impl MediaVault for DiskMediaVault {
  type Error = std::io::Error;

  async fn read<'a>(&'a self, artifact: &'a MediaArtifact) -> std::io::Result<Vec<u8>> {
    fs::read(self.path_for(artifact.kind, &artifact.content_hash, &artifact.file_name)).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::Utc;

  use super::*;

  #[test]
  fn extension_falls_back_per_kind() {
    assert_eq!(extension("photo.JPEG", MediaKind::Image), "jpeg");
    assert_eq!(extension("noext", MediaKind::Audio), "mp3");
    assert_eq!(extension("../../etc/passwd", MediaKind::Image), "jpg");
    assert_eq!(extension("x.tar/../y", MediaKind::Image), "jpg");
  }

  #[tokio::test]
  async fn write_then_read_by_hash() {
    let dir = tempfile::tempdir().unwrap();
    let vault = DiskMediaVault::new(dir.path());

    let blob = vault.write(MediaKind::Image, "scene.png", b"pixels").await.unwrap();
    assert_eq!(blob.byte_len, 6);
    assert_eq!(blob.content_hash.len(), 64);
    assert!(dir.path().join("image").join(format!("{}.png", blob.content_hash)).exists());

    // Same bytes, same path.
    let again = vault.write(MediaKind::Image, "scene.png", b"pixels").await.unwrap();
    assert_eq!(again.content_hash, blob.content_hash);

    let artifact = MediaArtifact {
      artifact_id:      Uuid::new_v4(),
      media_session_id: Uuid::new_v4(),
      kind:             MediaKind::Image,
      file_name:        "scene.png".into(),
      media_type:       "image/png".into(),
      content_hash:     blob.content_hash,
      byte_len:         blob.byte_len,
      recorded_at:      Utc::now(),
    };
    assert_eq!(vault.read(&artifact).await.unwrap(), b"pixels");
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_identical_writes_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Arc::new(DiskMediaVault::new(dir.path()));
    let payload: Arc<Vec<u8>> = Arc::new(vec![7u8; 1024 * 1024]);

    for _ in 0..5 {
      let writers: Vec<_> = (0..8)
        .map(|_| {
          let vault = vault.clone();
          let payload = payload.clone();
          tokio::spawn(async move { vault.write(MediaKind::Image, "a.jpg", &payload).await })
        })
        .collect();

      let mut hashes = Vec::new();
      for writer in writers {
        hashes.push(writer.await.unwrap().unwrap().content_hash);
      }
      hashes.dedup();
      assert_eq!(hashes.len(), 1);

      let path = dir.path().join("image").join(format!("{}.jpg", hashes[0]));
      assert_eq!(std::fs::metadata(&path).unwrap().len(), payload.len() as u64);
      std::fs::remove_file(&path).unwrap();
    }

    // No temp files left behind.
    let leftovers = std::fs::read_dir(dir.path().join("image")).unwrap().count();
    assert_eq!(leftovers, 0);
  }
}
