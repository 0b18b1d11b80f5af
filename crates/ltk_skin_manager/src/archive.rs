//! Archive file placement and removal inside the install directory.
//!
//! Writes go through a `.tmp` sibling and a rename. Failed deletes park the
//! file under a `.tmp` name so the next reconciliation sweeps it.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ltk_skin_registry::{is_temp_file, temp_file_name};

use crate::error::{ManagerError, Result};

const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Where archive bytes come from.
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    Bytes(Vec<u8>),
    File(Utf8PathBuf),
}

/// How an archive left the install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// Renamed to this `.tmp` path instead.
    Parked(Utf8PathBuf),
    /// Nothing to delete.
    Missing,
}

fn temp_sibling(path: &Utf8Path) -> Utf8PathBuf {
    path.with_file_name(temp_file_name(path.file_name().unwrap_or("archive")))
}

async fn write_once(
    source: &ArchiveSource,
    dest: &Utf8Path,
    temp: &Utf8Path,
) -> std::io::Result<()> {
    match source {
        ArchiveSource::Bytes(bytes) => tokio::fs::write(temp, bytes).await?,
        ArchiveSource::File(from) => {
            tokio::fs::copy(from, temp).await?;
        }
    }
    tokio::fs::rename(temp, dest).await
}

/// Writes `source` to `dest`, retrying once, and returns the size on disk.
///
/// An empty result is deleted and reported as [`ManagerError::EmptyArchive`].
pub async fn place_archive(source: &ArchiveSource, dest: &Utf8Path) -> Result<u64> {
    let in_place = matches!(source, ArchiveSource::File(from) if from == dest);

    if !in_place {
        let temp = temp_sibling(dest);
        if let Err(first) = write_once(source, dest, &temp).await {
            tracing::warn!(path = %dest, error = %first, "Writing archive failed, retrying");
            let _ = tokio::fs::remove_file(&temp).await;
            tokio::time::sleep(RETRY_DELAY).await;

            if let Err(e) = write_once(source, dest, &temp).await {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(ManagerError::file_io(dest, e));
            }
        }
    }

    let size = tokio::fs::metadata(dest)
        .await
        .map_err(|e| ManagerError::file_io(dest, e))?
        .len();

    if size == 0 {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(ManagerError::EmptyArchive {
            path: dest.to_path_buf(),
        });
    }

    tracing::debug!(path = %dest, size, "Archive placed");
    Ok(size)
}

/// Deletes `path`, retrying once, then falls back to renaming it to `.tmp`.
pub async fn remove_archive(path: &Utf8Path) -> Result<Removal> {
    let mut last_error = None;
    for attempt in 0..2 {
        match tokio::fs::remove_file(path).await {
            Ok(()) => return Ok(Removal::Deleted),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Removal::Missing),
            Err(e) => {
                tracing::warn!(%path, attempt, error = %e, "Failed to delete archive");
                last_error = Some(e);
                if attempt == 0 {
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    let parked = temp_sibling(path);
    match tokio::fs::rename(path, &parked).await {
        Ok(()) => {
            tracing::warn!(%path, %parked, "Parked archive for later cleanup");
            Ok(Removal::Parked(parked))
        }
        Err(rename_error) => Err(ManagerError::file_io(
            path,
            last_error.unwrap_or(rename_error),
        )),
    }
}

/// Best-effort removal used when rolling back a failed install.
pub(crate) async fn discard_archive(path: &Utf8Path) {
    if let Err(e) = remove_archive(path).await {
        tracing::error!(
            %path,
            error = %e,
            "Failed to discard archive; it will be swept on next start"
        );
    }
}

/// Deletes leftover `.tmp` files. Returns how many were removed.
pub async fn clean_temp_files(dir: &Utf8Path) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(ManagerError::file_io(dir, e)),
    };

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ManagerError::file_io(dir, e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_temp_file(name) {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(file = name, error = %e, "Failed to remove temp file"),
        }
    }

    if removed > 0 {
        tracing::info!(removed, "Cleaned temp files");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_place_bytes() {
        let (_guard, root) = dir();
        let dest = root.join("ahri.fantome");

        let size = place_archive(&ArchiveSource::Bytes(b"PK\x03\x04".to_vec()), &dest)
            .await
            .unwrap();

        assert_eq!(size, 4);
        assert!(!root.join("ahri.fantome.tmp").exists());
    }

    #[tokio::test]
    async fn test_place_copies_file() {
        let (_guard, root) = dir();
        let source = root.join("download.zip");
        std::fs::write(&source, b"archive").unwrap();

        let dest = root.join("zed.fantome");
        place_archive(&ArchiveSource::File(source.clone()), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"archive");
        assert!(source.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_undeletable_archive_is_parked() {
        let (_guard, root) = dir();
        let path = root.join("ahri.fantome");
        std::fs::create_dir(&path).unwrap();

        let removal = remove_archive(&path).await.unwrap();

        assert_eq!(removal, Removal::Parked(root.join("ahri.fantome.tmp")));
        assert!(!path.exists());
        assert!(root.join("ahri.fantome.tmp").is_dir());
    }

    #[tokio::test]
    async fn test_empty_archive_is_rejected_and_removed() {
        let (_guard, root) = dir();
        let dest = root.join("empty.fantome");

        let result = place_archive(&ArchiveSource::Bytes(Vec::new()), &dest).await;

        assert!(matches!(result, Err(ManagerError::EmptyArchive { .. })));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_missing_source_fails_after_retry() {
        let (_guard, root) = dir();
        let result = place_archive(
            &ArchiveSource::File(root.join("missing.zip")),
            &root.join("x.fantome"),
        )
        .await;

        assert!(matches!(result, Err(ManagerError::FileIo { .. })));
        assert!(!root.join("x.fantome.tmp").exists());
    }

    #[tokio::test]
    async fn test_remove_archive() {
        let (_guard, root) = dir();
        let path = root.join("lux.fantome");
        std::fs::write(&path, b"x").unwrap();

        assert_eq!(remove_archive(&path).await.unwrap(), Removal::Deleted);
        assert_eq!(remove_archive(&path).await.unwrap(), Removal::Missing);
    }

    #[tokio::test]
    async fn test_clean_temp_files() {
        let (_guard, root) = dir();
        std::fs::write(root.join("a.fantome.tmp"), b"x").unwrap();
        std::fs::write(root.join("b.fantome"), b"x").unwrap();

        assert_eq!(clean_temp_files(&root).await.unwrap(), 1);
        assert!(root.join("b.fantome").exists());
        assert_eq!(clean_temp_files(&root.join("nope")).await.unwrap(), 0);
    }
}
