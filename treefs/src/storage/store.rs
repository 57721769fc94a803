//! Local file access for a storage server: positional reads and writes
//! beneath a root directory, plus the inventory scan and duplicate cleanup
//! used by the registration handshake.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use crate::error::StorageError;
use crate::path::DfsPath;

/// Files hosted by one storage server, rooted at a local directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &DfsPath) -> PathBuf {
        path.to_local(&self.root)
    }

    /// Length of a file in bytes. Directories have no size.
    pub async fn size(&self, path: &DfsPath) -> Result<u64, StorageError> {
        let meta = fs::metadata(self.resolve(path))
            .await
            .map_err(not_found_or_io)?;
        if meta.is_dir() {
            return Err(StorageError::NotFound);
        }
        Ok(meta.len())
    }

    /// Reads `length` bytes at `offset`. The whole range must lie within
    /// the file.
    pub async fn read(&self, path: &DfsPath, offset: i64, length: u32) -> Result<Vec<u8>, StorageError> {
        let len = self.size(path).await?;
        let in_bounds = offset >= 0
            && (offset as u64)
                .checked_add(u64::from(length))
                .is_some_and(|end| end <= len);
        if !in_bounds {
            return Err(StorageError::OutOfRange);
        }
        let mut file = fs::File::open(self.resolve(path))
            .await
            .map_err(StorageError::io)?;
        file.seek(SeekFrom::Start(offset as u64))
            .await
            .map_err(StorageError::io)?;
        let mut data = vec![0u8; length as usize];
        file.read_exact(&mut data).await.map_err(StorageError::io)?;
        Ok(data)
    }

    /// Writes `data` at `offset`, extending the file when the range ends
    /// past the current length.
    pub async fn write(&self, path: &DfsPath, offset: i64, data: &[u8]) -> Result<(), StorageError> {
        if offset < 0 {
            return Err(StorageError::OutOfRange);
        }
        let local = self.resolve(path);
        let meta = fs::metadata(&local).await.map_err(not_found_or_io)?;
        if meta.is_dir() {
            return Err(StorageError::NotFound);
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .open(&local)
            .await
            .map_err(StorageError::io)?;
        file.seek(SeekFrom::Start(offset as u64))
            .await
            .map_err(StorageError::io)?;
        file.write_all(data).await.map_err(StorageError::io)?;
        file.flush().await.map_err(StorageError::io)?;
        Ok(())
    }

    /// Creates an empty file, with any missing parent directories. Returns
    /// `false` if the path is the root or the file already exists.
    pub async fn create(&self, path: &DfsPath) -> Result<bool, StorageError> {
        if path.is_root() {
            return Ok(false);
        }
        let local = self.resolve(path);
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).await.map_err(StorageError::io)?;
        }
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&local)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(StorageError::io(err)),
        }
    }

    /// Deletes a file or a directory subtree. Returns `false` if the path
    /// is the root or absent.
    pub async fn delete(&self, path: &DfsPath) -> Result<bool, StorageError> {
        if path.is_root() {
            return Ok(false);
        }
        let local = self.resolve(path);
        match fs::metadata(&local).await {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::io(err)),
            Ok(meta) if meta.is_dir() => {
                fs::remove_dir_all(&local).await.map_err(StorageError::io)?;
                Ok(true)
            }
            Ok(_) => {
                fs::remove_file(&local).await.map_err(StorageError::io)?;
                Ok(true)
            }
        }
    }

    /// Removes a duplicate reported at registration, then prunes every
    /// ancestor directory that the removal left empty.
    pub async fn remove_duplicate(&self, path: &DfsPath) -> Result<(), StorageError> {
        self.delete(path).await?;
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.is_root() {
                break;
            }
            // remove_dir refuses non-empty directories, which ends the walk.
            if fs::remove_dir(self.resolve(&dir)).await.is_err() {
                break;
            }
            debug!(directory = %dir, "pruned empty directory");
            current = dir.parent();
        }
        Ok(())
    }

    /// Walks the root and returns the relative path of every file, the
    /// inventory advertised at registration.
    pub async fn scan(&self) -> Result<Vec<DfsPath>, StorageError> {
        let mut inventory = Vec::new();
        let mut pending = vec![(self.root.clone(), DfsPath::root())];
        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(StorageError::io)?;
            while let Some(entry) = entries.next_entry().await.map_err(StorageError::io)? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let child = prefix
                    .child(&name)
                    .map_err(|e| StorageError::Io(format!("unrepresentable file name `{name}`: {e}")))?;
                let file_type = entry.file_type().await.map_err(StorageError::io)?;
                if file_type.is_dir() {
                    pending.push((entry.path(), child));
                } else {
                    inventory.push(child);
                }
            }
        }
        Ok(inventory)
    }
}

fn not_found_or_io(err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound
    } else {
        StorageError::io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> DfsPath {
        DfsPath::parse(s).unwrap()
    }

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_then_write_then_read() {
        let (_dir, store) = store();
        assert!(store.create(&p("/docs/report.txt")).await.unwrap());
        store.write(&p("/docs/report.txt"), 0, b"hello").await.unwrap();

        assert_eq!(store.size(&p("/docs/report.txt")).await.unwrap(), 5);
        assert_eq!(
            store.read(&p("/docs/report.txt"), 0, 5).await.unwrap(),
            b"hello"
        );
        assert_eq!(
            store.read(&p("/docs/report.txt"), 1, 3).await.unwrap(),
            b"ell"
        );
    }

    #[tokio::test]
    async fn test_create_is_a_no_op_on_root_and_existing_files() {
        let (_dir, store) = store();
        assert!(!store.create(&DfsPath::root()).await.unwrap());
        assert!(store.create(&p("/f")).await.unwrap());
        assert!(!store.create(&p("/f")).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_rejects_out_of_range() {
        let (_dir, store) = store();
        store.create(&p("/f")).await.unwrap();
        store.write(&p("/f"), 0, b"data").await.unwrap();

        assert_eq!(
            store.read(&p("/f"), 0, 5).await.unwrap_err(),
            StorageError::OutOfRange
        );
        assert_eq!(
            store.read(&p("/f"), -1, 1).await.unwrap_err(),
            StorageError::OutOfRange
        );
        assert_eq!(
            store.read(&p("/f"), 4, 1).await.unwrap_err(),
            StorageError::OutOfRange
        );
    }

    #[tokio::test]
    async fn test_write_rejects_negative_offset_and_missing_files() {
        let (_dir, store) = store();
        store.create(&p("/f")).await.unwrap();
        assert_eq!(
            store.write(&p("/f"), -1, b"x").await.unwrap_err(),
            StorageError::OutOfRange
        );
        assert_eq!(
            store.write(&p("/ghost"), 0, b"x").await.unwrap_err(),
            StorageError::NotFound
        );
    }

    #[tokio::test]
    async fn test_write_past_the_end_extends_the_file() {
        let (_dir, store) = store();
        store.create(&p("/f")).await.unwrap();
        store.write(&p("/f"), 3, b"xy").await.unwrap();
        assert_eq!(store.size(&p("/f")).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_size_of_directory_is_not_found() {
        let (_dir, store) = store();
        store.create(&p("/dir/f")).await.unwrap();
        assert_eq!(
            store.size(&p("/dir")).await.unwrap_err(),
            StorageError::NotFound
        );
    }

    #[tokio::test]
    async fn test_delete_recurses_and_reports_absent_targets() {
        let (_dir, store) = store();
        store.create(&p("/dir/a")).await.unwrap();
        store.create(&p("/dir/sub/b")).await.unwrap();

        assert!(store.delete(&p("/dir")).await.unwrap());
        assert!(!store.delete(&p("/dir")).await.unwrap());
        assert!(!store.delete(&DfsPath::root()).await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_lists_files_recursively() {
        let (_dir, store) = store();
        store.create(&p("/a")).await.unwrap();
        store.create(&p("/sub/b")).await.unwrap();
        store.create(&p("/sub/deeper/c")).await.unwrap();

        let mut inventory = store.scan().await.unwrap();
        inventory.sort();
        assert_eq!(inventory, vec![p("/a"), p("/sub/b"), p("/sub/deeper/c")]);
    }

    #[tokio::test]
    async fn test_remove_duplicate_prunes_empty_directories() {
        let (dir, store) = store();
        store.create(&p("/dup/only.txt")).await.unwrap();
        store.create(&p("/keep/other.txt")).await.unwrap();

        store.remove_duplicate(&p("/dup/only.txt")).await.unwrap();
        assert!(!dir.path().join("dup").exists());
        assert!(dir.path().join("keep/other.txt").exists());
    }
}
