//! 上传目录：文件名约束、读写与批量清理。

use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::ErrorKind;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// 将文件名解析为上传目录下的路径，拒绝目录逃逸与符号链接。
    pub async fn resolve_file_checked(&self, name: &str) -> Result<PathBuf, StorageError> {
        let target = self.resolve(name)?;
        match fs::symlink_metadata(&target).await {
            Ok(metadata) if metadata.file_type().is_symlink() || metadata.is_dir() => {
                Err(StorageError::InvalidPath)
            }
            Ok(_) => Ok(target),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(target),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Only a single normal path component is accepted.
    fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(segment)), None) if !name.contains(['/', '\\']) => {
                Ok(self.root.join(segment))
            }
            _ => Err(StorageError::InvalidPath),
        }
    }

    pub async fn write_file(&self, name: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
        let target = self.resolve_file_checked(name).await?;
        fs::write(&target, data).await?;
        Ok(target)
    }

    pub async fn read_text(&self, name: &str) -> Result<String, StorageError> {
        let target = self.resolve_file_checked(name).await?;
        let bytes = fs::read(&target).await?;
        String::from_utf8(bytes).map_err(|err| {
            StorageError::Io(io::Error::new(ErrorKind::InvalidData, err.to_string()))
        })
    }

    /// 尽力删除上传目录中的全部条目；单个失败仅记录日志。
    pub async fn clear_all(&self) -> Result<ClearReport, StorageError> {
        self.clear_all_with(remove_entry).await
    }

    /// Only a missing or unreadable root is an error; everything after the
    /// first listing is counted in the report.
    async fn clear_all_with<F, Fut>(&self, remove: F) -> Result<ClearReport, StorageError>
    where
        F: Fn(PathBuf, bool) -> Fut,
        Fut: Future<Output = io::Result<()>>,
    {
        let mut dir = fs::read_dir(&self.root).await?;
        let mut report = ClearReport::default();

        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "failed to list uploads folder, stopping clear");
                    report.failed += 1;
                    break;
                }
            };
            let path = entry.path();
            let result = match entry.file_type().await {
                Ok(file_type) => remove(path.clone(), file_type.is_dir()).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(()) => report.removed += 1,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to delete file");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

async fn remove_entry(path: PathBuf, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    }
}

#[derive(Debug)]
pub enum StorageError {
    InvalidPath,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub removed: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::{ClearReport, Storage, StorageError};
    use std::io::ErrorKind;
    use tempfile::tempdir;

    fn make_storage() -> (tempfile::TempDir, Storage) {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("uploads");
        std::fs::create_dir_all(&root).expect("create uploads root");
        (temp, Storage::new(root))
    }

    #[tokio::test]
    async fn resolve_rejects_escape_sequences() {
        let (_temp, storage) = make_storage();
        for name in ["", ".", "..", "../secret.txt", "a/b.txt", "a\\b.txt", "/etc/passwd"] {
            let result = storage.resolve_file_checked(name).await;
            assert!(
                matches!(result, Err(StorageError::InvalidPath)),
                "{name:?} should be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_rejects_symlink() {
        use std::os::unix::fs::symlink;

        let (temp, storage) = make_storage();
        let outside = temp.path().join("outside.txt");
        std::fs::write(&outside, b"secret").expect("write outside file");
        symlink(&outside, storage.root_path().join("link")).expect("symlink");

        let result = storage.resolve_file_checked("link").await;
        assert!(matches!(result, Err(StorageError::InvalidPath)));
    }

    #[tokio::test]
    async fn write_then_read_overwrites_same_name() {
        let (_temp, storage) = make_storage();
        storage.write_file("notes.txt", b"first").await.expect("write");
        storage.write_file("notes.txt", b"second").await.expect("overwrite");
        let text = storage.read_text("notes.txt").await.expect("read");
        assert_eq!(text, "second");
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let (_temp, storage) = make_storage();
        match storage.read_text("absent.txt").await {
            Err(StorageError::Io(err)) => assert_eq!(err.kind(), ErrorKind::NotFound),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_invalid_utf8_is_invalid_data() {
        let (_temp, storage) = make_storage();
        std::fs::write(storage.root_path().join("blob.bin"), [0xff, 0xfe, 0xfd])
            .expect("write blob");
        match storage.read_text("blob.bin").await {
            Err(StorageError::Io(err)) => assert_eq!(err.kind(), ErrorKind::InvalidData),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn clear_all_removes_every_entry() {
        let (_temp, storage) = make_storage();
        for name in ["a.txt", "b.bin", "leaderboard.json"] {
            storage.write_file(name, b"x").await.expect("write");
        }
        std::fs::create_dir_all(storage.root_path().join("nested")).expect("nested dir");

        let report = storage.clear_all().await.expect("clear");
        assert_eq!(
            report,
            ClearReport {
                removed: 4,
                failed: 0
            }
        );
        let remaining = std::fs::read_dir(storage.root_path())
            .expect("read dir")
            .count();
        assert_eq!(remaining, 0);
        assert!(storage.root_path().exists(), "root itself is kept");
    }

    #[tokio::test]
    async fn clear_all_skips_failed_deletes() {
        let (_temp, storage) = make_storage();
        for name in ["a.txt", "b.txt", "c.txt"] {
            storage.write_file(name, b"x").await.expect("write");
        }

        let report = storage
            .clear_all_with(|path, is_dir| async move {
                if path.file_name().is_some_and(|name| name == "b.txt") {
                    return Err(std::io::Error::from(ErrorKind::PermissionDenied));
                }
                super::remove_entry(path, is_dir).await
            })
            .await
            .expect("clear");

        assert_eq!(
            report,
            ClearReport {
                removed: 2,
                failed: 1
            }
        );
        assert!(storage.root_path().join("b.txt").exists());
        assert!(!storage.root_path().join("a.txt").exists());
        assert!(!storage.root_path().join("c.txt").exists());
    }

    #[tokio::test]
    async fn clear_all_missing_root_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::new(temp.path().join("missing"));
        match storage.clear_all().await {
            Err(StorageError::Io(err)) => assert_eq!(err.kind(), ErrorKind::NotFound),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
