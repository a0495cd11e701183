//! Directory-backed store behind the REST file API
//!
//! Files live flat in one folder under a `<timestamp>_<sanitized name>` name.
//! Metadata is read from the filesystem on demand, so whatever is on disk is
//! what the API reports.

use chrono::{DateTime, Local, Utc};
use fs_err::tokio as fs;
use lazy_regex::regex;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::core::error::AppResult;

/// Metadata of a stored file, as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    /// ISO-8601
    pub created: String,
    /// ISO-8601
    pub modified: String,
}

/// Aggregate numbers for `/api/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_files: usize,
    pub total_size: u64,
    #[serde(rename = "totalSizeMB")]
    pub total_size_mb: f64,
}

impl StorageStats {
    pub fn from_files(files: &[StoredFile]) -> Self {
        let total_size: u64 = files.iter().map(|f| f.size).sum();
        Self {
            total_files: files.len(),
            total_size,
            total_size_mb: bytes_to_mb(total_size),
        }
    }
}

/// Megabytes rounded to two decimals.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Reduces an uploaded filename to a safe, flat name.
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`; whitespace becomes `_`;
/// leading dots are dropped so nothing hidden or relative can be produced.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let spaced = regex!(r"\s+").replace_all(base.trim(), "_");
    let cleaned = regex!(r"[^A-Za-z0-9._-]").replace_all(&spaced, "");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Whether a name taken from a URL can address a file in the store.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.starts_with('.')
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens the store, creating the folder if needed.
    pub async fn open(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Option<PathBuf> {
        is_valid_name(name).then(|| self.root.join(name))
    }

    /// Writes `bytes` under a unique timestamped name derived from `original_name`.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> AppResult<StoredFile> {
        let safe = sanitize_filename(original_name);
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        // create_new claims the name atomically; racing uploads move on to the next counter.
        let mut counter = 0u32;
        let (name, mut file) = loop {
            let name = match counter {
                0 => format!("{}_{}", stamp, safe),
                n => format!("{}_{}_{}", stamp, n, safe),
            };
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&name))
                .await
            {
                Ok(file) => break (name, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e.into()),
            }
        };

        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        log::info!("Stored {} ({} bytes)", name, bytes.len());

        let stored = self.info(&name).await?;
        Ok(stored.unwrap_or(StoredFile {
            name,
            size: bytes.len() as u64,
            created: Utc::now().to_rfc3339(),
            modified: Utc::now().to_rfc3339(),
        }))
    }

    /// Metadata of `name`, or `None` if it does not exist or is not addressable.
    pub async fn info(&self, name: &str) -> AppResult<Option<StoredFile>> {
        let Some(path) = self.path_of(name) else {
            return Ok(None);
        };
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !meta.is_file() {
            return Ok(None);
        }

        let modified: DateTime<Local> = meta.modified().map(DateTime::from).unwrap_or_else(|_| Local::now());
        let created: DateTime<Local> = meta.created().map(DateTime::from).unwrap_or(modified);

        Ok(Some(StoredFile {
            name: name.to_string(),
            size: meta.len(),
            created: created.to_rfc3339(),
            modified: modified.to_rfc3339(),
        }))
    }

    /// All files in the store, sorted by name.
    pub async fn list(&self) -> AppResult<Vec<StoredFile>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if let Some(info) = self.info(&name).await? {
                files.push(info);
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Contents of `name`, or `None` if absent.
    pub async fn read(&self, name: &str) -> AppResult<Option<Vec<u8>>> {
        let Some(path) = self.path_of(name) else {
            return Ok(None);
        };
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes `name`. Returns `false` if it did not exist.
    pub async fn delete(&self, name: &str) -> AppResult<bool> {
        if self.info(name).await?.is_none() {
            return Ok(false);
        }
        let Some(path) = self.path_of(name) else {
            return Ok(false);
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("Deleted stored file {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn stats(&self) -> AppResult<StorageStats> {
        Ok(StorageStats::from_files(&self.list().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("my holiday  photo.jpg"), "my_holiday_photo.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename(".env"), "env");
        assert_eq!(sanitize_filename("ünïcødé!.txt"), "ncd.txt");
        assert_eq!(sanitize_filename("///"), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("20240101_120000_report.pdf"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("../secret"));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name(".hidden"));
    }

    #[test]
    fn test_bytes_to_mb_rounds() {
        assert_eq!(bytes_to_mb(0), 0.0);
        assert_eq!(bytes_to_mb(1024 * 1024), 1.0);
        assert_eq!(bytes_to_mb(1_500_000), 1.43);
    }

    #[tokio::test]
    async fn test_save_list_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let saved = store.save("hello world.txt", b"hello").await.unwrap();
        assert!(saved.name.ends_with("_hello_world.txt"));
        assert_eq!(saved.size, 5);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, saved.name);

        assert_eq!(store.read(&saved.name).await.unwrap().unwrap(), b"hello".to_vec());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_size, 5);

        assert!(store.delete(&saved.name).await.unwrap());
        assert!(!store.delete(&saved.name).await.unwrap());
        assert!(store.info(&saved.name).await.unwrap().is_none());
        assert!(store.read(&saved.name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_second_uploads_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let a = store.save("same.txt", b"a").await.unwrap();
        let b = store.save("same.txt", b"b").await.unwrap();
        assert_ne!(a.name, b.name);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_of_one_name_keep_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let handles: Vec<_> = (0..32u8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { (i, store.save("same.txt", &[i; 1024]).await.unwrap()) })
            })
            .collect();

        let mut names = std::collections::HashSet::new();
        for handle in handles {
            let (i, saved) = handle.await.unwrap();
            assert_eq!(store.read(&saved.name).await.unwrap().unwrap(), vec![i; 1024]);
            names.insert(saved.name);
        }

        assert_eq!(names.len(), 32);
        assert_eq!(store.list().await.unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_traversal_names_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("inner")).await.unwrap();
        fs::write(dir.path().join("outside.txt"), b"x").await.unwrap();

        assert!(store.info("../outside.txt").await.unwrap().is_none());
        assert!(store.read("../outside.txt").await.unwrap().is_none());
        assert!(!store.delete("../outside.txt").await.unwrap());
        assert!(tokio::fs::try_exists(dir.path().join("outside.txt")).await.unwrap());
    }
}
