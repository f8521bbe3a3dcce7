//! Scratch storage where inputs are staged for the signing tool.
//!
//! The signing tool only sees paths, so every implementation is rooted at a
//! directory. [`FsScratch`] is the real thing; [`MemoryScratch`] keeps bytes in
//! a map for tests that substitute the tool as well.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[async_trait]
pub trait ScratchStorage: Send + Sync {
    /// Directory holding the staged files.
    fn dir(&self) -> &Path;

    /// Make sure the directory exists.
    async fn prepare(&self) -> io::Result<()>;

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Scratch storage backed by a real directory.
#[derive(Debug, Clone)]
pub struct FsScratch {
    dir: PathBuf,
}

impl FsScratch {
    /// Root the scratch area at `dir`. A relative `dir` is resolved against the
    /// current directory here; the tool runs elsewhere and only sees absolute
    /// staged paths.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dir = std::path::absolute(&dir).unwrap_or(dir);
        Self { dir }
    }

    /// The platform temporary directory.
    pub fn temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl Default for FsScratch {
    fn default() -> Self {
        Self::temp_dir()
    }
}

#[async_trait]
impl ScratchStorage for FsScratch {
    fn dir(&self) -> &Path {
        &self.dir
    }

    async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    #[tracing::instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, bytes).await
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

/// In-memory scratch storage for tests.
#[derive(Debug)]
pub struct MemoryScratch {
    dir: PathBuf,
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryScratch {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Paths currently stored, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Synchronous read, convenient for fakes standing in for the tool.
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock().get(path).cloned()
    }

    /// Synchronous write, convenient for fakes standing in for the tool.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.lock().insert(path.into(), bytes.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        // A panic while holding the lock leaves the map itself intact.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_inside(&self, path: &Path) -> io::Result<()> {
        if path.starts_with(&self.dir) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is outside {}", path.display(), self.dir.display()),
            ))
        }
    }
}

#[async_trait]
impl ScratchStorage for MemoryScratch {
    fn dir(&self) -> &Path {
        &self.dir
    }

    async fn prepare(&self) -> io::Result<()> {
        Ok(())
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.check_inside(path)?;
        self.insert(path, bytes);
        Ok(())
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        self.lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}
