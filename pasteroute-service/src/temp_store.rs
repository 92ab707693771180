use std::{
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use bytes::Bytes;
use futures::future::BoxFuture;
use pasteroute_core::now_unix_ms;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

pub const MAX_TEMP_FILE_NAME_LEN: usize = 128;
pub const FALLBACK_FILE_NAME: &str = "file.bin";

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("failed to create temp directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("path {} is outside the temp root", .0.display())]
    OutsideRoot(PathBuf),
    #[error("temp store rejected {0}")]
    Rejected(String),
}

/// Turns in-memory clipboard bytes into durable, path-addressable files.
///
/// `create_temp_file` may answer `Ok(None)` when it cannot allocate a path;
/// callers skip the entry in that case.
pub trait TempFileStore: Send + Sync {
    fn create_temp_file<'a>(
        &'a self,
        file_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<PathBuf>, MaterializeError>>;

    fn write_file<'a>(
        &'a self,
        path: &'a Path,
        data: Bytes,
    ) -> BoxFuture<'a, Result<(), MaterializeError>>;
}

/// Filesystem store. Every allocation gets its own hashed subdirectory so the
/// requested file name survives unchanged even when two pastes share it.
#[derive(Debug)]
pub struct FsTempFileStore {
    root: PathBuf,
    sequence: AtomicU64,
}

impl FsTempFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("pasteroute")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn allocation_dir(&self, file_name: &str) -> PathBuf {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let digest = Sha256::digest(
            format!(
                "{}:{}:{}:{}",
                std::process::id(),
                now_unix_ms(),
                sequence,
                file_name
            )
            .as_bytes(),
        );
        self.root.join(hex::encode(&digest[..16]))
    }
}

impl Default for FsTempFileStore {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

impl TempFileStore for FsTempFileStore {
    fn create_temp_file<'a>(
        &'a self,
        file_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<PathBuf>, MaterializeError>> {
        Box::pin(async move {
            let safe = sanitize_file_name(file_name);
            let dir = self.allocation_dir(&safe);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| MaterializeError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
            let path = dir.join(safe);
            debug!(path = %path.display(), "allocated temp file");
            Ok(Some(path))
        })
    }

    fn write_file<'a>(
        &'a self,
        path: &'a Path,
        data: Bytes,
    ) -> BoxFuture<'a, Result<(), MaterializeError>> {
        Box::pin(async move {
            if !path.starts_with(&self.root) {
                return Err(MaterializeError::OutsideRoot(path.to_path_buf()));
            }
            tokio::fs::write(path, &data)
                .await
                .map_err(|source| MaterializeError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            debug!(path = %path.display(), bytes = data.len(), "wrote temp file");
            Ok(())
        })
    }
}

pub fn sanitize_file_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return FALLBACK_FILE_NAME.to_string();
    }
    let mut out: String = trimmed
        .chars()
        .map(|ch| match ch {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    if out.len() > MAX_TEMP_FILE_NAME_LEN {
        let mut cut = MAX_TEMP_FILE_NAME_LEN;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_file_name("a/b\\c:d*.png"), "a_b_c_d_.png");
        assert_eq!(sanitize_file_name("tab\there.txt"), "tab_here.txt");
        assert_eq!(sanitize_file_name("   "), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_file_name(".."), FALLBACK_FILE_NAME);
    }

    #[test]
    fn sanitize_caps_length_on_char_boundary() {
        let long = "é".repeat(100);
        let out = sanitize_file_name(&long);
        assert!(out.len() <= MAX_TEMP_FILE_NAME_LEN);
        assert!(out.chars().all(|ch| ch == 'é'));
    }
}
