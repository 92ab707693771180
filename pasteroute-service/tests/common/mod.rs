#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use futures::future::BoxFuture;
use pasteroute_core::FileMetadata;
use pasteroute_service::{MaterializeError, TempFileStore};

/// In-memory temp store that can refuse or fail selected names.
#[derive(Default)]
pub struct MemoryStore {
    pub written: Mutex<HashMap<PathBuf, Bytes>>,
    pub refuse: HashSet<String>,
    pub fail_create: HashSet<String>,
    pub fail_write: HashSet<String>,
}

impl MemoryStore {
    pub fn refusing(name: &str) -> Self {
        Self {
            refuse: HashSet::from([name.to_owned()]),
            ..Self::default()
        }
    }

    pub fn failing_create(name: &str) -> Self {
        Self {
            fail_create: HashSet::from([name.to_owned()]),
            ..Self::default()
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail_write: HashSet::from([name.to_owned()]),
            ..Self::default()
        }
    }

    pub fn bytes_at(&self, path: &Path) -> Option<Bytes> {
        self.written.lock().unwrap().get(path).cloned()
    }
}

impl TempFileStore for MemoryStore {
    fn create_temp_file<'a>(
        &'a self,
        file_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<PathBuf>, MaterializeError>> {
        Box::pin(async move {
            if self.fail_create.contains(file_name) {
                return Err(MaterializeError::Rejected(file_name.to_owned()));
            }
            if self.refuse.contains(file_name) {
                return Ok(None);
            }
            Ok(Some(PathBuf::from("/mem").join(file_name)))
        })
    }

    fn write_file<'a>(
        &'a self,
        path: &'a Path,
        data: Bytes,
    ) -> BoxFuture<'a, Result<(), MaterializeError>> {
        Box::pin(async move {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            if self.fail_write.contains(name) {
                return Err(MaterializeError::Rejected(name.to_owned()));
            }
            self.written.lock().unwrap().insert(path.to_path_buf(), data);
            Ok(())
        })
    }
}

/// Collects every batch handed to a files-added callback.
#[derive(Clone, Default)]
pub struct Batches(pub Arc<Mutex<Vec<Vec<FileMetadata>>>>);

impl Batches {
    pub fn callback(&self) -> impl Fn(Vec<FileMetadata>) + Send + Sync + 'static {
        let inner = Arc::clone(&self.0);
        move |files| inner.lock().unwrap().push(files)
    }

    pub fn all(&self) -> Vec<Vec<FileMetadata>> {
        self.0.lock().unwrap().clone()
    }
}

/// Collects every text handed to a text-paste callback.
#[derive(Clone, Default)]
pub struct Texts(pub Arc<Mutex<Vec<String>>>);

impl Texts {
    pub fn callback(&self) -> impl Fn(String) + Send + Sync + 'static {
        let inner = Arc::clone(&self.0);
        move |text| inner.lock().unwrap().push(text)
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
