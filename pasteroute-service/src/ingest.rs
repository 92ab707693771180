use std::{fmt, sync::Arc};

use chrono::Local;
use pasteroute_core::{
    Classified, ClipboardEntry, FileMetadata, PastePayload, PayloadClass, SupportedExtensions,
    classify, classify_payload, clean_pasted_text, image_blob_name, now_unix_ms,
};
use tracing::{debug, error, warn};

use crate::{
    host::PasteEvent,
    temp_store::{MaterializeError, TempFileStore},
};

pub type FilesAddedCallback = Arc<dyn Fn(Vec<FileMetadata>) + Send + Sync>;
pub type TextPasteCallback = Arc<dyn Fn(String) + Send + Sync>;

/// What one paste payload turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    /// Text-only paste, already cleaned.
    Text(String),
    /// A file list was present; holds whatever survived filtering (maybe nothing).
    Files(Vec<FileMetadata>),
    Nothing,
}

#[derive(Clone)]
pub struct IngestPipeline {
    store: Arc<dyn TempFileStore>,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn TempFileStore>) -> Self {
        Self { store }
    }

    pub async fn ingest(
        &self,
        payload: &PastePayload,
        supported: &SupportedExtensions,
    ) -> Ingested {
        match classify_payload(payload) {
            PayloadClass::PlainText(text) => Ingested::Text(clean_pasted_text(text).to_owned()),
            PayloadClass::Files(entries) => {
                Ingested::Files(self.ingest_files(entries, supported).await)
            }
            PayloadClass::Empty => Ingested::Nothing,
        }
    }

    /// Runs one paste through the pipeline and reports whether it was consumed.
    ///
    /// The event stops propagating immediately so a document-level listener
    /// does not process the same paste a second time.
    pub async fn handle_paste(
        &self,
        event: &PasteEvent,
        supported: &SupportedExtensions,
        on_files_added: &(dyn Fn(Vec<FileMetadata>) + Send + Sync),
        on_text_paste: Option<&(dyn Fn(String) + Send + Sync)>,
    ) -> bool {
        event.stop_propagation();

        match self.ingest(event.payload(), supported).await {
            Ingested::Text(text) => match on_text_paste {
                Some(on_text_paste) => {
                    on_text_paste(text);
                    true
                }
                None => false,
            },
            Ingested::Files(files) => {
                if !files.is_empty() {
                    on_files_added(files);
                }
                // A file list was present, so the paste counts as consumed
                // even when every entry was filtered out.
                true
            }
            Ingested::Nothing => false,
        }
    }

    pub async fn ingest_files(
        &self,
        entries: &[ClipboardEntry],
        supported: &SupportedExtensions,
    ) -> Vec<FileMetadata> {
        let mut accepted = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let classified = classify(entry);
            if !supported.contains(classified.extension()) {
                warn!(
                    index,
                    kind = classified.kind(),
                    mime = %entry.mime,
                    name = entry.file_name().unwrap_or(""),
                    extension = classified.extension(),
                    "skipping unsupported clipboard entry"
                );
                continue;
            }

            match self.accept(&classified).await {
                Ok(Some(metadata)) => accepted.push(metadata),
                Ok(None) => warn!(index, "temp store allocated no path; entry skipped"),
                Err(err) => error!(index, error = %err, "failed to materialize clipboard entry"),
            }
        }
        accepted
    }

    async fn accept(
        &self,
        classified: &Classified<'_>,
    ) -> Result<Option<FileMetadata>, MaterializeError> {
        match classified {
            Classified::NamedFile { entry, path, .. } => Ok(Some(FileMetadata {
                name: entry.file_name().unwrap_or_default().to_owned(),
                path: path.to_path_buf(),
                size: entry.size,
                mime: entry.mime.clone(),
                last_modified: entry.last_modified_ms,
            })),
            Classified::ImageBlob { entry, extension } => {
                let name = image_blob_name(entry.file_name(), &Local::now(), extension);
                self.materialize(entry, name).await
            }
            Classified::BinaryBlob { entry, .. } => {
                let name = entry.file_name().unwrap_or_default().to_owned();
                self.materialize(entry, name).await
            }
        }
    }

    async fn materialize(
        &self,
        entry: &ClipboardEntry,
        name: String,
    ) -> Result<Option<FileMetadata>, MaterializeError> {
        let Some(path) = self.store.create_temp_file(&name).await? else {
            return Ok(None);
        };
        self.store.write_file(&path, entry.data.clone()).await?;
        debug!(
            name = %name,
            path = %path.display(),
            bytes = entry.data.len(),
            "materialized clipboard entry"
        );

        // The store may have sanitized the name; report what is on disk.
        let name = path
            .file_name()
            .and_then(|stored| stored.to_str())
            .map(str::to_owned)
            .unwrap_or(name);
        Ok(Some(FileMetadata {
            name,
            path,
            size: entry.size,
            mime: entry.mime.clone(),
            last_modified: now_unix_ms(),
        }))
    }
}

impl fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestPipeline").finish_non_exhaustive()
    }
}
