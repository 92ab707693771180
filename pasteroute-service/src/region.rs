use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use pasteroute_core::{
    ClipboardEntry, CoreError, FileMetadata, PastePayload, RegionId, SupportedExtensions,
    validate_region_id,
};
use tracing::debug;

use crate::{
    coordinator::{Generation, PasteCoordinator},
    host::{HostDocument, PasteEvent},
    ingest::{FilesAddedCallback, IngestPipeline, TextPasteCallback},
};

/// What a mounted input region accepts and where accepted content goes.
#[derive(Clone)]
pub struct RegionOptions {
    pub supported_extensions: SupportedExtensions,
    pub on_files_added: FilesAddedCallback,
    pub on_text_paste: Option<TextPasteCallback>,
}

impl RegionOptions {
    pub fn new(on_files_added: impl Fn(Vec<FileMetadata>) + Send + Sync + 'static) -> Self {
        Self {
            supported_extensions: SupportedExtensions::default(),
            on_files_added: Arc::new(on_files_added),
            on_text_paste: None,
        }
    }

    pub fn with_extensions(mut self, supported_extensions: SupportedExtensions) -> Self {
        self.supported_extensions = supported_extensions;
        self
    }

    pub fn with_text_paste(
        mut self,
        on_text_paste: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        self.on_text_paste = Some(Arc::new(on_text_paste));
        self
    }
}

struct RegionShared {
    id: RegionId,
    alive: AtomicBool,
    options: RegionOptions,
}

impl RegionShared {
    async fn handle(&self, pipeline: &IngestPipeline, event: &PasteEvent) -> bool {
        let on_files_added = |files: Vec<FileMetadata>| {
            if self.alive.load(Ordering::Acquire) {
                (self.options.on_files_added)(files);
            } else {
                debug!(
                    region = %self.id,
                    count = files.len(),
                    "region unmounted; dropping ingested files"
                );
            }
        };
        let on_text_paste = |text: String| {
            if let Some(callback) = &self.options.on_text_paste
                && self.alive.load(Ordering::Acquire)
            {
                callback(text);
            }
        };
        let text_callback: Option<&(dyn Fn(String) + Send + Sync)> =
            match self.options.on_text_paste {
                Some(_) => Some(&on_text_paste),
                None => None,
            };

        pipeline
            .handle_paste(
                event,
                &self.options.supported_extensions,
                &on_files_added,
                text_callback,
            )
            .await
    }

    fn deliver_files(&self, files: Vec<FileMetadata>) {
        if files.is_empty() {
            return;
        }
        if self.alive.load(Ordering::Acquire) {
            (self.options.on_files_added)(files);
        } else {
            debug!(
                region = %self.id,
                count = files.len(),
                "region unmounted; discarding dropped files"
            );
        }
    }
}

/// One mounted input region (a send box). Registers its paste handler on
/// mount and releases it when dropped.
pub struct PasteRegion {
    coordinator: PasteCoordinator,
    generation: Generation,
    shared: Arc<RegionShared>,
}

impl PasteRegion {
    pub fn mount(
        coordinator: &PasteCoordinator,
        id: impl Into<RegionId>,
        options: RegionOptions,
    ) -> Result<Self, CoreError> {
        let id = id.into();
        validate_region_id(&id)?;

        let shared = Arc::new(RegionShared {
            id: id.clone(),
            alive: AtomicBool::new(true),
            options,
        });
        let handler_shared = Arc::clone(&shared);
        let pipeline = coordinator.pipeline().clone();
        let generation = coordinator.register_handler(id, move |event: Arc<PasteEvent>| {
            let shared = Arc::clone(&handler_shared);
            let pipeline = pipeline.clone();
            async move { shared.handle(&pipeline, &event).await }
        });

        Ok(Self {
            coordinator: coordinator.clone(),
            generation,
            shared,
        })
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn focus(&self) {
        self.coordinator
            .set_last_focused_component(self.shared.id.clone());
    }

    /// Element-level paste: the region handles it first, then the event
    /// bubbles to the document unless the region stopped it.
    pub async fn paste(&self, host: &HostDocument, payload: PastePayload) -> Arc<PasteEvent> {
        let event = Arc::new(PasteEvent::new(payload));
        if self.shared.handle(self.coordinator.pipeline(), &event).await {
            event.prevent_default();
        }
        host.deliver(Arc::clone(&event)).await;
        event
    }

    /// Drag-and-drop onto the region. Returns how many files were accepted.
    pub async fn drop_files(&self, entries: Vec<ClipboardEntry>) -> usize {
        let files = self
            .coordinator
            .ingest_drop(&entries, &self.shared.options.supported_extensions)
            .await;
        let accepted = files.len();
        self.shared.deliver_files(files);
        accepted
    }
}

impl Drop for PasteRegion {
    fn drop(&mut self) {
        self.shared.alive.store(false, Ordering::Release);
        self.coordinator
            .release_handler(&self.shared.id, self.generation);
    }
}
