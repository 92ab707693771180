//! Paste and drag-and-drop routing for chat input regions.
//!
//! A [`PasteCoordinator`] owns the handler registry and the focus slot, attaches
//! one listener to a [`HostDocument`], and feeds clipboard payloads through the
//! [`IngestPipeline`], which materializes in-memory blobs via a [`TempFileStore`].

mod coordinator;
mod host;
mod ingest;
mod region;
mod temp_store;

pub use coordinator::{DispatchOutcome, Generation, PasteCoordinator, PasteHandler};
pub use host::{HostDocument, ListenerId, PasteEvent, PasteListener};
pub use ingest::{FilesAddedCallback, IngestPipeline, Ingested, TextPasteCallback};
pub use region::{PasteRegion, RegionOptions};
pub use temp_store::{
    FALLBACK_FILE_NAME, FsTempFileStore, MAX_TEMP_FILE_NAME_LEN, MaterializeError, TempFileStore,
    sanitize_file_name,
};
