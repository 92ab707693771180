use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use futures::future::BoxFuture;
use pasteroute_core::{ClipboardEntry, FileMetadata, RegionId, SupportedExtensions};
use tracing::{debug, info, trace};

use crate::{
    host::{HostDocument, ListenerId, PasteEvent, PasteListener},
    ingest::IngestPipeline,
    temp_store::TempFileStore,
};

/// Paste callback of one input region. Resolves to `true` when it consumed
/// the event.
pub trait PasteHandler: Send + Sync {
    fn handle(&self, event: Arc<PasteEvent>) -> BoxFuture<'static, bool>;
}

impl<F, Fut> PasteHandler for F
where
    F: Fn(Arc<PasteEvent>) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send + 'static,
{
    fn handle(&self, event: Arc<PasteEvent>) -> BoxFuture<'static, bool> {
        Box::pin(self(event))
    }
}

/// Identifies one registration of a handler under a region id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    NoFocusedRegion,
    NoHandler,
    Declined,
    Consumed,
}

struct RegisteredHandler {
    generation: Generation,
    handler: Arc<dyn PasteHandler>,
}

#[derive(Default)]
struct CoordinatorState {
    handlers: HashMap<RegionId, RegisteredHandler>,
    last_focused: Option<RegionId>,
    next_generation: u64,
    attached: Option<(HostDocument, ListenerId)>,
}

/// Routes document-level pastes to the handler of the last focused region.
///
/// Cloning is cheap; every clone shares the same registries.
#[derive(Clone)]
pub struct PasteCoordinator {
    inner: Arc<Mutex<CoordinatorState>>,
    pipeline: IngestPipeline,
}

impl PasteCoordinator {
    pub fn new(store: Arc<dyn TempFileStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CoordinatorState::default())),
            pipeline: IngestPipeline::new(store),
        }
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.pipeline
    }

    /// Attaches the single document listener. Returns `false` when already
    /// attached.
    pub fn init(&self, host: &HostDocument) -> bool {
        let mut state = self.state();
        if state.attached.is_some() {
            debug!("paste coordinator already initialized");
            return false;
        }
        let listener = Arc::new(DispatchListener {
            state: Arc::downgrade(&self.inner),
        });
        let id = host.add_paste_listener(listener);
        state.attached = Some((host.clone(), id));
        info!("paste coordinator attached to host document");
        true
    }

    /// Detaches the listener and forgets every handler and the focus, so a
    /// later `init` starts clean.
    pub fn destroy(&self) {
        let attached = {
            let mut state = self.state();
            state.handlers.clear();
            state.last_focused = None;
            state.attached.take()
        };
        if let Some((host, id)) = attached {
            host.remove_paste_listener(id);
            info!("paste coordinator detached from host document");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state().attached.is_some()
    }

    pub fn register_handler<H>(&self, region_id: impl Into<RegionId>, handler: H) -> Generation
    where
        H: PasteHandler + 'static,
    {
        let region_id = region_id.into();
        let mut state = self.state();
        state.next_generation += 1;
        let generation = Generation(state.next_generation);
        let replaced = state
            .handlers
            .insert(
                region_id.clone(),
                RegisteredHandler {
                    generation,
                    handler: Arc::new(handler),
                },
            )
            .is_some();
        debug!(region = %region_id, replaced, "registered paste handler");
        generation
    }

    pub fn unregister_handler(&self, region_id: &str) {
        if self.state().handlers.remove(region_id).is_some() {
            debug!(region = %region_id, "unregistered paste handler");
        }
    }

    /// Removes the handler only if it is still the registration identified by
    /// `generation`.
    pub fn release_handler(&self, region_id: &str, generation: Generation) -> bool {
        let mut state = self.state();
        let current = state
            .handlers
            .get(region_id)
            .is_some_and(|registered| registered.generation == generation);
        if current {
            state.handlers.remove(region_id);
            debug!(region = %region_id, "released paste handler");
        }
        current
    }

    pub fn has_handler(&self, region_id: &str) -> bool {
        self.state().handlers.contains_key(region_id)
    }

    pub fn set_last_focused_component(&self, region_id: impl Into<RegionId>) {
        let region_id = region_id.into();
        trace!(region = %region_id, "paste focus moved");
        self.state().last_focused = Some(region_id);
    }

    pub fn last_focused_component(&self) -> Option<RegionId> {
        self.state().last_focused.clone()
    }

    pub async fn dispatch(&self, event: Arc<PasteEvent>) -> DispatchOutcome {
        dispatch_event(&self.inner, event).await
    }

    pub async fn handle_paste(
        &self,
        event: &PasteEvent,
        supported: &SupportedExtensions,
        on_files_added: &(dyn Fn(Vec<FileMetadata>) + Send + Sync),
        on_text_paste: Option<&(dyn Fn(String) + Send + Sync)>,
    ) -> bool {
        self.pipeline
            .handle_paste(event, supported, on_files_added, on_text_paste)
            .await
    }

    /// Drag-and-drop of a file list; same filtering and materialization as a
    /// pasted file list.
    pub async fn ingest_drop(
        &self,
        entries: &[ClipboardEntry],
        supported: &SupportedExtensions,
    ) -> Vec<FileMetadata> {
        self.pipeline.ingest_files(entries, supported).await
    }

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        lock(&self.inner)
    }
}

impl fmt::Debug for PasteCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("PasteCoordinator")
            .field("handlers", &state.handlers.len())
            .field("last_focused", &state.last_focused)
            .field("initialized", &state.attached.is_some())
            .finish()
    }
}

struct DispatchListener {
    state: Weak<Mutex<CoordinatorState>>,
}

impl PasteListener for DispatchListener {
    fn on_paste(&self, event: Arc<PasteEvent>) -> BoxFuture<'static, ()> {
        let state = self.state.clone();
        Box::pin(async move {
            let Some(state) = state.upgrade() else {
                return;
            };
            let outcome = dispatch_event(&state, event).await;
            trace!(?outcome, "document paste dispatched");
        })
    }
}

async fn dispatch_event(
    state: &Mutex<CoordinatorState>,
    event: Arc<PasteEvent>,
) -> DispatchOutcome {
    let (region_id, handler) = {
        let state = lock(state);
        let Some(region_id) = state.last_focused.clone() else {
            return DispatchOutcome::NoFocusedRegion;
        };
        let Some(registered) = state.handlers.get(&region_id) else {
            debug!(region = %region_id, "no paste handler for focused region");
            return DispatchOutcome::NoHandler;
        };
        (region_id, Arc::clone(&registered.handler))
    };

    let handled = handler.handle(Arc::clone(&event)).await;
    if handled {
        event.prevent_default();
        event.stop_propagation();
        debug!(region = %region_id, "paste consumed by focused region");
        DispatchOutcome::Consumed
    } else {
        debug!(region = %region_id, "paste declined; default behavior proceeds");
        DispatchOutcome::Declined
    }
}

fn lock(state: &Mutex<CoordinatorState>) -> MutexGuard<'_, CoordinatorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
