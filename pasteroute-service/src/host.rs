use std::{
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use pasteroute_core::PastePayload;
use tracing::trace;

/// A paste as seen by the host surface. Listeners record the platform's
/// prevention primitives on it instead of acting on a real document.
#[derive(Debug)]
pub struct PasteEvent {
    payload: PastePayload,
    default_prevented: AtomicBool,
    propagation_stopped: AtomicBool,
    immediate_propagation_stopped: AtomicBool,
}

impl PasteEvent {
    pub fn new(payload: PastePayload) -> Self {
        Self {
            payload,
            default_prevented: AtomicBool::new(false),
            propagation_stopped: AtomicBool::new(false),
            immediate_propagation_stopped: AtomicBool::new(false),
        }
    }

    pub fn payload(&self) -> &PastePayload {
        &self.payload
    }

    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::Release);
    }

    /// Keeps an element-level event from bubbling to the document. Other
    /// listeners on the same document still run.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.store(true, Ordering::Release);
    }

    /// Also skips the remaining listeners of the current target.
    pub fn stop_immediate_propagation(&self) {
        self.immediate_propagation_stopped.store(true, Ordering::Release);
        self.stop_propagation();
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::Acquire)
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.load(Ordering::Acquire)
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped.load(Ordering::Acquire)
    }
}

pub trait PasteListener: Send + Sync {
    fn on_paste(&self, event: Arc<PasteEvent>) -> BoxFuture<'static, ()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct HostState {
    next_id: u64,
    listeners: Vec<(ListenerId, Arc<dyn PasteListener>)>,
}

/// Document-level paste listener list of the hosting surface.
#[derive(Clone, Default)]
pub struct HostDocument {
    inner: Arc<Mutex<HostState>>,
}

impl HostDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_paste_listener(&self, listener: Arc<dyn PasteListener>) -> ListenerId {
        let mut state = self.state();
        state.next_id += 1;
        let id = ListenerId(state.next_id);
        state.listeners.push((id, listener));
        id
    }

    pub fn remove_paste_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state();
        let before = state.listeners.len();
        state.listeners.retain(|(existing, _)| *existing != id);
        state.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    /// Fires a paste event whose target is the document itself and returns
    /// it once every listener has finished.
    pub async fn fire_paste(&self, payload: PastePayload) -> Arc<PasteEvent> {
        let event = Arc::new(PasteEvent::new(payload));
        self.run_listeners(&event).await;
        event
    }

    /// Bubbles an event that an element has already seen. It never reaches
    /// the document if the element stopped propagation.
    pub async fn deliver(&self, event: Arc<PasteEvent>) {
        if event.propagation_stopped() {
            trace!("paste propagation stopped before reaching the document");
            return;
        }
        self.run_listeners(&event).await;
    }

    async fn run_listeners(&self, event: &Arc<PasteEvent>) {
        let listeners = self
            .state()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect::<Vec<_>>();

        for listener in listeners {
            listener.on_paste(Arc::clone(event)).await;
            if event.immediate_propagation_stopped() {
                trace!("remaining document paste listeners skipped");
                break;
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for HostDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostDocument")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
