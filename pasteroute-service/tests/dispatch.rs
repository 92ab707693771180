mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use pasteroute_core::PastePayload;
use pasteroute_service::{DispatchOutcome, HostDocument, PasteCoordinator, PasteEvent};

use common::MemoryStore;

fn coordinator() -> PasteCoordinator {
    PasteCoordinator::new(Arc::new(MemoryStore::default()))
}

fn counting_handler(
    counter: &Arc<AtomicUsize>,
    handled: bool,
) -> impl Fn(Arc<PasteEvent>) -> std::future::Ready<bool> + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move |_event| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(handled)
    }
}

#[tokio::test]
async fn paste_reaches_only_the_focused_region() {
    let coordinator = coordinator();
    let host = HostDocument::new();
    assert!(coordinator.init(&host));

    let a = Arc::new(AtomicUsize::new(0));
    let b = Arc::new(AtomicUsize::new(0));
    coordinator.register_handler("sendbox-a", counting_handler(&a, true));
    coordinator.register_handler("sendbox-b", counting_handler(&b, true));

    coordinator.set_last_focused_component("sendbox-b");
    let event = host.fire_paste(PastePayload::text("hi")).await;

    assert_eq!(a.load(Ordering::SeqCst), 0);
    assert_eq!(b.load(Ordering::SeqCst), 1);
    assert!(event.default_prevented());
    assert!(event.propagation_stopped());

    coordinator.set_last_focused_component("sendbox-a");
    host.fire_paste(PastePayload::text("again")).await;
    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn paste_without_focus_is_left_to_the_platform() {
    let coordinator = coordinator();
    let calls = Arc::new(AtomicUsize::new(0));
    coordinator.register_handler("sendbox", counting_handler(&calls, true));

    let event = Arc::new(PasteEvent::new(PastePayload::text("hi")));
    let outcome = coordinator.dispatch(Arc::clone(&event)).await;

    assert_eq!(outcome, DispatchOutcome::NoFocusedRegion);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!event.default_prevented());
}

#[tokio::test]
async fn unregistered_region_falls_through() {
    let coordinator = coordinator();
    let calls = Arc::new(AtomicUsize::new(0));
    coordinator.register_handler("sendbox", counting_handler(&calls, true));
    coordinator.set_last_focused_component("sendbox");

    coordinator.unregister_handler("sendbox");
    coordinator.unregister_handler("never-registered");

    let event = Arc::new(PasteEvent::new(PastePayload::text("hi")));
    assert_eq!(
        coordinator.dispatch(Arc::clone(&event)).await,
        DispatchOutcome::NoHandler
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!event.default_prevented());
    assert_eq!(
        coordinator.last_focused_component().as_deref(),
        Some("sendbox")
    );
}

#[tokio::test]
async fn declined_paste_keeps_default_behavior() {
    let coordinator = coordinator();
    let calls = Arc::new(AtomicUsize::new(0));
    coordinator.register_handler("sendbox", counting_handler(&calls, false));
    coordinator.set_last_focused_component("sendbox");

    let event = Arc::new(PasteEvent::new(PastePayload::text("hi")));
    assert_eq!(
        coordinator.dispatch(Arc::clone(&event)).await,
        DispatchOutcome::Declined
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!event.default_prevented());
    assert!(!event.propagation_stopped());
}

#[tokio::test]
async fn re_registration_replaces_previous_handler() {
    let coordinator = coordinator();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let stale = coordinator.register_handler("sendbox", counting_handler(&first, true));
    coordinator.register_handler("sendbox", counting_handler(&second, true));
    coordinator.set_last_focused_component("sendbox");

    // The older registration must not evict the newer one.
    assert!(!coordinator.release_handler("sendbox", stale));
    assert!(coordinator.has_handler("sendbox"));

    coordinator
        .dispatch(Arc::new(PasteEvent::new(PastePayload::text("hi"))))
        .await;
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn init_twice_attaches_a_single_listener() {
    let coordinator = coordinator();
    let host = HostDocument::new();
    assert!(coordinator.init(&host));
    assert!(!coordinator.init(&host));
    assert_eq!(host.listener_count(), 1);

    let calls = Arc::new(AtomicUsize::new(0));
    coordinator.register_handler("sendbox", counting_handler(&calls, false));
    coordinator.set_last_focused_component("sendbox");

    host.fire_paste(PastePayload::text("hi")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn destroy_detaches_and_clears_then_allows_reinit() {
    let coordinator = coordinator();
    let host = HostDocument::new();
    coordinator.init(&host);

    let calls = Arc::new(AtomicUsize::new(0));
    coordinator.register_handler("sendbox", counting_handler(&calls, true));
    coordinator.set_last_focused_component("sendbox");

    coordinator.destroy();
    assert!(!coordinator.is_initialized());
    assert_eq!(host.listener_count(), 0);
    assert!(!coordinator.has_handler("sendbox"));
    assert_eq!(coordinator.last_focused_component(), None);

    let event = host.fire_paste(PastePayload::text("hi")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!event.default_prevented());

    assert!(coordinator.init(&host));
    assert_eq!(host.listener_count(), 1);
}

#[tokio::test]
async fn destroy_without_init_is_harmless() {
    let coordinator = coordinator();
    coordinator.destroy();
    assert!(!coordinator.is_initialized());
}
