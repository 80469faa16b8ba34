use super::*;

use std::sync::atomic::AtomicUsize;

use domgraft_dom::MemoryDocument;
use domgraft_protocols::{
    Component, ComponentError, InsertPosition, MountedComponent,
};

use crate::boundary::FALLBACK_CLASS;
use crate::patch::Patch;
use crate::testing::{Broken, Clicker, Label};

fn setup() -> (Arc<MemoryDocument>, PatchEngine) {
    let doc = Arc::new(MemoryDocument::new());
    let engine = PatchEngine::new(doc.clone(), doc.clone());
    (doc, engine)
}

fn card(doc: &MemoryDocument, id: &str) -> NodeId {
    doc.element("article")
        .class("card")
        .attr("data-asset-id", id)
        .append_to(doc.body())
        .unwrap()
}

fn containers(doc: &MemoryDocument) -> Vec<NodeId> {
    doc.query_selector_all(doc.root(), "[data-domgraft-container]").unwrap()
}

fn patches(list: Vec<Patch>) -> Vec<Arc<PatchDescriptor>> {
    list.into_iter().map(|p| Arc::new(p.build().unwrap())).collect()
}

/// Puts a `<style>` into `<head>` and counts cleanups.
struct Styled {
    cleanups: Arc<AtomicUsize>,
}

struct NoopInstance;

impl MountedComponent for NoopInstance {}

impl Component for Styled {
    fn name(&self) -> &str {
        "styled"
    }

    fn render(&self, ctx: &MountContext<'_>) -> Result<Box<dyn MountedComponent>, ComponentError> {
        let doc = ctx.document();
        let head = doc.section("head").ok_or_else(|| ComponentError::Render("no head".into()))?;
        let style = doc.create_element("style");
        doc.set_text(style, ".card { outline: 1px solid }")?;
        doc.insert(head, style, InsertPosition::Append)?;
        ctx.track(style);

        let cleanups = self.cleanups.clone();
        ctx.on_cleanup(move |_doc| {
            cleanups.fetch_add(1, Ordering::SeqCst);
        });
        Ok(Box::new(NoopInstance))
    }
}

#[test]
fn test_first_mode_mounts_once() {
    let (doc, engine) = setup();
    let first = card(&doc, "a1");
    card(&doc, "a2");

    engine
        .apply("badges", &patches(vec![Patch::selector(".card").component(Label::new("hi"))]))
        .unwrap();

    assert_eq!(engine.state("badges"), PatchState::Applied);
    assert_eq!(engine.mounted_anchors("badges"), vec![first]);
    let container = engine.container_of("badges", first).unwrap();
    assert_eq!(doc.parent(container), Some(first));
    assert!(doc.has_class(container, CONTAINER_CLASS));
    assert_eq!(doc.attribute(container, CONTAINER_ATTR).as_deref(), Some("badges"));
    assert_eq!(doc.text_content(container), "hi");
}

#[test]
fn test_for_each_mounts_every_match_and_never_twice() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    card(&doc, "a2");

    engine
        .apply(
            "badges",
            &patches(vec![Patch::selector(".card").for_each().component(Label::new("hi"))]),
        )
        .unwrap();
    assert_eq!(engine.mount_count("badges"), 2);

    // Unrelated churn re-evaluates the patch; nothing mounts twice.
    doc.element("p").append_to(doc.body()).unwrap();
    doc.flush();
    doc.flush();
    assert_eq!(engine.mount_count("badges"), 2);
    assert_eq!(containers(&doc).len(), 2);
}

#[test]
fn test_live_patch_tracks_appearance_and_disappearance() {
    let (doc, engine) = setup();
    engine
        .apply(
            "badges",
            &patches(vec![Patch::selector(".card").for_each().component(Label::new("hi"))]),
        )
        .unwrap();
    assert_eq!(engine.mount_count("badges"), 0);

    let a = card(&doc, "a1");
    let b = card(&doc, "a2");
    doc.flush();
    assert_eq!(engine.mounted_anchors("badges"), vec![a, b]);

    doc.remove(a).unwrap();
    doc.flush();
    assert_eq!(engine.mounted_anchors("badges"), vec![b]);
}

#[test]
fn test_host_rerender_removing_container_remounts() {
    let (doc, engine) = setup();
    let a = card(&doc, "a1");
    engine
        .apply("badges", &patches(vec![Patch::selector(".card").component(Label::new("hi"))]))
        .unwrap();
    let old = engine.container_of("badges", a).unwrap();

    // The host wipes the card's children.
    doc.set_text(a, "re-rendered").unwrap();
    doc.flush();

    let new = engine.container_of("badges", a).unwrap();
    assert_ne!(old, new);
    assert!(doc.is_connected(new));
    assert_eq!(engine.mount_count("badges"), 1);
}

#[test]
fn test_watched_attribute_change_unmounts_non_matching() {
    let (doc, engine) = setup();
    let a = card(&doc, "a1");
    engine
        .apply(
            "badges",
            &patches(vec![Patch::selector(".card.selected")
                .for_each()
                .watch_attributes(["class"])
                .component(Label::new("hi"))]),
        )
        .unwrap();
    assert_eq!(engine.mount_count("badges"), 0);

    doc.set_attribute(a, "class", "card selected").unwrap();
    doc.flush();
    assert_eq!(engine.mount_count("badges"), 1);

    doc.set_attribute(a, "class", "card").unwrap();
    doc.flush();
    assert_eq!(engine.mount_count("badges"), 0);
    assert!(containers(&doc).is_empty());
}

#[test]
fn test_once_patch_ignores_later_matches() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    engine
        .apply(
            "banner",
            &patches(vec![Patch::selector(".card").once().component(Label::new("hi"))]),
        )
        .unwrap();
    assert_eq!(engine.mount_count("banner"), 1);
    assert_eq!(engine.observers().subscription_count(), 0);

    card(&doc, "a2");
    doc.flush();
    assert_eq!(engine.mount_count("banner"), 1);
}

#[test]
fn test_engine_containers_are_never_candidates() {
    let (doc, engine) = setup();
    doc.element("div").append_to(doc.body()).unwrap();
    engine
        .apply(
            "greedy",
            &patches(vec![Patch::selector("div").for_each().component(Label::new("x"))]),
        )
        .unwrap();
    doc.flush();
    doc.flush();
    assert_eq!(engine.mount_count("greedy"), 1);
}

#[test]
fn test_anchor_parent_and_position() {
    let (doc, engine) = setup();
    let list = doc.element("ul").append_to(doc.body()).unwrap();
    let item = doc.element("li").class("item").append_to(list).unwrap();

    engine
        .apply(
            "siblings",
            &patches(vec![Patch::selector(".item")
                .anchor(|doc, matched| doc.parent(matched))
                .position(InsertPosition::After)
                .component(Label::new("after"))]),
        )
        .unwrap();
    assert_eq!(engine.mounted_anchors("siblings"), vec![list]);
    let container = engine.container_of("siblings", list).unwrap();
    assert_eq!(doc.children(doc.body()), vec![list, container]);

    engine
        .apply(
            "prepended",
            &patches(vec![Patch::selector(".item")
                .parent(|doc, anchor| doc.parent(anchor))
                .position(InsertPosition::Prepend)
                .component(Label::new("first"))]),
        )
        .unwrap();
    let container = engine.container_of("prepended", item).unwrap();
    assert_eq!(doc.children(list)[0], container);
}

#[test]
fn test_unresolvable_anchor_is_skipped() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    engine
        .apply(
            "nowhere",
            &patches(vec![Patch::selector(".card")
                .anchor(|_, _| None)
                .component(Label::new("x"))]),
        )
        .unwrap();
    assert_eq!(engine.mount_count("nowhere"), 0);
}

#[test]
fn test_filter_excludes_matches() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    let keep = card(&doc, "a2");
    engine
        .apply(
            "filtered",
            &patches(vec![Patch::selector(".card")
                .for_each()
                .filter(|doc, node| doc.attribute(node, "data-asset-id").as_deref() == Some("a2"))
                .component(Label::new("x"))]),
        )
        .unwrap();
    assert_eq!(engine.mounted_anchors("filtered"), vec![keep]);
}

#[test]
fn test_panicking_user_code_is_contained() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    engine
        .apply(
            "explosive",
            &patches(vec![
                Patch::selector(".card")
                    .filter(|_, _| panic!("filter bug"))
                    .component(Label::new("x")),
                Patch::predicate("panics", |_, _| panic!("predicate bug")).component(Label::new("x")),
                Patch::selector(".card")
                    .anchor(|_, _| panic!("anchor bug"))
                    .component(Label::new("x")),
            ]),
        )
        .unwrap();
    engine
        .apply("healthy", &patches(vec![Patch::selector(".card").component(Label::new("ok"))]))
        .unwrap();

    assert_eq!(engine.mount_count("explosive"), 0);
    assert_eq!(engine.mount_count("healthy"), 1);

    card(&doc, "a2");
    doc.flush();
    assert_eq!(engine.mount_count("healthy"), 1);
}

#[test]
fn test_failed_component_shows_fallback_and_siblings_stay_interactive() {
    let (doc, engine) = setup();
    let a = card(&doc, "a1");
    let clicks = Arc::new(AtomicUsize::new(0));

    engine
        .apply("broken", &patches(vec![Patch::selector(".card").component(Broken)]))
        .unwrap();
    engine
        .apply(
            "clicker",
            &patches(vec![Patch::selector(".card").component(Clicker { clicks: clicks.clone() })]),
        )
        .unwrap();

    assert_eq!(engine.failed_mounts("broken"), vec![a]);
    let broken_container = engine.container_of("broken", a).unwrap();
    let fallback = doc.children(broken_container)[0];
    assert!(doc.has_class(fallback, FALLBACK_CLASS));

    let clicker_container = engine.container_of("clicker", a).unwrap();
    let button = doc.children(clicker_container)[0];
    assert!(engine.dispatch_event(&UiEvent::click(button)));
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
    assert!(engine.failed_mounts("clicker").is_empty());
}

#[test]
fn test_dispatch_event_outside_any_container() {
    let (doc, engine) = setup();
    assert!(!engine.dispatch_event(&UiEvent::click(doc.body())));
}

#[test]
fn test_event_failure_is_contained_by_boundary() {
    let (doc, engine) = setup();
    let a = card(&doc, "a1");
    let clicks = Arc::new(AtomicUsize::new(0));
    engine
        .apply(
            "clicker",
            &patches(vec![Patch::selector(".card").component(Clicker { clicks: clicks.clone() })]),
        )
        .unwrap();
    let container = engine.container_of("clicker", a).unwrap();
    let button = doc.children(container)[0];

    assert!(!engine.dispatch_event(&UiEvent::new("fail", button)));
    assert_eq!(engine.failed_mounts("clicker"), vec![a]);
    assert_eq!(engine.mount_count("clicker"), 1);
}

#[test]
fn test_remove_leaves_nothing_behind() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    card(&doc, "a2");
    let cleanups = Arc::new(AtomicUsize::new(0));

    engine
        .apply(
            "styled",
            &patches(vec![Patch::selector(".card")
                .for_each()
                .component(Styled { cleanups: cleanups.clone() })]),
        )
        .unwrap();
    assert_eq!(engine.mount_count("styled"), 2);
    assert_eq!(doc.query_selector_all(doc.head(), "style").unwrap().len(), 2);
    assert_eq!(engine.observers().subscription_count(), 1);

    engine.remove("styled");

    assert_eq!(engine.state("styled"), PatchState::Removed);
    assert_eq!(engine.mount_count("styled"), 0);
    assert_eq!(engine.total_mounts(), 0);
    assert_eq!(engine.observers().subscription_count(), 0);
    assert_eq!(doc.active_observers(), 0);
    assert!(containers(&doc).is_empty());
    assert!(doc.query_selector_all(doc.head(), "style").unwrap().is_empty());
    assert_eq!(cleanups.load(Ordering::SeqCst), 2);

    // Later mutations reach nobody.
    card(&doc, "a3");
    doc.flush();
    assert_eq!(engine.total_mounts(), 0);
}

#[test]
fn test_remove_is_idempotent_and_unknown_plugin_is_noop() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    engine.remove("never-applied");
    assert_eq!(engine.state("never-applied"), PatchState::Unregistered);

    engine
        .apply("badges", &patches(vec![Patch::selector(".card").component(Label::new("x"))]))
        .unwrap();
    engine.remove("badges");
    engine.remove("badges");
    assert_eq!(engine.state("badges"), PatchState::Removed);
}

#[test]
fn test_malformed_selector_fails_before_mounting() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    let list = patches(vec![
        Patch::selector(".card").component(Label::new("x")),
        Patch::selector("button[").component(Label::new("y")),
    ]);

    let err = engine.apply("badges", &list).unwrap_err();
    assert!(matches!(err, PatchError::Dom(_)));
    assert_eq!(engine.state("badges"), PatchState::Unregistered);
    assert!(containers(&doc).is_empty());
    assert_eq!(engine.observers().subscription_count(), 0);
}

#[test]
fn test_reapply_after_remove() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    let list = patches(vec![Patch::selector(".card").component(Label::new("x"))]);

    engine.apply("badges", &list).unwrap();
    engine.apply("badges", &list).unwrap();
    assert_eq!(engine.mount_count("badges"), 1);
    assert_eq!(engine.observers().subscription_count(), 1);

    engine.remove("badges");
    engine.apply("badges", &list).unwrap();
    assert_eq!(engine.state("badges"), PatchState::Applied);
    assert_eq!(engine.mount_count("badges"), 1);
    assert_eq!(engine.observers().subscription_count(), 1);
}

#[test]
fn test_plugins_share_native_observer() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    let list = patches(vec![Patch::selector(".card").component(Label::new("x"))]);
    engine.apply("one", &list).unwrap();
    engine.apply("two", &list).unwrap();

    assert_eq!(engine.observers().subscription_count(), 2);
    assert_eq!(doc.active_observers(), 1);

    engine.remove("one");
    assert_eq!(doc.active_observers(), 1);
    assert_eq!(engine.mount_count("two"), 1);

    engine.remove("two");
    assert_eq!(doc.active_observers(), 0);
}

#[test]
fn test_shutdown_removes_everything() {
    let (doc, engine) = setup();
    card(&doc, "a1");
    let list = patches(vec![Patch::selector(".card").for_each().component(Label::new("x"))]);
    engine.apply("one", &list).unwrap();
    engine.apply("two", &list).unwrap();

    engine.shutdown();
    assert_eq!(engine.total_mounts(), 0);
    assert_eq!(doc.active_observers(), 0);
    assert_eq!(engine.state("one"), PatchState::Removed);
    assert!(containers(&doc).is_empty());
}

#[test]
fn test_debounce_without_runtime_processes_immediately() {
    let (doc, engine) = setup();
    engine
        .apply(
            "debounced",
            &patches(vec![Patch::selector(".card")
                .for_each()
                .debounce(Duration::from_millis(100))
                .component(Label::new("x"))]),
        )
        .unwrap();
    card(&doc, "a1");
    doc.flush();
    assert_eq!(engine.mount_count("debounced"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_coalesces_bursts() {
    let (doc, engine) = setup();
    engine
        .apply(
            "debounced",
            &patches(vec![Patch::selector(".card")
                .for_each()
                .debounce(Duration::from_millis(100))
                .component(Label::new("x"))]),
        )
        .unwrap();

    for id in ["a1", "a2", "a3"] {
        card(&doc, id);
        doc.flush();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(engine.mount_count("debounced"), 0);
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    tokio::task::yield_now().await;
    assert_eq!(engine.mount_count("debounced"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_remove_cancels_pending_debounce() {
    let (doc, engine) = setup();
    engine
        .apply(
            "debounced",
            &patches(vec![Patch::selector(".card")
                .for_each()
                .debounce(Duration::from_millis(100))
                .component(Label::new("x"))]),
        )
        .unwrap();

    card(&doc, "a1");
    doc.flush();
    engine.remove("debounced");

    tokio::time::sleep(Duration::from_millis(250)).await;
    tokio::task::yield_now().await;
    assert_eq!(engine.mount_count("debounced"), 0);
    assert!(containers(&doc).is_empty());
}
