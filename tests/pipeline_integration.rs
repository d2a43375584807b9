//! End-to-end tests for analysis runs over the HTML fixtures in testdata/.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use domlens::analyze::{AnalysisMode, Depth, RootSpec};
use domlens::{Document, InspectError, Inspector, MemoryLoader, RunRequest, Scheduler, Settings};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn load_fixture(name: &str) -> Document {
    Document::load(testdata_path().join(name)).expect("fixture should load")
}

fn wide_list(items: usize) -> Document {
    let items: String = (0..items)
        .map(|i| format!("<li class=\"row\" data-index=\"{}\">row {}</li>", i, i))
        .collect();
    Document::parse(&format!(
        "<html><head><style>.row {{ padding: 2px; }}</style></head><body><ul id=\"rows\">{}</ul></body></html>",
        items
    ))
}

// =============================================================================
// Full runs
// =============================================================================

#[tokio::test]
async fn test_five_node_subtree() {
    let mut inspector = Inspector::new(load_fixture("five_nodes.html"));
    let context = inspector
        .run(&RunRequest::query("#card"), &Scheduler::new())
        .await
        .expect("run should succeed");

    assert_eq!(context.len(), 5);
    let stats = context.summary.as_ref().expect("summary");
    assert_eq!(stats.elements, 5);
    assert!(stats.rule_matches > 0);

    let selectors: Vec<&str> = context.records().iter().map(|r| r.selector.as_str()).collect();
    assert_eq!(
        selectors,
        vec!["#card", "h2.title", "p.text", "span.hint", "a.link"]
    );

    let card = &context.records()[0];
    let style = card.style.as_ref().expect("full mode matches styles");
    assert_eq!(style.computed.get("padding").map(String::as_str), Some("16px"));
    assert_eq!(
        style.custom_properties.get("--accent").map(String::as_str),
        Some("#0a7")
    );
    assert!(style
        .inherited
        .iter()
        .any(|entry| entry.property == "font-family" && entry.ancestor.starts_with("body")));

    let behavior = card.behavior.as_ref().expect("full mode scans scripts");
    assert!(behavior
        .references
        .iter()
        .any(|r| r.token == "getElementById('card')"));

    let tree = context.tree.as_ref().expect("display tree");
    assert_eq!(tree.root.node_count(), 5);
}

#[tokio::test]
async fn test_depth_limits_collection() {
    let doc = load_fixture("five_nodes.html");
    let mut inspector = Inspector::new(doc);

    let none = RunRequest::query("#card").depth(Depth::Limited(0));
    assert_eq!(inspector.run(&none, &Scheduler::new()).await.unwrap().len(), 1);

    let one = RunRequest::query("#card").depth(Depth::Limited(1));
    assert_eq!(inspector.run(&one, &Scheduler::new()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_blocked_sources_are_reported() {
    let mut inspector = Inspector::new(load_fixture("blocked.html"));
    let context = inspector
        .run(&RunRequest::query("#save"), &Scheduler::new())
        .await
        .unwrap();

    let style = context.records()[0].style.as_ref().unwrap();
    let cdn = style
        .applied
        .iter()
        .find(|g| g.source == "https://cdn.example.com/theme.css")
        .expect("blocked cross-origin sheet is listed");
    assert!(cdn.blocked);
    assert_eq!(cdn.rule_count(), 0);

    let missing = style
        .applied
        .iter()
        .find(|g| g.source == "styles/missing.css")
        .expect("unreadable sheet is listed");
    assert!(missing.blocked);

    let site = style
        .applied
        .iter()
        .find(|g| g.source == "styles/site.css")
        .expect("readable sheet matched");
    assert!(!site.blocked);
    assert!(site.rules.iter().any(|r| r.selector == "#save"));
    assert_eq!(style.computed.get("font-weight").map(String::as_str), Some("bold"));

    let behavior = context.records()[0].behavior.as_ref().unwrap();
    assert_eq!(behavior.listeners.len(), 1);
    assert_eq!(behavior.listeners[0].event, "click");
    assert_eq!(behavior.listeners[0].handler, "save()");
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let request = RunRequest::new(RootSpec::Query("#page".to_string()));
    let mut first = Inspector::new(load_fixture("blocked.html"));
    let mut second = Inspector::new(load_fixture("blocked.html"));

    let a = first.run(&request, &Scheduler::new()).await.unwrap().records().to_vec();
    let b = second
        .run(&request, &Scheduler::new().batch_size(3))
        .await
        .unwrap()
        .records()
        .to_vec();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_structure_mode_skips_other_stages() {
    let mut inspector = Inspector::new(load_fixture("five_nodes.html"));
    let request = RunRequest::query("#card").mode(AnalysisMode::Structure);
    let context = inspector.run(&request, &Scheduler::new()).await.unwrap();

    for record in context.records() {
        assert!(record.structure.is_some());
        assert!(record.style.is_none());
        assert!(record.behavior.is_none());
    }
    assert_eq!(context.summary.as_ref().unwrap().rule_matches, 0);
}

#[tokio::test]
async fn test_javascript_toggle_disables_scan() {
    let settings = Settings {
        include_javascript: false,
        ..Settings::default()
    };
    let mut inspector = Inspector::new(load_fixture("blocked.html")).with_settings(settings);
    let context = inspector
        .run(&RunRequest::query("#page"), &Scheduler::new())
        .await
        .unwrap();
    assert!(context.records().iter().all(|r| r.behavior.is_none()));
    assert_eq!(context.summary.as_ref().unwrap().references, 0);
}

// =============================================================================
// Interruption
// =============================================================================

#[tokio::test]
async fn test_cancel_after_first_batch() {
    let mut inspector = Inspector::new(wide_list(29)).with_loader(MemoryLoader::new());
    let token = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = Scheduler::new()
        .cancellation(token.clone())
        .progress(tx);
    let request = RunRequest::query("#rows");

    let run = async { inspector.run(&request, &scheduler).await.map(|_| ()) };
    let watcher = async {
        let first = rx.recv().await;
        token.cancel();
        first
    };
    let (outcome, first) = tokio::join!(run, watcher);

    let first = first.expect("one progress report");
    assert_eq!(first.processed, 10);
    assert_eq!(first.total, 30);
    match outcome {
        Err(InspectError::Cancelled { processed, total }) => {
            assert_eq!(processed, 10);
            assert_eq!(total, 30);
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert!(inspector.context().is_none());
}

#[tokio::test]
async fn test_zero_deadline_produces_no_records() {
    let mut inspector = Inspector::new(wide_list(5)).with_loader(MemoryLoader::new());
    let scheduler = Scheduler::new().max_duration(Some(Duration::ZERO));
    let err = inspector
        .run(&RunRequest::query("#rows"), &scheduler)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InspectError::DeadlineExceeded {
            processed: 0,
            total: 6
        }
    ));
    assert!(inspector.context().is_none());
}

#[tokio::test]
async fn test_unknown_root() {
    let mut inspector = Inspector::new(load_fixture("five_nodes.html"));
    let err = inspector
        .run(&RunRequest::query("#does-not-exist"), &Scheduler::new())
        .await
        .unwrap_err();
    assert!(matches!(err, InspectError::RootNotFound(_)));
}
