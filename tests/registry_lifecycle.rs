use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use scraper::Selector;

use chat_table_extractor::batch::{BatchGrouper, extract_batch, is_batch_eligible};
use chat_table_extractor::dom::{Document, NodeId};
use chat_table_extractor::lifecycle::TableWatcher;
use chat_table_extractor::models::Source;
use chat_table_extractor::options::DetectorConfig;
use chat_table_extractor::registry::{
    RegistryEvent, RemovalReason, ScanTrigger, TrackingState,
};
use chat_table_extractor::warning::IssueCode;

const PAGE_URL: &str = "https://example.com/notes";

fn table(header: &str, value: &str) -> String {
    format!(
        "<table><tr><th>{header}</th><th>Value</th></tr><tr><td>item</td><td>{value}</td></tr></table>"
    )
}

fn three_table_page() -> String {
    format!(
        "<body><section>{}</section><section>{}</section><section>{}</section></body>",
        table("Alpha", "1"),
        table("Beta", "2"),
        table("Gamma", "3")
    )
}

fn ids_of(document: &Document, css: &str) -> Vec<NodeId> {
    let selector = Selector::parse(css).expect("valid selector");
    document.select(&selector).map(|element| element.id()).collect()
}

fn watcher() -> TableWatcher {
    TableWatcher::new(PAGE_URL, DetectorConfig::default()).expect("default config is valid")
}

#[test]
fn three_tables_then_one_removed() {
    let mut document = Document::parse(&three_table_page());
    let mut watcher = watcher();
    let start = Instant::now();

    let report = watcher.start(&mut document, start);
    assert_eq!(report.trigger, ScanTrigger::Initial);
    assert_eq!(report.tracked, 3);
    assert_eq!(watcher.batch().count, 3);
    assert!(watcher.batch_eligible());

    let tables = ids_of(&document, "table");
    document.remove(tables[1]).expect("table is attached");

    let report = watcher.rescan(&document, ScanTrigger::Manual);
    let batch = watcher.batch();
    assert_eq!(batch.count, 2);
    assert_eq!(batch.tables.len(), 2);
    assert_eq!(batch.tables[0].table.headers, vec!["Alpha", "Value"]);
    assert_eq!(batch.tables[1].table.headers, vec!["Gamma", "Value"]);
    assert!(matches!(
        report.events.as_slice(),
        [RegistryEvent::Removed {
            reason: RemovalReason::Detached,
            ..
        }]
    ));
    assert!(
        report
            .issues
            .iter()
            .any(|issue| issue.code == IssueCode::DetachedElement)
    );
    assert_eq!(watcher.registry().state_of(tables[1]), TrackingState::Removed);
    assert!(watcher.registry().has_table(tables[0]));
    assert!(!watcher.registry().has_table(tables[1]));
}

#[test]
fn rescanning_an_unchanged_document_is_a_no_op() {
    let mut document = Document::parse(&three_table_page());
    let mut watcher = watcher();
    watcher.start(&mut document, Instant::now());
    let before = watcher.registry().tables().to_vec();

    let report = watcher.rescan(&document, ScanTrigger::Periodic);
    assert!(!report.changed());
    assert_eq!(watcher.registry().tables(), before.as_slice());
}

#[test]
fn content_change_updates_the_entry_in_place() {
    let mut document = Document::parse(&format!("<body>{}</body>", table("Load", "10")));
    let mut watcher = watcher();
    watcher.start(&mut document, Instant::now());

    let table_id = ids_of(&document, "table")[0];
    let cell = ids_of(&document, "td")[1];
    document.set_text(cell, "42").expect("cell is an element");

    let report = watcher.rescan(&document, ScanTrigger::Manual);
    assert!(matches!(
        report.events.as_slice(),
        [RegistryEvent::Updated { element, .. }] if *element == table_id
    ));
    assert_eq!(watcher.registry().len(), 1);
    let updated = watcher
        .registry()
        .table_for(table_id)
        .expect("table is still tracked");
    assert_eq!(updated.rows, vec![vec!["item", "42"]]);
}

#[test]
fn hiding_a_table_removes_it_and_overlay_state_is_tracked() {
    let mut document = Document::parse(&format!("<body>{}</body>", table("Mode", "on")));
    let mut watcher = watcher();
    watcher.start(&mut document, Instant::now());

    let table_id = ids_of(&document, "table")[0];
    assert_eq!(
        watcher.registry().state_of(table_id),
        TrackingState::Tracked { has_overlay: false }
    );
    assert!(watcher.registry_mut().mark_overlay(table_id));
    assert_eq!(
        watcher.registry().state_of(table_id),
        TrackingState::Tracked { has_overlay: true }
    );

    document.set_hidden(table_id, true).expect("table exists");
    let report = watcher.rescan(&document, ScanTrigger::Manual);
    assert!(matches!(
        report.events.as_slice(),
        [RegistryEvent::Removed {
            reason: RemovalReason::Hidden,
            ..
        }]
    ));
    assert!(watcher.registry().is_empty());

    document.set_hidden(table_id, false).expect("table exists");
    watcher.rescan(&document, ScanTrigger::Manual);
    assert_eq!(
        watcher.registry().state_of(table_id),
        TrackingState::Tracked { has_overlay: false }
    );
}

#[test]
fn added_tables_are_picked_up_after_the_debounce() {
    let mut document = Document::parse(&format!("<body>{}</body>", table("First", "1")));
    let mut watcher = watcher();
    let start = Instant::now();
    watcher.start(&mut document, start);

    let body = document.body().expect("body exists").id();
    document
        .append_html(body, &format!("<div>{}</div>", table("Second", "2")))
        .expect("body is an element");

    assert_eq!(watcher.tick(&mut document, start + Duration::from_millis(10)), None);
    assert_eq!(watcher.tick(&mut document, start + Duration::from_millis(60)), None);

    let report = watcher
        .tick(&mut document, start + Duration::from_millis(120))
        .expect("debounced rescan is due");
    assert_eq!(report.trigger, ScanTrigger::Mutation);
    assert_eq!(report.tracked, 2);
    assert_eq!(watcher.tick(&mut document, start + Duration::from_millis(300)), None);
}

#[test]
fn text_only_changes_wait_for_the_periodic_scan() {
    let mut document = Document::parse(r#"<body><div id="slot"></div></body>"#);
    let mut watcher = watcher();
    let start = Instant::now();
    assert_eq!(watcher.start(&mut document, start).tracked, 0);

    let slot = ids_of(&document, "#slot")[0];
    document
        .set_text(slot, "Name  Age\nAnn  30\nBob  22")
        .expect("slot is an element");

    assert_eq!(watcher.tick(&mut document, start + Duration::from_secs(1)), None);
    let report = watcher
        .tick(&mut document, start + Duration::from_secs(5))
        .expect("periodic rescan is due");
    assert_eq!(report.trigger, ScanTrigger::Periodic);
    assert_eq!(report.tracked, 1);
    assert_eq!(
        watcher.registry().tables()[0].table.headers,
        vec!["Name", "Age"]
    );
}

#[test]
fn shutdown_cancels_pending_and_periodic_scans() {
    let mut document = Document::parse(&format!("<body>{}</body>", table("Only", "1")));
    let mut watcher = watcher();
    let start = Instant::now();
    watcher.start(&mut document, start);

    let body = document.body().expect("body exists").id();
    document
        .append_html(body, &table("Late", "2"))
        .expect("body is an element");
    assert!(watcher.observe(&mut document, start + Duration::from_millis(10)));

    watcher.shutdown();
    assert!(!watcher.is_running());
    assert_eq!(watcher.scheduler().pending_debounce(), None);
    assert_eq!(watcher.tick(&mut document, start + Duration::from_secs(30)), None);
    assert_eq!(watcher.registry().len(), 1);
}

#[test]
fn extract_batch_stamps_page_metadata() {
    let html = format!(
        "<body><div class=\"font-claude-message\">{}{}</div></body>",
        table("Plan", "basic"),
        table("Tier", "pro")
    );
    let (batch, report) = extract_batch(
        "https://claude.ai/chat/42",
        &html,
        Some("Pricing".to_string()),
        DetectorConfig::default(),
    )
    .expect("default config is valid");

    assert_eq!(report.trigger, ScanTrigger::Manual);
    assert_eq!(report.detector, "claude");
    assert_eq!(batch.source, Source::Claude);
    assert_eq!(batch.count, 2);
    assert!(is_batch_eligible(&batch, 2));
    assert!(!is_batch_eligible(&batch, 3));

    for result in &batch.tables {
        assert!(result.table.id.starts_with("table-"));
        assert_eq!(result.table.url, "https://claude.ai/chat/42");
        assert_eq!(result.table.chat_title.as_deref(), Some("Pricing"));
    }

    let json = serde_json::to_value(&batch).expect("batch serializes");
    assert_eq!(json["chatTitle"], "Pricing");
    assert_eq!(json["source"], "claude");
    assert_eq!(json["tables"][0]["table"]["chatTitle"], "Pricing");
}

#[test]
fn grouping_follows_the_registry() {
    let mut document = Document::parse(&format!("<body>{}</body>", table("Solo", "1")));
    let mut watcher = watcher();
    watcher.start(&mut document, Instant::now());

    let batch = BatchGrouper::group(watcher.registry());
    assert_eq!(batch.count, 1);
    assert_eq!(batch.source, Source::Other);
    assert_eq!(batch.chat_title, None);
    assert!(!is_batch_eligible(&batch, 2));
}

#[test]
fn pipe_text_replaced_by_a_native_table_is_tracked_once() {
    let mut document = Document::parse(r#"<body><div id="slot"></div></body>"#);
    let mut watcher = watcher();
    let slot = ids_of(&document, "#slot")[0];
    document
        .set_text(slot, "| Name | Age |\n|---|---|\n| Ann | 30 |")
        .expect("slot is an element");
    assert_eq!(watcher.start(&mut document, Instant::now()).tracked, 1);
    assert!(watcher.registry().has_table(slot));

    document
        .set_inner_html(
            slot,
            "<table><tr><th>Name</th><th>Age</th></tr><tr><td>Ann</td><td>30</td></tr></table>",
        )
        .expect("slot is an element");
    let table_id = ids_of(&document, "table")[0];

    let report = watcher.rescan(&document, ScanTrigger::Manual);
    assert_eq!(report.tracked, 1);
    assert!(matches!(
        report.events.as_slice(),
        [
            RegistryEvent::Removed {
                element,
                reason: RemovalReason::Superseded,
                ..
            },
            RegistryEvent::Added { element: added, .. },
        ] if *element == slot && *added == table_id
    ));
    assert_eq!(watcher.registry().state_of(slot), TrackingState::Removed);
    assert_eq!(watcher.batch().count, 1);
    assert_eq!(watcher.batch().tables[0].table.rows, vec![vec!["Ann", "30"]]);
}

#[test]
fn tracked_text_that_stops_parsing_is_dropped() {
    let mut document = Document::parse(r#"<body><div id="slot"></div></body>"#);
    let mut watcher = watcher();
    let slot = ids_of(&document, "#slot")[0];
    document
        .set_text(slot, "| Name | Age |\n|---|---|\n| Ann | 30 |")
        .expect("slot is an element");
    watcher.start(&mut document, Instant::now());

    document
        .set_text(slot, "The table was removed from this answer.")
        .expect("slot is an element");
    let report = watcher.rescan(&document, ScanTrigger::Manual);

    assert_eq!(report.tracked, 0);
    assert!(matches!(
        report.events.as_slice(),
        [RegistryEvent::Removed {
            reason: RemovalReason::Unparsable,
            ..
        }]
    ));
    assert_eq!(watcher.registry().state_of(slot), TrackingState::Removed);
    assert_eq!(watcher.batch().count, 0);
}

#[test]
fn non_table_mutations_do_not_debounce() {
    let mut document = Document::parse(&format!("<body>{}</body>", table("Kept", "1")));
    let mut watcher = watcher();
    let start = Instant::now();
    watcher.start(&mut document, start);

    let body = document.body().expect("body exists").id();
    document
        .append_html(body, "<p>hello there</p>")
        .expect("body is an element");

    assert!(!watcher.observe(&mut document, start + Duration::from_millis(10)));
    assert_eq!(watcher.scheduler().pending_debounce(), None);
    assert_eq!(watcher.tick(&mut document, start + Duration::from_millis(200)), None);
}
