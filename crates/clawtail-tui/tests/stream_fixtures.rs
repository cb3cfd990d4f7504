//! Tests that replay a captured watch-stream session.
//!
//! The fixture mixes every line shape the stream produces: structured
//! LLM/summary/cache lines, bare WARN/ERROR notices, freeform output,
//! a blank line, and ANSI-wrapped lines (one of which cleans down to
//! nothing). It replays through the same ingest path the frame loop
//! uses, so the assertions cover cleaning, classification, routing,
//! and counters together.

use clawtail_tui::app::{App, AppConfig, DisplayConfig};
use clawtail_tui::classify::ClassifierConfig;

fn replay(fixture: &str) -> App {
    let mut app = App::new(AppConfig {
        max_events: 100,
        source_desc: "fixture".to_owned(),
        classifier: ClassifierConfig::default(),
        display: DisplayConfig::default(),
    });
    for line in fixture.lines() {
        app.ingest_line(line);
    }
    app
}

#[test]
fn mixed_session_counts_every_surviving_line() {
    let app = replay(include_str!("fixtures/mixed_session.log"));

    // 14 raw lines; the blank line and the pure-ANSI clear sequence
    // vanish during cleaning.
    assert_eq!(app.store.total_lines, 12);
    assert_eq!(app.store.parsed_lines, 12);
    assert_eq!(app.store.raw.len(), 12);
}

#[test]
fn mixed_session_counters_hold_the_newest_values() {
    let app = replay(include_str!("fixtures/mixed_session.log"));
    let ctr = &app.store.counters;

    assert_eq!(ctr.llm_req, 4);
    assert_eq!(ctr.llm_messages, 4);
    assert!((ctr.llm_avg - 1.0).abs() < f64::EPSILON);
    assert_eq!(ctr.summary_ok, 1);
    // From the ANSI-wrapped SUMMARY_FAIL, not the earlier one.
    assert_eq!(ctr.summary_fail, 2);

    assert_eq!(ctr.cache_req, 3);
    assert_eq!(ctr.cache_total_messages, 44);
    assert_eq!(ctr.cache_total_tool_result, 10);
    assert_eq!(ctr.cache_provider, "openrouter");
    assert_eq!(ctr.cache_model, "sonnet-4");
    assert_eq!(ctr.cache_session, "a41f");
    assert_eq!(ctr.cache_ts, "2025-06-11T09:15:40Z");
}

#[test]
fn mixed_session_routes_groups_and_warnings() {
    let app = replay(include_str!("fixtures/mixed_session.log"));

    // Primary: the lm-studio LLM line, its SUMMARY_FAIL, and the
    // "LM Studio bridge" line. Everything else is secondary.
    assert_eq!(app.store.primary.len(), 3);
    assert_eq!(app.store.secondary.len(), 9);

    // Two SUMMARY_FAILs plus the WARN and ERROR notices.
    assert_eq!(app.store.warnings.len(), 4);
    let warnings: Vec<&String> = app.store.warnings.iter().collect();
    assert_eq!(warnings[0], "[LOG] WARN rate limit approaching for provider openrouter");
    assert_eq!(warnings[1], "[SUM-] count=1 pending=- src=lm-studio-local");
    assert_eq!(warnings[2], "[LOG] ERROR failed to persist transcript: disk full");
    assert_eq!(warnings[3], "[SUM-] count=2 pending=3 src=session-a41f");
}

#[test]
fn mixed_session_formats_display_strings() {
    let app = replay(include_str!("fixtures/mixed_session.log"));

    let secondary: Vec<&String> = app.store.secondary.iter().collect();
    assert_eq!(secondary[0], "[LLM] req=1 messages=8 avg=2.67 src=session-a41f");
    assert_eq!(
        secondary[1],
        "[CACHE] req=1 msg=8 tool=2 reqPct=25.0% total=2/8 totalPct=25.0% model=sonnet-4"
    );
    assert_eq!(
        secondary[4],
        "[SUM+] count=1 compressed=4 remaining=6 src=session-a41f"
    );
    assert_eq!(secondary[7], "[RAW] gateway listening on 127.0.0.1:8089");

    let primary: Vec<&String> = app.store.primary.iter().collect();
    assert_eq!(primary[0], "[LLM] req=3 messages=9 avg=3 src=lm-studio-local");
    assert_eq!(primary[2], "[LLM] req=4 messages=4 avg=1 src=LM Studio bridge");
}

#[test]
fn raw_buffer_holds_cleaned_lines_verbatim() {
    let app = replay(include_str!("fixtures/mixed_session.log"));

    let raw: Vec<&String> = app.store.raw.iter().collect();
    // The ANSI wrapper is stripped before buffering.
    assert_eq!(raw[10], "WARN SUMMARY_FAIL count=2 pendingRounds=3 src=session-a41f");
    assert_eq!(raw[0], "INFO LLM req=1 messages=8 avg_messages=2.67 src=session-a41f");
}
