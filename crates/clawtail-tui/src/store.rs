//! Bounded event history and running counters.
//!
//! The store is the only component with mutable domain state. It is
//! owned and mutated exclusively by the main loop, so it needs no
//! internal locking; the renderer reads it through a shared borrow.

use std::collections::VecDeque;

use crate::classify::{Classified, Group, LogEvent};

/// Fixed-capacity FIFO that evicts the oldest element on overflow.
///
/// Capacity is set at construction and never changes; `len() <=
/// capacity()` holds at all times.
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, evicting the oldest first when full.
    pub fn push(&mut self, item: T) {
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate over the most recent `n` items, oldest of those first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

/// Last-write-wins snapshots of values the monitored application
/// reports about itself. These are upstream cumulative figures — the
/// viewer never sums across events to derive them.
#[derive(Debug, Clone, PartialEq)]
pub struct Counters {
    pub llm_req: u64,
    pub llm_messages: u64,
    pub llm_avg: f64,
    pub summary_ok: u64,
    pub summary_fail: u64,
    pub cache_req: u64,
    pub cache_messages: u64,
    pub cache_tool_result: u64,
    pub cache_req_pct: f64,
    pub cache_total_messages: u64,
    pub cache_total_tool_result: u64,
    pub cache_total_pct: f64,
    pub cache_provider: String,
    pub cache_model: String,
    pub cache_session: String,
    pub cache_ts: String,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            llm_req: 0,
            llm_messages: 0,
            llm_avg: 0.0,
            summary_ok: 0,
            summary_fail: 0,
            cache_req: 0,
            cache_messages: 0,
            cache_tool_result: 0,
            cache_req_pct: 0.0,
            cache_total_messages: 0,
            cache_total_tool_result: 0,
            cache_total_pct: 0.0,
            cache_provider: "-".to_owned(),
            cache_model: "-".to_owned(),
            cache_session: "-".to_owned(),
            cache_ts: "-".to_owned(),
        }
    }
}

/// Rolling history buffers plus counters and line totals.
#[derive(Debug)]
pub struct EventStore {
    /// Formatted events whose group matched the primary token.
    pub primary: BoundedBuffer<String>,
    /// Formatted events for everything else.
    pub secondary: BoundedBuffer<String>,
    /// Failure/notice lines, regardless of group.
    pub warnings: BoundedBuffer<String>,
    /// Every cleaned line, unformatted.
    pub raw: BoundedBuffer<String>,
    pub counters: Counters,
    /// Lines observed (post-cleaning, non-empty).
    pub total_lines: u64,
    /// Lines routed to a category buffer. Classification is total, so
    /// this tracks `total_lines` unless ingestion is interrupted
    /// mid-line.
    pub parsed_lines: u64,
}

impl EventStore {
    /// Smallest capacity any buffer is allowed to have.
    pub const MIN_CAPACITY: usize = 50;

    /// Create a store whose buffers each hold at most
    /// `max(max_events, MIN_CAPACITY)` entries.
    pub fn new(max_events: usize) -> Self {
        let capacity = max_events.max(Self::MIN_CAPACITY);
        Self {
            primary: BoundedBuffer::new(capacity),
            secondary: BoundedBuffer::new(capacity),
            warnings: BoundedBuffer::new(capacity),
            raw: BoundedBuffer::new(capacity),
            counters: Counters::default(),
            total_lines: 0,
            parsed_lines: 0,
        }
    }

    /// Record a cleaned, non-empty line ahead of classification.
    pub fn record_line(&mut self, clean: &str) {
        self.total_lines += 1;
        self.raw.push(clean.to_owned());
    }

    /// Apply a classified event: update counters, format the display
    /// string, and route it to the group buffer (and the warnings
    /// buffer for failures/notices).
    pub fn record_event(&mut self, classified: &Classified) {
        self.parsed_lines += 1;
        self.update_counters(&classified.event);

        let formatted = format_event(&classified.event);
        let is_warning = matches!(
            classified.event,
            LogEvent::SummaryFail { .. } | LogEvent::LogNotice { .. }
        );
        if is_warning {
            self.warnings.push(formatted.clone());
        }
        match classified.group {
            Group::Primary => self.primary.push(formatted),
            Group::Secondary => self.secondary.push(formatted),
        }
    }

    /// Empty all four buffers. Counters and totals are untouched —
    /// clearing is a display reset, not a state reset.
    pub fn clear(&mut self) {
        self.primary.clear();
        self.secondary.clear();
        self.warnings.clear();
        self.raw.clear();
    }

    fn update_counters(&mut self, event: &LogEvent) {
        let ctr = &mut self.counters;
        match event {
            LogEvent::LlmRequest {
                req,
                messages,
                avg_messages,
                ..
            } => {
                ctr.llm_req = *req;
                ctr.llm_messages = *messages;
                ctr.llm_avg = *avg_messages;
            }
            LogEvent::SummaryOk { count, .. } => ctr.summary_ok = *count,
            LogEvent::SummaryFail { count, .. } => ctr.summary_fail = *count,
            LogEvent::CacheTrace {
                req,
                messages,
                tool_result,
                req_tool_pct,
                total_messages,
                total_tool_result,
                total_tool_pct,
                provider,
                model,
                session,
                ts,
            } => {
                ctr.cache_req = *req;
                ctr.cache_messages = *messages;
                ctr.cache_tool_result = *tool_result;
                ctr.cache_req_pct = *req_tool_pct;
                ctr.cache_total_messages = *total_messages;
                ctr.cache_total_tool_result = *total_tool_result;
                ctr.cache_total_pct = *total_tool_pct;
                ctr.cache_provider.clone_from(provider);
                ctr.cache_model.clone_from(model);
                ctr.cache_session.clone_from(session);
                ctr.cache_ts.clone_from(ts);
            }
            LogEvent::LogNotice { .. } | LogEvent::Raw { .. } => {}
        }
    }
}

/// Format an event into its one-line display string.
///
/// The bracketed prefix doubles as the severity key the renderer
/// colors by, so these shapes are load-bearing.
fn format_event(event: &LogEvent) -> String {
    match event {
        LogEvent::LlmRequest {
            req,
            messages,
            avg_messages,
            src,
        } => format!("[LLM] req={req} messages={messages} avg={avg_messages} src={src}"),
        LogEvent::SummaryOk {
            count,
            compressed_rounds,
            remaining_messages,
            src,
        } => format!(
            "[SUM+] count={count} compressed={compressed_rounds} remaining={remaining_messages} src={src}"
        ),
        LogEvent::SummaryFail {
            count,
            pending_rounds,
            src,
        } => {
            let pending = pending_rounds.as_deref().unwrap_or("-");
            format!("[SUM-] count={count} pending={pending} src={src}")
        }
        LogEvent::CacheTrace {
            req,
            messages,
            tool_result,
            req_tool_pct,
            total_messages,
            total_tool_result,
            total_tool_pct,
            model,
            ..
        } => format!(
            "[CACHE] req={req} msg={messages} tool={tool_result} reqPct={req_tool_pct:.1}% \
             total={total_tool_result}/{total_messages} totalPct={total_tool_pct:.1}% model={model}"
        ),
        LogEvent::LogNotice { text, .. } => format!("[LOG] {text}"),
        LogEvent::Raw { text } => format!("[RAW] {text}"),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::classify::Classifier;

    fn store() -> EventStore {
        EventStore::new(100)
    }

    fn classify_into(store: &mut EventStore, line: &str) {
        let classifier = Classifier::default();
        let clean = classifier.clean(line);
        assert!(!clean.is_empty());
        store.record_line(&clean);
        store.record_event(&classifier.classify(&clean));
    }

    #[test]
    fn bounded_buffer_evicts_oldest() {
        let mut buf = BoundedBuffer::new(3);
        for i in 0..4 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn bounded_buffer_recent_returns_tail_in_order() {
        let mut buf = BoundedBuffer::new(10);
        for i in 0..6 {
            buf.push(i);
        }
        assert_eq!(buf.recent(3).copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        // Asking for more than is present returns everything.
        assert_eq!(buf.recent(100).count(), 6);
    }

    #[test]
    fn capacity_floor_is_enforced() {
        let small = EventStore::new(1);
        assert_eq!(small.raw.capacity(), EventStore::MIN_CAPACITY);
        let large = EventStore::new(400);
        assert_eq!(large.raw.capacity(), 400);
    }

    #[test]
    fn record_line_counts_and_buffers() {
        let mut s = store();
        s.record_line("hello");
        s.record_line("world");
        assert_eq!(s.total_lines, 2);
        assert_eq!(s.raw.len(), 2);
        assert_eq!(s.parsed_lines, 0);
    }

    #[test]
    fn clear_empties_buffers_but_keeps_counters() {
        let mut s = store();
        classify_into(&mut s, "INFO LLM req=5 messages=12 avg_messages=3.50 src=sessionA");
        classify_into(&mut s, "WARN SUMMARY_FAIL count=2 src=sessionB");
        assert!(!s.secondary.is_empty());
        assert!(!s.warnings.is_empty());

        s.clear();
        assert!(s.primary.is_empty());
        assert!(s.secondary.is_empty());
        assert!(s.warnings.is_empty());
        assert!(s.raw.is_empty());
        assert_eq!(s.counters.llm_req, 5);
        assert_eq!(s.counters.summary_fail, 2);
        assert_eq!(s.total_lines, 2);
        assert_eq!(s.parsed_lines, 2);
    }

    #[test]
    fn scenario_llm_request() {
        let mut s = store();
        classify_into(&mut s, "INFO LLM req=5 messages=12 avg_messages=3.50 src=sessionA");

        assert_eq!(s.counters.llm_req, 5);
        assert_eq!(s.counters.llm_messages, 12);
        assert!((s.counters.llm_avg - 3.5).abs() < f64::EPSILON);
        assert_eq!(
            s.secondary.iter().collect::<Vec<_>>(),
            vec!["[LLM] req=5 messages=12 avg=3.5 src=sessionA"]
        );
        assert!(s.primary.is_empty());
        assert!(s.warnings.is_empty());
    }

    #[test]
    fn scenario_cache_trace() {
        let mut s = store();
        classify_into(
            &mut s,
            "INFO CACHE_TRACE req=3 messages=40 toolResult=10 reqToolResultPct=25.0% \
             totalMessages=400 totalToolResult=80 totalToolResultPct=20.0% \
             provider=acme model=gpt-x session=s1 ts=2024-01-01T00:00:00Z",
        );

        let ctr = &s.counters;
        assert_eq!(ctr.cache_req, 3);
        assert_eq!(ctr.cache_messages, 40);
        assert_eq!(ctr.cache_tool_result, 10);
        assert!((ctr.cache_req_pct - 25.0).abs() < f64::EPSILON);
        assert_eq!(ctr.cache_total_messages, 400);
        assert_eq!(ctr.cache_total_tool_result, 80);
        assert!((ctr.cache_total_pct - 20.0).abs() < f64::EPSILON);
        assert_eq!(ctr.cache_provider, "acme");
        assert_eq!(ctr.cache_model, "gpt-x");
        assert_eq!(ctr.cache_session, "s1");
        assert_eq!(ctr.cache_ts, "2024-01-01T00:00:00Z");

        assert_eq!(s.secondary.len(), 1);
        let entry = s.secondary.iter().next().unwrap();
        assert!(entry.starts_with("[CACHE]"), "got {entry}");
        assert!(entry.contains("total=80/400"));
    }

    #[test]
    fn scenario_summary_fail_without_pending() {
        let mut s = store();
        classify_into(&mut s, "WARN SUMMARY_FAIL count=2 src=sessionB");

        assert_eq!(s.counters.summary_fail, 2);
        let expected = "[SUM-] count=2 pending=- src=sessionB";
        assert_eq!(s.warnings.iter().collect::<Vec<_>>(), vec![expected]);
        // The same string also lands in the group buffer.
        assert_eq!(s.secondary.iter().collect::<Vec<_>>(), vec![expected]);
    }

    #[test]
    fn scenario_ansi_wrapped_error() {
        let mut s = store();
        classify_into(&mut s, "\x1b[1;31mERROR disk full\x1b[0m");

        let expected = "[LOG] ERROR disk full";
        assert_eq!(s.warnings.iter().collect::<Vec<_>>(), vec![expected]);
        assert_eq!(s.secondary.iter().collect::<Vec<_>>(), vec![expected]);
        assert_eq!(s.raw.iter().collect::<Vec<_>>(), vec!["ERROR disk full"]);
    }

    #[test]
    fn warn_notice_reaches_warnings_even_when_primary() {
        let mut s = store();
        classify_into(&mut s, "WARN lm-studio connection flaky");

        assert_eq!(s.warnings.len(), 1);
        assert_eq!(s.primary.len(), 1);
        assert!(s.secondary.is_empty());
    }

    #[test]
    fn summary_ok_updates_only_its_counter() {
        let mut s = store();
        classify_into(
            &mut s,
            "INFO SUMMARY_OK count=4 compressedRounds=2 remainingMessages=10 src=sessionA",
        );
        assert_eq!(s.counters.summary_ok, 4);
        assert_eq!(s.counters.summary_fail, 0);
        assert_eq!(s.counters.llm_req, 0);
        assert!(s.warnings.is_empty());
    }

    #[test]
    fn counters_are_last_write_wins() {
        let mut s = store();
        classify_into(&mut s, "INFO LLM req=5 messages=12 avg_messages=3.50 src=a");
        classify_into(&mut s, "INFO LLM req=2 messages=3 avg_messages=1.00 src=a");
        // Not summed: the newest self-reported value replaces the old.
        assert_eq!(s.counters.llm_req, 2);
        assert_eq!(s.counters.llm_messages, 3);
    }

    #[test]
    fn raw_lines_are_still_routed() {
        let mut s = store();
        classify_into(&mut s, "totally freeform text");
        assert_eq!(s.parsed_lines, 1);
        assert_eq!(
            s.secondary.iter().collect::<Vec<_>>(),
            vec!["[RAW] totally freeform text"]
        );
    }

    proptest! {
        /// Pushing n+k items into a buffer of capacity n keeps exactly
        /// the last n, in their original relative order.
        #[test]
        fn bounded_buffer_keeps_last_n(capacity in 1usize..64, extra in 0usize..128) {
            let mut buf = BoundedBuffer::new(capacity);
            let total = capacity + extra;
            for i in 0..total {
                buf.push(i);
                prop_assert!(buf.len() <= capacity);
            }
            let expected: Vec<usize> = (total - capacity..total).collect();
            prop_assert_eq!(buf.iter().copied().collect::<Vec<_>>(), expected);
        }
    }
}
