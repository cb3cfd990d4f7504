//! Line classification for the watch stream.
//!
//! The watch command emits plain-text log lines in a handful of fixed
//! grammars (`INFO LLM ...`, `INFO SUMMARY_OK ...`, and so on). This
//! module cleans each raw line (ANSI stripping + trimming) and maps it
//! to exactly one [`LogEvent`]. Classification is total: a line that
//! matches no structured grammar still becomes a [`LogEvent::Raw`].
//!
//! Matchers are tried in a fixed order and the first full-line match
//! wins, so adding a pattern never changes how earlier grammars parse.

use regex::Regex;

/// Severity marker of an unstructured `WARN`/`ERROR` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Line began with `WARN`.
    Warn,
    /// Line began with `ERROR`.
    Error,
}

impl Level {
    /// Display label, matching the literal marker in the log line.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// A classified log line.
///
/// Numeric fields are the values the monitored application reported
/// about itself (running totals, last-request stats). The viewer never
/// recomputes them — they are carried through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    /// `INFO LLM req=.. messages=.. avg_messages=.. src=..`
    LlmRequest {
        req: u64,
        messages: u64,
        avg_messages: f64,
        src: String,
    },
    /// `INFO SUMMARY_OK count=.. compressedRounds=.. remainingMessages=.. src=..`
    ///
    /// `compressed_rounds` and `remaining_messages` are opaque tokens,
    /// not necessarily numeric.
    SummaryOk {
        count: u64,
        compressed_rounds: String,
        remaining_messages: String,
        src: String,
    },
    /// `WARN SUMMARY_FAIL count=.. [pendingRounds=..] src=..`
    SummaryFail {
        count: u64,
        pending_rounds: Option<String>,
        src: String,
    },
    /// `INFO CACHE_TRACE req=.. messages=.. toolResult=.. ...` (ten fields).
    CacheTrace {
        req: u64,
        messages: u64,
        tool_result: u64,
        req_tool_pct: f64,
        total_messages: u64,
        total_tool_result: u64,
        total_tool_pct: f64,
        provider: String,
        model: String,
        session: String,
        ts: String,
    },
    /// A line starting with a bare `WARN`/`ERROR` marker that matched
    /// no structured grammar. Carries the full cleaned line.
    LogNotice { level: Level, text: String },
    /// Anything else — kept verbatim so nothing is dropped silently.
    Raw { text: String },
}

impl LogEvent {
    /// Source hint used for group assignment.
    ///
    /// Only the summary/LLM grammars carry an explicit `src=` field;
    /// other events fall back to the line text alone.
    fn source_hint(&self) -> &str {
        match self {
            Self::LlmRequest { src, .. }
            | Self::SummaryOk { src, .. }
            | Self::SummaryFail { src, .. } => src,
            Self::CacheTrace { .. } | Self::LogNotice { .. } | Self::Raw { .. } => "",
        }
    }
}

/// Which dashboard panel an event belongs to.
///
/// Computed once at classification time by a case-insensitive token
/// search over the event's source hint plus the full cleaned line;
/// consumers carry the tag instead of re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// The product-name token was found.
    Primary,
    /// Everything else.
    Secondary,
}

/// A [`LogEvent`] with its panel assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub event: LogEvent,
    pub group: Group,
}

/// Immutable classifier configuration.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Substrings (matched case-insensitively) that route an event to
    /// the primary panel.
    pub primary_tokens: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            primary_tokens: vec!["lm-studio".to_owned(), "lm studio".to_owned()],
        }
    }
}

/// Compiled pattern table plus group configuration.
///
/// Built once at startup; all patterns are fixed string literals, so
/// compilation cannot fail at runtime.
#[derive(Debug)]
pub struct Classifier {
    llm: Regex,
    summary_ok: Regex,
    summary_fail: Regex,
    cache: Regex,
    ansi: Regex,
    primary_tokens: Vec<String>,
}

impl Classifier {
    /// Compile the pattern table.
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            llm: Regex::new(
                r"^INFO LLM req=(\d+) messages=(\d+) avg_messages=([0-9.]+) src=(.+)$",
            )
            .unwrap(),
            summary_ok: Regex::new(
                r"^INFO SUMMARY_OK count=(\d+) compressedRounds=(\S+) remainingMessages=(\S+) src=(.+)$",
            )
            .unwrap(),
            summary_fail: Regex::new(
                r"^WARN SUMMARY_FAIL count=(\d+)(?: pendingRounds=(\S+))? src=(.+)$",
            )
            .unwrap(),
            cache: Regex::new(
                r"^INFO CACHE_TRACE req=(\d+) messages=(\d+) toolResult=(\d+) reqToolResultPct=([0-9.]+)% totalMessages=(\d+) totalToolResult=(\d+) totalToolResultPct=([0-9.]+)% provider=(\S+) model=(\S+) session=(\S+) ts=(.+)$",
            )
            .unwrap(),
            ansi: Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap(),
            primary_tokens: config
                .primary_tokens
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
        }
    }

    /// Strip ANSI control sequences and trim surrounding whitespace.
    ///
    /// A line that becomes empty here must be dropped by the caller —
    /// [`classify`](Self::classify) is never given empty input.
    pub fn clean(&self, raw: &str) -> String {
        self.ansi.replace_all(raw, "").trim().to_owned()
    }

    /// Map a cleaned, non-empty line to exactly one event.
    ///
    /// Matcher priority: LLM → SummaryOk → SummaryFail → CacheTrace →
    /// WARN/ERROR notice → raw fallback. First match wins.
    pub fn classify(&self, clean: &str) -> Classified {
        let event = self.match_line(clean);
        let group = self.group_for(event.source_hint(), clean);
        Classified { event, group }
    }

    fn match_line(&self, clean: &str) -> LogEvent {
        if let Some(caps) = self.llm.captures(clean) {
            return LogEvent::LlmRequest {
                req: parse_u64(&caps[1]),
                messages: parse_u64(&caps[2]),
                avg_messages: parse_f64(&caps[3]),
                src: caps[4].to_owned(),
            };
        }
        if let Some(caps) = self.summary_ok.captures(clean) {
            return LogEvent::SummaryOk {
                count: parse_u64(&caps[1]),
                compressed_rounds: caps[2].to_owned(),
                remaining_messages: caps[3].to_owned(),
                src: caps[4].to_owned(),
            };
        }
        if let Some(caps) = self.summary_fail.captures(clean) {
            return LogEvent::SummaryFail {
                count: parse_u64(&caps[1]),
                pending_rounds: caps.get(2).map(|m| m.as_str().to_owned()),
                src: caps[3].to_owned(),
            };
        }
        if let Some(caps) = self.cache.captures(clean) {
            return LogEvent::CacheTrace {
                req: parse_u64(&caps[1]),
                messages: parse_u64(&caps[2]),
                tool_result: parse_u64(&caps[3]),
                req_tool_pct: parse_f64(&caps[4]),
                total_messages: parse_u64(&caps[5]),
                total_tool_result: parse_u64(&caps[6]),
                total_tool_pct: parse_f64(&caps[7]),
                provider: caps[8].to_owned(),
                model: caps[9].to_owned(),
                session: caps[10].to_owned(),
                ts: caps[11].to_owned(),
            };
        }
        if clean.starts_with("WARN") {
            return LogEvent::LogNotice {
                level: Level::Warn,
                text: clean.to_owned(),
            };
        }
        if clean.starts_with("ERROR") {
            return LogEvent::LogNotice {
                level: Level::Error,
                text: clean.to_owned(),
            };
        }
        LogEvent::Raw {
            text: clean.to_owned(),
        }
    }

    /// Group assignment: primary if any configured token appears in the
    /// source hint or the line itself.
    fn group_for(&self, src_hint: &str, clean: &str) -> Group {
        let haystack = format!("{src_hint} {clean}").to_lowercase();
        if self
            .primary_tokens
            .iter()
            .any(|token| haystack.contains(token))
        {
            Group::Primary
        } else {
            Group::Secondary
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

/// Parse an integer capture that the pattern already constrained to `\d+`.
///
/// Values too large for u64 saturate rather than fail — the stream is
/// untrusted and a counter overflow must not take the viewer down.
fn parse_u64(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

/// Parse a decimal capture constrained to `[0-9.]+`.
///
/// Degenerate inputs like `1.2.3` fall back to zero.
fn parse_f64(digits: &str) -> f64 {
    digits.parse().unwrap_or(0.0)
}
