//! Log formatting shared by the workspace binaries.

use std::io::{self, IsTerminal};

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Target prefixes of the workspace crates; events from other crates are not rendered.
pub const TARGET_PREFIXES: [&str; 5] = [
    "ai_llm_service",
    "billing_context",
    "chat_agent",
    "settings_store",
    "billing_assistant",
];

/// RFC3339 UTC timer implemented via `chrono` (no extra features).
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        // Keep timestamps compact: no fractional seconds, Z-suffix
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

fn is_workspace_target(target: &str) -> bool {
    TARGET_PREFIXES.iter().any(|p| target.starts_with(p))
}

/// Build a **workspace-scoped** formatting layer writing to stderr.
///
/// - RFC3339 UTC timestamps
/// - Compact single-line format with target and `file:line`
/// - Span close events (duration of instrumented network calls)
/// - ANSI colors only when stderr is a terminal
///
/// Stdout stays free for the chat thread.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stderr().is_terminal();

    let only_workspace = filter::filter_fn(|meta| is_workspace_target(meta.target()));

    let format = fmt::format()
        .compact()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_source_location(true);

    fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(format)
        .with_filter(only_workspace)
}

/// Level directives for every workspace crate, e.g. `chat_agent=debug`.
pub fn level_directives(level: Level) -> Vec<Directive> {
    let lvl = level.as_str().to_lowercase();
    TARGET_PREFIXES
        .iter()
        .filter_map(|p| format!("{p}={lvl}").parse().ok())
        .collect()
}

/// Creates an `EnvFilter` from `RUST_LOG` or `default`, then raises the
/// workspace crates to `level` when one is given.
///
/// Example: `default = "warn"`, `level = Some(Level::DEBUG)` shows WARN
/// globally and DEBUG for the workspace crates.
pub fn env_filter_with_level(default: &str, level: Option<Level>) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    level
        .map(level_directives)
        .unwrap_or_default()
        .into_iter()
        .fold(base, EnvFilter::add_directive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_all_crates() {
        let d = level_directives(Level::DEBUG);
        assert_eq!(d.len(), TARGET_PREFIXES.len());
        assert_eq!(d[2].to_string(), "chat_agent=debug");
    }

    #[test]
    fn target_filter() {
        assert!(is_workspace_target("chat_agent::session"));
        assert!(!is_workspace_target("hyper::proto"));
    }
}
