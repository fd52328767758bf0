// src/exec/parser.rs

//! Metric extraction from benchmark output
//!
//! Parsers are tied to one benchmark's exact output format. If that format
//! changes the parser finds nothing and the note comes out empty; it never
//! turns a passing job into an error.

use regex::Regex;
use std::sync::LazyLock;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap());

/// Remove ANSI color/style escape sequences
pub fn strip_ansi(s: &str) -> String {
    ANSI_ESCAPE.replace_all(s, "").into_owned()
}

/// Turns a successful job's stdout into a short human-readable note
pub trait OutputParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` when the output holds nothing this parser recognises
    fn parse(&self, stdout: &str) -> Option<String>;
}

/// NetPIPE's closing summary line
///
/// ```text
/// Completed with        max bandwidth   9165.43 Mbps      2.32 usec latency
/// ```
///
/// NetPIPE colours the two numbers, so the value tokens are stripped of
/// escape sequences before use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetPipeParser;

impl NetPipeParser {
    const MARKER: &'static str = "Completed with";
    const BANDWIDTH: usize = 4;
    const BANDWIDTH_UNIT: usize = 5;
    const LATENCY: usize = 6;
    const LATENCY_UNIT: usize = 7;
}

impl OutputParser for NetPipeParser {
    fn name(&self) -> &'static str {
        "netpipe"
    }

    fn parse(&self, stdout: &str) -> Option<String> {
        let line = stdout.lines().find(|l| l.contains(Self::MARKER))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let token = |i: usize| tokens.get(i).map(|t| strip_ansi(t));

        Some(format!(
            "max bandwidth {} {}; latency {} {}",
            token(Self::BANDWIDTH)?,
            token(Self::BANDWIDTH_UNIT)?,
            token(Self::LATENCY)?,
            token(Self::LATENCY_UNIT)?,
        ))
    }
}

/// Parser that never extracts anything, for functional tests
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetrics;

impl OutputParser for NoMetrics {
    fn name(&self) -> &'static str {
        "none"
    }

    fn parse(&self, _stdout: &str) -> Option<String> {
        None
    }
}
