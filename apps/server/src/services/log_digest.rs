//! Condensed view of a build log: error lines with context, or the tail.

use std::sync::LazyLock;

use regex::Regex;

/// Lines kept before and after each matching line.
pub const CONTEXT_LINES: usize = 4;

/// Lines kept when no line matches.
pub const TAIL_LINES: usize = 100;

/// Separator between non-adjacent windows.
pub const SKIP_MARKER: &str = "...";

static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(error|errors|fail|failed|failure|panic|fatal|timeout|timed out)\b")
        .expect("error line pattern is valid")
});

/// Digest `log`. Invalid UTF-8 is replaced rather than rejected.
pub fn digest(log: &[u8]) -> String {
    let text = String::from_utf8_lossy(log);
    let lines: Vec<&str> = text.lines().collect();

    let hits: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| ERROR_LINE.is_match(line))
        .map(|(i, _)| i)
        .collect();

    if hits.is_empty() {
        let start = lines.len().saturating_sub(TAIL_LINES);
        return lines[start..].join("\n");
    }

    let windows = merge_windows(&hits, lines.len());
    windows
        .iter()
        .map(|&(start, end)| lines[start..end].join("\n"))
        .collect::<Vec<_>>()
        .join(&format!("\n{}\n", SKIP_MARKER))
}

/// Half-open `[start, end)` windows around each hit, merged when they touch.
fn merge_windows(hits: &[usize], len: usize) -> Vec<(usize, usize)> {
    let mut windows: Vec<(usize, usize)> = Vec::new();
    for &hit in hits {
        let start = hit.saturating_sub(CONTEXT_LINES);
        let end = (hit + CONTEXT_LINES + 1).min(len);
        match windows.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => windows.push((start, end)),
        }
    }
    windows
}
