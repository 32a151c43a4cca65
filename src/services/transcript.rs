//! WebVTT subtitle parsing.
//!
//! YouTube auto-captions repeat each line across consecutive cues while the
//! next line is typed in, so a naive parse yields every sentence two or three
//! times. Lines already emitted by recent cues are dropped.

use crate::models::analysis::TranscriptSegment;

/// How many emitted lines are remembered for de-duplication.
const RECENT_LINES: usize = 4;

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.trim().replace(',', ".");
    let parts: Vec<&str> = raw.split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Parse a cue timing line such as `00:00:01.000 --> 00:00:04.500 align:start`.
fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next()?;
    Some((parse_timestamp(start)?, parse_timestamp(end)?))
}

/// Remove inline markup (`<c>`, `<00:00:01.200>`, `<i>`) and decode the common entities.
fn clean_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for ch in line.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a WebVTT document into timed, de-duplicated segments.
pub fn parse_vtt(input: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut recent: Vec<String> = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        let Some((start, end)) = parse_timing(line) else {
            continue;
        };

        let mut fresh = Vec::new();
        while let Some(text) = lines.peek() {
            if text.trim().is_empty() {
                break;
            }
            let cleaned = clean_line(text);
            lines.next();
            if cleaned.is_empty() || recent.contains(&cleaned) {
                continue;
            }
            recent.push(cleaned.clone());
            if recent.len() > RECENT_LINES {
                recent.remove(0);
            }
            fresh.push(cleaned);
        }

        if fresh.is_empty() || end < start {
            continue;
        }
        segments.push(TranscriptSegment {
            start,
            end,
            text: fresh.join(" "),
        });
    }

    segments
}
