//! Candidate window construction and final selection.

use std::cmp::Ordering;

use crate::models::analysis::{CandidateWindow, ScoredWindow, TranscriptSegment};
use crate::services::fallback;

/// Upper bound on windows sent to the AI scorer for one video.
pub const MAX_SCORED_WINDOWS: usize = 40;

/// Greedily merge consecutive segments into non-overlapping windows whose
/// length falls within `(min, max)` seconds.
///
/// A window closes as soon as it reaches `min`. When the last segment pushes it
/// past `max`, the end is clamped to `start + max`. A segment starting at or
/// after `start + max` would fall outside the clip, so the open window is
/// abandoned and a new one starts there. A run shorter than `min` is dropped.
pub fn build_windows(segments: &[TranscriptSegment], (min, max): (f64, f64)) -> Vec<CandidateWindow> {
    let mut windows = Vec::new();
    let mut current: Option<CandidateWindow> = None;

    for segment in segments.iter().filter(|s| s.end > s.start) {
        if current.as_ref().is_some_and(|w| segment.start >= w.start + max) {
            current = None;
        }
        match current.as_mut() {
            Some(window) => {
                window.end = window.end.max(segment.end);
                window.text.push(' ');
                window.text.push_str(&segment.text);
            }
            None => {
                current = Some(CandidateWindow {
                    start: segment.start,
                    end: segment.end,
                    text: segment.text.clone(),
                })
            }
        }

        let Some(window) = current.as_mut() else {
            continue;
        };
        if window.duration() >= min {
            if window.duration() > max {
                window.end = window.start + max;
            }
            windows.extend(current.take());
        }
    }

    windows
}

/// Keep the `limit` most promising windows by heuristic score, in time order.
pub fn pre_rank(windows: Vec<CandidateWindow>, limit: usize) -> Vec<CandidateWindow> {
    if windows.len() <= limit {
        return windows;
    }
    let mut ranked: Vec<(f64, CandidateWindow)> = windows
        .into_iter()
        .map(|w| (fallback::analyze(&w.text).overall_score(), w))
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    ranked.truncate(limit);

    let mut kept: Vec<CandidateWindow> = ranked.into_iter().map(|(_, w)| w).collect();
    kept.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));
    kept
}

/// Highest-scoring windows first, skipping any that overlap one already chosen.
pub fn select_top(mut scored: Vec<ScoredWindow>, max_shorts: usize) -> Vec<ScoredWindow> {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut chosen: Vec<ScoredWindow> = Vec::with_capacity(max_shorts);
    for candidate in scored {
        if chosen.len() == max_shorts {
            break;
        }
        if chosen.iter().any(|c| c.window.overlaps(&candidate.window)) {
            continue;
        }
        chosen.push(candidate);
    }
    chosen
}
