//! Keyword heuristics used when no Gemini key is usable.

use crate::models::analysis::{SegmentAnalysis, ShortMetadata};

const ENGAGEMENT_WORDS: &[&str] = &[
    "amazing", "incredible", "wow", "shocking", "unbelievable", "funny", "hilarious", "awesome",
    "fantastic", "mind-blowing", "crazy", "insane", "epic", "legendary",
];
const EMOTION_WORDS: &[&str] = &[
    "love", "hate", "excited", "surprised", "happy", "angry", "scared", "thrilled",
    "disappointed", "frustrated", "overwhelmed", "passionate", "emotional", "heartwarming",
];
const VIRAL_WORDS: &[&str] = &[
    "viral", "trending", "share", "like", "subscribe", "follow", "must-see", "breaking",
    "exclusive", "revealed", "secret", "exposed", "truth", "shocking",
];
const QUOTABLE_WORDS: &[&str] = &[
    "said", "quote", "tells", "explains", "reveals", "admits", "confesses", "announces",
];

const STOPWORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is", "are",
    "was", "were", "a", "an", "this", "that",
];

pub const DEFAULT_TAGS: [&str; 28] = [
    "shorts", "viral", "trending", "mustsee", "amazing", "incredible", "shocking", "unbelievable",
    "funny", "hilarious", "entertainment", "comedy", "emotional", "heartwarming", "inspiring",
    "motivation", "lifestyle", "relatable", "authentic", "genuine", "raw", "real", "moments",
    "reactions", "vibes", "mood", "content", "creator",
];

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_TAGS: usize = 28;
pub const MAX_TAGS_JOINED_LEN: usize = 500;

/// Substring hits, so "loved" counts for "love".
fn hits(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| text.contains(*w)).count()
}

fn mentions_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Words longer than three characters that are not stopwords, in order of appearance.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    text.split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .filter(|w| !STOPWORDS.contains(&w.to_lowercase().as_str()))
        .take(limit)
        .map(str::to_string)
        .collect()
}

pub fn analyze(text: &str) -> SegmentAnalysis {
    let lower = text.to_lowercase();
    let word_count = text.split_whitespace().count();

    let length_bonus = match word_count {
        20..=50 => 0.2,
        10..=80 => 0.1,
        _ => 0.0,
    };
    let score = |hits: usize, weight: f64, floor: f64| {
        let raw = (hits as f64 * weight).min(1.0);
        (raw + length_bonus).min(1.0).max(floor)
    };

    let mut emotions = Vec::new();
    if mentions_any(&lower, &["funny", "hilarious", "joke", "laugh"]) {
        emotions.push("humor".to_string());
    }
    if mentions_any(&lower, &["shocking", "surprised", "unexpected"]) {
        emotions.push("surprise".to_string());
    }
    if mentions_any(&lower, &["love", "heartwarming", "beautiful"]) {
        emotions.push("inspiration".to_string());
    }
    if mentions_any(&lower, &["angry", "frustrated", "hate"]) {
        emotions.push("controversy".to_string());
    }
    if emotions.is_empty() {
        emotions.push("general".to_string());
    }

    let reason = format!(
        "Heuristic analysis: {word_count} words, detected {} content",
        emotions.join(", ")
    );

    SegmentAnalysis {
        engagement_score: score(hits(&lower, ENGAGEMENT_WORDS), 0.15, 0.4),
        emotion_score: score(hits(&lower, EMOTION_WORDS), 0.15, 0.3),
        viral_potential: score(hits(&lower, VIRAL_WORDS), 0.2, 0.3),
        quotability: score(hits(&lower, QUOTABLE_WORDS), 0.2, 0.2),
        keywords: extract_keywords(text, 8),
        emotions,
        reason,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Humor,
    Shock,
    Amazing,
    Secret,
    Music,
    General,
}

impl Theme {
    fn detect(lower: &str) -> Self {
        if mentions_any(lower, &["funny", "hilarious", "joke", "laugh"]) {
            Theme::Humor
        } else if mentions_any(lower, &["shocking", "unbelievable", "incredible", "insane"]) {
            Theme::Shock
        } else if mentions_any(lower, &["amazing", "awesome", "fantastic"]) {
            Theme::Amazing
        } else if mentions_any(lower, &["secret", "revealed", "truth", "hidden"]) {
            Theme::Secret
        } else if mentions_any(lower, &["music", "song", "dance", "singing"]) {
            Theme::Music
        } else {
            Theme::General
        }
    }

    fn title(self, subject: &str) -> String {
        match self {
            Theme::Humor => format!("😂 HILARIOUS: {subject} - You Won't Stop Laughing! 🤣 #Shorts #Viral"),
            Theme::Shock => format!("😱 SHOCKING: {subject} - This Will Blow Your Mind! 🤯 #Shorts #Viral"),
            Theme::Amazing => format!("🔥 AMAZING: {subject} - Absolutely Incredible! ✨ #Shorts #Viral"),
            Theme::Secret => format!("🤫 REVEALED: {subject} - The Truth Exposed! 😲 #Shorts #Viral"),
            Theme::Music => format!("🎵 VIRAL MUSIC: {subject} - This Hit Different! 🎶 #Shorts #Viral"),
            Theme::General => format!("🔥 VIRAL: {subject} - Must See This! 😍 #Shorts #Viral"),
        }
    }

    fn emoji(self) -> &'static str {
        match self {
            Theme::Humor => "😂",
            Theme::Shock => "😱",
            Theme::Amazing => "🔥",
            Theme::Secret => "🤫",
            Theme::Music => "🎵",
            Theme::General => "✨",
        }
    }
}

pub fn metadata(segment_text: &str, original_title: &str) -> ShortMetadata {
    let lower = segment_text.to_lowercase();
    let theme = Theme::detect(&lower);
    let subject = extract_keywords(segment_text, 2).join(" ");

    let excerpt: String = segment_text.chars().take(300).collect();
    let description = format!(
        "{emoji} A moment from \"{original_title}\" worth watching twice.\n\n\
         \"{excerpt}...\"\n\n\
         Like, comment and subscribe for more shorts like this one.\n\n\
         #Shorts #Viral #Trending",
        emoji = theme.emoji(),
    );

    ShortMetadata {
        title: truncate_chars(&theme.title(&subject), MAX_TITLE_CHARS),
        description,
        tags: fit_tags(DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()),
    }
}

/// Cut to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Keep at most 28 tags whose ", "-joined length stays within 500 characters.
pub fn fit_tags(tags: Vec<String>) -> Vec<String> {
    let mut kept = Vec::new();
    let mut joined_len = 0;
    for tag in tags.into_iter().map(|t| t.trim().to_string()) {
        if tag.is_empty() {
            continue;
        }
        if kept.len() == MAX_TAGS {
            break;
        }
        let added = tag.chars().count() + if kept.is_empty() { 0 } else { 2 };
        if joined_len + added > MAX_TAGS_JOINED_LEN {
            break;
        }
        joined_len += added;
        kept.push(tag);
    }
    kept
}
