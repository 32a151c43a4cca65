//! Server-rendered HTML. Pages are assembled with `format!`; every value that
//! comes from users, yt-dlp or the AI model passes through [`escape`].

pub mod pages;

use chrono::{DateTime, Utc};

use crate::models::job::JobStatus;
use crate::services::session::{Flash, SessionClaims};

/// Seconds between status page reloads while a job is running.
pub const STATUS_REFRESH_SECS: u32 = 5;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Everything the shared page frame needs besides the body.
#[derive(Debug, Default)]
pub struct Frame<'a> {
    pub title: &'a str,
    pub flash: Option<Flash>,
    pub session: Option<&'a SessionClaims>,
    /// Emit a meta refresh so the browser polls this page.
    pub refresh: bool,
}

pub fn layout(frame: &Frame<'_>, body: &str) -> String {
    let refresh = if frame.refresh {
        format!("<meta http-equiv=\"refresh\" content=\"{STATUS_REFRESH_SECS}\">\n")
    } else {
        String::new()
    };
    let account = match frame.session {
        Some(claims) => format!(
            "<span class=\"account\">YouTube: {}</span>",
            escape(claims.channel.as_deref().unwrap_or(claims.account_email()))
        ),
        None => String::new(),
    };
    let flash = frame.flash.map(flash_banner).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
{refresh}<title>{title} · Shorts Generator</title>
<link rel="stylesheet" href="/static/app.css">
</head>
<body>
<nav class="topbar"><a class="brand" href="/">Shorts Generator</a><a href="/jobs">All jobs</a>{account}</nav>
<main>
{flash}{body}
</main>
</body>
</html>"#,
        title = escape(frame.title),
    )
}

fn flash_banner(flash: Flash) -> String {
    format!(
        "<div class=\"alert alert-{}\" role=\"alert\">{}</div>\n",
        flash.level().css_class(),
        escape(flash.message())
    )
}

pub fn status_badge(status: JobStatus) -> String {
    let class = match status {
        JobStatus::Completed => "success",
        JobStatus::Failed => "danger",
        JobStatus::Pending => "secondary",
        _ => "info",
    };
    format!("<span class=\"badge badge-{class}\">{}</span>", status.label())
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// `m:ss` for clip offsets.
pub fn clock(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
