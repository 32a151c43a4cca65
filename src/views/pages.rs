use std::fmt::Write;
use strum::IntoEnumIterator;

use super::{clock, escape, layout, status_badge, timestamp, Frame};
use crate::models::job::{AspectRatio, ContentLanguage, JobOptions, ShortDuration, VideoJob, VideoQuality};
use crate::models::short::{UploadStatus, VideoShort};
use crate::models::submission::CleanupForm;
use crate::services::session::{Flash, SessionClaims};

/// Upload controls available on the results page.
#[derive(Debug, Clone, Copy)]
pub enum UploadAccess<'a> {
    /// No Google OAuth client is configured on this server.
    Disabled,
    Disconnected,
    Connected(&'a SessionClaims),
}

impl<'a> UploadAccess<'a> {
    pub fn new(enabled: bool, session: Option<&'a SessionClaims>) -> Self {
        match (enabled, session) {
            (false, _) => UploadAccess::Disabled,
            (true, None) => UploadAccess::Disconnected,
            (true, Some(claims)) => UploadAccess::Connected(claims),
        }
    }

    fn session(self) -> Option<&'a SessionClaims> {
        match self {
            UploadAccess::Connected(claims) => Some(claims),
            _ => None,
        }
    }
}

fn select<T>(name: &str, label: &str, selected: T, text: impl Fn(T) -> String) -> String
where
    T: IntoEnumIterator + AsRef<str> + PartialEq + Copy,
{
    let mut options = String::new();
    for value in T::iter() {
        let marker = if value == selected { " selected" } else { "" };
        let _ = write!(
            options,
            "<option value=\"{}\"{marker}>{}</option>",
            escape(value.as_ref()),
            escape(&text(value))
        );
    }
    format!("<label for=\"{name}\">{label}</label><select id=\"{name}\" name=\"{name}\">{options}</select>")
}

fn job_row(job: &VideoJob) -> String {
    let link = if job.status.is_terminal() {
        format!("/results/{}", job.id)
    } else {
        format!("/process/{}", job.id)
    };
    format!(
        "<tr><td><a href=\"{link}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>",
        escape(job.display_title()),
        status_badge(job.status),
        job.options.max_shorts,
        timestamp(job.created_at),
    )
}

fn job_table(jobs: &[VideoJob]) -> String {
    let rows: String = jobs.iter().map(job_row).collect();
    format!(
        "<table class=\"jobs\"><thead><tr><th>Video</th><th>Status</th><th>Shorts</th><th>Submitted</th></tr></thead><tbody>{rows}</tbody></table>"
    )
}

pub fn home(recent: &[VideoJob], flash: Option<Flash>, session: Option<&SessionClaims>) -> String {
    let defaults = JobOptions::default();
    let form = format!(
        r#"<section class="card">
<h1>Turn a YouTube video into Shorts</h1>
<form method="post" action="/submit">
<label for="youtube_url">YouTube URL</label>
<input id="youtube_url" name="youtube_url" type="url" placeholder="https://www.youtube.com/watch?v=..." required>
<div class="options">
{quality}
{ratio}
{duration}
{language}
<label for="max_shorts">Number of shorts</label><input id="max_shorts" name="max_shorts" type="number" min="1" max="20" value="{max_shorts}">
</div>
<button type="submit">Generate shorts</button>
</form>
</section>"#,
        quality = select("video_quality", "Quality", defaults.video_quality, |q: VideoQuality| q.to_string()),
        ratio = select("aspect_ratio", "Aspect ratio", defaults.aspect_ratio, |r: AspectRatio| r.to_string()),
        duration = select("short_duration", "Duration", defaults.short_duration, |d: ShortDuration| {
            format!("{d} seconds")
        }),
        language = select("content_language", "Language", defaults.content_language, |l: ContentLanguage| {
            l.display_name().to_string()
        }),
        max_shorts = defaults.max_shorts,
    );

    let recent_section = if recent.is_empty() {
        String::new()
    } else {
        format!(
            "<section class=\"card\"><h2>Recent jobs</h2>{}<p><a href=\"/jobs\">See all jobs</a></p></section>",
            job_table(recent)
        )
    };

    layout(
        &Frame { title: "New job", flash, session, refresh: false },
        &format!("{form}\n{recent_section}"),
    )
}

pub fn status(job: &VideoJob, flash: Option<Flash>) -> String {
    let progress = job.status.progress();
    let bar_class = if job.status.is_error() { "bar bar-danger" } else { "bar" };
    let outcome = if job.status.is_error() {
        format!(
            "<div class=\"alert alert-danger\">{}</div><p><a href=\"/\">Try another video</a></p>",
            escape(job.error_message.as_deref().unwrap_or("Processing failed"))
        )
    } else if job.status.is_terminal() {
        format!("<p><a class=\"button\" href=\"/results/{}\">View your shorts</a></p>", job.id)
    } else {
        "<p class=\"muted\">This page refreshes automatically.</p>".to_string()
    };

    let body = format!(
        r#"<section class="card">
<h1>{title}</h1>
<p>{badge}</p>
<div class="progress"><div class="{bar_class}" style="width: {progress}%">{progress}%</div></div>
<dl class="meta">
<dt>Source</dt><dd><a href="{url}" rel="noopener">{url}</a></dd>
<dt>Options</dt><dd>{options}</dd>
<dt>Submitted</dt><dd>{created}</dd>
</dl>
{outcome}
</section>"#,
        title = escape(job.display_title()),
        badge = status_badge(job.status),
        url = escape(&job.youtube_url),
        options = escape(&options_summary(&job.options)),
        created = timestamp(job.created_at),
    );

    layout(
        &Frame {
            title: job.display_title(),
            flash,
            session: None,
            refresh: !job.status.is_terminal(),
        },
        &body,
    )
}

fn options_summary(options: &JobOptions) -> String {
    format!(
        "{} · {} · up to {} shorts · {}s · {}",
        options.video_quality,
        options.aspect_ratio,
        options.max_shorts,
        options.short_duration,
        options.content_language.display_name()
    )
}

pub fn jobs(all: &[VideoJob], flash: Option<Flash>, session: Option<&SessionClaims>) -> String {
    let list = if all.is_empty() {
        "<p class=\"muted\">No jobs yet.</p>".to_string()
    } else {
        job_table(all)
    };
    let body = format!(
        r#"<section class="card">
<h1>All jobs</h1>
{list}
</section>
<section class="card danger-zone">
<h2>Delete everything</h2>
<p>Removes every job, every generated short and all downloaded files. This cannot be undone.</p>
<form method="post" action="/cleanup">
<label for="confirm">Type {confirm} to confirm</label>
<input id="confirm" name="confirm" autocomplete="off">
<button class="danger" type="submit">Delete all data</button>
</form>
</section>"#,
        confirm = CleanupForm::CONFIRMATION,
    );
    layout(&Frame { title: "Jobs", flash, session, refresh: false }, &body)
}

fn upload_cell(short: &VideoShort, access: UploadAccess<'_>) -> String {
    let button = |label: &str| match access {
        UploadAccess::Connected(_) => format!(
            "<form method=\"post\" action=\"/shorts/{}/upload\"><button type=\"submit\">{label}</button></form>",
            short.id
        ),
        _ => String::new(),
    };
    match short.upload_status {
        UploadStatus::Completed => match short.youtube_url() {
            Some(url) => format!("<a href=\"{}\" rel=\"noopener\">Watch on YouTube</a>", escape(&url)),
            None => "Uploaded".to_string(),
        },
        UploadStatus::Uploading => "<span class=\"badge badge-info\">Uploading</span>".to_string(),
        UploadStatus::Failed => format!(
            "<span class=\"badge badge-danger\">Upload failed</span><p class=\"error\">{}</p>{}",
            escape(short.upload_error.as_deref().unwrap_or("unknown error")),
            button("Retry upload")
        ),
        UploadStatus::Pending => button("Upload to YouTube"),
    }
}

fn short_card(short: &VideoShort, access: UploadAccess<'_>) -> String {
    let tags = short
        .tags
        .iter()
        .map(|t| format!("<span class=\"tag\">{}</span>", escape(t)))
        .collect::<String>();
    format!(
        r#"<article class="short">
<video controls preload="metadata" src="/shorts/{id}/download"></video>
<h3>#{position} {title}</h3>
<p class="muted">{start} to {end} · score {score:.2}</p>
<p>{description}</p>
<div class="tags">{tags}</div>
<p class="muted">{reason}</p>
<p><a href="/shorts/{id}/download" download>Download</a></p>
<div class="upload">{upload}</div>
</article>"#,
        id = short.id,
        position = short.position,
        title = escape(&short.title),
        start = clock(short.start_time),
        end = clock(short.end_time),
        score = short.score,
        description = escape(&short.description),
        reason = escape(&short.reason),
        upload = upload_cell(short, access),
    )
}

pub fn results(job: &VideoJob, shorts: &[VideoShort], access: UploadAccess<'_>, flash: Option<Flash>) -> String {
    let access = if job.accepts_uploads() { access } else { UploadAccess::Disabled };
    let youtube = match access {
        UploadAccess::Disabled => String::new(),
        UploadAccess::Disconnected => {
            "<p><a class=\"button\" href=\"/youtube/auth\">Connect YouTube to upload</a></p>".to_string()
        }
        UploadAccess::Connected(_) => {
            let pending = shorts.iter().any(|s| s.upload_status == UploadStatus::Pending);
            let upload_all = if pending {
                format!(
                    "<form method=\"post\" action=\"/jobs/{}/upload\"><button type=\"submit\">Upload all to YouTube</button></form>",
                    job.id
                )
            } else {
                String::new()
            };
            format!(
                "<div class=\"youtube\">{upload_all}<form method=\"post\" action=\"/youtube/disconnect\"><button class=\"link\" type=\"submit\">Disconnect YouTube</button></form></div>"
            )
        }
    };

    let cards = if shorts.is_empty() {
        if job.status.is_error() {
            format!(
                "<div class=\"alert alert-danger\">{}</div>",
                escape(job.error_message.as_deref().unwrap_or("Processing failed"))
            )
        } else {
            "<p class=\"muted\">No shorts were generated for this video.</p>".to_string()
        }
    } else {
        shorts.iter().map(|s| short_card(s, access)).collect()
    };

    let body = format!(
        r#"<section class="card">
<h1>{title}</h1>
<p>{badge} {count} shorts</p>
{youtube}
<form method="post" action="/jobs/{id}/delete"><button class="danger" type="submit">Delete job</button></form>
</section>
<section class="shorts">
{cards}
</section>"#,
        title = escape(job.display_title()),
        badge = status_badge(job.status),
        count = shorts.len(),
        id = job.id,
    );

    layout(
        &Frame {
            title: job.display_title(),
            flash,
            session: access.session(),
            refresh: false,
        },
        &body,
    )
}

pub fn error_page(title: &str, message: &str) -> String {
    let body = format!(
        "<section class=\"card\"><h1>{}</h1><p>{}</p><p><a href=\"/\">Back to start</a></p></section>",
        escape(title),
        escape(message)
    );
    layout(&Frame { title, ..Default::default() }, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn job(status: JobStatus) -> VideoJob {
        let now = Utc::now();
        VideoJob {
            id: Uuid::new_v4(),
            youtube_url: "https://www.youtube.com/watch?v=abc123".into(),
            options: JobOptions::default(),
            status,
            title: Some("<b>Talk</b>".into()),
            error_message: None,
            video_path: None,
            transcript_path: None,
            duration_seconds: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    fn short(upload_status: UploadStatus) -> VideoShort {
        VideoShort {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            position: 1,
            start_time: 12.0,
            end_time: 47.5,
            title: "Best moment".into(),
            description: "desc".into(),
            tags: vec!["shorts".into()],
            score: 0.8,
            engagement_score: 0.8,
            emotion_score: 0.8,
            viral_potential: 0.8,
            quotability: 0.8,
            emotions: vec![],
            keywords: vec![],
            reason: "reason".into(),
            output_path: Some("data/outputs/x/short_1.mp4".into()),
            thumbnail_path: None,
            upload_status,
            upload_error: Some("quota".into()),
            youtube_video_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_page_polls_until_terminal() {
        for running in [JobStatus::Pending, JobStatus::Downloading, JobStatus::Editing] {
            assert!(status_page_refreshes(running), "{running} should refresh");
        }
        assert!(!status_page_refreshes(JobStatus::Completed));
        assert!(!status_page_refreshes(JobStatus::Failed));
    }

    fn status_page_refreshes(current: JobStatus) -> bool {
        status(&job(current), None).contains("http-equiv=\"refresh\"")
    }

    #[test]
    fn test_status_page_links_results_when_done() {
        let done = job(JobStatus::Completed);
        assert!(status(&done, None).contains(&format!("/results/{}", done.id)));
    }

    #[test]
    fn test_failed_job_shows_error() {
        let mut failed = job(JobStatus::Failed);
        failed.error_message = Some("download failed: private video".into());
        let html = status(&failed, None);
        assert!(html.contains("badge-danger"));
        assert!(html.contains("download failed: private video"));
    }

    #[test]
    fn test_titles_are_escaped() {
        let html = status(&job(JobStatus::Pending), None);
        assert!(html.contains("&lt;b&gt;Talk&lt;/b&gt;"));
        assert!(!html.contains("<b>Talk</b>"));
    }

    #[test]
    fn test_home_preselects_defaults() {
        let html = home(&[], Some(Flash::MissingUrl), None);
        assert!(html.contains(r#"<option value="9:16" selected>"#));
        assert!(html.contains(r#"<option value="1080p" selected>"#));
        assert!(html.contains("alert-danger"));
    }

    #[test]
    fn test_upload_controls_follow_access() {
        let done = job(JobStatus::Completed);
        let shorts = vec![short(UploadStatus::Pending), short(UploadStatus::Failed)];

        let disabled = results(&done, &shorts, UploadAccess::Disabled, None);
        assert!(!disabled.contains("/upload\""));
        assert!(!disabled.contains("/youtube/auth"));

        let disconnected = results(&done, &shorts, UploadAccess::Disconnected, None);
        assert!(disconnected.contains("/youtube/auth"));

        let keys = crate::services::session::SessionKeys::new("k", false);
        let token = keys.issue_session("creator@example.com", None).unwrap();
        let claims = keys.verify_session(&token).unwrap();
        let connected = results(&done, &shorts, UploadAccess::Connected(&claims), None);
        assert!(connected.contains(&format!("/jobs/{}/upload", done.id)));
        assert!(connected.contains("Retry upload"));
        assert!(connected.contains("creator@example.com"));
    }

    #[test]
    fn test_partial_shorts_of_failed_job_cannot_be_uploaded() {
        let mut failed = job(JobStatus::Failed);
        failed.error_message = Some("edit failed: short 2: ffmpeg exited".into());
        let shorts = vec![short(UploadStatus::Pending)];

        let keys = crate::services::session::SessionKeys::new("k", false);
        let token = keys.issue_session("creator@example.com", None).unwrap();
        let claims = keys.verify_session(&token).unwrap();
        let html = results(&failed, &shorts, UploadAccess::Connected(&claims), None);
        assert!(!html.contains("/upload\""));
        assert!(!html.contains("/youtube/auth"));
        assert!(html.contains("/download"));
    }
}
