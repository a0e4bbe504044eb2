//! Terminal rendering of download progress.

use depforge_fetch::Progress;
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};
use std::sync::Mutex;

const BAR_TEMPLATE: &str = "{prefix} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {msg}";

struct ActiveDownload {
    url: String,
    bar: ProgressBar,
}

static ACTIVE: Mutex<Option<ActiveDownload>> = Mutex::new(None);

/// Progress callback handed to the orchestrator; one bar per URL on stderr.
pub fn render_progress(progress: &Progress) {
    let mut active = ACTIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if !matches!(active.as_ref(), Some(a) if a.url == progress.url) {
        if let Some(previous) = active.take() {
            previous.bar.abandon();
        }
        *active = Some(ActiveDownload {
            url: progress.url.to_string(),
            bar: new_bar(progress),
        });
    }

    let Some(current) = active.as_ref() else {
        return;
    };
    current.bar.set_position(progress.downloaded);
    current.bar.set_message(status_message(progress));

    if progress.downloaded >= progress.total {
        current.bar.finish();
        *active = None;
    }
}

fn new_bar(progress: &Progress) -> ProgressBar {
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    let bar = ProgressBar::new(progress.total).with_style(style);
    bar.set_prefix(file_name(progress.url).to_string());
    bar
}

fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Smoothed rate and ETA as computed by the downloader.
fn status_message(progress: &Progress) -> String {
    let mut parts = Vec::new();
    if let Some(rate) = progress.rate {
        parts.push(format!("{}/s", HumanBytes(rate as u64)));
    }
    if let Some(eta) = progress.eta {
        parts.push(format!("ETA {}", HumanDuration(eta)));
    }
    parts.join(" ")
}
