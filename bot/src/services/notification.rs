use crate::models::{Notification, VideoRecord};
use crate::utils::{format_clock, format_percentage};

const UP_INDICATOR: &str = "\u{1F4C8}";
const DOWN_INDICATOR: &str = "\u{1F4C9}";

impl Notification {
    /// `previous` is the record right before `video` in the updated history.
    pub fn new(video: &VideoRecord, previous: &VideoRecord) -> Self {
        Notification {
            title: video.title.clone(),
            duration_seconds: video.duration_seconds,
            url: video.url(),
            previous_mean_seconds: previous.running_mean_seconds,
            new_mean_seconds: video.running_mean_seconds,
        }
    }

    pub fn variation(&self) -> f64 {
        self.new_mean_seconds - self.previous_mean_seconds
    }

    /// Relative change of the mean. `previous_mean_seconds` is never zero
    /// because zero-length videos never enter the history.
    pub fn percent_variation(&self) -> f64 {
        self.variation() / self.previous_mean_seconds * 100.0
    }
}

/// Wording of the post.
#[derive(Debug, Clone)]
pub struct MessageStyle {
    pub header: Option<String>,
    pub stat_label: String,
}

impl Default for MessageStyle {
    fn default() -> Self {
        MessageStyle {
            header: None,
            stat_label: "Mean duration".to_string(),
        }
    }
}

pub fn compose_message(notification: &Notification, style: &MessageStyle) -> String {
    let variation = notification.variation();
    // An unchanged mean keeps the up indicator but has no `+`.
    let indicator = if variation >= 0.0 {
        UP_INDICATOR
    } else {
        DOWN_INDICATOR
    };
    let sign = if variation > 0.0 { '+' } else { '-' };
    let rule_len = notification
        .title
        .chars()
        .count()
        .max(notification.url.chars().count());

    let mut lines = Vec::new();
    if let Some(header) = &style.header {
        lines.push(header.clone());
    }
    lines.push(format!("Title: {}", notification.title));
    lines.push(format!(
        "Duration: {}",
        format_clock(notification.duration_seconds as f64)
    ));
    lines.push(format!("Url: {}", notification.url));
    lines.push("_".repeat(rule_len));
    lines.push(format!(
        "{}: {}",
        style.stat_label,
        format_clock(notification.new_mean_seconds)
    ));
    lines.push(format!(
        "Variation {} {} ({}{})",
        indicator,
        format_percentage(notification.percent_variation()),
        sign,
        format_clock(variation)
    ));

    lines.join("\n")
}
