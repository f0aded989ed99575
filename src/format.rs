use std::path::Path;

use crate::models::{AudioFile, ResultSummary};
use crate::resource::ResultView;

/// Format a duration in seconds as "M:SS".
pub fn format_duration(secs: f64) -> String {
    let total_secs = secs.round() as u64;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02}", minutes, seconds)
}

/// Byte count as megabytes with one decimal, e.g. "2.0 MB".
pub fn format_mb(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Second line of the file picker once a file is chosen.
pub fn file_status_line(file: &AudioFile) -> String {
    format!("{} \u{2022} Ready to process", format_mb(file.size))
}

pub const FILE_PLACEHOLDER: &str = "MP3 files only \u{2022} Max 50MB";

pub fn summarize(view: &ResultView, saved_to: Option<&Path>) -> ResultSummary {
    ResultSummary {
        filename: view.filename.clone(),
        content_type: view.content_type.clone(),
        bytes: view.size,
        saved_to: saved_to.map(Path::to_path_buf),
        duration_secs: view.summary.and_then(|s| s.duration_secs),
    }
}

/// Human-readable result block for the command line.
pub fn format_result(summary: &ResultSummary) -> String {
    let separator = "\u{2500}".repeat(48);
    let duration = summary
        .duration_secs
        .map(format_duration)
        .unwrap_or_else(|| "--".to_string());
    let saved = summary
        .saved_to
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not saved)".to_string());
    format!(
        "\u{1f3b5} {}\n\
         {}\n\
         {:<14}{}\n\
         {:<14}{}\n\
         {:<14}{}\n\
         {:<14}{}",
        summary.filename,
        separator,
        "Type:",
        summary.content_type,
        "Size:",
        format_mb(summary.bytes),
        "Duration:",
        duration,
        "Saved to:",
        saved,
    )
}

/// Format a result summary as pretty-printed JSON.
pub fn format_json(summary: &ResultSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}
