//! Progress shown while a transfer is outstanding.
//!
//! None of these numbers measure the server's work. In `Upload` mode the
//! request body fills the 10..30 band as it is handed to the connection, then
//! the timer takes over while the service processes. In `Heuristic` mode it is
//! only the timer. Either way it is capped at 90 until the response lands.

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::models::TransferEvent;
use crate::transfer::TransferListener;

pub const START_PERCENT: u8 = 10;
pub const STEP_PERCENT: u8 = 10;
pub const CAP_PERCENT: u8 = 90;
/// Where a fully sent request body leaves the bar in upload mode.
pub const UPLOAD_DONE_PERCENT: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Uploading,
    Processing,
    Finishing,
    Complete,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Starting => "Uploading and processing audio...",
            Phase::Uploading => "Uploading file...",
            Phase::Processing => "Processing audio...",
            Phase::Finishing => "Almost done...",
            Phase::Complete => "Processing complete!",
        }
    }

    fn for_percent(percent: u8) -> Phase {
        if percent < 30 {
            Phase::Uploading
        } else if percent < 70 {
            Phase::Processing
        } else {
            Phase::Finishing
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub percent: u8,
    pub phase: Phase,
}

impl TransferProgress {
    pub fn started() -> Self {
        Self {
            percent: START_PERCENT,
            phase: Phase::Starting,
        }
    }

    pub fn complete() -> Self {
        Self {
            percent: 100,
            phase: Phase::Complete,
        }
    }

    pub fn label(&self) -> &'static str {
        self.phase.label()
    }
}

/// Where progress numbers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Follow the request body, then fall back to the timer.
    #[default]
    Upload,
    /// Fixed-interval timer only.
    Heuristic,
}

/// Monotonic progress state for one transfer.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    mode: ProgressMode,
    current: TransferProgress,
    upload_done: bool,
}

impl ProgressTracker {
    pub fn new(mode: ProgressMode) -> Self {
        Self {
            mode,
            current: TransferProgress::started(),
            upload_done: false,
        }
    }

    pub fn current(&self) -> TransferProgress {
        self.current
    }

    /// Timer tick. Returns the new progress if it moved.
    pub fn tick(&mut self) -> Option<TransferProgress> {
        if self.mode == ProgressMode::Upload && !self.upload_done {
            return None;
        }
        let pct = self.current.percent;
        if pct >= CAP_PERCENT {
            return None;
        }
        // Label follows the value before the step.
        self.current = TransferProgress {
            percent: (pct + STEP_PERCENT).min(CAP_PERCENT),
            phase: Phase::for_percent(pct),
        };
        Some(self.current)
    }

    /// Body bytes handed to the connection so far. Ignored in heuristic mode.
    pub fn record_upload(&mut self, sent: u64, total: u64) -> Option<TransferProgress> {
        if self.mode == ProgressMode::Heuristic || self.upload_done {
            return None;
        }
        let done = sent >= total;
        let span = (UPLOAD_DONE_PERCENT - START_PERCENT) as u64;
        let pct = if total == 0 {
            UPLOAD_DONE_PERCENT
        } else {
            START_PERCENT + (span * sent.min(total) / total) as u8
        };
        self.upload_done = done;
        let next = TransferProgress {
            percent: pct.max(self.current.percent).min(CAP_PERCENT),
            phase: if done { Phase::Processing } else { Phase::Uploading },
        };
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }

    pub fn complete(&mut self) -> TransferProgress {
        self.current = TransferProgress::complete();
        self.current
    }
}

/// Terminal progress bar for the command-line client.
pub struct CliListener {
    pb: ProgressBar,
}

impl CliListener {
    pub fn new() -> Self {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { pb }
    }

    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl Default for CliListener {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferListener for CliListener {
    fn on_event(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::Progress(p) => {
                self.pb.set_position(p.percent as u64);
                self.pb.set_message(p.label());
            }
            TransferEvent::HeadersReceived { status } => {
                self.pb.set_message(format!("Response {}", status));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_sequence() {
        let mut t = ProgressTracker::new(ProgressMode::Heuristic);
        assert_eq!(t.current(), TransferProgress::started());

        let mut seen = Vec::new();
        while let Some(p) = t.tick() {
            seen.push((p.percent, p.phase));
        }
        assert_eq!(
            seen,
            vec![
                (20, Phase::Uploading),
                (30, Phase::Uploading),
                (40, Phase::Processing),
                (50, Phase::Processing),
                (60, Phase::Processing),
                (70, Phase::Processing),
                (80, Phase::Finishing),
                (90, Phase::Finishing),
            ]
        );
        assert_eq!(t.tick(), None);
        assert_eq!(t.current().percent, 90);
    }

    #[test]
    fn test_heuristic_ignores_upload_events() {
        let mut t = ProgressTracker::new(ProgressMode::Heuristic);
        assert_eq!(t.record_upload(50, 100), None);
        assert_eq!(t.current().percent, START_PERCENT);
    }

    #[test]
    fn test_upload_mode_follows_bytes_then_timer() {
        let mut t = ProgressTracker::new(ProgressMode::Upload);
        assert_eq!(t.tick(), None, "timer waits for the body");

        let p = t.record_upload(50, 100).unwrap();
        assert_eq!(p.percent, 20);
        assert_eq!(p.phase, Phase::Uploading);

        let p = t.record_upload(100, 100).unwrap();
        assert_eq!(p.percent, UPLOAD_DONE_PERCENT);
        assert_eq!(p.phase, Phase::Processing);

        let mut seen = Vec::new();
        while let Some(p) = t.tick() {
            seen.push((p.percent, p.phase));
        }
        assert_eq!(
            seen,
            vec![
                (40, Phase::Processing),
                (50, Phase::Processing),
                (60, Phase::Processing),
                (70, Phase::Processing),
                (80, Phase::Finishing),
                (90, Phase::Finishing),
            ]
        );
        assert_eq!(t.current().label(), "Almost done...");
    }

    #[test]
    fn test_upload_mode_partial_body_holds_timer() {
        let mut t = ProgressTracker::new(ProgressMode::Upload);
        t.record_upload(0, 100);
        assert_eq!(t.current().percent, START_PERCENT);
        t.record_upload(25, 100);
        assert_eq!(t.current().percent, 15);
        assert_eq!(t.tick(), None);
        assert_eq!(t.record_upload(25, 100), None);
    }

    #[test]
    fn test_empty_body_goes_straight_to_timer() {
        let mut t = ProgressTracker::new(ProgressMode::Upload);
        let p = t.record_upload(0, 0).unwrap();
        assert_eq!(p.percent, UPLOAD_DONE_PERCENT);
        assert_eq!(t.tick().map(|p| p.percent), Some(40));
        assert_eq!(t.record_upload(0, 0), None, "body already finished");
    }

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let mut t = ProgressTracker::new(ProgressMode::Upload);
        let mut last = t.current().percent;
        for sent in [10, 5, 60, 40, 99, 100, 100] {
            t.record_upload(sent, 100);
            t.tick();
            let pct = t.current().percent;
            assert!(pct >= last);
            assert!(pct <= CAP_PERCENT);
            last = pct;
        }
        assert_eq!(t.complete().percent, 100);
        assert_eq!(t.current().label(), "Processing complete!");
    }
}
