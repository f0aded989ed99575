use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};
use ratatui::Frame;

use super::app::{App, Field, View};
use crate::form::{MAX_SEMITONES, MIN_SEMITONES};
use crate::format::{file_status_line, format_duration, format_mb, FILE_PLACEHOLDER};
use crate::models::{PitchMode, ProcessingState};
use crate::resource::PlaybackState;
use crate::session::SessionSnapshot;

const ACCENT: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;
const COMPLETE_COLOR: Color = Color::Green;
const ERROR_COLOR: Color = Color::Red;
const PROGRESS_COLOR: Color = Color::Yellow;

pub fn render(frame: &mut Frame, app: &App) {
    let snap = app.session.snapshot();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(9), // Form
            Constraint::Length(3), // Progress
            Constraint::Min(6),    // Result
            Constraint::Length(1), // Status
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, app, &snap, chunks[0]);
    render_form(frame, app, &snap, chunks[1]);
    render_progress(frame, &snap, chunks[2]);
    render_result(frame, &snap, chunks[3]);
    render_status(frame, app, chunks[4]);
    render_footer(frame, chunks[5]);

    // Overlays
    if app.view == View::About {
        render_about_overlay(frame);
    }
    if let Some(ref notice) = snap.notice {
        render_notice_overlay(frame, notice);
    }
}

fn block(title: &str) -> Block<'_> {
    Block::default()
        .title(Span::styled(title, Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
}

fn render_header(frame: &mut Frame, app: &App, snap: &SessionSnapshot, area: Rect) {
    let (state_text, state_color) = match snap.state {
        ProcessingState::Idle => ("idle", DIM),
        ProcessingState::Validating => ("validating", PROGRESS_COLOR),
        ProcessingState::Transferring => ("transferring", PROGRESS_COLOR),
        ProcessingState::Decoding => ("decoding", PROGRESS_COLOR),
        ProcessingState::Complete => ("complete", COMPLETE_COLOR),
        ProcessingState::Failed => ("failed", ERROR_COLOR),
    };

    let text = Line::from(vec![
        Span::styled("Endpoint: ", Style::default().fg(DIM)),
        Span::styled(app.endpoint.as_str(), Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled("State: ", Style::default().fg(DIM)),
        Span::styled(state_text, Style::default().fg(state_color)),
    ]);

    frame.render_widget(Paragraph::new(text).block(block(" Repitch ")), area);
}

fn label(name: &str, focused: bool) -> Span<'static> {
    let style = if focused {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DIM)
    };
    Span::styled(format!("{:<12}", name), style)
}

fn field_style(focused: bool) -> Style {
    if focused {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    } else {
        Style::default().fg(Color::White)
    }
}

/// Slider track from -12 to 12 with a marker at the current value.
fn semitone_track(value: i32) -> String {
    (MIN_SEMITONES..=MAX_SEMITONES)
        .map(|v| {
            if v == value {
                '\u{25cf}'
            } else if v == 0 {
                '\u{253c}'
            } else {
                '\u{2500}'
            }
        })
        .collect()
}

fn render_form(frame: &mut Frame, app: &App, snap: &SessionSnapshot, area: Rect) {
    let form = &snap.form;
    let focus = app.focus;

    let file_detail = match form.file {
        Some(ref file) => Line::from(vec![
            Span::raw(" ".repeat(12)),
            Span::styled(format!("\u{1f3b5} {}  ", file.name), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(file_status_line(file), Style::default().fg(DIM)),
        ]),
        None => Line::from(vec![
            Span::raw(" ".repeat(12)),
            Span::styled(format!("\u{1f4c1} {}", FILE_PLACEHOLDER), Style::default().fg(DIM)),
        ]),
    };

    let radio = |mode: PitchMode, text: &str| {
        let mark = if form.mode == mode { "(\u{2022})" } else { "( )" };
        Span::styled(format!("{} {}   ", mark, text), field_style(focus == Field::Mode && form.mode == mode))
    };

    let pitch_line = match form.mode {
        PitchMode::Shift => Line::from(vec![
            label("Semitones", focus == Field::Semitones),
            Span::styled(format!("{:+} st ", form.semitones.range_value()), Style::default().fg(Color::White)),
            Span::styled(semitone_track(form.semitones.range_value()), Style::default().fg(ACCENT)),
            Span::raw("  "),
            Span::styled(format!("[{:>3}]", app.number_input), field_style(focus == Field::Semitones)),
        ]),
        PitchMode::Note => Line::from(vec![
            label("Target note", focus == Field::Note),
            Span::styled(format!("[{:<8}]", form.note), field_style(focus == Field::Note)),
            Span::styled("  e.g. C4, A#3, Bb5", Style::default().fg(DIM)),
        ]),
    };

    let submit_style = if !snap.trigger_enabled {
        Style::default().fg(DIM)
    } else if focus == Field::Submit {
        Style::default().bg(ACCENT).fg(Color::Black).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(ACCENT)
    };

    let text = vec![
        Line::from(vec![
            label("File", focus == Field::File),
            Span::styled(format!("[{}]", app.path_input), field_style(focus == Field::File)),
        ]),
        file_detail,
        Line::from(""),
        Line::from(vec![
            label("Mode", focus == Field::Mode),
            radio(PitchMode::Shift, "Shift by semitones"),
            radio(PitchMode::Note, "To target note"),
        ]),
        pitch_line,
        Line::from(""),
        Line::from(vec![
            Span::raw(" ".repeat(12)),
            Span::styled(format!("[ {} ]", app.submit_label()), submit_style),
        ]),
    ];

    frame.render_widget(Paragraph::new(text).block(block(" Input ")), area);
}

fn render_progress(frame: &mut Frame, snap: &SessionSnapshot, area: Rect) {
    match snap.progress {
        Some(progress) => {
            let gauge = Gauge::default()
                .block(block(" Progress "))
                .gauge_style(Style::default().fg(PROGRESS_COLOR))
                .percent(progress.percent.min(100) as u16)
                .label(format!("{}% {}", progress.percent, progress.label()));
            frame.render_widget(gauge, area);
        }
        None => {
            let idle = Paragraph::new(Span::styled("\u{00b7}", Style::default().fg(DIM)))
                .alignment(Alignment::Center)
                .block(block(" Progress "));
            frame.render_widget(idle, area);
        }
    }
}

fn render_result(frame: &mut Frame, snap: &SessionSnapshot, area: Rect) {
    let Some(ref result) = snap.result else {
        let empty = Paragraph::new(Span::styled("No result yet", Style::default().fg(DIM)))
            .alignment(Alignment::Center)
            .block(block(" Result "));
        frame.render_widget(empty, area);
        return;
    };

    let (play_text, play_color) = match result.playback {
        PlaybackState::Playing => ("\u{25b6} playing", COMPLETE_COLOR),
        PlaybackState::Paused => ("\u{23f8} paused", PROGRESS_COLOR),
        PlaybackState::Stopped => ("\u{25a0} stopped", DIM),
    };

    let duration = result
        .summary
        .and_then(|s| s.duration_secs)
        .map(format_duration)
        .unwrap_or_else(|| "--".to_string());

    let row = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<12}", name), Style::default().fg(DIM)),
            Span::styled(value, Style::default().fg(Color::White)),
        ])
    };

    let text = vec![
        Line::from(Span::styled(
            format!("\u{1f3b5} {}", result.filename),
            Style::default().fg(COMPLETE_COLOR).add_modifier(Modifier::BOLD),
        )),
        row("Type", result.content_type.clone()),
        row("Size", format_mb(result.size)),
        row("Duration", duration),
        Line::from(vec![
            Span::styled(format!("{:<12}", "Player"), Style::default().fg(DIM)),
            Span::styled(play_text, Style::default().fg(play_color)),
            Span::styled(format!("  {}", result.handle), Style::default().fg(DIM)),
        ]),
    ];

    frame.render_widget(Paragraph::new(text).block(block(" Result ")), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(ref msg) = app.status_message {
        let color = if msg.starts_with("Saved") { COMPLETE_COLOR } else { ERROR_COLOR };
        frame.render_widget(
            Paragraph::new(msg.as_str())
                .style(Style::default().fg(color))
                .alignment(Alignment::Center),
            area,
        );
    }
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let keys = "[Tab] next  [Enter] select  [^P] play/pause  [^D] download  [^R] reset  [F1] about  [Esc] quit";
    let footer = Paragraph::new(keys)
        .style(Style::default().fg(DIM))
        .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

fn render_notice_overlay(frame: &mut Frame, message: &str) {
    let area = centered_rect(56, 8, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled("[Enter] OK", Style::default().fg(DIM))),
    ];

    let block = Block::default()
        .title(Span::styled(" Notice ", Style::default().fg(ERROR_COLOR).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ERROR_COLOR));

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_about_overlay(frame: &mut Frame) {
    let area = centered_rect(48, 10, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(Span::styled(
            "Repitch",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Version {}", env!("CARGO_PKG_VERSION"))),
        Line::from(""),
        Line::from("Sends audio to a pitch-shifting service"),
        Line::from("and plays back or saves the result."),
        Line::from(""),
        Line::from(Span::styled("[Esc] close", Style::default().fg(DIM))),
    ];

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(block(" About "));
    frame.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
