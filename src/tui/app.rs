use std::path::{Path, PathBuf};

use crate::audio::open_audio_file;
use crate::models::PitchMode;
use crate::session::{FormEdit, PendingTransfer, Session, SessionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Main,
    About,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    File,
    Mode,
    Semitones,
    Note,
    Submit,
}

pub struct App {
    pub session: Session,
    pub view: View,
    pub focus: Field,
    /// Text typed into the file field, loaded on Enter.
    pub path_input: String,
    /// Numeric box contents while typing.
    pub number_input: String,
    pub endpoint: String,
    pub output_dir: PathBuf,
    pub status_message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: Session, endpoint: String, output_dir: PathBuf) -> Self {
        Self {
            session,
            view: View::Main,
            focus: Field::File,
            path_input: String::new(),
            number_input: "0".to_string(),
            endpoint,
            output_dir,
            status_message: None,
            should_quit: false,
        }
    }

    fn visible_fields(&self) -> [Field; 4] {
        let pitch_field = match self.session.form().mode {
            PitchMode::Shift => Field::Semitones,
            PitchMode::Note => Field::Note,
        };
        [Field::File, Field::Mode, pitch_field, Field::Submit]
    }

    pub fn focus_next(&mut self) {
        let fields = self.visible_fields();
        let i = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(i + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.visible_fields();
        let i = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(i + fields.len() - 1) % fields.len()];
    }

    /// Pick the file named in the path field. An unreadable path clears the
    /// selection.
    pub fn load_path(&mut self) {
        let trimmed = self.path_input.trim();
        if trimmed.is_empty() {
            self.session.apply(SessionEvent::Edit(FormEdit::SelectFile(None)));
            return;
        }
        match open_audio_file(Path::new(trimmed)) {
            Ok(file) => {
                self.status_message = None;
                self.session.apply(SessionEvent::Edit(FormEdit::SelectFile(Some(file))));
            }
            Err(e) => {
                self.status_message = Some(format!("Cannot open {}: {}", trimmed, e));
                self.session.apply(SessionEvent::Edit(FormEdit::SelectFile(None)));
            }
        }
    }

    pub fn toggle_mode(&mut self) {
        let mode = self.session.form().mode.toggle();
        self.session.apply(SessionEvent::Edit(FormEdit::SetMode(mode)));
    }

    pub fn step_semitones(&mut self, delta: i64) {
        let v = self.session.form().semitones.range_value() as i64 + delta;
        self.session.apply(SessionEvent::Edit(FormEdit::SemitonesFromRange(v)));
        self.number_input = self.session.form().semitones.number_text();
    }

    /// Every keystroke in the numeric box is clamped straight away. A lone
    /// minus sign is kept on screen so negative values can be typed.
    pub fn type_number(&mut self, c: Option<char>) {
        match c {
            Some(c) => self.number_input.push(c),
            None => {
                self.number_input.pop();
            }
        }
        let text = self.number_input.clone();
        self.session
            .apply(SessionEvent::Edit(FormEdit::SemitonesFromNumber(text.clone())));
        if text != "-" {
            self.number_input = self.session.form().semitones.number_text();
        }
    }

    pub fn type_note(&mut self, c: Option<char>) {
        let mut note = self.session.form().note.clone();
        match c {
            Some(c) => note.push(c),
            None => {
                note.pop();
            }
        }
        self.session.apply(SessionEvent::Edit(FormEdit::SetNote(note)));
    }

    pub fn submit(&mut self) -> Option<PendingTransfer> {
        self.status_message = None;
        self.session.apply(SessionEvent::Submit)
    }

    /// Clear everything back to the empty form.
    pub fn reset(&mut self) {
        self.session.apply(SessionEvent::Reset);
        self.path_input.clear();
        self.number_input = self.session.form().semitones.number_text();
        self.status_message = None;
        self.focus = Field::File;
    }

    pub fn download(&mut self) {
        if self.session.resources().current().is_none() {
            return;
        }
        self.status_message = Some(match self.session.resources().download_to_dir(&self.output_dir) {
            Ok(path) => format!("Saved to {}", path.display()),
            Err(e) => format!("Error: {}", e),
        });
    }

    /// Label of the submit control.
    pub fn submit_label(&self) -> &'static str {
        if self.session.snapshot().trigger_enabled {
            "Process Audio"
        } else {
            "Processing..."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(Session::default(), "http://localhost/api".to_string(), PathBuf::from("."))
    }

    #[test]
    fn test_focus_skips_hidden_section() {
        let mut a = app();
        a.focus_next();
        a.focus_next();
        assert_eq!(a.focus, Field::Semitones);
        a.toggle_mode();
        a.focus = Field::Mode;
        a.focus_next();
        assert_eq!(a.focus, Field::Note);
        a.focus_next();
        a.focus_next();
        assert_eq!(a.focus, Field::File);
        a.focus_prev();
        assert_eq!(a.focus, Field::Submit);
    }

    #[test]
    fn test_number_typing_clamps_each_keystroke() {
        let mut a = app();
        a.number_input.clear();
        a.type_number(Some('-'));
        assert_eq!(a.number_input, "-");
        assert_eq!(a.session.form().semitones.value(), 0);
        a.type_number(Some('4'));
        assert_eq!(a.session.form().semitones.value(), -4);
        a.type_number(Some('0'));
        assert_eq!(a.session.form().semitones.value(), -12);
        assert_eq!(a.number_input, "-12");
    }

    #[test]
    fn test_load_missing_path_reports_and_clears() {
        let mut a = app();
        a.path_input = "/definitely/not/here.mp3".to_string();
        a.load_path();
        assert!(a.session.form().file.is_none());
        assert!(a.status_message.unwrap().starts_with("Cannot open"));
    }

    #[test]
    fn test_reset_restores_inputs() {
        let mut a = app();
        a.path_input = "x.mp3".to_string();
        a.step_semitones(5);
        a.toggle_mode();
        a.type_note(Some('C'));
        a.reset();
        assert!(a.path_input.is_empty());
        assert_eq!(a.number_input, "0");
        assert_eq!(a.session.form().note, "");
        assert_eq!(a.session.form().semitones.value(), 0);
        assert_eq!(a.session.form().mode, PitchMode::Note);
        assert_eq!(a.submit_label(), "Process Audio");
    }
}
