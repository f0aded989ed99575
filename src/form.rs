use crate::models::{AudioFile, PitchMode};

pub const MIN_SEMITONES: i32 = -12;
pub const MAX_SEMITONES: i32 = 12;

/// Paired range/number control for the semitone value.
///
/// Both views read the same clamped value, so they cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SemitoneControl {
    value: i32,
}

impl SemitoneControl {
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Position of the range slider.
    pub fn range_value(&self) -> i32 {
        self.value
    }

    /// Text shown in the numeric box.
    pub fn number_text(&self) -> String {
        self.value.to_string()
    }

    /// Edit through the range slider.
    pub fn set_from_range(&mut self, v: i64) {
        self.value = clamp_semitones(v);
    }

    /// Edit through the numeric box. Anything that is not a number counts as 0.
    pub fn set_from_number(&mut self, text: &str) {
        let v = text.trim().parse::<f64>().unwrap_or(0.0);
        let v = if v.is_finite() { v.round() as i64 } else { 0 };
        self.value = clamp_semitones(v);
    }

    pub fn step(&mut self, delta: i64) {
        self.set_from_range(self.value as i64 + delta);
    }
}

pub fn clamp_semitones(v: i64) -> i32 {
    v.clamp(MIN_SEMITONES as i64, MAX_SEMITONES as i64) as i32
}

/// The editable form the user fills in before submitting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormDraft {
    pub file: Option<AudioFile>,
    pub mode: PitchMode,
    pub semitones: SemitoneControl,
    pub note: String,
}

impl FormDraft {
    /// Empty the inputs. The selected mode stays as it is.
    pub fn clear(&mut self) {
        *self = FormDraft {
            mode: self.mode,
            ..FormDraft::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_edit_clamps() {
        let mut c = SemitoneControl::default();
        c.set_from_range(30);
        assert_eq!(c.value(), 12);
        c.set_from_range(-99);
        assert_eq!(c.value(), -12);
        c.set_from_range(4);
        assert_eq!(c.range_value(), 4);
        assert_eq!(c.number_text(), "4");
    }

    #[test]
    fn test_number_edit_clamps_and_syncs() {
        let mut c = SemitoneControl::default();
        for (input, expected) in [("13", 12), ("-40", -12), ("7", 7), ("abc", 0), ("", 0), ("2.6", 3)] {
            c.set_from_number(input);
            assert_eq!(c.value(), expected, "input {:?}", input);
            assert_eq!(c.range_value(), expected);
            assert_eq!(c.number_text(), expected.to_string());
        }
    }

    #[test]
    fn test_every_value_stays_in_range() {
        let mut c = SemitoneControl::default();
        for v in -100..=100 {
            c.set_from_range(v);
            assert!((MIN_SEMITONES..=MAX_SEMITONES).contains(&c.value()));
        }
    }

    #[test]
    fn test_step_saturates() {
        let mut c = SemitoneControl::default();
        for _ in 0..20 {
            c.step(1);
        }
        assert_eq!(c.value(), 12);
    }

    #[test]
    fn test_clear_empties_inputs_but_keeps_mode() {
        let mut draft = FormDraft {
            mode: PitchMode::Note,
            note: "C4".to_string(),
            ..Default::default()
        };
        draft.semitones.set_from_range(5);
        draft.clear();
        assert_eq!(draft.mode, PitchMode::Note);
        assert!(draft.file.is_none());
        assert_eq!(draft.note, "");
        assert_eq!(draft.semitones.value(), 0);
        assert_eq!(draft.semitones.number_text(), "0");
    }
}
