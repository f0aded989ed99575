use crate::error::ValidationError;
use crate::form::FormDraft;
use crate::models::{PitchMode, PitchParameter, UploadRequest};

/// 50 MiB. Files strictly larger than this are rejected.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Check the draft against the upload rules, first failure wins.
///
/// The draft is only read; a rejection leaves the form exactly as it was.
pub fn validate(draft: &FormDraft) -> Result<UploadRequest, ValidationError> {
    validate_with_limit(draft, MAX_UPLOAD_BYTES)
}

pub fn validate_with_limit(draft: &FormDraft, max_bytes: u64) -> Result<UploadRequest, ValidationError> {
    let file = draft.file.as_ref().ok_or(ValidationError::NoFile)?;

    // Either check is enough: a cheap sniff, not a format check.
    let declared_audio = file.media_type.contains("audio");
    let named_mp3 = file.name.to_lowercase().ends_with(".mp3");
    if !declared_audio && !named_mp3 {
        return Err(ValidationError::UnsupportedType);
    }

    if file.size > max_bytes {
        return Err(ValidationError::TooLarge {
            size: file.size,
            limit: max_bytes,
        });
    }

    let parameter = match draft.mode {
        PitchMode::Shift => PitchParameter::ShiftBySemitones(draft.semitones.value()),
        PitchMode::Note => {
            let note = draft.note.trim();
            if note.is_empty() {
                return Err(ValidationError::MissingNote);
            }
            PitchParameter::ToTargetNote(note.to_string())
        }
    };

    Ok(UploadRequest {
        file: file.clone(),
        parameter,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::models::AudioFile;

    fn file(name: &str, media_type: &str, size: u64) -> AudioFile {
        AudioFile {
            name: name.to_string(),
            media_type: media_type.to_string(),
            size,
            path: PathBuf::from(name),
        }
    }

    fn draft_with(file: AudioFile) -> FormDraft {
        FormDraft {
            file: Some(file),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_file() {
        assert_eq!(validate(&FormDraft::default()), Err(ValidationError::NoFile));
    }

    #[test]
    fn test_type_check_is_permissive_or() {
        assert!(validate(&draft_with(file("a.wav", "audio/wav", 10))).is_ok());
        assert!(validate(&draft_with(file("a.MP3", "", 10))).is_ok());
        assert!(validate(&draft_with(file("weird.bin", "audio/x-custom", 10))).is_ok());
        assert_eq!(
            validate(&draft_with(file("a.txt", "text/plain", 10))),
            Err(ValidationError::UnsupportedType)
        );
    }

    #[test]
    fn test_size_boundary() {
        assert!(validate(&draft_with(file("a.mp3", "audio/mpeg", MAX_UPLOAD_BYTES))).is_ok());
        assert_eq!(
            validate(&draft_with(file("a.mp3", "audio/mpeg", MAX_UPLOAD_BYTES + 1))),
            Err(ValidationError::TooLarge {
                size: MAX_UPLOAD_BYTES + 1,
                limit: MAX_UPLOAD_BYTES
            })
        );
        for size in [0, 1, MAX_UPLOAD_BYTES - 1, MAX_UPLOAD_BYTES, MAX_UPLOAD_BYTES + 1, u64::MAX] {
            let result = validate(&draft_with(file("a.mp3", "audio/mpeg", size)));
            assert_eq!(result.is_err(), size > MAX_UPLOAD_BYTES, "size {}", size);
        }
    }

    #[test]
    fn test_rule_order() {
        // Wrong type is reported before oversize.
        assert_eq!(
            validate(&draft_with(file("a.txt", "", MAX_UPLOAD_BYTES * 2))),
            Err(ValidationError::UnsupportedType)
        );
        // Oversize is reported before a missing note.
        let mut draft = draft_with(file("a.mp3", "audio/mpeg", MAX_UPLOAD_BYTES * 2));
        draft.mode = PitchMode::Note;
        assert!(matches!(validate(&draft), Err(ValidationError::TooLarge { .. })));
    }

    #[test]
    fn test_note_mode_requires_trimmed_note() {
        let mut draft = draft_with(file("a.mp3", "audio/mpeg", 10));
        draft.mode = PitchMode::Note;
        draft.note = "   ".to_string();
        assert_eq!(validate(&draft), Err(ValidationError::MissingNote));

        draft.note = "  A#3 ".to_string();
        let request = validate(&draft).unwrap();
        assert_eq!(request.parameter, PitchParameter::ToTargetNote("A#3".to_string()));
    }

    #[test]
    fn test_shift_mode_ignores_note_field() {
        let mut draft = draft_with(file("a.mp3", "audio/mpeg", 10));
        draft.semitones.set_from_range(-5);
        draft.note = "C4".to_string();
        let request = validate(&draft).unwrap();
        assert_eq!(request.parameter, PitchParameter::ShiftBySemitones(-5));
    }

    #[test]
    fn test_rejection_leaves_draft_untouched() {
        let mut draft = draft_with(file("a.mp3", "audio/mpeg", 10));
        draft.mode = PitchMode::Note;
        draft.note = " ".to_string();
        let before = draft.clone();
        assert!(validate(&draft).is_err());
        assert_eq!(draft, before);
    }
}
