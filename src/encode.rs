use std::path::PathBuf;

use crate::models::{PitchParameter, UploadRequest};

pub const FILE_FIELD: &str = "file";
pub const SHIFT_FIELD: &str = "shift";
pub const NOTE_FIELD: &str = "targetNote";

/// The one pitch field sent alongside the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedParameter {
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: &'static str,
    pub filename: String,
    pub media_type: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Multipart payload ready for the transfer orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub file: FilePart,
    pub parameter: EncodedParameter,
    /// Kept for filename fallback when the response has no disposition.
    pub request: UploadRequest,
}

impl EncodedPayload {
    /// Text fields in the order they are appended after the file part.
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        vec![(self.parameter.key, self.parameter.value.as_str())]
    }
}

pub fn encode_parameter(parameter: &PitchParameter) -> EncodedParameter {
    match parameter {
        // Raw semitones; the service converts to a pitch factor itself.
        PitchParameter::ShiftBySemitones(n) => EncodedParameter {
            key: SHIFT_FIELD,
            value: n.to_string(),
        },
        PitchParameter::ToTargetNote(note) => EncodedParameter {
            key: NOTE_FIELD,
            value: note.clone(),
        },
    }
}

pub fn encode(request: &UploadRequest) -> EncodedPayload {
    EncodedPayload {
        file: FilePart {
            field: FILE_FIELD,
            filename: request.file.name.clone(),
            media_type: request.file.media_type.clone(),
            path: request.file.path.clone(),
            size: request.file.size,
        },
        parameter: encode_parameter(&request.parameter),
        request: request.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AudioFile;

    fn request(parameter: PitchParameter) -> UploadRequest {
        UploadRequest {
            file: AudioFile {
                name: "My Song.mp3".to_string(),
                media_type: "audio/mpeg".to_string(),
                size: 2048,
                path: PathBuf::from("/tmp/My Song.mp3"),
            },
            parameter,
        }
    }

    #[test]
    fn test_shift_encodes_decimal_semitones() {
        let payload = encode(&request(PitchParameter::ShiftBySemitones(-7)));
        assert_eq!(payload.text_fields(), vec![("shift", "-7")]);
    }

    #[test]
    fn test_note_encodes_verbatim() {
        let payload = encode(&request(PitchParameter::ToTargetNote("Bb5".to_string())));
        assert_eq!(payload.text_fields(), vec![("targetNote", "Bb5")]);
    }

    #[test]
    fn test_exactly_one_pitch_field() {
        let params = (-12..=12)
            .map(PitchParameter::ShiftBySemitones)
            .chain(["C4", "A#3", "Bb5", "x"].iter().map(|n| PitchParameter::ToTargetNote(n.to_string())));
        for p in params {
            let payload = encode(&request(p));
            let fields = payload.text_fields();
            let has_shift = fields.iter().any(|(k, _)| *k == SHIFT_FIELD);
            let has_note = fields.iter().any(|(k, _)| *k == NOTE_FIELD);
            assert!(has_shift ^ has_note);
        }
    }

    #[test]
    fn test_file_part_keeps_original_name() {
        let payload = encode(&request(PitchParameter::ShiftBySemitones(0)));
        assert_eq!(payload.file.field, "file");
        assert_eq!(payload.file.filename, "My Song.mp3");
        assert_eq!(payload.file.media_type, "audio/mpeg");
    }
}
