use std::sync::Arc;

use crate::error::ProcessError;
use crate::models::{PitchParameter, ProcessedResult, UploadRequest};

/// The parts of a response the decoder looks at before touching the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

impl ResponseHead {
    pub fn from_response(response: &reqwest::Response) -> Self {
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        Self {
            status: response.status().as_u16(),
            content_type: header(reqwest::header::CONTENT_TYPE),
            content_disposition: header(reqwest::header::CONTENT_DISPOSITION),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Audio, or generic binary data.
pub fn is_audio_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("audio") || ct.contains("octet-stream")
}

/// Turn a response into a result, or the matching failure.
pub fn decode(head: &ResponseHead, body: Vec<u8>, request: &UploadRequest) -> Result<ProcessedResult, ProcessError> {
    if !head.is_success() {
        return Err(ProcessError::Transfer {
            status: head.status,
            body: body_text(&body),
        });
    }

    let content_type = match head.content_type.as_deref() {
        Some(ct) if is_audio_content_type(ct) => ct.to_string(),
        _ => {
            return Err(ProcessError::Format {
                body: body_text(&body),
            })
        }
    };

    let filename = head
        .content_disposition
        .as_deref()
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| fallback_filename(&request.file.name, &request.parameter));

    Ok(ProcessedResult {
        payload: Arc::from(body),
        content_type,
        filename,
    })
}

fn body_text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

/// Pull the `filename=` value out of a `Content-Disposition` header.
///
/// Takes the first `filename` key that is followed by `=` before any `;` or
/// newline (any suffix before `=` is tolerated, so `filename*=` matches too).
/// A value opened by a quote runs to the matching quote; otherwise it runs to
/// `;` or end of line. All quote characters are then dropped. Empty results
/// count as no match.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let value = header.match_indices("filename").find_map(|(at, key)| {
        let rest = &header[at + key.len()..];
        let sep = rest.find([';', '=', '\n'])?;
        rest[sep..].strip_prefix('=')
    })?;

    let raw = match value.chars().next() {
        Some(q @ ('"' | '\'')) => match value[1..].find(q) {
            Some(end) => &value[..end + 2],
            None => until_separator(value),
        },
        _ => until_separator(value),
    };

    let cleaned: String = raw.chars().filter(|c| *c != '"' && *c != '\'').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn until_separator(value: &str) -> &str {
    let end = value.find([';', '\n']).unwrap_or(value.len());
    &value[..end]
}

/// Name without its last extension: "song.wav" -> "song", "a.b.c" -> "a.b".
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

/// Deterministic save name when the server does not supply one.
pub fn fallback_filename(original_name: &str, parameter: &PitchParameter) -> String {
    let base = strip_extension(original_name);
    match parameter {
        PitchParameter::ShiftBySemitones(n) => format!("{}_shift_{}st.mp3", base, n),
        PitchParameter::ToTargetNote(note) => format!("{}_to_{}.mp3", base, note),
    }
}
