use std::io::Cursor;
use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::models::AudioFile;

const AUDIO_MEDIA_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("opus", "audio/opus"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("aif", "audio/aiff"),
    ("aiff", "audio/aiff"),
    ("wv", "audio/wavpack"),
    ("webm", "audio/webm"),
];

/// Media type a file picker would declare for this path, based only on its
/// extension. Unknown extensions get an empty type.
pub fn declared_media_type(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .and_then(|ext| {
            AUDIO_MEDIA_TYPES
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, mime)| mime.to_string())
        })
        .unwrap_or_default()
}

/// Extension conventionally used for a response content type, for probe hints.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let base = content_type.split(';').next().unwrap_or("").trim();
    AUDIO_MEDIA_TYPES
        .iter()
        .find(|(_, mime)| mime.eq_ignore_ascii_case(base))
        .map(|(ext, _)| *ext)
        .or(match base {
            "audio/mp3" => Some("mp3"),
            "audio/x-wav" | "audio/wave" => Some("wav"),
            _ => None,
        })
}

/// Describe the file at `path` the way a picker would hand it to the form.
pub fn open_audio_file(path: &Path) -> std::io::Result<AudioFile> {
    let meta = std::fs::metadata(path)?;
    if !meta.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a file", path.display()),
        ));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(AudioFile {
        name,
        media_type: declared_media_type(path),
        size: meta.len(),
        path: path.to_path_buf(),
    })
}

/// Stream facts about a decoded payload, shown by the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSummary {
    pub duration_secs: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<usize>,
}

/// Probe an in-memory payload. Returns `None` when the bytes are not a
/// container symphonia recognises.
pub fn probe_payload(payload: &[u8], content_type: &str) -> Option<AudioSummary> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(payload.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_for(content_type) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .ok()?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)?;

    let params = &track.codec_params;
    let duration_secs = match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / rate as f64),
        _ => None,
    };

    Some(AudioSummary {
        duration_secs,
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count()),
    })
}

#[cfg(test)]
pub(crate) fn sine_wav_bytes(sample_rate: u32, duration_secs: f64) -> Vec<u8> {
    let num_samples = (sample_rate as f64 * duration_secs) as usize;
    let data_size = (num_samples * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_size as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    for i in 0..num_samples {
        let t = i as f64 / sample_rate as f64;
        let s = (0.5 * (2.0 * std::f64::consts::PI * 440.0 * t).sin() * i16::MAX as f64) as i16;
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_media_type() {
        assert_eq!(declared_media_type(Path::new("song.mp3")), "audio/mpeg");
        assert_eq!(declared_media_type(Path::new("SONG.WAV")), "audio/wav");
        assert_eq!(declared_media_type(Path::new("take.flac")), "audio/flac");
        assert_eq!(declared_media_type(Path::new("notes.txt")), "");
        assert_eq!(declared_media_type(Path::new("noext")), "");
    }

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for("audio/mpeg"), Some("mp3"));
        assert_eq!(extension_for("audio/wav; codecs=1"), Some("wav"));
        assert_eq!(extension_for("audio/x-wav"), Some("wav"));
        assert_eq!(extension_for("application/octet-stream"), None);
    }

    #[test]
    fn test_open_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp3");
        std::fs::write(&path, [0u8; 1234]).unwrap();
        let file = open_audio_file(&path).unwrap();
        assert_eq!(file.name, "clip.mp3");
        assert_eq!(file.media_type, "audio/mpeg");
        assert_eq!(file.size, 1234);
        assert!(open_audio_file(dir.path()).is_err());
    }

    #[test]
    fn test_probe_wav_payload() {
        let wav = sine_wav_bytes(8000, 2.0);
        let summary = probe_payload(&wav, "audio/wav").unwrap();
        assert_eq!(summary.sample_rate, Some(8000));
        assert_eq!(summary.channels, Some(1));
        let secs = summary.duration_secs.unwrap();
        assert!((secs - 2.0).abs() < 0.01, "duration {}", secs);
    }

    #[test]
    fn test_probe_garbage_is_none() {
        assert!(probe_payload(b"definitely not audio", "audio/mpeg").is_none());
    }
}
