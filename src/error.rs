use std::path::PathBuf;
use std::time::Duration;

/// Rejection reasons from the input validator. The `Display` text is the
/// message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select an MP3 file first.")]
    NoFile,

    #[error("Please select a valid MP3 file.")]
    UnsupportedType,

    #[error("File size must be less than {}MB.", .limit / (1024 * 1024))]
    TooLarge { size: u64, limit: u64 },

    #[error("Please enter a target note (e.g., C4, A#3, Bb5).")]
    MissingNote,
}

/// Everything that can end a submit without a result.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Non-success HTTP status, with the server's body text.
    #[error("HTTP {status}: {body}")]
    Transfer { status: u16, body: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// Success status, but the payload is not audio.
    #[error("Invalid response format: {body}")]
    Format { body: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no response after {0:?}")]
    Timeout(Duration),

    #[error("transfer cancelled")]
    Cancelled,

    #[error("a transfer is already in flight")]
    Busy,

    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl ProcessError {
    /// Whether the user should be notified about this error. Cancellation is
    /// always caller-initiated and stays silent.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ProcessError::Cancelled)
    }
}

impl From<reqwest::Error> for ProcessError {
    fn from(e: reqwest::Error) -> Self {
        ProcessError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_carries_status_and_body() {
        let e = ProcessError::Transfer {
            status: 500,
            body: "decode failed".to_string(),
        };
        assert_eq!(e.to_string(), "HTTP 500: decode failed");
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ProcessError::from(ValidationError::NoFile).to_string(),
            "Please select an MP3 file first."
        );
        assert_eq!(
            ValidationError::TooLarge {
                size: 60 * 1024 * 1024,
                limit: 50 * 1024 * 1024
            }
            .to_string(),
            "File size must be less than 50MB."
        );
    }

    #[test]
    fn test_cancelled_is_silent() {
        assert!(!ProcessError::Cancelled.is_user_visible());
        assert!(ProcessError::Busy.is_user_visible());
    }
}
