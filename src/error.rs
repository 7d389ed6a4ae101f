use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranscriptError>;

/// Everything that can go wrong between a user-supplied video reference and a parsed transcript
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("could not resolve a video ID from: {0}")]
    InvalidVideoId(String),

    #[error(
        "YouTube is blocking requests for video {video_id} (bot challenge or rate limit); \
         retry later, use a different proxy, or pass cookies"
    )]
    TooManyRequests { video_id: String },

    #[error("video {video_id} is unavailable")]
    VideoUnavailable { video_id: String },

    #[error("subtitles are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[error("no transcripts are available for video {video_id}")]
    NoTranscriptsAvailable { video_id: String },

    #[error(
        "no transcript found for video {video_id} in any of the requested languages [{}]; available languages: {}",
        .requested.join(", "),
        CodeList(.available)
    )]
    LanguageNotAvailable {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("the {language_code} transcript of video {video_id} cannot be translated")]
    NotTranslatable { video_id: String, language_code: String },

    #[error(
        "translation to {requested} is not offered for video {video_id}; available languages: {}",
        CodeList(.available)
    )]
    TranslationLanguageNotAvailable {
        video_id: String,
        requested: String,
        available: Vec<String>,
    },

    /// `status` is `None` when the request never produced a response
    #[error("transcript for video {video_id} could not be fetched: {message}")]
    TranscriptFetch {
        video_id: String,
        status: Option<u16>,
        message: String,
    },

    #[error("transcript for video {video_id} is not available: it requires a PO token")]
    PoTokenRequired { video_id: String },

    #[error("failed to accept the YouTube consent page for video {video_id}")]
    ConsentCookie { video_id: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("cookie file {path} could not be read: {source}")]
    CookiePathInvalid {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cookie file {0} holds no valid youtube.com cookies")]
    CookiesInvalid(PathBuf),

    #[error("invalid proxy configuration: {0}")]
    InvalidProxyConfig(String),

    #[error("failed to serialize transcript: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl TranscriptError {
    /// Whether the same request could reasonably succeed when attempted again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranscriptError::TooManyRequests { .. }
                | TranscriptError::Request { .. }
                | TranscriptError::TranscriptFetch { status: None, .. }
        )
    }

    pub(crate) fn request(url: &str, message: impl fmt::Display) -> Self {
        TranscriptError::Request {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

struct CodeList<'a>(&'a [String]);

impl fmt::Display for CodeList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_not_available_lists_codes() {
        let err = TranscriptError::LanguageNotAvailable {
            video_id: "abcdefghijk".to_string(),
            requested: vec!["de".to_string(), "it".to_string()],
            available: vec!["en".to_string(), "fr".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("abcdefghijk"));
        assert!(msg.contains("[de, it]"));
        assert!(msg.ends_with("available languages: en, fr"));
    }

    #[test]
    fn test_empty_available_reads_none() {
        let err = TranscriptError::LanguageNotAvailable {
            video_id: "abcdefghijk".to_string(),
            requested: vec!["en".to_string()],
            available: vec![],
        };
        assert!(err.to_string().ends_with("available languages: none"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(TranscriptError::TooManyRequests { video_id: "x".into() }.is_retryable());
        assert!(!TranscriptError::VideoUnavailable { video_id: "x".into() }.is_retryable());
        let dropped = TranscriptError::TranscriptFetch {
            video_id: "x".into(),
            status: None,
            message: "connection reset".into(),
        };
        assert!(dropped.is_retryable());
        let missing = TranscriptError::TranscriptFetch {
            video_id: "x".into(),
            status: Some(404),
            message: "HTTP 404".into(),
        };
        assert!(!missing.is_retryable());
        assert!(missing.to_string().ends_with("could not be fetched: HTTP 404"));
    }
}
