pub mod api;
pub mod catalog;
pub mod config;
pub mod cookies;
pub mod error;
pub mod http;
pub mod output;
pub mod proxy;
pub mod timedtext;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use api::TranscriptApi;
pub use catalog::{TranscriptCatalog, TranscriptHandle};
pub use error::{Result, TranscriptError};
pub use output::{FormatOptions, OutputFormat};
pub use youtube::Strategy;

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// A language a transcript exists in or can be translated to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageInfo {
    pub language_code: String,
    pub language_name: String,
}

/// Transcript text fetched for one caption track
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTranscript {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub segments: Vec<Segment>,
}

impl FetchedTranscript {
    /// All segment texts joined by a single space
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Segments in a plain serializable form
    pub fn to_raw_data(&self) -> serde_json::Value {
        serde_json::json!(self.segments)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl<'a> IntoIterator for &'a FetchedTranscript {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

static VIDEO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?|shorts)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})(?:["&?/\s]|$)"#)
        .expect("video URL pattern is valid")
});

/// Resolve a video ID from a bare ID or one of the known YouTube URL shapes.
///
/// Any 11-character input is taken to be an ID already; YouTube rejects bogus IDs later on.
pub fn resolve_video_id(input: &str) -> Result<String> {
    if input.chars().count() == 11 {
        return Ok(input.to_string());
    }

    VIDEO_URL_RE
        .captures(input)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| TranscriptError::InvalidVideoId(input.to_string()))
}
