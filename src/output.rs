use serde::Serialize;

use crate::error::Result;
use crate::{FetchedTranscript, Segment};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Srt,
}

/// Rendering knobs shared by every format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Indentation width for JSON output; compact when `None`
    pub indent: Option<usize>,
}

impl OutputFormat {
    pub fn render(self, transcript: &FetchedTranscript, options: &FormatOptions) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(render_text(transcript)),
            OutputFormat::Json => render_json(transcript, options),
            OutputFormat::Srt => Ok(render_srt(transcript)),
        }
    }

    pub fn render_many(self, transcripts: &[FetchedTranscript], options: &FormatOptions) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(render_text_many(transcripts)),
            OutputFormat::Json => render_json_many(transcripts, options),
            OutputFormat::Srt => Ok(render_srt_many(transcripts)),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSegment<'a> {
    text: &'a str,
    duration: f64,
    offset: f64,
    lang: &'a str,
    is_generated: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonTranscript<'a> {
    video_id: &'a str,
    language: &'a str,
    language_code: &'a str,
    is_generated: bool,
    transcript: Vec<JsonSegment<'a>>,
}

fn json_segments(transcript: &FetchedTranscript) -> Vec<JsonSegment<'_>> {
    transcript
        .segments
        .iter()
        .map(|s| JsonSegment {
            text: &s.text,
            duration: s.duration,
            offset: s.start,
            lang: &transcript.language_code,
            is_generated: transcript.is_generated,
        })
        .collect()
}

fn to_json<T: Serialize>(value: &T, options: &FormatOptions) -> Result<String> {
    let mut out = Vec::new();
    let written = match options.indent {
        None => value.serialize(&mut serde_json::Serializer::new(&mut out)),
        Some(width) => {
            let indent = " ".repeat(width);
            let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
            value.serialize(&mut serde_json::Serializer::with_formatter(&mut out, formatter))
        }
    };
    written?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Render segments as a JSON list of `{text, duration, offset, lang, isGenerated}`
pub fn render_json(transcript: &FetchedTranscript, options: &FormatOptions) -> Result<String> {
    to_json(&json_segments(transcript), options)
}

pub fn render_json_many(transcripts: &[FetchedTranscript], options: &FormatOptions) -> Result<String> {
    let items: Vec<JsonTranscript<'_>> = transcripts
        .iter()
        .map(|t| JsonTranscript {
            video_id: &t.video_id,
            language: &t.language,
            language_code: &t.language_code,
            is_generated: t.is_generated,
            transcript: json_segments(t),
        })
        .collect();
    to_json(&items, options)
}

/// Render transcript as plain text (segments joined by a space, no timestamps)
pub fn render_text(transcript: &FetchedTranscript) -> String {
    transcript.full_text()
}

pub fn render_text_many(transcripts: &[FetchedTranscript]) -> String {
    transcripts
        .iter()
        .map(|t| format!("[{} - {}]\n{}", t.video_id, t.language, render_text(t)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render transcript as numbered SRT cues
pub fn render_srt(transcript: &FetchedTranscript) -> String {
    transcript
        .segments
        .iter()
        .enumerate()
        .map(|(i, s)| srt_cue(i + 1, s))
        .collect()
}

pub fn render_srt_many(transcripts: &[FetchedTranscript]) -> String {
    transcripts
        .iter()
        .map(|t| format!("WEBVTT - {} ({})\n\n{}", t.video_id, t.language, render_srt(t)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn srt_cue(index: usize, segment: &Segment) -> String {
    format!(
        "{index}\n{} --> {}\n{}\n\n",
        srt_timestamp(segment.start),
        srt_timestamp(segment.start + segment.duration),
        segment.text
    )
}

/// `HH:MM:SS,mmm`, truncating below the millisecond
fn srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}
