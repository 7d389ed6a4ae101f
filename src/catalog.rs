use std::fmt;
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::error::{Result, TranscriptError};
use crate::http::{HttpClient, HttpRequest};
use crate::timedtext::parse_timed_text;
use crate::youtube::CaptionsDescriptor;
use crate::{FetchedTranscript, LanguageInfo};

/// Caption URLs carrying this marker need a PO token we cannot produce
const PO_TOKEN_MARKER: &str = "&exp=xpe";

/// One caption track of a video, ready to be fetched or translated
#[derive(Clone)]
pub struct TranscriptHandle {
    http: Arc<dyn HttpClient>,
    video_id: String,
    language: String,
    language_code: String,
    is_generated: bool,
    is_translatable: bool,
    translation_languages: Vec<LanguageInfo>,
    source_url: String,
}

impl TranscriptHandle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        http: Arc<dyn HttpClient>,
        video_id: impl Into<String>,
        source_url: impl Into<String>,
        language: impl Into<String>,
        language_code: impl Into<String>,
        is_generated: bool,
        is_translatable: bool,
        translation_languages: Vec<LanguageInfo>,
    ) -> Self {
        Self {
            http,
            video_id: video_id.into(),
            language: language.into(),
            language_code: language_code.into(),
            is_generated,
            is_translatable,
            translation_languages,
            source_url: source_url.into(),
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn is_generated(&self) -> bool {
        self.is_generated
    }

    pub fn is_translatable(&self) -> bool {
        self.is_translatable
    }

    pub fn translation_languages(&self) -> &[LanguageInfo] {
        &self.translation_languages
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Download and parse the timed-text document for this track
    pub async fn fetch(&self, preserve_formatting: bool) -> Result<FetchedTranscript> {
        if self.source_url.contains(PO_TOKEN_MARKER) {
            return Err(TranscriptError::PoTokenRequired {
                video_id: self.video_id.clone(),
            });
        }

        debug!("Fetching {} transcript for {}", self.language_code, self.video_id);
        let resp = self
            .http
            .send(HttpRequest::get(&self.source_url))
            .await
            .map_err(|e| TranscriptError::TranscriptFetch {
                video_id: self.video_id.clone(),
                status: None,
                message: e.to_string(),
            })?;
        if !resp.is_success() {
            return Err(TranscriptError::TranscriptFetch {
                video_id: self.video_id.clone(),
                status: Some(resp.status),
                message: format!("HTTP {}", resp.status),
            });
        }

        Ok(FetchedTranscript {
            video_id: self.video_id.clone(),
            language: self.language.clone(),
            language_code: self.language_code.clone(),
            is_generated: self.is_generated,
            segments: parse_timed_text(resp.text(), preserve_formatting),
        })
    }

    /// Derive a handle for the machine translation of this track into `language_code`
    pub fn translate(&self, language_code: &str) -> Result<TranscriptHandle> {
        if !self.is_translatable {
            return Err(TranscriptError::NotTranslatable {
                video_id: self.video_id.clone(),
                language_code: self.language_code.clone(),
            });
        }

        let target = self
            .translation_languages
            .iter()
            .find(|l| l.language_code == language_code)
            .ok_or_else(|| TranscriptError::TranslationLanguageNotAvailable {
                video_id: self.video_id.clone(),
                requested: language_code.to_string(),
                available: self
                    .translation_languages
                    .iter()
                    .map(|l| l.language_code.clone())
                    .collect(),
            })?;

        let language = if target.language_name.is_empty() {
            target.language_code.clone()
        } else {
            target.language_name.clone()
        };

        Ok(TranscriptHandle {
            http: Arc::clone(&self.http),
            video_id: self.video_id.clone(),
            language,
            language_code: language_code.to_string(),
            is_generated: self.is_generated,
            is_translatable: false,
            translation_languages: Vec::new(),
            source_url: format!("{}&tlang={language_code}", self.source_url),
        })
    }
}

impl fmt::Debug for TranscriptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptHandle")
            .field("video_id", &self.video_id)
            .field("language", &self.language)
            .field("language_code", &self.language_code)
            .field("is_generated", &self.is_generated)
            .field("is_translatable", &self.is_translatable)
            .field("translation_languages", &self.translation_languages.len())
            .field("source_url", &self.source_url)
            .finish()
    }
}

impl fmt::Display for TranscriptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (\"{}\")", self.language_code, self.language)?;
        if self.is_translatable {
            write!(f, "[TRANSLATABLE]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Any,
    Manual,
    Generated,
}

impl Kind {
    fn admits(self, handle: &TranscriptHandle) -> bool {
        match self {
            Kind::Any => true,
            Kind::Manual => !handle.is_generated,
            Kind::Generated => handle.is_generated,
        }
    }
}

/// Every caption track offered for one video, in the order YouTube lists them
#[derive(Debug, Clone)]
pub struct TranscriptCatalog {
    video_id: String,
    transcripts: Vec<TranscriptHandle>,
    translation_languages: Vec<LanguageInfo>,
}

impl TranscriptCatalog {
    pub fn new(video_id: impl Into<String>, transcripts: Vec<TranscriptHandle>) -> Self {
        Self {
            video_id: video_id.into(),
            transcripts,
            translation_languages: Vec::new(),
        }
    }

    /// Build handles from the raw caption-track descriptors of a video
    pub fn build(http: Arc<dyn HttpClient>, video_id: &str, captions: &CaptionsDescriptor) -> Result<Self> {
        let global_translations: Vec<LanguageInfo> =
            captions.translation_languages.iter().map(language_info).collect();

        let transcripts = captions
            .caption_tracks
            .iter()
            .map(|track| build_handle(&http, video_id, track, &global_translations))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TranscriptError::NoTranscriptsAvailable {
                video_id: video_id.to_string(),
            })?;

        debug!("Found {} caption tracks for {video_id}", transcripts.len());
        Ok(Self {
            video_id: video_id.to_string(),
            transcripts,
            translation_languages: global_translations,
        })
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptHandle> {
        self.transcripts.iter()
    }

    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }

    /// First transcript, manual or generated, matching the earliest listed language code
    pub fn find_transcript<S: AsRef<str>>(&self, language_codes: &[S]) -> Result<&TranscriptHandle> {
        self.find(language_codes, Kind::Any)
    }

    pub fn find_manually_created_transcript<S: AsRef<str>>(&self, language_codes: &[S]) -> Result<&TranscriptHandle> {
        self.find(language_codes, Kind::Manual)
    }

    pub fn find_generated_transcript<S: AsRef<str>>(&self, language_codes: &[S]) -> Result<&TranscriptHandle> {
        self.find(language_codes, Kind::Generated)
    }

    fn find<S: AsRef<str>>(&self, language_codes: &[S], kind: Kind) -> Result<&TranscriptHandle> {
        language_codes
            .iter()
            .find_map(|code| {
                self.transcripts
                    .iter()
                    .find(|t| kind.admits(t) && t.language_code == code.as_ref())
            })
            .ok_or_else(|| TranscriptError::LanguageNotAvailable {
                video_id: self.video_id.clone(),
                requested: language_codes.iter().map(|c| c.as_ref().to_string()).collect(),
                available: self.codes(kind),
            })
    }

    fn codes(&self, kind: Kind) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for t in self.transcripts.iter().filter(|t| kind.admits(t)) {
            if !codes.contains(&t.language_code) {
                codes.push(t.language_code.clone());
            }
        }
        codes
    }
}

impl<'a> IntoIterator for &'a TranscriptCatalog {
    type Item = &'a TranscriptHandle;
    type IntoIter = std::slice::Iter<'a, TranscriptHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.transcripts.iter()
    }
}

impl fmt::Display for TranscriptCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listed = |generated: bool| -> Vec<String> {
            self.transcripts
                .iter()
                .filter(|t| t.is_generated == generated)
                .map(|t| t.to_string())
                .collect()
        };
        let translations = self
            .translation_languages
            .iter()
            .map(|l| format!("{} (\"{}\")", l.language_code, l.language_name))
            .collect();

        writeln!(f, "For this video ({}) transcripts are available in the following languages:", self.video_id)?;
        writeln!(f)?;
        write_section(f, "MANUALLY CREATED", listed(false))?;
        writeln!(f)?;
        write_section(f, "GENERATED", listed(true))?;
        writeln!(f)?;
        write_section(f, "TRANSLATION LANGUAGES", translations)
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, lines: Vec<String>) -> fmt::Result {
    writeln!(f, "({title})")?;
    if lines.is_empty() {
        return writeln!(f, "None");
    }
    for line in lines {
        writeln!(f, " - {line}")?;
    }
    Ok(())
}

fn build_handle(
    http: &Arc<dyn HttpClient>,
    video_id: &str,
    track: &Value,
    global_translations: &[LanguageInfo],
) -> Option<TranscriptHandle> {
    let source_url = track.get("baseUrl")?.as_str()?;
    let language_code = track.get("languageCode")?.as_str()?;
    let language = display_name(track.get("name")).unwrap_or_else(|| language_code.to_string());

    let translation_languages = match track.get("translationLanguages").and_then(Value::as_array) {
        Some(local) => local.iter().map(language_info).collect(),
        None => global_translations.to_vec(),
    };

    Some(TranscriptHandle::new(
        Arc::clone(http),
        video_id,
        source_url,
        language,
        language_code,
        track.get("kind").and_then(Value::as_str) == Some("asr"),
        track.get("isTranslatable").is_some_and(truthy),
        translation_languages,
    ))
}

fn language_info(entry: &Value) -> LanguageInfo {
    let language_code = entry
        .get("languageCode")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let language_name = display_name(entry.get("languageName")).unwrap_or_else(|| language_code.clone());
    LanguageInfo {
        language_code,
        language_name,
    }
}

/// Display names arrive as a plain string, `{simpleText}`, or `{runs: [{text}]}`
fn display_name(value: Option<&Value>) -> Option<String> {
    let value = value?;
    value
        .as_str()
        .or_else(|| value.get("simpleText").and_then(Value::as_str))
        .or_else(|| value.pointer("/runs/0/text").and_then(Value::as_str))
        .map(str::to_string)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
        Value::Null => false,
    }
}
