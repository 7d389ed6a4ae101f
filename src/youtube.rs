use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, TranscriptError};
use crate::http::{HttpClient, HttpRequest, HttpResponse};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player?key=";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

const RECAPTCHA_MARKER: &str = r#"class="g-recaptcha""#;
const PLAYABILITY_MARKER: &str = r#""playabilityStatus":"#;
const CONSENT_MARKER: &str = r#"action="https://consent.youtube.com/s""#;
const CAPTIONS_MARKER: &str = r#""captions":"#;
const VIDEO_DETAILS_MARKER: &str = r#","videoDetails"#;

static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("API key pattern is valid"));
static CONSENT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).expect("consent pattern is valid"));

/// Raw caption metadata for a video: the track list plus the video-wide translation languages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionsDescriptor {
    pub caption_tracks: Vec<Value>,
    pub translation_languages: Vec<Value>,
}

impl CaptionsDescriptor {
    /// Read a `playerCaptionsTracklistRenderer` object; `None` when it lists no tracks
    pub fn from_renderer(renderer: &Value) -> Option<Self> {
        let caption_tracks = renderer.get("captionTracks")?.as_array()?.clone();
        let translation_languages = renderer
            .get("translationLanguages")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Some(Self {
            caption_tracks,
            translation_languages,
        })
    }
}

/// A way of discovering the caption tracks of a video
#[async_trait]
pub trait CaptionsSource: Send + Sync {
    async fn captions(&self, video_id: &str) -> Result<CaptionsDescriptor>;
}

/// Which discovery strategy to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Scrape the captions blob embedded in the watch page
    Page,
    /// Ask the InnerTube player endpoint
    Api,
    /// Scrape the page, then fall back to the player endpoint
    #[default]
    Auto,
}

impl Strategy {
    pub fn source(self, http: Arc<dyn HttpClient>) -> Box<dyn CaptionsSource> {
        match self {
            Strategy::Page => Box::new(PageScrapeSource::new(http)),
            Strategy::Api => Box::new(InnerTubeSource::new(http)),
            Strategy::Auto => Box::new(FallbackSource::new(
                PageScrapeSource::new(Arc::clone(&http)),
                InnerTubeSource::new(http),
            )),
        }
    }
}

/// Reads the captions JSON straight out of the watch page HTML
pub struct PageScrapeSource {
    http: Arc<dyn HttpClient>,
}

impl PageScrapeSource {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CaptionsSource for PageScrapeSource {
    async fn captions(&self, video_id: &str) -> Result<CaptionsDescriptor> {
        let html = fetch_watch_page(self.http.as_ref(), video_id).await?;
        check_page_blocks(&html, video_id)?;
        captions_from_html(&html, video_id)
    }
}

/// Uses the watch page only for its API key, then queries the InnerTube player endpoint
pub struct InnerTubeSource {
    http: Arc<dyn HttpClient>,
}

impl InnerTubeSource {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CaptionsSource for InnerTubeSource {
    async fn captions(&self, video_id: &str) -> Result<CaptionsDescriptor> {
        let html = fetch_watch_page(self.http.as_ref(), video_id).await?;
        check_page_blocks(&html, video_id)?;

        let api_key = extract_api_key(&html).ok_or_else(|| TranscriptError::NoTranscriptsAvailable {
            video_id: video_id.to_string(),
        })?;
        debug!("Extracted InnerTube API key: {api_key}");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION
                }
            },
            "videoId": video_id
        });
        let url = format!("{INNERTUBE_PLAYER_URL}{api_key}");
        let resp = self.http.send(HttpRequest::post_json(&url, &body)).await?;
        check_status(&resp, video_id)?;

        let player: Value = resp.json()?;
        captions_from_player_response(&player, video_id)
    }
}

/// Runs the primary source and retries with the secondary when the primary finds no captions
pub struct FallbackSource<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> FallbackSource<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<A: CaptionsSource, B: CaptionsSource> CaptionsSource for FallbackSource<A, B> {
    async fn captions(&self, video_id: &str) -> Result<CaptionsDescriptor> {
        match self.primary.captions(video_id).await {
            Err(TranscriptError::TranscriptsDisabled { .. } | TranscriptError::NoTranscriptsAvailable { .. }) => {
                info!("No captions found in the watch page for {video_id}, asking the player API");
                self.secondary.captions(video_id).await
            }
            other => other,
        }
    }
}

async fn fetch_watch_page(http: &dyn HttpClient, video_id: &str) -> Result<String> {
    let url = format!("{WATCH_URL}{video_id}");
    debug!("Fetching watch page: {url}");

    let html = get_page(http, HttpRequest::get(&url), video_id).await?;
    if !html.contains(CONSENT_MARKER) {
        return Ok(html);
    }

    debug!("Consent page served for {video_id}, accepting");
    let token = CONSENT_VALUE_RE
        .captures(&html)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| TranscriptError::ConsentCookie {
            video_id: video_id.to_string(),
        })?;
    let retry = HttpRequest::get(&url).header("Cookie", format!("CONSENT=YES+{token}"));
    let html = get_page(http, retry, video_id).await?;
    if html.contains(CONSENT_MARKER) {
        return Err(TranscriptError::ConsentCookie {
            video_id: video_id.to_string(),
        });
    }
    Ok(html)
}

async fn get_page(http: &dyn HttpClient, request: HttpRequest, video_id: &str) -> Result<String> {
    let resp = http.send(request).await?;
    check_status(&resp, video_id)?;
    // Decoded before any JSON is cut out: `&amp;` in caption URLs becomes `&`, but an escaped
    // quote inside a JSON string turns into a bare `"` and the blob no longer parses
    Ok(html_escape::decode_html_entities(resp.text()).into_owned())
}

fn check_status(resp: &HttpResponse, video_id: &str) -> Result<()> {
    match resp.status {
        429 => Err(TranscriptError::TooManyRequests {
            video_id: video_id.to_string(),
        }),
        _ if resp.is_success() => Ok(()),
        status => Err(TranscriptError::request(&resp.url, format!("HTTP {status}"))),
    }
}

/// Detect a bot challenge or a page without any player data
pub fn check_page_blocks(html: &str, video_id: &str) -> Result<()> {
    if html.contains(RECAPTCHA_MARKER) {
        return Err(TranscriptError::TooManyRequests {
            video_id: video_id.to_string(),
        });
    }
    if !html.contains(PLAYABILITY_MARKER) {
        return Err(TranscriptError::VideoUnavailable {
            video_id: video_id.to_string(),
        });
    }
    Ok(())
}

/// Cut the captions JSON out of the watch page
pub fn captions_from_html(html: &str, video_id: &str) -> Result<CaptionsDescriptor> {
    let disabled = || TranscriptError::TranscriptsDisabled {
        video_id: video_id.to_string(),
    };

    let (_, rest) = html.split_once(CAPTIONS_MARKER).ok_or_else(disabled)?;
    let blob = rest.split(VIDEO_DETAILS_MARKER).next().unwrap_or_default().replace('\n', "");
    let captions: Value = serde_json::from_str(&blob).map_err(|e| {
        debug!("Captions blob for {video_id} is not valid JSON: {e}");
        disabled()
    })?;
    let renderer = captions.get("playerCaptionsTracklistRenderer").ok_or_else(disabled)?;

    CaptionsDescriptor::from_renderer(renderer).ok_or_else(|| TranscriptError::NoTranscriptsAvailable {
        video_id: video_id.to_string(),
    })
}

pub fn extract_api_key(html: &str) -> Option<String> {
    API_KEY_RE.captures(html).map(|caps| caps[1].to_string())
}

/// Interpret an InnerTube player response
pub fn captions_from_player_response(player: &Value, video_id: &str) -> Result<CaptionsDescriptor> {
    check_playability(player, video_id)?;

    player
        .pointer("/captions/playerCaptionsTracklistRenderer")
        .and_then(CaptionsDescriptor::from_renderer)
        .ok_or_else(|| TranscriptError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        })
}

/// Any status other than `OK` fails. Reasons we do not recognise are reported as an unavailable
/// video, which may also swallow transient errors.
fn check_playability(player: &Value, video_id: &str) -> Result<()> {
    let status = player.pointer("/playabilityStatus/status").and_then(Value::as_str);
    if status == Some("OK") {
        return Ok(());
    }

    let reason = player
        .pointer("/playabilityStatus/reason")
        .and_then(Value::as_str)
        .unwrap_or_default();
    debug!("Playability status {status:?} for {video_id}: {reason}");

    let video_id = video_id.to_string();
    if reason.contains("not a bot") {
        Err(TranscriptError::TooManyRequests { video_id })
    } else {
        Err(TranscriptError::VideoUnavailable { video_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const VIDEO_ID: &str = "abcdefghijk";

    /// Replays queued responses in order and records every request
    struct ScriptedHttp {
        responses: Mutex<VecDeque<(u16, String)>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttp {
        fn new(responses: &[(u16, &str)]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().map(|(s, b)| (*s, b.to_string())).collect()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttp {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");
            let url = request.url.clone();
            self.requests.lock().unwrap().push(request);
            Ok(HttpResponse { url, status, body })
        }
    }

    fn watch_page(captions: &str) -> String {
        format!(
            r#"<html><script>var ytInitialPlayerResponse = {{"playabilityStatus":{{"status":"OK"}},"captions":{captions},"videoDetails":{{"videoId":"{VIDEO_ID}"}}}};</script>"INNERTUBE_API_KEY":"AIzaSyTestKey_1"</html>"#
        )
    }

    const TRACKS: &str = r#"{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=abcdefghijk&lang=en","name":{"simpleText":"English"},"languageCode":"en","isTranslatable":true}],"translationLanguages":[{"languageCode":"de","languageName":{"simpleText":"German"}}]}}"#;

    #[test]
    fn test_recaptcha_checked_first() {
        let html = r#"<div class="g-recaptcha"></div>"#;
        assert!(matches!(
            check_page_blocks(html, VIDEO_ID),
            Err(TranscriptError::TooManyRequests { .. })
        ));
    }

    #[test]
    fn test_missing_playability_is_unavailable() {
        assert!(matches!(
            check_page_blocks("<html></html>", VIDEO_ID),
            Err(TranscriptError::VideoUnavailable { .. })
        ));
    }

    #[test]
    fn test_captions_from_html() {
        let captions = captions_from_html(&watch_page(TRACKS), VIDEO_ID).unwrap();
        assert_eq!(captions.caption_tracks.len(), 1);
        assert_eq!(captions.caption_tracks[0]["languageCode"], "en");
        assert_eq!(captions.translation_languages.len(), 1);
    }

    #[test]
    fn test_captions_blob_with_newlines() {
        let html = watch_page(TRACKS).replace(r#""captionTracks":"#, "\"captionTracks\"\n:");
        assert!(captions_from_html(&html, VIDEO_ID).is_ok());
    }

    #[test]
    fn test_no_captions_blob_is_disabled() {
        let html = r#"{"playabilityStatus":{"status":"OK"},"videoDetails":{}}"#;
        assert!(matches!(
            captions_from_html(html, VIDEO_ID),
            Err(TranscriptError::TranscriptsDisabled { .. })
        ));
    }

    #[test]
    fn test_unparsable_blob_is_disabled() {
        let html = watch_page("{not json");
        assert!(matches!(
            captions_from_html(&html, VIDEO_ID),
            Err(TranscriptError::TranscriptsDisabled { .. })
        ));
    }

    #[test]
    fn test_missing_caption_tracks_is_no_transcripts() {
        let html = watch_page(r#"{"playerCaptionsTracklistRenderer":{"visibility":"UNKNOWN"}}"#);
        assert!(matches!(
            captions_from_html(&html, VIDEO_ID),
            Err(TranscriptError::NoTranscriptsAvailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_page_entities_decoded_before_extraction() {
        let tracks = TRACKS.replace("&lang=en", "&amp;lang=en");
        let http = ScriptedHttp::new(&[(200, watch_page(&tracks).as_str())]);
        let captions = PageScrapeSource::new(http).captions(VIDEO_ID).await.unwrap();
        assert_eq!(
            captions.caption_tracks[0]["baseUrl"],
            "https://www.youtube.com/api/timedtext?v=abcdefghijk&lang=en"
        );
    }

    #[tokio::test]
    async fn test_escaped_quote_in_page_json_reads_as_disabled() {
        let tracks = TRACKS.replace(r#""simpleText":"English""#, r#""simpleText":"Say &quot;hi&quot;""#);
        let http = ScriptedHttp::new(&[(200, watch_page(&tracks).as_str())]);
        assert!(matches!(
            PageScrapeSource::new(http).captions(VIDEO_ID).await,
            Err(TranscriptError::TranscriptsDisabled { .. })
        ));
    }

    #[test]
    fn test_extract_api_key() {
        assert_eq!(extract_api_key(&watch_page(TRACKS)).as_deref(), Some("AIzaSyTestKey_1"));
        assert_eq!(
            extract_api_key(r#""INNERTUBE_API_KEY": "AIzaSyB123""#).as_deref(),
            Some("AIzaSyB123")
        );
        assert_eq!(extract_api_key("<html><body>no key here</body></html>"), None);
    }

    #[test]
    fn test_player_response_ok() {
        let player = json!({
            "playabilityStatus": {"status": "OK"},
            "captions": serde_json::from_str::<Value>(TRACKS).unwrap()
        });
        let captions = captions_from_player_response(&player, VIDEO_ID).unwrap();
        assert_eq!(captions.caption_tracks.len(), 1);
    }

    #[test]
    fn test_player_response_bot_check() {
        let player = json!({
            "playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm you’re not a bot"}
        });
        assert!(matches!(
            captions_from_player_response(&player, VIDEO_ID),
            Err(TranscriptError::TooManyRequests { .. })
        ));
    }

    #[test]
    fn test_player_response_unavailable_reasons() {
        for reason in [
            "This video may be inappropriate for some users.",
            "This video is unavailable",
            "Something we have never seen",
        ] {
            let player = json!({"playabilityStatus": {"status": "ERROR", "reason": reason}});
            assert!(
                matches!(
                    captions_from_player_response(&player, VIDEO_ID),
                    Err(TranscriptError::VideoUnavailable { .. })
                ),
                "{reason}"
            );
        }
    }

    #[test]
    fn test_player_response_without_captions_is_disabled() {
        let player = json!({"playabilityStatus": {"status": "OK"}});
        assert!(matches!(
            captions_from_player_response(&player, VIDEO_ID),
            Err(TranscriptError::TranscriptsDisabled { .. })
        ));

        let player = json!({
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {}}
        });
        assert!(matches!(
            captions_from_player_response(&player, VIDEO_ID),
            Err(TranscriptError::TranscriptsDisabled { .. })
        ));
    }

    #[tokio::test]
    async fn test_page_source() {
        let http = ScriptedHttp::new(&[(200, watch_page(TRACKS).as_str())]);
        let captions = PageScrapeSource::new(http.clone()).captions(VIDEO_ID).await.unwrap();
        assert_eq!(captions.caption_tracks.len(), 1);
        assert_eq!(
            http.requests.lock().unwrap()[0].url,
            "https://www.youtube.com/watch?v=abcdefghijk"
        );
    }

    #[tokio::test]
    async fn test_page_source_rate_limited() {
        let http = ScriptedHttp::new(&[(429, "")]);
        assert!(matches!(
            PageScrapeSource::new(http).captions(VIDEO_ID).await,
            Err(TranscriptError::TooManyRequests { .. })
        ));
    }

    #[tokio::test]
    async fn test_consent_page_accepted() {
        let consent = r#"<form action="https://consent.youtube.com/s"><input name="v" value="cb.20210328-17-p0.en+FX+999"></form>"#;
        let http = ScriptedHttp::new(&[(200, consent), (200, watch_page(TRACKS).as_str())]);
        PageScrapeSource::new(http.clone()).captions(VIDEO_ID).await.unwrap();

        let requests = http.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(
            requests[1]
                .headers
                .iter()
                .any(|(n, v)| n == "Cookie" && v == "CONSENT=YES+cb.20210328-17-p0.en+FX+999")
        );
    }

    #[tokio::test]
    async fn test_consent_page_persisting_fails() {
        let consent = r#"<form action="https://consent.youtube.com/s"><input name="v" value="x"></form>"#;
        let http = ScriptedHttp::new(&[(200, consent), (200, consent)]);
        assert!(matches!(
            PageScrapeSource::new(http).captions(VIDEO_ID).await,
            Err(TranscriptError::ConsentCookie { .. })
        ));
    }

    #[tokio::test]
    async fn test_innertube_source() {
        let player = format!(r#"{{"playabilityStatus":{{"status":"OK"}},"captions":{TRACKS}}}"#);
        let http = ScriptedHttp::new(&[(200, watch_page("{}").as_str()), (200, player.as_str())]);
        let captions = InnerTubeSource::new(http.clone()).captions(VIDEO_ID).await.unwrap();
        assert_eq!(captions.caption_tracks.len(), 1);

        let requests = http.requests.lock().unwrap();
        assert_eq!(
            requests[1].url,
            "https://www.youtube.com/youtubei/v1/player?key=AIzaSyTestKey_1"
        );
        let body: Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["videoId"], VIDEO_ID);
        assert_eq!(body["context"]["client"]["clientName"], "ANDROID");
    }

    #[tokio::test]
    async fn test_innertube_source_without_key() {
        let page = r#"{"playabilityStatus":{"status":"OK"}}"#;
        let http = ScriptedHttp::new(&[(200, page)]);
        assert!(matches!(
            InnerTubeSource::new(http).captions(VIDEO_ID).await,
            Err(TranscriptError::NoTranscriptsAvailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_fallback_uses_player_api() {
        let player = format!(r#"{{"playabilityStatus":{{"status":"OK"}},"captions":{TRACKS}}}"#);
        let page_without_captions = r#"{"playabilityStatus":{"status":"OK"}} "INNERTUBE_API_KEY":"k""#;
        let http = ScriptedHttp::new(&[(200, page_without_captions), (200, page_without_captions), (200, player.as_str())]);
        let source = Strategy::Auto.source(http.clone());
        let captions = source.captions(VIDEO_ID).await.unwrap();
        assert_eq!(captions.caption_tracks.len(), 1);
        assert_eq!(http.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_keeps_hard_failures() {
        let http = ScriptedHttp::new(&[(200, "<html>gone</html>")]);
        let source = Strategy::Auto.source(http.clone());
        assert!(matches!(
            source.captions(VIDEO_ID).await,
            Err(TranscriptError::VideoUnavailable { .. })
        ));
        assert_eq!(http.requests.lock().unwrap().len(), 1);
    }
}
