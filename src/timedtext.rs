use std::sync::LazyLock;

use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;

use crate::Segment;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Parse a timed-text document into segments, in document order.
///
/// Two dialects exist: `<p t=".." d="..">` with times in milliseconds, and the older
/// `<text start=".." dur="..">` with times in seconds. The millisecond form wins whenever
/// the document contains at least one such element.
pub fn parse_timed_text(xml: &str, preserve_formatting: bool) -> Vec<Segment> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut texts = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let (start_attr, dur_attr, scale, out) = match e.name().as_ref() {
                    b"p" => (b"t".as_slice(), b"d".as_slice(), 1000.0, &mut paragraphs),
                    b"text" => (b"start".as_slice(), b"dur".as_slice(), 1.0, &mut texts),
                    _ => continue,
                };
                let start = numeric_attr(&e, start_attr);
                let duration = numeric_attr(&e, dur_attr);
                let raw = match reader.read_text(e.name()) {
                    Ok(raw) => raw,
                    Err(err) => {
                        warn!("Timed-text document truncated at position {}: {err}", reader.buffer_position());
                        break;
                    }
                };
                if let (Some(start), Some(duration)) = (start, duration) {
                    out.push(Segment {
                        text: clean_text(&raw, preserve_formatting),
                        start: start / scale,
                        duration: duration / scale,
                    });
                }
            }
            Ok(Event::Empty(e)) if matches!(e.name().as_ref(), b"p" | b"text") => {
                debug!("Skipping empty cue at position {}", reader.buffer_position());
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                warn!("Timed-text document truncated at position {}: {err}", reader.buffer_position());
                break;
            }
            _ => {}
        }
    }

    if paragraphs.is_empty() { texts } else { paragraphs }
}

fn numeric_attr(element: &BytesStart<'_>, name: &[u8]) -> Option<f64> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| String::from_utf8_lossy(&attr.value).trim().parse::<f64>().ok())
}

/// Undo the XML escaping, then the HTML entities underneath it, drop markup unless asked to
/// keep it, and trim
fn clean_text(raw: &str, preserve_formatting: bool) -> String {
    // Named HTML entities such as `&nbsp;` are not XML; leave those to the HTML pass
    let unescaped = unescape(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    let decoded = html_escape::decode_html_entities(&unescaped);
    if preserve_formatting {
        decoded.trim().to_string()
    } else {
        TAG_RE.replace_all(&decoded, "").trim().to_string()
    }
}
