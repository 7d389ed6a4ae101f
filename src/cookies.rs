use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::error::{Result, TranscriptError};

const COOKIE_DOMAIN: &str = "youtube.com";

/// Load a Netscape-format cookie file and build the `Cookie` header value from it
pub fn load_cookie_header(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|source| TranscriptError::CookiePathInvalid {
        path: path.to_path_buf(),
        source,
    })?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let header = cookie_header(&content, now);
    if header.is_empty() {
        return Err(TranscriptError::CookiesInvalid(path.to_path_buf()));
    }
    debug!("Loaded cookies from {}", path.display());
    Ok(header)
}

/// Join the unexpired youtube.com cookies in `content` as `name=value; ...`
pub fn cookie_header(content: &str, now: u64) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                return None;
            }
            let (domain, expires, name, value) = (fields[0], fields[4], fields[5], fields[6]);
            let expires = expires.parse::<u64>().ok()?;
            (domain.contains(COOKIE_DOMAIN) && expires > now).then(|| format!("{name}={value}"))
        })
        .collect::<Vec<_>>()
        .join("; ")
}
