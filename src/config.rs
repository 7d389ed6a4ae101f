use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::Deserialize;

use crate::output::OutputFormat;
use crate::youtube::Strategy;

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preferred caption languages, most preferred first
    pub languages: Option<Vec<String>>,
    /// Single preferred language; ignored when `languages` is set
    pub lang: Option<String>,
    pub format: Option<OutputFormat>,
    pub strategy: Option<Strategy>,
    pub indent: Option<usize>,
    pub cookies: Option<PathBuf>,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    /// Country codes for Webshare exit IPs; used when Webshare credentials are given
    pub webshare_proxy_locations: Option<Vec<String>>,
}

impl Config {
    /// Load config from ~/.config/ytscript/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    pub fn languages(&self) -> Vec<String> {
        resolve_languages(self.languages.as_deref(), self.lang.as_deref())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytscript")
        .join("config.toml")
}

/// An explicit non-empty list wins over a single language, which wins over `["en"]`
pub fn resolve_languages(languages: Option<&[String]>, lang: Option<&str>) -> Vec<String> {
    match (languages, lang) {
        (Some(list), _) if !list.is_empty() => list.to_vec(),
        (_, Some(lang)) if !lang.is_empty() => vec![lang.to_string()],
        _ => vec![DEFAULT_LANGUAGE.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
languages = ["de", "en"]
format = "json"
strategy = "api"
indent = 2
cookies = "/tmp/cookies.txt"
https_proxy = "http://proxy.local:3128"
webshare_proxy_locations = ["de", "nl"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.languages(), vec!["de", "en"]);
        assert_eq!(config.format, Some(OutputFormat::Json));
        assert_eq!(config.strategy, Some(Strategy::Api));
        assert_eq!(config.indent, Some(2));
        assert_eq!(config.cookies, Some(PathBuf::from("/tmp/cookies.txt")));
        assert_eq!(config.https_proxy.as_deref(), Some("http://proxy.local:3128"));
        assert!(config.http_proxy.is_none());
        assert_eq!(
            config.webshare_proxy_locations,
            Some(vec!["de".to_string(), "nl".to_string()])
        );
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.format.is_none());
        assert_eq!(config.languages(), vec!["en"]);
    }

    #[test]
    fn test_legacy_lang() {
        let config: Config = toml::from_str(r#"lang = "fr""#).unwrap();
        assert_eq!(config.languages(), vec!["fr"]);
    }

    #[test]
    fn test_language_precedence() {
        let list = vec!["es".to_string(), "pt".to_string()];
        assert_eq!(resolve_languages(Some(list.as_slice()), Some("fr")), list);
        assert_eq!(resolve_languages(Some(&[][..]), Some("fr")), vec!["fr"]);
        assert_eq!(resolve_languages(None, Some("fr")), vec!["fr"]);
        assert_eq!(resolve_languages(None, None), vec!["en"]);
        assert_eq!(resolve_languages(None, Some("")), vec!["en"]);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(toml::from_str::<Config>(r#"format = "docx""#).is_err());
    }
}
