use crate::error::{Result, TranscriptError};

/// Source of proxy URLs for the HTTP transport; building the URLs does not open a tunnel
pub trait ProxyConfig {
    fn http_url(&self) -> Option<String>;
    fn https_url(&self) -> Option<String>;
}

/// Proxy URLs supplied verbatim by the caller
#[derive(Debug, Clone)]
pub struct GenericProxyConfig {
    http_url: Option<String>,
    https_url: Option<String>,
}

impl GenericProxyConfig {
    pub fn new(http_url: Option<String>, https_url: Option<String>) -> Result<Self> {
        if http_url.is_none() && https_url.is_none() {
            return Err(TranscriptError::InvalidProxyConfig(
                "at least one of the HTTP or HTTPS proxy URLs must be set".to_string(),
            ));
        }
        Ok(Self { http_url, https_url })
    }
}

impl ProxyConfig for GenericProxyConfig {
    fn http_url(&self) -> Option<String> {
        self.http_url.clone()
    }

    fn https_url(&self) -> Option<String> {
        self.https_url.clone()
    }
}

/// Rotating residential proxies from Webshare
#[derive(Debug, Clone)]
pub struct WebshareProxyConfig {
    username: String,
    password: String,
    locations: Vec<String>,
}

impl WebshareProxyConfig {
    pub const DOMAIN: &'static str = "p.webshare.io";
    pub const PORT: u16 = 80;

    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            locations: Vec::new(),
        }
    }

    /// Restrict the exit IPs to the given country codes
    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.locations = locations.into_iter().map(|l| l.as_ref().to_uppercase()).collect();
        self
    }

    pub fn url(&self) -> String {
        let locations: String = self.locations.iter().map(|l| format!("-{l}")).collect();
        format!(
            "http://{}{}-rotate:{}@{}:{}/",
            self.username,
            locations,
            self.password,
            Self::DOMAIN,
            Self::PORT
        )
    }
}

impl ProxyConfig for WebshareProxyConfig {
    fn http_url(&self) -> Option<String> {
        Some(self.url())
    }

    fn https_url(&self) -> Option<String> {
        Some(self.url())
    }
}
