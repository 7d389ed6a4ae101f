use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::error::{Result, TranscriptError};
use crate::proxy::ProxyConfig;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body.to_string()),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A fully-read response; the body is buffered so callers can inspect it more than once
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| TranscriptError::request(&self.url, e))
    }
}

/// Transport used by every stage of the pipeline that touches the network
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Static transport settings, fixed when the client is built
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub cookie_header: Option<String>,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            cookie_header: None,
            http_proxy: None,
            https_proxy: None,
        }
    }
}

impl HttpSettings {
    pub fn with_proxy(mut self, proxy: &dyn ProxyConfig) -> Self {
        self.http_proxy = proxy.http_url();
        self.https_proxy = proxy.https_url();
        self
    }

    pub fn with_cookie_header(mut self, cookies: impl Into<String>) -> Self {
        self.cookie_header = Some(cookies.into());
        self
    }
}

/// `HttpClient` backed by reqwest
pub struct ReqwestClient {
    client: reqwest::Client,
    cookie_header: Option<String>,
}

impl ReqwestClient {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));

        let mut builder = reqwest::Client::builder()
            .user_agent(settings.user_agent)
            .default_headers(headers);

        if let Some(ref url) = settings.http_proxy {
            debug!("Using HTTP proxy");
            let proxy = reqwest::Proxy::http(url).map_err(|e| TranscriptError::InvalidProxyConfig(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        if let Some(ref url) = settings.https_proxy {
            debug!("Using HTTPS proxy");
            let proxy = reqwest::Proxy::https(url).map_err(|e| TranscriptError::InvalidProxyConfig(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TranscriptError::request("<client>", e))?;

        Ok(Self {
            client,
            cookie_header: settings.cookie_header,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{:?} {}", request.method, request.url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        let mut cookies = self.cookie_header.clone();
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case(COOKIE.as_str()) {
                cookies = Some(merge_cookies(cookies.as_deref(), value));
            } else {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(cookies) = cookies {
            builder = builder.header(COOKIE, cookies);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| TranscriptError::request(&request.url, e))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TranscriptError::request(&request.url, e))?;

        Ok(HttpResponse {
            url: request.url,
            status,
            body,
        })
    }
}

fn merge_cookies(configured: Option<&str>, extra: &str) -> String {
    match configured {
        Some(existing) if !existing.is_empty() => format!("{existing}; {extra}"),
        _ => extra.to_string(),
    }
}
