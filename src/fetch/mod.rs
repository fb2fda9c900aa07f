use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Proxy, Url};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid page URL: {url}: {source}")]
    InvalidPageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot resolve '{path}' against {base}: {source}")]
    Resolve {
        path: String,
        base: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header '{header}', expected 'Key: Value'")]
    InvalidHeader { header: String },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read response body: {source}")]
    Body {
        #[source]
        source: reqwest::Error,
    },
}

/// A response whose body has not been read yet.
#[async_trait]
pub trait ResponseBody: Send {
    fn status(&self) -> u16;

    async fn bytes(self) -> Result<Vec<u8>, FetchError>;
}

/// Issues GET requests for paths relative to the page.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Response: ResponseBody;

    async fn fetch(&self, path: &str) -> Result<Self::Response, FetchError>;
}

#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    pub timeout: Option<Duration>,
    pub proxy: Option<String>,
    pub header: Option<String>,
}

/// reqwest-backed fetcher bound to the URL the page was loaded from.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    page_url: Url,
}

impl HttpFetcher {
    pub fn new(page_url: &str, options: &ClientOptions) -> Result<Self, FetchError> {
        let page_url = Url::parse(page_url.trim()).map_err(|source| FetchError::InvalidPageUrl {
            url: page_url.to_string(),
            source,
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        // only an explicitly configured proxy is used, never one from the environment
        match options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(proxy) => {
                let proxy_cfg = Proxy::all(proxy).map_err(|source| FetchError::ProxySetup {
                    proxy: proxy.to_string(),
                    source,
                })?;
                builder = builder.proxy(proxy_cfg);
            }
            None => builder = builder.no_proxy(),
        }
        if let Some(raw) = options.header.as_deref().filter(|h| !h.trim().is_empty()) {
            builder = builder.default_headers(parse_header(raw)?);
        }
        let client = builder
            .build()
            .map_err(|source| FetchError::HttpClientBuild { source })?;

        Ok(Self { client, page_url })
    }

    /// Resolves `path` the way a browser resolves a relative fetch URL.
    pub fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        self.page_url
            .join(path)
            .map_err(|source| FetchError::Resolve {
                path: path.to_string(),
                base: self.page_url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    type Response = reqwest::Response;

    async fn fetch(&self, path: &str) -> Result<Self::Response, FetchError> {
        let url = self.resolve(path)?;
        tracing::debug!(%url, "GET");
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl ResponseBody for reqwest::Response {
    fn status(&self) -> u16 {
        reqwest::Response::status(self).as_u16()
    }

    async fn bytes(self) -> Result<Vec<u8>, FetchError> {
        reqwest::Response::bytes(self)
            .await
            .map(|b| b.to_vec())
            .map_err(|source| FetchError::Body { source })
    }
}

fn parse_header(raw: &str) -> Result<HeaderMap, FetchError> {
    let invalid = || FetchError::InvalidHeader {
        header: raw.to_string(),
    };
    let (name, value) = raw.split_once(':').ok_or_else(invalid)?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    let mut headers = HeaderMap::new();
    headers.insert(name, value);
    Ok(headers)
}
