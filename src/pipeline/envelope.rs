//! Request and response envelopes passed between pipeline stages

use crate::error::{Error, Result};
use crate::types::{JsonValue, StringMap};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Context key under which the login flow stores the modhash
pub const MODHASH_KEY: &str = "modhash";

/// Request body
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body
    #[default]
    Empty,
    /// Raw bytes, sent as-is
    Bytes(Bytes),
    /// JSON document
    Json(JsonValue),
    /// Form fields, URL-encoded by the transport
    Form(Vec<(String, String)>),
}

impl Body {
    /// Build a form body from borrowed pairs
    pub fn form<K: Into<String>, V: Into<String>>(fields: impl IntoIterator<Item = (K, V)>) -> Self {
        Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Whether the body is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// Metadata attached to a request for later pipeline stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    values: StringMap,
}

impl RequestContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Insert or overwrite a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The modhash stored by the login flow, if any
    pub fn modhash(&self) -> Option<&str> {
        self.get(MODHASH_KEY)
    }

    /// Store the modhash for downstream stages
    pub fn set_modhash(&mut self, modhash: impl Into<String>) {
        self.insert(MODHASH_KEY, modhash);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the context has no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Mutable request object passed through the pipeline
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// HTTP method
    pub method: Method,
    /// Target URL (scheme, host, port, path, query)
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Body,
    /// Metadata for downstream stages
    pub context: RequestContext,
}

impl RequestEnvelope {
    /// Create a request with no headers and an empty body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::Empty,
            context: RequestContext::new(),
        }
    }

    /// Parse the URL and create a request
    pub fn parse(method: Method, url: &str) -> Result<Self> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    /// Create a GET request
    pub fn get(url: &str) -> Result<Self> {
        Self::parse(Method::GET, url)
    }

    /// Create a POST request with a form body
    pub fn post_form(url: &str, fields: Vec<(String, String)>) -> Result<Self> {
        let mut request = Self::parse(Method::POST, url)?;
        request.body = Body::Form(fields);
        Ok(request)
    }

    /// Add a header, replacing any existing value
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::invalid_header(name, e))?;
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Set the request body
    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Replace a header value
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<()> {
        let value = HeaderValue::from_str(value).map_err(|e| Error::invalid_header(name.as_str(), e))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Replace a header value and mark it sensitive so it stays out of debug output
    pub fn set_sensitive_header(&mut self, name: HeaderName, value: &str) -> Result<()> {
        let mut value =
            HeaderValue::from_str(value).map_err(|e| Error::invalid_header(name.as_str(), e))?;
        value.set_sensitive(true);
        self.headers.insert(name, value);
        Ok(())
    }

    /// Header value as a string (first value only, `None` if not valid UTF-8)
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Response produced by the terminal stage of a pipeline
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Fully buffered body
    pub body: Bytes,
    /// Final URL (after redirects)
    pub url: Url,
}

impl ResponseEnvelope {
    /// Create a response envelope
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>, url: Url) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            url,
        }
    }

    /// Buffer a reqwest response into an envelope
    pub async fn from_response(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, body, url))
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First value of a header as a string
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of a header, skipping ones that are not valid UTF-8
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }
}
