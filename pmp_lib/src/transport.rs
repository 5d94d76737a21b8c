//! Outbound HTTP capability.
//!
//! The resolver only ever talks to a [`Transport`]; [`HttpTransport`] is the reqwest
//! implementation used in production, tests plug in canned responses.

use crate::config::{Credentials, Options};
use crate::error::{Error, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Client as HttpClient;

pub use reqwest::Method;

/// A single request relative to the PMP base URL.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path plus query string, without leading slash (e.g. `restapi/json/v1/resources?..`).
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn get(path: impl Into<String>, headers: Vec<(String, String)>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            headers,
            body: None,
        }
    }
}

/// Raw answer: status code and undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, Error>;
}

/// reqwest-backed transport bound to one PMP server.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    user_agent: String,
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(credentials: &Credentials, options: &Options) -> Result<Self, Error> {
        if !options.validate_certs {
            tracing::warn!(
                base_url = credentials.base_url(),
                "TLS certificate verification is disabled"
            );
        }
        let http = HttpClient::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.validate_certs)
            .build()
            .map_err(TransportError::from)?;
        Ok(Self {
            base_url: credentials.base_url().to_string(),
            user_agent: format!("pmp-cli/{}", crate::VERSION),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn headers(&self, extra: &[(String, String)]) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| TransportError::new(e.to_string(), None))?,
        );
        for (k, v) in extra {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| TransportError::new(format!("invalid header {}: {}", k, e), None))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| TransportError::new(format!("invalid value for {}: {}", k, e), None))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, Error> {
        let url = self.url(&request.path);
        let mut req = self
            .http
            .request(request.method, &url)
            .headers(self.headers(&request.headers)?);
        if let Some(body) = request.body {
            req = req.body(body);
        }
        let res = req.send().await.map_err(TransportError::from)?;
        let status = res.status().as_u16();
        let body = res.bytes().await.map_err(TransportError::from)?.to_vec();
        tracing::debug!(status, bytes = body.len(), "PMP response received");
        Ok(Response { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let creds = Credentials::new("https://pmp.example.com:7272/", "t");
        let t = HttpTransport::new(&creds, &Options::default()).unwrap();
        assert_eq!(
            t.url("/restapi/json/v1/resources"),
            "https://pmp.example.com:7272/restapi/json/v1/resources"
        );
        assert_eq!(
            t.url("restapi/json/v1/resources"),
            "https://pmp.example.com:7272/restapi/json/v1/resources"
        );
    }

    #[test]
    fn builds_without_certificate_verification() {
        let creds = Credentials::new("https://pmp.internal:7272", "t");
        let options = Options {
            validate_certs: false,
            timeout: std::time::Duration::from_secs(3),
            ..Options::default()
        };
        let t = HttpTransport::new(&creds, &options).unwrap();
        assert_eq!(t.base_url, "https://pmp.internal:7272");
        assert!(t.user_agent.starts_with("pmp-cli/"));
    }

    #[test]
    fn rejects_invalid_header_values() {
        let creds = Credentials::new("https://pmp", "t");
        let t = HttpTransport::new(&creds, &Options::default()).unwrap();
        let err = t
            .headers(&[("AUTHTOKEN".to_string(), "bad\nvalue".to_string())])
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn success_range() {
        let ok = Response {
            status: 204,
            body: vec![],
        };
        let bad = Response {
            status: 500,
            body: vec![],
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
