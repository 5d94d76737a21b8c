//! Settings for reaching Password Manager Pro.
//!
//! Everything is read from the environment once by the host and passed explicitly
//! into the [`Resolver`](crate::Resolver):
//! - `PMP_URL`: base address of the PMP server (required, trailing `/` stripped).
//! - `PMP_AUTHTOKEN`: API user token (required).
//! - `PMP_APP_NAME`: value of the `APP_NAME` query parameter (default `ANSIBLE`).
//! - `PMP_AUTH_STYLE`: `query` (`APP_AUTHTOKEN` parameter, default) or `header`
//!   (`AUTHTOKEN` header).
//! - `PMP_VALIDATE_CERTS`: verify the server certificate (default `true`).
//! - `PMP_TIMEOUT_SECS`: request timeout in seconds (default 30).

use crate::error::Error;
use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const ENV_URL: &str = "PMP_URL";
pub const ENV_AUTHTOKEN: &str = "PMP_AUTHTOKEN";
pub const ENV_APP_NAME: &str = "PMP_APP_NAME";
pub const ENV_AUTH_STYLE: &str = "PMP_AUTH_STYLE";
pub const ENV_VALIDATE_CERTS: &str = "PMP_VALIDATE_CERTS";
pub const ENV_TIMEOUT_SECS: &str = "PMP_TIMEOUT_SECS";

pub const DEFAULT_APP_NAME: &str = "ANSIBLE";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Base address and API token. Immutable for the lifetime of a resolver.
#[derive(Clone)]
pub struct Credentials {
    base_url: String,
    auth_token: SecretString,
}

impl Credentials {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: SecretString::from(auth_token.into()),
        }
    }

    /// Validating constructor: the base URL must be an absolute http(s) URL.
    pub fn parse(base_url: &str, auth_token: impl Into<String>) -> Result<Self, Error> {
        let base_url = base_url.trim();
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("{}: invalid URL `{}`: {}", ENV_URL, base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "{}: unsupported scheme `{}` (expected http or https)",
                ENV_URL,
                parsed.scheme()
            )));
        }
        Ok(Self::new(base_url, auth_token))
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_token(&self) -> &SecretString {
        &self.auth_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

/// How the API token travels with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStyle {
    /// `APP_AUTHTOKEN=<token>` query parameter.
    #[default]
    QueryParam,
    /// `AUTHTOKEN: <token>` request header.
    Header,
}

impl FromStr for AuthStyle {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "query" | "param" | "query_param" => Ok(AuthStyle::QueryParam),
            "header" => Ok(AuthStyle::Header),
            _ => Err(Error::Config(format!(
                "{}: unknown auth style `{}` (expected `query` or `header`)",
                ENV_AUTH_STYLE, s
            ))),
        }
    }
}

/// Request knobs that are not credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub app_name: String,
    pub auth_style: AuthStyle,
    pub validate_certs: bool,
    pub timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            auth_style: AuthStyle::default(),
            validate_certs: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Options {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build options from an arbitrary variable lookup; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Options::default();
        if let Some(name) = non_blank(lookup(ENV_APP_NAME)) {
            opts.app_name = name;
        }
        if let Some(style) = non_blank(lookup(ENV_AUTH_STYLE)) {
            opts.auth_style = style.parse()?;
        }
        if let Some(v) = non_blank(lookup(ENV_VALIDATE_CERTS)) {
            opts.validate_certs = parse_bool(&v).ok_or_else(|| {
                Error::Config(format!("{}: not a boolean: `{}`", ENV_VALIDATE_CERTS, v))
            })?;
        }
        if let Some(v) = non_blank(lookup(ENV_TIMEOUT_SECS)) {
            let secs: u64 = v.parse().ok().filter(|s| *s > 0).ok_or_else(|| {
                Error::Config(format!(
                    "{}: not a positive number of seconds: `{}`",
                    ENV_TIMEOUT_SECS, v
                ))
            })?;
            opts.timeout = Duration::from_secs(secs);
        }
        Ok(opts)
    }
}

/// Read `PMP_URL` and `PMP_AUTHTOKEN` from the process environment.
pub fn load_credentials() -> Result<Credentials, Error> {
    load_credentials_from(|key| std::env::var(key).ok())
}

/// Same as [`load_credentials`] with an injected lookup (tests, embedding hosts).
pub fn load_credentials_from<F>(lookup: F) -> Result<Credentials, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let url = non_blank(lookup(ENV_URL))
        .ok_or_else(|| Error::Config(format!("{} environment variable is not set", ENV_URL)))?;
    let token = non_blank(lookup(ENV_AUTHTOKEN)).ok_or_else(|| {
        Error::Config(format!("{} environment variable is not set", ENV_AUTHTOKEN))
    })?;
    Credentials::parse(&url, token)
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn loads_and_strips_trailing_slash() {
        let c = load_credentials_from(env(&[
            ("PMP_URL", "https://pmp.example.com:7272/"),
            ("PMP_AUTHTOKEN", "A1B2-C3"),
        ]))
        .unwrap();
        assert_eq!(c.base_url(), "https://pmp.example.com:7272");
        assert_eq!(c.auth_token().expose_secret(), "A1B2-C3");
    }

    #[test]
    fn missing_url_is_config_error() {
        let err = load_credentials_from(env(&[("PMP_AUTHTOKEN", "t")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("PMP_URL")));
    }

    #[test]
    fn missing_token_is_config_error() {
        let err = load_credentials_from(env(&[("PMP_URL", "https://pmp")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("PMP_AUTHTOKEN")));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let err =
            load_credentials_from(env(&[("PMP_URL", "https://pmp"), ("PMP_AUTHTOKEN", "  ")]))
                .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_relative_or_non_http_url() {
        let err = load_credentials_from(env(&[("PMP_URL", "pmp.local"), ("PMP_AUTHTOKEN", "t")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(Credentials::parse("ftp://pmp.local", "t").is_err());
        assert!(Credentials::parse("http://10.0.0.5:7272", "t").is_ok());
    }

    #[test]
    fn debug_redacts_token() {
        let c = Credentials::new("https://pmp", "very-secret");
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("very-secret"));
        assert!(dbg.contains("REDACTED"));
    }

    #[test]
    fn options_defaults_verify_tls() {
        let o = Options::from_lookup(env(&[])).unwrap();
        assert_eq!(o, Options::default());
        assert!(o.validate_certs);
        assert_eq!(o.auth_style, AuthStyle::QueryParam);
        assert_eq!(o.app_name, "ANSIBLE");
    }

    #[test]
    fn options_from_env_values() {
        let o = Options::from_lookup(env(&[
            ("PMP_APP_NAME", "deployer"),
            ("PMP_AUTH_STYLE", "Header"),
            ("PMP_VALIDATE_CERTS", "false"),
            ("PMP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(o.app_name, "deployer");
        assert_eq!(o.auth_style, AuthStyle::Header);
        assert!(!o.validate_certs);
        assert_eq!(o.timeout, Duration::from_secs(5));
    }

    #[test]
    fn options_reject_garbage() {
        assert!(Options::from_lookup(env(&[("PMP_VALIDATE_CERTS", "maybe")])).is_err());
        assert!(Options::from_lookup(env(&[("PMP_TIMEOUT_SECS", "soon")])).is_err());
        assert!(Options::from_lookup(env(&[("PMP_TIMEOUT_SECS", "0")])).is_err());
        assert!(Options::from_lookup(env(&[("PMP_AUTH_STYLE", "cookie")])).is_err());
    }
}
