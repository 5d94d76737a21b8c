//! Credential resolver: exact and regex lookups on top of the PMP REST API.

use crate::config::{AuthStyle, Credentials, Options};
use crate::envelope::{
    extract_password, parse_envelope, resolve_identity, resource_list, ResourceIdentity,
    ResourceSummary, ResponseEnvelope,
};
use crate::error::{Error, TransportError};
use crate::query::{
    build_audit_query, build_fetch_password_query, build_list_resources_query,
    build_resolve_ids_query, redact, request_headers, AuditQuery, HEADER_AUTHTOKEN,
};
use crate::transport::{HttpTransport, Method, Request, Response, Transport};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::str::FromStr;

/// How `resource_selector` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Exact resource name.
    Exact,
    /// Pattern matched from the start of each listed resource name; first hit wins.
    Regex,
}

impl FromStr for LookupMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(LookupMode::Exact),
            "regex" => Ok(LookupMode::Regex),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub mode: LookupMode,
    pub resource_selector: String,
    pub account_name: String,
}

impl LookupRequest {
    pub fn new(
        mode: LookupMode,
        resource_selector: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            resource_selector: resource_selector.into(),
            account_name: account_name.into(),
        }
    }
}

/// PMP credential resolver.
///
/// Stateless between calls apart from the immutable credentials and options; every
/// operation issues its requests one after another.
pub struct Resolver<T = HttpTransport> {
    credentials: Credentials,
    options: Options,
    transport: T,
}

impl Resolver<HttpTransport> {
    /// Resolver over HTTP with the given settings.
    pub fn connect(credentials: Credentials, options: Options) -> Result<Self, Error> {
        let transport = HttpTransport::new(&credentials, &options)?;
        Ok(Self::new(credentials, options, transport))
    }
}

impl<T: Transport> Resolver<T> {
    pub fn new(credentials: Credentials, options: Options, transport: T) -> Self {
        Self {
            credentials,
            options,
            transport,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// GET a query path and decode the envelope.
    pub async fn get(&self, path: &str) -> Result<ResponseEnvelope, Error> {
        tracing::debug!(path = %redact(path), "PMP GET");
        let headers = request_headers(&self.credentials, &self.options);
        let res = self.transport.send(Request::get(path, headers)).await?;
        interpret(res)
    }

    /// Resource and account IDs for an exact resource name.
    pub async fn resolve_ids(
        &self,
        resource_name: &str,
        account_name: &str,
    ) -> Result<ResourceIdentity, Error> {
        let path =
            build_resolve_ids_query(&self.credentials, &self.options, resource_name, account_name);
        let envelope = self.get(&path).await?;
        resolve_identity(&envelope, resource_name)
    }

    /// Every resource visible to the token, in service order.
    pub async fn list_resources(&self) -> Result<Vec<ResourceSummary>, Error> {
        let path = build_list_resources_query(&self.credentials, &self.options);
        let envelope = self.get(&path).await?;
        resource_list(&envelope)
    }

    /// Resolve the first listed resource whose name matches `pattern` from its first character.
    pub async fn search_resource_ids(
        &self,
        pattern: &str,
        account_name: &str,
    ) -> Result<ResourceIdentity, Error> {
        let rex = prefix_regex(pattern)?;
        let resources = self.list_resources().await?;
        match resources.into_iter().find(|r| rex.is_match(&r.name)) {
            Some(resource) => {
                tracing::debug!(pattern, resource = %resource.name, "pattern matched resource");
                self.resolve_ids(&resource.name, account_name).await
            }
            None => Err(Error::ResourceNotFound(format!(
                "no resource matches pattern `{}` (account `{}`)",
                pattern, account_name
            ))),
        }
    }

    /// Every listed resource whose name matches `pattern` from its first character.
    pub async fn find_resources(&self, pattern: &str) -> Result<Vec<ResourceSummary>, Error> {
        let rex = prefix_regex(pattern)?;
        let resources = self.list_resources().await?;
        Ok(resources
            .into_iter()
            .filter(|r| rex.is_match(&r.name))
            .collect())
    }

    /// Password for resolved IDs.
    pub async fn fetch_password(&self, identity: &ResourceIdentity) -> Result<SecretString, Error> {
        let path = build_fetch_password_query(&self.credentials, &self.options, identity);
        let envelope = self.get(&path).await?;
        extract_password(&envelope)
    }

    pub async fn lookup(&self, request: &LookupRequest) -> Result<SecretString, Error> {
        let identity = match request.mode {
            LookupMode::Exact => {
                self.resolve_ids(&request.resource_selector, &request.account_name)
                    .await?
            }
            LookupMode::Regex => {
                self.search_resource_ids(&request.resource_selector, &request.account_name)
                    .await?
            }
        };
        self.fetch_password(&identity).await
    }

    /// Three-term lookup surface (`mode`, resource, account) returning a one-element list.
    pub async fn lookup_terms(
        &self,
        mode: &str,
        resource_selector: &str,
        account_name: &str,
    ) -> Result<Vec<String>, Error> {
        let request = LookupRequest::new(mode.parse()?, resource_selector, account_name);
        let password = self.lookup(&request).await?;
        Ok(vec![password.expose_secret().to_string()])
    }

    /// One page of the audit trail. Sent with the `AUTHTOKEN` header whatever the auth style.
    pub async fn audit(&self, audit: &AuditQuery) -> Result<ResponseEnvelope, Error> {
        let path = build_audit_query(&self.credentials, &self.options, audit);
        tracing::debug!(path = %redact(&path), "PMP audit");
        let res = self
            .transport
            .send(Request::get(path, self.header_auth_headers()))
            .await?;
        interpret(res)
    }

    /// Arbitrary API call. The token always travels in the `AUTHTOKEN` header here.
    ///
    /// Returns the status code and the decoded JSON body. A body that is not JSON comes
    /// back as a string so error pages stay readable.
    pub async fn raw(
        &self,
        method: Method,
        path: &str,
        data: Option<&Value>,
    ) -> Result<(u16, Value), Error> {
        let headers = self.header_auth_headers();
        let body = match data {
            Some(v) => Some(serde_json::to_vec(v).map_err(|e| {
                Error::Transport(TransportError::new(
                    format!("cannot encode request body: {}", e),
                    None,
                ))
            })?),
            None => None,
        };
        tracing::debug!(%method, path = %redact(path), "PMP raw request");
        let res = self
            .transport
            .send(Request {
                method,
                path: path.trim_start_matches('/').to_string(),
                headers,
                body,
            })
            .await?;
        Ok((res.status, decode_body(&res.body)))
    }

    /// Regular headers plus `AUTHTOKEN`, which `Header` style already includes.
    fn header_auth_headers(&self) -> Vec<(String, String)> {
        let mut headers = request_headers(&self.credentials, &self.options);
        if self.options.auth_style == AuthStyle::QueryParam {
            headers.push((
                HEADER_AUTHTOKEN.to_string(),
                self.credentials.auth_token().expose_secret().to_string(),
            ));
        }
        headers
    }
}

fn decode_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// Decode a response; error statuses are only fatal when the body is not an envelope.
fn interpret(res: Response) -> Result<ResponseEnvelope, Error> {
    match parse_envelope(&res.body) {
        Ok(envelope) => Ok(envelope),
        Err(e) if res.is_success() => Err(e),
        Err(_) => Err(Error::Transport(TransportError::new(
            format!("HTTP {}", res.status),
            Some(res.status),
        ))),
    }
}

/// Compile `pattern` so that it only matches at the start of the candidate.
fn prefix_regex(pattern: &str) -> Result<Regex, Error> {
    Ok(Regex::new(&format!("^(?:{})", pattern))?)
}
