//! REST query paths for the PMP JSON API (v1).
//!
//! Paths are relative to the server base URL and carry their parameters in the
//! query string; every lookup is a bodyless GET.

use crate::config::{AuthStyle, Credentials, Options};
use crate::envelope::ResourceIdentity;
use secrecy::ExposeSecret;

pub const API_BASE_PATH: &str = "restapi/json/v1";

pub const HEADER_AUTHTOKEN: &str = "AUTHTOKEN";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

const DEFAULT_AUDIT_START: u32 = 1;
const DEFAULT_AUDIT_LIMIT: u32 = 2;
const DEFAULT_AUDIT_DURATION: &str = "TODAY";

/// Parameters of an audit trail query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditQuery {
    /// Audit type, e.g. `resourceaudit` or `useraudit`.
    pub audit_type: String,
    pub start: u32,
    pub limit: u32,
    /// Time window such as `TODAY`, `LAST_7_DAYS`; upper-cased when sent.
    pub duration: String,
}

impl AuditQuery {
    pub fn new(audit_type: impl Into<String>) -> Self {
        Self {
            audit_type: audit_type.into(),
            start: DEFAULT_AUDIT_START,
            limit: DEFAULT_AUDIT_LIMIT,
            duration: DEFAULT_AUDIT_DURATION.to_string(),
        }
    }
}

/// `GET restapi/json/v1/resources`: every resource visible to the token.
pub fn build_list_resources_query(credentials: &Credentials, options: &Options) -> String {
    format!(
        "{}/resources?{}",
        API_BASE_PATH,
        common_params(credentials, options)
    )
}

/// `GET restapi/json/v1/resources/getResourceIdAccountId`: resolve names to IDs.
pub fn build_resolve_ids_query(
    credentials: &Credentials,
    options: &Options,
    resource_name: &str,
    account_name: &str,
) -> String {
    format!(
        "{}/resources/getResourceIdAccountId?{}&RESOURCENAME={}&ACCOUNTNAME={}",
        API_BASE_PATH,
        common_params(credentials, options),
        urlencoding::encode(resource_name),
        urlencoding::encode(account_name)
    )
}

/// `GET restapi/json/v1/resources/getResourceAccountDetails`: fetch the password.
///
/// IDs come from the resolve call and are inserted as-is.
pub fn build_fetch_password_query(
    credentials: &Credentials,
    options: &Options,
    identity: &ResourceIdentity,
) -> String {
    format!(
        "{}/resources/getResourceAccountDetails?{}&RESOURCEID={}&ACCOUNTID={}",
        API_BASE_PATH,
        common_params(credentials, options),
        identity.resource_id,
        identity.account_id
    )
}

/// `GET restapi/json/v1/audit`: audit trail page.
pub fn build_audit_query(
    credentials: &Credentials,
    options: &Options,
    audit: &AuditQuery,
) -> String {
    format!(
        "{}/audit?{}&AUDITTYPE={}&STARTINDEX={}&LIMIT={}&DURATION={}",
        API_BASE_PATH,
        common_params(credentials, options),
        urlencoding::encode(&audit.audit_type),
        audit.start,
        audit.limit,
        urlencoding::encode(&audit.duration.to_uppercase())
    )
}

/// Headers sent with every request. `Content-Type` is advisory only (GETs carry no body).
pub fn request_headers(credentials: &Credentials, options: &Options) -> Vec<(String, String)> {
    let mut headers = vec![(
        HEADER_CONTENT_TYPE.to_string(),
        "application/json".to_string(),
    )];
    if options.auth_style == AuthStyle::Header {
        headers.push((
            HEADER_AUTHTOKEN.to_string(),
            credentials.auth_token().expose_secret().to_string(),
        ));
    }
    headers
}

/// Strip the token from a query path before it goes anywhere near a log line.
pub fn redact(path: &str) -> String {
    let Some((base, query)) = path.split_once('?') else {
        return path.to_string();
    };
    let params: Vec<String> = query
        .split('&')
        .map(|p| match p.split_once('=') {
            Some(("APP_AUTHTOKEN", _)) => "APP_AUTHTOKEN=***".to_string(),
            _ => p.to_string(),
        })
        .collect();
    format!("{}?{}", base, params.join("&"))
}

fn common_params(credentials: &Credentials, options: &Options) -> String {
    let app = format!("APP_NAME={}", urlencoding::encode(&options.app_name));
    match options.auth_style {
        AuthStyle::QueryParam => format!(
            "APP_AUTHTOKEN={}&{}",
            urlencoding::encode(credentials.auth_token().expose_secret()),
            app
        ),
        AuthStyle::Header => app,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("https://pmp.example.com/", "TOKEN-1")
    }

    #[test]
    fn list_resources_path() {
        let q = build_list_resources_query(&creds(), &Options::default());
        assert_eq!(
            q,
            "restapi/json/v1/resources?APP_AUTHTOKEN=TOKEN-1&APP_NAME=ANSIBLE"
        );
    }

    #[test]
    fn resolve_ids_encodes_names() {
        let q = build_resolve_ids_query(&creds(), &Options::default(), "db primary/1", "sa&root");
        assert!(q.starts_with("restapi/json/v1/resources/getResourceIdAccountId?"));
        assert!(q.contains("&RESOURCENAME=db%20primary%2F1"));
        assert!(q.ends_with("&ACCOUNTNAME=sa%26root"));
    }

    #[test]
    fn fetch_password_inserts_ids_verbatim() {
        let id = ResourceIdentity {
            resource_id: "301".to_string(),
            account_id: "1802".to_string(),
        };
        let q = build_fetch_password_query(&creds(), &Options::default(), &id);
        assert_eq!(
            q,
            concat!(
                "restapi/json/v1/resources/getResourceAccountDetails",
                "?APP_AUTHTOKEN=TOKEN-1&APP_NAME=ANSIBLE&RESOURCEID=301&ACCOUNTID=1802"
            )
        );
    }

    #[test]
    fn header_style_moves_token_out_of_query() {
        let opts = Options {
            auth_style: AuthStyle::Header,
            ..Options::default()
        };
        let q = build_list_resources_query(&creds(), &opts);
        assert!(!q.contains("APP_AUTHTOKEN"));
        let headers = request_headers(&creds(), &opts);
        assert!(headers
            .iter()
            .any(|(k, v)| k == "AUTHTOKEN" && v == "TOKEN-1"));
    }

    #[test]
    fn query_style_sends_only_content_type() {
        let headers = request_headers(&creds(), &Options::default());
        assert_eq!(
            headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn audit_defaults_and_uppercase_duration() {
        let mut a = AuditQuery::new("resourceaudit");
        a.duration = "last_7_days".to_string();
        let q = build_audit_query(&creds(), &Options::default(), &a);
        assert!(q.contains("AUDITTYPE=resourceaudit&STARTINDEX=1&LIMIT=2&DURATION=LAST_7_DAYS"));
    }

    #[test]
    fn redact_hides_token() {
        let q = build_list_resources_query(&creds(), &Options::default());
        let r = redact(&q);
        assert!(!r.contains("TOKEN-1"));
        assert!(r.contains("APP_AUTHTOKEN=***"));
        assert!(r.contains("APP_NAME=ANSIBLE"));
    }
}
