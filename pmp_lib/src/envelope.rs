//! PMP response envelope and the extractors built on it.
//!
//! Every API answer is wrapped as
//! `{"operation": {"name": .., "result": {"status": .., "message": ..}, "totalRows": .., "Details": ..}}`.
//! `Details` is populated on success, `result.message` explains a failure.
//! Upstream inconsistencies (`Details` vs `details`, `ACCOUNTDETAILS` as an encoded
//! string vs an inline object, numeric vs string IDs) are normalized here and nowhere else.

use crate::error::Error;
use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Map, Value};

const NO_MESSAGE: &str = "PMP returned no details and no message";

/// `operation.result` of an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResult {
    pub status: Option<String>,
    pub message: Option<String>,
}

/// Parsed `operation` object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseEnvelope {
    pub name: Option<String>,
    pub result: Option<OperationResult>,
    pub total_rows: Option<u64>,
    /// `Details` payload; `None` when absent or `null`.
    pub details: Option<Value>,
}

/// Resource and account IDs resolved from a name pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIdentity {
    pub resource_id: String,
    pub account_id: String,
}

/// One entry of the resource listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub resource_type: Option<String>,
    pub account_count: Option<u64>,
}

/// Decoded `ACCOUNTDETAILS` object.
#[derive(Debug)]
pub struct AccountDetails {
    pub password: Option<SecretString>,
    /// Why no password was returned (access denied, approval pending, ...).
    pub password_reason: Option<String>,
    /// Remaining fields, passwords excluded.
    pub extra: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Service-provided failure message, or a fixed fallback.
    pub fn message(&self) -> String {
        self.result
            .as_ref()
            .and_then(|r| r.message.clone())
            .unwrap_or_else(|| NO_MESSAGE.to_string())
    }

    /// `Details` when meaningfully populated (empty objects and arrays count as absent).
    pub fn present_details(&self) -> Option<&Value> {
        self.details.as_ref().filter(|d| match d {
            Value::Object(m) => !m.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Null => false,
            _ => true,
        })
    }

    /// Canonical JSON form (`Details` spelling, `totalRows`).
    pub fn to_json(&self) -> Value {
        let mut op = Map::new();
        if let Some(ref name) = self.name {
            op.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(ref r) = self.result {
            let mut res = Map::new();
            if let Some(ref s) = r.status {
                res.insert("status".to_string(), Value::String(s.clone()));
            }
            if let Some(ref m) = r.message {
                res.insert("message".to_string(), Value::String(m.clone()));
            }
            op.insert("result".to_string(), Value::Object(res));
        }
        if let Some(n) = self.total_rows {
            op.insert("totalRows".to_string(), Value::from(n));
        }
        if let Some(ref d) = self.details {
            op.insert("Details".to_string(), d.clone());
        }
        let mut root = Map::new();
        root.insert("operation".to_string(), Value::Object(op));
        Value::Object(root)
    }
}

/// Decode a raw response body (bytes or text) into an envelope.
///
/// Invalid UTF-8, invalid JSON, or a missing `operation` object are all malformed.
pub fn parse_envelope(raw: impl AsRef<[u8]>) -> Result<ResponseEnvelope, Error> {
    let text = std::str::from_utf8(raw.as_ref())
        .map_err(|e| Error::MalformedResponse(format!("response is not UTF-8: {}", e)))?;
    let message: Value = serde_json::from_str(text)
        .map_err(|e| Error::MalformedResponse(format!("response is not JSON: {}", e)))?;
    let operation = message
        .get("operation")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            Error::MalformedResponse("response has no `operation` object".to_string())
        })?;

    let result = operation
        .get("result")
        .and_then(Value::as_object)
        .map(|r| OperationResult {
            status: r.get("status").and_then(scalar_string),
            message: r.get("message").and_then(scalar_string),
        });
    let total_rows = operation.get("totalRows").and_then(scalar_u64);
    let details = operation
        .get("Details")
        .or_else(|| operation.get("details"))
        .filter(|d| !d.is_null())
        .cloned();

    Ok(ResponseEnvelope {
        name: operation.get("name").and_then(scalar_string),
        result,
        total_rows,
        details,
    })
}

/// IDs from a `getResourceIdAccountId` answer.
///
/// `resource_hint` only labels diagnostics; the error carries the service message verbatim.
pub fn resolve_identity(
    envelope: &ResponseEnvelope,
    resource_hint: &str,
) -> Result<ResourceIdentity, Error> {
    let details = envelope.present_details().ok_or_else(|| {
        tracing::debug!(resource = resource_hint, "resource id lookup returned no details");
        Error::ResourceNotFound(envelope.message())
    })?;
    Ok(ResourceIdentity {
        resource_id: id_field(details, "RESOURCEID")?,
        account_id: id_field(details, "ACCOUNTID")?,
    })
}

/// Password from a `getResourceAccountDetails` answer.
///
/// A `PASSWORD_REASON` wins over any `PASSWORD` that comes with it.
pub fn extract_password(envelope: &ResponseEnvelope) -> Result<SecretString, Error> {
    let details = envelope
        .present_details()
        .ok_or_else(|| Error::ResourceNotFound(envelope.message()))?;
    let account = AccountDetails::from_details(details)?;
    if let Some(reason) = account.password_reason {
        return Err(Error::PasswordUnavailable(reason));
    }
    account
        .password
        .ok_or_else(|| Error::MalformedResponse("ACCOUNTDETAILS has no PASSWORD".to_string()))
}

/// Entries of a `resources` listing, in service order.
pub fn resource_list(envelope: &ResponseEnvelope) -> Result<Vec<ResourceSummary>, Error> {
    let Some(details) = envelope.present_details() else {
        // An empty listing is a valid answer; only a missing one with a message is a failure.
        return match envelope.result.as_ref().and_then(|r| r.message.clone()) {
            Some(m) if envelope.details.is_none() => Err(Error::ResourceNotFound(m)),
            _ => Ok(Vec::new()),
        };
    };
    let items = details.as_array().ok_or_else(|| {
        Error::MalformedResponse("resource listing `Details` is not an array".to_string())
    })?;
    items.iter().map(resource_summary).collect()
}

impl AccountDetails {
    /// Decode `ACCOUNTDETAILS` from a `Details` object.
    pub fn from_details(details: &Value) -> Result<Self, Error> {
        let mut map = match details.get("ACCOUNTDETAILS") {
            Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
                Ok(Value::Object(m)) => m,
                Ok(_) => {
                    return Err(Error::MalformedResponse(
                        "ACCOUNTDETAILS is not a JSON object".to_string(),
                    ))
                }
                Err(e) => {
                    return Err(Error::MalformedResponse(format!(
                        "ACCOUNTDETAILS is not valid JSON: {}",
                        e
                    )))
                }
            },
            Some(Value::Object(m)) => m.clone(),
            Some(_) => {
                return Err(Error::MalformedResponse(
                    "ACCOUNTDETAILS is neither an object nor an encoded object".to_string(),
                ))
            }
            None => {
                return Err(Error::MalformedResponse(
                    "Details has no ACCOUNTDETAILS".to_string(),
                ))
            }
        };
        let password_reason = map.remove("PASSWORD_REASON").map(|v| {
            scalar_string(&v).unwrap_or_else(|| "password is not available".to_string())
        });
        let password = map
            .remove("PASSWORD")
            .and_then(|v| scalar_string(&v))
            .map(SecretString::from);
        Ok(Self {
            password,
            password_reason,
            extra: map,
        })
    }
}

fn resource_summary(item: &Value) -> Result<ResourceSummary, Error> {
    let name = item
        .get("RESOURCE NAME")
        .and_then(scalar_string)
        .ok_or_else(|| {
            Error::MalformedResponse("resource entry has no `RESOURCE NAME`".to_string())
        })?;
    Ok(ResourceSummary {
        id: item.get("RESOURCE ID").and_then(scalar_string),
        name,
        description: item.get("RESOURCE DESCRIPTION").and_then(scalar_string),
        resource_type: item.get("RESOURCE TYPE").and_then(scalar_string),
        account_count: item.get("NOOFACCOUNTS").and_then(scalar_u64),
    })
}

fn id_field(details: &Value, key: &str) -> Result<String, Error> {
    details
        .get(key)
        .and_then(scalar_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::MalformedResponse(format!("Details has no {}", key)))
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
