//! Password Manager Pro credential resolver.
//!
//! Reads the server address and API token from the environment, builds REST queries
//! against `restapi/json/v1`, and turns the JSON envelopes PMP answers with into a
//! password or a typed error. Lookups are either by exact resource name or by a
//! pattern matched against the start of each resource name.

pub mod config;
pub mod envelope;
pub mod error;
pub mod query;
pub mod resolver;
pub mod transport;

pub use config::{load_credentials, load_credentials_from, AuthStyle, Credentials, Options};
pub use envelope::{
    extract_password, parse_envelope, resolve_identity, AccountDetails, ResourceIdentity,
    ResourceSummary, ResponseEnvelope,
};
pub use error::{Error, TransportError};
pub use query::AuditQuery;
pub use resolver::{LookupMode, LookupRequest, Resolver};
pub use transport::{HttpTransport, Method, Request, Response, Transport};

/// Library version for User-Agent and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
