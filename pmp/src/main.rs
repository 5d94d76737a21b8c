//! Password Manager Pro CLI: passwords, resources and audit events from the terminal.

mod output;

use clap::{Parser, Subcommand, ValueEnum};
use pmp_lib::{
    load_credentials, AuditQuery, AuthStyle, LookupMode, LookupRequest, Method, Options, Resolver,
};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pmp")]
#[command(
    about = "Password Manager Pro CLI: passwords, resources and audit events",
    long_about = None
)]
#[command(
    after_help = "Requires PMP_URL and PMP_AUTHTOKEN. Optional: PMP_APP_NAME, PMP_AUTH_STYLE, PMP_VALIDATE_CERTS, PMP_TIMEOUT_SECS, PMP_LOG."
)]
struct Cli {
    /// Output format: plain (human-readable), json (structured).
    #[arg(short, long, env = "PMP_OUTPUT", default_value = "plain", value_enum)]
    output: OutputFormatArg,

    /// Skip TLS certificate verification (overrides PMP_VALIDATE_CERTS).
    #[arg(long)]
    insecure: bool,

    /// How the API token is sent (overrides PMP_AUTH_STYLE).
    #[arg(long, value_enum)]
    auth_style: Option<AuthStyleArg>,

    /// Request timeout in seconds (overrides PMP_TIMEOUT_SECS).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// More log output on stderr (-v info, -vv debug). PMP_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Plain,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum AuthStyleArg {
    Query,
    Header,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a password: MODE is `exact` or `regex`
    Lookup {
        mode: String,
        resource: String,
        account: String,
    },
    /// Print the password of an account
    Password {
        resource: String,
        account: String,
        /// Treat RESOURCE as a pattern matched from the start of each resource name
        #[arg(long)]
        regex: bool,
    },
    /// Show the resource and account IDs
    Resolve {
        resource: String,
        account: String,
        /// Treat RESOURCE as a pattern matched from the start of each resource name
        #[arg(long)]
        regex: bool,
    },
    /// List resources
    Resources {
        /// Only resources whose name matches this pattern from the start
        #[arg(long)]
        filter: Option<String>,
    },
    /// Get audit events
    Audit {
        /// Audit type, e.g. resourceaudit or useraudit
        #[arg(long = "type")]
        audit_type: String,
        #[arg(long, default_value = "1")]
        start: u32,
        #[arg(long, default_value = "2")]
        limit: u32,
        /// TODAY, YESTERDAY, LAST_7_DAYS, LAST_30_DAYS ...
        #[arg(long, default_value = "TODAY")]
        duration: String,
    },
    /// Send a raw API request (token sent in the AUTHTOKEN header)
    Request {
        /// HTTP method (GET, POST, PUT, DELETE)
        method: String,
        /// API path, e.g. restapi/json/v1/resources
        path: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("pmp {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    init_logging(cli.verbose);

    let resolver = match build_resolver(&cli) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let format = match cli.output {
        OutputFormatArg::Plain => output::OutputFormat::Plain,
        OutputFormatArg::Json => output::OutputFormat::Json,
    };

    match run(&resolver, cli.command, format).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("PMP_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Environment first, then command-line overrides.
fn build_resolver(cli: &Cli) -> Result<Resolver, pmp_lib::Error> {
    let credentials = load_credentials()?;
    let options = apply_overrides(cli, Options::from_env()?);
    tracing::debug!(
        base_url = credentials.base_url(),
        auth_style = ?options.auth_style,
        validate_certs = options.validate_certs,
        "resolver configured"
    );
    Resolver::connect(credentials, options)
}

async fn run(
    resolver: &Resolver,
    cmd: Commands,
    format: output::OutputFormat,
) -> Result<(), String> {
    let print_value = |v: &Value| -> Result<(), String> {
        println!("{}", output::render(v, format).map_err(|e| e.to_string())?);
        Ok(())
    };

    match cmd {
        Commands::Lookup {
            mode,
            resource,
            account,
        } => {
            let list = resolver
                .lookup_terms(&mode, &resource, &account)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&json!(list))?;
        }
        Commands::Password {
            resource,
            account,
            regex,
        } => {
            let request = LookupRequest::new(lookup_mode(regex), resource, account);
            let password = resolver.lookup(&request).await.map_err(|e| e.to_string())?;
            print_value(&Value::String(password.expose_secret().to_string()))?;
        }
        Commands::Resolve {
            resource,
            account,
            regex,
        } => {
            let identity = match lookup_mode(regex) {
                LookupMode::Exact => resolver.resolve_ids(&resource, &account).await,
                LookupMode::Regex => resolver.search_resource_ids(&resource, &account).await,
            }
            .map_err(|e| e.to_string())?;
            print_value(&serde_json::to_value(&identity).map_err(|e| e.to_string())?)?;
        }
        Commands::Resources { filter } => {
            let list = match filter {
                Some(pattern) => resolver.find_resources(&pattern).await,
                None => resolver.list_resources().await,
            }
            .map_err(|e| e.to_string())?;
            print_value(&serde_json::to_value(&list).map_err(|e| e.to_string())?)?;
        }
        Commands::Audit {
            audit_type,
            start,
            limit,
            duration,
        } => {
            let query = AuditQuery {
                audit_type,
                start,
                limit,
                duration,
            };
            let envelope = resolver.audit(&query).await.map_err(|e| e.to_string())?;
            match envelope.present_details() {
                Some(details) => print_value(details)?,
                None => print_value(&envelope.to_json())?,
            }
        }
        Commands::Request { method, path, data } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|e| format!("invalid method {}: {}", method, e))?;
            let body: Option<Value> = data
                .as_deref()
                .map(serde_json::from_str::<Value>)
                .transpose()
                .map_err(|e| format!("--data is not valid JSON: {}", e))?;
            let (status, data) = resolver
                .raw(method, &path, body.as_ref())
                .await
                .map_err(|e| e.to_string())?;
            print_value(&data)?;
            if !(200..300).contains(&status) {
                return Err(format!("request failed with HTTP {}", status));
            }
        }
        Commands::Version => {}
    }
    Ok(())
}

fn apply_overrides(cli: &Cli, mut options: Options) -> Options {
    if cli.insecure {
        options.validate_certs = false;
    }
    if let Some(style) = cli.auth_style {
        options.auth_style = match style {
            AuthStyleArg::Query => AuthStyle::QueryParam,
            AuthStyleArg::Header => AuthStyle::Header,
        };
    }
    if let Some(secs) = cli.timeout {
        options.timeout = Duration::from_secs(secs);
    }
    options
}

fn lookup_mode(regex: bool) -> LookupMode {
    if regex {
        LookupMode::Regex
    } else {
        LookupMode::Exact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_lookup_terms() {
        let cli = Cli::try_parse_from(["pmp", "lookup", "regex", "db-.*", "root"]).unwrap();
        match cli.command {
            Commands::Lookup {
                mode,
                resource,
                account,
            } => {
                assert_eq!(mode, "regex");
                assert_eq!(resource, "db-.*");
                assert_eq!(account, "root");
            }
            _ => panic!("expected lookup"),
        }
    }

    #[test]
    fn parses_global_overrides() {
        let cli = Cli::try_parse_from([
            "pmp",
            "--insecure",
            "--auth-style",
            "header",
            "--timeout",
            "5",
            "-vv",
            "resources",
            "--filter",
            "db-",
        ])
        .unwrap();
        assert!(cli.insecure);
        assert!(matches!(cli.auth_style, Some(AuthStyleArg::Header)));
        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Resources { filter: Some(ref f) } if f == "db-"));
    }

    #[test]
    fn flags_override_environment_options() {
        let cli = Cli::try_parse_from([
            "pmp",
            "--insecure",
            "--auth-style",
            "header",
            "--timeout",
            "5",
            "version",
        ])
        .unwrap();
        let options = apply_overrides(&cli, Options::default());
        assert!(!options.validate_certs);
        assert_eq!(options.auth_style, AuthStyle::Header);
        assert_eq!(options.timeout, Duration::from_secs(5));
    }

    #[test]
    fn no_flags_keep_environment_options() {
        let cli = Cli::try_parse_from(["pmp", "version"]).unwrap();
        let env = Options {
            auth_style: AuthStyle::Header,
            ..Options::default()
        };
        assert_eq!(apply_overrides(&cli, env.clone()), env);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["pmp", "--timeout", "0", "version"]).is_err());
    }

    #[test]
    fn audit_defaults() {
        let cli = Cli::try_parse_from(["pmp", "audit", "--type", "resourceaudit"]).unwrap();
        match cli.command {
            Commands::Audit {
                audit_type,
                start,
                limit,
                duration,
            } => {
                assert_eq!(audit_type, "resourceaudit");
                assert_eq!((start, limit), (1, 2));
                assert_eq!(duration, "TODAY");
            }
            _ => panic!("expected audit"),
        }
    }

    #[test]
    fn regex_flag_selects_mode() {
        assert_eq!(lookup_mode(true), LookupMode::Regex);
        assert_eq!(lookup_mode(false), LookupMode::Exact);
    }
}
