use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_SOURCE_SERVICE: &str = "access-admin-service";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSinkKind {
    Noop,
    /// Bounded in-process buffer; nothing reads it outside tests.
    Memory,
    Tracing,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Postgres backing store; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// JSON geography table replacing the built-in one.
    pub geography_path: Option<PathBuf>,
    pub audit_sink: AuditSinkKind,
    pub audit_source_service: String,
    /// Users seeded as SUPER_ADMIN when they have no stored profile yet.
    pub bootstrap_super_admins: Vec<String>,
    pub cors_origins: Vec<String>,
}

impl AdminConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

pub fn load_admin_config() -> Result<AdminConfig> {
    let host = env::var("HOST")
        .unwrap_or_else(|_| "0.0.0.0".to_string())
        .parse::<IpAddr>()
        .context("Failed to parse HOST")?;
    let port = match env::var("PORT").ok().and_then(|v| normalize_optional(&v)) {
        Some(raw) => raw.parse::<u16>().with_context(|| format!("Invalid PORT '{raw}'"))?,
        None => DEFAULT_PORT,
    };
    let database_url = env::var("DATABASE_URL").ok().and_then(|v| normalize_optional(&v));
    let geography_path = env::var("GEOGRAPHY_PATH")
        .ok()
        .and_then(|v| normalize_optional(&v))
        .map(PathBuf::from);
    let audit_sink = resolve_audit_sink(env::var("AUDIT_SINK").ok().as_deref(), database_url.is_some())
        .context("Failed to parse AUDIT_SINK")?;
    let audit_source_service = env::var("AUDIT_SOURCE_SERVICE")
        .ok()
        .and_then(|v| normalize_optional(&v))
        .unwrap_or_else(|| DEFAULT_SOURCE_SERVICE.to_string());
    let bootstrap_super_admins = env::var("ACCESS_BOOTSTRAP_SUPER_ADMINS")
        .map(|v| parse_list(&v))
        .unwrap_or_default();
    let cors_origins = env::var("ACCESS_ADMIN_CORS_ORIGINS")
        .map(|v| parse_list(&v))
        .unwrap_or_else(|_| default_cors_origins());

    Ok(AdminConfig {
        host,
        port,
        database_url,
        geography_path,
        audit_sink,
        audit_source_service,
        bootstrap_super_admins,
        cors_origins,
    })
}

/// Unset or blank picks the durable default: postgres when a database is
/// configured, otherwise the tracing log.
fn resolve_audit_sink(raw: Option<&str>, has_database: bool) -> Result<AuditSinkKind> {
    let kind = match raw.and_then(normalize_optional) {
        Some(value) => parse_audit_sink(&value)?,
        None if has_database => AuditSinkKind::Postgres,
        None => AuditSinkKind::Tracing,
    };
    if kind == AuditSinkKind::Postgres && !has_database {
        return Err(anyhow!("AUDIT_SINK=postgres requires DATABASE_URL"));
    }
    Ok(kind)
}

fn parse_audit_sink(value: &str) -> Result<AuditSinkKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "noop" | "none" => Ok(AuditSinkKind::Noop),
        "memory" => Ok(AuditSinkKind::Memory),
        "tracing" | "log" => Ok(AuditSinkKind::Tracing),
        "postgres" | "pg" => Ok(AuditSinkKind::Postgres),
        other => Err(anyhow!("Unsupported audit sink '{other}'. Use postgres, tracing, memory or noop.")),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()]
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_splits_on_commas_and_spaces() {
        assert_eq!(parse_list("emp-1, emp-2;emp-3  "), vec!["emp-1", "emp-2", "emp-3"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn audit_sink_parses_known_values() {
        assert_eq!(parse_audit_sink("NOOP").unwrap(), AuditSinkKind::Noop);
        assert_eq!(parse_audit_sink("memory").unwrap(), AuditSinkKind::Memory);
        assert_eq!(parse_audit_sink(" Postgres ").unwrap(), AuditSinkKind::Postgres);
        assert_eq!(parse_audit_sink("tracing").unwrap(), AuditSinkKind::Tracing);
        assert!(parse_audit_sink("kafka").is_err());
    }

    #[test]
    fn audit_sink_defaults_to_a_durable_sink() {
        assert_eq!(resolve_audit_sink(None, true).unwrap(), AuditSinkKind::Postgres);
        assert_eq!(resolve_audit_sink(None, false).unwrap(), AuditSinkKind::Tracing);
        assert_eq!(resolve_audit_sink(Some("  "), false).unwrap(), AuditSinkKind::Tracing);
        assert_eq!(resolve_audit_sink(Some("memory"), true).unwrap(), AuditSinkKind::Memory);
    }

    #[test]
    fn postgres_audit_sink_needs_a_database() {
        assert!(resolve_audit_sink(Some("postgres"), false).is_err());
        assert_eq!(resolve_audit_sink(Some("postgres"), true).unwrap(), AuditSinkKind::Postgres);
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        assert_eq!(normalize_optional("   "), None);
        assert_eq!(normalize_optional(" postgres://x "), Some("postgres://x".to_string()));
    }
}
