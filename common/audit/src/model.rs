use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AuditActor {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AuditActor {
    pub fn user(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), name: None, email: None }
    }
}

pub const AUDIT_EVENT_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    #[default]
    Info,
    Warning,
    Security,
    Compliance,
}

impl AuditSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditSeverity::Info => "info",
            AuditSeverity::Warning => "warning",
            AuditSeverity::Security => "security",
            AuditSeverity::Compliance => "compliance",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub event_version: i32,
    pub actor: AuditActor,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub action: String,
    pub occurred_at: DateTime<Utc>,
    pub source_service: String,
    pub severity: AuditSeverity,
    pub trace_id: Option<Uuid>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink not configured")]
    NotConfigured,
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("audit sink error: {0}")]
    Sink(String),
}

pub type AuditResult<T> = Result<T, AuditError>;
