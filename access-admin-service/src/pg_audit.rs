use async_trait::async_trait;
use common_audit::{AuditError, AuditEvent, AuditResult, AuditSink};
use sqlx::PgPool;

/// Appends audit events to `access_audit_events`. The table comes from the
/// same migration set as the profile store.
#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn publish(&self, event: &AuditEvent) -> AuditResult<()> {
        sqlx::query(
            r#"INSERT INTO access_audit_events (
                event_id, event_version, actor_id, actor_name, actor_email,
                entity_type, entity_id, action, severity, source_service,
                occurred_at, trace_id, payload
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            ON CONFLICT (event_id) DO NOTHING"#,
        )
        .bind(event.event_id)
        .bind(event.event_version)
        .bind(event.actor.id.as_deref())
        .bind(event.actor.name.as_deref())
        .bind(event.actor.email.as_deref())
        .bind(&event.entity_type)
        .bind(event.entity_id.as_deref())
        .bind(&event.action)
        .bind(event.severity.as_str())
        .bind(&event.source_service)
        .bind(event.occurred_at)
        .bind(event.trace_id)
        .bind(&event.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::Sink(e.to_string()))?;
        Ok(())
    }
}
