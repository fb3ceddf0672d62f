use crate::{AuditActor, AuditError, AuditEvent, AuditResult, AuditSeverity, AUDIT_EVENT_VERSION};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn publish(&self, event: &AuditEvent) -> AuditResult<()>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn publish(&self, _event: &AuditEvent) -> AuditResult<()> {
        Ok(())
    }
}

/// Writes each event as one structured `info!` record on the `audit` target,
/// leaving retention to whatever collects the process logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn publish(&self, event: &AuditEvent) -> AuditResult<()> {
        let payload = serde_json::to_string(&event.payload).map_err(|e| AuditError::Serialization(e.to_string()))?;
        info!(
            target: "audit",
            event_id = %event.event_id,
            event_version = event.event_version,
            action = %event.action,
            entity_type = %event.entity_type,
            entity_id = event.entity_id.as_deref().unwrap_or(""),
            actor_id = event.actor.id.as_deref().unwrap_or(""),
            actor_name = event.actor.name.as_deref().unwrap_or(""),
            severity = event.severity.as_str(),
            source_service = %event.source_service,
            occurred_at = %event.occurred_at.to_rfc3339(),
            trace_id = ?event.trace_id,
            %payload,
            "audit event"
        );
        Ok(())
    }
}

/// Bounded in-memory sink; the oldest event is dropped once capacity is reached.
#[derive(Clone)]
pub struct BufferedAuditSink {
    capacity: usize,
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    dropped: Arc<AtomicU64>,
}

impl BufferedAuditSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Arc::new(Mutex::new(VecDeque::new())),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.iter().cloned().collect()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for BufferedAuditSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl AuditSink for BufferedAuditSink {
    async fn publish(&self, event: &AuditEvent) -> AuditResult<()> {
        let mut events = self.events.lock().await;
        if events.len() >= self.capacity {
            events.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        events.push_back(event.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct AuditProducer {
    sink: Arc<dyn AuditSink>,
    source_service: String,
}

impl AuditProducer {
    pub fn new(sink: impl AuditSink + 'static) -> Self {
        Self { sink: Arc::new(sink), source_service: "unknown".to_string() }
    }

    pub fn with_source_service(mut self, source_service: impl Into<String>) -> Self {
        self.source_service = source_service.into();
        self
    }

    pub fn source_service(&self) -> &str {
        &self.source_service
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn emit(
        &self,
        actor: AuditActor,
        entity_type: impl Into<String>,
        entity_id: Option<String>,
        action: impl Into<String>,
        severity: AuditSeverity,
        trace_id: Option<Uuid>,
        payload: serde_json::Value,
    ) -> AuditResult<AuditEvent> {
        let event = AuditEvent {
            event_id: Uuid::new_v4(),
            event_version: AUDIT_EVENT_VERSION,
            actor,
            entity_type: entity_type.into(),
            entity_id,
            action: action.into(),
            occurred_at: Utc::now(),
            source_service: self.source_service.clone(),
            severity,
            trace_id,
            payload,
        };
        self.sink.publish(&event).await?;
        Ok(event)
    }

    pub fn dummy() -> Self {
        Self::new(NoopAuditSink)
    }
}

pub fn extract_actor_from_headers(headers: &axum::http::HeaderMap, subject: Option<String>) -> AuditActor {
    use axum::http::HeaderMap;
    fn header_str(map: &HeaderMap, name: &str) -> Option<String> {
        map.get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
    let mut actor = AuditActor { id: subject, name: None, email: None };
    if let Some(v) = header_str(headers, "X-User-ID") {
        actor.id = Some(v);
    }
    actor.name = header_str(headers, "X-User-Name");
    actor.email = header_str(headers, "X-User-Email");
    actor
}
