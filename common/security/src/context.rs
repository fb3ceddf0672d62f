use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use common_access::Operator;
use common_audit::{extract_actor_from_headers, AuditActor};
use common_http_errors::ApiError;
use serde::Serialize;
use tracing::Span;
use uuid::Uuid;

/// Identity of the caller of an administrative route.
///
/// Only the user ID is trusted for authorization; the caller's own stored
/// profile is what the guards evaluate.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorContext {
    pub user_id: String,
    pub actor: AuditActor,
    pub trace_id: Option<Uuid>,
}

impl OperatorContext {
    pub fn operator(&self) -> Operator {
        Operator::new(self.actor.clone(), self.trace_id)
    }
}

pub struct OperatorCtxExtractor(pub OperatorContext);

fn user_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-User-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn trace_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get("X-Trace-ID")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for OperatorCtxExtractor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let trace_id = trace_id_from_headers(headers).or_else(|| Some(Uuid::new_v4()));
        let user_id = user_id_from_headers(headers).ok_or(ApiError::BadRequest {
            code: "missing_user_id",
            trace_id,
            message: Some("Missing X-User-ID header".into()),
        })?;
        let actor = extract_actor_from_headers(headers, Some(user_id.clone()));

        Span::current().record("operator", tracing::field::display(&user_id));
        if let Some(tid) = trace_id.as_ref() {
            Span::current().record("trace_id", tracing::field::display(tid));
        }

        Ok(OperatorCtxExtractor(OperatorContext { user_id, actor, trace_id }))
    }
}
