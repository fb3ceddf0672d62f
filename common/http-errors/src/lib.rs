use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub missing_permission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub trace_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")] pub message: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    ForbiddenMissingPermission { permission: String, trace_id: Option<Uuid> },
    Forbidden { trace_id: Option<Uuid>, message: Option<String> },
    BadRequest { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    NotFound { code: &'static str, trace_id: Option<Uuid> },
    Conflict { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    /// Stored data exists but cannot be turned into a valid record.
    InvalidProfile { trace_id: Option<Uuid>, message: String },
    Internal { trace_id: Option<Uuid>, message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E, trace_id: Option<Uuid>) -> Self { Self::Internal { trace_id, message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str, trace_id: Option<Uuid>) -> Self { Self::BadRequest { code, trace_id, message: None } }

    pub fn code(&self) -> &str {
        match self {
            ApiError::ForbiddenMissingPermission { .. } => "missing_permission",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::BadRequest { code, .. } | ApiError::NotFound { code, .. } | ApiError::Conflict { code, .. } => *code,
            ApiError::InvalidProfile { .. } => "invalid_profile",
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_code = self.code().to_string();
        let body = |missing_permission, trace_id, message| ErrorBody { code: error_code.clone(), missing_permission, trace_id, message };
        let (status, body) = match self {
            ApiError::ForbiddenMissingPermission { permission, trace_id } => (StatusCode::FORBIDDEN, body(Some(permission), trace_id, None)),
            ApiError::Forbidden { trace_id, message } => (StatusCode::FORBIDDEN, body(None, trace_id, message)),
            ApiError::BadRequest { trace_id, message, .. } => (StatusCode::BAD_REQUEST, body(None, trace_id, message)),
            ApiError::NotFound { trace_id, .. } => (StatusCode::NOT_FOUND, body(None, trace_id, None)),
            ApiError::Conflict { trace_id, message, .. } => (StatusCode::CONFLICT, body(None, trace_id, message)),
            ApiError::InvalidProfile { trace_id, message } => (StatusCode::UNPROCESSABLE_ENTITY, body(None, trace_id, Some(message))),
            ApiError::Internal { trace_id, message } => (StatusCode::INTERNAL_SERVER_ERROR, body(None, trace_id, message)),
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(&error_code) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// Distinct error codes allowed as metric labels before folding into "overflow".
const MAX_ERROR_CODES: usize = 40;
const OVERFLOW_LABEL: &str = "overflow";

static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
        &["service", "code", "status"],
    )
    .unwrap();
    let _ = prometheus::default_registry().register(Box::new(c.clone()));
    c
});

static HTTP_ERROR_CODES_DISTINCT: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new("http_error_codes_distinct", "Distinct error codes seen as metric labels").unwrap();
    let _ = prometheus::default_registry().register(Box::new(g.clone()));
    g
});

static HTTP_ERROR_CODE_OVERFLOW: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("http_error_code_overflow_total", "Error responses whose code was folded into the overflow label").unwrap();
    let _ = prometheus::default_registry().register(Box::new(c.clone()));
    c
});

static SEEN_CODES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn label_for(code: &str) -> String {
    let mut seen = match SEEN_CODES.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if seen.contains(code) {
        return code.to_string();
    }
    if seen.len() >= MAX_ERROR_CODES {
        HTTP_ERROR_CODE_OVERFLOW.inc();
        return OVERFLOW_LABEL.to_string();
    }
    seen.insert(code.to_string());
    HTTP_ERROR_CODES_DISTINCT.set(seen.len() as i64);
    code.to_string()
}

pub fn record_http_error(service: &str, resp: &Response) {
    let status = resp.status();
    if status.as_u16() < 400 {
        return;
    }
    let code = resp
        .headers()
        .get("X-Error-Code")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let label = label_for(code);
    HTTP_ERRORS_TOTAL.with_label_values(&[service, label.as_str(), status.as_str()]).inc();
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Middleware counting error responses per service, for `axum::middleware::from_fn`.
pub fn http_error_metrics_layer(
    service: &'static str,
) -> impl Fn(Request<Body>, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
    move |req, next| {
        Box::pin(async move {
            let resp = next.run(req).await;
            record_http_error(service, &resp);
            resp
        })
    }
}

#[cfg(feature = "test-helpers")]
pub mod test_helpers {
    pub fn simulate_error_code(code: &str) -> String {
        super::label_for(code)
    }

    pub fn distinct_gauge() -> i64 {
        super::HTTP_ERROR_CODES_DISTINCT.get()
    }

    pub fn overflow_count() -> u64 {
        super::HTTP_ERROR_CODE_OVERFLOW.get()
    }
}
