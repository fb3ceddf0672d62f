use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use common_access::{
    AdminError, GeographyTable, InMemoryProfileStore, Operator, ProfileAdmin, RoleName, RoleSelection,
};
use common_audit::{AuditActor, AuditProducer};
use common_http_errors::http_error_metrics_layer;
use common_observability::AccessMetrics;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::handlers;

pub const SERVICE_NAME: &str = "access-admin-service";
const BOOTSTRAP_OPERATOR: &str = "system:bootstrap";

#[derive(Clone)]
pub struct AppState {
    pub admin: ProfileAdmin,
    pub metrics: Arc<AccessMetrics>,
}

impl AppState {
    pub fn new(admin: ProfileAdmin, metrics: Arc<AccessMetrics>) -> Self {
        Self { admin, metrics }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(geography: Arc<GeographyTable>, audit: AuditProducer) -> Self {
        let store = Arc::new(InMemoryProfileStore::new(geography.clone()));
        Self::new(ProfileAdmin::new(store, geography, audit), Arc::new(AccessMetrics::new()))
    }

    pub fn geography(&self) -> &GeographyTable {
        self.admin.geography()
    }
}

async fn health() -> &'static str {
    "ok"
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, ?err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-user-name"),
            HeaderName::from_static("x-user-email"),
            HeaderName::from_static("x-trace-id"),
        ]);

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(handlers::metrics))
        .route("/roles", get(handlers::list_roles))
        .route("/geography", get(handlers::geography))
        .route("/profiles/:user_id", get(handlers::get_profile))
        .route("/profiles/:user_id/provision", post(handlers::provision))
        .route("/profiles/:user_id/role", put(handlers::assign_role))
        .route("/profiles/:user_id/switch", post(handlers::switch_role))
        .route("/profiles/:user_id/restore", post(handlers::restore_profile))
        .route("/profiles/:user_id/check", post(handlers::check_access))
        .with_state(state)
        .layer(middleware::from_fn(http_error_metrics_layer(SERVICE_NAME)))
        .layer(cors)
}

/// Give each listed user a SUPER_ADMIN profile unless they already have one.
///
/// Returns the users that were seeded.
pub async fn bootstrap_super_admins(state: &AppState, user_ids: &[String]) -> Result<Vec<String>, AdminError> {
    let operator = Operator::new(AuditActor::user(BOOTSTRAP_OPERATOR), None);
    let selection = RoleSelection::new(RoleName::SuperAdmin);
    let mut seeded = Vec::new();
    for user_id in user_ids {
        if state.admin.store().get_profile(user_id).await?.is_some() {
            continue;
        }
        state.admin.provision(&operator, user_id).await?;
        let change = state.admin.assign_role(&operator, user_id, &selection).await?;
        state.metrics.record_mutation(common_access::admin::ACTION_ROLE_ASSIGNED, change.audited);
        info!(%user_id, "bootstrap super admin seeded");
        seeded.push(user_id.clone());
    }
    Ok(seeded)
}
