use std::collections::BTreeMap;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::Json;
use common_access::admin::{ACTION_PROVISIONED, ACTION_RESTORED, ACTION_ROLE_ASSIGNED, ACTION_ROLE_SWITCHED};
use common_access::{
    can_access_branch, can_access_province, has_permission, in_department, AccessProfile, AdminError,
    Department, GeographyTable, ProfileChange, RoleName, RoleSelection, RoleSpec, RoleTable, StoreError,
    PERM_ROLE_SWITCH, PERM_USER_MANAGE,
};
use common_http_errors::{ApiError, ApiResult};
use common_security::{
    ensure_branch, ensure_can_grant, ensure_permission, ensure_province, GuardKind, OperatorContext,
    OperatorCtxExtractor, SecurityError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: String,
    pub profile: AccessProfile,
    /// Role the user is temporarily switched to, when a snapshot is pending restore.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switched_to: Option<RoleName>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResponse {
    pub user_id: String,
    pub profile: AccessProfile,
    pub changed: bool,
    pub audited: bool,
    pub snapshot_captured: bool,
}

impl ChangeResponse {
    fn new(user_id: String, change: ProfileChange) -> Self {
        Self {
            user_id,
            profile: change.profile,
            changed: change.changed,
            audited: change.audited,
            snapshot_captured: change.snapshot_captured,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default)]
    pub province_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub department: Option<Department>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub checks: BTreeMap<&'static str, bool>,
}

fn admin_error(state: &AppState, err: AdminError, trace_id: Option<Uuid>) -> ApiError {
    match err {
        AdminError::UserNotFound(_) => ApiError::NotFound { code: "profile_not_found", trace_id },
        AdminError::NoSnapshot(user_id) => ApiError::Conflict {
            code: "no_snapshot",
            trace_id,
            message: Some(format!("no captured profile to restore for '{user_id}'")),
        },
        AdminError::Store(err) => store_error(state, err, trace_id),
    }
}

fn store_error(state: &AppState, err: StoreError, trace_id: Option<Uuid>) -> ApiError {
    match err {
        StoreError::InvalidProfile { user_id, source } => {
            state.metrics.profile_rejections_total.inc();
            warn!(%user_id, error = %source, ?trace_id, "stored access profile rejected");
            ApiError::InvalidProfile { trace_id, message: format!("profile for '{user_id}': {source}") }
        }
        StoreError::Backend(message) => ApiError::internal(message, trace_id),
    }
}

fn guard(state: &AppState, ctx: &OperatorContext, kind: GuardKind, result: Result<(), SecurityError>) -> ApiResult<()> {
    state.metrics.record_guard(kind.as_str(), result.is_ok());
    result.map_err(|e| e.into_api_error(ctx.trace_id))
}

/// The operator's own stored profile; every gated route evaluates guards against it.
async fn operator_profile(state: &AppState, ctx: &OperatorContext) -> ApiResult<AccessProfile> {
    state
        .admin
        .store()
        .get_profile(&ctx.user_id)
        .await
        .map_err(|e| store_error(state, e, ctx.trace_id))?
        .ok_or_else(|| {
            warn!(operator = %ctx.user_id, "operator has no access profile");
            ApiError::Forbidden { trace_id: ctx.trace_id, message: Some("operator has no access profile".into()) }
        })
}

async fn authorize(state: &AppState, ctx: &OperatorContext, permission: &str) -> ApiResult<AccessProfile> {
    let profile = operator_profile(state, ctx).await?;
    guard(state, ctx, GuardKind::Permission, ensure_permission(&profile, permission))?;
    Ok(profile)
}

/// Role handed out by assign/switch must not exceed the operator, and named
/// locations must lie inside the operator's own scope.
fn authorize_selection(
    state: &AppState,
    ctx: &OperatorContext,
    operator: &AccessProfile,
    selection: &RoleSelection,
) -> ApiResult<()> {
    let missing = selection.missing_selectors();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest {
            code: "missing_selectors",
            trace_id: ctx.trace_id,
            message: Some(format!("{} requires {}", selection.role, missing.join(", "))),
        });
    }
    let target = selection.role.spec().authority;
    guard(state, ctx, GuardKind::Grant, ensure_can_grant(operator, target))?;
    if let Some(province_id) = selection.province_id.as_deref() {
        guard(state, ctx, GuardKind::Province, ensure_province(operator, province_id))?;
    }
    if let Some(branch_id) = selection.branch_id.as_deref() {
        guard(state, ctx, GuardKind::Branch, ensure_branch(operator, branch_id))?;
    }
    Ok(())
}

/// The user an operator acts on must sit below the operator and inside the
/// operator's scope. A pending profile names no location and passes the scope checks.
fn authorize_target(
    state: &AppState,
    ctx: &OperatorContext,
    operator: &AccessProfile,
    target: &AccessProfile,
) -> ApiResult<()> {
    guard(state, ctx, GuardKind::Grant, ensure_can_grant(operator, target.authority()))?;
    let geographic = target.geographic();
    for province_id in geographic.allowed_provinces() {
        guard(state, ctx, GuardKind::Province, ensure_province(operator, province_id))?;
    }
    if let Some(branch_id) = geographic.home_branch() {
        guard(state, ctx, GuardKind::Branch, ensure_branch(operator, branch_id))?;
    }
    Ok(())
}

async fn target_profile(state: &AppState, ctx: &OperatorContext, user_id: &str) -> ApiResult<AccessProfile> {
    state
        .admin
        .store()
        .get_profile(user_id)
        .await
        .map_err(|e| store_error(state, e, ctx.trace_id))?
        .ok_or(ApiError::NotFound { code: "profile_not_found", trace_id: ctx.trace_id })
}

fn record_change(state: &AppState, action: &str, change: &ProfileChange) {
    if change.changed {
        state.metrics.record_mutation(action, change.audited);
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let mut resp = Response::new(Body::from(state.metrics.render()));
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; version=0.0.4"));
    resp
}

pub async fn list_roles() -> Json<&'static [RoleSpec]> {
    Json(RoleTable::builtin().specs())
}

pub async fn geography(State(state): State<AppState>) -> Json<GeographyTable> {
    Json(state.geography().clone())
}

pub async fn get_profile(
    State(state): State<AppState>,
    OperatorCtxExtractor(ctx): OperatorCtxExtractor,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    let operator = authorize(&state, &ctx, PERM_USER_MANAGE).await?;
    let profile = target_profile(&state, &ctx, &user_id).await?;
    authorize_target(&state, &ctx, &operator, &profile)?;
    let switched_to = state
        .admin
        .store()
        .get_snapshot(&user_id)
        .await
        .map_err(|e| store_error(&state, e, ctx.trace_id))?
        .map(|s| s.switched_to);
    Ok(Json(ProfileView { user_id, profile, switched_to }))
}

pub async fn provision(
    State(state): State<AppState>,
    OperatorCtxExtractor(ctx): OperatorCtxExtractor,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ChangeResponse>> {
    authorize(&state, &ctx, PERM_USER_MANAGE).await?;
    let change = state
        .admin
        .provision(&ctx.operator(), &user_id)
        .await
        .map_err(|e| admin_error(&state, e, ctx.trace_id))?;
    record_change(&state, ACTION_PROVISIONED, &change);
    Ok(Json(ChangeResponse::new(user_id, change)))
}

pub async fn assign_role(
    State(state): State<AppState>,
    OperatorCtxExtractor(ctx): OperatorCtxExtractor,
    Path(user_id): Path<String>,
    Json(selection): Json<RoleSelection>,
) -> ApiResult<Json<ChangeResponse>> {
    let operator = authorize(&state, &ctx, PERM_USER_MANAGE).await?;
    authorize_selection(&state, &ctx, &operator, &selection)?;
    let target = target_profile(&state, &ctx, &user_id).await?;
    authorize_target(&state, &ctx, &operator, &target)?;
    let change = state
        .admin
        .assign_role(&ctx.operator(), &user_id, &selection)
        .await
        .map_err(|e| admin_error(&state, e, ctx.trace_id))?;
    record_change(&state, ACTION_ROLE_ASSIGNED, &change);
    Ok(Json(ChangeResponse::new(user_id, change)))
}

pub async fn switch_role(
    State(state): State<AppState>,
    OperatorCtxExtractor(ctx): OperatorCtxExtractor,
    Path(user_id): Path<String>,
    Json(selection): Json<RoleSelection>,
) -> ApiResult<Json<ChangeResponse>> {
    let operator = authorize(&state, &ctx, PERM_ROLE_SWITCH).await?;
    authorize_selection(&state, &ctx, &operator, &selection)?;
    let target = target_profile(&state, &ctx, &user_id).await?;
    authorize_target(&state, &ctx, &operator, &target)?;
    let change = state
        .admin
        .apply_profile(&ctx.operator(), &user_id, &selection)
        .await
        .map_err(|e| admin_error(&state, e, ctx.trace_id))?;
    record_change(&state, ACTION_ROLE_SWITCHED, &change);
    Ok(Json(ChangeResponse::new(user_id, change)))
}

pub async fn restore_profile(
    State(state): State<AppState>,
    OperatorCtxExtractor(ctx): OperatorCtxExtractor,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ChangeResponse>> {
    let operator = authorize(&state, &ctx, PERM_ROLE_SWITCH).await?;
    let target = target_profile(&state, &ctx, &user_id).await?;
    authorize_target(&state, &ctx, &operator, &target)?;
    let snapshot = state
        .admin
        .store()
        .get_snapshot(&user_id)
        .await
        .map_err(|e| store_error(&state, e, ctx.trace_id))?;
    if let Some(snapshot) = snapshot {
        authorize_target(&state, &ctx, &operator, &snapshot.profile)?;
    }
    let change = state
        .admin
        .restore_profile(&ctx.operator(), &user_id)
        .await
        .map_err(|e| admin_error(&state, e, ctx.trace_id))?;
    record_change(&state, ACTION_RESTORED, &change);
    Ok(Json(ChangeResponse::new(user_id, change)))
}

/// Evaluate the requested checks against the stored profile of `user_id`.
///
/// Users may check themselves; checking anyone else needs `admin.user_manage`
/// over that user. A denied check is an ordinary `allowed: false`; only a
/// corrupt record is an error.
pub async fn check_access(
    State(state): State<AppState>,
    OperatorCtxExtractor(ctx): OperatorCtxExtractor,
    Path(user_id): Path<String>,
    Json(req): Json<CheckRequest>,
) -> ApiResult<Json<CheckResponse>> {
    let operator = if ctx.user_id == user_id {
        None
    } else {
        Some(authorize(&state, &ctx, PERM_USER_MANAGE).await?)
    };
    let profile = target_profile(&state, &ctx, &user_id).await?;
    if let Some(operator) = operator.as_ref() {
        authorize_target(&state, &ctx, operator, &profile)?;
    }

    let mut checks = BTreeMap::new();
    if let Some(permission) = req.permission.as_deref() {
        checks.insert("permission", has_permission(&profile, permission));
    }
    if let Some(province_id) = req.province_id.as_deref() {
        checks.insert("province", can_access_province(&profile, province_id));
    }
    if let Some(branch_id) = req.branch_id.as_deref() {
        checks.insert("branch", can_access_branch(&profile, branch_id));
    }
    if let Some(department) = req.department {
        checks.insert("department", in_department(&profile, department));
    }
    let allowed = profile.is_active() && checks.values().all(|ok| *ok);
    debug!(%user_id, operator = %ctx.user_id, allowed, ?checks, "access check evaluated");
    Ok(Json(CheckResponse { allowed, checks }))
}
