use axum::http::StatusCode;
use axum::response::IntoResponse;
use common_http_errors::ApiError;
use uuid::Uuid;

fn status_and_code(err: ApiError) -> (StatusCode, String) {
    let resp = err.into_response();
    let code = resp.headers().get("X-Error-Code").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    (resp.status(), code)
}

#[test]
fn denial_variants_are_forbidden() {
    let (status, code) = status_and_code(ApiError::ForbiddenMissingPermission {
        permission: "admin.role_switch".into(),
        trace_id: None,
    });
    assert_eq!((status, code.as_str()), (StatusCode::FORBIDDEN, "missing_permission"));

    let (status, code) = status_and_code(ApiError::Forbidden { trace_id: None, message: Some("scope".into()) });
    assert_eq!((status, code.as_str()), (StatusCode::FORBIDDEN, "forbidden"));
}

#[test]
fn caller_supplied_codes_pass_through() {
    let (status, code) = status_and_code(ApiError::bad_request("missing_user_id", None));
    assert_eq!((status, code.as_str()), (StatusCode::BAD_REQUEST, "missing_user_id"));

    let (status, code) = status_and_code(ApiError::NotFound { code: "profile_not_found", trace_id: None });
    assert_eq!((status, code.as_str()), (StatusCode::NOT_FOUND, "profile_not_found"));

    let (status, code) = status_and_code(ApiError::Conflict {
        code: "no_snapshot",
        trace_id: None,
        message: Some("nothing to restore".into()),
    });
    assert_eq!((status, code.as_str()), (StatusCode::CONFLICT, "no_snapshot"));
}

#[test]
fn invalid_profile_is_distinct_from_denial() {
    let (status, code) = status_and_code(ApiError::InvalidProfile {
        trace_id: None,
        message: "profile record missing field 'geographic'".into(),
    });
    assert_eq!((status, code.as_str()), (StatusCode::UNPROCESSABLE_ENTITY, "invalid_profile"));
}

#[test]
fn internal_carries_trace_id() {
    let trace = Uuid::new_v4();
    let err = ApiError::internal("pool timed out", Some(trace));
    assert_eq!(err.code(), "internal_error");
    let (status, _) = status_and_code(err);
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
