use common_access::Authority;
use common_http_errors::ApiError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("access profile is inactive")]
    Inactive,
    #[error("missing permission '{0}'")]
    MissingPermission(String),
    #[error("province '{0}' is outside the caller's scope")]
    ProvinceDenied(String),
    #[error("branch '{0}' is outside the caller's scope")]
    BranchDenied(String),
    #[error("{operator} may not grant {target}")]
    EscalationDenied { operator: Authority, target: Authority },
}

impl SecurityError {
    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        match self {
            SecurityError::MissingPermission(permission) => {
                ApiError::ForbiddenMissingPermission { permission, trace_id }
            }
            other => ApiError::Forbidden { trace_id, message: Some(other.to_string()) },
        }
    }
}

impl From<SecurityError> for ApiError {
    fn from(e: SecurityError) -> Self {
        e.into_api_error(None)
    }
}
