use thiserror::Error;

use crate::authority::Authority;

/// Rejection raised when external data cannot become an `AccessProfile`.
///
/// These only ever come out of the storage/input boundary; the resolvers
/// themselves never fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile record missing field '{0}'")]
    MissingField(&'static str),
    #[error("malformed profile record: {0}")]
    Malformed(String),
    #[error("unknown authority '{0}'")]
    UnknownAuthority(String),
    #[error("unknown geographic scope '{0}'")]
    UnknownScope(String),
    #[error("unknown department '{0}'")]
    UnknownDepartment(String),
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("empty permission entry")]
    EmptyPermission,
    #[error("wildcard permissions are reserved for management, not {0}")]
    WildcardNotAllowed(Authority),
    #[error("{0} requires scope ALL")]
    ScopeMustBeAll(Authority),
    #[error("{authority} must be allowed every known {kind}")]
    IncompleteWildcardGeography { authority: Authority, kind: &'static str },
    #[error("branch scope requires at least one allowed branch")]
    EmptyBranchScope,
    #[error("branch '{0}' is not part of the known geography")]
    UnknownBranch(String),
    #[error("branch '{branch}' belongs to province '{province}' which is not allowed")]
    BranchOutsideProvinces { branch: String, province: String },
    #[error("home branch '{0}' is not among the allowed branches")]
    HomeBranchNotAllowed(String),
    #[error("home province '{0}' is not among the allowed provinces")]
    HomeProvinceNotAllowed(String),
}

pub type ProfileResult<T> = Result<T, ProfileError>;
