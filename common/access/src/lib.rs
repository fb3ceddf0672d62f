//! Access-control core for the dealership back office.
//!
//! Profiles are validated once at the storage boundary
//! ([`AccessProfile::from_record`]) or built by the
//! [`RoleConfigurationFactory`]; after that the [`resolver`] functions are
//! pure lookups that never fail.

pub mod admin;
pub mod authority;
pub mod department;
pub mod error;
pub mod factory;
pub mod geography;
pub mod profile;
pub mod resolver;
pub mod roles;
pub mod store;

pub use admin::{AdminError, AdminResult, Operator, ProfileAdmin, ProfileChange};
pub use authority::Authority;
pub use department::Department;
pub use error::{ProfileError, ProfileResult};
pub use factory::{RoleConfigurationFactory, RoleSelection};
pub use geography::{Branch, GeographyError, GeographyTable, Province};
pub use profile::{
    AccessProfile, GeographicAccess, GeographicRecord, GeographicScope, PermissionSet, ProfileRecord,
    WILDCARD_PERMISSION,
};
pub use resolver::{
    accessible_branches, can_access_branch, can_access_province, has_all_permissions, has_any_permission,
    has_permission, in_department,
};
pub use roles::{RoleName, RoleSpec, RoleTable, SelectorRequirements, PERM_ROLE_SWITCH, PERM_USER_MANAGE};
pub use store::{
    InMemoryProfileStore, ProfileSnapshot, ProfileStore, SnapshotRecord, SnapshotWrite, StoreError, StoreResult,
};
