//! Guards evaluated against the caller's own access profile.

use common_access::{can_access_branch, can_access_province, has_permission, AccessProfile, Authority};
use tracing::warn;

use crate::SecurityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    Permission,
    Province,
    Branch,
    Grant,
}

impl GuardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardKind::Permission => "permission",
            GuardKind::Province => "province",
            GuardKind::Branch => "branch",
            GuardKind::Grant => "grant",
        }
    }
}

pub fn ensure_active(profile: &AccessProfile) -> Result<(), SecurityError> {
    if profile.is_active() {
        return Ok(());
    }
    warn!(authority = %profile.authority(), "inactive_profile_denied");
    Err(SecurityError::Inactive)
}

pub fn ensure_permission(profile: &AccessProfile, permission: &str) -> Result<(), SecurityError> {
    ensure_active(profile)?;
    if has_permission(profile, permission) {
        return Ok(());
    }
    warn!(authority = %profile.authority(), permission, "permission_check_failed");
    Err(SecurityError::MissingPermission(permission.to_string()))
}

pub fn ensure_province(profile: &AccessProfile, province_id: &str) -> Result<(), SecurityError> {
    ensure_active(profile)?;
    if can_access_province(profile, province_id) {
        return Ok(());
    }
    warn!(authority = %profile.authority(), province_id, "province_check_failed");
    Err(SecurityError::ProvinceDenied(province_id.to_string()))
}

pub fn ensure_branch(profile: &AccessProfile, branch_id: &str) -> Result<(), SecurityError> {
    ensure_active(profile)?;
    if can_access_branch(profile, branch_id) {
        return Ok(());
    }
    warn!(authority = %profile.authority(), branch_id, "branch_check_failed");
    Err(SecurityError::BranchDenied(branch_id.to_string()))
}

/// The caller may hand out `target` only if their own authority allows it.
pub fn ensure_can_grant(profile: &AccessProfile, target: Authority) -> Result<(), SecurityError> {
    ensure_active(profile)?;
    let operator = profile.authority();
    if operator.can_grant(target) {
        return Ok(());
    }
    warn!(%operator, %target, "grant_check_failed");
    Err(SecurityError::EscalationDenied { operator, target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_access::{RoleConfigurationFactory, RoleName, RoleSelection};

    fn build(role: RoleName) -> AccessProfile {
        RoleConfigurationFactory::builtin().build(&RoleSelection::new(role).province("nakhon-sawan").branch("NSN002"))
    }

    #[test]
    fn branch_manager_cannot_switch_roles() {
        let err = ensure_permission(&build(RoleName::BranchManager), "admin.role_switch").unwrap_err();
        assert_eq!(err, SecurityError::MissingPermission("admin.role_switch".into()));
    }

    #[test]
    fn super_admin_passes_every_guard() {
        let p = build(RoleName::SuperAdmin);
        assert!(ensure_permission(&p, "admin.role_switch").is_ok());
        assert!(ensure_province(&p, "nakhon-ratchasima").is_ok());
        assert!(ensure_branch(&p, "0450").is_ok());
        assert!(ensure_can_grant(&p, Authority::SuperAdmin).is_ok());
    }

    #[test]
    fn branch_staff_is_confined_to_home_branch() {
        let p = build(RoleName::SalesStaff);
        assert!(ensure_branch(&p, "NSN002").is_ok());
        assert_eq!(ensure_branch(&p, "NSN001"), Err(SecurityError::BranchDenied("NSN001".into())));
        assert_eq!(
            ensure_province(&p, "nakhon-ratchasima"),
            Err(SecurityError::ProvinceDenied("nakhon-ratchasima".into()))
        );
    }

    #[test]
    fn province_manager_cannot_grant_executive() {
        let p = build(RoleName::ProvinceManager);
        assert!(ensure_can_grant(&p, Authority::BranchManager).is_ok());
        assert!(matches!(
            ensure_can_grant(&p, Authority::Executive),
            Err(SecurityError::EscalationDenied { target: Authority::Executive, .. })
        ));
        assert!(ensure_can_grant(&p, Authority::ProvinceManager).is_err());
    }

    #[test]
    fn inactive_profile_fails_before_lookup() {
        let p = build(RoleName::SuperAdmin).with_active(false);
        assert_eq!(ensure_permission(&p, "sales.view"), Err(SecurityError::Inactive));
    }
}
