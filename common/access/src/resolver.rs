//! Pure access checks over an [`AccessProfile`].
//!
//! Every function here is total: unknown permissions, provinces, branches
//! and departments are an ordinary deny, never an error. An inactive profile
//! denies everything.

use crate::department::Department;
use crate::geography::GeographyTable;
use crate::profile::{AccessProfile, GeographicScope};

pub fn has_permission(profile: &AccessProfile, permission: &str) -> bool {
    profile.is_active && profile.permissions.contains(permission)
}

/// False for an empty slice.
pub fn has_any_permission(profile: &AccessProfile, permissions: &[&str]) -> bool {
    permissions.iter().any(|p| has_permission(profile, p))
}

/// True for an empty slice as long as the profile is active.
pub fn has_all_permissions(profile: &AccessProfile, permissions: &[&str]) -> bool {
    profile.is_active && permissions.iter().all(|p| has_permission(profile, p))
}

pub fn can_access_province(profile: &AccessProfile, province_id: &str) -> bool {
    if !profile.is_active {
        return false;
    }
    let geo = &profile.geographic;
    geo.scope == GeographicScope::All || geo.allowed_provinces.contains(province_id)
}

/// Checked against the branch allow-list only; province access is a separate question.
pub fn can_access_branch(profile: &AccessProfile, branch_id: &str) -> bool {
    if !profile.is_active {
        return false;
    }
    let geo = &profile.geographic;
    geo.scope == GeographicScope::All || geo.allowed_branches.contains(branch_id)
}

pub fn in_department(profile: &AccessProfile, department: Department) -> bool {
    if !profile.is_active {
        return false;
    }
    profile.authority.is_management() || profile.departments.contains(&department)
}

/// Branches of `geography` the profile may see, in table order.
pub fn accessible_branches<'g>(profile: &AccessProfile, geography: &'g GeographyTable) -> Vec<&'g str> {
    geography
        .provinces()
        .iter()
        .flat_map(|p| p.branches.iter())
        .map(|b| b.id.as_str())
        .filter(|b| can_access_branch(profile, b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn staff(active: bool) -> AccessProfile {
        AccessProfile::from_json(
            json!({
                "authority": "STAFF",
                "permissions": ["sales.view", "sales.edit"],
                "geographic": {
                    "scope": "PROVINCE",
                    "allowedProvinces": ["nakhon-sawan"],
                    "allowedBranches": ["NSN001", "NSN002"]
                },
                "departments": ["sales"],
                "isActive": active
            }),
            GeographyTable::builtin(),
        )
        .expect("valid profile")
    }

    #[test]
    fn permission_lists() {
        let p = staff(true);
        assert!(has_any_permission(&p, &["hr.view", "sales.view"]));
        assert!(!has_any_permission(&p, &[]));
        assert!(has_all_permissions(&p, &["sales.view", "sales.edit"]));
        assert!(!has_all_permissions(&p, &["sales.view", "hr.view"]));
        assert!(has_all_permissions(&p, &[]));
        assert!(!has_all_permissions(&staff(false), &[]));
    }

    #[test]
    fn province_and_branch_lists_are_independent() {
        let p = staff(true);
        assert!(can_access_province(&p, "nakhon-sawan"));
        assert!(!can_access_province(&p, "nakhon-ratchasima"));
        assert!(can_access_branch(&p, "NSN002"));
        assert!(!can_access_branch(&p, "NSN003"));
    }

    #[test]
    fn department_membership() {
        let p = staff(true);
        assert!(in_department(&p, Department::Sales));
        assert!(!in_department(&p, Department::Accounting));
        assert!(!in_department(&staff(false), Department::Sales));
    }

    #[test]
    fn accessible_branches_follow_allow_list() {
        let p = staff(true);
        assert_eq!(accessible_branches(&p, GeographyTable::builtin()), vec!["NSN001", "NSN002"]);
        assert!(accessible_branches(&staff(false), GeographyTable::builtin()).is_empty());
    }
}
