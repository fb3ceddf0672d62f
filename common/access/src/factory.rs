use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::authority::Authority;
use crate::department::Department;
use crate::geography::GeographyTable;
use crate::profile::{AccessProfile, GeographicAccess, GeographicScope, PermissionSet};
use crate::roles::{RoleName, RoleSpec};

/// Role plus the optional selectors collected by the support tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSelection {
    pub role: RoleName,
    #[serde(default)]
    pub province_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub department: Option<Department>,
}

impl RoleSelection {
    pub fn new(role: RoleName) -> Self {
        Self { role, province_id: None, branch_id: None, department: None }
    }

    pub fn province(mut self, province_id: impl Into<String>) -> Self {
        self.province_id = Some(province_id.into());
        self
    }

    pub fn branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    pub fn department(mut self, department: Department) -> Self {
        self.department = Some(department);
        self
    }

    /// Selectors the role table marks as required but the selection leaves empty.
    ///
    /// The factory still builds a profile in that case; callers use this to
    /// block submission.
    pub fn missing_selectors(&self) -> Vec<&'static str> {
        let requires = self.role.spec().requires;
        let mut missing = Vec::new();
        if requires.province && is_blank(&self.province_id) {
            missing.push("provinceId");
        }
        if requires.branch && is_blank(&self.branch_id) {
            missing.push("branchId");
        }
        if requires.department && self.department.is_none() {
            missing.push("department");
        }
        missing
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Builds complete profiles for a named role.
///
/// Unknown or mismatched selectors fall back to defaults from the geography
/// table: the province selector wins over the branch selector, and a branch
/// outside the chosen province is replaced with that province's first branch.
#[derive(Debug, Clone, Copy)]
pub struct RoleConfigurationFactory<'g> {
    geography: &'g GeographyTable,
}

impl RoleConfigurationFactory<'static> {
    pub fn builtin() -> Self {
        Self::new(GeographyTable::builtin())
    }
}

impl<'g> RoleConfigurationFactory<'g> {
    pub fn new(geography: &'g GeographyTable) -> Self {
        Self { geography }
    }

    pub fn geography(&self) -> &'g GeographyTable {
        self.geography
    }

    pub fn build(&self, selection: &RoleSelection) -> AccessProfile {
        let spec = selection.role.spec();
        if spec.authority == Authority::Pending {
            return AccessProfile::pending();
        }

        let (province, branch) = self.resolve_location(selection);
        let department = spec
            .default_department
            .or(selection.department)
            .unwrap_or(Department::Accounting);

        let geographic = match spec.scope {
            GeographicScope::All => GeographicAccess {
                scope: GeographicScope::All,
                allowed_provinces: self.geography.province_ids(),
                allowed_branches: self.geography.branch_ids(),
                home_province: Some(province),
                home_branch: Some(branch),
            },
            GeographicScope::Province => GeographicAccess {
                scope: GeographicScope::Province,
                allowed_branches: self.geography.branches_of(&province).map(String::from).collect(),
                allowed_provinces: BTreeSet::from([province.clone()]),
                home_province: Some(province),
                home_branch: Some(branch),
            },
            GeographicScope::Branch => GeographicAccess {
                scope: GeographicScope::Branch,
                allowed_provinces: BTreeSet::from([province.clone()]),
                allowed_branches: BTreeSet::from([branch.clone()]),
                home_province: Some(province),
                home_branch: Some(branch),
            },
        };

        let profile = AccessProfile {
            authority: spec.authority,
            permissions: permissions_for(spec, department),
            geographic,
            departments: departments_for(spec, selection.department),
            is_active: true,
        };
        debug!(
            role = %selection.role,
            scope = profile.geographic.scope.as_str(),
            home_branch = ?profile.geographic.home_branch,
            "built role profile"
        );
        profile
    }

    fn resolve_location(&self, selection: &RoleSelection) -> (String, String) {
        let geo = self.geography;
        let requested_branch = selection.branch_id.as_deref().map(str::trim).filter(|b| geo.contains_branch(b));
        let province = selection
            .province_id
            .as_deref()
            .map(str::trim)
            .filter(|p| geo.contains_province(p))
            .or_else(|| requested_branch.and_then(|b| geo.province_of(b)))
            .unwrap_or(geo.default_province().id.as_str())
            .to_string();
        let branch = requested_branch
            .filter(|b| geo.province_of(b) == Some(province.as_str()))
            .unwrap_or_else(|| geo.default_branch_for(&province))
            .to_string();
        (province, branch)
    }
}

fn permissions_for(spec: &RoleSpec, department: Department) -> PermissionSet {
    match &spec.permissions {
        None => PermissionSet::All,
        Some(list) if list.is_empty() && spec.authority == Authority::Staff => {
            PermissionSet::explicit([format!("{}.view", department.as_str())])
        }
        Some(list) => PermissionSet::explicit(list.iter().cloned()),
    }
}

/// Only generic staff take the department selector; department-specific roles
/// keep the department their permissions were written for.
fn departments_for(spec: &RoleSpec, selected: Option<Department>) -> BTreeSet<Department> {
    match (spec.authority, spec.default_department) {
        (Authority::Staff, None) => BTreeSet::from([selected.unwrap_or(Department::Accounting)]),
        _ => spec.default_departments().into_iter().collect(),
    }
}
