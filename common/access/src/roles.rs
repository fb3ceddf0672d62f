use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::authority::Authority;
use crate::department::Department;
use crate::error::ProfileError;
use crate::profile::GeographicScope;

pub const PERM_ROLE_SWITCH: &str = "admin.role_switch";
pub const PERM_USER_MANAGE: &str = "admin.user_manage";
pub const PERM_REPORTS_VIEW: &str = "reports.view";
pub const PERM_REPORTS_EXPORT: &str = "reports.export";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleName {
    SuperAdmin,
    Executive,
    ProvinceManager,
    BranchManager,
    AccountingStaff,
    SalesStaff,
    ServiceStaff,
    InventoryStaff,
    CreditStaff,
    HrStaff,
    Staff,
    Pending,
}

impl RoleName {
    pub const ALL: [RoleName; 12] = [
        RoleName::SuperAdmin,
        RoleName::Executive,
        RoleName::ProvinceManager,
        RoleName::BranchManager,
        RoleName::AccountingStaff,
        RoleName::SalesStaff,
        RoleName::ServiceStaff,
        RoleName::InventoryStaff,
        RoleName::CreditStaff,
        RoleName::HrStaff,
        RoleName::Staff,
        RoleName::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::SuperAdmin => "SUPER_ADMIN",
            RoleName::Executive => "EXECUTIVE",
            RoleName::ProvinceManager => "PROVINCE_MANAGER",
            RoleName::BranchManager => "BRANCH_MANAGER",
            RoleName::AccountingStaff => "ACCOUNTING_STAFF",
            RoleName::SalesStaff => "SALES_STAFF",
            RoleName::ServiceStaff => "SERVICE_STAFF",
            RoleName::InventoryStaff => "INVENTORY_STAFF",
            RoleName::CreditStaff => "CREDIT_STAFF",
            RoleName::HrStaff => "HR_STAFF",
            RoleName::Staff => "STAFF",
            RoleName::Pending => "PENDING",
        }
    }

    pub fn spec(&self) -> &'static RoleSpec {
        RoleTable::builtin().get(*self)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        RoleName::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| ProfileError::UnknownRole(s.to_string()))
    }
}

/// Which selectors the support tool must collect before submitting a role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectorRequirements {
    pub province: bool,
    pub branch: bool,
    pub department: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleSpec {
    pub role: RoleName,
    pub authority: Authority,
    pub scope: GeographicScope,
    /// `None` means the wildcard permission set.
    pub permissions: Option<Vec<String>>,
    pub default_department: Option<Department>,
    pub requires: SelectorRequirements,
}

impl RoleSpec {
    /// Departments granted when the caller does not pick one.
    pub fn default_departments(&self) -> Vec<Department> {
        match (self.authority, self.default_department) {
            (Authority::Pending, _) => Vec::new(),
            (_, Some(dept)) => vec![dept],
            (Authority::Staff, None) => Vec::new(),
            _ => Department::ALL.to_vec(),
        }
    }
}

/// Static role table, built once and never mutated.
#[derive(Debug)]
pub struct RoleTable {
    specs: Vec<RoleSpec>,
}

fn dept_permissions(dept: Department, actions: &[&str]) -> Vec<String> {
    actions.iter().map(|action| format!("{}.{}", dept.as_str(), action)).collect()
}

fn staff_spec(role: RoleName, dept: Department, extra: &[(Department, &str)]) -> RoleSpec {
    let mut perms = dept_permissions(dept, &["view", "edit"]);
    for (other, action) in extra {
        perms.extend(dept_permissions(*other, &[*action]));
    }
    RoleSpec {
        role,
        authority: Authority::Staff,
        scope: GeographicScope::Branch,
        permissions: Some(perms),
        default_department: Some(dept),
        requires: SelectorRequirements { province: true, branch: true, department: false },
    }
}

static BUILTIN: Lazy<RoleTable> = Lazy::new(RoleTable::build);

impl RoleTable {
    pub fn builtin() -> &'static RoleTable {
        &BUILTIN
    }

    fn build() -> Self {
        use Department::*;

        let none = SelectorRequirements::default();
        let province_only = SelectorRequirements { province: true, ..none };
        let branch = SelectorRequirements { province: true, branch: true, department: false };
        let branch_and_dept = SelectorRequirements { department: true, ..branch };

        let mut manager_perms: Vec<String> = Vec::new();
        for dept in Department::ALL {
            manager_perms.extend(dept_permissions(dept, &["view", "edit", "approve"]));
        }
        manager_perms.extend([PERM_REPORTS_VIEW, PERM_REPORTS_EXPORT, PERM_USER_MANAGE].map(String::from));

        let mut branch_perms: Vec<String> = Vec::new();
        for dept in Department::ALL {
            branch_perms.extend(dept_permissions(dept, &["view", "edit"]));
        }
        branch_perms.extend(dept_permissions(Accounting, &["approve"]));
        branch_perms.extend(dept_permissions(Sales, &["approve"]));
        branch_perms.push(PERM_REPORTS_VIEW.to_string());

        let specs = vec![
            RoleSpec {
                role: RoleName::SuperAdmin,
                authority: Authority::SuperAdmin,
                scope: GeographicScope::All,
                permissions: None,
                default_department: None,
                requires: none,
            },
            RoleSpec {
                role: RoleName::Executive,
                authority: Authority::Executive,
                scope: GeographicScope::All,
                permissions: None,
                default_department: None,
                requires: none,
            },
            RoleSpec {
                role: RoleName::ProvinceManager,
                authority: Authority::ProvinceManager,
                scope: GeographicScope::Province,
                permissions: Some(manager_perms),
                default_department: None,
                requires: province_only,
            },
            RoleSpec {
                role: RoleName::BranchManager,
                authority: Authority::BranchManager,
                scope: GeographicScope::Branch,
                permissions: Some(branch_perms),
                default_department: None,
                requires: branch,
            },
            {
                let mut spec = staff_spec(RoleName::AccountingStaff, Accounting, &[]);
                if let Some(perms) = spec.permissions.as_mut() {
                    perms.push(PERM_REPORTS_VIEW.to_string());
                }
                spec
            },
            staff_spec(RoleName::SalesStaff, Sales, &[(Inventory, "view"), (Credit, "view")]),
            staff_spec(RoleName::ServiceStaff, Service, &[(Inventory, "view")]),
            staff_spec(RoleName::InventoryStaff, Inventory, &[]),
            staff_spec(RoleName::CreditStaff, Credit, &[(Sales, "view")]),
            staff_spec(RoleName::HrStaff, Hr, &[]),
            RoleSpec {
                role: RoleName::Staff,
                authority: Authority::Staff,
                scope: GeographicScope::Branch,
                permissions: Some(Vec::new()),
                default_department: None,
                requires: branch_and_dept,
            },
            RoleSpec {
                role: RoleName::Pending,
                authority: Authority::Pending,
                scope: GeographicScope::Province,
                permissions: Some(Vec::new()),
                default_department: None,
                requires: none,
            },
        ];
        Self { specs }
    }

    pub fn get(&self, role: RoleName) -> &RoleSpec {
        // `build` emits one spec per `RoleName::ALL` entry, in declaration order
        &self.specs[role as usize]
    }

    pub fn specs(&self) -> &[RoleSpec] {
        &self.specs
    }
}
