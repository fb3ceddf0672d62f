use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::authority::Authority;
use crate::department::Department;
use crate::error::{ProfileError, ProfileResult};
use crate::geography::GeographyTable;

/// Token stored in records to mark the wildcard permission set.
pub const WILDCARD_PERMISSION: &str = "*";

/// Either every permission or an explicit set of opaque tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    All,
    Explicit(BTreeSet<String>),
}

impl PermissionSet {
    pub fn none() -> Self {
        PermissionSet::Explicit(BTreeSet::new())
    }

    pub fn explicit<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PermissionSet::Explicit(permissions.into_iter().map(Into::into).collect())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PermissionSet::All)
    }

    /// Exact string membership; the wildcard contains everything.
    pub fn contains(&self, permission: &str) -> bool {
        match self {
            PermissionSet::All => true,
            PermissionSet::Explicit(set) => set.contains(permission),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeographicScope {
    All,
    Province,
    Branch,
}

impl GeographicScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeographicScope::All => "ALL",
            GeographicScope::Province => "PROVINCE",
            GeographicScope::Branch => "BRANCH",
        }
    }
}

impl FromStr for GeographicScope {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(GeographicScope::All),
            "PROVINCE" => Ok(GeographicScope::Province),
            "BRANCH" => Ok(GeographicScope::Branch),
            _ => Err(ProfileError::UnknownScope(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeographicAccess {
    pub(crate) scope: GeographicScope,
    pub(crate) allowed_provinces: BTreeSet<String>,
    pub(crate) allowed_branches: BTreeSet<String>,
    pub(crate) home_province: Option<String>,
    pub(crate) home_branch: Option<String>,
}

impl GeographicAccess {
    pub fn scope(&self) -> GeographicScope {
        self.scope
    }

    pub fn allowed_provinces(&self) -> &BTreeSet<String> {
        &self.allowed_provinces
    }

    pub fn allowed_branches(&self) -> &BTreeSet<String> {
        &self.allowed_branches
    }

    pub fn home_province(&self) -> Option<&str> {
        self.home_province.as_deref()
    }

    pub fn home_branch(&self) -> Option<&str> {
        self.home_branch.as_deref()
    }
}

/// A user's validated access profile.
///
/// Values only come out of [`AccessProfile::from_record`], the role factory,
/// or [`AccessProfile::pending`], so the invariants checked by
/// [`AccessProfile::validate`] hold for every instance the resolvers see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ProfileRecord")]
pub struct AccessProfile {
    pub(crate) authority: Authority,
    pub(crate) permissions: PermissionSet,
    pub(crate) geographic: GeographicAccess,
    pub(crate) departments: BTreeSet<Department>,
    pub(crate) is_active: bool,
}

impl AccessProfile {
    /// Provisioning default: active, but grants nothing.
    pub fn pending() -> Self {
        Self {
            authority: Authority::Pending,
            permissions: PermissionSet::none(),
            geographic: GeographicAccess {
                scope: GeographicScope::Province,
                allowed_provinces: BTreeSet::new(),
                allowed_branches: BTreeSet::new(),
                home_province: None,
                home_branch: None,
            },
            departments: BTreeSet::new(),
            is_active: true,
        }
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn geographic(&self) -> &GeographicAccess {
        &self.geographic
    }

    pub fn departments(&self) -> &BTreeSet<Department> {
        &self.departments
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn from_record(record: ProfileRecord, geography: &GeographyTable) -> ProfileResult<Self> {
        let authority: Authority = record
            .authority
            .as_deref()
            .ok_or(ProfileError::MissingField("authority"))?
            .parse()?;
        let is_active = record.is_active.ok_or(ProfileError::MissingField("isActive"))?;
        let geo = record.geographic.ok_or(ProfileError::MissingField("geographic"))?;
        let scope: GeographicScope = geo
            .scope
            .as_deref()
            .ok_or(ProfileError::MissingField("geographic.scope"))?
            .parse()?;

        if record.permissions.iter().any(|p| p.is_empty()) {
            return Err(ProfileError::EmptyPermission);
        }
        let wildcard = record.permissions.iter().any(|p| p == WILDCARD_PERMISSION);
        let permissions = if authority.is_management() {
            // management records historically stored a `["*"]` fallback or nothing at all
            PermissionSet::All
        } else if wildcard {
            return Err(ProfileError::WildcardNotAllowed(authority));
        } else {
            PermissionSet::explicit(record.permissions)
        };

        let departments = record
            .departments
            .iter()
            .map(|d| d.parse::<Department>())
            .collect::<ProfileResult<BTreeSet<_>>>()?;

        let profile = Self {
            authority,
            permissions,
            geographic: GeographicAccess {
                scope,
                allowed_provinces: geo.allowed_provinces.into_iter().collect(),
                allowed_branches: geo.allowed_branches.into_iter().collect(),
                home_province: geo.home_province.filter(|s| !s.is_empty()),
                home_branch: geo.home_branch.filter(|s| !s.is_empty()),
            },
            departments,
            is_active,
        };
        profile.validate(geography)?;
        Ok(profile)
    }

    pub fn from_json(value: serde_json::Value, geography: &GeographyTable) -> ProfileResult<Self> {
        let record: ProfileRecord =
            serde_json::from_value(value).map_err(|e| ProfileError::Malformed(e.to_string()))?;
        Self::from_record(record, geography)
    }

    /// Check every structural invariant against the geography table.
    pub fn validate(&self, geography: &GeographyTable) -> ProfileResult<()> {
        let geo = &self.geographic;

        if self.authority.is_management() {
            if geo.scope != GeographicScope::All {
                return Err(ProfileError::ScopeMustBeAll(self.authority));
            }
            if !geography.province_ids().is_subset(&geo.allowed_provinces) {
                return Err(ProfileError::IncompleteWildcardGeography {
                    authority: self.authority,
                    kind: "province",
                });
            }
            if !geography.branch_ids().is_subset(&geo.allowed_branches) {
                return Err(ProfileError::IncompleteWildcardGeography {
                    authority: self.authority,
                    kind: "branch",
                });
            }
            if !self.permissions.is_wildcard() {
                return Err(ProfileError::Malformed(format!(
                    "{} must carry wildcard permissions",
                    self.authority
                )));
            }
        } else if self.permissions.is_wildcard() {
            return Err(ProfileError::WildcardNotAllowed(self.authority));
        }

        if let PermissionSet::Explicit(set) = &self.permissions {
            if set.iter().any(|p| p.is_empty()) {
                return Err(ProfileError::EmptyPermission);
            }
        }

        if geo.scope != GeographicScope::All {
            if geo.scope == GeographicScope::Branch && geo.allowed_branches.is_empty() {
                return Err(ProfileError::EmptyBranchScope);
            }
            for branch in &geo.allowed_branches {
                let parent = geography
                    .province_of(branch)
                    .ok_or_else(|| ProfileError::UnknownBranch(branch.clone()))?;
                if !geo.allowed_provinces.contains(parent) {
                    return Err(ProfileError::BranchOutsideProvinces {
                        branch: branch.clone(),
                        province: parent.to_string(),
                    });
                }
            }
        }

        if let Some(home) = &geo.home_branch {
            if !geo.allowed_branches.contains(home) {
                return Err(ProfileError::HomeBranchNotAllowed(home.clone()));
            }
        }
        if let Some(home) = &geo.home_province {
            if !geo.allowed_provinces.contains(home) {
                return Err(ProfileError::HomeProvinceNotAllowed(home.clone()));
            }
        }
        Ok(())
    }
}

/// Storage/wire shape of a profile as it sits on the user record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub authority: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub geographic: Option<GeographicRecord>,
    #[serde(default)]
    pub departments: Vec<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographicRecord {
    pub scope: Option<String>,
    #[serde(default)]
    pub allowed_provinces: Vec<String>,
    #[serde(default)]
    pub allowed_branches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_branch: Option<String>,
}

impl From<AccessProfile> for ProfileRecord {
    fn from(profile: AccessProfile) -> Self {
        let permissions = match profile.permissions {
            PermissionSet::All => vec![WILDCARD_PERMISSION.to_string()],
            PermissionSet::Explicit(set) => set.into_iter().collect(),
        };
        let geo = profile.geographic;
        ProfileRecord {
            authority: Some(profile.authority.as_str().to_string()),
            permissions,
            geographic: Some(GeographicRecord {
                scope: Some(geo.scope.as_str().to_string()),
                allowed_provinces: geo.allowed_provinces.into_iter().collect(),
                allowed_branches: geo.allowed_branches.into_iter().collect(),
                home_province: geo.home_province,
                home_branch: geo.home_branch,
            }),
            departments: profile.departments.iter().map(|d| d.as_str().to_string()).collect(),
            is_active: Some(profile.is_active),
        }
    }
}
