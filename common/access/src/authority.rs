use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Authority levels, declared from broadest to narrowest so the derived
/// ordering reads "smaller is more powerful".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authority {
    SuperAdmin,
    Executive,
    ProvinceManager,
    BranchManager,
    Staff,
    Pending,
}

impl Authority {
    pub const ALL: [Authority; 6] = [
        Authority::SuperAdmin,
        Authority::Executive,
        Authority::ProvinceManager,
        Authority::BranchManager,
        Authority::Staff,
        Authority::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Authority::SuperAdmin => "SUPER_ADMIN",
            Authority::Executive => "EXECUTIVE",
            Authority::ProvinceManager => "PROVINCE_MANAGER",
            Authority::BranchManager => "BRANCH_MANAGER",
            Authority::Staff => "STAFF",
            Authority::Pending => "PENDING",
        }
    }

    /// Management authorities hold wildcard permissions and geography.
    pub fn is_management(&self) -> bool {
        matches!(self, Authority::SuperAdmin | Authority::Executive)
    }

    /// Management may hand out any authority; everyone else only strictly lower ones.
    pub fn can_grant(&self, target: Authority) -> bool {
        self.is_management() || *self < target
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Authority {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Authority::ALL
            .into_iter()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| ProfileError::UnknownAuthority(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_broadest_first() {
        assert!(Authority::SuperAdmin < Authority::Executive);
        assert!(Authority::BranchManager < Authority::Staff);
        assert!(Authority::Staff < Authority::Pending);
    }

    #[test]
    fn management_grants_anything() {
        for target in Authority::ALL {
            assert!(Authority::Executive.can_grant(target));
        }
    }

    #[test]
    fn managers_cannot_escalate() {
        assert!(Authority::BranchManager.can_grant(Authority::Staff));
        assert!(!Authority::BranchManager.can_grant(Authority::BranchManager));
        assert!(!Authority::BranchManager.can_grant(Authority::ProvinceManager));
        assert!(!Authority::Pending.can_grant(Authority::Pending));
    }

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("branch_manager".parse::<Authority>().unwrap(), Authority::BranchManager);
        assert_eq!("Province-Manager".parse::<Authority>().unwrap(), Authority::ProvinceManager);
        assert!(matches!("owner".parse::<Authority>(), Err(ProfileError::UnknownAuthority(_))));
    }
}
