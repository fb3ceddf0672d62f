use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Accounting,
    Sales,
    Service,
    Inventory,
    Credit,
    Hr,
}

impl Department {
    pub const ALL: [Department; 6] = [
        Department::Accounting,
        Department::Sales,
        Department::Service,
        Department::Inventory,
        Department::Credit,
        Department::Hr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Accounting => "accounting",
            Department::Sales => "sales",
            Department::Service => "service",
            Department::Inventory => "inventory",
            Department::Credit => "credit",
            Department::Hr => "hr",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Department::ALL
            .into_iter()
            .find(|d| d.as_str() == key)
            .ok_or_else(|| ProfileError::UnknownDepartment(s.to_string()))
    }
}
