use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
    pub id: String,
    pub name: String,
    pub branches: Vec<Branch>,
}

#[derive(Debug, Error)]
pub enum GeographyError {
    #[error("geography table has no provinces")]
    Empty,
    #[error("province '{0}' has no branches")]
    NoBranches(String),
    #[error("duplicate province id '{0}'")]
    DuplicateProvince(String),
    #[error("duplicate branch id '{0}'")]
    DuplicateBranch(String),
    #[error("failed to read geography file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse geography json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct GeographyRecord {
    provinces: Vec<Province>,
}

/// Static province -> branch mapping for the dealership network.
///
/// The first province (and its first branch) act as the defaults when a
/// selector is omitted.
#[derive(Debug, Clone, Serialize)]
pub struct GeographyTable {
    provinces: Vec<Province>,
    #[serde(skip)]
    branch_parent: BTreeMap<String, String>,
}

static BUILTIN: Lazy<GeographyTable> = Lazy::new(|| {
    fn province(id: &str, name: &str, branches: &[(&str, &str)]) -> Province {
        Province {
            id: id.to_string(),
            name: name.to_string(),
            branches: branches
                .iter()
                .map(|(id, name)| Branch { id: id.to_string(), name: name.to_string() })
                .collect(),
        }
    }
    let provinces = vec![
        province(
            "nakhon-ratchasima",
            "Nakhon Ratchasima",
            &[("0450", "Korat Head Office"), ("NMA002", "Pak Chong"), ("NMA003", "Sikhio")],
        ),
        province(
            "nakhon-sawan",
            "Nakhon Sawan",
            &[("NSN001", "Nakhon Sawan Main"), ("NSN002", "Takhli"), ("NSN003", "Nong Bua")],
        ),
    ];
    match GeographyTable::new(provinces) {
        Ok(table) => table,
        Err(err) => panic!("built-in geography table is inconsistent: {err}"),
    }
});

impl GeographyTable {
    pub fn new(provinces: Vec<Province>) -> Result<Self, GeographyError> {
        if provinces.is_empty() {
            return Err(GeographyError::Empty);
        }
        let mut seen_provinces = BTreeSet::new();
        let mut branch_parent = BTreeMap::new();
        for province in &provinces {
            if !seen_provinces.insert(province.id.clone()) {
                return Err(GeographyError::DuplicateProvince(province.id.clone()));
            }
            if province.branches.is_empty() {
                return Err(GeographyError::NoBranches(province.id.clone()));
            }
            for branch in &province.branches {
                if branch_parent.insert(branch.id.clone(), province.id.clone()).is_some() {
                    return Err(GeographyError::DuplicateBranch(branch.id.clone()));
                }
            }
        }
        Ok(Self { provinces, branch_parent })
    }

    /// The dealership network compiled into the crate.
    pub fn builtin() -> &'static GeographyTable {
        &BUILTIN
    }

    pub fn from_json_str(raw: &str) -> Result<Self, GeographyError> {
        let record: GeographyRecord = serde_json::from_str(raw)?;
        Self::new(record.provinces)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GeographyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn provinces(&self) -> &[Province] {
        &self.provinces
    }

    pub fn province(&self, province_id: &str) -> Option<&Province> {
        self.provinces.iter().find(|p| p.id == province_id)
    }

    pub fn contains_province(&self, province_id: &str) -> bool {
        self.province(province_id).is_some()
    }

    pub fn contains_branch(&self, branch_id: &str) -> bool {
        self.branch_parent.contains_key(branch_id)
    }

    pub fn province_of(&self, branch_id: &str) -> Option<&str> {
        self.branch_parent.get(branch_id).map(String::as_str)
    }

    pub fn branches_of(&self, province_id: &str) -> impl Iterator<Item = &str> {
        self.province(province_id)
            .into_iter()
            .flat_map(|p| p.branches.iter().map(|b| b.id.as_str()))
    }

    pub fn province_ids(&self) -> BTreeSet<String> {
        self.provinces.iter().map(|p| p.id.clone()).collect()
    }

    pub fn branch_ids(&self) -> BTreeSet<String> {
        self.branch_parent.keys().cloned().collect()
    }

    pub fn default_province(&self) -> &Province {
        // `new` rejects empty tables
        &self.provinces[0]
    }

    /// First branch of the province, or of the default province when unknown.
    pub fn default_branch_for(&self, province_id: &str) -> &str {
        let province = self.province(province_id).unwrap_or_else(|| self.default_province());
        // `new` rejects provinces without branches
        province.branches[0].id.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_indexes_branch_parents() {
        let geo = GeographyTable::builtin();
        assert_eq!(geo.province_of("0450"), Some("nakhon-ratchasima"));
        assert_eq!(geo.province_of("NSN001"), Some("nakhon-sawan"));
        assert_eq!(geo.province_of("XYZ"), None);
        assert_eq!(geo.default_province().id, "nakhon-ratchasima");
        assert_eq!(geo.default_branch_for("nakhon-sawan"), "NSN001");
        assert_eq!(geo.default_branch_for("nowhere"), "0450");
    }

    #[test]
    fn rejects_duplicate_branches_across_provinces() {
        let raw = r#"{"provinces":[
            {"id":"a","name":"A","branches":[{"id":"B1","name":"one"}]},
            {"id":"b","name":"B","branches":[{"id":"B1","name":"again"}]}
        ]}"#;
        assert!(matches!(GeographyTable::from_json_str(raw), Err(GeographyError::DuplicateBranch(id)) if id == "B1"));
    }

    #[test]
    fn rejects_empty_province() {
        let raw = r#"{"provinces":[{"id":"a","name":"A","branches":[]}]}"#;
        assert!(matches!(GeographyTable::from_json_str(raw), Err(GeographyError::NoBranches(_))));
        assert!(matches!(GeographyTable::from_json_str(r#"{"provinces":[]}"#), Err(GeographyError::Empty)));
    }
}
