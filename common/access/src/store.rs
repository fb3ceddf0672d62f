use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::ProfileError;
use crate::geography::GeographyTable;
use crate::profile::{AccessProfile, ProfileRecord};
use crate::roles::RoleName;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored profile for '{user_id}' is invalid: {source}")]
    InvalidProfile {
        user_id: String,
        #[source]
        source: ProfileError,
    },
    #[error("profile store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Profile captured before a role switch so it can be reinstated later.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub profile: AccessProfile,
    pub captured_at: DateTime<Utc>,
    pub captured_by: Option<String>,
    pub switched_to: RoleName,
}

/// Stored shape of a snapshot; the embedded profile is validated on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub profile: ProfileRecord,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub captured_by: Option<String>,
    pub switched_to: RoleName,
}

impl SnapshotRecord {
    pub fn into_snapshot(self, geography: &GeographyTable) -> Result<ProfileSnapshot, ProfileError> {
        Ok(ProfileSnapshot {
            profile: AccessProfile::from_record(self.profile, geography)?,
            captured_at: self.captured_at,
            captured_by: self.captured_by,
            switched_to: self.switched_to,
        })
    }
}

impl From<ProfileSnapshot> for SnapshotRecord {
    fn from(snapshot: ProfileSnapshot) -> Self {
        Self {
            profile: snapshot.profile.into(),
            captured_at: snapshot.captured_at,
            captured_by: snapshot.captured_by,
            switched_to: snapshot.switched_to,
        }
    }
}

/// What happens to the snapshot slot alongside a profile write.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotWrite {
    Keep,
    Set(ProfileSnapshot),
    Clear,
}

/// Persistence boundary for access profiles.
///
/// Implementations validate records when reading them back, so callers only
/// ever see well-formed profiles or an explicit `InvalidProfile` rejection.
/// `write_profile` must apply the profile and the snapshot change as one
/// unit: either both land or neither does.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<AccessProfile>>;
    async fn get_snapshot(&self, user_id: &str) -> StoreResult<Option<ProfileSnapshot>>;
    async fn write_profile(&self, user_id: &str, profile: &AccessProfile, snapshot: SnapshotWrite)
        -> StoreResult<()>;

    async fn put_profile(&self, user_id: &str, profile: &AccessProfile) -> StoreResult<()> {
        self.write_profile(user_id, profile, SnapshotWrite::Keep).await
    }
}

#[derive(Default)]
struct UserEntry {
    profile: Option<serde_json::Value>,
    snapshot: Option<SnapshotRecord>,
}

/// Process-local store keeping records in their stored JSON shape.
#[derive(Clone)]
pub struct InMemoryProfileStore {
    geography: Arc<GeographyTable>,
    users: Arc<RwLock<HashMap<String, UserEntry>>>,
}

impl InMemoryProfileStore {
    pub fn new(geography: Arc<GeographyTable>) -> Self {
        Self { geography, users: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Insert a record without validation, as an import of legacy data would.
    pub async fn insert_raw(&self, user_id: &str, record: serde_json::Value) {
        let mut users = self.users.write().await;
        users.entry(user_id.to_string()).or_default().profile = Some(record);
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.values().filter(|e| e.profile.is_some()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn invalid(user_id: &str, source: ProfileError) -> StoreError {
        StoreError::InvalidProfile { user_id: user_id.to_string(), source }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<AccessProfile>> {
        let users = self.users.read().await;
        let Some(raw) = users.get(user_id).and_then(|e| e.profile.clone()) else {
            return Ok(None);
        };
        AccessProfile::from_json(raw, &self.geography)
            .map(Some)
            .map_err(|e| Self::invalid(user_id, e))
    }

    async fn get_snapshot(&self, user_id: &str) -> StoreResult<Option<ProfileSnapshot>> {
        let users = self.users.read().await;
        let Some(record) = users.get(user_id).and_then(|e| e.snapshot.clone()) else {
            return Ok(None);
        };
        record
            .into_snapshot(&self.geography)
            .map(Some)
            .map_err(|e| Self::invalid(user_id, e))
    }

    async fn write_profile(
        &self,
        user_id: &str,
        profile: &AccessProfile,
        snapshot: SnapshotWrite,
    ) -> StoreResult<()> {
        profile.validate(&self.geography).map_err(|e| Self::invalid(user_id, e))?;
        if let SnapshotWrite::Set(s) = &snapshot {
            s.profile.validate(&self.geography).map_err(|e| Self::invalid(user_id, e))?;
        }
        let record = serde_json::to_value(profile).map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut users = self.users.write().await;
        let entry = users.entry(user_id.to_string()).or_default();
        entry.profile = Some(record);
        match snapshot {
            SnapshotWrite::Keep => {}
            SnapshotWrite::Set(s) => entry.snapshot = Some(s.into()),
            SnapshotWrite::Clear => entry.snapshot = None,
        }
        Ok(())
    }
}
