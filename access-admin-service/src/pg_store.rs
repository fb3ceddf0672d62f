use std::sync::Arc;

use async_trait::async_trait;
use common_access::{
    AccessProfile, GeographyTable, ProfileError, ProfileSnapshot, ProfileStore, SnapshotRecord, SnapshotWrite,
    StoreError, StoreResult,
};
use serde_json::Value;
use sqlx::PgPool;

/// Profiles kept as JSONB in `access_profiles`, one row per user.
///
/// The profile and its snapshot share a row, so `write_profile` is a single
/// statement. Records are validated against the geography table on every read and write,
/// so hand-edited rows surface as `StoreError::InvalidProfile`.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
    geography: Arc<GeographyTable>,
}

impl PgProfileStore {
    pub fn new(pool: PgPool, geography: Arc<GeographyTable>) -> Self {
        Self { pool, geography }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn invalid(user_id: &str, source: ProfileError) -> StoreError {
        StoreError::InvalidProfile { user_id: user_id.to_string(), source }
    }
}

const UPSERT_WITH_SNAPSHOT: &str = "INSERT INTO access_profiles (user_id, profile, snapshot) VALUES ($1, $2, $3) \
     ON CONFLICT (user_id) DO UPDATE SET profile = EXCLUDED.profile, snapshot = EXCLUDED.snapshot, updated_at = NOW()";

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<AccessProfile>> {
        let raw = sqlx::query_scalar::<_, Value>("SELECT profile FROM access_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match raw {
            None => Ok(None),
            Some(value) => AccessProfile::from_json(value, &self.geography)
                .map(Some)
                .map_err(|e| Self::invalid(user_id, e)),
        }
    }

    async fn get_snapshot(&self, user_id: &str) -> StoreResult<Option<ProfileSnapshot>> {
        let raw = sqlx::query_scalar::<_, Option<Value>>("SELECT snapshot FROM access_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .flatten();
        let Some(value) = raw else {
            return Ok(None);
        };
        let record: SnapshotRecord = serde_json::from_value(value)
            .map_err(|e| Self::invalid(user_id, ProfileError::Malformed(e.to_string())))?;
        record
            .into_snapshot(&self.geography)
            .map(Some)
            .map_err(|e| Self::invalid(user_id, e))
    }

    async fn write_profile(&self, user_id: &str, profile: &AccessProfile, snapshot: SnapshotWrite) -> StoreResult<()> {
        profile.validate(&self.geography).map_err(|e| Self::invalid(user_id, e))?;
        let record = serde_json::to_value(profile).map_err(|e| StoreError::Backend(e.to_string()))?;
        let query = match snapshot {
            SnapshotWrite::Keep => sqlx::query(
                "INSERT INTO access_profiles (user_id, profile) VALUES ($1, $2) \
                 ON CONFLICT (user_id) DO UPDATE SET profile = EXCLUDED.profile, updated_at = NOW()",
            )
            .bind(user_id)
            .bind(record),
            SnapshotWrite::Set(snapshot) => {
                snapshot.profile.validate(&self.geography).map_err(|e| Self::invalid(user_id, e))?;
                let saved = serde_json::to_value(SnapshotRecord::from(snapshot))
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                sqlx::query(UPSERT_WITH_SNAPSHOT).bind(user_id).bind(record).bind(Some(saved))
            }
            SnapshotWrite::Clear => sqlx::query(UPSERT_WITH_SNAPSHOT)
                .bind(user_id)
                .bind(record)
                .bind(None::<Value>),
        };
        query.execute(&self.pool).await.map_err(backend)?;
        Ok(())
    }
}
