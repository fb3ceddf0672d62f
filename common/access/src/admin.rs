//! Administrative mutations of stored profiles.
//!
//! This is the only write path for access profiles: provisioning, permanent
//! role assignment, and the reversible role switch used by support staff.
//! Each mutation is a single read-modify-write against the [`ProfileStore`]
//! followed by an audit event. The resolvers never depend on anything here.

use std::sync::Arc;

use chrono::Utc;
use common_audit::{AuditActor, AuditProducer, AuditSeverity};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::factory::{RoleConfigurationFactory, RoleSelection};
use crate::geography::GeographyTable;
use crate::profile::AccessProfile;
use crate::store::{ProfileSnapshot, ProfileStore, SnapshotWrite, StoreError};

pub const ENTITY_ACCESS_PROFILE: &str = "access_profile";
pub const ACTION_PROVISIONED: &str = "profile.provisioned";
pub const ACTION_ROLE_ASSIGNED: &str = "profile.role_assigned";
pub const ACTION_ROLE_SWITCHED: &str = "profile.role_switched";
pub const ACTION_RESTORED: &str = "profile.restored";

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("no access profile stored for user '{0}'")]
    UserNotFound(String),
    #[error("no captured profile to restore for user '{0}'")]
    NoSnapshot(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AdminResult<T> = Result<T, AdminError>;

/// Who is performing an administrative mutation.
#[derive(Debug, Clone, Default)]
pub struct Operator {
    pub actor: AuditActor,
    pub trace_id: Option<Uuid>,
}

impl Operator {
    pub fn new(actor: AuditActor, trace_id: Option<Uuid>) -> Self {
        Self { actor, trace_id }
    }

    fn label(&self) -> &str {
        self.actor.id.as_deref().unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChange {
    pub profile: AccessProfile,
    /// False when the call found nothing to do; no event is emitted then.
    pub changed: bool,
    /// False when the change was persisted but the audit sink refused the event.
    pub audited: bool,
    /// Set by role switches that captured the previous profile.
    pub snapshot_captured: bool,
}

#[derive(Clone)]
pub struct ProfileAdmin {
    store: Arc<dyn ProfileStore>,
    geography: Arc<GeographyTable>,
    audit: AuditProducer,
}

impl ProfileAdmin {
    pub fn new(store: Arc<dyn ProfileStore>, geography: Arc<GeographyTable>, audit: AuditProducer) -> Self {
        Self { store, geography, audit }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    pub fn geography(&self) -> &GeographyTable {
        &self.geography
    }

    pub fn factory(&self) -> RoleConfigurationFactory<'_> {
        RoleConfigurationFactory::new(&self.geography)
    }

    /// Write the pending profile unless the user already has one.
    pub async fn provision(&self, operator: &Operator, user_id: &str) -> AdminResult<ProfileChange> {
        if let Some(existing) = self.store.get_profile(user_id).await? {
            return Ok(ProfileChange { profile: existing, changed: false, audited: false, snapshot_captured: false });
        }
        let profile = AccessProfile::pending();
        self.store.put_profile(user_id, &profile).await?;
        info!(user_id, operator = operator.label(), "access profile provisioned");
        let audited = self
            .audit(operator, user_id, ACTION_PROVISIONED, AuditSeverity::Info, json!({ "profile": &profile }))
            .await;
        Ok(ProfileChange { profile, changed: true, audited, snapshot_captured: false })
    }

    /// Permanent assignment. Supersedes any pending role switch, so the
    /// captured snapshot is discarded.
    pub async fn assign_role(
        &self,
        operator: &Operator,
        user_id: &str,
        selection: &RoleSelection,
    ) -> AdminResult<ProfileChange> {
        let previous = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AdminError::UserNotFound(user_id.to_string()))?;
        let profile = self.factory().build(selection);
        self.store.write_profile(user_id, &profile, SnapshotWrite::Clear).await?;
        info!(user_id, operator = operator.label(), role = %selection.role, "role assigned");
        let payload = json!({
            "selection": selection,
            "previous_authority": previous.authority(),
            "profile": &profile,
        });
        let audited = self
            .audit(operator, user_id, ACTION_ROLE_ASSIGNED, AuditSeverity::Security, payload)
            .await;
        Ok(ProfileChange { profile, changed: true, audited, snapshot_captured: false })
    }

    /// Temporarily replace the user's profile with one built for `selection`.
    ///
    /// The profile in place before the *first* switch is captured; switching
    /// again keeps that original so a restore always returns to it.
    pub async fn apply_profile(
        &self,
        operator: &Operator,
        user_id: &str,
        selection: &RoleSelection,
    ) -> AdminResult<ProfileChange> {
        let current = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AdminError::UserNotFound(user_id.to_string()))?;

        let snapshot = if self.store.get_snapshot(user_id).await?.is_none() {
            SnapshotWrite::Set(ProfileSnapshot {
                profile: current,
                captured_at: Utc::now(),
                captured_by: operator.actor.id.clone(),
                switched_to: selection.role,
            })
        } else {
            SnapshotWrite::Keep
        };
        let snapshot_captured = matches!(snapshot, SnapshotWrite::Set(_));

        let profile = self.factory().build(selection);
        self.store.write_profile(user_id, &profile, snapshot).await?;
        info!(
            user_id,
            operator = operator.label(),
            role = %selection.role,
            snapshot_captured,
            "role switch applied"
        );
        let payload = json!({
            "selection": selection,
            "snapshot_captured": snapshot_captured,
            "profile": &profile,
        });
        let audited = self
            .audit(operator, user_id, ACTION_ROLE_SWITCHED, AuditSeverity::Security, payload)
            .await;
        Ok(ProfileChange { profile, changed: true, audited, snapshot_captured })
    }

    /// Reinstate the profile captured by the first role switch.
    pub async fn restore_profile(&self, operator: &Operator, user_id: &str) -> AdminResult<ProfileChange> {
        let snapshot = self
            .store
            .get_snapshot(user_id)
            .await?
            .ok_or_else(|| AdminError::NoSnapshot(user_id.to_string()))?;
        self.store.write_profile(user_id, &snapshot.profile, SnapshotWrite::Clear).await?;
        info!(user_id, operator = operator.label(), switched_to = %snapshot.switched_to, "profile restored");
        let payload = json!({
            "captured_at": snapshot.captured_at,
            "captured_by": snapshot.captured_by,
            "switched_to": snapshot.switched_to,
            "profile": &snapshot.profile,
        });
        let audited = self
            .audit(operator, user_id, ACTION_RESTORED, AuditSeverity::Security, payload)
            .await;
        Ok(ProfileChange { profile: snapshot.profile, changed: true, audited, snapshot_captured: false })
    }

    async fn audit(
        &self,
        operator: &Operator,
        user_id: &str,
        action: &str,
        severity: AuditSeverity,
        payload: serde_json::Value,
    ) -> bool {
        match self
            .audit
            .emit(
                operator.actor.clone(),
                ENTITY_ACCESS_PROFILE,
                Some(user_id.to_string()),
                action,
                severity,
                operator.trace_id,
                payload,
            )
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!(?err, user_id, action, trace_id = ?operator.trace_id, "failed to emit access audit event");
                false
            }
        }
    }
}
