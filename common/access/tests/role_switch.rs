use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common_access::{
    has_permission, AccessProfile, AdminError, Authority, GeographyTable, InMemoryProfileStore, Operator, ProfileAdmin,
    ProfileSnapshot, ProfileStore, RoleName, RoleSelection, SnapshotWrite, StoreError, StoreResult,
};
use common_audit::{AuditActor, AuditError, AuditEvent, AuditProducer, AuditResult, AuditSink, BufferedAuditSink};

fn setup() -> (ProfileAdmin, InMemoryProfileStore, BufferedAuditSink) {
    let geography = Arc::new(GeographyTable::builtin().clone());
    let store = InMemoryProfileStore::new(geography.clone());
    let sink = BufferedAuditSink::default();
    let audit = AuditProducer::new(sink.clone()).with_source_service("access-tests");
    let admin = ProfileAdmin::new(Arc::new(store.clone()), geography, audit);
    (admin, store, sink)
}

fn operator() -> Operator {
    Operator::new(AuditActor::user("support-1"), None)
}

#[tokio::test]
async fn provision_is_idempotent() {
    let (admin, store, sink) = setup();
    let first = admin.provision(&operator(), "u1").await.unwrap();
    assert_eq!(first.profile, AccessProfile::pending());
    assert!(first.changed);
    let second = admin.provision(&operator(), "u1").await.unwrap();
    assert_eq!(second.profile, AccessProfile::pending());
    assert!(!second.changed);
    assert!(!second.audited);
    assert_eq!(store.len().await, 1);
    assert_eq!(sink.events().await.len(), 1);
}

#[tokio::test]
async fn switch_then_restore_returns_original() {
    let (admin, store, sink) = setup();
    admin.provision(&operator(), "u1").await.unwrap();
    let original = admin
        .assign_role(&operator(), "u1", &RoleSelection::new(RoleName::SalesStaff).branch("NSN002"))
        .await
        .unwrap()
        .profile;

    let switched = admin
        .apply_profile(&operator(), "u1", &RoleSelection::new(RoleName::AccountingStaff).branch("0450"))
        .await
        .unwrap();
    assert!(switched.snapshot_captured);
    assert!(switched.audited);
    assert!(has_permission(&switched.profile, "accounting.edit"));

    // second switch keeps the first snapshot
    let again = admin
        .apply_profile(&operator(), "u1", &RoleSelection::new(RoleName::BranchManager))
        .await
        .unwrap();
    assert!(!again.snapshot_captured);
    assert_eq!(store.get_profile("u1").await.unwrap().unwrap().authority(), Authority::BranchManager);

    let restored = admin.restore_profile(&operator(), "u1").await.unwrap();
    assert_eq!(restored.profile, original);
    assert_eq!(store.get_profile("u1").await.unwrap(), Some(original));
    assert!(store.get_snapshot("u1").await.unwrap().is_none());

    let actions: Vec<_> = sink.events().await.into_iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            "profile.provisioned",
            "profile.role_assigned",
            "profile.role_switched",
            "profile.role_switched",
            "profile.restored"
        ]
    );
}

#[tokio::test]
async fn restore_without_switch_is_an_error() {
    let (admin, _store, _sink) = setup();
    admin.provision(&operator(), "u1").await.unwrap();
    assert!(matches!(admin.restore_profile(&operator(), "u1").await, Err(AdminError::NoSnapshot(u)) if u == "u1"));
}

#[tokio::test]
async fn switch_requires_existing_user() {
    let (admin, _store, _sink) = setup();
    let res = admin.apply_profile(&operator(), "ghost", &RoleSelection::new(RoleName::HrStaff)).await;
    assert!(matches!(res, Err(AdminError::UserNotFound(_))));
}

#[tokio::test]
async fn assignment_discards_pending_switch() {
    let (admin, store, _sink) = setup();
    admin.provision(&operator(), "u1").await.unwrap();
    admin.apply_profile(&operator(), "u1", &RoleSelection::new(RoleName::Executive)).await.unwrap();
    admin.assign_role(&operator(), "u1", &RoleSelection::new(RoleName::CreditStaff)).await.unwrap();
    assert!(store.get_snapshot("u1").await.unwrap().is_none());
    assert!(matches!(admin.restore_profile(&operator(), "u1").await, Err(AdminError::NoSnapshot(_))));
}

struct FailingSink;

#[async_trait]
impl AuditSink for FailingSink {
    async fn publish(&self, _event: &AuditEvent) -> AuditResult<()> {
        Err(AuditError::Sink("broker down".into()))
    }
}

#[tokio::test]
async fn audit_failure_does_not_roll_back_switch() {
    let geography = Arc::new(GeographyTable::builtin().clone());
    let store = InMemoryProfileStore::new(geography.clone());
    let admin = ProfileAdmin::new(Arc::new(store.clone()), geography, AuditProducer::new(FailingSink));
    admin.provision(&operator(), "u1").await.unwrap();
    let change = admin
        .apply_profile(&operator(), "u1", &RoleSelection::new(RoleName::ServiceStaff))
        .await
        .unwrap();
    assert!(!change.audited);
    assert_eq!(store.get_profile("u1").await.unwrap().unwrap().authority(), Authority::Staff);
}

/// Delegates to the in-memory store but refuses writes while `fail` is set.
struct FlakyStore {
    inner: InMemoryProfileStore,
    fail: AtomicBool,
}

#[async_trait]
impl ProfileStore for FlakyStore {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<AccessProfile>> {
        self.inner.get_profile(user_id).await
    }

    async fn get_snapshot(&self, user_id: &str) -> StoreResult<Option<ProfileSnapshot>> {
        self.inner.get_snapshot(user_id).await
    }

    async fn write_profile(&self, user_id: &str, profile: &AccessProfile, snapshot: SnapshotWrite) -> StoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection reset".into()));
        }
        self.inner.write_profile(user_id, profile, snapshot).await
    }
}

#[tokio::test]
async fn failed_assignment_keeps_profile_and_snapshot_together() {
    let geography = Arc::new(GeographyTable::builtin().clone());
    let inner = InMemoryProfileStore::new(geography.clone());
    let store = Arc::new(FlakyStore { inner: inner.clone(), fail: AtomicBool::new(false) });
    let admin = ProfileAdmin::new(store.clone(), geography, AuditProducer::dummy());

    admin.provision(&operator(), "u1").await.unwrap();
    let original = admin
        .assign_role(&operator(), "u1", &RoleSelection::new(RoleName::InventoryStaff).branch("NMA003"))
        .await
        .unwrap()
        .profile;
    let switched = admin
        .apply_profile(&operator(), "u1", &RoleSelection::new(RoleName::Executive))
        .await
        .unwrap()
        .profile;

    store.fail.store(true, Ordering::SeqCst);
    let res = admin.assign_role(&operator(), "u1", &RoleSelection::new(RoleName::HrStaff)).await;
    assert!(matches!(res, Err(AdminError::Store(StoreError::Backend(_)))));
    assert_eq!(inner.get_profile("u1").await.unwrap(), Some(switched));
    assert!(inner.get_snapshot("u1").await.unwrap().is_some());

    store.fail.store(false, Ordering::SeqCst);
    let restored = admin.restore_profile(&operator(), "u1").await.unwrap();
    assert_eq!(restored.profile, original);
    assert!(inner.get_snapshot("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn switch_that_fails_to_persist_captures_nothing() {
    let geography = Arc::new(GeographyTable::builtin().clone());
    let inner = InMemoryProfileStore::new(geography.clone());
    let store = Arc::new(FlakyStore { inner: inner.clone(), fail: AtomicBool::new(false) });
    let admin = ProfileAdmin::new(store.clone(), geography, AuditProducer::dummy());
    admin.provision(&operator(), "u1").await.unwrap();

    store.fail.store(true, Ordering::SeqCst);
    assert!(admin.apply_profile(&operator(), "u1", &RoleSelection::new(RoleName::SuperAdmin)).await.is_err());
    assert_eq!(inner.get_profile("u1").await.unwrap(), Some(AccessProfile::pending()));
    assert!(inner.get_snapshot("u1").await.unwrap().is_none());
}
