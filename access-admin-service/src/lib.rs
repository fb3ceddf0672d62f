pub mod app;
pub mod config;
pub mod handlers;
pub mod pg_audit;
pub mod pg_store;

pub use app::{bootstrap_super_admins, build_router, AppState};
pub use config::{load_admin_config, AdminConfig, AuditSinkKind};
pub use pg_audit::PgAuditSink;
pub use pg_store::PgProfileStore;
