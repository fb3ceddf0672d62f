use std::sync::Arc;

use access_admin_service::{
    bootstrap_super_admins, build_router, load_admin_config, AppState, AuditSinkKind, PgAuditSink, PgProfileStore,
};
use anyhow::Context;
use common_access::{GeographyTable, InMemoryProfileStore, ProfileAdmin, ProfileStore};
use common_audit::{AuditProducer, BufferedAuditSink, NoopAuditSink, TracingAuditSink};
use common_observability::AccessMetrics;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_admin_config()?;

    let geography = match &config.geography_path {
        Some(path) => GeographyTable::from_path(path)
            .with_context(|| format!("Failed to load geography table from {}", path.display()))?,
        None => GeographyTable::builtin().clone(),
    };
    let geography = Arc::new(geography);

    let pool = match &config.database_url {
        Some(url) => Some(PgPool::connect(url).await.context("Failed to connect to DATABASE_URL")?),
        None => None,
    };

    let store: Arc<dyn ProfileStore> = match &pool {
        Some(pool) => {
            let store = PgProfileStore::new(pool.clone(), geography.clone());
            store.migrate().await?;
            info!("using postgres profile store");
            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set; using in-memory profile store");
            Arc::new(InMemoryProfileStore::new(geography.clone()))
        }
    };

    let audit = match (config.audit_sink, &pool) {
        (AuditSinkKind::Postgres, Some(pool)) => AuditProducer::new(PgAuditSink::new(pool.clone())),
        (AuditSinkKind::Postgres, None) => anyhow::bail!("AUDIT_SINK=postgres requires DATABASE_URL"),
        (AuditSinkKind::Tracing, _) => AuditProducer::new(TracingAuditSink),
        (AuditSinkKind::Memory, _) => {
            warn!("AUDIT_SINK=memory keeps audit events in process only");
            AuditProducer::new(BufferedAuditSink::default())
        }
        (AuditSinkKind::Noop, _) => AuditProducer::new(NoopAuditSink),
    }
    .with_source_service(config.audit_source_service.clone());
    info!(sink = ?config.audit_sink, "audit sink selected");

    let state = AppState::new(ProfileAdmin::new(store, geography, audit), Arc::new(AccessMetrics::new()));

    let seeded = bootstrap_super_admins(&state, &config.bootstrap_super_admins)
        .await
        .context("Failed to seed bootstrap super admins")?;
    if !seeded.is_empty() {
        info!(count = seeded.len(), "seeded bootstrap super admins");
    }

    let app = build_router(state, &config.cors_origins);

    let addr = config.addr();
    info!(%addr, "starting access-admin-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
