//! Wiring of configuration into the running service

use std::sync::Arc;

use crate::allowlist::Allowlists;
use crate::api::{AppState, RouterOptions};
use crate::attachments::{AttachmentManager, LocalBlobStore};
use crate::config::{MirrorConfig, ServerConfig};
use crate::db::DatabaseConnection;
use crate::mirror::{HttpMirrorSink, MirrorError, MirrorSink, MirrorSync, NoopMirrorSink};
use crate::services::{AdminGate, LifecycleEngine};
use crate::store::{SqliteTicketStore, TicketStore};

/// Choose the mirror sink for a configuration
pub fn mirror_sink(config: &MirrorConfig) -> Result<Arc<dyn MirrorSink>, MirrorError> {
    match config.endpoint.as_deref() {
        Some(endpoint) if config.enabled => {
            tracing::info!(endpoint, "mirroring breakdowns over HTTP");
            let sink = HttpMirrorSink::new(endpoint, config.get_token(), config.timeout())?;
            Ok(Arc::new(sink))
        }
        _ => {
            tracing::info!("mirror disabled");
            Ok(Arc::new(NoopMirrorSink))
        }
    }
}

/// Build the shared application state on top of an open database
pub fn build_state(
    db: DatabaseConnection,
    config: &ServerConfig,
    sink: Arc<dyn MirrorSink>,
) -> AppState {
    let store: Arc<dyn TicketStore> = Arc::new(SqliteTicketStore::new(db.clone()));
    let blobs = Arc::new(LocalBlobStore::new(config.uploads.dir.clone()));
    let attachments = AttachmentManager::new(blobs, config.uploads.public_prefix.clone());
    let mirror = MirrorSync::new(store.clone(), sink);
    let allowlists = Arc::new(Allowlists::from(&config.allowlists));

    AppState {
        db,
        engine: LifecycleEngine::new(store, allowlists, attachments, mirror),
        gate: Arc::new(AdminGate::new(config.admins.iter().cloned())),
    }
}

/// Router settings taken from configuration
pub fn router_options(config: &ServerConfig) -> RouterOptions {
    RouterOptions {
        max_body_bytes: config.uploads.max_upload_bytes,
        allowed_origins: config.cors.allowed_origins.clone(),
    }
}
