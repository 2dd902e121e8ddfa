//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

use breakdown::allowlist::{Allowlists, CodeSet};
use breakdown::api::AppState;
use breakdown::attachments::{AttachmentManager, LocalBlobStore};
use breakdown::config::AdminAccount;
use breakdown::db::DatabaseConnection;
use breakdown::mirror::{MirrorError, MirrorSink, MirrorSync};
use breakdown::services::{password_digest, AdminGate, LifecycleEngine};
use breakdown::store::{SqliteTicketStore, TicketStore};

pub const ADMIN_USER: &str = "superadmin";
pub const ADMIN_PASSWORD: &str = "admin123";

/// Mirror sink forwarding every published row set to a channel
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<Vec<Vec<String>>>,
}

#[async_trait]
impl MirrorSink for RecordingSink {
    async fn replace_all(&self, _headers: &[&str], rows: &[Vec<String>]) -> Result<(), MirrorError> {
        let _ = self.tx.send(rows.to_vec());
        Ok(())
    }
}

pub struct Harness {
    pub db: DatabaseConnection,
    pub store: Arc<dyn TicketStore>,
    pub engine: LifecycleEngine,
    pub gate: Arc<AdminGate>,
    pub mirrored: mpsc::UnboundedReceiver<Vec<Vec<String>>>,
    pub uploads: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let db = DatabaseConnection::with_max_connections("sqlite::memory:", 1)
            .await
            .expect("Failed to create test database");
        db.run_migrations().await.expect("Failed to run migrations");

        let uploads = tempfile::tempdir().expect("Failed to create upload dir");
        let store: Arc<dyn TicketStore> = Arc::new(SqliteTicketStore::new(db.clone()));
        let attachments =
            AttachmentManager::new(Arc::new(LocalBlobStore::new(uploads.path())), "/uploads");
        let (tx, mirrored) = mpsc::unbounded_channel();
        let mirror = MirrorSync::new(store.clone(), Arc::new(RecordingSink { tx }));
        let allowlists = Allowlists::new(
            CodeSet::new(["MNT-2023-001", "MNT-2023-002"]),
            CodeSet::new(["CLS-2023-001"]),
            CodeSet::new(["APPR-2023-001"]),
        );
        let engine = LifecycleEngine::new(store.clone(), Arc::new(allowlists), attachments, mirror);
        let gate = Arc::new(AdminGate::new(vec![AdminAccount {
            admin_id: "ADMIN-001".to_string(),
            username: ADMIN_USER.to_string(),
            password_sha256: password_digest(ADMIN_PASSWORD),
            full_name: "Super Admin".to_string(),
            role: "superadmin".to_string(),
            active: true,
        }]));

        Self {
            db,
            store,
            engine,
            gate,
            mirrored,
            uploads,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            db: self.db.clone(),
            engine: self.engine.clone(),
            gate: self.gate.clone(),
        }
    }

    /// Wait for the next mirror publication
    pub async fn next_mirror(&mut self) -> Vec<Vec<String>> {
        tokio::time::timeout(Duration::from_secs(5), self.mirrored.recv())
            .await
            .expect("mirror sync did not run")
            .expect("mirror channel closed")
    }

    /// Number of files currently in the upload directory
    pub async fn upload_count(&self) -> usize {
        let mut entries = tokio::fs::read_dir(self.uploads.path()).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        count
    }
}
