//! Spreadsheet mirror
//!
//! After every mutation the whole ticket collection is flattened into rows
//! and pushed to a [`MirrorSink`], replacing whatever the sink held before.
//! Syncing is best-effort: failures are logged and never reach the caller of
//! the mutation, and nothing is retried until the next mutation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::store::{StoreError, TicketFilter, TicketStore};
use crate::ticket::Ticket;

pub mod http;

pub use http::HttpMirrorSink;

/// Column headers, in row order
pub const HEADERS: [&str; 23] = [
    "Breakdown ID",
    "User ID",
    "Open Timestamp",
    "Machine ID",
    "Machine Family",
    "Breakdown Type",
    "Production Stopped",
    "Problem Description",
    "Problem Media",
    "Temporary Timestamp",
    "Temporary Maintenance ID",
    "Temporary Corrective Action",
    "Temporary Spare Used",
    "Temporary Approved",
    "Closure Timestamp",
    "Closure Maintenance ID",
    "Closure Analysis Report",
    "Closure Media",
    "Closure Approved",
    "Approval Timestamp",
    "Approval ID",
    "Approval Status",
    "Approval Approved",
];

/// Errors raised while publishing to a sink
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Mirror request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mirror rejected rows with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to snapshot tickets: {0}")]
    Snapshot(#[from] StoreError),
}

/// External tabular sink
#[async_trait]
pub trait MirrorSink: Send + Sync + 'static {
    /// Replace the sink's content with `rows`
    async fn replace_all(&self, headers: &[&str], rows: &[Vec<String>]) -> Result<(), MirrorError>;
}

/// Sink used when mirroring is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMirrorSink;

#[async_trait]
impl MirrorSink for NoopMirrorSink {
    async fn replace_all(&self, _headers: &[&str], _rows: &[Vec<String>]) -> Result<(), MirrorError> {
        Ok(())
    }
}

/// Human-readable timestamp used in mirrored rows
pub fn format_mirror_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

/// Flatten a ticket into one row matching [`HEADERS`]
pub fn flatten(ticket: &Ticket) -> Vec<String> {
    let ts = &ticket.timestamps;
    let time = |at: Option<DateTime<Utc>>| at.map(format_mirror_time).unwrap_or_default();
    let open = &ticket.open_form;
    let temporary = ticket.temporary_form.as_ref();
    let closure = ticket.closure_form.as_ref();
    let approval = ticket.approval_form.as_ref();

    vec![
        ticket.ticket_id.clone(),
        ticket.owner_id.clone(),
        format_mirror_time(ts.open),
        open.machine_id.clone(),
        open.machine_family.clone(),
        open.breakdown_type.clone(),
        yes_no(open.production_stopped),
        open.problem_description.clone(),
        open.media_url.clone().unwrap_or_default(),
        time(ts.temporary),
        temporary.map(|f| f.maintenance_id.clone()).unwrap_or_default(),
        temporary.map(|f| f.corrective_action.clone()).unwrap_or_default(),
        temporary.map(|f| f.spare_used.clone()).unwrap_or_default(),
        temporary.map(|f| yes_no(f.approved)).unwrap_or_default(),
        time(ts.closure),
        closure.map(|f| f.maintenance_id.clone()).unwrap_or_default(),
        closure.map(|f| f.analysis_report.clone()).unwrap_or_default(),
        closure.and_then(|f| f.media_url.clone()).unwrap_or_default(),
        closure.map(|f| yes_no(f.approved)).unwrap_or_default(),
        time(ts.approval),
        approval.map(|f| f.approval_id.clone()).unwrap_or_default(),
        approval
            .map(|f| f.status.as_str())
            .unwrap_or("Pending")
            .to_string(),
        approval.map(|f| yes_no(f.approved)).unwrap_or_default(),
    ]
}

/// Republishes the full ticket set to a sink
///
/// Runs are serialized and each one snapshots the store after it acquires
/// the lock, so a later run never publishes an older snapshot than an
/// earlier one.
#[derive(Clone)]
pub struct MirrorSync {
    store: Arc<dyn TicketStore>,
    sink: Arc<dyn MirrorSink>,
    lock: Arc<Mutex<()>>,
}

impl MirrorSync {
    pub fn new(store: Arc<dyn TicketStore>, sink: Arc<dyn MirrorSink>) -> Self {
        Self {
            store,
            sink,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Snapshot the store and replace the sink's rows. Returns the row count.
    pub async fn sync_now(&self) -> Result<usize, MirrorError> {
        let _guard = self.lock.lock().await;
        let tickets = self.store.find_many(&TicketFilter::all()).await?;
        let rows: Vec<Vec<String>> = tickets.iter().map(flatten).collect();
        self.sink.replace_all(&HEADERS, &rows).await?;
        Ok(rows.len())
    }

    /// Run a sync in the background
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match this.sync_now().await {
                Ok(count) => tracing::info!(rows = count, "mirrored breakdowns"),
                Err(e) => tracing::warn!(error = %e, "mirror sync failed"),
            }
        })
    }
}
