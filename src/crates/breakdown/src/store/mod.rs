//! Ticket store contract
//!
//! The lifecycle engine talks to persistence only through [`TicketStore`].
//! Matching and updating a ticket happen in one atomic step
//! ([`TicketStore::find_one_and_update`]), so a stage precondition and the
//! write it guards cannot be split by a concurrent request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::ticket::{ApprovalForm, ApprovalStatus, ClosureForm, Stage, TemporaryForm, Ticket};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryTicketStore;
pub use sqlite::SqliteTicketStore;

/// Errors returned by a ticket store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A ticket with this identifier already exists
    #[error("Duplicate breakdown id: {0}")]
    Duplicate(String),

    /// A persisted record could not be turned back into a ticket
    #[error("Corrupt breakdown record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    /// Backend failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Predicate selecting tickets
///
/// All present conditions must hold. An empty filter matches every ticket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub ticket_id: Option<String>,
    pub owner_id: Option<String>,
    /// Stages that must already be stamped
    pub stamped: Vec<Stage>,
    /// Stages that must not be stamped yet
    pub unstamped: Vec<Stage>,
}

impl TicketFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(ticket_id: impl Into<String>) -> Self {
        Self {
            ticket_id: Some(ticket_id.into()),
            ..Self::default()
        }
    }

    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn requires(mut self, stage: Stage) -> Self {
        self.stamped.push(stage);
        self
    }

    pub fn excludes(mut self, stage: Stage) -> Self {
        self.unstamped.push(stage);
        self
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        if let Some(ref id) = self.ticket_id {
            if ticket.ticket_id != *id {
                return false;
            }
        }
        if let Some(ref owner) = self.owner_id {
            if ticket.owner_id != *owner {
                return false;
            }
        }
        self.stamped.iter().all(|s| ticket.timestamps.is_set(*s))
            && self.unstamped.iter().all(|s| !ticket.timestamps.is_set(*s))
    }
}

/// Sparse set of field overwrites
///
/// `None` leaves the stored value untouched. Fields can be overwritten but
/// never cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPatch {
    pub machine_id: Option<String>,
    pub machine_family: Option<String>,
    pub breakdown_type: Option<String>,
    pub production_stopped: Option<bool>,
    pub problem_description: Option<String>,
    pub open_media_url: Option<String>,

    pub temporary_maintenance_id: Option<String>,
    pub corrective_action: Option<String>,
    pub spare_used: Option<String>,
    pub temporary_approved: Option<bool>,

    pub closure_maintenance_id: Option<String>,
    pub analysis_report: Option<String>,
    pub closure_media_url: Option<String>,
    pub closure_approved: Option<bool>,

    pub approval_id: Option<String>,
    pub approval_status: Option<ApprovalStatus>,
    pub approval_approved: Option<bool>,

    pub open_at: Option<DateTime<Utc>>,
    pub temporary_at: Option<DateTime<Utc>>,
    pub closure_at: Option<DateTime<Utc>>,
    pub approval_at: Option<DateTime<Utc>>,
}

impl TicketPatch {
    /// Stamp `stage` with `at`
    pub fn stamp(mut self, stage: Stage, at: DateTime<Utc>) -> Self {
        match stage {
            Stage::Open => self.open_at = Some(at),
            Stage::Temporary => self.temporary_at = Some(at),
            Stage::Closure => self.closure_at = Some(at),
            Stage::Approval => self.approval_at = Some(at),
        }
        self
    }

    pub fn stamp_for(&self, stage: Stage) -> Option<DateTime<Utc>> {
        match stage {
            Stage::Open => self.open_at,
            Stage::Temporary => self.temporary_at,
            Stage::Closure => self.closure_at,
            Stage::Approval => self.approval_at,
        }
    }

    fn touches_temporary(&self) -> bool {
        self.temporary_maintenance_id.is_some()
            || self.corrective_action.is_some()
            || self.spare_used.is_some()
            || self.temporary_approved.is_some()
    }

    fn touches_closure(&self) -> bool {
        self.closure_maintenance_id.is_some()
            || self.analysis_report.is_some()
            || self.closure_media_url.is_some()
            || self.closure_approved.is_some()
    }

    fn touches_approval(&self) -> bool {
        self.approval_id.is_some() || self.approval_status.is_some() || self.approval_approved.is_some()
    }

    fn touches_open(&self) -> bool {
        self.machine_id.is_some()
            || self.machine_family.is_some()
            || self.breakdown_type.is_some()
            || self.production_stopped.is_some()
            || self.problem_description.is_some()
            || self.open_media_url.is_some()
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        !self.touches_open()
            && !self.touches_temporary()
            && !self.touches_closure()
            && !self.touches_approval()
            && Stage::ALL.iter().all(|s| self.stamp_for(*s).is_none())
    }

    /// Apply the overwrites to an in-memory ticket
    ///
    /// A stage form that did not exist yet is created with default values for
    /// the fields the patch leaves out.
    pub fn apply(&self, ticket: &mut Ticket) {
        let open = &mut ticket.open_form;
        overwrite(&mut open.machine_id, &self.machine_id);
        overwrite(&mut open.machine_family, &self.machine_family);
        overwrite(&mut open.breakdown_type, &self.breakdown_type);
        overwrite(&mut open.production_stopped, &self.production_stopped);
        overwrite(&mut open.problem_description, &self.problem_description);
        if self.open_media_url.is_some() {
            open.media_url = self.open_media_url.clone();
        }

        if self.touches_temporary() {
            let form = ticket.temporary_form.get_or_insert_with(TemporaryForm::default);
            overwrite(&mut form.maintenance_id, &self.temporary_maintenance_id);
            overwrite(&mut form.corrective_action, &self.corrective_action);
            overwrite(&mut form.spare_used, &self.spare_used);
            overwrite(&mut form.approved, &self.temporary_approved);
        }

        if self.touches_closure() {
            let form = ticket.closure_form.get_or_insert_with(ClosureForm::default);
            overwrite(&mut form.maintenance_id, &self.closure_maintenance_id);
            overwrite(&mut form.analysis_report, &self.analysis_report);
            overwrite(&mut form.approved, &self.closure_approved);
            if self.closure_media_url.is_some() {
                form.media_url = self.closure_media_url.clone();
            }
        }

        if self.touches_approval() {
            let form = ticket.approval_form.get_or_insert_with(ApprovalForm::default);
            overwrite(&mut form.approval_id, &self.approval_id);
            overwrite(&mut form.status, &self.approval_status);
            overwrite(&mut form.approved, &self.approval_approved);
        }

        for stage in Stage::ALL {
            if let Some(at) = self.stamp_for(stage) {
                ticket.timestamps.set(stage, at);
            }
        }
    }
}

fn overwrite<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

/// Durable keyed ticket storage
///
/// Listing operations return tickets newest first (by open timestamp).
#[async_trait]
pub trait TicketStore: Send + Sync + 'static {
    /// Insert a new ticket. Fails with [`StoreError::Duplicate`] if the id exists.
    async fn insert(&self, ticket: &Ticket) -> StoreResult<()>;

    /// Atomically apply `patch` to the newest ticket matching `filter`
    ///
    /// Returns the updated ticket, or `None` when nothing matched. The match
    /// and the write are one step: no other writer can change the ticket
    /// between them.
    async fn find_one_and_update(
        &self,
        filter: &TicketFilter,
        patch: &TicketPatch,
    ) -> StoreResult<Option<Ticket>>;

    /// Newest ticket matching `filter`
    async fn find_one(&self, filter: &TicketFilter) -> StoreResult<Option<Ticket>>;

    /// Every ticket matching `filter`
    async fn find_many(&self, filter: &TicketFilter) -> StoreResult<Vec<Ticket>>;

    /// Delete the newest ticket matching `filter`. Returns whether one was removed.
    async fn delete_one(&self, filter: &TicketFilter) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::OpenForm;

    fn ticket() -> Ticket {
        Ticket::open(
            "U1",
            OpenForm {
                machine_id: "M-12".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_filter_matches_owner_and_stages() {
        let t = ticket();
        let id = t.ticket_id.clone();

        assert!(TicketFilter::all().matches(&t));
        assert!(TicketFilter::by_id(&id).with_owner("U1").matches(&t));
        assert!(!TicketFilter::by_id(&id).with_owner("U2").matches(&t));
        assert!(!TicketFilter::by_id("BD-OTHER").matches(&t));
        assert!(TicketFilter::by_id(&id)
            .requires(Stage::Open)
            .excludes(Stage::Temporary)
            .matches(&t));
        assert!(!TicketFilter::by_id(&id).requires(Stage::Temporary).matches(&t));
    }

    #[test]
    fn test_empty_patch() {
        assert!(TicketPatch::default().is_empty());
        assert!(!TicketPatch::default().stamp(Stage::Closure, Utc::now()).is_empty());
        let patch = TicketPatch {
            spare_used: Some("belt".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_apply_creates_missing_stage_form() {
        let mut t = ticket();
        let at = Utc::now();
        let patch = TicketPatch {
            closure_maintenance_id: Some("CLS-1".to_string()),
            ..Default::default()
        }
        .stamp(Stage::Closure, at);

        patch.apply(&mut t);

        let closure = t.closure_form.as_ref().unwrap();
        assert_eq!(closure.maintenance_id, "CLS-1");
        assert_eq!(closure.analysis_report, "");
        assert!(!closure.approved);
        assert_eq!(t.timestamps.closure, Some(at));
        assert!(t.temporary_form.is_none());
        assert!(t.timestamps.temporary.is_none());
    }

    #[test]
    fn test_apply_leaves_untouched_fields() {
        let mut t = ticket();
        t.open_form.problem_description = "belt snapped".to_string();
        t.open_form.media_url = Some("/uploads/a.jpg".to_string());

        let patch = TicketPatch {
            machine_family: Some("Press".to_string()),
            production_stopped: Some(true),
            ..Default::default()
        };
        patch.apply(&mut t);

        assert_eq!(t.open_form.machine_id, "M-12");
        assert_eq!(t.open_form.machine_family, "Press");
        assert!(t.open_form.production_stopped);
        assert_eq!(t.open_form.problem_description, "belt snapped");
        assert_eq!(t.open_form.media_url.as_deref(), Some("/uploads/a.jpg"));
    }
}
