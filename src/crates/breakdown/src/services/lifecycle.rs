//! Breakdown lifecycle engine
//!
//! Validates and applies stage transitions. Every non-admin transition is a
//! single guarded update against the store: the filter carries the owner, the
//! predecessor stage that must already be stamped, and the target stage that
//! must not be. A ticket that fails any of those conditions is reported the
//! same way as a ticket that does not exist.

use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::allowlist::Allowlists;
use crate::attachments::{AttachmentError, AttachmentManager, Upload};
use crate::mirror::MirrorSync;
use crate::services::admin::AdminIdentity;
use crate::store::{StoreError, TicketFilter, TicketPatch, TicketStore};
use crate::ticket::{ApprovalStatus, OpenForm, Stage, Ticket};

/// Errors raised by lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Owner mismatch, missing ticket or unmet stage precondition
    #[error("Not authorized or breakdown not found")]
    NotAuthorizedOrNotFound,

    #[error("Invalid {stage} code: {code}")]
    InvalidCode { stage: Stage, code: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Breakdown not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Attachment(#[from] AttachmentError),
}

pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

/// Fields for opening a ticket
#[derive(Debug, Clone, Default)]
pub struct OpenInput {
    pub owner_id: String,
    pub machine_id: String,
    pub machine_family: String,
    pub breakdown_type: String,
    pub production_stopped: bool,
    pub problem_description: String,
    pub media: Option<Upload>,
}

/// Fields for the temporary fix stage
#[derive(Debug, Clone, Default)]
pub struct TemporaryInput {
    pub maintenance_id: String,
    pub corrective_action: String,
    pub spare_used: String,
}

/// Fields for the closure stage
#[derive(Debug, Clone, Default)]
pub struct ClosureInput {
    pub maintenance_id: String,
    pub analysis_report: String,
    pub media: Option<Upload>,
}

/// Fields for the approval stage
#[derive(Debug, Clone, Default)]
pub struct ApprovalInput {
    pub approval_id: String,
    /// One of `Approved`, `Rejected` or `Pending`
    pub status: String,
}

/// Sparse admin overwrite
///
/// Present identifying fields (`machine_id`, the two maintenance ids and
/// `approval_id`) restamp their stage.
#[derive(Debug, Clone, Default)]
pub struct AdminEdit {
    pub machine_id: Option<String>,
    pub machine_family: Option<String>,
    pub breakdown_type: Option<String>,
    pub production_stopped: Option<bool>,
    pub problem_description: Option<String>,
    pub open_media: Option<Upload>,

    pub temporary_maintenance_id: Option<String>,
    pub corrective_action: Option<String>,
    pub spare_used: Option<String>,

    pub closure_maintenance_id: Option<String>,
    pub analysis_report: Option<String>,
    pub closure_media: Option<Upload>,

    pub approval_id: Option<String>,
    pub approval_status: Option<String>,
}

/// The lifecycle state machine
#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn TicketStore>,
    allowlists: Arc<Allowlists>,
    attachments: AttachmentManager,
    mirror: MirrorSync,
}

/// Current instant at the precision the store keeps
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn require(value: &str, field: &str) -> LifecycleResult<()> {
    if value.trim().is_empty() {
        return Err(LifecycleError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn parse_status(status: &str) -> LifecycleResult<ApprovalStatus> {
    status.parse().map_err(LifecycleError::Validation)
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn TicketStore>,
        allowlists: Arc<Allowlists>,
        attachments: AttachmentManager,
        mirror: MirrorSync,
    ) -> Self {
        Self {
            store,
            allowlists,
            attachments,
            mirror,
        }
    }

    pub fn allowlists(&self) -> &Allowlists {
        &self.allowlists
    }

    pub fn attachments(&self) -> &AttachmentManager {
        &self.attachments
    }

    fn check_code(&self, stage: Stage, code: &str) -> LifecycleResult<()> {
        if self.allowlists.is_approved(stage, code) {
            Ok(())
        } else {
            debug!(%stage, code, "code not in allowlist");
            Err(LifecycleError::InvalidCode {
                stage,
                code: code.to_string(),
            })
        }
    }

    /// Store an optional upload, returning its reference
    async fn store_media(&self, media: Option<&Upload>) -> LifecycleResult<Option<String>> {
        match media {
            Some(upload) => Ok(Some(self.attachments.store(upload).await?)),
            None => Ok(None),
        }
    }

    /// Discard blobs stored for a write that did not happen
    async fn discard_uncommitted(&self, urls: &[Option<String>]) {
        let removed = self
            .attachments
            .discard_all(urls.iter().filter_map(|u| u.as_deref()))
            .await;
        if removed > 0 {
            debug!(removed, "discarded media of failed write");
        }
    }

    /// Apply a guarded stage update, discarding `media` if it does not land
    async fn advance(
        &self,
        stage: Stage,
        ticket_id: &str,
        owner_id: &str,
        patch: TicketPatch,
        media: Option<String>,
    ) -> LifecycleResult<Ticket> {
        let mut filter = TicketFilter::by_id(ticket_id)
            .with_owner(owner_id)
            .excludes(stage);
        if let Some(predecessor) = stage.predecessor() {
            filter = filter.requires(predecessor);
        }

        let outcome = self.store.find_one_and_update(&filter, &patch).await;
        let ticket = match outcome {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                self.discard_uncommitted(&[media]).await;
                return Err(LifecycleError::NotAuthorizedOrNotFound);
            }
            Err(e) => {
                self.discard_uncommitted(&[media]).await;
                return Err(e.into());
            }
        };

        info!(breakdown_id = %ticket.ticket_id, %stage, "advanced breakdown");
        self.mirror.schedule();
        Ok(ticket)
    }

    /// Open a new ticket and return its identifier
    pub async fn open(&self, input: OpenInput) -> LifecycleResult<String> {
        require(&input.owner_id, "userId")?;
        require(&input.machine_id, "machineId")?;

        let media_url = self.store_media(input.media.as_ref()).await?;
        let form = OpenForm {
            machine_id: input.machine_id,
            machine_family: input.machine_family,
            breakdown_type: input.breakdown_type,
            production_stopped: input.production_stopped,
            problem_description: input.problem_description,
            media_url: media_url.clone(),
        };
        let ticket = Ticket::open(input.owner_id, form, now());

        if let Err(e) = self.store.insert(&ticket).await {
            self.discard_uncommitted(&[media_url]).await;
            return Err(e.into());
        }

        info!(
            breakdown_id = %ticket.ticket_id,
            user_id = %ticket.owner_id,
            machine_id = %ticket.open_form.machine_id,
            "opened breakdown"
        );
        self.mirror.schedule();
        Ok(ticket.ticket_id)
    }

    /// Record the temporary fix on an open ticket
    pub async fn advance_temporary(
        &self,
        ticket_id: &str,
        owner_id: &str,
        input: TemporaryInput,
    ) -> LifecycleResult<Ticket> {
        self.check_code(Stage::Temporary, &input.maintenance_id)?;

        let patch = TicketPatch {
            temporary_maintenance_id: Some(input.maintenance_id.trim().to_string()),
            corrective_action: Some(input.corrective_action),
            spare_used: Some(input.spare_used),
            temporary_approved: Some(true),
            ..Default::default()
        }
        .stamp(Stage::Temporary, now());

        self.advance(Stage::Temporary, ticket_id, owner_id, patch, None)
            .await
    }

    /// Record the closure analysis on a ticket with a temporary fix
    pub async fn advance_closure(
        &self,
        ticket_id: &str,
        owner_id: &str,
        input: ClosureInput,
    ) -> LifecycleResult<Ticket> {
        self.check_code(Stage::Closure, &input.maintenance_id)?;

        let media_url = self.store_media(input.media.as_ref()).await?;
        let patch = TicketPatch {
            closure_maintenance_id: Some(input.maintenance_id.trim().to_string()),
            analysis_report: Some(input.analysis_report),
            closure_media_url: media_url.clone(),
            closure_approved: Some(true),
            ..Default::default()
        }
        .stamp(Stage::Closure, now());

        self.advance(Stage::Closure, ticket_id, owner_id, patch, media_url)
            .await
    }

    /// Record the approval decision on a closed ticket
    pub async fn advance_approval(
        &self,
        ticket_id: &str,
        owner_id: &str,
        input: ApprovalInput,
    ) -> LifecycleResult<Ticket> {
        let status = parse_status(&input.status)?;
        self.check_code(Stage::Approval, &input.approval_id)?;

        let patch = TicketPatch {
            approval_id: Some(input.approval_id.trim().to_string()),
            approval_status: Some(status),
            approval_approved: Some(true),
            ..Default::default()
        }
        .stamp(Stage::Approval, now());

        self.advance(Stage::Approval, ticket_id, owner_id, patch, None)
            .await
    }

    /// Overwrite any fields of a ticket, bypassing stage gating
    ///
    /// Codes are not validated, but each stage's approved flag is recomputed
    /// from its allowlist when its code is overwritten. Replaced media is
    /// removed once the update commits.
    pub async fn admin_full_edit(
        &self,
        admin: &AdminIdentity,
        ticket_id: &str,
        edit: AdminEdit,
    ) -> LifecycleResult<Ticket> {
        let by_id = TicketFilter::by_id(ticket_id);
        let existing = self
            .store
            .find_one(&by_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(ticket_id.to_string()))?;

        let approval_status = edit
            .approval_status
            .as_deref()
            .map(parse_status)
            .transpose()?;

        let at = now();
        let mut patch = TicketPatch {
            machine_family: edit.machine_family,
            breakdown_type: edit.breakdown_type,
            production_stopped: edit.production_stopped,
            problem_description: edit.problem_description,
            corrective_action: edit.corrective_action,
            spare_used: edit.spare_used,
            analysis_report: edit.analysis_report,
            approval_status,
            ..Default::default()
        };

        if let Some(machine_id) = edit.machine_id {
            patch.machine_id = Some(machine_id);
            patch = patch.stamp(Stage::Open, at);
        }
        if let Some(code) = edit.temporary_maintenance_id {
            patch.temporary_approved = Some(self.allowlists.is_approved(Stage::Temporary, &code));
            patch.temporary_maintenance_id = Some(code.trim().to_string());
            patch = patch.stamp(Stage::Temporary, at);
        }
        if let Some(code) = edit.closure_maintenance_id {
            patch.closure_approved = Some(self.allowlists.is_approved(Stage::Closure, &code));
            patch.closure_maintenance_id = Some(code.trim().to_string());
            patch = patch.stamp(Stage::Closure, at);
        }
        if let Some(code) = edit.approval_id {
            patch.approval_approved = Some(self.allowlists.is_approved(Stage::Approval, &code));
            patch.approval_id = Some(code.trim().to_string());
            patch = patch.stamp(Stage::Approval, at);
        }

        let open_media = self.store_media(edit.open_media.as_ref()).await?;
        let closure_media = match self.store_media(edit.closure_media.as_ref()).await {
            Ok(url) => url,
            Err(e) => {
                self.discard_uncommitted(&[open_media]).await;
                return Err(e);
            }
        };
        patch.open_media_url = open_media.clone();
        patch.closure_media_url = closure_media.clone();

        if patch.is_empty() {
            debug!(breakdown_id = ticket_id, "admin edit with no changes");
            return Ok(existing);
        }

        let outcome = self.store.find_one_and_update(&by_id, &patch).await;
        let updated = match outcome {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                self.discard_uncommitted(&[open_media, closure_media]).await;
                return Err(LifecycleError::NotFound(ticket_id.to_string()));
            }
            Err(e) => {
                self.discard_uncommitted(&[open_media, closure_media]).await;
                return Err(e.into());
            }
        };

        let replaced_open = open_media
            .and(existing.open_form.media_url.as_deref())
            .filter(|old| updated.open_form.media_url.as_deref() != Some(*old));
        let replaced_closure = closure_media
            .and(
                existing
                    .closure_form
                    .as_ref()
                    .and_then(|f| f.media_url.as_deref()),
            )
            .filter(|old| {
                updated.closure_form.as_ref().and_then(|f| f.media_url.as_deref()) != Some(*old)
            });
        self.attachments
            .discard_all(replaced_open.into_iter().chain(replaced_closure))
            .await;

        info!(
            breakdown_id = %updated.ticket_id,
            admin = admin.username(),
            "admin edited breakdown"
        );
        self.mirror.schedule();
        Ok(updated)
    }

    /// Permanently delete a ticket and its media
    pub async fn admin_full_delete(
        &self,
        admin: &AdminIdentity,
        ticket_id: &str,
    ) -> LifecycleResult<()> {
        let by_id = TicketFilter::by_id(ticket_id);
        let ticket = self
            .store
            .find_one(&by_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(ticket_id.to_string()))?;

        if !self.store.delete_one(&by_id).await? {
            warn!(breakdown_id = ticket_id, "breakdown vanished before delete");
            return Err(LifecycleError::NotFound(ticket_id.to_string()));
        }

        // The record is gone, so its media can no longer be referenced.
        let removed = self.attachments.discard_all(ticket.media_urls()).await;

        info!(
            breakdown_id = ticket_id,
            admin = admin.username(),
            media_removed = removed,
            "admin deleted breakdown"
        );
        self.mirror.schedule();
        Ok(())
    }

    /// Every ticket opened by `owner_id`, newest first
    pub async fn list_for_owner(&self, owner_id: &str) -> LifecycleResult<Vec<Ticket>> {
        require(owner_id, "userId")?;
        Ok(self.store.find_many(&TicketFilter::owned_by(owner_id)).await?)
    }

    /// Fetch a single ticket
    pub async fn get(&self, ticket_id: &str) -> LifecycleResult<Ticket> {
        self.store
            .find_one(&TicketFilter::by_id(ticket_id))
            .await?
            .ok_or_else(|| LifecycleError::NotFound(ticket_id.to_string()))
    }

    /// Every ticket, newest first
    pub async fn list_all(&self, admin: &AdminIdentity) -> LifecycleResult<Vec<Ticket>> {
        debug!(admin = admin.username(), "listing all breakdowns");
        Ok(self.store.find_many(&TicketFilter::all()).await?)
    }

    /// Read a stored attachment by filename
    pub async fn fetch_media(&self, filename: &str) -> LifecycleResult<Vec<u8>> {
        match self.attachments.read(filename).await {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) | Err(AttachmentError::InvalidReference(_)) => {
                Err(LifecycleError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
