//! Breakdown row model for database persistence

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::ticket::{
    ApprovalForm, ApprovalStatus, ClosureForm, OpenForm, StageTimestamps, TemporaryForm, Ticket,
};

/// One row of the `breakdowns` table
///
/// Stage forms are flattened into nullable columns. A stage form exists when
/// any of its columns is non-null.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BreakdownRow {
    pub breakdown_id: String,
    pub user_id: String,

    pub open_at: String,
    pub temporary_at: Option<String>,
    pub closure_at: Option<String>,
    pub approval_at: Option<String>,

    pub machine_id: String,
    pub machine_family: String,
    pub breakdown_type: String,
    pub production_stopped: bool,
    pub problem_description: String,
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
    pub approval_status: Option<String>,
    pub approval_approved: Option<bool>,
}

/// Format a timestamp for storage (fixed precision, sorts lexically)
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{}': {}", value, e))
}

fn parse_optional(value: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    value.map(parse_timestamp).transpose()
}

impl BreakdownRow {
    /// Flatten a ticket into a row
    pub fn from_ticket(ticket: &Ticket) -> Self {
        let temporary = ticket.temporary_form.as_ref();
        let closure = ticket.closure_form.as_ref();
        let approval = ticket.approval_form.as_ref();
        let ts = &ticket.timestamps;

        Self {
            breakdown_id: ticket.ticket_id.clone(),
            user_id: ticket.owner_id.clone(),
            open_at: format_timestamp(ts.open),
            temporary_at: ts.temporary.map(format_timestamp),
            closure_at: ts.closure.map(format_timestamp),
            approval_at: ts.approval.map(format_timestamp),
            machine_id: ticket.open_form.machine_id.clone(),
            machine_family: ticket.open_form.machine_family.clone(),
            breakdown_type: ticket.open_form.breakdown_type.clone(),
            production_stopped: ticket.open_form.production_stopped,
            problem_description: ticket.open_form.problem_description.clone(),
            open_media_url: ticket.open_form.media_url.clone(),
            temporary_maintenance_id: temporary.map(|f| f.maintenance_id.clone()),
            corrective_action: temporary.map(|f| f.corrective_action.clone()),
            spare_used: temporary.map(|f| f.spare_used.clone()),
            temporary_approved: temporary.map(|f| f.approved),
            closure_maintenance_id: closure.map(|f| f.maintenance_id.clone()),
            analysis_report: closure.map(|f| f.analysis_report.clone()),
            closure_media_url: closure.and_then(|f| f.media_url.clone()),
            closure_approved: closure.map(|f| f.approved),
            approval_id: approval.map(|f| f.approval_id.clone()),
            approval_status: approval.map(|f| f.status.as_str().to_string()),
            approval_approved: approval.map(|f| f.approved),
        }
    }

    /// Rebuild the ticket held by this row
    pub fn into_ticket(self) -> Result<Ticket, String> {
        let timestamps = StageTimestamps {
            open: parse_timestamp(&self.open_at)?,
            temporary: parse_optional(self.temporary_at.as_deref())?,
            closure: parse_optional(self.closure_at.as_deref())?,
            approval: parse_optional(self.approval_at.as_deref())?,
        };

        let temporary_form = if self.temporary_maintenance_id.is_some()
            || self.corrective_action.is_some()
            || self.spare_used.is_some()
            || self.temporary_approved.is_some()
        {
            Some(TemporaryForm {
                maintenance_id: self.temporary_maintenance_id.unwrap_or_default(),
                corrective_action: self.corrective_action.unwrap_or_default(),
                spare_used: self.spare_used.unwrap_or_default(),
                approved: self.temporary_approved.unwrap_or(false),
            })
        } else {
            None
        };

        let closure_form = if self.closure_maintenance_id.is_some()
            || self.analysis_report.is_some()
            || self.closure_media_url.is_some()
            || self.closure_approved.is_some()
        {
            Some(ClosureForm {
                maintenance_id: self.closure_maintenance_id.unwrap_or_default(),
                analysis_report: self.analysis_report.unwrap_or_default(),
                media_url: self.closure_media_url,
                approved: self.closure_approved.unwrap_or(false),
            })
        } else {
            None
        };

        let approval_form = if self.approval_id.is_some()
            || self.approval_status.is_some()
            || self.approval_approved.is_some()
        {
            let status = self
                .approval_status
                .as_deref()
                .map(str::parse::<ApprovalStatus>)
                .transpose()?
                .unwrap_or_default();
            Some(ApprovalForm {
                approval_id: self.approval_id.unwrap_or_default(),
                status,
                approved: self.approval_approved.unwrap_or(false),
            })
        } else {
            None
        };

        Ok(Ticket {
            ticket_id: self.breakdown_id,
            owner_id: self.user_id,
            timestamps,
            open_form: OpenForm {
                machine_id: self.machine_id,
                machine_family: self.machine_family,
                breakdown_type: self.breakdown_type,
                production_stopped: self.production_stopped,
                problem_description: self.problem_description,
                media_url: self.open_media_url,
            },
            temporary_form,
            closure_form,
            approval_form,
        })
    }
}
