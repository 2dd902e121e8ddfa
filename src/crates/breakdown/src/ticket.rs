//! Breakdown ticket domain model
//!
//! A ticket moves through four stages: open, temporary fix, closure and
//! approval. Each stage carries its own form data and a timestamp that is
//! stamped when the stage is written.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Lifecycle stage of a breakdown ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Breakdown reported
    Open,
    /// Temporary fix applied
    Temporary,
    /// Root cause analysed and closed
    Closure,
    /// Closure reviewed
    Approval,
}

impl Stage {
    /// All stages in lifecycle order
    pub const ALL: [Stage; 4] = [Stage::Open, Stage::Temporary, Stage::Closure, Stage::Approval];

    /// The stage that must be stamped before this one can be written
    pub fn predecessor(self) -> Option<Stage> {
        match self {
            Stage::Open => None,
            Stage::Temporary => Some(Stage::Open),
            Stage::Closure => Some(Stage::Temporary),
            Stage::Approval => Some(Stage::Closure),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Open => "open",
            Stage::Temporary => "temporary",
            Stage::Closure => "closure",
            Stage::Approval => "approval",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded on the approval stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Approved,
    Rejected,
    #[default]
    Pending,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
            ApprovalStatus::Pending => "Pending",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Approved" => Ok(ApprovalStatus::Approved),
            "Rejected" => Ok(ApprovalStatus::Rejected),
            "Pending" => Ok(ApprovalStatus::Pending),
            other => Err(format!(
                "Invalid status '{}'. Must be: Approved, Rejected, or Pending",
                other
            )),
        }
    }
}

/// Per-stage timestamps. `open` is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimestamps {
    pub open: DateTime<Utc>,
    pub temporary: Option<DateTime<Utc>>,
    pub closure: Option<DateTime<Utc>>,
    pub approval: Option<DateTime<Utc>>,
}

impl StageTimestamps {
    pub fn opened_at(at: DateTime<Utc>) -> Self {
        Self {
            open: at,
            temporary: None,
            closure: None,
            approval: None,
        }
    }

    pub fn get(&self, stage: Stage) -> Option<DateTime<Utc>> {
        match stage {
            Stage::Open => Some(self.open),
            Stage::Temporary => self.temporary,
            Stage::Closure => self.closure,
            Stage::Approval => self.approval,
        }
    }

    pub fn is_set(&self, stage: Stage) -> bool {
        self.get(stage).is_some()
    }

    pub fn set(&mut self, stage: Stage, at: DateTime<Utc>) {
        match stage {
            Stage::Open => self.open = at,
            Stage::Temporary => self.temporary = Some(at),
            Stage::Closure => self.closure = Some(at),
            Stage::Approval => self.approval = Some(at),
        }
    }
}

/// Data captured when the breakdown is reported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenForm {
    pub machine_id: String,
    pub machine_family: String,
    pub breakdown_type: String,
    pub production_stopped: bool,
    pub problem_description: String,
    pub media_url: Option<String>,
}

/// Temporary fix applied by maintenance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryForm {
    pub maintenance_id: String,
    pub corrective_action: String,
    pub spare_used: String,
    #[serde(rename = "isApproved")]
    pub approved: bool,
}

/// Closure analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureForm {
    pub maintenance_id: String,
    pub analysis_report: String,
    pub media_url: Option<String>,
    #[serde(rename = "isApproved")]
    pub approved: bool,
}

/// Final review of the closure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalForm {
    pub approval_id: String,
    pub status: ApprovalStatus,
    #[serde(rename = "isApproved")]
    pub approved: bool,
}

/// A breakdown ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(rename = "breakdownId")]
    pub ticket_id: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub timestamps: StageTimestamps,
    pub open_form: OpenForm,
    pub temporary_form: Option<TemporaryForm>,
    pub closure_form: Option<ClosureForm>,
    pub approval_form: Option<ApprovalForm>,
}

impl Ticket {
    /// Create a freshly opened ticket with a new identifier
    pub fn open(owner_id: impl Into<String>, open_form: OpenForm, at: DateTime<Utc>) -> Self {
        Self {
            ticket_id: generate_ticket_id(at),
            owner_id: owner_id.into(),
            timestamps: StageTimestamps::opened_at(at),
            open_form,
            temporary_form: None,
            closure_form: None,
            approval_form: None,
        }
    }

    /// Latest stage that has been stamped
    pub fn current_stage(&self) -> Stage {
        Stage::ALL
            .iter()
            .rev()
            .copied()
            .find(|stage| self.timestamps.is_set(*stage))
            .unwrap_or(Stage::Open)
    }

    /// Media references held by the open and closure stages
    pub fn media_urls(&self) -> Vec<&str> {
        let closure = self
            .closure_form
            .as_ref()
            .and_then(|form| form.media_url.as_deref());
        self.open_form
            .media_url
            .as_deref()
            .into_iter()
            .chain(closure)
            .collect()
    }
}

/// Generate a ticket identifier: `BD-<base36 millis>-<4 random base36 chars>`
pub fn generate_ticket_id(at: DateTime<Utc>) -> String {
    let millis = u64::try_from(at.timestamp_millis()).unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("BD-{}-{}", to_base36(millis), suffix)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
