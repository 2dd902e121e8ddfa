//! Breakdown request and response bodies

use serde::{Deserialize, Serialize};

use crate::services::{ApprovalInput, TemporaryInput};
use crate::ticket::Ticket;

/// Body of `PUT /api/breakdowns/:id/temporary`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceTemporaryRequest {
    pub user_id: String,
    #[serde(default)]
    pub maintenance_id: String,
    #[serde(default)]
    pub corrective_action: String,
    #[serde(default)]
    pub spare_used: String,
}

impl AdvanceTemporaryRequest {
    pub fn into_parts(self) -> (String, TemporaryInput) {
        (
            self.user_id,
            TemporaryInput {
                maintenance_id: self.maintenance_id,
                corrective_action: self.corrective_action,
                spare_used: self.spare_used,
            },
        )
    }
}

/// Body of `PUT /api/breakdowns/:id/approval`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceApprovalRequest {
    pub user_id: String,
    #[serde(default)]
    pub approval_id: String,
    #[serde(default)]
    pub status: String,
}

impl AdvanceApprovalRequest {
    pub fn into_parts(self) -> (String, ApprovalInput) {
        (
            self.user_id,
            ApprovalInput {
                approval_id: self.approval_id,
                status: self.status,
            },
        )
    }
}

/// Reply to a successful open
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedResponse {
    pub breakdown_id: String,
}

/// Reply to `GET /api/breakdowns/single/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleBreakdownResponse {
    pub success: bool,
    pub breakdown: Ticket,
}

impl SingleBreakdownResponse {
    pub fn new(breakdown: Ticket) -> Self {
        Self {
            success: true,
            breakdown,
        }
    }
}

/// Reply to an admin delete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
    pub breakdown_id: String,
}

impl DeletedResponse {
    pub fn new(breakdown_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message: "Breakdown deleted".to_string(),
            breakdown_id: breakdown_id.into(),
        }
    }
}
