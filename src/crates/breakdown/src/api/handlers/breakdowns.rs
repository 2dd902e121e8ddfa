//! End-user breakdown handlers
//!
//! Stage operations are scoped by the `userId` sent with the request. A
//! ticket owned by someone else is reported exactly like a missing one.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};

use super::form::MultipartForm;
use crate::api::error::ApiResult;
use crate::api::middleware::{parse_flag, validate_not_empty};
use crate::api::models::{
    AdvanceApprovalRequest, AdvanceTemporaryRequest, OpenedResponse, SingleBreakdownResponse,
};
use crate::api::routes::AppState;
use crate::services::{ClosureInput, OpenInput};
use crate::ticket::Ticket;

/// POST /api/breakdowns/open
pub async fn open_breakdown(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<OpenedResponse>> {
    let mut form = MultipartForm::read(multipart).await?;
    form.forbid_file("userId")?;

    let owner_id = form.take_text("userId");
    validate_not_empty(&owner_id, "userId")?;
    let machine_id = form.take_text("machineId");
    validate_not_empty(&machine_id, "machineId")?;
    let production_stopped = match form.text("productionStopped") {
        Some(value) => parse_flag(value, "productionStopped")?,
        None => false,
    };

    let input = OpenInput {
        owner_id,
        machine_id,
        machine_family: form.take_text("machineFamily"),
        breakdown_type: form.take_text("breakdownType"),
        production_stopped,
        problem_description: form.take_text("problemDescription"),
        media: form.take_file("media"),
    };

    let breakdown_id = state.engine.open(input).await?;
    Ok(Json(OpenedResponse { breakdown_id }))
}

/// PUT /api/breakdowns/:id/temporary
pub async fn advance_temporary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AdvanceTemporaryRequest>,
) -> ApiResult<Json<Ticket>> {
    let (owner_id, input) = req.into_parts();
    validate_not_empty(&owner_id, "userId")?;

    let ticket = state.engine.advance_temporary(&id, &owner_id, input).await?;
    Ok(Json(ticket))
}

/// PUT /api/breakdowns/:id/closure
pub async fn advance_closure(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Ticket>> {
    let mut form = MultipartForm::read(multipart).await?;
    let owner_id = form.take_text("userId");
    validate_not_empty(&owner_id, "userId")?;

    let input = ClosureInput {
        maintenance_id: form.take_text("maintenanceId"),
        analysis_report: form.take_text("analysisReport"),
        media: form.take_file("media"),
    };

    let ticket = state.engine.advance_closure(&id, &owner_id, input).await?;
    Ok(Json(ticket))
}

/// PUT /api/breakdowns/:id/approval
pub async fn advance_approval(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AdvanceApprovalRequest>,
) -> ApiResult<Json<Ticket>> {
    let (owner_id, input) = req.into_parts();
    validate_not_empty(&owner_id, "userId")?;

    let ticket = state.engine.advance_approval(&id, &owner_id, input).await?;
    Ok(Json(ticket))
}

/// GET /api/breakdowns/:userId
pub async fn list_for_owner(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Ticket>>> {
    let tickets = state.engine.list_for_owner(&user_id).await?;
    Ok(Json(tickets))
}

/// GET /api/breakdowns/single/:id
pub async fn get_breakdown(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SingleBreakdownResponse>> {
    tracing::debug!(breakdown_id = %id, "fetching breakdown");
    let ticket = state.engine.get(&id).await?;
    Ok(Json(SingleBreakdownResponse::new(ticket)))
}
