//! Admin breakdown handlers
//!
//! Every handler takes an [`Admin`] extractor, so requests without valid
//! Basic credentials are rejected before the handler body runs.

use axum::{
    async_trait,
    extract::{FromRequestParts, Multipart, Path, State},
    http::{header, request::Parts},
    response::IntoResponse,
    Json,
};

use super::form::MultipartForm;
use crate::api::error::{ApiError, ApiResult};
use crate::api::middleware::parse_flag;
use crate::api::models::DeletedResponse;
use crate::api::response;
use crate::api::routes::AppState;
use crate::services::{AdminEdit, AdminIdentity, GateError};

/// Authenticated admin making the request
#[derive(Debug, Clone)]
pub struct Admin(pub AdminIdentity);

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let authorization = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| GateError::MalformedCredentials)?),
            None => None,
        };
        let identity = state.gate.authenticate(authorization)?;
        Ok(Admin(identity))
    }
}

/// Build an admin edit from form fields. Blank fields are left untouched.
fn admin_edit_from_form(mut form: MultipartForm) -> ApiResult<AdminEdit> {
    let production_stopped = form
        .take_present("productionStopped")
        .map(|value| parse_flag(&value, "productionStopped"))
        .transpose()?;

    Ok(AdminEdit {
        machine_id: form.take_present("machineId"),
        machine_family: form.take_present("machineFamily"),
        breakdown_type: form.take_present("breakdownType"),
        production_stopped,
        problem_description: form.take_present("problemDescription"),
        open_media: form.take_file("openMedia"),
        temporary_maintenance_id: form.take_present("temporaryMaintenanceId"),
        corrective_action: form.take_present("correctiveAction"),
        spare_used: form.take_present("spareUsed"),
        closure_maintenance_id: form.take_present("closureMaintenanceId"),
        analysis_report: form.take_present("analysisReport"),
        closure_media: form.take_file("closureMedia"),
        approval_id: form.take_present("approvalId"),
        approval_status: form.take_present("status"),
    })
}

/// GET /api/admin/breakdowns
pub async fn list_all(
    Admin(admin): Admin,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let tickets = state.engine.list_all(&admin).await?;
    Ok(response::ok(tickets))
}

/// GET /api/admin/breakdowns/:id
pub async fn get_any(
    Admin(_admin): Admin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let ticket = state.engine.get(&id).await?;
    Ok(response::ok(ticket))
}

/// PUT /api/admin/breakdowns/:id
pub async fn full_edit(
    Admin(admin): Admin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = MultipartForm::read(multipart).await?;
    let edit = admin_edit_from_form(form)?;
    let ticket = state.engine.admin_full_edit(&admin, &id, edit).await?;
    Ok(response::ok(ticket))
}

/// DELETE /api/admin/breakdowns/:id
pub async fn full_delete(
    Admin(admin): Admin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    state.engine.admin_full_delete(&admin, &id).await?;
    Ok(Json(DeletedResponse::new(id)))
}
