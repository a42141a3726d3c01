use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AssignedBy, LeadId, PartnerId};
use super::eligibility::EligibilityError;
use super::service::LeadRoutingService;
use super::RoutingError;

/// Router builder exposing the assignment and recommendation endpoints.
pub fn routing_router(service: Arc<LeadRoutingService>) -> Router {
    Router::new()
        .route("/api/v1/leads/:lead_id/assign", post(assign_handler))
        .route("/api/v1/leads/assign/bulk", post(bulk_assign_handler))
        .route(
            "/api/v1/leads/:lead_id/recommendations",
            get(recommendations_handler),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignLeadRequest {
    #[serde(default)]
    partner_id: Option<String>,
    #[serde(default)]
    assigned_by: Option<AssignedBy>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkAssignRequest {
    lead_ids: Vec<String>,
    #[serde(default)]
    assigned_by: Option<AssignedBy>,
}

pub(crate) async fn assign_handler(
    State(service): State<Arc<LeadRoutingService>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<AssignLeadRequest>,
) -> Response {
    let target = request.partner_id.map(PartnerId);
    let assigned_by = request.assigned_by.unwrap_or(if target.is_some() {
        AssignedBy::Manual
    } else {
        AssignedBy::Auto
    });

    match service.assign(&LeadId(lead_id), assigned_by, target) {
        Ok(outcome) => {
            let payload = json!({
                "success": true,
                "lead": outcome.lead,
                "assigned_to": outcome.assigned_to,
                "score": outcome.score.total,
                "factors": outcome.score.factors,
                "performance": outcome.score.performance,
                "billing": outcome.billing,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn bulk_assign_handler(
    State(service): State<Arc<LeadRoutingService>>,
    axum::Json(request): axum::Json<BulkAssignRequest>,
) -> Response {
    let lead_ids: Vec<LeadId> = request.lead_ids.into_iter().map(LeadId).collect();
    let assigned_by = request.assigned_by.unwrap_or(AssignedBy::Auto);

    let report = service.bulk_assign(&lead_ids, assigned_by, None);
    let payload = json!({
        "success": report.failed.is_empty(),
        "report": report,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn recommendations_handler(
    State(service): State<Arc<LeadRoutingService>>,
    Path(lead_id): Path<String>,
) -> Response {
    match service.recommendations(&LeadId(lead_id), 5) {
        Ok(list) => (StatusCode::OK, axum::Json(list)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Map core errors onto the transport. Eligibility rejections keep the
/// Dutch user-facing messages the product has always shown, with the
/// structured detail alongside for programmatic callers.
fn error_response(error: RoutingError) -> Response {
    match error {
        RoutingError::LeadNotFound => not_found("Lead niet gevonden"),
        RoutingError::PartnerNotFound => not_found("Partner niet gevonden"),
        RoutingError::AlreadyFinal { status } => {
            let payload = json!({
                "success": false,
                "error": format!("Lead is al {}", status.label()),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        RoutingError::Ineligible(cause) => {
            let payload = json!({
                "success": false,
                "error": user_message(&cause),
                "detail": cause,
            });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        RoutingError::NoEligiblePartner { candidates_tried } => {
            let payload = json!({
                "success": false,
                "error": "Geen geschikte partner gevonden voor deze lead",
                "candidates_tried": candidates_tried,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        RoutingError::Dependency(cause) => {
            tracing::error!(%cause, "assignment failed on a dependency");
            let payload = json!({
                "success": false,
                "error": "Interne serverfout bij validatie",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn not_found(message: &str) -> Response {
    let payload = json!({
        "success": false,
        "error": message,
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn user_message(error: &EligibilityError) -> String {
    match error {
        EligibilityError::IndustryMismatch { .. } => {
            "Gebruiker heeft geen toegang tot deze branche".to_string()
        }
        EligibilityError::NoQuota => "Gebruiker heeft geen actief quota".to_string(),
        EligibilityError::PartnerPaused => {
            "Leads voor deze gebruiker zijn gepauzeerd".to_string()
        }
        EligibilityError::QuotaExceeded { used, quota } => {
            format!("Gebruiker heeft zijn quota bereikt ({used}/{quota})")
        }
        EligibilityError::NoPaymentMethod => {
            "Gebruiker heeft geen actieve betaalmethode. Voeg eerst een betaalmethode toe."
                .to_string()
        }
        EligibilityError::InsufficientBalance {
            required,
            available,
        } => format!(
            "Onvoldoende saldo. Vereist: \u{20ac}{required:.2}, Huidig: \u{20ac}{available:.2}. \
             Voeg saldo toe of stel SEPA incasso in."
        ),
    }
}
