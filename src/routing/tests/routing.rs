use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::infra::InMemoryBackend;
use crate::routing::{routing_router, LeadRoutingService};

fn seeded_router() -> (axum::Router, InMemoryBackend) {
    let backend = InMemoryBackend::new();
    seed_industries(&backend);
    backend.leads.insert(lead("lead-1"));
    seed_routable_partner(&backend, &partner("p-1"), 20);

    let service = Arc::new(LeadRoutingService::new(backend.stores()));
    (routing_router(service), backend)
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn assign_route_commits_and_reports_the_outcome() {
    let (router, backend) = seeded_router();

    let response = router
        .oneshot(post_json("/api/v1/leads/lead-1/assign", json!({})))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("success"), Some(&json!(true)));
    assert_eq!(
        payload.get("assigned_to").and_then(Value::as_str),
        Some("p-1")
    );
    assert!(payload.get("score").and_then(Value::as_f64).is_some());
    assert!(payload.get("factors").is_some());
    assert_eq!(
        payload
            .get("billing")
            .and_then(|billing| billing.get("kind")),
        Some(&json!("deferred_to_mandate"))
    );

    assert_eq!(backend.audit.assignment_entries().len(), 1);
}

#[tokio::test]
async fn assign_route_renders_gate_rejections_in_dutch() {
    let (router, backend) = seeded_router();
    consume_quota(&backend, &partner("p-1").id, 20);

    let response = router
        .oneshot(post_json(
            "/api/v1/leads/lead-1/assign",
            json!({ "partner_id": "p-1" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("success"), Some(&json!(false)));
    assert_eq!(
        payload.get("error").and_then(Value::as_str),
        Some("Gebruiker heeft zijn quota bereikt (20/20)")
    );
    assert_eq!(
        payload.get("detail").and_then(|detail| detail.get("kind")),
        Some(&json!("quota_exceeded"))
    );
}

#[tokio::test]
async fn assign_route_returns_dutch_not_found() {
    let (router, _backend) = seeded_router();

    let response = router
        .oneshot(post_json("/api/v1/leads/lead-ghost/assign", json!({})))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("error").and_then(Value::as_str),
        Some("Lead niet gevonden")
    );
}

#[tokio::test]
async fn recommendations_route_lists_scored_candidates() {
    let (router, _backend) = seeded_router();

    let response = router
        .oneshot(
            Request::get("/api/v1/leads/lead-1/recommendations")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let recommendations = payload
        .get("recommendations")
        .and_then(Value::as_array)
        .expect("recommendations present");
    assert_eq!(recommendations.len(), 1);
    assert_eq!(
        recommendations[0].get("partner_id").and_then(Value::as_str),
        Some("p-1")
    );
}

#[tokio::test]
async fn bulk_route_reports_per_lead_outcomes() {
    let (router, backend) = seeded_router();
    backend.leads.insert(lead("lead-2"));

    let response = router
        .oneshot(post_json(
            "/api/v1/leads/assign/bulk",
            json!({ "lead_ids": ["lead-1", "lead-ghost", "lead-2"] }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("success"), Some(&json!(false)));
    let report = payload.get("report").expect("report present");
    assert_eq!(
        report
            .get("succeeded")
            .and_then(Value::as_array)
            .map(Vec::len),
        Some(2)
    );
    assert_eq!(
        report.get("failed").and_then(Value::as_array).map(Vec::len),
        Some(1)
    );
}
