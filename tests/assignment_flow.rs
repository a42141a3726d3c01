use chrono::{Duration, Utc};
use leadmarkt::infra::InMemoryBackend;
use leadmarkt::routing::{
    AssignedBy, BillingOutcome, IndustryId, Lead, LeadId, LeadRoutingService, LeadStatus,
    LeadStore, Partner, PartnerId, PaymentMethod, PaymentMethodKind, PaymentMethodStatus,
    PerformanceStats, RoutingError, Subscription, SubscriptionStatus,
};
use rust_decimal_macros::dec;

fn painters() -> IndustryId {
    IndustryId("ind-schilders".to_string())
}

fn new_lead(id: &str, province: &str) -> Lead {
    Lead {
        id: LeadId(id.to_string()),
        name: "Familie de Vries".to_string(),
        email: Some("devries@example.nl".to_string()),
        phone: Some("+31687654321".to_string()),
        industry: Some(painters()),
        province: Some(province.to_string()),
        postcode: Some("3581KW".to_string()),
        is_urgent: false,
        status: LeadStatus::New,
        assigned_to: None,
        assigned_by: None,
        assignment_score: None,
        assignment_factors: None,
        price_at_purchase: None,
        created_at: Utc::now(),
        assigned_at: None,
        accepted_at: None,
        approved_at: None,
    }
}

fn register_partner(
    backend: &InMemoryBackend,
    id: &str,
    region: &str,
    quota: u32,
    method: PaymentMethodKind,
) -> PartnerId {
    let partner_id = PartnerId(id.to_string());
    backend.partners.insert(Partner {
        id: partner_id.clone(),
        company_name: Some(format!("Bedrijf {id}")),
        primary_branch: Some("Schilders".to_string()),
        regions: vec![region.to_string()],
        lead_industries: Vec::new(),
        lead_locations: Vec::new(),
        max_open_leads: Some(5),
        is_active_for_routing: true,
        routing_priority: 0,
        created_at: Some(Utc::now() - Duration::days(60)),
    });
    backend
        .partners
        .enable_industries(&partner_id, vec![painters()]);
    backend.quota.set_subscriptions(
        partner_id.clone(),
        vec![Subscription {
            leads_per_month: Some(quota),
            status: SubscriptionStatus::Active,
            is_paused: false,
        }],
    );
    backend.payments.set_methods(
        partner_id.clone(),
        vec![PaymentMethod {
            kind: method,
            status: PaymentMethodStatus::Active,
            is_default: true,
        }],
    );
    backend.payments.set_balance(partner_id.clone(), dec!(60.00));
    backend
        .stats
        .insert(partner_id.clone(), PerformanceStats::default());
    partner_id
}

#[test]
fn leads_flow_from_intake_to_committed_assignment() {
    let backend = InMemoryBackend::new();
    backend
        .industries
        .insert(painters(), "Schilders", Some(dec!(15.00)));

    let local =
        register_partner(&backend, "p-utrecht", "Utrecht", 10, PaymentMethodKind::CreditCard);
    register_partner(&backend, "p-limburg", "Limburg", 10, PaymentMethodKind::Sepa);

    backend.leads.insert(new_lead("lead-1", "Utrecht"));
    let service = LeadRoutingService::new(backend.stores());

    // The recommendation listing and the committed assignment agree on the
    // best candidate.
    let recommendations = service
        .recommendations(&LeadId("lead-1".to_string()), 5)
        .expect("recommendations build");
    assert_eq!(recommendations.recommendations[0].partner_id, local);

    let outcome = service
        .assign(&LeadId("lead-1".to_string()), AssignedBy::Auto, None)
        .expect("auto assignment commits");
    assert_eq!(outcome.assigned_to, local);
    assert_eq!(outcome.lead.status, LeadStatus::Accepted);

    // The card-billed partner paid for the lead out of their balance.
    assert_eq!(
        outcome.billing,
        BillingOutcome::BalanceDeducted {
            amount: dec!(15.00),
            remaining: dec!(45.00),
        }
    );

    // The stored lead carries the exact factors that were computed at commit
    // time, and the audit log holds the full decision snapshot.
    let stored = backend
        .leads
        .get_lead(&LeadId("lead-1".to_string()))
        .expect("store reachable")
        .expect("lead exists");
    assert_eq!(stored.assignment_factors, Some(outcome.score.factors));
    let audit = backend.audit.assignment_entries();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].assigned_to, local);
    assert_eq!(audit[0].stats_snapshot, PerformanceStats::default());

    // The partner was notified once.
    let events = backend.notifications.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1.industry_name.as_deref(), Some("Schilders"));
}

#[test]
fn sweep_drains_the_backlog_and_respects_quota() {
    let backend = InMemoryBackend::new();
    backend
        .industries
        .insert(painters(), "Schilders", Some(dec!(15.00)));
    register_partner(&backend, "p-1", "Utrecht", 2, PaymentMethodKind::Sepa);

    for n in 0..3 {
        backend.leads.insert(new_lead(&format!("lead-{n}"), "Utrecht"));
    }

    let service = LeadRoutingService::new(backend.stores());
    let report = service.auto_assign_sweep(None).expect("sweep runs");

    // Two leads fit the monthly quota; the third finds no eligible partner.
    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(!report.cancelled);

    let result = service.assign(
        &LeadId(report.failed[0].lead_id.0.clone()),
        AssignedBy::Auto,
        None,
    );
    assert!(matches!(
        result,
        Err(RoutingError::NoEligiblePartner { .. })
    ));
}
