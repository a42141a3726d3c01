use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal_macros::dec;

use crate::infra::InMemoryBackend;
use crate::routing::{
    AssignedBy, AssignmentUpdate, AuditLogSink, IndustryId, Lead, LeadId, LeadRoutingService,
    LeadStatus, LeadStore, LeadSummary, NotificationSink, Partner, PartnerId, PaymentMethod,
    PaymentMethodKind, PaymentMethodStatus, PerformanceStats, RouterSettings, RoutingStores,
    ScoreBreakdown, SettingsStore, StoreError, Subscription, SubscriptionStatus,
};

pub(super) fn painters() -> IndustryId {
    IndustryId("ind-schilders".to_string())
}

pub(super) fn roofers() -> IndustryId {
    IndustryId("ind-dakdekkers".to_string())
}

/// Scenario settings from the worked example: region and fairness neutral,
/// performance scaled to 40.
pub(super) fn scenario_settings() -> RouterSettings {
    RouterSettings {
        region_weight: 50,
        performance_weight: 40,
        fairness_weight: 50,
        auto_assign_enabled: true,
        auto_assign_threshold: None,
    }
}

pub(super) fn lead(id: &str) -> Lead {
    Lead {
        id: LeadId(id.to_string()),
        name: "Familie Jansen".to_string(),
        email: Some("jansen@example.nl".to_string()),
        phone: Some("+31612345678".to_string()),
        industry: Some(painters()),
        province: Some("Utrecht".to_string()),
        postcode: Some("3511AB".to_string()),
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

pub(super) fn partner(id: &str) -> Partner {
    Partner {
        id: PartnerId(id.to_string()),
        company_name: Some(format!("Bedrijf {id}")),
        primary_branch: Some("Schilders".to_string()),
        regions: vec!["Utrecht".to_string()],
        lead_industries: Vec::new(),
        lead_locations: Vec::new(),
        max_open_leads: Some(5),
        is_active_for_routing: true,
        routing_priority: 0,
        created_at: Some(Utc::now() - Duration::days(90)),
    }
}

/// Stats tuned so the performance composite lands on exactly 80.0: every
/// sub-factor except response speed and deal value saturates at 100, and
/// those two stay at 0 for lack of data.
pub(super) fn composite_80_stats(last_assigned: DateTime<Utc>) -> PerformanceStats {
    PerformanceStats {
        open_leads_count: Some(2),
        last_lead_assigned_at: Some(last_assigned),
        ai_trust_score: Some(100.0),
        deal_rate_30d: Some(90.0),
        pct_leads_min_2_attempts_30d: Some(90.0),
        avg_contact_attempts_per_lead_30d: Some(2.5),
        avg_customer_rating_30d: Some(5.0),
        num_ratings_30d: Some(8),
        consistency_score: Some(100.0),
        ..PerformanceStats::default()
    }
}

pub(super) fn active_method(kind: PaymentMethodKind) -> PaymentMethod {
    PaymentMethod {
        kind,
        status: PaymentMethodStatus::Active,
        is_default: true,
    }
}

pub(super) fn monthly_subscription(leads_per_month: u32) -> Subscription {
    Subscription {
        leads_per_month: Some(leads_per_month),
        status: SubscriptionStatus::Active,
        is_paused: false,
    }
}

/// Register a partner with everything the gate wants: painters industry
/// enabled, an active subscription, a SEPA mandate, and a healthy balance.
pub(super) fn seed_routable_partner(backend: &InMemoryBackend, partner: &Partner, quota: u32) {
    backend.partners.insert(partner.clone());
    backend
        .partners
        .enable_industries(&partner.id, vec![painters()]);
    backend
        .quota
        .set_subscriptions(partner.id.clone(), vec![monthly_subscription(quota)]);
    backend.payments.set_methods(
        partner.id.clone(),
        vec![active_method(PaymentMethodKind::Sepa)],
    );
    backend.payments.set_balance(partner.id.clone(), dec!(100.00));
}

pub(super) fn seed_industries(backend: &InMemoryBackend) {
    backend
        .industries
        .insert(painters(), "Schilders", Some(dec!(12.50)));
    backend.industries.insert(roofers(), "Dakdekkers", None);
}

/// Burn `count` quota slots by planting already-accepted leads for the
/// partner in the current month, the way the usage view would count them.
pub(super) fn consume_quota(backend: &InMemoryBackend, partner_id: &PartnerId, count: u32) {
    static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

    for _ in 0..count {
        let n = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let id = format!("used-{}-{n}", partner_id.0);
        let used = lead(&id);
        backend.leads.insert(used.clone());

        backend
            .leads
            .update_lead_assignment(
                &used.id,
                AssignmentUpdate {
                    assigned_to: partner_id.clone(),
                    assigned_by: AssignedBy::Admin,
                    status: LeadStatus::Accepted,
                    score: 0.0,
                    factors: ScoreBreakdown::default(),
                    assigned_at: Utc::now(),
                    accepted_at: Utc::now(),
                },
            )
            .expect("seed lead exists");
    }
}

pub(super) fn service(backend: &InMemoryBackend) -> LeadRoutingService {
    LeadRoutingService::new(backend.stores())
}

/// Settings store that always errors, for the fallback-to-defaults path.
pub(super) struct FailingSettingsStore;

impl SettingsStore for FailingSettingsStore {
    fn router_settings(&self) -> Result<RouterSettings, StoreError> {
        Err(StoreError::Unavailable("settings table offline".to_string()))
    }
}

/// Notification sink that always errors; assignments must shrug it off.
pub(super) struct FailingNotificationSink;

impl NotificationSink for FailingNotificationSink {
    fn notify_lead_assigned(
        &self,
        _partner_id: &PartnerId,
        _summary: LeadSummary,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("smtp down".to_string()))
    }
}

/// Audit sink that always errors; assignments must shrug it off too.
pub(super) struct FailingAuditSink;

impl AuditLogSink for FailingAuditSink {
    fn append_assignment_log(
        &self,
        _entry: crate::routing::AssignmentLogEntry,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("log sink offline".to_string()))
    }

    fn append_activity_log(
        &self,
        _entry: crate::routing::ActivityLogEntry,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("log sink offline".to_string()))
    }
}

/// Stores bundle with selected collaborators swapped for failing doubles.
pub(super) fn stores_with(
    backend: &InMemoryBackend,
    settings: Option<Arc<dyn SettingsStore>>,
    notifications: Option<Arc<dyn NotificationSink>>,
    audit: Option<Arc<dyn AuditLogSink>>,
) -> RoutingStores {
    let mut stores = backend.stores();
    if let Some(settings) = settings {
        stores.settings = settings;
    }
    if let Some(notifications) = notifications {
        stores.notifications = notifications;
    }
    if let Some(audit) = audit {
        stores.audit = audit;
    }
    stores
}
