use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    ActivityLogEntry, AssignedBy, AssignmentLogEntry, IndustryId, Lead, LeadId, LeadStatus,
    LeadSummary, MonthlyUsage, Partner, PartnerId, PaymentMethod, PaymentMethodStatus,
    PerformanceStats, RouterSettings, Subscription,
};
use super::scoring::ScoreBreakdown;

/// Error enumeration for collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Mutation applied to a lead when an assignment commits. The store applies
/// the whole patch or nothing; partial writes would break the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentUpdate {
    pub assigned_to: PartnerId,
    pub assigned_by: AssignedBy,
    pub status: LeadStatus,
    pub score: f64,
    pub factors: ScoreBreakdown,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: DateTime<Utc>,
}

/// Filter for lead listings; used by the auto-assign sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub unassigned_only: bool,
}

/// Storage abstraction over the hosted lead table.
pub trait LeadStore: Send + Sync {
    fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError>;
    fn update_lead_assignment(
        &self,
        id: &LeadId,
        update: AssignmentUpdate,
    ) -> Result<Lead, StoreError>;
    fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError>;
}

/// Directory of partner accounts and their routing preferences.
pub trait PartnerDirectory: Send + Sync {
    fn list_active_routing_partners(&self) -> Result<Vec<Partner>, StoreError>;
    fn get_partner(&self, id: &PartnerId) -> Result<Option<Partner>, StoreError>;
    fn list_enabled_industry_preferences(
        &self,
        partner_id: &PartnerId,
    ) -> Result<Vec<IndustryId>, StoreError>;
}

/// Industry catalog lookups. The core never resolves names or prices itself;
/// scoring accepts a pre-resolved name and the eligibility gate a price.
pub trait IndustryCatalog: Send + Sync {
    fn industry_name(&self, id: &IndustryId) -> Result<Option<String>, StoreError>;
    fn price_per_lead(&self, id: &IndustryId) -> Result<Option<Decimal>, StoreError>;
}

/// Batch access to the materialized performance snapshots. Staleness is
/// tolerated; the core never blocks on freshness.
pub trait StatsProvider: Send + Sync {
    fn list_performance_stats(&self) -> Result<Vec<(PartnerId, PerformanceStats)>, StoreError>;
    fn stats_for(&self, partner_id: &PartnerId) -> Result<Option<PerformanceStats>, StoreError>;
}

/// Global router settings. Callers must fall back to
/// `RouterSettings::default()` when this store fails; the failure is a
/// warning, never fatal.
pub trait SettingsStore: Send + Sync {
    fn router_settings(&self) -> Result<RouterSettings, StoreError>;
}

/// Subscription and current-month usage lookups for the quota gate.
pub trait QuotaStore: Send + Sync {
    fn subscriptions(&self, partner_id: &PartnerId) -> Result<Vec<Subscription>, StoreError>;
    fn monthly_usage(&self, partner_id: &PartnerId) -> Result<MonthlyUsage, StoreError>;
}

/// Payment instruments and prepaid balance for the billing gate.
pub trait PaymentStore: Send + Sync {
    fn payment_methods(
        &self,
        partner_id: &PartnerId,
        statuses: &[PaymentMethodStatus],
    ) -> Result<Vec<PaymentMethod>, StoreError>;
    fn balance(&self, partner_id: &PartnerId) -> Result<Decimal, StoreError>;
    fn update_balance(&self, partner_id: &PartnerId, new_balance: Decimal)
        -> Result<(), StoreError>;
}

/// Outbound "lead assigned" notification hook (e-mail/WhatsApp adapters live
/// behind this). Fire-and-forget: the caller swallows and logs failures.
pub trait NotificationSink: Send + Sync {
    fn notify_lead_assigned(
        &self,
        partner_id: &PartnerId,
        summary: LeadSummary,
    ) -> Result<bool, StoreError>;
}

/// Append-only audit sinks. Awaited for test determinism, but failures after
/// a committed assignment are logged, never propagated.
pub trait AuditLogSink: Send + Sync {
    fn append_assignment_log(&self, entry: AssignmentLogEntry) -> Result<(), StoreError>;
    fn append_activity_log(&self, entry: ActivityLogEntry) -> Result<(), StoreError>;
}
