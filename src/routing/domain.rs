use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::scoring::{PerformanceBreakdown, ScoreBreakdown};

/// Identifier wrapper for inbound sales leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Identifier wrapper for partner accounts ("users" in the legacy schema).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartnerId(pub String);

/// Identifier wrapper for industry ("branche") catalog entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndustryId(pub String);

/// Lifecycle of a lead from intake to settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Proposal,
    Accepted,
    Approved,
    Rejected,
    Paid,
    Closed,
}

impl LeadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Proposal => "proposal",
            LeadStatus::Accepted => "accepted",
            LeadStatus::Approved => "approved",
            LeadStatus::Rejected => "rejected",
            LeadStatus::Paid => "paid",
            LeadStatus::Closed => "closed",
        }
    }

    /// Whether the lead can still be routed to a partner.
    pub const fn is_assignable(self) -> bool {
        matches!(
            self,
            LeadStatus::New | LeadStatus::Contacted | LeadStatus::Qualified | LeadStatus::Proposal
        )
    }
}

/// Provenance of an assignment decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedBy {
    Auto,
    Manual,
    Admin,
}

impl AssignedBy {
    pub const fn label(self) -> &'static str {
        match self {
            AssignedBy::Auto => "auto",
            AssignedBy::Manual => "manual",
            AssignedBy::Admin => "admin",
        }
    }
}

/// A prospective customer inquiry waiting to be matched to a partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<IndustryId>,
    pub province: Option<String>,
    pub postcode: Option<String>,
    pub is_urgent: bool,
    pub status: LeadStatus,
    pub assigned_to: Option<PartnerId>,
    pub assigned_by: Option<AssignedBy>,
    pub assignment_score: Option<f64>,
    pub assignment_factors: Option<ScoreBreakdown>,
    pub price_at_purchase: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Routing-relevant view of a partner account profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub company_name: Option<String>,
    pub primary_branch: Option<String>,
    pub regions: Vec<String>,
    pub lead_industries: Vec<String>,
    pub lead_locations: Vec<String>,
    pub max_open_leads: Option<u32>,
    pub is_active_for_routing: bool,
    pub routing_priority: i32,
    pub created_at: Option<DateTime<Utc>>,
}

/// Rolling-window performance snapshot for one partner, refreshed by an
/// external materialization job. Every metric is optional: absence means the
/// partner has no signal for that factor, never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub open_leads_count: Option<u32>,
    pub leads_assigned_30d: Option<u32>,
    pub last_lead_assigned_at: Option<DateTime<Utc>>,
    pub avg_first_response_time_minutes_30d: Option<f64>,
    pub pct_contacted_within_1h_30d: Option<f64>,
    pub pct_contacted_within_24h_30d: Option<f64>,
    pub ai_trust_score: Option<f64>,
    pub deal_rate_30d: Option<f64>,
    pub pct_leads_min_2_attempts_30d: Option<f64>,
    pub avg_contact_attempts_per_lead_30d: Option<f64>,
    pub avg_customer_rating_30d: Option<f64>,
    pub num_ratings_30d: Option<u32>,
    pub complaint_rate_30d: Option<f64>,
    pub complaints_30d: Option<u32>,
    pub avg_deal_value_30d: Option<f64>,
    pub consistency_score: Option<f64>,
}

/// Global tunable routing weights, reloaded from the settings store on every
/// assignment evaluation. Weights are centered at 50: a value of 50 acts as a
/// 1.0 multiplier, 100 doubles the factor, 0 removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterSettings {
    pub region_weight: u32,
    pub performance_weight: u32,
    pub fairness_weight: u32,
    pub auto_assign_enabled: bool,
    pub auto_assign_threshold: Option<f64>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            region_weight: 50,
            performance_weight: 50,
            fairness_weight: 50,
            auto_assign_enabled: true,
            auto_assign_threshold: None,
        }
    }
}

/// Billing state of a partner's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
}

/// Per-partner lead quota subscription. `leads_per_month = None` means the
/// row carries no countable quota and is excluded from the quota sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub leads_per_month: Option<u32>,
    pub status: SubscriptionStatus,
    pub is_paused: bool,
}

/// Derived current-month usage counters for a partner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyUsage {
    pub approved_count: u32,
    pub effective_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Sepa,
    CreditCard,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodStatus {
    Active,
    Pending,
    Failed,
}

/// Payment instrument on file for a partner. Read-only to the routing core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub kind: PaymentMethodKind,
    pub status: PaymentMethodStatus,
    pub is_default: bool,
}

/// Append-only record of one assignment decision, persisted verbatim so the
/// score can be audited and the weights tuned later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentLogEntry {
    pub lead_id: LeadId,
    pub assigned_to: PartnerId,
    pub assigned_by: AssignedBy,
    pub score: f64,
    pub factors: ScoreBreakdown,
    pub performance: PerformanceBreakdown,
    pub stats_snapshot: PerformanceStats,
    pub settings: RouterSettings,
    pub logged_at: DateTime<Utc>,
}

/// Free-form audit line for the lead's activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub lead_id: LeadId,
    pub description: String,
    pub created_by: Option<PartnerId>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Lead digest handed to the notification sink when an assignment commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSummary {
    pub lead_id: LeadId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub industry_name: Option<String>,
}
