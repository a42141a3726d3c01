//! Lead assignment core: scoring, candidate selection, the quota/billing
//! eligibility gate, and the executor that commits assignments atomically per
//! partner.

pub mod domain;
pub mod eligibility;
pub(crate) mod executor;
pub mod guard;
pub mod repository;
pub mod router;
pub mod scoring;
pub(crate) mod selector;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ActivityLogEntry, AssignedBy, AssignmentLogEntry, IndustryId, Lead, LeadId, LeadStatus,
    LeadSummary, MonthlyUsage, Partner, PartnerId, PaymentMethod, PaymentMethodKind,
    PaymentMethodStatus, PerformanceStats, RouterSettings, Subscription, SubscriptionStatus,
};
pub use eligibility::{EligibilityContext, EligibilityError, EligibilityGate, GateError};
pub use executor::{
    AssignmentOutcome, BillingOutcome, BulkAssignmentReport, BulkFailure, BulkSuccess,
};
pub use guard::{PartnerGuard, PartnerLocks};
pub use repository::{
    AssignmentUpdate, AuditLogSink, IndustryCatalog, LeadFilter, LeadStore, NotificationSink,
    PartnerDirectory, PaymentStore, QuotaStore, SettingsStore, StatsProvider, StoreError,
};
pub use router::routing_router;
pub use scoring::{
    AssignmentScore, PerformanceBreakdown, PerformanceScore, ScoreBreakdown, ScoringEngine,
};
pub use selector::{Candidate, Recommendation, RecommendationList};
pub use service::{LeadRoutingService, RoutingStores};

/// Error raised by the routing core.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("lead not found")]
    LeadNotFound,
    #[error("partner not found")]
    PartnerNotFound,
    #[error("lead is already {}", status.label())]
    AlreadyFinal { status: LeadStatus },
    #[error(transparent)]
    Ineligible(#[from] EligibilityError),
    #[error("no eligible partner found ({candidates_tried} candidate(s) tried)")]
    NoEligiblePartner { candidates_tried: usize },
    #[error(transparent)]
    Dependency(#[from] StoreError),
}
