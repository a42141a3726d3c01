use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::domain::{AssignedBy, LeadId, PartnerId};
use super::eligibility::EligibilityGate;
use super::executor::{AssignmentExecutor, AssignmentOutcome, BulkAssignmentReport};
use super::guard::PartnerLocks;
use super::repository::{
    AuditLogSink, IndustryCatalog, LeadStore, NotificationSink, PartnerDirectory, PaymentStore,
    QuotaStore, SettingsStore, StatsProvider,
};
use super::selector::{Candidate, CandidateSelector, RecommendationList};
use super::RoutingError;

/// Collaborator bundle wiring the routing core to the outside world. Every
/// external system sits behind one narrow trait; production adapters and the
/// in-memory test doubles both plug in here.
#[derive(Clone)]
pub struct RoutingStores {
    pub leads: Arc<dyn LeadStore>,
    pub partners: Arc<dyn PartnerDirectory>,
    pub industries: Arc<dyn IndustryCatalog>,
    pub stats: Arc<dyn StatsProvider>,
    pub settings: Arc<dyn SettingsStore>,
    pub quota: Arc<dyn QuotaStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub audit: Arc<dyn AuditLogSink>,
}

/// Service composing the candidate selector, eligibility gate, per-partner
/// guard, and assignment executor behind one API surface.
pub struct LeadRoutingService {
    selector: Arc<CandidateSelector>,
    executor: AssignmentExecutor,
}

impl LeadRoutingService {
    pub fn new(stores: RoutingStores) -> Self {
        let selector = Arc::new(CandidateSelector::new(
            stores.leads.clone(),
            stores.partners.clone(),
            stores.industries.clone(),
            stores.stats.clone(),
            stores.settings.clone(),
        ));
        let gate = Arc::new(EligibilityGate::new(
            stores.partners.clone(),
            stores.industries.clone(),
            stores.quota.clone(),
            stores.payments.clone(),
        ));
        let locks = Arc::new(PartnerLocks::new());
        let executor = AssignmentExecutor::new(
            selector.clone(),
            gate,
            locks,
            stores.leads.clone(),
            stores.payments.clone(),
            stores.notifications.clone(),
            stores.audit.clone(),
        );

        Self { selector, executor }
    }

    /// Ranked candidate list for a lead; callers take top-1 or top-N.
    pub fn candidates(&self, lead_id: &LeadId) -> Result<Vec<Candidate>, RoutingError> {
        self.selector.candidates(lead_id)
    }

    /// Top-N scored recommendations for the admin surface.
    pub fn recommendations(
        &self,
        lead_id: &LeadId,
        top_n: usize,
    ) -> Result<RecommendationList, RoutingError> {
        self.selector.recommendations(lead_id, top_n)
    }

    /// Commit one assignment: directed when `target` is given, otherwise the
    /// auto fallback sequence over the ranked candidates.
    pub fn assign(
        &self,
        lead_id: &LeadId,
        assigned_by: AssignedBy,
        target: Option<PartnerId>,
    ) -> Result<AssignmentOutcome, RoutingError> {
        self.executor.assign(lead_id, assigned_by, target)
    }

    /// Auto-assign a batch of leads, accumulating per-lead outcomes.
    pub fn bulk_assign(
        &self,
        lead_ids: &[LeadId],
        assigned_by: AssignedBy,
        cancel: Option<&AtomicBool>,
    ) -> BulkAssignmentReport {
        self.executor.bulk_assign(lead_ids, assigned_by, cancel)
    }

    /// Run auto-assign over every unassigned lead (cron sweep entry point).
    pub fn auto_assign_sweep(
        &self,
        cancel: Option<&AtomicBool>,
    ) -> Result<BulkAssignmentReport, RoutingError> {
        self.executor.auto_assign_sweep(cancel)
    }
}
