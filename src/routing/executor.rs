use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::domain::{
    ActivityLogEntry, AssignedBy, AssignmentLogEntry, Lead, LeadId, LeadStatus, LeadSummary,
    PartnerId, RouterSettings,
};
use super::eligibility::{EligibilityContext, EligibilityGate, GateError};
use super::guard::PartnerLocks;
use super::repository::{
    AssignmentUpdate, AuditLogSink, LeadFilter, LeadStore, NotificationSink, PaymentStore,
    StoreError,
};
use super::scoring::AssignmentScore;
use super::selector::{Candidate, CandidateSelector};
use super::RoutingError;

/// How the lead's cost was settled when the assignment committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillingOutcome {
    /// Prepaid balance was debited in the same exclusion scope as the commit.
    BalanceDeducted { amount: Decimal, remaining: Decimal },
    /// An active SEPA mandate defers settlement to the periodic billing run.
    DeferredToMandate,
    /// The balance write failed after the assignment committed. The
    /// assignment stands; reconciliation picks the difference up later.
    DeductionFailed { amount: Decimal },
}

/// A committed assignment: the updated lead plus the score and billing
/// details the caller reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentOutcome {
    pub lead: Lead,
    pub assigned_to: PartnerId,
    pub score: AssignmentScore,
    pub billing: BillingOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkSuccess {
    pub lead_id: LeadId,
    pub assigned_to: PartnerId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub lead_id: LeadId,
    pub reason: String,
}

/// Outcome of a batch run. One lead's failure never aborts the batch; both
/// lists are accumulated and returned together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkAssignmentReport {
    pub succeeded: Vec<BulkSuccess>,
    pub failed: Vec<BulkFailure>,
    pub cancelled: bool,
}

/// Why one commit attempt did not go through.
enum CommitAttemptError {
    /// The eligibility gate rejected or errored; auto mode moves on to the
    /// next candidate.
    Gate(GateError),
    /// The lead mutation itself failed; always fatal for the evaluation.
    Commit(StoreError),
}

/// Commits lead-to-partner assignments: directed to an explicit partner, or
/// walking the ranked candidate list until the eligibility gate passes.
pub struct AssignmentExecutor {
    selector: Arc<CandidateSelector>,
    gate: Arc<EligibilityGate>,
    locks: Arc<PartnerLocks>,
    leads: Arc<dyn LeadStore>,
    payments: Arc<dyn PaymentStore>,
    notifications: Arc<dyn NotificationSink>,
    audit: Arc<dyn AuditLogSink>,
}

impl AssignmentExecutor {
    pub fn new(
        selector: Arc<CandidateSelector>,
        gate: Arc<EligibilityGate>,
        locks: Arc<PartnerLocks>,
        leads: Arc<dyn LeadStore>,
        payments: Arc<dyn PaymentStore>,
        notifications: Arc<dyn NotificationSink>,
        audit: Arc<dyn AuditLogSink>,
    ) -> Self {
        Self {
            selector,
            gate,
            locks,
            leads,
            payments,
            notifications,
            audit,
        }
    }

    /// Assign one lead. With a target partner the gate runs once and a
    /// failure is returned to the caller; without one the ranked candidates
    /// each get a try, best score first.
    pub fn assign(
        &self,
        lead_id: &LeadId,
        assigned_by: AssignedBy,
        target: Option<PartnerId>,
    ) -> Result<AssignmentOutcome, RoutingError> {
        let lead = self.selector.fetch_assignable_lead(lead_id)?;
        let settings = self.selector.settings_or_default();
        let now = Utc::now();

        match target {
            Some(partner_id) => {
                let candidate = self
                    .selector
                    .score_partner(&lead, &partner_id, &settings, now)?;
                self.try_commit(&lead, candidate, assigned_by, &settings)
                    .map_err(|error| match error {
                        CommitAttemptError::Gate(GateError::Ineligible(cause)) => cause.into(),
                        CommitAttemptError::Gate(GateError::Store(cause))
                        | CommitAttemptError::Commit(cause) => cause.into(),
                    })
            }
            None => self.assign_auto(&lead, assigned_by, &settings, now),
        }
    }

    /// Walk the ranked list: candidates below the auto-assign threshold are
    /// skipped outright, gate rejections log and fall through to the next
    /// candidate, the first pass commits.
    fn assign_auto(
        &self,
        lead: &Lead,
        assigned_by: AssignedBy,
        settings: &RouterSettings,
        now: chrono::DateTime<Utc>,
    ) -> Result<AssignmentOutcome, RoutingError> {
        let candidates = self.selector.rank(lead, settings, now)?;
        let candidates_tried = candidates.len();

        for candidate in candidates {
            if let Some(threshold) = settings.auto_assign_threshold {
                if candidate.score.total < threshold {
                    info!(
                        lead = %lead.id.0,
                        partner = %candidate.partner.id.0,
                        score = candidate.score.total,
                        threshold,
                        "candidate below auto-assign threshold, skipping"
                    );
                    continue;
                }
            }

            let partner_id = candidate.partner.id.clone();
            match self.try_commit(lead, candidate, assigned_by, settings) {
                Ok(outcome) => return Ok(outcome),
                Err(CommitAttemptError::Gate(error)) => {
                    warn!(
                        lead = %lead.id.0,
                        partner = %partner_id.0,
                        %error,
                        "candidate failed eligibility, trying next"
                    );
                }
                Err(CommitAttemptError::Commit(error)) => return Err(error.into()),
            }
        }

        warn!(lead = %lead.id.0, candidates_tried, "no eligible partner for lead");
        Err(RoutingError::NoEligiblePartner { candidates_tried })
    }

    /// One gate-and-commit attempt for a single candidate. The per-partner
    /// guard is held across "gate -> lead mutation -> balance deduction" so a
    /// concurrent evaluation for the same partner cannot spend the same quota
    /// slot; audit and notification run after the guard is released.
    fn try_commit(
        &self,
        lead: &Lead,
        candidate: Candidate,
        assigned_by: AssignedBy,
        settings: &RouterSettings,
    ) -> Result<AssignmentOutcome, CommitAttemptError> {
        let partner_id = candidate.partner.id.clone();
        let guard = self.locks.lock(&partner_id);

        let context = self
            .gate
            .check(lead, &partner_id)
            .map_err(CommitAttemptError::Gate)?;

        let committed_at = Utc::now();
        let update = AssignmentUpdate {
            assigned_to: partner_id.clone(),
            assigned_by,
            status: LeadStatus::Accepted,
            score: candidate.score.total,
            factors: candidate.score.factors,
            assigned_at: committed_at,
            accepted_at: committed_at,
        };
        let updated = self
            .leads
            .update_lead_assignment(&lead.id, update)
            .map_err(CommitAttemptError::Commit)?;

        let billing = self.settle_billing(&context);
        drop(guard);

        let entry = AssignmentLogEntry {
            lead_id: lead.id.clone(),
            assigned_to: partner_id.clone(),
            assigned_by,
            score: candidate.score.total,
            factors: candidate.score.factors,
            performance: candidate.score.performance.breakdown,
            stats_snapshot: candidate.stats.clone(),
            settings: settings.clone(),
            logged_at: committed_at,
        };
        if let Err(error) = self.audit.append_assignment_log(entry) {
            warn!(lead = %lead.id.0, %error, "failed to append assignment log");
        }

        let activity = ActivityLogEntry {
            lead_id: lead.id.clone(),
            description: "lead assigned to matching partner".to_string(),
            created_by: Some(partner_id.clone()),
            metadata: json!({
                "assignment": true,
                "assigned_by": assigned_by.label(),
                "assignment_score": candidate.score.total,
            }),
            created_at: committed_at,
        };
        if let Err(error) = self.audit.append_activity_log(activity) {
            warn!(lead = %lead.id.0, %error, "failed to append activity log");
        }

        self.notify_assignment(&updated, &partner_id);

        Ok(AssignmentOutcome {
            lead: updated,
            assigned_to: partner_id,
            score: candidate.score,
            billing,
        })
    }

    /// Debit the prepaid balance unless an active SEPA mandate defers
    /// settlement. A failed debit is logged and reported, never rolled back
    /// into the committed assignment.
    fn settle_billing(&self, context: &EligibilityContext) -> BillingOutcome {
        if context.has_sepa_mandate {
            return BillingOutcome::DeferredToMandate;
        }

        let new_balance = context.balance - context.lead_price;
        match self
            .payments
            .update_balance(&context.partner_id, new_balance)
        {
            Ok(()) => BillingOutcome::BalanceDeducted {
                amount: context.lead_price,
                remaining: new_balance,
            },
            Err(error) => {
                warn!(
                    partner = %context.partner_id.0,
                    %error,
                    "balance deduction failed after assignment commit"
                );
                BillingOutcome::DeductionFailed {
                    amount: context.lead_price,
                }
            }
        }
    }

    /// Best-effort "lead assigned" notification; failures are swallowed so
    /// they can never turn a committed assignment into a reported failure.
    fn notify_assignment(&self, lead: &Lead, partner_id: &PartnerId) {
        let industry_name = match self.selector.resolve_industry_name(lead) {
            Ok(name) => name,
            Err(error) => {
                warn!(lead = %lead.id.0, %error, "could not resolve industry for notification");
                None
            }
        };

        let summary = LeadSummary {
            lead_id: lead.id.clone(),
            name: lead.name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            industry_name,
        };

        match self.notifications.notify_lead_assigned(partner_id, summary) {
            Ok(true) => {}
            Ok(false) => {
                warn!(lead = %lead.id.0, partner = %partner_id.0, "assignment notification refused");
            }
            Err(error) => {
                warn!(lead = %lead.id.0, partner = %partner_id.0, %error, "assignment notification failed");
            }
        }
    }

    /// Auto-assign a batch of leads independently. The cancellation token is
    /// only consulted between leads, never mid-lead.
    pub fn bulk_assign(
        &self,
        lead_ids: &[LeadId],
        assigned_by: AssignedBy,
        cancel: Option<&AtomicBool>,
    ) -> BulkAssignmentReport {
        let mut report = BulkAssignmentReport::default();

        for lead_id in lead_ids {
            if cancel.is_some_and(|token| token.load(Ordering::Relaxed)) {
                report.cancelled = true;
                break;
            }

            match self.assign(lead_id, assigned_by, None) {
                Ok(outcome) => report.succeeded.push(BulkSuccess {
                    lead_id: lead_id.clone(),
                    assigned_to: outcome.assigned_to,
                    score: outcome.score.total,
                }),
                Err(error) => report.failed.push(BulkFailure {
                    lead_id: lead_id.clone(),
                    reason: error.to_string(),
                }),
            }
        }

        report
    }

    /// Sweep every unassigned, still-assignable lead through auto-assign.
    /// A no-op when auto-assign is disabled in the router settings.
    pub fn auto_assign_sweep(
        &self,
        cancel: Option<&AtomicBool>,
    ) -> Result<BulkAssignmentReport, RoutingError> {
        let settings = self.selector.settings_or_default();
        if !settings.auto_assign_enabled {
            info!("auto-assign disabled, skipping sweep");
            return Ok(BulkAssignmentReport::default());
        }

        let filter = LeadFilter {
            status: None,
            unassigned_only: true,
        };
        let lead_ids: Vec<LeadId> = self
            .leads
            .list_leads(&filter)?
            .into_iter()
            .filter(|lead| lead.status.is_assignable())
            .map(|lead| lead.id)
            .collect();

        Ok(self.bulk_assign(&lead_ids, AssignedBy::Auto, cancel))
    }
}
