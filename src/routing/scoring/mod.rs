mod performance;
mod weights;

pub use performance::{PerformanceBreakdown, PerformanceScore};
pub use weights::{PerformanceWeights, ScoreWeights};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Lead, Partner, PerformanceStats, RouterSettings};

/// Capacity assumed for partners that never configured `max_open_leads`.
const DEFAULT_MAX_OPEN_LEADS: u32 = 5;

/// Wait-time assumed when a partner has neither an assignment history nor a
/// profile creation timestamp.
const DEFAULT_WAIT_HOURS: f64 = 24.0;

/// Hours at which the wait-time bonus saturates.
const WAIT_CAP_HOURS: f64 = 24.0;

/// Response-time ceiling, in minutes, for the urgent-lead bonus.
const URGENCY_RESPONSE_MINUTES: f64 = 60.0;

/// Contribution of each top-level factor to an assignment score, after the
/// router-settings multipliers have been applied. Persisted verbatim to the
/// assignment log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub branch_match: f64,
    pub region_match: f64,
    pub wait_time: f64,
    pub performance: f64,
    pub capacity: f64,
    pub urgency_bonus: f64,
    pub routing_priority: f64,
}

/// Full scoring result for one (lead, partner) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentScore {
    pub total: f64,
    pub factors: ScoreBreakdown,
    pub performance: PerformanceScore,
}

/// Deterministic weighted-sum matcher. Pure: all inputs, including the
/// evaluation instant, arrive as arguments, so identical inputs always yield
/// identical scores.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoreWeights,
    performance_weights: PerformanceWeights,
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(
        &self,
        lead: &Lead,
        industry_name: Option<&str>,
        partner: &Partner,
        stats: &PerformanceStats,
        settings: &RouterSettings,
        now: DateTime<Utc>,
    ) -> AssignmentScore {
        let region_multiplier = f64::from(settings.region_weight) / 50.0;
        let fairness_multiplier = f64::from(settings.fairness_weight) / 50.0;

        let branch_match = self.branch_factor(industry_name, partner);
        let region_match = self.region_factor(lead, partner) * region_multiplier;
        let wait_time = self.wait_time_factor(partner, stats, now) * fairness_multiplier;

        let performance = performance::performance_score(stats, &self.performance_weights);
        let performance_factor =
            performance.total / 100.0 * f64::from(settings.performance_weight);

        let capacity = self.capacity_factor(partner, stats);
        let urgency_bonus = self.urgency_factor(lead, stats);
        let routing_priority = f64::from(partner.routing_priority) * self.weights.routing_priority;

        let factors = ScoreBreakdown {
            branch_match: round2(branch_match),
            region_match: round2(region_match),
            wait_time: round2(wait_time),
            performance: round2(performance_factor),
            capacity: round2(capacity),
            urgency_bonus: round2(urgency_bonus),
            routing_priority: round2(routing_priority),
        };

        let total = branch_match
            + region_match
            + wait_time
            + performance_factor
            + capacity
            + urgency_bonus
            + routing_priority;

        AssignmentScore {
            total: round2(total),
            factors,
            performance,
        }
    }

    /// Exact primary-branch match beats a partial match through the
    /// partner's broader industry set; both comparisons ignore case.
    fn branch_factor(&self, industry_name: Option<&str>, partner: &Partner) -> f64 {
        let Some(name) = industry_name else {
            return 0.0;
        };

        if partner
            .primary_branch
            .as_deref()
            .is_some_and(|branch| branch.eq_ignore_ascii_case(name))
        {
            return self.weights.branch_match;
        }

        if partner
            .lead_industries
            .iter()
            .any(|branch| branch.eq_ignore_ascii_case(name))
        {
            return self.weights.branch_partial;
        }

        0.0
    }

    /// Province against the partner's region set: exact match full weight,
    /// substring overlap partial weight. Partners without regions fall back
    /// to an exact check against `lead_locations`.
    fn region_factor(&self, lead: &Lead, partner: &Partner) -> f64 {
        let Some(province) = lead.province.as_deref() else {
            return 0.0;
        };
        let province_lower = province.to_lowercase();

        if !partner.regions.is_empty() {
            if partner
                .regions
                .iter()
                .any(|region| region.eq_ignore_ascii_case(province))
            {
                return self.weights.region_match;
            }

            let overlap = partner.regions.iter().any(|region| {
                let region_lower = region.to_lowercase();
                region_lower.contains(&province_lower) || province_lower.contains(&region_lower)
            });
            if overlap {
                return self.weights.region_partial;
            }

            return 0.0;
        }

        if partner
            .lead_locations
            .iter()
            .any(|location| location.eq_ignore_ascii_case(province))
        {
            return self.weights.region_partial;
        }

        0.0
    }

    /// Hours since the partner last received a lead (or since the profile was
    /// created for partners that never did), capped at 24h and scaled
    /// linearly to the wait-time weight.
    fn wait_time_factor(
        &self,
        partner: &Partner,
        stats: &PerformanceStats,
        now: DateTime<Utc>,
    ) -> f64 {
        let hours = match stats.last_lead_assigned_at.or(partner.created_at) {
            Some(reference) => {
                let elapsed = now.signed_duration_since(reference);
                (elapsed.num_seconds() as f64 / 3600.0).max(0.0)
            }
            None => DEFAULT_WAIT_HOURS,
        };

        hours.min(WAIT_CAP_HOURS) / WAIT_CAP_HOURS * self.weights.wait_time
    }

    /// Headroom bonus that shrinks as the partner's open-lead count
    /// approaches their configured capacity.
    fn capacity_factor(&self, partner: &Partner, stats: &PerformanceStats) -> f64 {
        let max_leads = partner.max_open_leads.unwrap_or(DEFAULT_MAX_OPEN_LEADS);
        if max_leads == 0 {
            return 0.0;
        }

        let open_leads = stats.open_leads_count.unwrap_or(0);
        if open_leads >= max_leads {
            return 0.0;
        }

        f64::from(max_leads - open_leads) / f64::from(max_leads) * self.weights.capacity
    }

    /// Flat bonus steering urgent leads toward proven fast responders.
    fn urgency_factor(&self, lead: &Lead, stats: &PerformanceStats) -> f64 {
        if !lead.is_urgent {
            return 0.0;
        }

        let fast_responder = stats
            .avg_first_response_time_minutes_30d
            .is_some_and(|minutes| minutes < URGENCY_RESPONSE_MINUTES);

        if fast_responder {
            self.weights.urgency_bonus
        } else {
            0.0
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
