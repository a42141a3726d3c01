use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    Lead, LeadId, Partner, PartnerId, PerformanceStats, RouterSettings,
};
use super::repository::{
    IndustryCatalog, LeadStore, PartnerDirectory, SettingsStore, StatsProvider, StoreError,
};
use super::scoring::{AssignmentScore, ScoreBreakdown, ScoringEngine};
use super::RoutingError;

/// A partner scored against one lead.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub partner: Partner,
    pub stats: PerformanceStats,
    pub score: AssignmentScore,
}

/// One entry of the recommendations listing exposed to admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub partner_id: PartnerId,
    pub company_name: Option<String>,
    pub primary_branch: Option<String>,
    pub regions: Vec<String>,
    pub score: f64,
    pub factors: ScoreBreakdown,
    pub open_leads_count: u32,
    pub max_open_leads: u32,
    pub leads_assigned_30d: u32,
    pub last_lead_assigned_at: Option<DateTime<Utc>>,
}

/// Top-N recommendations for a lead, without committing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationList {
    pub lead_id: LeadId,
    pub recommendations: Vec<Recommendation>,
    pub total_candidates: usize,
}

/// Produces the ranked candidate list for a lead: every partner flagged for
/// routing, scored, zero scores dropped, sorted best-first.
pub struct CandidateSelector {
    leads: Arc<dyn LeadStore>,
    partners: Arc<dyn PartnerDirectory>,
    industries: Arc<dyn IndustryCatalog>,
    stats: Arc<dyn StatsProvider>,
    settings: Arc<dyn SettingsStore>,
    engine: ScoringEngine,
}

impl CandidateSelector {
    pub fn new(
        leads: Arc<dyn LeadStore>,
        partners: Arc<dyn PartnerDirectory>,
        industries: Arc<dyn IndustryCatalog>,
        stats: Arc<dyn StatsProvider>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            leads,
            partners,
            industries,
            stats,
            settings,
            engine: ScoringEngine::new(),
        }
    }

    /// Fetch the lead and rank all eligible partners for it.
    pub fn candidates(&self, lead_id: &LeadId) -> Result<Vec<Candidate>, RoutingError> {
        let lead = self.fetch_assignable_lead(lead_id)?;
        let settings = self.settings_or_default();
        self.rank(&lead, &settings, Utc::now())
    }

    /// Top-N candidates with the partner display data the admin UI renders.
    pub fn recommendations(
        &self,
        lead_id: &LeadId,
        top_n: usize,
    ) -> Result<RecommendationList, RoutingError> {
        let candidates = self.candidates(lead_id)?;
        let total_candidates = candidates.len();

        let recommendations = candidates
            .into_iter()
            .take(top_n)
            .map(|candidate| Recommendation {
                partner_id: candidate.partner.id.clone(),
                company_name: candidate.partner.company_name.clone(),
                primary_branch: candidate.partner.primary_branch.clone(),
                regions: candidate.partner.regions.clone(),
                score: candidate.score.total,
                factors: candidate.score.factors,
                open_leads_count: candidate.stats.open_leads_count.unwrap_or(0),
                max_open_leads: candidate.partner.max_open_leads.unwrap_or(5),
                leads_assigned_30d: candidate.stats.leads_assigned_30d.unwrap_or(0),
                last_lead_assigned_at: candidate.stats.last_lead_assigned_at,
            })
            .collect();

        Ok(RecommendationList {
            lead_id: lead_id.clone(),
            recommendations,
            total_candidates,
        })
    }

    /// Load a lead and reject it when its lifecycle no longer allows routing.
    pub(crate) fn fetch_assignable_lead(&self, lead_id: &LeadId) -> Result<Lead, RoutingError> {
        let lead = self
            .leads
            .get_lead(lead_id)?
            .ok_or(RoutingError::LeadNotFound)?;

        if !lead.status.is_assignable() {
            return Err(RoutingError::AlreadyFinal {
                status: lead.status,
            });
        }

        Ok(lead)
    }

    /// Router settings with the documented defaults when the store fails.
    /// A failed fetch is a warning, never fatal.
    pub(crate) fn settings_or_default(&self) -> RouterSettings {
        match self.settings.router_settings() {
            Ok(settings) => settings,
            Err(error) => {
                warn!(%error, "router settings unavailable, using defaults");
                RouterSettings::default()
            }
        }
    }

    /// Score every active routing partner for the lead. The evaluation
    /// instant is captured once by the caller so all candidates in one pass
    /// see the same wait-time baseline.
    pub(crate) fn rank(
        &self,
        lead: &Lead,
        settings: &RouterSettings,
        now: DateTime<Utc>,
    ) -> Result<Vec<Candidate>, RoutingError> {
        let industry_name = self.resolve_industry_name(lead)?;
        let partners = self.partners.list_active_routing_partners()?;

        let stats_by_partner: HashMap<PartnerId, PerformanceStats> =
            self.stats.list_performance_stats()?.into_iter().collect();

        let mut candidates: Vec<Candidate> = partners
            .into_iter()
            .map(|partner| {
                let stats = stats_by_partner
                    .get(&partner.id)
                    .cloned()
                    .unwrap_or_default();
                let score = self.engine.score(
                    lead,
                    industry_name.as_deref(),
                    &partner,
                    &stats,
                    settings,
                    now,
                );
                Candidate {
                    partner,
                    stats,
                    score,
                }
            })
            .filter(|candidate| candidate.score.total > 0.0)
            .collect();

        // Descending by score, then ascending by partner id so equal scores
        // keep a deterministic order.
        candidates.sort_by(|a, b| {
            b.score
                .total
                .partial_cmp(&a.score.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.partner.id.cmp(&b.partner.id))
        });

        Ok(candidates)
    }

    /// Score one specific partner for a directed assignment. The partner is
    /// looked up without the routing-active filter: a manual assignment may
    /// target a partner that opted out of automatic routing.
    pub(crate) fn score_partner(
        &self,
        lead: &Lead,
        partner_id: &PartnerId,
        settings: &RouterSettings,
        now: DateTime<Utc>,
    ) -> Result<Candidate, RoutingError> {
        let partner = self
            .partners
            .get_partner(partner_id)?
            .ok_or(RoutingError::PartnerNotFound)?;

        let stats = self.stats.stats_for(partner_id)?.unwrap_or_default();
        let industry_name = self.resolve_industry_name(lead)?;
        let score = self
            .engine
            .score(lead, industry_name.as_deref(), &partner, &stats, settings, now);

        Ok(Candidate {
            partner,
            stats,
            score,
        })
    }

    pub(crate) fn resolve_industry_name(&self, lead: &Lead) -> Result<Option<String>, StoreError> {
        match &lead.industry {
            Some(industry) => self.industries.industry_name(industry),
            None => Ok(None),
        }
    }
}
