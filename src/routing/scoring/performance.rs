use serde::{Deserialize, Serialize};

use super::super::domain::PerformanceStats;
use super::round2;
use super::weights::PerformanceWeights;

/// Expected ceiling for the deal-value log normalization, in euros.
const MAX_EXPECTED_DEAL_VALUE: f64 = 10_000.0;

/// Normalized 0-100 contributions of the eight performance sub-factors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBreakdown {
    pub response_speed: f64,
    pub ai_trust: f64,
    pub deal_rate: f64,
    pub follow_up: f64,
    pub feedback: f64,
    pub complaints: f64,
    pub deal_value: f64,
    pub consistency: f64,
}

/// Blended 0-100 performance composite plus its sub-factor breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceScore {
    pub total: f64,
    pub breakdown: PerformanceBreakdown,
}

/// Compute the performance composite for one partner's stats snapshot.
///
/// Missing metrics contribute no signal: every sub-factor evaluates to 0
/// except the complaint penalty, which starts from 100 when there is no
/// complaint data (no complaints on record is a good sign, not a missing one).
pub(crate) fn performance_score(
    stats: &PerformanceStats,
    weights: &PerformanceWeights,
) -> PerformanceScore {
    let response_speed = response_speed_factor(stats);
    let ai_trust = stats.ai_trust_score.map_or(0.0, |v| v.clamp(0.0, 100.0));
    let deal_rate = stats
        .deal_rate_30d
        .map_or(0.0, |rate| rate.min(90.0).max(0.0) / 90.0 * 100.0);
    let follow_up = follow_up_factor(stats);
    let feedback = feedback_factor(stats);
    let complaints = complaint_factor(stats);
    let deal_value = stats
        .avg_deal_value_30d
        .filter(|value| *value > 0.0)
        .map_or(0.0, |value| {
            let normalized = (1.0 + value).ln() / (1.0 + MAX_EXPECTED_DEAL_VALUE).ln();
            (normalized * 20.0).min(20.0)
        });
    let consistency = stats.consistency_score.map_or(0.0, |v| v.clamp(0.0, 100.0));

    let total = response_speed * weights.response_speed
        + ai_trust * weights.ai_trust
        + deal_rate * weights.deal_rate
        + follow_up * weights.follow_up
        + feedback * weights.feedback
        + complaints * weights.complaints
        + deal_value * weights.deal_value
        + consistency * weights.consistency;

    PerformanceScore {
        total: round2(total),
        breakdown: PerformanceBreakdown {
            response_speed: round2(response_speed),
            ai_trust: round2(ai_trust),
            deal_rate: round2(deal_rate),
            follow_up: round2(follow_up),
            feedback: round2(feedback),
            complaints: round2(complaints),
            deal_value: round2(deal_value),
            consistency: round2(consistency),
        },
    }
}

/// Piecewise-linear response-time curve blended 70/20/10 with the 1-hour and
/// 24-hour contact-rate percentages.
fn response_speed_factor(stats: &PerformanceStats) -> f64 {
    let base = match stats.avg_first_response_time_minutes_30d {
        Some(minutes) if minutes <= 30.0 => 100.0,
        Some(minutes) if minutes <= 120.0 => 100.0 - ((minutes - 30.0) / 90.0) * 30.0,
        Some(minutes) if minutes <= 1440.0 => 70.0 - ((minutes - 120.0) / 1320.0) * 30.0,
        Some(minutes) => (40.0 - ((minutes - 1440.0) / 1440.0) * 40.0).max(0.0),
        None => 0.0,
    };

    let pct_within_1h = stats.pct_contacted_within_1h_30d.unwrap_or(0.0);
    let pct_within_24h = stats.pct_contacted_within_24h_30d.unwrap_or(0.0);

    (base * 0.7 + pct_within_1h * 0.2 + pct_within_24h * 0.1).min(100.0)
}

/// 2+-attempts percentage with a bonus for a healthy attempt cadence and a
/// penalty, floored at 0, for partners that barely follow up.
fn follow_up_factor(stats: &PerformanceStats) -> f64 {
    let mut factor = stats
        .pct_leads_min_2_attempts_30d
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);

    let avg_attempts = stats.avg_contact_attempts_per_lead_30d.unwrap_or(0.0);
    if (2.0..=3.0).contains(&avg_attempts) {
        factor = (factor + 10.0).min(100.0);
    } else if avg_attempts < 1.0 {
        factor = (factor - 20.0).max(0.0);
    }

    factor
}

/// 1-5 star rating mapped to 0-100, with a small reliability bonus once five
/// or more ratings exist.
fn feedback_factor(stats: &PerformanceStats) -> f64 {
    let mut factor = stats
        .avg_customer_rating_30d
        .map_or(0.0, |rating| (rating - 1.0) / 4.0 * 100.0);

    if stats.num_ratings_30d.unwrap_or(0) >= 5 {
        factor = (factor + 5.0).min(100.0);
    }

    factor.max(0.0)
}

/// Complaint rate and absolute complaint count both pull the factor down,
/// floored at 0.
fn complaint_factor(stats: &PerformanceStats) -> f64 {
    let rate = stats.complaint_rate_30d.unwrap_or(0.0);
    let mut factor = (100.0 - rate * 10.0).max(0.0);

    let count = stats.complaints_30d.unwrap_or(0);
    if count > 0 {
        factor = (factor - f64::from(count) * 5.0).max(0.0);
    }

    factor
}
