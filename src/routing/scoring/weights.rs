/// Top-level factor weights for the assignment score. Region and wait-time
/// contributions are additionally multiplied by the router settings, and the
/// performance composite is scaled by `RouterSettings::performance_weight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Exact primary-branch match.
    pub branch_match: f64,
    /// Partial match via the partner's `lead_industries` set.
    pub branch_partial: f64,
    /// Exact province/region match.
    pub region_match: f64,
    /// Substring-overlap or `lead_locations` fallback match.
    pub region_partial: f64,
    /// Wait-time bonus at the 24-hour cap.
    pub wait_time: f64,
    /// Bonus at full capacity headroom.
    pub capacity: f64,
    /// Fast-responder bonus for urgent leads.
    pub urgency_bonus: f64,
    /// Multiplier applied to the partner's manual `routing_priority`.
    pub routing_priority: f64,
}

impl ScoreWeights {
    pub const DEFAULT: ScoreWeights = ScoreWeights {
        branch_match: 100.0,
        branch_partial: 50.0,
        region_match: 80.0,
        region_partial: 40.0,
        wait_time: 60.0,
        capacity: 30.0,
        urgency_bonus: 20.0,
        routing_priority: 10.0,
    };
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Blend weights for the eight performance sub-factors. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceWeights {
    pub response_speed: f64,
    pub ai_trust: f64,
    pub deal_rate: f64,
    pub follow_up: f64,
    pub feedback: f64,
    pub complaints: f64,
    pub deal_value: f64,
    pub consistency: f64,
}

impl PerformanceWeights {
    pub const DEFAULT: PerformanceWeights = PerformanceWeights {
        response_speed: 0.15,
        ai_trust: 0.15,
        deal_rate: 0.20,
        follow_up: 0.10,
        feedback: 0.15,
        complaints: 0.10,
        deal_value: 0.05,
        consistency: 0.10,
    };

    pub fn sum(&self) -> f64 {
        self.response_speed
            + self.ai_trust
            + self.deal_rate
            + self.follow_up
            + self.feedback
            + self.complaints
            + self.deal_value
            + self.consistency
    }
}

impl Default for PerformanceWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}
