//! Reward scoring against service-level constraints

use crate::models::{SloConstraints, State};

/// Latency term assigned when the hard constraint is violated.
pub const HARD_VIOLATION_TERM: f64 = -1.0;

/// Convex combination weights for the reward terms.
#[derive(Debug, Clone, Copy)]
pub struct RewardWeights {
    /// Weight of the resource-efficiency term.
    pub resource: f64,
    /// Weight of the latency term.
    pub latency: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            resource: 0.3,
            latency: 0.7,
        }
    }
}

/// Converts an observation and its SLO annotations into a scalar score and
/// a termination flag. Termination is the only way this type affects
/// control flow: it never errors and never mutates anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardEvaluator {
    weights: RewardWeights,
}

impl RewardEvaluator {
    pub fn new(weights: RewardWeights) -> Self {
        Self { weights }
    }

    /// Score one observation.
    ///
    /// The resource term rewards running fewer replicas:
    /// `r1 = (max - replicas) / max`, in `[0, 1)` for replicas in
    /// `[1, max]`. The latency term applies only when both constraints are
    /// set: 1 at or below soft, linear falloff between soft and hard, and
    /// the hard-violation value (with termination) above hard.
    pub fn score(
        &self,
        state: &State,
        constraints: &SloConstraints,
        max_replicas: u32,
    ) -> (f64, bool) {
        let max = max_replicas as f64;
        let r1 = (max - state.replicas) / max;

        let (r2, terminated) = match constraints.both_set() {
            Some((soft, hard)) => {
                let latency = state.p95_latency_ms;
                if latency > hard {
                    (HARD_VIOLATION_TERM, true)
                } else if latency > soft {
                    (1.0 - (latency - soft) / (hard - soft), false)
                } else {
                    (1.0, false)
                }
            }
            None => (0.0, false),
        };

        (self.weights.resource * r1 + self.weights.latency * r2, terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(replicas: f64, latency: f64) -> State {
        State {
            cpu_usage_percent: 0.0,
            memory_normalized: 0.0,
            replicas,
            p95_latency_ms: latency,
            requests_per_second: 0.0,
        }
    }

    fn slo(soft: f64, hard: f64) -> SloConstraints {
        SloConstraints {
            latency_soft_ms: Some(soft),
            latency_hard_ms: Some(hard),
        }
    }

    #[test]
    fn resource_term_monotone_and_bounded() {
        let evaluator = RewardEvaluator::default();
        let max = 15u32;
        let mut previous = f64::INFINITY;

        for replicas in 1..=max {
            let (reward, _) =
                evaluator.score(&state_with(replicas as f64, 0.0), &SloConstraints::default(), max);
            // With constraints unset the latency term is 0, so the reward
            // is the weighted resource term alone.
            let r1 = reward / 0.3;
            assert!(r1 >= 0.0 && r1 < 1.0, "r1 out of range at {replicas}");
            assert!(r1 <= previous, "r1 not monotone at {replicas}");
            previous = r1;
        }
    }

    #[test]
    fn hard_violation_terminates_at_minimum_term() {
        let evaluator = RewardEvaluator::default();
        let (reward, terminated) = evaluator.score(&state_with(1.0, 700.0), &slo(100.0, 500.0), 15);

        assert!(terminated);
        let r1 = (15.0 - 1.0) / 15.0;
        let expected = 0.3 * r1 + 0.7 * HARD_VIOLATION_TERM;
        assert!((reward - expected).abs() < 1e-9);
    }

    #[test]
    fn below_soft_gets_full_latency_credit() {
        let evaluator = RewardEvaluator::default();
        for latency in [0.0, 50.0, 100.0] {
            let (reward, terminated) =
                evaluator.score(&state_with(15.0, latency), &slo(100.0, 500.0), 15);
            assert!(!terminated);
            // replicas at max: r1 = 0, so only the latency term remains.
            assert!((reward - 0.7).abs() < 1e-9, "latency {latency}");
        }
    }

    #[test]
    fn between_constraints_interpolates_linearly() {
        let evaluator = RewardEvaluator::default();
        let (reward, terminated) = evaluator.score(&state_with(15.0, 300.0), &slo(100.0, 500.0), 15);

        assert!(!terminated);
        // (300 - 100) / (500 - 100) = 0.5 of the way down.
        assert!((reward - 0.7 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn unset_constraints_never_terminate_on_latency() {
        let evaluator = RewardEvaluator::default();
        let (reward, terminated) =
            evaluator.score(&state_with(5.0, 10_000.0), &SloConstraints::default(), 15);

        assert!(!terminated);
        assert!((reward - 0.3 * (10.0 / 15.0)).abs() < 1e-9);
    }
}
