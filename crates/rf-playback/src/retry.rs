//! Load-timeout budgets and tier escalation.
//!
//! A failing tier is abandoned immediately for the next untried one.
//! After the last tier fails, one cache-busted reload of that tier is
//! allowed before the session gives up. `max_attempts` caps the total
//! number of loads per session regardless of how many tiers remain.

use rf_core::config::PlaybackConfig;
use rf_core::Tier;
use std::time::{Duration, Instant};

/// What to do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Switch to the next candidate.
    Escalate { index: usize },
    /// Reload the same candidate with a cache-busting suffix.
    Reload { index: usize, cache_bust: u32 },
    /// Nothing left to try.
    Exhausted,
}

/// Per-session retry bookkeeping. The single source of truth for which
/// candidate is loaded and how many failures have occurred.
#[derive(Debug, Clone)]
pub struct RetryState {
    index: usize,
    attempt: u32,
    final_reload_used: bool,
    started: Instant,
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            index: 0,
            attempt: 0,
            final_reload_used: false,
            started: Instant::now(),
        }
    }

    /// Index into the candidate list currently being loaded.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Failures so far in this session.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// Timeout table and escalation rule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: PlaybackConfig,
}

impl RetryPolicy {
    pub fn new(config: PlaybackConfig) -> Self {
        Self { config }
    }

    pub fn load_timeout(&self, tier: Tier) -> Duration {
        self.config.load_timeout(tier)
    }

    pub fn stall_timeout(&self) -> Duration {
        self.config.stall_timeout()
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Record a failure of the current candidate and decide what to load next.
    pub fn on_failure(&self, state: &mut RetryState, candidate_count: usize) -> RetryDecision {
        state.attempt += 1;

        if state.attempt >= self.config.max_attempts {
            return RetryDecision::Exhausted;
        }

        if state.index + 1 < candidate_count {
            state.index += 1;
            return RetryDecision::Escalate { index: state.index };
        }

        if !state.final_reload_used {
            state.final_reload_used = true;
            return RetryDecision::Reload {
                index: state.index,
                cache_bust: state.attempt,
            };
        }

        RetryDecision::Exhausted
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(PlaybackConfig {
            max_attempts,
            ..PlaybackConfig::default()
        })
    }

    #[test]
    fn escalates_before_retrying_same_tier() {
        let p = policy(4);
        let mut s = RetryState::new();
        assert_eq!(p.on_failure(&mut s, 3), RetryDecision::Escalate { index: 1 });
        assert_eq!(p.on_failure(&mut s, 3), RetryDecision::Escalate { index: 2 });
        assert_eq!(
            p.on_failure(&mut s, 3),
            RetryDecision::Reload {
                index: 2,
                cache_bust: 3
            }
        );
        assert_eq!(p.on_failure(&mut s, 3), RetryDecision::Exhausted);
        assert_eq!(s.attempt(), 4);
    }

    #[test]
    fn single_candidate_goes_straight_to_cache_busted_reload() {
        let p = policy(4);
        let mut s = RetryState::new();
        assert_eq!(
            p.on_failure(&mut s, 1),
            RetryDecision::Reload {
                index: 0,
                cache_bust: 1
            }
        );
        assert_eq!(p.on_failure(&mut s, 1), RetryDecision::Exhausted);
    }

    #[test]
    fn attempt_cap_ends_session_even_with_tiers_left() {
        let p = policy(2);
        let mut s = RetryState::new();
        assert_eq!(p.on_failure(&mut s, 4), RetryDecision::Escalate { index: 1 });
        assert_eq!(p.on_failure(&mut s, 4), RetryDecision::Exhausted);
    }

    #[test]
    fn tiers_equal_to_budget_visit_every_tier_then_exhaust() {
        for k in 1..=4usize {
            let p = policy(4);
            let mut s = RetryState::new();
            let mut visited = vec![0usize];
            loop {
                match p.on_failure(&mut s, k) {
                    RetryDecision::Escalate { index } => {
                        assert!(index > *visited.last().unwrap(), "never loops back");
                        visited.push(index);
                    }
                    RetryDecision::Reload { index, .. } => assert_eq!(index, k - 1),
                    RetryDecision::Exhausted => break,
                }
            }
            assert_eq!(visited, (0..k).collect::<Vec<_>>());
        }
    }

    #[test]
    fn zero_budget_is_immediately_exhausted() {
        let p = policy(0);
        let mut s = RetryState::new();
        assert_eq!(p.on_failure(&mut s, 3), RetryDecision::Exhausted);
    }

    #[test]
    fn timeouts_come_from_config() {
        let p = RetryPolicy::default();
        assert_eq!(p.load_timeout(Tier::Transformed), Duration::from_millis(4_000));
        assert_eq!(p.stall_timeout(), Duration::from_millis(5_000));
        assert_eq!(p.max_attempts(), 4);
    }
}
