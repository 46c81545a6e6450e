//! Stochastic LOS/NLOS channel condition per link.
//!
//! The condition of a link is drawn from a scenario-specific LOS
//! probability curve and cached per node pair. A cached entry is reused
//! until `update_period_s` has elapsed; a period of zero means the
//! condition is drawn once and kept for the lifetime of the model.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{link_key, Node};
use crate::scenario::Scenario;

/// Line-of-sight state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LosState {
    Los,
    Nlos,
}

/// The large-scale state of a link at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelCondition {
    pub los: LosState,
    /// True when the receive end is indoors and outdoor-to-indoor
    /// penetration loss applies. Always false for indoor scenarios.
    pub o2i: bool,
    /// Simulation time at which this condition was drawn, in seconds.
    pub generated_at: f64,
}

/// Configuration for [`ConditionModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub scenario: Scenario,
    /// Refresh period in seconds; 0 means draw once and never refresh.
    pub update_period_s: f64,
    /// Probability that an outdoor link terminates indoors. Ignored for
    /// indoor scenarios.
    pub o2i_probability: f64,
    /// Seed for the condition random stream.
    pub seed: u64,
}

impl Default for ConditionConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Rma,
            update_period_s: 0.0,
            o2i_probability: 0.0,
            seed: 1,
        }
    }
}

/// Draws and caches the LOS/NLOS condition per link.
#[derive(Debug)]
pub struct ConditionModel {
    cfg: ConditionConfig,
    rng: StdRng,
    cache: HashMap<u64, ChannelCondition>,
}

impl ConditionModel {
    pub fn new(cfg: ConditionConfig) -> Self {
        let rng = StdRng::seed_from_u64(cfg.seed);
        Self { cfg, rng, cache: HashMap::new() }
    }

    pub fn scenario(&self) -> Scenario {
        self.cfg.scenario
    }

    /// The condition of the link between `a` and `b` at time `now`.
    ///
    /// Symmetric in its arguments: the cache key is order-independent, so
    /// `condition(a, b, t)` and `condition(b, a, t)` observe the same
    /// entry.
    pub fn condition(&mut self, a: &Node, b: &Node, now: f64) -> ChannelCondition {
        let key = link_key(a.id, b.id);

        if let Some(entry) = self.cache.get(&key) {
            let expired =
                self.cfg.update_period_s > 0.0 && now - entry.generated_at > self.cfg.update_period_s;
            if !expired {
                return *entry;
            }
            debug!(key, "channel condition expired, redrawing");
        }

        let cond = self.draw(a, b, now);
        self.cache.insert(key, cond);
        cond
    }

    fn draw(&mut self, a: &Node, b: &Node, now: f64) -> ChannelCondition {
        let p_los = los_probability(self.cfg.scenario, a, b);
        let p_ref: f64 = self.rng.gen();
        let los = if p_ref <= p_los { LosState::Los } else { LosState::Nlos };

        let o2i = if self.cfg.scenario.is_indoor() {
            false
        } else {
            self.rng.gen::<f64>() < self.cfg.o2i_probability
        };

        debug!(p_los, p_ref, ?los, o2i, "drew channel condition");
        ChannelCondition { los, o2i, generated_at: now }
    }
}

/// LOS probability of a link in the given scenario.
///
/// Each curve is an empirical fit in the 2D distance; all values are
/// clamped to [0, 1].
pub fn los_probability(scenario: Scenario, a: &Node, b: &Node) -> f64 {
    let d2d = a.position.distance_2d(&b.position);
    let p = match scenario {
        Scenario::Rma => rma_los_probability(d2d),
        Scenario::Uma => uma_los_probability(d2d, a.position.z.min(b.position.z)),
        Scenario::Umi => umi_los_probability(d2d),
        Scenario::InH => inh_los_probability(d2d),
        Scenario::InF => inf_los_probability(d2d),
    };
    p.clamp(0.0, 1.0)
}

fn rma_los_probability(d2d: f64) -> f64 {
    if d2d <= 10.0 {
        1.0
    } else {
        (-(d2d - 10.0) / 1000.0).exp()
    }
}

/// Squared urban-macro fit with a height correction term that kicks in
/// for terminal heights above 13 m (valid up to 23 m).
fn uma_los_probability(d2d: f64, h_ut: f64) -> f64 {
    if d2d <= 20.0 {
        return 1.0;
    }
    let c = if h_ut <= 13.0 {
        0.0
    } else {
        let g_2d = 1.25e-6 * d2d.powi(3) * (-d2d / 150.0).exp();
        ((h_ut - 13.0) / 10.0).powf(1.5) * g_2d
    };
    let base = (20.0 / d2d) * (1.0 - (-d2d / 160.0).exp()) + (-d2d / 160.0).exp();
    (base * (1.0 + c)).powi(2)
}

fn umi_los_probability(d2d: f64) -> f64 {
    if d2d <= 22.0 {
        1.0
    } else {
        ((22.0 / d2d) * (1.0 - 22.0 / d2d) + (-d2d / 100.0).exp()).powi(2)
    }
}

fn inh_los_probability(d2d: f64) -> f64 {
    if d2d <= 1.2 {
        1.0
    } else if d2d < 6.5 {
        (-(d2d - 1.2) / 4.7).exp()
    } else {
        0.32 * (-(d2d - 6.5) / 32.6).exp()
    }
}

fn inf_los_probability(d2d: f64) -> f64 {
    2.38 * (-d2d.powf(0.16) / 0.91).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;

    fn node(id: u32, x: f64, z: f64) -> Node {
        Node::stationary(id, Position::new(x, 0.0, z))
    }

    #[test]
    fn test_short_links_are_always_los() {
        let a = node(0, 0.0, 10.0);
        assert_eq!(los_probability(Scenario::Rma, &a, &node(1, 9.0, 1.5)), 1.0);
        assert_eq!(los_probability(Scenario::Uma, &a, &node(1, 15.0, 1.5)), 1.0);
        assert_eq!(los_probability(Scenario::Umi, &a, &node(1, 20.0, 1.5)), 1.0);
        assert_eq!(los_probability(Scenario::InH, &a, &node(1, 1.0, 1.5)), 1.0);
    }

    #[test]
    fn test_los_probability_decays_with_distance() {
        let a = node(0, 0.0, 10.0);
        for scenario in [Scenario::Rma, Scenario::Uma, Scenario::Umi, Scenario::InH, Scenario::InF]
        {
            let near = los_probability(scenario, &a, &node(1, 50.0, 1.5));
            let far = los_probability(scenario, &a, &node(1, 400.0, 1.5));
            assert!(
                far <= near,
                "{scenario}: p_los should not grow with distance ({near} -> {far})"
            );
        }
    }

    #[test]
    fn test_inh_piecewise_fit() {
        // Just past the first breakpoint
        let p = inh_los_probability(1.2 + 4.7);
        assert!((p - (-1.0f64).exp()).abs() < 1e-12);
        // Beyond the second breakpoint the curve starts from 0.32
        assert!((inh_los_probability(6.5) - 0.32).abs() < 1e-12);
    }

    #[test]
    fn test_condition_is_symmetric() {
        let mut model = ConditionModel::new(ConditionConfig {
            scenario: Scenario::Umi,
            ..Default::default()
        });
        let a = node(0, 0.0, 10.0);
        let b = node(1, 120.0, 1.5);
        let ab = model.condition(&a, &b, 0.0);
        let ba = model.condition(&b, &a, 0.0);
        assert_eq!(ab, ba, "condition must be reciprocal for a node pair");
    }

    #[test]
    fn test_condition_cache_never_refreshes_with_zero_period() {
        let mut model = ConditionModel::new(ConditionConfig {
            scenario: Scenario::Umi,
            update_period_s: 0.0,
            ..Default::default()
        });
        let a = node(0, 0.0, 10.0);
        let b = node(1, 300.0, 1.5);
        let first = model.condition(&a, &b, 0.0);
        let later = model.condition(&a, &b, 1e6);
        assert_eq!(first, later);
        assert_eq!(later.generated_at, 0.0);
    }

    #[test]
    fn test_condition_refreshes_after_update_period() {
        let mut model = ConditionModel::new(ConditionConfig {
            scenario: Scenario::Umi,
            update_period_s: 0.1,
            ..Default::default()
        });
        let a = node(0, 0.0, 10.0);
        let b = node(1, 300.0, 1.5);
        let first = model.condition(&a, &b, 0.0);
        let within = model.condition(&a, &b, 0.05);
        assert_eq!(first.generated_at, within.generated_at);
        let after = model.condition(&a, &b, 0.2);
        assert!(after.generated_at > first.generated_at);
    }

    #[test]
    fn test_indoor_scenarios_never_mark_o2i() {
        let mut model = ConditionModel::new(ConditionConfig {
            scenario: Scenario::InH,
            o2i_probability: 1.0,
            ..Default::default()
        });
        let cond = model.condition(&node(0, 0.0, 2.5), &node(1, 10.0, 1.5), 0.0);
        assert!(!cond.o2i);
    }

    #[test]
    fn test_o2i_probability_one_marks_outdoor_links() {
        let mut model = ConditionModel::new(ConditionConfig {
            scenario: Scenario::Uma,
            o2i_probability: 1.0,
            ..Default::default()
        });
        let cond = model.condition(&node(0, 0.0, 25.0), &node(1, 100.0, 1.5), 0.0);
        assert!(cond.o2i);
    }
}
