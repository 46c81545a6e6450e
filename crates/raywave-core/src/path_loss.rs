//! Close-in reference distance path loss with correlated shadow fading.
//!
//! The loss of a link is the free-space loss at 1 m plus a
//! scenario-specific distance exponent, with optional additive terms for
//! shadow fading, outdoor-to-indoor penetration, foliage and gaseous
//! attenuation. Shadow fading is spatially correlated: successive values
//! for a link decorrelate exponentially with the displacement of the
//! node pair.

use std::collections::HashMap;
use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::atmosphere::{attenuation_db_per_m, AtmosphereConfig};
use crate::condition::{ChannelCondition, LosState};
use crate::error::Result;
use crate::geometry::{link_key, Node, SPEED_OF_LIGHT};
use crate::scenario::{calibrated, validate_frequency, Scenario};

/// Reference distance of the close-in model, in meters.
const REFERENCE_DISTANCE_M: f64 = 1.0;
/// Links shorter than this are evaluated at this distance to keep the
/// log-distance term finite.
const MIN_DISTANCE_2D_M: f64 = 0.01;

/// Outdoor-to-indoor penetration loss class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum O2iLossType {
    /// Low-loss building materials (wood, standard glass).
    Low,
    /// High-loss building materials (concrete, IRR glass).
    High,
}

/// Configuration for [`PathLossModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathLossConfig {
    pub scenario: Scenario,
    /// Carrier frequency in Hz, 0.5-150 GHz.
    pub frequency_hz: f64,
    /// Apply spatially correlated shadow fading.
    pub shadowing_enabled: bool,
    /// Apply a random foliage loss proportional to a uniform fraction of
    /// the 2D distance.
    pub foliage_loss_enabled: bool,
    pub foliage_loss_db_per_m: f64,
    /// Penetration loss class applied when a link condition is O2I.
    pub o2i_loss_type: O2iLossType,
    /// Gaseous attenuation; `None` disables the term.
    pub atmosphere: Option<AtmosphereConfig>,
    /// Seed for the shadowing, foliage and O2I random streams.
    pub seed: u64,
}

impl Default for PathLossConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Rma,
            frequency_hz: 28.0e9,
            shadowing_enabled: true,
            foliage_loss_enabled: false,
            foliage_loss_db_per_m: 0.4,
            o2i_loss_type: O2iLossType::Low,
            atmosphere: None,
            seed: 1,
        }
    }
}

/// Per-link shadow fading state.
#[derive(Debug, Clone, Copy)]
struct ShadowEntry {
    /// Last drawn shadow fading value in dB.
    value_db: f64,
    /// LOS state the value was drawn under; a state flip forces a fresh
    /// draw.
    los: LosState,
    /// Ground-plane displacement of the pair when the value was drawn,
    /// ordered by node id so both directions observe the same vector.
    dx: f64,
    dy: f64,
}

/// Computes received power over a link from the closed-form loss fits.
#[derive(Debug)]
pub struct PathLossModel {
    cfg: PathLossConfig,
    rng: StdRng,
    normal: Normal<f64>,
    /// Precomputed gaseous attenuation in dB/m, zero when disabled.
    atmo_db_per_m: f64,
    shadowing: HashMap<u64, ShadowEntry>,
}

impl PathLossModel {
    pub fn new(cfg: PathLossConfig) -> Result<Self> {
        validate_frequency(cfg.frequency_hz)?;
        let atmo_db_per_m = cfg
            .atmosphere
            .as_ref()
            .map(|atmo| attenuation_db_per_m(cfg.frequency_hz / 1e9, atmo))
            .unwrap_or(0.0);
        Ok(Self {
            rng: StdRng::seed_from_u64(cfg.seed),
            normal: Normal::new(0.0, 1.0).expect("unit normal is well-formed"),
            atmo_db_per_m,
            shadowing: HashMap::new(),
            cfg,
        })
    }

    pub fn scenario(&self) -> Scenario {
        self.cfg.scenario
    }

    pub fn frequency_hz(&self) -> f64 {
        self.cfg.frequency_hz
    }

    /// Received power in dBm over the link, given its condition.
    ///
    /// `tx_power_dbm` is the power fed to the transmit antenna port;
    /// antenna gains are the concern of the fast-fading layer, not of
    /// this model.
    pub fn rx_power_dbm(
        &mut self,
        tx_power_dbm: f64,
        a: &Node,
        b: &Node,
        condition: &ChannelCondition,
    ) -> f64 {
        let d2d = a.position.distance_2d(&b.position).max(MIN_DISTANCE_2D_M);
        let mut loss_db = self.path_loss_db(a, b, condition.los);

        if self.cfg.shadowing_enabled {
            loss_db += self.shadow_fading_db(a, b, condition.los);
        }
        if condition.o2i {
            loss_db += self.o2i_loss_db();
        }
        if self.cfg.foliage_loss_enabled {
            let depth: f64 = self.rng.gen_range(0.0..=d2d);
            loss_db += self.cfg.foliage_loss_db_per_m * depth;
        }
        loss_db += self.atmo_db_per_m * d2d;

        debug!(d2d, loss_db, "computed link loss");
        tx_power_dbm - loss_db
    }

    /// Median path loss in dB, without shadowing or additive terms.
    pub fn path_loss_db(&self, a: &Node, b: &Node, los: LosState) -> f64 {
        let d2d = a.position.distance_2d(&b.position).max(MIN_DISTANCE_2D_M);
        let fspl = self.free_space_loss_at_reference_db();
        let log_d = d2d.log10();

        match (self.cfg.scenario, los) {
            // Rural macro uses height-corrected slopes instead of a plain
            // distance exponent.
            (Scenario::Rma, LosState::Los) => {
                let h_bs = a.position.z.max(b.position.z);
                fspl + 23.1 * (1.0 - 0.03 * ((h_bs - 35.0) / 35.0)) * log_d
            }
            (Scenario::Rma, LosState::Nlos) => {
                let h_bs = a.position.z.max(b.position.z);
                fspl + 30.7 * (1.0 - 0.049 * ((h_bs - 35.0) / 35.0)) * log_d
            }
            (scenario, los) => {
                fspl + 10.0 * path_loss_exponent(scenario, los, self.cfg.frequency_hz / 1e9) * log_d
            }
        }
    }

    /// Free-space loss at the 1 m reference distance in dB.
    fn free_space_loss_at_reference_db(&self) -> f64 {
        let lambda = SPEED_OF_LIGHT / self.cfg.frequency_hz;
        20.0 * (4.0 * PI * REFERENCE_DISTANCE_M / lambda).log10()
    }

    /// Correlated shadow fading for the link in dB.
    ///
    /// A fresh Gaussian is drawn on the first evaluation of a link and
    /// whenever its LOS state flips; otherwise the previous value is
    /// carried over with an exponential correlation in the pair
    /// displacement since the last draw.
    fn shadow_fading_db(&mut self, a: &Node, b: &Node, los: LosState) -> f64 {
        let key = link_key(a.id, b.id);
        let sigma = shadow_sigma_db(self.cfg.scenario, los, self.cfg.frequency_hz / 1e9);

        // Order the displacement by node id so both call directions see
        // the same vector.
        let (lo, hi) = if a.id < b.id { (a, b) } else { (b, a) };
        let dx = hi.position.x - lo.position.x;
        let dy = hi.position.y - lo.position.y;

        let value = match self.shadowing.get(&key) {
            Some(entry) if entry.los == los => {
                let disp = ((dx - entry.dx).powi(2) + (dy - entry.dy).powi(2)).sqrt();
                let corr_dist = shadow_correlation_distance_m(self.cfg.scenario, los);
                let r = (-disp / corr_dist).exp();
                r * entry.value_db + (1.0 - r * r).sqrt() * sigma * self.normal.sample(&mut self.rng)
            }
            _ => sigma * self.normal.sample(&mut self.rng),
        };

        self.shadowing.insert(key, ShadowEntry { value_db: value, los, dx, dy });
        value
    }

    /// Building penetration loss in dB for the configured loss class.
    fn o2i_loss_db(&mut self) -> f64 {
        let f_ghz = self.cfg.frequency_hz / 1e9;
        let n: f64 = self.normal.sample(&mut self.rng);
        match self.cfg.o2i_loss_type {
            O2iLossType::Low => 10.0 * (5.0 + 0.03 * f_ghz * f_ghz).log10() + 4.0 * n,
            O2iLossType::High => 10.0 * (10.0 + 5.0 * f_ghz * f_ghz).log10() + 6.0 * n,
        }
    }
}

/// Close-in path loss exponent for the scenario, LOS state and carrier
/// frequency in GHz.
fn path_loss_exponent(scenario: Scenario, los: LosState, f_ghz: f64) -> f64 {
    match (scenario, los) {
        (Scenario::Umi, LosState::Los) => 2.0,
        (Scenario::Umi, LosState::Nlos) => calibrated(f_ghz, 3.2, 2.9),
        (Scenario::Uma, LosState::Los) => 2.0,
        (Scenario::Uma, LosState::Nlos) => 2.9,
        (Scenario::InH, LosState::Los) => {
            // The indoor LOS exponent keeps falling below the lower
            // anchor, fitted down to 1 GHz.
            if f_ghz < 28.0 {
                f_ghz * (1.2 - 1.8) / 27.0 + (28.0 * 1.8 - 1.2) / 27.0
            } else {
                calibrated(f_ghz, 1.2, 1.8)
            }
        }
        (Scenario::InH, LosState::Nlos) => 2.7,
        (Scenario::InF, LosState::Los) => 1.7,
        (Scenario::InF, LosState::Nlos) => 3.1,
        // Rma has dedicated closed forms; the exponent is never queried.
        (Scenario::Rma, _) => unreachable!("Rma uses height-corrected slopes"),
    }
}

/// Shadow fading standard deviation in dB.
fn shadow_sigma_db(scenario: Scenario, los: LosState, f_ghz: f64) -> f64 {
    match (scenario, los) {
        (Scenario::Umi | Scenario::Uma, LosState::Los) => calibrated(f_ghz, 4.0, 2.6),
        (Scenario::Umi | Scenario::Uma, LosState::Nlos) => calibrated(f_ghz, 7.0, 8.2),
        (Scenario::Rma, LosState::Los) => 1.7,
        (Scenario::Rma, LosState::Nlos) => 6.7,
        (Scenario::InH, LosState::Los) => calibrated(f_ghz, 3.0, 2.9),
        (Scenario::InH, LosState::Nlos) => calibrated(f_ghz, 9.8, 6.6),
        (Scenario::InF, LosState::Los) => 3.0,
        (Scenario::InF, LosState::Nlos) => 7.0,
    }
}

/// Decorrelation distance of shadow fading in meters.
fn shadow_correlation_distance_m(scenario: Scenario, los: LosState) -> f64 {
    match (scenario, los) {
        (Scenario::Umi, LosState::Los) => 10.0,
        (Scenario::Umi, LosState::Nlos) => 13.0,
        (Scenario::Uma, LosState::Los) => 37.0,
        (Scenario::Uma, LosState::Nlos) => 50.0,
        (Scenario::Rma, LosState::Los) => 37.0,
        (Scenario::Rma, LosState::Nlos) => 120.0,
        (Scenario::InH, LosState::Los) => 10.0,
        (Scenario::InH, LosState::Nlos) => 6.0,
        (Scenario::InF, _) => 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;

    fn model(scenario: Scenario, f_hz: f64) -> PathLossModel {
        PathLossModel::new(PathLossConfig {
            scenario,
            frequency_hz: f_hz,
            shadowing_enabled: false,
            ..Default::default()
        })
        .unwrap()
    }

    fn node(id: u32, x: f64, z: f64) -> Node {
        Node::stationary(id, Position::new(x, 0.0, z))
    }

    #[test]
    fn test_rejects_out_of_band_frequency() {
        let err = PathLossModel::new(PathLossConfig {
            frequency_hz: 0.2e9,
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_loss_at_reference_distance_is_fspl() {
        let m = model(Scenario::Umi, 28.0e9);
        let a = node(0, 0.0, 10.0);
        let b = node(1, 1.0, 10.0);
        let lambda = SPEED_OF_LIGHT / 28.0e9;
        let fspl = 20.0 * (4.0 * PI / lambda).log10();
        let pl = m.path_loss_db(&a, &b, LosState::Los);
        assert!((pl - fspl).abs() < 1e-9, "expected {fspl}, got {pl}");
    }

    #[test]
    fn test_loss_is_monotone_in_distance() {
        for scenario in [Scenario::Umi, Scenario::Uma, Scenario::Rma, Scenario::InH, Scenario::InF]
        {
            let m = model(scenario, 28.0e9);
            let a = node(0, 0.0, 10.0);
            let mut last = f64::NEG_INFINITY;
            for d in [1.0, 10.0, 50.0, 200.0, 500.0] {
                let pl = m.path_loss_db(&a, &node(1, d, 1.6), LosState::Nlos);
                assert!(pl > last, "{scenario}: loss must grow with distance");
                last = pl;
            }
        }
    }

    #[test]
    fn test_nlos_loses_more_than_los() {
        let m = model(Scenario::Umi, 28.0e9);
        let a = node(0, 0.0, 10.0);
        let b = node(1, 100.0, 1.6);
        assert!(m.path_loss_db(&a, &b, LosState::Nlos) > m.path_loss_db(&a, &b, LosState::Los));
    }

    #[test]
    fn test_umi_nlos_exponent_tracks_frequency() {
        assert!((path_loss_exponent(Scenario::Umi, LosState::Nlos, 28.0) - 3.2).abs() < 1e-12);
        assert!((path_loss_exponent(Scenario::Umi, LosState::Nlos, 140.0) - 2.9).abs() < 1e-12);
    }

    #[test]
    fn test_inh_los_exponent_is_continuous_at_lower_anchor() {
        let below = path_loss_exponent(Scenario::InH, LosState::Los, 27.999);
        let at = path_loss_exponent(Scenario::InH, LosState::Los, 28.0);
        assert!((below - at).abs() < 1e-3);
        assert!((at - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_rx_power_deterministic_under_same_seed() {
        let a = node(0, 0.0, 10.0);
        let b = node(1, 80.0, 1.6);
        let cond = ChannelCondition {
            los: LosState::Nlos,
            o2i: false,
            generated_at: 0.0,
        };
        let cfg = PathLossConfig {
            scenario: Scenario::Umi,
            seed: 7,
            ..Default::default()
        };
        let p1 = PathLossModel::new(cfg.clone()).unwrap().rx_power_dbm(10.0, &a, &b, &cond);
        let p2 = PathLossModel::new(cfg).unwrap().rx_power_dbm(10.0, &a, &b, &cond);
        assert_eq!(p1, p2, "same seed must give identical received power");
    }

    #[test]
    fn test_shadowing_is_correlated_for_small_displacement() {
        let mut m = PathLossModel::new(PathLossConfig {
            scenario: Scenario::Uma,
            seed: 3,
            ..Default::default()
        })
        .unwrap();
        let first = m.shadow_fading_db(&node(0, 0.0, 25.0), &node(1, 100.0, 1.6), LosState::Nlos);
        // 0.1 m displacement against a 50 m decorrelation distance
        let second =
            m.shadow_fading_db(&node(0, 0.0, 25.0), &node(1, 100.1, 1.6), LosState::Nlos);
        assert!(
            (second - first).abs() < 3.0,
            "nearby evaluations should stay close: {first} vs {second}"
        );
    }

    #[test]
    fn test_shadowing_redraws_on_condition_flip() {
        let mut m = PathLossModel::new(PathLossConfig {
            scenario: Scenario::Uma,
            seed: 3,
            ..Default::default()
        })
        .unwrap();
        let a = node(0, 0.0, 25.0);
        let b = node(1, 100.0, 1.6);
        let nlos = m.shadow_fading_db(&a, &b, LosState::Nlos);
        let los = m.shadow_fading_db(&a, &b, LosState::Los);
        // Fresh draw under a different sigma, not a scaled carry-over.
        assert_ne!(nlos, los);
    }

    #[test]
    fn test_o2i_high_exceeds_low_on_average() {
        let f_ghz: f64 = 100.0;
        let low = 10.0 * (5.0 + 0.03 * f_ghz * f_ghz).log10();
        let high = 10.0 * (10.0 + 5.0 * f_ghz * f_ghz).log10();
        assert!(high > low + 20.0, "high-loss class should dominate at 100 GHz");
    }

    #[test]
    fn test_atmosphere_adds_distance_proportional_loss() {
        let a = node(0, 0.0, 10.0);
        let b = node(1, 500.0, 1.6);
        let cond = ChannelCondition {
            los: LosState::Los,
            o2i: false,
            generated_at: 0.0,
        };
        let dry = PathLossModel::new(PathLossConfig {
            scenario: Scenario::Umi,
            frequency_hz: 60.0e9,
            shadowing_enabled: false,
            ..Default::default()
        })
        .unwrap()
        .rx_power_dbm(10.0, &a, &b, &cond);
        let humid = PathLossModel::new(PathLossConfig {
            scenario: Scenario::Umi,
            frequency_hz: 60.0e9,
            shadowing_enabled: false,
            atmosphere: Some(AtmosphereConfig::default()),
            ..Default::default()
        })
        .unwrap()
        .rx_power_dbm(10.0, &a, &b, &cond);
        // 60 GHz sits on the oxygen absorption peak, the extra loss over
        // 500 m is substantial.
        assert!(dry - humid > 1.0, "expected measurable gaseous loss, got {}", dry - humid);
    }
}
