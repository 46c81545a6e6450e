//! Drop-based channel matrix generation with per-link caching.
//!
//! A [`ChannelMatrixGenerator`] owns the link condition model and two
//! caches. Channel parameters (the ray-level output of a drop) are
//! cached per node pair and regenerated when the link condition changes
//! or the update period expires. Channel matrices (parameters combined
//! with a pair of antenna arrays) are cached per array pair and
//! resynthesized whenever the underlying parameters are newer.

use std::collections::HashMap;
use std::sync::Arc;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use raywave_core::geometry::{bearing, link_key};
use raywave_core::scenario::validate_frequency;
use raywave_core::{
    ChannelCondition, ChannelError, ConditionConfig, ConditionModel, LosState, Node, Result,
    Scenario,
};

use crate::antenna::PhasedArray;
use crate::cluster::{generate_channel_params, ChannelParams};
use crate::params::ScenarioParams;

/// Widest supported RF bandwidth, Hz.
pub const MAX_RF_BANDWIDTH_HZ: f64 = 1000.0e6;

/// Configuration shared by parameter generation and matrix synthesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    pub scenario: Scenario,
    /// Carrier frequency in Hz.
    pub frequency_hz: f64,
    /// RF bandwidth in Hz, at most [`MAX_RF_BANDWIDTH_HZ`].
    pub rf_bandwidth_hz: f64,
    /// Seconds a cached drop stays fresh; 0 keeps it forever.
    pub update_period_s: f64,
    /// Seconds a cached link condition stays fresh; 0 keeps it forever.
    pub condition_update_period_s: f64,
    /// Probability that an outdoor link is outdoor-to-indoor.
    pub o2i_probability: f64,
    pub seed: u64,
    pub run: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Rma,
            frequency_hz: 28.0e9,
            rf_bandwidth_hz: 500.0e6,
            update_period_s: 0.0,
            condition_update_period_s: 0.0,
            o2i_probability: 0.0,
            seed: 1,
            run: 1,
        }
    }
}

/// A synthesized MIMO channel matrix for one array pair.
///
/// `coefficients[u][s][n]` is the complex gain from transmit element
/// `s` to receive element `u` over ray `n`, in the direction the matrix
/// was generated in (`node_ids.0` transmitting).
#[derive(Debug, Clone)]
pub struct ChannelMatrix {
    pub node_ids: (u32, u32),
    pub antenna_ids: (u32, u32),
    pub generated_at: f64,
    pub coefficients: Vec<Vec<Vec<Complex64>>>,
    pub delays_ns: Vec<f64>,
    pub aod_rad: Vec<f64>,
    pub zod_rad: Vec<f64>,
    pub aoa_rad: Vec<f64>,
    pub zoa_rad: Vec<f64>,
}

impl ChannelMatrix {
    pub fn num_rays(&self) -> usize {
        self.delays_ns.len()
    }

    /// Whether the matrix was generated with the roles of the two
    /// arrays swapped relative to the caller.
    pub fn is_reverse(&self, tx_array_id: u32, rx_array_id: u32) -> bool {
        self.antenna_ids == (rx_array_id, tx_array_id)
    }
}

/// Generates and caches channel parameters and matrices per link.
pub struct ChannelMatrixGenerator {
    cfg: ChannelConfig,
    conditions: ConditionModel,
    params_cache: HashMap<u64, Arc<ChannelParams>>,
    matrix_cache: HashMap<u64, Arc<ChannelMatrix>>,
    drop_counters: HashMap<u64, u64>,
}

impl ChannelMatrixGenerator {
    pub fn new(cfg: ChannelConfig) -> Result<Self> {
        validate_frequency(cfg.frequency_hz)?;
        if !(cfg.rf_bandwidth_hz > 0.0 && cfg.rf_bandwidth_hz <= MAX_RF_BANDWIDTH_HZ) {
            return Err(ChannelError::BandwidthOutOfRange(cfg.rf_bandwidth_hz));
        }
        let conditions = ConditionModel::new(ConditionConfig {
            scenario: cfg.scenario,
            update_period_s: cfg.condition_update_period_s,
            o2i_probability: cfg.o2i_probability,
            seed: base_seed(&cfg),
        });
        Ok(Self {
            cfg,
            conditions,
            params_cache: HashMap::new(),
            matrix_cache: HashMap::new(),
            drop_counters: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.cfg
    }

    /// Current link condition, via the shared condition model.
    pub fn condition(&mut self, a: &Node, b: &Node, now: f64) -> ChannelCondition {
        self.conditions.condition(a, b, now)
    }

    /// Channel parameters for a node pair, regenerated when stale.
    ///
    /// The drop is stale when the link condition changed or the update
    /// period expired. Each drop consumes a fresh deterministic RNG
    /// stream derived from the seed, run, link key and drop counter, so
    /// two generators with the same configuration produce bit-identical
    /// output for the same call sequence.
    pub fn params(&mut self, a: &Node, b: &Node, now: f64) -> Arc<ChannelParams> {
        let condition = self.conditions.condition(a, b, now);
        let key = link_key(a.id, b.id);

        let fresh = match self.params_cache.get(&key) {
            None => false,
            Some(p) => {
                p.los == condition.los
                    && p.o2i == condition.o2i
                    && (self.cfg.update_period_s == 0.0
                        || now - p.generated_at <= self.cfg.update_period_s)
            }
        };
        if !fresh {
            let drop = self.drop_counters.entry(key).or_insert(0);
            let mut rng = StdRng::seed_from_u64(drop_seed(base_seed(&self.cfg), key, *drop));
            *drop += 1;

            let f_ghz = self.cfg.frequency_hz / 1.0e9;
            let table = ScenarioParams::for_link(self.cfg.scenario, condition.los, f_ghz);
            let params = generate_channel_params(
                &mut rng,
                self.cfg.scenario,
                self.cfg.frequency_hz,
                self.cfg.rf_bandwidth_hz,
                &table,
                &condition,
                a,
                b,
                now,
            );
            debug!(
                link = key,
                rays = params.rays.len(),
                los = ?condition.los,
                "generated channel drop"
            );
            self.params_cache.insert(key, Arc::new(params));
        }
        Arc::clone(&self.params_cache[&key])
    }

    /// Channel matrix between two antenna arrays, resynthesized when
    /// the link parameters are newer than the cached matrix.
    pub fn channel(
        &mut self,
        tx: &Node,
        rx: &Node,
        tx_array: &PhasedArray,
        rx_array: &PhasedArray,
        now: f64,
    ) -> Arc<ChannelMatrix> {
        let params = self.params(tx, rx, now);
        let key = link_key(tx_array.id(), rx_array.id());

        let fresh = match self.matrix_cache.get(&key) {
            None => false,
            Some(m) => params.generated_at <= m.generated_at,
        };
        if !fresh {
            let matrix = synthesize(&self.cfg, &params, tx, rx, tx_array, rx_array, now);
            self.matrix_cache.insert(key, Arc::new(matrix));
        }
        Arc::clone(&self.matrix_cache[&key])
    }
}

/// Base RNG seed combining the configured seed and run number.
fn base_seed(cfg: &ChannelConfig) -> u64 {
    cfg.seed.wrapping_mul(10007).wrapping_add(cfg.run)
}

/// Stream seed for one drop of one link.
fn drop_seed(base: u64, key: u64, drop: u64) -> u64 {
    base ^ key
        .wrapping_mul(6364136223846793005)
        .wrapping_add(drop.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Builds the MIMO matrix from ray-level parameters.
///
/// When the cached parameters were generated in the opposite direction,
/// departure and arrival angles are swapped so the matrix is expressed
/// with `tx` transmitting.
fn synthesize(
    cfg: &ChannelConfig,
    params: &ChannelParams,
    tx: &Node,
    rx: &Node,
    tx_array: &PhasedArray,
    rx_array: &PhasedArray,
    now: f64,
) -> ChannelMatrix {
    let forward = params.node_ids == (tx.id, rx.id);
    let num_rays = params.rays.len();
    let u_size = rx_array.num_elements();
    let s_size = tx_array.num_elements();

    let mut aod = Vec::with_capacity(num_rays);
    let mut zod = Vec::with_capacity(num_rays);
    let mut aoa = Vec::with_capacity(num_rays);
    let mut zoa = Vec::with_capacity(num_rays);
    for ray in &params.rays {
        if forward {
            aod.push(ray.aod_rad);
            zod.push(ray.zod_rad);
            aoa.push(ray.aoa_rad);
            zoa.push(ray.zoa_rad);
        } else {
            aod.push(ray.aoa_rad);
            zod.push(ray.zoa_rad);
            aoa.push(ray.aod_rad);
            zoa.push(ray.zod_rad);
        }
    }

    // The direct ray of a LOS link follows the link geometry, not the
    // drawn lobe angles.
    let los = params.los == LosState::Los;
    let (los_aod, los_incl_d) = bearing(&tx.position, &rx.position);
    let (los_aoa, los_incl_a) = bearing(&rx.position, &tx.position);

    let mut coefficients = vec![vec![vec![Complex64::new(0.0, 0.0); num_rays]; s_size]; u_size];
    for n in 0..num_rays {
        let ray = &params.rays[n];
        let (ray_aod, ray_zod, ray_aoa, ray_zoa) = if los && n == 0 {
            (los_aod, los_incl_d, los_aoa, los_incl_a)
        } else {
            (aod[n], zod[n], aoa[n], zoa[n])
        };

        let (rx_phi, rx_theta) = rx_array.element_field_pattern(ray_aoa, ray_zoa);
        let (tx_phi, tx_theta) = tx_array.element_field_pattern(ray_aod, ray_zod);

        // Four polarization terms: co-polar theta, the two cross-polar
        // leakages and co-polar phi, each attenuated by its XPD value.
        let leak = |xpd_db: f64| (1.0 / 10f64.powf(xpd_db / 10.0)).sqrt();
        let ray_field = Complex64::from_polar(1.0, ray.phases[0]) * rx_theta * tx_theta
            + Complex64::from_polar(leak(ray.xpd_db[1]), ray.phases[1]) * rx_theta * tx_phi
            + Complex64::from_polar(leak(ray.xpd_db[2]), ray.phases[2]) * rx_phi * tx_theta
            + Complex64::from_polar(leak(ray.xpd_db[0]), ray.phases[3]) * rx_phi * tx_phi;
        let amplitude = ray_field * ray.power.sqrt();

        for (u, row) in coefficients.iter_mut().enumerate() {
            let rx_phase = rx_array.element_phase(u, ray_aoa, ray_zoa);
            let rx_term = Complex64::from_polar(1.0, rx_phase);
            for (s, cell) in row.iter_mut().enumerate() {
                let tx_phase = tx_array.element_phase(s, ray_aod, ray_zod);
                cell[n] = amplitude * rx_term * Complex64::from_polar(1.0, tx_phase);
            }
        }
    }

    debug!(
        tx = tx.id,
        rx = rx.id,
        rays = num_rays,
        elements = u_size * s_size,
        fc_ghz = cfg.frequency_hz / 1.0e9,
        "synthesized channel matrix"
    );

    ChannelMatrix {
        node_ids: (tx.id, rx.id),
        antenna_ids: (tx_array.id(), rx_array.id()),
        generated_at: now,
        coefficients,
        delays_ns: params.rays.iter().map(|r| r.delay_ns).collect(),
        aod_rad: aod,
        zod_rad: zod,
        aoa_rad: aoa,
        zoa_rad: zoa,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raywave_core::{Position, Velocity};

    fn test_nodes() -> (Node, Node) {
        (
            Node::stationary(0, Position { x: 0.0, y: 0.0, z: 10.0 }),
            Node::stationary(1, Position { x: 30.0, y: 0.0, z: 1.6 }),
        )
    }

    fn test_config() -> ChannelConfig {
        ChannelConfig { scenario: Scenario::Umi, ..ChannelConfig::default() }
    }

    #[test]
    fn test_rejects_out_of_band_frequency() {
        let cfg = ChannelConfig { frequency_hz: 200.0e9, ..test_config() };
        assert!(matches!(
            ChannelMatrixGenerator::new(cfg),
            Err(ChannelError::FrequencyOutOfBand(_))
        ));
    }

    #[test]
    fn test_rejects_excessive_bandwidth() {
        let cfg = ChannelConfig { rf_bandwidth_hz: 2.0e9, ..test_config() };
        assert!(matches!(
            ChannelMatrixGenerator::new(cfg),
            Err(ChannelError::BandwidthOutOfRange(_))
        ));
    }

    #[test]
    fn test_params_are_cached_between_calls() {
        let (a, b) = test_nodes();
        let mut gen = ChannelMatrixGenerator::new(test_config()).unwrap();
        let first = gen.params(&a, &b, 0.0);
        let second = gen.params(&a, &b, 0.5);
        assert!(Arc::ptr_eq(&first, &second), "fresh drop must be reused");
    }

    #[test]
    fn test_params_regenerate_after_update_period() {
        let (a, b) = test_nodes();
        let cfg = ChannelConfig { update_period_s: 1.0, ..test_config() };
        let mut gen = ChannelMatrixGenerator::new(cfg).unwrap();
        let first = gen.params(&a, &b, 0.0);
        let second = gen.params(&a, &b, 2.0);
        assert!(second.generated_at > first.generated_at);
    }

    #[test]
    fn test_drop_is_fresh_at_exact_period_boundary() {
        let (a, b) = test_nodes();
        let cfg = ChannelConfig { update_period_s: 1.0, ..test_config() };
        let mut gen = ChannelMatrixGenerator::new(cfg).unwrap();
        let first = gen.params(&a, &b, 0.0);
        let at_boundary = gen.params(&a, &b, 1.0);
        assert!(
            Arc::ptr_eq(&first, &at_boundary),
            "a drop expires strictly after the update period, not at it"
        );
    }

    #[test]
    fn test_condition_and_drop_periods_are_independent() {
        let (a, b) = test_nodes();
        let cfg = ChannelConfig {
            update_period_s: 1.0,
            condition_update_period_s: 0.0,
            ..test_config()
        };
        let mut gen = ChannelMatrixGenerator::new(cfg).unwrap();
        let initial_condition = gen.condition(&a, &b, 0.0);
        let first = gen.params(&a, &b, 0.0);
        let second = gen.params(&a, &b, 2.0);
        assert!(second.generated_at > first.generated_at, "the drop must refresh");
        assert_eq!(
            gen.condition(&a, &b, 2.0),
            initial_condition,
            "a zero condition period must keep the original draw"
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let (a, b) = test_nodes();
        let mut gen1 = ChannelMatrixGenerator::new(test_config()).unwrap();
        let mut gen2 = ChannelMatrixGenerator::new(test_config()).unwrap();
        let p1 = gen1.params(&a, &b, 0.0);
        let p2 = gen2.params(&a, &b, 0.0);
        assert_eq!(p1.rays.len(), p2.rays.len());
        for (r1, r2) in p1.rays.iter().zip(&p2.rays) {
            assert_eq!(r1.delay_ns, r2.delay_ns);
            assert_eq!(r1.power, r2.power);
            assert_eq!(r1.aoa_rad, r2.aoa_rad);
        }
    }

    #[test]
    fn test_different_run_changes_the_drop() {
        let (a, b) = test_nodes();
        let mut gen1 = ChannelMatrixGenerator::new(test_config()).unwrap();
        let mut gen2 =
            ChannelMatrixGenerator::new(ChannelConfig { run: 2, ..test_config() }).unwrap();
        let p1 = gen1.params(&a, &b, 0.0);
        let p2 = gen2.params(&a, &b, 0.0);
        let same = p1.rays.len() == p2.rays.len()
            && p1.rays.iter().zip(&p2.rays).all(|(r1, r2)| r1.delay_ns == r2.delay_ns);
        assert!(!same, "different run numbers must give different drops");
    }

    #[test]
    fn test_matrix_dimensions_match_arrays() {
        let (a, b) = test_nodes();
        let tx_array = PhasedArray::uniform_planar(0, 2, 2, 0.5);
        let rx_array = PhasedArray::uniform_planar(1, 1, 2, 0.5);
        let mut gen = ChannelMatrixGenerator::new(test_config()).unwrap();
        let matrix = gen.channel(&a, &b, &tx_array, &rx_array, 0.0);
        assert_eq!(matrix.coefficients.len(), 2);
        assert_eq!(matrix.coefficients[0].len(), 4);
        assert_eq!(matrix.coefficients[0][0].len(), matrix.num_rays());
    }

    #[test]
    fn test_matrix_is_cached_until_params_refresh() {
        let (a, b) = test_nodes();
        let tx_array = PhasedArray::uniform_planar(0, 2, 2, 0.5);
        let rx_array = PhasedArray::uniform_planar(1, 2, 2, 0.5);
        let cfg = ChannelConfig { update_period_s: 1.0, ..test_config() };
        let mut gen = ChannelMatrixGenerator::new(cfg).unwrap();
        let m1 = gen.channel(&a, &b, &tx_array, &rx_array, 0.0);
        let m2 = gen.channel(&a, &b, &tx_array, &rx_array, 0.5);
        assert!(Arc::ptr_eq(&m1, &m2));
        let m3 = gen.channel(&a, &b, &tx_array, &rx_array, 2.0);
        assert!(m3.generated_at > m1.generated_at);
    }

    #[test]
    fn test_reverse_call_reuses_params() {
        let (a, b) = test_nodes();
        let mut gen = ChannelMatrixGenerator::new(test_config()).unwrap();
        let forward = gen.params(&a, &b, 0.0);
        let reverse = gen.params(&b, &a, 0.0);
        assert!(Arc::ptr_eq(&forward, &reverse), "links are undirected");
    }

    #[test]
    fn test_moving_node_keeps_drop_until_condition_flips() {
        let (a, mut b) = test_nodes();
        b.velocity = Velocity { x: 1.0, y: 0.0, z: 0.0 };
        let mut gen = ChannelMatrixGenerator::new(test_config()).unwrap();
        let p1 = gen.params(&a, &b, 0.0);
        let p2 = gen.params(&a, &b, 0.1);
        assert!(Arc::ptr_eq(&p1, &p2));
    }
}
