//! Applies a fading channel to a transmit power spectral density.
//!
//! The beamformed gain of the array pair is folded into a per-ray
//! long-term vector which only depends on the channel matrix and the
//! two beamforming vectors, so it is cached per array pair and
//! recomputed when the matrix is regenerated or either beamforming
//! vector changes. Per call, each ray then picks up a Doppler rotation
//! from the node velocities and a delay-dependent phase per frequency
//! band.

use std::collections::HashMap;
use std::f64::consts::PI;

use num_complex::Complex64;
use tracing::trace;

use raywave_core::geometry::link_key;
use raywave_core::{Node, Velocity, SPEED_OF_LIGHT};

use crate::antenna::PhasedArray;
use crate::channel::{ChannelMatrix, ChannelMatrixGenerator};
use crate::psd::Psd;

struct LongTermEntry {
    gains: Vec<Complex64>,
    matrix_generated_at: f64,
    tx_weights: Vec<Complex64>,
    rx_weights: Vec<Complex64>,
}

/// Shapes transmit PSDs through the generated channel matrices.
pub struct SpectrumApplier {
    generator: ChannelMatrixGenerator,
    long_term: HashMap<u64, LongTermEntry>,
}

impl SpectrumApplier {
    pub fn new(generator: ChannelMatrixGenerator) -> Self {
        Self { generator, long_term: HashMap::new() }
    }

    pub fn generator(&self) -> &ChannelMatrixGenerator {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut ChannelMatrixGenerator {
        &mut self.generator
    }

    /// The received PSD after beamforming, Doppler and delay rotation.
    ///
    /// Bands carrying no transmit power stay empty.
    pub fn apply(
        &mut self,
        psd: &Psd,
        tx: &Node,
        rx: &Node,
        tx_array: &PhasedArray,
        rx_array: &PhasedArray,
        now: f64,
    ) -> Psd {
        assert_ne!(tx.id, rx.id, "a link needs two distinct nodes");
        assert!(
            tx.position.distance_3d(&rx.position) > 0.0,
            "the two nodes must not be co-located"
        );

        let matrix = self.generator.channel(tx, rx, tx_array, rx_array, now);

        // Beamforming weights follow the direction the matrix was
        // generated in, which may be the reverse of this call.
        let (s_array, u_array) = if matrix.is_reverse(tx_array.id(), rx_array.id()) {
            (rx_array, tx_array)
        } else {
            (tx_array, rx_array)
        };
        let long_term = self.long_term_gains(&matrix, s_array, u_array);

        let (s_vel, u_vel) = if matrix.node_ids.0 == tx.id {
            (tx.velocity, rx.velocity)
        } else {
            (rx.velocity, tx.velocity)
        };
        let doppler = doppler_rotations(
            &matrix,
            s_vel,
            u_vel,
            now,
            self.generator.config().frequency_hz,
        );

        let mut out = psd.clone();
        for (band, value) in out.bands.iter().zip(out.values.iter_mut()) {
            if *value == 0.0 {
                continue;
            }
            let band_gain: Complex64 = (0..matrix.num_rays())
                .map(|n| {
                    let delay_phase = -2.0 * PI * band.fc_hz * matrix.delays_ns[n] * 1.0e-9;
                    long_term[n] * Complex64::from_polar(1.0, delay_phase) * doppler[n]
                })
                .sum();
            *value *= band_gain.norm_sqr();
        }
        trace!(
            tx = tx.id,
            rx = rx.id,
            rays = matrix.num_rays(),
            rx_power_w = out.total_power_w(),
            "applied channel to PSD"
        );
        out
    }

    /// Per-ray beamformed gains, cached per array pair.
    fn long_term_gains(
        &mut self,
        matrix: &ChannelMatrix,
        s_array: &PhasedArray,
        u_array: &PhasedArray,
    ) -> Vec<Complex64> {
        let key = link_key(matrix.antenna_ids.0, matrix.antenna_ids.1);
        let s_w = s_array.beamforming_vector();
        let u_w = u_array.beamforming_vector();

        let fresh = match self.long_term.get(&key) {
            None => false,
            Some(entry) => {
                entry.matrix_generated_at == matrix.generated_at
                    && entry.tx_weights == s_w
                    && entry.rx_weights == u_w
            }
        };
        if !fresh {
            let gains = compute_long_term(matrix, s_w, u_w);
            self.long_term.insert(
                key,
                LongTermEntry {
                    gains,
                    matrix_generated_at: matrix.generated_at,
                    tx_weights: s_w.to_vec(),
                    rx_weights: u_w.to_vec(),
                },
            );
        }
        self.long_term[&key].gains.clone()
    }
}

/// Contracts the matrix with the beamforming vectors, one gain per ray.
fn compute_long_term(
    matrix: &ChannelMatrix,
    s_w: &[Complex64],
    u_w: &[Complex64],
) -> Vec<Complex64> {
    let num_rays = matrix.num_rays();
    let mut gains = vec![Complex64::new(0.0, 0.0); num_rays];
    for (n, gain) in gains.iter_mut().enumerate() {
        for (u, row) in matrix.coefficients.iter().enumerate() {
            let mut rx_sum = Complex64::new(0.0, 0.0);
            for (s, cell) in row.iter().enumerate() {
                rx_sum += cell[n] * s_w[s];
            }
            *gain += u_w[u] * rx_sum;
        }
    }
    gains
}

/// Per-ray Doppler phase rotations at the given instant.
fn doppler_rotations(
    matrix: &ChannelMatrix,
    s_vel: Velocity,
    u_vel: Velocity,
    now: f64,
    frequency_hz: f64,
) -> Vec<Complex64> {
    let factor = 2.0 * PI * now * frequency_hz / SPEED_OF_LIGHT;
    (0..matrix.num_rays())
        .map(|n| {
            let arrival = matrix.zoa_rad[n].sin() * matrix.aoa_rad[n].cos() * u_vel.x
                + matrix.zoa_rad[n].sin() * matrix.aoa_rad[n].sin() * u_vel.y
                + matrix.zoa_rad[n].cos() * u_vel.z;
            let departure = matrix.zod_rad[n].sin() * matrix.aod_rad[n].cos() * s_vel.x
                + matrix.zod_rad[n].sin() * matrix.aod_rad[n].sin() * s_vel.y
                + matrix.zod_rad[n].cos() * s_vel.z;
            Complex64::from_polar(1.0, factor * (arrival + departure))
        })
        .collect()
}
