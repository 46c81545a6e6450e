//! Phased antenna arrays with analog beamforming weights.
//!
//! Element positions are expressed in wavelength units so the spatial
//! phase of an element is frequency-independent. The element pattern is
//! an isotropic, vertically polarized radiator; directivity comes from
//! the array factor alone.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// A planar phased array with per-element complex weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhasedArray {
    id: u32,
    /// Element positions in wavelength units, `[x, y, z]`.
    elements: Vec<[f64; 3]>,
    weights: Vec<Complex64>,
}

impl PhasedArray {
    /// A uniform planar array in the y-z plane, broadside along +x.
    ///
    /// `spacing` is the element pitch in wavelengths, typically 0.5. The
    /// initial beamforming vector is uniform with unit norm.
    pub fn uniform_planar(id: u32, rows: usize, cols: usize, spacing: f64) -> Self {
        assert!(rows > 0 && cols > 0, "array must hold at least one element");
        assert!(spacing > 0.0, "element spacing must be positive");

        let mut elements = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let y = (col as f64 - (cols as f64 - 1.0) / 2.0) * spacing;
                let z = (row as f64 - (rows as f64 - 1.0) / 2.0) * spacing;
                elements.push([0.0, y, z]);
            }
        }
        let n = elements.len();
        let weights = vec![Complex64::new(1.0 / (n as f64).sqrt(), 0.0); n];
        Self { id, elements, weights }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Position of an element in wavelength units.
    pub fn element_location(&self, index: usize) -> [f64; 3] {
        self.elements[index]
    }

    /// Spatial phase of an element towards a direction, radians.
    pub fn element_phase(&self, index: usize, azimuth: f64, inclination: f64) -> f64 {
        let [x, y, z] = self.elements[index];
        2.0 * std::f64::consts::PI
            * (inclination.sin() * azimuth.cos() * x
                + inclination.sin() * azimuth.sin() * y
                + inclination.cos() * z)
    }

    /// Field pattern of one element towards a direction, as the
    /// horizontal and vertical polarization components.
    pub fn element_field_pattern(&self, _azimuth: f64, _inclination: f64) -> (f64, f64) {
        // Isotropic vertically polarized element.
        (0.0, 1.0)
    }

    pub fn beamforming_vector(&self) -> &[Complex64] {
        &self.weights
    }

    /// Replace the beamforming vector; the length must match the array.
    pub fn set_beamforming_vector(&mut self, weights: Vec<Complex64>) {
        assert_eq!(
            weights.len(),
            self.elements.len(),
            "beamforming vector length must match the element count"
        );
        self.weights = weights;
    }

    /// Point the main lobe towards a direction by conjugate phase
    /// steering with unit norm.
    pub fn steer(&mut self, azimuth: f64, inclination: f64) {
        let n = self.elements.len() as f64;
        self.weights = (0..self.elements.len())
            .map(|i| {
                let phase = self.element_phase(i, azimuth, inclination);
                Complex64::from_polar(1.0 / n.sqrt(), -phase)
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_upa_geometry_is_centered() {
        let array = PhasedArray::uniform_planar(0, 2, 2, 0.5);
        assert_eq!(array.num_elements(), 4);
        // Centered: element positions sum to the origin
        let sum: [f64; 3] = array.elements.iter().fold([0.0; 3], |mut acc, e| {
            acc[0] += e[0];
            acc[1] += e[1];
            acc[2] += e[2];
            acc
        });
        assert!(sum.iter().all(|c| c.abs() < 1e-12));
    }

    #[test]
    fn test_initial_weights_have_unit_norm() {
        let array = PhasedArray::uniform_planar(0, 4, 4, 0.5);
        let norm: f64 = array.beamforming_vector().iter().map(|w| w.norm_sqr()).sum();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_steering_compensates_element_phase() {
        let mut array = PhasedArray::uniform_planar(0, 1, 4, 0.5);
        // Steer broadside-ish with some azimuth offset
        let az = 0.3;
        let incl = FRAC_PI_2;
        array.steer(az, incl);
        // All weighted element responses add coherently in that direction.
        let response: Complex64 = (0..array.num_elements())
            .map(|i| {
                array.beamforming_vector()[i]
                    * Complex64::from_polar(1.0, array.element_phase(i, az, incl))
            })
            .sum();
        let n = array.num_elements() as f64;
        assert!((response.norm() - n.sqrt()).abs() < 1e-9);
        assert!(response.im.abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "length must match")]
    fn test_rejects_mismatched_beamforming_vector() {
        let mut array = PhasedArray::uniform_planar(0, 2, 2, 0.5);
        array.set_beamforming_vector(vec![Complex64::new(1.0, 0.0); 3]);
    }
}
