//! Power spectral densities over a set of frequency bands.

use serde::{Deserialize, Serialize};

/// One frequency band of a spectrum model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Center frequency in Hz.
    pub fc_hz: f64,
    /// Band width in Hz.
    pub width_hz: f64,
}

/// A power spectral density in W/Hz, one value per band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Psd {
    pub bands: Vec<Band>,
    pub values: Vec<f64>,
}

impl Psd {
    pub fn new(bands: Vec<Band>, values: Vec<f64>) -> Self {
        assert_eq!(
            bands.len(),
            values.len(),
            "one PSD value per frequency band"
        );
        Self { bands, values }
    }

    /// A flat PSD centered on `fc_hz`, spreading `total_power_w` evenly
    /// over `num_bands` bands of equal width.
    pub fn flat(fc_hz: f64, bandwidth_hz: f64, num_bands: usize, total_power_w: f64) -> Self {
        assert!(num_bands > 0, "a PSD needs at least one band");
        assert!(bandwidth_hz > 0.0, "bandwidth must be positive");

        let width = bandwidth_hz / num_bands as f64;
        let first = fc_hz - bandwidth_hz / 2.0 + width / 2.0;
        let bands = (0..num_bands)
            .map(|i| Band { fc_hz: first + i as f64 * width, width_hz: width })
            .collect();
        let values = vec![total_power_w / bandwidth_hz; num_bands];
        Self { bands, values }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Total power in W, integrating each band as value times width.
    pub fn total_power_w(&self) -> f64 {
        self.bands
            .iter()
            .zip(&self.values)
            .map(|(band, value)| value * band.width_hz)
            .sum()
    }
}
