//! Deployment scenarios and frequency calibration helpers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Lower edge of the calibrated carrier band in Hz.
pub const MIN_FREQUENCY_HZ: f64 = 0.5e9;
/// Upper edge of the calibrated carrier band in Hz.
pub const MAX_FREQUENCY_HZ: f64 = 150.0e9;

/// Lower measurement anchor for parameter interpolation, in GHz.
const ANCHOR_LOW_GHZ: f64 = 28.0;
/// Upper measurement anchor for parameter interpolation, in GHz.
const ANCHOR_HIGH_GHZ: f64 = 140.0;

/// Deployment environment of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// Urban microcell, street-level base stations.
    Umi,
    /// Urban macrocell, rooftop base stations.
    Uma,
    /// Rural macrocell.
    Rma,
    /// Indoor hotspot (office).
    InH,
    /// Indoor factory.
    InF,
}

impl Scenario {
    /// True for the indoor environments where no outdoor-to-indoor
    /// penetration applies.
    pub fn is_indoor(&self) -> bool {
        matches!(self, Scenario::InH | Scenario::InF)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::Umi => "Umi",
            Scenario::Uma => "Uma",
            Scenario::Rma => "Rma",
            Scenario::InH => "InH",
            Scenario::InF => "InF",
        };
        f.write_str(name)
    }
}

impl FromStr for Scenario {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Umi" => Ok(Scenario::Umi),
            "Uma" => Ok(Scenario::Uma),
            "Rma" => Ok(Scenario::Rma),
            "InH" => Ok(Scenario::InH),
            "InF" => Ok(Scenario::InF),
            other => Err(ChannelError::UnknownScenario(other.to_string())),
        }
    }
}

/// Check that a carrier frequency lies inside the calibrated band.
pub fn validate_frequency(frequency_hz: f64) -> crate::error::Result<()> {
    if (MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&frequency_hz) {
        Ok(())
    } else {
        Err(ChannelError::FrequencyOutOfBand(frequency_hz))
    }
}

/// Interpolate an empirical parameter between its 28 GHz and 140 GHz
/// measurement anchors.
///
/// Below the lower anchor the 28 GHz value applies, above the upper
/// anchor the 140 GHz value; in between the value is linear in frequency
/// and passes through both anchors.
pub fn calibrated(freq_ghz: f64, low: f64, high: f64) -> f64 {
    if freq_ghz < ANCHOR_LOW_GHZ {
        low
    } else if freq_ghz > ANCHOR_HIGH_GHZ {
        high
    } else {
        freq_ghz * (high - low) / (ANCHOR_HIGH_GHZ - ANCHOR_LOW_GHZ) + (5.0 * low - high) / 4.0
    }
}

/// Wrap an angle in degrees into [0, 360).
pub fn wrap_to_360(mut deg: f64) -> f64 {
    deg %= 360.0;
    if deg < 0.0 {
        deg += 360.0;
    }
    deg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibrated_hits_anchors() {
        assert!((calibrated(28.0, 2.0, 4.0) - 2.0).abs() < 1e-12);
        assert!((calibrated(140.0, 2.0, 4.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_calibrated_clamps_outside_anchors() {
        assert_eq!(calibrated(5.0, 2.0, 4.0), 2.0);
        assert_eq!(calibrated(145.0, 2.0, 4.0), 4.0);
    }

    #[test]
    fn test_calibrated_is_linear_between_anchors() {
        let mid = calibrated(84.0, 2.0, 4.0);
        // 84 GHz is halfway between 28 and 140
        assert!((mid - 3.0).abs() < 1e-12, "expected 3.0, got {mid}");
    }

    #[test]
    fn test_scenario_round_trip() {
        for name in ["Umi", "Uma", "Rma", "InH", "InF"] {
            let s: Scenario = name.parse().unwrap();
            assert_eq!(s.to_string(), name);
        }
        assert!("Suburban".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_wrap_to_360() {
        assert!((wrap_to_360(370.0) - 10.0).abs() < 1e-12);
        assert!((wrap_to_360(-10.0) - 350.0).abs() < 1e-12);
        assert_eq!(wrap_to_360(0.0), 0.0);
    }

    #[test]
    fn test_frequency_validation() {
        assert!(validate_frequency(28.0e9).is_ok());
        assert!(validate_frequency(0.5e9).is_ok());
        assert!(validate_frequency(150.0e9).is_ok());
        assert!(validate_frequency(0.4e9).is_err());
        assert!(validate_frequency(151.0e9).is_err());
    }
}
