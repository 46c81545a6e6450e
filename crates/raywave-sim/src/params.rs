//! Empirical cluster parameter tables per scenario and LOS state.
//!
//! Every frequency-dependent entry is interpolated between the 28 GHz
//! and 140 GHz measurement anchors; see
//! [`raywave_core::scenario::calibrated`]. Delays are in nanoseconds,
//! powers in dB, angles in degrees.

use serde::{Deserialize, Serialize};

use raywave_core::condition::LosState;
use raywave_core::scenario::{calibrated, Scenario};

/// Shape of the intra-lobe angular offset distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleDistribution {
    Gaussian,
    Laplacian,
}

/// Lobe angular spread: standard deviation and distribution shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleSpread {
    pub sd_deg: f64,
    pub distribution: AngleDistribution,
}

impl AngleSpread {
    fn gaussian(sd_deg: f64) -> Self {
        Self { sd_deg, distribution: AngleDistribution::Gaussian }
    }

    fn laplacian(sd_deg: f64) -> Self {
        Self { sd_deg, distribution: AngleDistribution::Laplacian }
    }
}

/// One row of the measurement-fitted cluster statistics.
///
/// Not every field is meaningful in every scenario: the outdoor
/// scenarios bound cluster counts uniformly (`max_time_clusters`,
/// `max_subpaths`), the indoor ones draw them from Poisson and
/// exponential fits (`cluster_rate`, `subpath_split_prob`,
/// `mean_subpaths`), and only the factory uses the Gamma delay fits.
/// Unused fields are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub max_time_clusters: u32,
    pub max_subpaths: u32,
    /// Poisson rate for the indoor time cluster count.
    pub cluster_rate: f64,
    /// Probability that an indoor cluster holds more than one subpath.
    pub subpath_split_prob: f64,
    /// Mean of the exponential subpath count fit.
    pub mean_subpaths: f64,
    /// Mean number of departure spatial lobes.
    pub mean_aod_lobes: f64,
    /// Mean number of arrival spatial lobes.
    pub mean_aoa_lobes: f64,
    /// Upper bound of the intra-cluster delay stretch exponent.
    pub delay_stretch_max: f64,
    /// Mean intra-cluster subpath delay, ns.
    pub mean_intra_delay_ns: f64,
    /// Gamma shape/scale of the factory intra-cluster delay fit.
    pub intra_delay_shape: f64,
    pub intra_delay_scale_ns: f64,
    /// Mean cluster excess delay, ns.
    pub mean_excess_delay_ns: f64,
    /// Gamma shape/scale of the factory excess delay fit.
    pub excess_delay_shape: f64,
    pub excess_delay_scale_ns: f64,
    /// Minimum inter-cluster void interval, ns.
    pub void_interval_ns: f64,
    /// Per-cluster shadowing, dB.
    pub cluster_shadowing_db: f64,
    /// Cluster power decay constant, ns.
    pub cluster_decay_ns: f64,
    /// Per-subpath shadowing, dB.
    pub subpath_shadowing_db: f64,
    /// Subpath power decay constant, ns.
    pub subpath_decay_ns: f64,
    pub mean_zod_deg: f64,
    pub sigma_zod_deg: f64,
    pub aod_azimuth_spread: AngleSpread,
    pub aod_elevation_spread: AngleSpread,
    pub mean_zoa_deg: f64,
    pub sigma_zoa_deg: f64,
    pub aoa_azimuth_spread: AngleSpread,
    pub aoa_elevation_spread: AngleSpread,
    /// Cross-polarization discrimination mean and spread, dB.
    pub xpd_mean_db: f64,
    pub xpd_sd_db: f64,
}

impl ScenarioParams {
    /// Parameter row for a scenario, LOS state and carrier frequency in
    /// GHz.
    pub fn for_link(scenario: Scenario, los: LosState, f: f64) -> Self {
        let mut p = match (scenario, los) {
            (Scenario::Umi | Scenario::Uma, LosState::Los) => Self::urban_los(f),
            (Scenario::Umi | Scenario::Uma, LosState::Nlos) => Self::urban_nlos(f),
            (Scenario::Rma, LosState::Los) => Self::rural(Self::urban_los(f)),
            (Scenario::Rma, LosState::Nlos) => Self::rural(Self::urban_nlos(f)),
            (Scenario::InH, LosState::Los) => Self::indoor_office_los(f),
            (Scenario::InH, LosState::Nlos) => Self::indoor_office_nlos(f),
            (Scenario::InF, LosState::Los) => Self::factory_los(),
            (Scenario::InF, LosState::Nlos) => Self::factory_nlos(),
        };
        // XPD is scenario-independent.
        p.xpd_mean_db = match los {
            LosState::Los => 11.5 + 0.10 * f,
            LosState::Nlos => 5.5 + 0.13 * f,
        };
        p.xpd_sd_db = 1.6;
        p
    }

    fn urban_los(f: f64) -> Self {
        Self {
            max_time_clusters: calibrated(f, 6.0, 5.0).round() as u32,
            max_subpaths: 30,
            mean_subpaths: 1.8,
            mean_aod_lobes: calibrated(f, 1.9, 1.4),
            mean_aoa_lobes: calibrated(f, 1.8, 1.2),
            delay_stretch_max: 0.2,
            mean_intra_delay_ns: 30.0,
            mean_excess_delay_ns: calibrated(f, 123.0, 80.0),
            void_interval_ns: 25.0,
            cluster_shadowing_db: calibrated(f, 1.0, 5.34),
            cluster_decay_ns: calibrated(f, 25.9, 40.0),
            subpath_shadowing_db: calibrated(f, 6.0, 3.48),
            subpath_decay_ns: calibrated(f, 16.9, 20.0),
            mean_zod_deg: calibrated(f, -12.6, -3.2),
            sigma_zod_deg: calibrated(f, 5.9, 1.2),
            aod_azimuth_spread: AngleSpread::gaussian(calibrated(f, 8.5, 4.3)),
            aod_elevation_spread: AngleSpread::gaussian(calibrated(f, 2.5, 0.1)),
            mean_zoa_deg: calibrated(f, 10.8, 2.0),
            sigma_zoa_deg: calibrated(f, 5.3, 2.9),
            aoa_azimuth_spread: AngleSpread::gaussian(calibrated(f, 10.5, 7.3)),
            aoa_elevation_spread: AngleSpread::laplacian(calibrated(f, 11.5, 3.2)),
            ..Self::zeroed()
        }
    }

    fn urban_nlos(f: f64) -> Self {
        Self {
            max_time_clusters: calibrated(f, 6.0, 3.0).round() as u32,
            max_subpaths: 30,
            mean_subpaths: 3.0,
            mean_aod_lobes: calibrated(f, 1.5, 1.3),
            mean_aoa_lobes: calibrated(f, 2.1, 2.1),
            delay_stretch_max: 0.5,
            mean_intra_delay_ns: 33.0,
            mean_excess_delay_ns: calibrated(f, 83.0, 58.0),
            void_interval_ns: 25.0,
            cluster_shadowing_db: calibrated(f, 3.0, 4.68),
            cluster_decay_ns: calibrated(f, 51.0, 49.0),
            subpath_shadowing_db: calibrated(f, 6.0, 3.48),
            subpath_decay_ns: calibrated(f, 15.5, 20.0),
            mean_zod_deg: calibrated(f, -4.9, -1.6),
            sigma_zod_deg: calibrated(f, 4.5, 0.5),
            aod_azimuth_spread: AngleSpread::gaussian(calibrated(f, 11.0, 5.0)),
            aod_elevation_spread: AngleSpread::gaussian(calibrated(f, 3.0, 2.3)),
            mean_zoa_deg: calibrated(f, 3.6, 1.6),
            sigma_zoa_deg: calibrated(f, 4.8, 2.0),
            aoa_azimuth_spread: AngleSpread::gaussian(calibrated(f, 7.5, 7.5)),
            aoa_elevation_spread: AngleSpread::laplacian(calibrated(f, 6.0, 0.0)),
            ..Self::zeroed()
        }
    }

    /// Rural links reduce to a single cluster of at most two subpaths
    /// and one spatial lobe per side; the remaining statistics follow
    /// the urban fits.
    fn rural(urban: Self) -> Self {
        Self {
            max_time_clusters: 1,
            max_subpaths: 2,
            mean_aod_lobes: 1.0,
            mean_aoa_lobes: 1.0,
            ..urban
        }
    }

    fn indoor_office_los(f: f64) -> Self {
        Self {
            mean_aod_lobes: calibrated(f, 3.0, 2.0).round(),
            mean_aoa_lobes: calibrated(f, 3.0, 2.0).round(),
            cluster_rate: calibrated(f, 3.6, 0.9),
            subpath_split_prob: calibrated(f, 0.7, 1.0),
            mean_subpaths: calibrated(f, 3.7, 1.4),
            mean_intra_delay_ns: calibrated(f, 3.4, 1.1),
            mean_excess_delay_ns: calibrated(f, 17.3, 14.6),
            void_interval_ns: 6.0,
            cluster_shadowing_db: calibrated(f, 10.0, 9.0),
            cluster_decay_ns: calibrated(f, 20.7, 18.2),
            subpath_shadowing_db: 5.0,
            subpath_decay_ns: 2.0,
            mean_zod_deg: calibrated(f, -7.3, -6.8),
            sigma_zod_deg: calibrated(f, 3.8, 4.9),
            aod_azimuth_spread: AngleSpread::gaussian(calibrated(f, 20.6, 4.8)),
            aod_elevation_spread: AngleSpread::gaussian(calibrated(f, 15.7, 4.3)),
            mean_zoa_deg: 7.4,
            sigma_zoa_deg: calibrated(f, 3.8, 4.5),
            aoa_azimuth_spread: AngleSpread::gaussian(calibrated(f, 17.7, 4.7)),
            aoa_elevation_spread: AngleSpread::gaussian(calibrated(f, 14.4, 4.4)),
            ..Self::zeroed()
        }
    }

    fn indoor_office_nlos(f: f64) -> Self {
        Self {
            mean_aod_lobes: calibrated(f, 3.0, 3.0).round(),
            mean_aoa_lobes: calibrated(f, 3.0, 2.0).round(),
            cluster_rate: calibrated(f, 5.1, 1.8),
            subpath_split_prob: calibrated(f, 0.7, 1.0),
            mean_subpaths: calibrated(f, 5.3, 1.2),
            mean_intra_delay_ns: calibrated(f, 22.7, 2.7),
            mean_excess_delay_ns: calibrated(f, 10.9, 21.0),
            void_interval_ns: 6.0,
            cluster_shadowing_db: 10.0,
            cluster_decay_ns: calibrated(f, 23.6, 16.1),
            subpath_shadowing_db: 6.0,
            subpath_decay_ns: calibrated(f, 9.2, 2.4),
            mean_zod_deg: calibrated(f, -5.5, -2.5),
            sigma_zod_deg: calibrated(f, 2.9, 2.7),
            aod_azimuth_spread: AngleSpread::gaussian(calibrated(f, 27.1, 4.8)),
            aod_elevation_spread: AngleSpread::gaussian(calibrated(f, 16.2, 2.8)),
            mean_zoa_deg: calibrated(f, 5.5, 4.8),
            sigma_zoa_deg: calibrated(f, 2.9, 2.8),
            aoa_azimuth_spread: AngleSpread::gaussian(calibrated(f, 20.3, 6.6)),
            aoa_elevation_spread: AngleSpread::gaussian(calibrated(f, 15.0, 4.5)),
            ..Self::zeroed()
        }
    }

    fn factory_los() -> Self {
        Self {
            mean_aod_lobes: 1.8,
            mean_aoa_lobes: 1.9,
            cluster_rate: 2.4,
            subpath_split_prob: 1.0,
            mean_subpaths: 2.6,
            excess_delay_shape: 0.7,
            excess_delay_scale_ns: 26.9,
            intra_delay_shape: 1.2,
            intra_delay_scale_ns: 16.3,
            void_interval_ns: 8.0,
            cluster_shadowing_db: 10.0,
            cluster_decay_ns: 16.2,
            subpath_shadowing_db: 13.0,
            subpath_decay_ns: 4.7,
            mean_zod_deg: -4.0,
            sigma_zod_deg: 4.3,
            aod_azimuth_spread: AngleSpread::laplacian(6.7),
            aod_elevation_spread: AngleSpread::gaussian(3.0),
            mean_zoa_deg: 4.0,
            sigma_zoa_deg: 4.3,
            aoa_azimuth_spread: AngleSpread::laplacian(11.7),
            aoa_elevation_spread: AngleSpread::gaussian(2.3),
            ..Self::zeroed()
        }
    }

    fn factory_nlos() -> Self {
        Self {
            mean_aod_lobes: 1.8,
            mean_aoa_lobes: 2.5,
            cluster_rate: 2.0,
            subpath_split_prob: 1.0,
            mean_subpaths: 7.0,
            excess_delay_shape: 0.8,
            excess_delay_scale_ns: 13.9,
            intra_delay_shape: 1.6,
            intra_delay_scale_ns: 9.0,
            void_interval_ns: 8.0,
            cluster_shadowing_db: 6.0,
            cluster_decay_ns: 18.7,
            subpath_shadowing_db: 11.0,
            subpath_decay_ns: 7.3,
            mean_zod_deg: -3.0,
            sigma_zod_deg: 3.5,
            aod_azimuth_spread: AngleSpread::laplacian(9.3),
            aod_elevation_spread: AngleSpread::gaussian(4.5),
            mean_zoa_deg: 3.0,
            sigma_zoa_deg: 3.5,
            aoa_azimuth_spread: AngleSpread::laplacian(14.1),
            aoa_elevation_spread: AngleSpread::gaussian(3.2),
            ..Self::zeroed()
        }
    }

    fn zeroed() -> Self {
        Self {
            max_time_clusters: 0,
            max_subpaths: 0,
            cluster_rate: 0.0,
            subpath_split_prob: 0.0,
            mean_subpaths: 0.0,
            mean_aod_lobes: 0.0,
            mean_aoa_lobes: 0.0,
            delay_stretch_max: 0.0,
            mean_intra_delay_ns: 0.0,
            intra_delay_shape: 0.0,
            intra_delay_scale_ns: 0.0,
            mean_excess_delay_ns: 0.0,
            excess_delay_shape: 0.0,
            excess_delay_scale_ns: 0.0,
            void_interval_ns: 0.0,
            cluster_shadowing_db: 0.0,
            cluster_decay_ns: 0.0,
            subpath_shadowing_db: 0.0,
            subpath_decay_ns: 0.0,
            mean_zod_deg: 0.0,
            sigma_zod_deg: 0.0,
            aod_azimuth_spread: AngleSpread::gaussian(0.0),
            aod_elevation_spread: AngleSpread::gaussian(0.0),
            mean_zoa_deg: 0.0,
            sigma_zoa_deg: 0.0,
            aoa_azimuth_spread: AngleSpread::gaussian(0.0),
            aoa_elevation_spread: AngleSpread::gaussian(0.0),
            xpd_mean_db: 0.0,
            xpd_sd_db: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_umi_los_at_lower_anchor() {
        let p = ScenarioParams::for_link(Scenario::Umi, LosState::Los, 28.0);
        assert_eq!(p.max_time_clusters, 6);
        assert_eq!(p.max_subpaths, 30);
        assert!((p.mean_excess_delay_ns - 123.0).abs() < 1e-9);
        assert!((p.cluster_decay_ns - 25.9).abs() < 1e-9);
        assert!((p.mean_zod_deg - (-12.6)).abs() < 1e-9);
        assert_eq!(p.aoa_elevation_spread.distribution, AngleDistribution::Laplacian);
    }

    #[test]
    fn test_umi_nlos_at_upper_anchor() {
        let p = ScenarioParams::for_link(Scenario::Umi, LosState::Nlos, 140.0);
        assert_eq!(p.max_time_clusters, 3);
        assert!((p.mean_excess_delay_ns - 58.0).abs() < 1e-9);
        assert!((p.cluster_shadowing_db - 4.68).abs() < 1e-9);
    }

    #[test]
    fn test_uma_matches_umi() {
        for los in [LosState::Los, LosState::Nlos] {
            let umi = ScenarioParams::for_link(Scenario::Umi, los, 73.0);
            let uma = ScenarioParams::for_link(Scenario::Uma, los, 73.0);
            assert_eq!(umi, uma);
        }
    }

    #[test]
    fn test_rural_is_single_cluster() {
        let p = ScenarioParams::for_link(Scenario::Rma, LosState::Nlos, 28.0);
        assert_eq!(p.max_time_clusters, 1);
        assert_eq!(p.max_subpaths, 2);
        assert_eq!(p.mean_aod_lobes, 1.0);
        assert_eq!(p.mean_aoa_lobes, 1.0);
        // The rest follows the urban NLOS fit
        assert!((p.mean_excess_delay_ns - 83.0).abs() < 1e-9);
    }

    #[test]
    fn test_factory_uses_gamma_delay_fits() {
        let p = ScenarioParams::for_link(Scenario::InF, LosState::Los, 28.0);
        assert!((p.excess_delay_shape - 0.7).abs() < 1e-12);
        assert!((p.excess_delay_scale_ns - 26.9).abs() < 1e-12);
        assert!((p.intra_delay_shape - 1.2).abs() < 1e-12);
        assert_eq!(p.aod_azimuth_spread.distribution, AngleDistribution::Laplacian);
        assert_eq!(p.aod_elevation_spread.distribution, AngleDistribution::Gaussian);
    }

    #[test]
    fn test_xpd_is_frequency_dependent() {
        let los = ScenarioParams::for_link(Scenario::InH, LosState::Los, 60.0);
        let nlos = ScenarioParams::for_link(Scenario::InH, LosState::Nlos, 60.0);
        assert!((los.xpd_mean_db - (11.5 + 6.0)).abs() < 1e-9);
        assert!((nlos.xpd_mean_db - (5.5 + 7.8)).abs() < 1e-9);
        assert_eq!(los.xpd_sd_db, 1.6);
    }
}
