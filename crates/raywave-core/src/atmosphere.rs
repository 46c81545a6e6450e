//! Line-by-line gaseous and rain attenuation for the 1-1000 GHz band.
//!
//! Implements the Liebe MPM complex-refractivity model: resonant oxygen
//! and water vapor lines, the dry-air continuum, suspended water
//! droplets (or ice) and an empirical rain term. The result is a flat
//! attenuation factor in dB per meter that scales with link distance.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Atmospheric state at the link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmosphereConfig {
    /// Barometric pressure in millibars.
    pub pressure_mbar: f64,
    /// Relative humidity in percent. Above 99.5 % suspended water
    /// droplets (fog) are included.
    pub humidity_percent: f64,
    /// Air temperature in degrees Celsius; at or below 0 the water terms
    /// switch to ice.
    pub temperature_celsius: f64,
    /// Rain rate in mm/hr; zero disables the rain term.
    pub rain_rate_mm_per_hr: f64,
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            pressure_mbar: 1013.25,
            humidity_percent: 50.0,
            temperature_celsius: 20.0,
            rain_rate_mm_per_hr: 0.0,
        }
    }
}

/// Oxygen resonance lines: center frequency in GHz and the six Liebe
/// spectroscopic coefficients.
#[rustfmt::skip]
const OXYGEN_LINES: [[f64; 7]; 44] = [
    [50.474238, 0.094, 9.694, 0.890, 0.0, 0.240, 0.790],
    [50.987749, 0.246, 8.694, 0.910, 0.0, 0.220, 0.780],
    [51.503350, 0.608, 7.744, 0.940, 0.0, 0.197, 0.774],
    [52.021410, 1.414, 6.844, 0.970, 0.0, 0.166, 0.764],
    [52.542394, 3.102, 6.004, 0.990, 0.0, 0.136, 0.751],
    [53.066907, 6.410, 5.224, 1.020, 0.0, 0.131, 0.714],
    [53.595749, 12.470, 4.484, 1.050, 0.0, 0.230, 0.584],
    [54.130000, 22.800, 3.814, 1.070, 0.0, 0.335, 0.431],
    [54.671159, 39.180, 3.194, 1.100, 0.0, 0.374, 0.305],
    [55.221367, 63.160, 2.624, 1.130, 0.0, 0.258, 0.339],
    [55.783802, 95.350, 2.119, 1.170, 0.0, -0.166, 0.705],
    [56.264775, 54.890, 0.015, 1.730, 0.0, 0.390, -0.113],
    [56.363389, 134.400, 1.660, 1.200, 0.0, -0.297, 0.753],
    [56.968206, 176.300, 1.260, 1.240, 0.0, -0.416, 0.742],
    [57.612484, 214.100, 0.915, 1.280, 0.0, -0.613, 0.697],
    [58.323877, 238.600, 0.626, 1.330, 0.0, -0.205, 0.051],
    [58.446590, 145.700, 0.084, 1.520, 0.0, 0.748, -0.146],
    [59.164207, 240.400, 0.391, 1.390, 0.0, -0.722, 0.266],
    [59.590983, 211.200, 0.212, 1.430, 0.0, 0.765, -0.090],
    [60.306061, 212.400, 0.212, 1.450, 0.0, -0.705, 0.081],
    [60.434776, 246.100, 0.391, 1.360, 0.0, 0.697, -0.324],
    [61.150560, 250.400, 0.626, 1.310, 0.0, 0.104, -0.067],
    [61.800154, 229.800, 0.915, 1.270, 0.0, 0.570, -0.761],
    [62.411215, 193.300, 1.260, 1.230, 0.0, 0.360, -0.777],
    [62.486260, 151.700, 0.083, 1.540, 0.0, -0.498, 0.097],
    [62.997977, 150.300, 1.665, 1.200, 0.0, 0.239, -0.768],
    [63.568518, 108.700, 2.115, 1.170, 0.0, 0.108, -0.706],
    [64.127767, 73.350, 2.620, 1.130, 0.0, -0.311, -0.332],
    [64.678903, 46.350, 3.195, 1.100, 0.0, -0.421, -0.298],
    [65.224071, 27.480, 3.815, 1.070, 0.0, -0.375, -0.423],
    [65.764772, 15.300, 4.485, 1.050, 0.0, -0.267, -0.575],
    [66.302091, 8.009, 5.225, 1.020, 0.0, -0.168, -0.700],
    [66.836830, 3.946, 6.005, 0.990, 0.0, -0.169, -0.735],
    [67.369598, 1.832, 6.845, 0.970, 0.0, -0.200, -0.744],
    [67.900867, 0.801, 7.745, 0.940, 0.0, -0.228, -0.753],
    [68.431005, 0.330, 8.695, 0.920, 0.0, -0.240, -0.760],
    [68.960311, 0.128, 9.695, 0.900, 0.0, -0.250, -0.765],
    [118.750343, 94.500, 0.009, 1.630, 0.0, -0.036, 0.009],
    [368.498350, 6.790, 0.049, 1.920, 0.6, 0.0, 0.0],
    [424.763124, 63.800, 0.044, 1.930, 0.6, 0.0, 0.0],
    [487.249370, 23.500, 0.049, 1.920, 0.6, 0.0, 0.0],
    [715.393150, 9.960, 0.145, 1.810, 0.6, 0.0, 0.0],
    [773.839675, 67.100, 0.130, 1.820, 0.6, 0.0, 0.0],
    [834.145330, 18.000, 0.147, 1.810, 0.6, 0.0, 0.0],
];

/// Water vapor resonance lines: center frequency in GHz and the six
/// Liebe spectroscopic coefficients.
#[rustfmt::skip]
const WATER_LINES: [[f64; 7]; 35] = [
    [22.235080, 0.01130, 2.143, 2.811, 4.80, 0.69, 1.00],
    [67.803960, 0.00012, 8.735, 2.858, 4.93, 0.69, 0.82],
    [119.995940, 0.00008, 8.356, 2.948, 4.78, 0.70, 0.79],
    [183.310091, 0.24200, 0.668, 3.050, 5.30, 0.64, 0.85],
    [321.225644, 0.00483, 6.181, 2.303, 4.69, 0.67, 0.54],
    [325.152919, 0.14990, 1.540, 2.783, 4.85, 0.68, 0.74],
    [336.222601, 0.00011, 9.829, 2.693, 4.74, 0.69, 0.61],
    [380.197372, 1.15200, 1.048, 2.873, 5.38, 0.54, 0.89],
    [390.134508, 0.00046, 7.350, 2.152, 4.81, 0.63, 0.55],
    [437.346667, 0.00650, 5.050, 1.845, 4.23, 0.60, 0.48],
    [439.150812, 0.09218, 3.596, 2.100, 4.29, 0.63, 0.52],
    [443.018295, 0.01976, 5.050, 1.860, 4.23, 0.60, 0.50],
    [448.001075, 1.03200, 1.405, 2.632, 4.84, 0.66, 0.67],
    [470.888947, 0.03297, 3.599, 2.152, 4.57, 0.66, 0.65],
    [474.689127, 0.12620, 2.381, 2.355, 4.65, 0.65, 0.64],
    [488.491133, 0.02520, 2.853, 2.602, 5.04, 0.69, 0.72],
    [503.568532, 0.00390, 6.733, 1.612, 3.98, 0.61, 0.43],
    [504.482692, 0.00130, 6.733, 1.612, 4.01, 0.61, 0.45],
    [547.676440, 0.97010, 0.114, 2.600, 4.50, 0.70, 1.00],
    [552.020960, 1.47700, 0.114, 2.600, 4.50, 0.70, 1.00],
    [556.936002, 48.74000, 0.159, 3.210, 4.11, 0.69, 1.00],
    [620.700807, 0.50120, 2.200, 2.438, 4.68, 0.71, 0.68],
    [645.866155, 0.00713, 8.580, 1.800, 4.00, 0.60, 0.50],
    [658.005280, 0.03022, 7.820, 3.210, 4.14, 0.69, 1.00],
    [752.033227, 23.96000, 0.396, 3.060, 4.09, 0.68, 0.84],
    [841.053973, 0.00140, 8.180, 1.590, 5.76, 0.33, 0.45],
    [859.962313, 0.01472, 7.989, 3.060, 4.09, 0.68, 0.84],
    [899.306675, 0.00605, 7.917, 2.985, 4.53, 0.68, 0.90],
    [902.616173, 0.00426, 8.432, 2.865, 5.10, 0.70, 0.95],
    [906.207325, 0.01876, 5.111, 2.408, 4.70, 0.70, 0.53],
    [916.171582, 0.83400, 1.442, 2.670, 4.78, 0.70, 0.78],
    [923.118427, 0.00869, 10.220, 2.900, 5.00, 0.70, 0.80],
    [970.315022, 0.89720, 1.920, 2.550, 4.94, 0.64, 0.67],
    [987.926764, 13.21000, 0.258, 2.985, 4.55, 0.68, 0.90],
    [1780.00000, 2230.00000, 0.952, 17.620, 30.50, 2.00, 5.00],
];

/// Total atmospheric attenuation in dB per meter at the given carrier
/// frequency in GHz.
pub fn attenuation_db_per_m(freq_ghz: f64, cfg: &AtmosphereConfig) -> f64 {
    // The line model is not fitted below 1 GHz; attenuation there is
    // negligible anyway.
    let f = freq_ghz.max(1.0);

    let fog = cfg.humidity_percent > 99.5;
    let ice = cfg.temperature_celsius <= 0.0;
    let v = 300.0 / (cfg.temperature_celsius + 273.15);

    let es = saturation_pressure_mbar(cfg.temperature_celsius, ice);
    let mut e = es * cfg.humidity_percent / 100.0;
    let mut pd = cfg.pressure_mbar - e;
    if pd < 0.0 {
        pd = 0.0;
        e = cfg.pressure_mbar;
    }

    let eps = water_permittivity(v, ice);

    let extinction = o2_lines(f, v, pd, e)
        + dry_continuum(f, v, pd, e)
        + h2o_vapor_lines(f, v, pd, e)
        + h2o_liquid(f, v, fog, ice, eps)
        + rain_extinction(f, cfg.rain_rate_mm_per_hr);

    0.182 * f * extinction * 1e-3
}

/// Saturation water vapor pressure in millibars (Goff-Gratch).
fn saturation_pressure_mbar(temperature_c: f64, ice: bool) -> f64 {
    let x = if !ice {
        let y = 373.16 / (temperature_c + 273.16);
        -7.90298 * (y - 1.0) + 5.02808 * y.log10()
            - 1.3816e-7 * (10f64.powf(11.344 * (1.0 - 1.0 / y)) - 1.0)
            + 8.1328e-3 * (10f64.powf(-3.49149 * (y - 1.0)) - 1.0)
            + 1013.246f64.log10()
    } else {
        let y = 273.16 / (temperature_c + 273.16);
        -9.09718 * (y - 1.0) - 3.56654 * y.log10() + 0.876793 * (1.0 - 1.0 / y)
            + 6.1071f64.log10()
    };
    10f64.powf(x)
}

/// Static permittivity of liquid water, or of ice.
fn water_permittivity(v: f64, ice: bool) -> f64 {
    if ice {
        3.15
    } else {
        103.3 * (v - 1.0) + 77.66
    }
}

/// Imaginary refractivity from the resonant oxygen lines.
fn o2_lines(f: f64, v: f64, pd: f64, e: f64) -> f64 {
    let p = pd + e;
    let mut zn = Complex64::new(0.0, 0.0);
    for line in &OXYGEN_LINES {
        let [f0, a1, a2, a3, a4, a5, a6] = *line;
        let s = a1 * pd * v.powi(3) * (a2 * (1.0 - v)).exp() * 1e-6;
        let mut gamma = a3 * (pd * v.powf(0.8 - a4) + 1.1 * e * v) * 1e-3;
        gamma = (gamma * gamma + (25.0_f64 * 0.6e-4).powi(2)).sqrt();
        let delta = (a5 + a6 * v) * p * v.powf(0.8) * 1e-3;
        let zf = f / f0
            * ((Complex64::new(1.0, -delta)) / Complex64::new(f0 - f, -gamma)
                - (Complex64::new(1.0, delta)) / Complex64::new(f0 + f, gamma));
        zn += s * zf;
    }
    zn.im
}

/// Non-resonant dry air continuum.
fn dry_continuum(f: f64, v: f64, pd: f64, e: f64) -> f64 {
    let p = pd + e;
    let so = 6.14e-5 * pd * v * v;
    let gammao = 0.56e-3 * p * v.powf(0.8);
    let zfo = -Complex64::new(f, 0.0) / Complex64::new(f, gammao);
    let sn = 1.40e-12 * pd * pd * v.powf(3.5);
    let zfn = Complex64::new(0.0, f) / (1.93e-5 * f.powf(1.5) + 1.0);
    (so * zfo + sn * zfn).im
}

/// Imaginary refractivity from the resonant water vapor lines.
fn h2o_vapor_lines(f: f64, v: f64, pd: f64, e: f64) -> f64 {
    let mut zn = Complex64::new(0.0, 0.0);
    for line in &WATER_LINES {
        let [f0, b1, b2, b3, b4, b5, b6] = *line;
        let s = b1 * e * v.powf(3.5) * (b2 * (1.0 - v)).exp();
        let mut gamh = b3 * (pd * v.powf(b5) + b4 * e * v.powf(b6)) * 1e-3;
        let gamd2 = 1e-12 / (v * (1.46 * f0).powi(2));
        gamh = 0.535 * gamh + (0.217 * gamh * gamh + gamd2).sqrt();
        let zf = f / f0
            * (Complex64::new(1.0, 0.0) / Complex64::new(f0 - f, -gamh)
                - Complex64::new(1.0, 0.0) / Complex64::new(f0 + f, gamh));
        zn += s * zf;
    }
    zn.im
}

/// Suspended water droplet (fog) or ice crystal term. Zero unless the
/// humidity exceeds 99.5 %.
fn h2o_liquid(f: f64, v: f64, fog: bool, ice: bool, eps: f64) -> f64 {
    let w = if fog { 1.0 } else { 0.0 };
    let zep = if !ice {
        let fd = 20.20 - 146.4 * (v - 1.0) + 316.0 * (v - 1.0).powi(2);
        let fs = 39.8 * fd;
        let epinf = 0.0671 * eps;
        let eopt = 3.52;
        Complex64::new(eps, 0.0)
            - f * ((eps - epinf) / Complex64::new(f, fd) + (epinf - eopt) / Complex64::new(f, fs))
    } else {
        let ai = (62.0 * v - 11.6) * (-22.1 * (v - 1.0)).exp() * 1e-4;
        let bi = 0.542e-6 * (-24.17 + 116.79 / v + (v / (v - 0.9927)).powi(2));
        let fice = f.max(0.001);
        Complex64::new(3.15, ai / fice + bi * fice)
    };
    let one = Complex64::new(1.0, 0.0);
    let znw = 1.5 * w * ((zep - one) / (zep + 2.0) - one + 3.0 / Complex64::new(eps + 2.0, 0.0));
    znw.im
}

/// Empirical rain extinction, expressed as imaginary refractivity so it
/// folds into the same 0.182 f scaling as the gaseous terms.
fn rain_extinction(f: f64, rain_rate_mm_per_hr: f64) -> f64 {
    if rain_rate_mm_per_hr == 0.0 {
        return 0.0;
    }
    let (ga, ea) = if f < 2.9 {
        (6.39e-5, 2.03)
    } else if f < 54.0 {
        (4.21e-5, 2.42)
    } else if f < 180.0 {
        (4.09e-2, 0.699)
    } else {
        (3.38, -0.151)
    };
    let arain = ga * f.powf(ea);

    let (gb, eb) = if f < 8.5 {
        (0.851, 0.158)
    } else if f < 25.0 {
        (1.41, -0.0779)
    } else if f < 164.0 {
        (2.63, -0.272)
    } else {
        (0.616, 0.0126)
    };
    let brain = gb * f.powf(eb);
    let at_rain = arain * rain_rate_mm_per_hr.powf(brain);

    at_rain / (0.182 * f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturation_pressure_at_boiling_point() {
        // At 100 C the Goff-Gratch fit returns one standard atmosphere.
        let es = saturation_pressure_mbar(100.0, false);
        assert!((es - 1013.246).abs() < 0.5, "got {es}");
    }

    #[test]
    fn test_oxygen_peak_near_60_ghz() {
        let cfg = AtmosphereConfig::default();
        let at_60 = attenuation_db_per_m(60.0, &cfg);
        let at_30 = attenuation_db_per_m(30.0, &cfg);
        let at_100 = attenuation_db_per_m(100.0, &cfg);
        assert!(at_60 > 10.0 * at_30, "60 GHz should sit on the O2 peak");
        assert!(at_60 > at_100);
        // Roughly 15 dB/km at sea level
        assert!(at_60 > 5e-3 && at_60 < 3e-2, "got {at_60} dB/m");
    }

    #[test]
    fn test_attenuation_grows_with_humidity() {
        let dry = AtmosphereConfig { humidity_percent: 10.0, ..Default::default() };
        let wet = AtmosphereConfig { humidity_percent: 90.0, ..Default::default() };
        // 183 GHz water vapor line
        assert!(attenuation_db_per_m(140.0, &wet) > attenuation_db_per_m(140.0, &dry));
    }

    #[test]
    fn test_rain_adds_attenuation() {
        let clear = AtmosphereConfig::default();
        let storm = AtmosphereConfig { rain_rate_mm_per_hr: 25.0, ..Default::default() };
        assert!(attenuation_db_per_m(28.0, &storm) > attenuation_db_per_m(28.0, &clear));
        assert_eq!(rain_extinction(28.0, 0.0), 0.0);
    }

    #[test]
    fn test_freezing_switches_to_ice_terms() {
        let cold = AtmosphereConfig { temperature_celsius: -5.0, ..Default::default() };
        let a = attenuation_db_per_m(28.0, &cold);
        assert!(a.is_finite() && a > 0.0);
    }

    #[test]
    fn test_attenuation_is_positive_across_band() {
        let cfg = AtmosphereConfig::default();
        for f in [1.0, 5.0, 28.0, 73.0, 140.0, 150.0] {
            let a = attenuation_db_per_m(f, &cfg);
            assert!(a > 0.0 && a.is_finite(), "{f} GHz: {a}");
        }
    }
}
