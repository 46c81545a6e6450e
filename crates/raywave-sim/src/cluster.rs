//! Drop-based time cluster and subpath generation.
//!
//! One drop produces the full small-scale description of a link: time
//! cluster delays and powers, subpath delays, powers, phases, lobe
//! mapping and angles, bandwidth-limited subpath combining, LOS
//! alignment and weak-ray pruning. All randomness flows through the
//! caller's RNG handle, so a drop is reproducible from its seed.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Binomial, Distribution, Exp, Gamma, Normal, Poisson};
use serde::{Deserialize, Serialize};
use tracing::debug;

use raywave_core::condition::{ChannelCondition, LosState};
use raywave_core::geometry::{Node, SPEED_OF_LIGHT};
use raywave_core::scenario::{wrap_to_360, Scenario};

use crate::params::{AngleDistribution, AngleSpread, ScenarioParams};

/// Rays weaker than the strongest ray by more than this dynamic range
/// are dropped; the range widens for long links.
fn dynamic_range_db(distance_2d: f64) -> f64 {
    if distance_2d <= 500.0 {
        190.0
    } else {
        220.0
    }
}

/// One resolvable multipath component.
///
/// Angles are in radians in the global coordinate system (azimuth from
/// the x axis, zenith from the z axis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Absolute propagation delay, ns.
    pub delay_ns: f64,
    /// Linear power fraction.
    pub power: f64,
    /// Polarization phases {VV, VH, HV, HH}, radians.
    pub phases: [f64; 4],
    /// Cross-polarization discrimination {HH, VH, HV}, dB.
    pub xpd_db: [f64; 3],
    pub aod_rad: f64,
    pub zod_rad: f64,
    pub aoa_rad: f64,
    pub zoa_rad: f64,
    /// Departure and arrival spatial lobe this ray belongs to, 1-based.
    pub aod_lobe: u32,
    pub aoa_lobe: u32,
}

/// Small-scale parameters of a link for one drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelParams {
    /// Node id order the drop was generated in; a matrix built in the
    /// opposite direction flips departure and arrival angles.
    pub node_ids: (u32, u32),
    pub los: LosState,
    pub o2i: bool,
    /// Simulation time of the drop, seconds.
    pub generated_at: f64,
    /// Normalized time cluster powers; they sum to one.
    pub cluster_powers: Vec<f64>,
    pub rays: Vec<Ray>,
}

/// Intermediate per-subpath row in the measurement coordinate frame
/// (azimuth from the y axis, elevation from the horizon, degrees).
#[derive(Debug, Clone)]
struct DraftRay {
    delay_ns: f64,
    power: f64,
    phases: [f64; 4],
    aod_az_deg: f64,
    aod_el_deg: f64,
    aoa_az_deg: f64,
    aoa_el_deg: f64,
    aod_lobe: u32,
    aoa_lobe: u32,
}

/// Run one drop for the link between `a` and `b`.
pub fn generate_channel_params(
    rng: &mut StdRng,
    scenario: Scenario,
    frequency_hz: f64,
    rf_bandwidth_hz: f64,
    table: &ScenarioParams,
    condition: &ChannelCondition,
    a: &Node,
    b: &Node,
    now: f64,
) -> ChannelParams {
    let d2d = a.position.distance_2d(&b.position);
    let los = condition.los == LosState::Los;

    // Step 1: cluster, lobe and subpath counts.
    let num_clusters = number_of_time_clusters(rng, scenario, table);
    let aod_lobes = number_of_spatial_lobes(rng, scenario, table.mean_aod_lobes);
    let aoa_lobes = number_of_spatial_lobes(rng, scenario, table.mean_aoa_lobes);
    let subpath_counts =
        subpaths_per_cluster(rng, scenario, num_clusters, table, frequency_hz / 1e9);

    // Step 2: intra-cluster subpath delays.
    let intra_delays = intra_cluster_delays(
        rng,
        scenario,
        &subpath_counts,
        table,
        frequency_hz / 1e9,
        rf_bandwidth_hz,
    );

    // Step 3: polarization phases, four per subpath.
    let total_subpaths: usize = subpath_counts.iter().sum();
    let phases: Vec<[f64; 4]> = (0..total_subpaths)
        .map(|_| {
            [
                rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI),
                rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI),
                rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI),
                rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI),
            ]
        })
        .collect();

    // Steps 4-6: cluster excess delays and the power cascade.
    let cluster_delays = cluster_excess_delays(rng, scenario, &intra_delays, table);
    let cluster_powers = cluster_powers(rng, &cluster_delays, table);
    let subpath_powers = subpath_powers(rng, &intra_delays, &cluster_powers, table, los);

    // Step 7: absolute propagation times.
    let base_delay_ns = d2d / SPEED_OF_LIGHT * 1e9;

    // Step 8: lobe mapping and angles for departure and arrival.
    let aod_angles = subpath_lobe_angles(
        rng,
        aod_lobes,
        total_subpaths,
        table.mean_zod_deg,
        table.sigma_zod_deg,
        &table.aod_azimuth_spread,
        &table.aod_elevation_spread,
    );
    let aoa_angles = subpath_lobe_angles(
        rng,
        aoa_lobes,
        total_subpaths,
        table.mean_zoa_deg,
        table.sigma_zoa_deg,
        &table.aoa_azimuth_spread,
        &table.aoa_elevation_spread,
    );

    // Step 9: assemble per-subpath rows in delay order.
    let mut drafts = Vec::with_capacity(total_subpaths);
    let mut global = 0;
    for (c, intra) in intra_delays.iter().enumerate() {
        for (s, rho) in intra.iter().enumerate() {
            let (aod_lobe, aod_az, aod_el) = aod_angles[global];
            let (aoa_lobe, aoa_az, aoa_el) = aoa_angles[global];
            drafts.push(DraftRay {
                delay_ns: base_delay_ns + cluster_delays[c] + rho,
                power: subpath_powers[c][s],
                phases: phases[global],
                aod_az_deg: aod_az,
                aod_el_deg: aod_el,
                aoa_az_deg: aoa_az,
                aoa_el_deg: aoa_el,
                aod_lobe,
                aoa_lobe,
            });
            global += 1;
        }
    }

    // Step 10: merge subpaths the RF bandwidth cannot resolve, align the
    // first ray geometrically under LOS, drop rays below the dynamic
    // range.
    let mut drafts = combine_unresolvable(drafts, rf_bandwidth_hz);
    if los {
        align_los_ray(&mut drafts);
    }
    let drafts = prune_weak(drafts, dynamic_range_db(d2d));

    // Step 11: per-ray cross-polarization discrimination, then convert
    // the measurement frame to the global coordinate system.
    let normal = Normal::new(0.0, 1.0).expect("unit normal is well-formed");
    let rays: Vec<Ray> = drafts
        .into_iter()
        .map(|d| {
            let xpd_db = [
                normal.sample(rng) * table.xpd_sd_db,
                table.xpd_mean_db,
                table.xpd_mean_db + normal.sample(rng) * table.xpd_sd_db,
            ];
            Ray {
                delay_ns: d.delay_ns,
                power: d.power,
                phases: d.phases,
                xpd_db,
                aod_rad: wrap_to_360(90.0 - d.aod_az_deg).to_radians(),
                zod_rad: (90.0 - d.aod_el_deg).to_radians(),
                aoa_rad: wrap_to_360(90.0 - d.aoa_az_deg).to_radians(),
                zoa_rad: (90.0 - d.aoa_el_deg).to_radians(),
                aod_lobe: d.aod_lobe,
                aoa_lobe: d.aoa_lobe,
            }
        })
        .collect();

    debug!(
        num_clusters,
        total_subpaths,
        kept = rays.len(),
        "generated channel drop"
    );

    ChannelParams {
        node_ids: (a.id, b.id),
        los: condition.los,
        o2i: condition.o2i,
        generated_at: now,
        cluster_powers,
        rays,
    }
}

fn number_of_time_clusters(rng: &mut StdRng, scenario: Scenario, table: &ScenarioParams) -> usize {
    if scenario.is_indoor() {
        let poisson = Poisson::new(table.cluster_rate).expect("cluster rate is positive");
        poisson.sample(rng) as usize + 1
    } else {
        rng.gen_range(1..=table.max_time_clusters) as usize
    }
}

fn number_of_spatial_lobes(rng: &mut StdRng, scenario: Scenario, mean: f64) -> usize {
    match scenario {
        Scenario::InH => rng.gen_range(1..=mean.round() as u32) as usize,
        Scenario::InF => {
            let poisson = Poisson::new(mean).expect("lobe mean is positive");
            poisson.sample(rng) as usize + 1
        }
        Scenario::Rma => 1,
        Scenario::Umi | Scenario::Uma => {
            let poisson = Poisson::new(mean).expect("lobe mean is positive");
            (poisson.sample(rng) as usize).clamp(1, 5)
        }
    }
}

/// Subpath count per time cluster.
///
/// Indoor clusters hold one subpath unless a Bernoulli split succeeds;
/// a single-cluster indoor drop always gains a second, fully populated
/// cluster. Outdoor counts are uniform up to the table maximum below
/// 100 GHz and exponential above.
fn subpaths_per_cluster(
    rng: &mut StdRng,
    scenario: Scenario,
    num_clusters: usize,
    table: &ScenarioParams,
    freq_ghz: f64,
) -> Vec<usize> {
    let mut counts = Vec::with_capacity(num_clusters);
    if scenario.is_indoor() {
        let exp = Exp::new(1.0 / table.mean_subpaths).expect("subpath mean is positive");
        let split = Binomial::new(1, table.subpath_split_prob).expect("probability in range");
        for _ in 0..num_clusters {
            let populate = num_clusters == 1 || split.sample(rng) == 1;
            if populate {
                counts.push(exp.sample(rng).round() as usize + 1);
            } else {
                counts.push(1);
            }
        }
        while num_clusters == 1 && counts.len() == 1 {
            counts.push(exp.sample(rng).round() as usize + 1);
        }
    } else if freq_ghz < 100.0 || scenario == Scenario::Rma {
        for _ in 0..num_clusters {
            counts.push(rng.gen_range(1..=table.max_subpaths) as usize);
        }
    } else {
        let exp = Exp::new(1.0 / table.mean_subpaths).expect("subpath mean is positive");
        for _ in 0..num_clusters {
            counts.push(exp.sample(rng).round() as usize + 1);
        }
    }
    counts
}

/// Sorted zero-based subpath delays within each cluster, ns.
fn intra_cluster_delays(
    rng: &mut StdRng,
    scenario: Scenario,
    subpath_counts: &[usize],
    table: &ScenarioParams,
    freq_ghz: f64,
    rf_bandwidth_hz: f64,
) -> Vec<Vec<f64>> {
    let mut out = Vec::with_capacity(subpath_counts.len());
    for &count in subpath_counts {
        let mut delays: Vec<f64> = (0..count)
            .map(|j| match scenario {
                Scenario::InH => {
                    let exp = Exp::new(1.0 / table.mean_intra_delay_ns)
                        .expect("intra delay mean is positive");
                    exp.sample(rng)
                }
                Scenario::InF => {
                    let gamma = Gamma::new(table.intra_delay_shape, table.intra_delay_scale_ns)
                        .expect("gamma parameters are positive");
                    gamma.sample(rng)
                }
                _ if freq_ghz < 100.0 => {
                    // Below 100 GHz the urban fits space subpaths at the
                    // bandwidth resolution.
                    (1.0 / (rf_bandwidth_hz / 2.0)) * 1e9 * (j as f64 + 1.0)
                }
                _ => {
                    let exp = Exp::new(1.0 / table.mean_intra_delay_ns)
                        .expect("intra delay mean is positive");
                    exp.sample(rng)
                }
            })
            .collect();

        let min = delays.iter().cloned().fold(f64::INFINITY, f64::min);
        for d in &mut delays {
            *d -= min;
        }
        delays.sort_by(|x, y| x.partial_cmp(y).expect("delays are finite"));

        if !scenario.is_indoor() && freq_ghz < 100.0 {
            let stretch = 1.0 + table.delay_stretch_max * rng.gen::<f64>();
            for d in &mut delays {
                *d = d.powf(stretch);
            }
        }
        out.push(delays);
    }
    out
}

/// Cluster excess delays, ns. The first cluster starts at zero; each
/// later cluster starts a void interval after the previous cluster's
/// last subpath.
fn cluster_excess_delays(
    rng: &mut StdRng,
    scenario: Scenario,
    intra_delays: &[Vec<f64>],
    table: &ScenarioParams,
) -> Vec<f64> {
    let num_clusters = intra_delays.len();
    let mut raw: Vec<f64> = if scenario == Scenario::InF {
        let gamma = Gamma::new(table.excess_delay_shape, table.excess_delay_scale_ns)
            .expect("gamma parameters are positive");
        (0..num_clusters).map(|_| gamma.sample(rng)).collect()
    } else {
        let exp =
            Exp::new(1.0 / table.mean_excess_delay_ns).expect("excess delay mean is positive");
        (0..num_clusters).map(|_| exp.sample(rng)).collect()
    };

    let min = raw.iter().cloned().fold(f64::INFINITY, f64::min);
    for d in &mut raw {
        *d -= min;
    }
    raw.sort_by(|x, y| x.partial_cmp(y).expect("delays are finite"));

    let mut delays = vec![0.0];
    let mut last_subpath = *intra_delays[0].last().expect("clusters are never empty");
    for (i, r) in raw.iter().enumerate().skip(1) {
        let delay = r + last_subpath + table.void_interval_ns;
        delays.push(delay);
        last_subpath = delay + intra_delays[i].last().expect("clusters are never empty");
    }
    delays
}

/// Normalized cluster powers; exponential decay in the excess delay
/// with lognormal per-cluster shadowing, scaled to sum to one.
fn cluster_powers(rng: &mut StdRng, cluster_delays: &[f64], table: &ScenarioParams) -> Vec<f64> {
    let normal = Normal::new(0.0, 1.0).expect("unit normal is well-formed");
    let mut powers: Vec<f64> = cluster_delays
        .iter()
        .map(|tau| {
            let shadowing = table.cluster_shadowing_db * normal.sample(rng);
            (-tau / table.cluster_decay_ns).exp() * 10f64.powf(shadowing / 10.0)
        })
        .collect();
    let total: f64 = powers.iter().sum();
    for p in &mut powers {
        *p /= total;
    }
    powers
}

/// Per-subpath linear powers; each cluster's subpaths share its power.
/// Under LOS the strongest subpath of the first cluster is moved to the
/// front so the aligned ray carries the peak.
fn subpath_powers(
    rng: &mut StdRng,
    intra_delays: &[Vec<f64>],
    cluster_powers: &[f64],
    table: &ScenarioParams,
    los: bool,
) -> Vec<Vec<f64>> {
    let normal = Normal::new(0.0, 1.0).expect("unit normal is well-formed");
    let mut out = Vec::with_capacity(intra_delays.len());
    for (i, intra) in intra_delays.iter().enumerate() {
        let mut ratios: Vec<f64> = intra
            .iter()
            .map(|rho| {
                let shadowing = table.subpath_shadowing_db * normal.sample(rng);
                (-rho / table.subpath_decay_ns).exp() * 10f64.powf(shadowing / 10.0)
            })
            .collect();

        if i == 0 && los {
            let strongest = ratios
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).expect("powers are finite"))
                .map(|(idx, _)| idx)
                .expect("clusters are never empty");
            ratios.swap(0, strongest);
        }

        let total: f64 = ratios.iter().sum();
        out.push(ratios.iter().map(|r| r / total * cluster_powers[i]).collect());
    }
    out
}

/// Lobe assignment and angles for every subpath, in the measurement
/// frame: `(lobe, azimuth, elevation)` with azimuth in [0, 360) and
/// elevation clamped to [-60, 60] degrees.
fn subpath_lobe_angles(
    rng: &mut StdRng,
    num_lobes: usize,
    total_subpaths: usize,
    mean_elev_deg: f64,
    sigma_elev_deg: f64,
    azimuth_spread: &AngleSpread,
    elevation_spread: &AngleSpread,
) -> Vec<(u32, f64, f64)> {
    let normal = Normal::new(0.0, 1.0).expect("unit normal is well-formed");

    // Each lobe owns an azimuth sector; its mean direction is uniform in
    // the sector and Gaussian in elevation.
    let lobe_means: Vec<(f64, f64)> = (0..num_lobes)
        .map(|l| {
            let az_min = 360.0 * l as f64 / num_lobes as f64;
            let az_max = 360.0 * (l + 1) as f64 / num_lobes as f64;
            let mean_az = rng.gen_range(az_min..az_max);
            let mean_el = mean_elev_deg + sigma_elev_deg * normal.sample(rng);
            (mean_az, mean_el)
        })
        .collect();

    (0..total_subpaths)
        .map(|_| {
            let lobe = rng.gen_range(1..=num_lobes);
            let (mean_az, mean_el) = lobe_means[lobe - 1];
            let delta_az = angle_offset(rng, &normal, azimuth_spread);
            let delta_el = angle_offset(rng, &normal, elevation_spread);
            let azimuth = wrap_to_360(mean_az + delta_az);
            let elevation = (mean_el + delta_el).clamp(-60.0, 60.0);
            (lobe as u32, azimuth, elevation)
        })
        .collect()
}

fn angle_offset(rng: &mut StdRng, normal: &Normal<f64>, spread: &AngleSpread) -> f64 {
    match spread.distribution {
        AngleDistribution::Gaussian => spread.sd_deg * normal.sample(rng),
        AngleDistribution::Laplacian => {
            let z: f64 = rng.gen::<f64>() - 0.5;
            let b = spread.sd_deg / 2f64.sqrt();
            -b * z.signum() * (1.0 - 2.0 * z.abs()).ln()
        }
    }
}

/// Coherently merge subpaths closer in delay than the bandwidth
/// resolution. The first subpath of each group keeps its delay, angles
/// and phases; its power becomes the coherent sum of the group.
fn combine_unresolvable(drafts: Vec<DraftRay>, rf_bandwidth_hz: f64) -> Vec<DraftRay> {
    let min_time_ns = (1.0 / (rf_bandwidth_hz / 2.0)) * 1e9;
    let n = drafts.len();
    let mut out = Vec::with_capacity(n);
    let mut i = 0;
    while i < n {
        let mut row = drafts[i].clone();
        let boundary = row.delay_ns + min_time_ns;
        let mut sum = Complex64::new(0.0, 0.0);
        let mut j = i;
        while j < n && drafts[j].delay_ns <= boundary {
            sum += drafts[j].power.sqrt() * Complex64::from_polar(1.0, drafts[j].phases[0]);
            j += 1;
        }
        row.power = sum.norm_sqr();
        out.push(row);
        i = j;
    }
    out
}

/// Rotate arrival angles so the first ray leaves along the departure
/// direction and arrives from the reciprocal of it.
fn align_los_ray(drafts: &mut [DraftRay]) {
    if drafts.is_empty() {
        return;
    }
    let aod_az = drafts[0].aod_az_deg;
    let correct_az = if aod_az - 180.0 > 0.0 { aod_az - 180.0 } else { aod_az + 180.0 };
    let diff_az = drafts[0].aoa_az_deg - correct_az;
    for d in drafts.iter_mut() {
        d.aoa_az_deg = wrap_to_360(d.aoa_az_deg - diff_az);
    }

    let correct_el = -drafts[0].aod_el_deg;
    let diff_el = drafts[0].aoa_el_deg - correct_el;
    for d in drafts.iter_mut() {
        d.aoa_el_deg -= diff_el;
        if d.aoa_el_deg > 90.0 {
            d.aoa_el_deg = 180.0 - d.aoa_el_deg;
        } else if d.aoa_el_deg < -90.0 {
            d.aoa_el_deg = -180.0 - d.aoa_el_deg;
        }
    }
}

fn prune_weak(drafts: Vec<DraftRay>, dynamic_range_db: f64) -> Vec<DraftRay> {
    let max_power = drafts.iter().map(|d| d.power).fold(0.0, f64::max);
    let threshold_db = 10.0 * max_power.log10() - dynamic_range_db;
    drafts
        .into_iter()
        .filter(|d| 10.0 * d.power.log10() > threshold_db)
        .collect()
}
