// Electron transport: cross-section-weighted flight sampling.
//
// Electrons are stepped in flight groups. At the start of a group the Mott
// differential cross section is integrated over the configured angular
// divisions; each flight in the group then draws its distance from the
// total cross section and its scattering angle by inverting the cumulative
// integral. Energy is lost to elastic recoil, ionization (Bethe with the
// Joy-Luo low-energy correction) and a radiative bremsstrahlung term.

use crate::config::Config;
use crate::constants::{COULOMB_EV_ANGSTROM, ELECTRON_RADIUS, ELECTRON_REST_ENERGY_EV};
use crate::particle::{Particle, ParticleStatus};
use crate::rng::SharedRng;
use crate::tables::ElectronTables;
use std::f64::consts::PI;

/// Drive an electron from its current state to a terminal state, returning
/// any substrate knock-ons created along the way.
pub fn fire(p: &mut Particle, config: &Config, rng: &SharedRng) -> Vec<Particle> {
    debug_assert!(p.kind.is_electron());
    let tables = config
        .electron_tables
        .as_ref()
        .expect("electron tables must be injected before transport");
    let mut secondaries = Vec::new();
    p.status = ParticleStatus::Traveling;
    loop {
        if p.check_terminal(config) {
            p.record_stop(config);
            break;
        }
        step_group(p, config, tables, rng, &mut secondaries);
    }
    secondaries
}

/// One flight group: `num_flying_distances` successive flights sampled
/// against the cross sections evaluated at the group's starting energy.
pub(crate) fn step_group(
    p: &mut Particle,
    config: &Config,
    tables: &ElectronTables,
    rng: &SharedRng,
    secondaries: &mut Vec<Particle>,
) {
    let z = config.substrate_charge;
    let angles = tables.division_angles(config.num_angle_divisors);
    let cumulative = integrated_cross_sections(tables, z, p.motion.energy, angles);
    let total = *cumulative.last().unwrap_or(&0.0);
    if total <= 0.0 {
        // Degenerate cross section: nothing left to scatter against.
        p.status = ParticleStatus::StoppedByEnergy;
        return;
    }
    let mean_free_path = 1.0 / (config.substrate_density * total);

    for k in 0..config.num_flying_distances {
        // Draw order per flight: distance, cross section, azimuth.
        let flight = -mean_free_path * rng.sample().ln();
        let target = rng.sample() * total;
        let phi = 2.0 * PI * rng.sample();

        p.advance(flight);

        let theta = sample_scattering_angle(angles, &cumulative, target);
        let energy = p.motion.energy;

        // Elastic transfer to the substrate atom.
        let m1 = p.species.mass;
        let m2 = config.substrate_mass;
        let gamma = 4.0 * m1 * m2 / ((m1 + m2) * (m1 + m2));
        let half = theta / 2.0;
        let transferred = gamma * energy * half.sin() * half.sin();

        // Continuous losses over the flight.
        let ionization = ionization_stopping(z, config.substrate_density, energy);
        let radiative = ionization * bremsstrahlung_ratio(z, energy);
        let new_energy = (energy - transferred - (ionization + radiative) * flight).max(0.0);

        let batch_end = k + 1 == config.num_flying_distances;
        p.record_point(batch_end, config);

        if config.displaces(transferred) {
            let recoil_energy = transferred - config.displacement_energy;
            let recoil_motion = p
                .motion
                .deflected((PI - theta) / 2.0, phi + PI, recoil_energy);
            secondaries.push(Particle::knockon(
                p.coordinate,
                recoil_motion,
                config,
                p.cascade_depth,
            ));
        }

        // The substrate atom is orders of magnitude heavier: the lab and
        // center-of-mass deflections coincide to the working precision.
        p.motion = p.motion.deflected(theta, phi, new_energy);

        if p.check_terminal(config) {
            // The caller records the stop once, after re-checking.
            return;
        }
    }
}

/// Speed in units of c, from the relativistic kinetic energy.
fn beta_from_energy(energy: f64) -> f64 {
    let tau = energy / ELECTRON_REST_ENERGY_EV;
    let inv = 1.0 / ((1.0 + tau) * (1.0 + tau));
    (1.0 - inv).max(1e-12).sqrt()
}

/// Mott-to-Rutherford ratio from the fitted table row.
fn mott_ratio(tables: &ElectronTables, z: usize, beta: f64, one_minus_cos: f64) -> f64 {
    let row = tables.mott_row(z);
    let mut ratio = 0.0;
    for (j, group) in row.iter().enumerate() {
        let mut coefficient = 0.0;
        let mut beta_power = 1.0;
        for term in group {
            coefficient += term * beta_power;
            beta_power *= beta;
        }
        ratio += coefficient * one_minus_cos.powi(j as i32);
    }
    ratio.max(1e-6)
}

/// Screening parameter from the fitted table row, polynomial in ln(E_keV).
fn screening_alpha(tables: &ElectronTables, z: usize, energy: f64) -> f64 {
    let row = tables.screening_row(z);
    let x = (energy / 1000.0).max(1e-3).ln();
    let mut alpha = 0.0;
    let mut x_power = 1.0;
    for term in row {
        alpha += term * x_power;
        x_power *= x;
    }
    alpha.max(1e-8)
}

/// Mott differential cross section, A^2 per steradian.
pub(crate) fn differential_cross_section(
    tables: &ElectronTables,
    z: f64,
    energy: f64,
    theta: f64,
) -> f64 {
    let z_index = z as usize;
    let beta = beta_from_energy(energy);
    let beta_sq = beta * beta;
    let alpha = screening_alpha(tables, z_index, energy);
    let one_minus_cos = 1.0 - theta.cos();

    let rutherford = z * z * ELECTRON_RADIUS * ELECTRON_RADIUS * (1.0 - beta_sq)
        / (beta_sq * beta_sq);
    let screened = rutherford / ((one_minus_cos + 2.0 * alpha) * (one_minus_cos + 2.0 * alpha));
    screened * mott_ratio(tables, z_index, beta, one_minus_cos)
}

/// Cumulative cross section over the angular grid: trapezoid integration of
/// 2 pi sin(theta) dsigma/dOmega. Entry i is the integral up to angles[i];
/// the last entry is the total cross section.
pub(crate) fn integrated_cross_sections(
    tables: &ElectronTables,
    z: f64,
    energy: f64,
    angles: &[f64],
) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(angles.len());
    let mut running = 0.0;
    cumulative.push(0.0);
    let mut previous = 0.0; // integrand vanishes at theta = 0
    for window in angles.windows(2) {
        let theta = window[1];
        let integrand = 2.0 * PI * theta.sin() * differential_cross_section(tables, z, energy, theta);
        running += 0.5 * (previous + integrand) * (window[1] - window[0]);
        cumulative.push(running);
        previous = integrand;
    }
    cumulative
}

/// Invert the cumulative cross section at `target`, interpolating linearly
/// between grid angles.
pub(crate) fn sample_scattering_angle(angles: &[f64], cumulative: &[f64], target: f64) -> f64 {
    let last = cumulative.len() - 1;
    if target <= 0.0 {
        return angles[0];
    }
    if target >= cumulative[last] {
        return angles[last];
    }

    // Binary search for the bracketing interval.
    let mut low = 0usize;
    let mut high = last;
    while high - low > 1 {
        let mid = (low + high) >> 1;
        if cumulative[mid] <= target {
            low = mid;
        } else {
            high = mid;
        }
    }
    let span = cumulative[high] - cumulative[low];
    if span <= 0.0 {
        return angles[low];
    }
    let fraction = (target - cumulative[low]) / span;
    angles[low] + fraction * (angles[high] - angles[low])
}

/// Bethe ionization stopping power with the Joy-Luo correction, eV/A.
pub(crate) fn ionization_stopping(z: f64, density: f64, energy: f64) -> f64 {
    // Mean ionization potential, eV (Berger-Seltzer fit).
    let j = 9.76 * z + 58.5 * z.powf(-0.19);
    let prefactor =
        2.0 * PI * COULOMB_EV_ANGSTROM * COULOMB_EV_ANGSTROM * density * z / energy.max(1.0);
    let argument = 1.166 * (energy + 0.85 * j) / j;
    (prefactor * argument.ln()).max(0.0)
}

/// Radiative-to-ionization loss ratio; small below the MeV scale.
pub(crate) fn bremsstrahlung_ratio(z: f64, energy: f64) -> f64 {
    z * energy / 7.0e8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputKind, PrimaryKind};
    use crate::particle::ParticleKind;
    use std::sync::Arc;

    fn electron_config(energy: f64) -> Config {
        Config {
            primary_kind: PrimaryKind::Electron,
            primary_energy: energy,
            num_angle_divisors: 200,
            num_flying_distances: 16,
            num_screening_rows: 92,
            num_mott_rows: 92,
            electron_tables: Some(Arc::new(ElectronTables::screened_rutherford(92))),
            ..Config::default()
        }
    }

    #[test]
    fn test_cross_section_positive_and_forward_peaked() {
        let tables = ElectronTables::screened_rutherford(92);
        let small = differential_cross_section(&tables, 26.0, 1.0e5, 0.01);
        let large = differential_cross_section(&tables, 26.0, 1.0e5, 2.0);
        assert!(small > 0.0 && large > 0.0);
        assert!(small > large, "forward scattering must dominate");
    }

    #[test]
    fn test_cumulative_is_monotone() {
        let config = electron_config(1.0e5);
        let tables = config.electron_tables.as_ref().unwrap();
        let angles = tables.division_angles(config.num_angle_divisors);
        let cumulative = integrated_cross_sections(tables, 26.0, 1.0e5, angles);
        assert_eq!(cumulative.len(), angles.len());
        assert_eq!(cumulative[0], 0.0);
        for window in cumulative.windows(2) {
            assert!(window[1] >= window[0]);
        }
        assert!(*cumulative.last().unwrap() > 0.0);
    }

    #[test]
    fn test_total_cross_section_falls_with_energy() {
        let tables = ElectronTables::screened_rutherford(92);
        let angles = tables.division_angles(200);
        let low = *integrated_cross_sections(&tables, 26.0, 5.0e4, angles)
            .last()
            .unwrap();
        let high = *integrated_cross_sections(&tables, 26.0, 5.0e5, angles)
            .last()
            .unwrap();
        assert!(low > high, "faster electrons scatter less: {} !> {}", low, high);
    }

    #[test]
    fn test_sample_angle_inverts_cumulative() {
        let angles = vec![0.0, 1.0, 2.0, 3.0];
        let cumulative = vec![0.0, 1.0, 3.0, 4.0];
        assert_eq!(sample_scattering_angle(&angles, &cumulative, 0.0), 0.0);
        assert_eq!(sample_scattering_angle(&angles, &cumulative, 4.0), 3.0);
        assert!((sample_scattering_angle(&angles, &cumulative, 0.5) - 0.5).abs() < 1e-12);
        assert!((sample_scattering_angle(&angles, &cumulative, 2.0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_fire_reaches_terminal_state() {
        let config = electron_config(2.0e4);
        let rng = SharedRng::seed_from(31);
        let mut p = Particle::primary(&config);
        assert_eq!(p.kind, ParticleKind::Electron);
        let secondaries = fire(&mut p, &config, &rng);
        assert!(p.status.is_terminal());
        assert!(!p.trajectory.is_empty());
        // 20 keV electrons cannot transfer 40 eV to an iron atom.
        assert!(secondaries.is_empty());
    }

    #[test]
    fn test_fire_energy_non_increasing() {
        let config = electron_config(5.0e4);
        let tables = config.electron_tables.as_ref().unwrap().clone();
        let rng = SharedRng::seed_from(8);
        let mut p = Particle::primary(&config);
        p.status = ParticleStatus::Traveling;
        let mut secondaries = Vec::new();
        let mut last_energy = p.motion.energy;
        for _ in 0..5 {
            if p.check_terminal(&config) {
                break;
            }
            step_group(&mut p, &config, &tables, &rng, &mut secondaries);
            assert!(p.motion.energy <= last_energy);
            last_energy = p.motion.energy;
        }
    }

    #[test]
    fn test_fire_deterministic_for_fixed_seed() {
        let config = electron_config(3.0e4);

        let rng = SharedRng::seed_from(55);
        let mut a = Particle::primary(&config);
        fire(&mut a, &config, &rng);

        let rng = SharedRng::seed_from(55);
        let mut b = Particle::primary(&config);
        fire(&mut b, &config, &rng);

        assert_eq!(a.trajectory, b.trajectory);
        assert_eq!(a.status, b.status);
    }

    #[test]
    fn test_end_of_flight_mode_records_fewer_points() {
        let full = electron_config(3.0e4);
        let sparse = Config {
            output_kind: OutputKind::EndOfFlight,
            ..electron_config(3.0e4)
        };

        let rng = SharedRng::seed_from(21);
        let mut a = Particle::primary(&full);
        fire(&mut a, &full, &rng);

        let rng = SharedRng::seed_from(21);
        let mut b = Particle::primary(&sparse);
        fire(&mut b, &sparse, &rng);

        assert!(b.trajectory.len() <= a.trajectory.len());
        assert!(!b.trajectory.is_empty());
    }

    #[test]
    fn test_end_of_flight_mode_keeps_terminal_point() {
        let config = Config {
            output_kind: OutputKind::EndOfFlight,
            ..electron_config(3.0e4)
        };
        let rng = SharedRng::seed_from(13);
        let mut p = Particle::primary(&config);
        fire(&mut p, &config, &rng);
        assert!(p.status.is_terminal());
        // A mid-group halt must still record the resting place.
        assert_eq!(*p.trajectory.last().unwrap(), p.coordinate);
    }

    #[test]
    fn test_ionization_stopping_positive() {
        let s = ionization_stopping(26.0, 0.08491, 1.0e5);
        assert!(s > 0.0 && s.is_finite());
    }

    #[test]
    fn test_bremsstrahlung_small_below_mev() {
        assert!(bremsstrahlung_ratio(26.0, 1.0e5) < 0.01);
    }
}
