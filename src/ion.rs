// Ion and knock-on transport: one binary collision per step.
//
// Each step draws a flight distance and an impact parameter within the
// atomic cell, solves the screened-Coulomb distance of closest approach by
// Newton iteration, evaluates the scattering angle with the
// Biersack-Haggmark MAGIC fit, partitions the energy loss into a recoil
// transfer plus Lindhard-Scharff electronic stopping, and spawns a
// substrate knock-on when the transfer strictly exceeds the displacement
// threshold.

use crate::config::Config;
use crate::constants::{
    COULOMB_EV_ANGSTROM, MAGIC_C, MAX_NEWTON_ITERATIONS, NEWTON_TOLERANCE,
};
use crate::particle::{Particle, ParticleStatus};
use crate::rng::SharedRng;
use log::warn;
use std::f64::consts::PI;

/// Outcome of one binary collision, all angles in the lab frame relative to
/// the incoming flight direction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Collision {
    /// Polar deflection of the surviving projectile, radians.
    pub scattering_angle: f64,
    /// Polar angle of the recoiling substrate atom, radians.
    pub recoil_angle: f64,
    /// Energy transferred to the substrate atom, eV.
    pub transferred: f64,
    /// False when the closest-approach root find hit the iteration bound;
    /// the last iterate was used instead.
    pub converged: bool,
}

/// Drive an ion or knock-on from its current state to a terminal state,
/// returning any knock-ons created along the way. Every created secondary
/// must later be driven exactly once by the owning cascade.
pub fn fire(p: &mut Particle, config: &Config, rng: &SharedRng) -> Vec<Particle> {
    debug_assert!(!p.kind.is_electron());
    let mut secondaries = Vec::new();
    p.status = ParticleStatus::Traveling;
    loop {
        if p.check_terminal(config) {
            p.record_stop(config);
            break;
        }
        step(p, config, rng, &mut secondaries);
    }
    secondaries
}

/// One scattering event: flight, collision, energy update, possible
/// knock-on creation.
pub(crate) fn step(
    p: &mut Particle,
    config: &Config,
    rng: &SharedRng,
    secondaries: &mut Vec<Particle>,
) {
    let spacing = config.atomic_spacing();

    // Flight distance: exponential with the interatomic spacing as both the
    // mean free path and the upper bound of one atomic cell.
    let flight = (-rng.sample().ln() * spacing).min(spacing);

    // Impact parameter distributed uniformly over the cell cross section.
    let impact = spacing * (rng.sample() / PI).sqrt();

    // Travel along the incoming direction to the collision site.
    p.advance(flight);

    let energy = p.motion.energy;
    let collision = collide(p, impact, energy, config);
    if !collision.converged {
        p.flagged_events += 1;
        warn!(
            "closest-approach iteration did not converge at E = {:.3e} eV, b = {:.3} A; using last iterate",
            energy, impact
        );
    }

    // Continuous electronic loss accumulated over the flight.
    let electronic = electronic_stopping(p.species.charge, p.species.mass, config, energy) * flight;

    let new_energy = (energy - collision.transferred - electronic).max(0.0);

    // One azimuth serves both collision partners; the recoil leaves in the
    // opposite azimuthal half-plane.
    let phi = 2.0 * PI * rng.sample();

    p.record_point(true, config);

    if config.displaces(collision.transferred) {
        let recoil_energy = collision.transferred - config.displacement_energy;
        let recoil_motion = p
            .motion
            .deflected(collision.recoil_angle, phi + PI, recoil_energy);
        secondaries.push(Particle::knockon(
            p.coordinate,
            recoil_motion,
            config,
            p.cascade_depth,
        ));
    }

    p.motion = p
        .motion
        .deflected(collision.scattering_angle, phi, new_energy);
}

/// Evaluate one screened-Coulomb binary collision.
fn collide(p: &mut Particle, impact: f64, energy: f64, config: &Config) -> Collision {
    let z1 = p.species.charge;
    let z2 = config.substrate_charge;
    let m1 = p.species.mass;
    let m2 = config.substrate_mass;

    let a = crate::constants::screening_length(z1, z2);
    let coulomb = z1 * z2 * COULOMB_EV_ANGSTROM;
    let energy_cm = energy * m2 / (m1 + m2);

    let (r0, converged) = closest_approach(energy_cm, coulomb, a, impact, p.last_closest_approach);
    p.last_closest_approach = r0;

    let theta_cm = magic_scattering_angle(energy_cm, coulomb, a, impact, r0);

    // Elastic energy transfer to the target atom.
    let gamma = 4.0 * m1 * m2 / ((m1 + m2) * (m1 + m2));
    let half = theta_cm / 2.0;
    let transferred = gamma * energy * half.sin() * half.sin();

    // Center-of-mass to lab conversion for the survivor; the recoil leaves
    // at (pi - theta_cm) / 2 in the lab frame.
    let scattering_angle = theta_cm.sin().atan2(theta_cm.cos() + m1 / m2);
    let recoil_angle = (PI - theta_cm) / 2.0;

    Collision {
        scattering_angle,
        recoil_angle,
        transferred,
        converged,
    }
}

/// Distance of closest approach for the screened potential
/// V(r) = (C / r) exp(-r / a): Newton iteration on
/// f(x) = x^2 - (C / E_cm) x exp(-x / a) - b^2, seeded from the previous
/// event's solution. On hitting the iteration bound the last iterate is
/// returned with `false`.
pub(crate) fn closest_approach(
    energy_cm: f64,
    coulomb: f64,
    a: f64,
    impact: f64,
    seed: f64,
) -> (f64, bool) {
    let mut x = seed.max(1e-6);
    let mut converged = false;
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let screen = (-x / a).exp();
        let f = x * x - (coulomb / energy_cm) * x * screen - impact * impact;
        let df = 2.0 * x - (coulomb / energy_cm) * screen * (1.0 - x / a);
        if df.abs() < 1e-30 {
            break;
        }
        let dx = f / df;
        x -= dx;
        if x <= 0.0 {
            // Keep the iterate inside the physical domain.
            x = 1e-6;
            continue;
        }
        if dx.abs() <= NEWTON_TOLERANCE * x {
            converged = true;
            break;
        }
    }
    // The closest approach can never undercut the impact parameter for a
    // repulsive potential.
    (x.max(impact), converged)
}

/// Center-of-mass scattering angle from the MAGIC fit (Biersack-Haggmark),
/// evaluated with the exponentially screened Coulomb potential.
fn magic_scattering_angle(energy_cm: f64, coulomb: f64, a: f64, impact: f64, r0: f64) -> f64 {
    let [c1, c2, c3, c4, c5] = MAGIC_C;

    // Potential and its derivative at the closest approach.
    let screen = (-r0 / a).exp();
    let v0 = coulomb / r0 * screen;
    let v0_prime = -coulomb * screen * (1.0 / (r0 * r0) + 1.0 / (a * r0));

    // Radius of curvature of the orbit at closest approach.
    let rho = 2.0 * (energy_cm - v0) / (-v0_prime);

    // Reduced quantities for the fit terms.
    let eps = energy_cm * a / coulomb;
    let b_reduced = impact / a;
    let sqrt_eps = eps.sqrt();

    let alpha = 1.0 + c1 / sqrt_eps;
    let beta = (c2 + sqrt_eps) / (c3 + sqrt_eps);
    let gamma = (c4 + eps) / (c5 + eps);
    let a_term = 2.0 * alpha * eps * b_reduced.powf(beta);
    let g_term = gamma / ((1.0 + a_term * a_term).sqrt() - a_term);
    let delta = a_term * (r0 - impact) / (1.0 + g_term);

    let cos_half = ((impact + rho + delta) / (r0 + rho)).clamp(-1.0, 1.0);
    2.0 * cos_half.acos()
}

/// Lindhard-Scharff electronic stopping power, eV per Angstrom of path.
/// The velocity-proportional regime: S_e = k * sqrt(E_keV) in eV A^2,
/// scaled by the substrate atomic density.
pub(crate) fn electronic_stopping(z1: f64, m1: f64, config: &Config, energy: f64) -> f64 {
    let z2 = config.substrate_charge;
    let k = 1.212 * z1.powf(7.0 / 6.0) * z2
        / ((z1.powf(2.0 / 3.0) + z2.powf(2.0 / 3.0)).powf(1.5) * m1.sqrt());
    let energy_kev = energy / 1000.0;
    k * energy_kev.sqrt() * config.substrate_density
}
