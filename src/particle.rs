// Per-particle state: position history, motion, species constants and the
// terminal-status bookkeeping shared by all transported species.
//
// The species-specific step physics lives in `ion` and `electron`; this
// module owns what every species has in common, including the deterministic
// angle-composition transform that maps a scattering deflection in the
// particle frame to an absolute-frame direction.

use crate::config::{Config, OutputKind, PrimaryKind};
use crate::constants;
use nalgebra::Vector3;
use serde::Serialize;

/// One trajectory point: position plus the step ordinal since this
/// particle entered transport. Immutable once appended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub depth: usize,
}

impl Coordinate {
    /// Entry point of a primary: the substrate surface origin.
    pub fn entry() -> Self {
        Coordinate {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            depth: 0,
        }
    }

    /// Euclidean distance from the beam entry point, A.
    pub fn distance_from_entry(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Instantaneous direction and kinetic energy.
///
/// `polar` is measured from the +z beam axis, `azimuth` in the x-y plane.
/// Energy only decreases over a particle's lifetime; a newly created
/// knock-on starts with a share of the energy its parent just lost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub polar: f64,
    pub azimuth: f64,
    pub energy: f64,
}

impl Motion {
    /// Primary entry motion: straight down the beam axis.
    pub fn along_beam(energy: f64) -> Self {
        Motion {
            polar: 0.0,
            azimuth: 0.0,
            energy,
        }
    }

    /// Unit direction vector for this motion.
    pub fn direction(&self) -> Vector3<f64> {
        let sin_polar = self.polar.sin();
        Vector3::new(
            sin_polar * self.azimuth.cos(),
            sin_polar * self.azimuth.sin(),
            self.polar.cos(),
        )
    }

    /// Rebuild angles from a unit direction vector.
    pub fn from_direction(direction: &Vector3<f64>, energy: f64) -> Self {
        Motion {
            polar: direction.z.clamp(-1.0, 1.0).acos(),
            azimuth: direction.y.atan2(direction.x),
            energy,
        }
    }

    /// Compose a scattering deflection (polar angle `theta_rel`, azimuthal
    /// angle `phi_rel`, both relative to the current flight direction) into
    /// absolute-frame angles, carrying the given post-collision energy.
    pub fn deflected(&self, theta_rel: f64, phi_rel: f64, energy: f64) -> Motion {
        let new_dir = rotate_direction(&self.direction(), theta_rel.cos(), phi_rel);
        Motion::from_direction(&new_dir, energy)
    }
}

/// Rotate a unit vector to a new direction with cosine `mu` relative to the
/// original, at azimuthal angle `phi` around it.
pub fn rotate_direction(u_old: &Vector3<f64>, mu: f64, phi: f64) -> Vector3<f64> {
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();

    // Perpendicular frame around the old direction.
    let perp = if u_old.x.abs() < 0.99 {
        Vector3::new(1.0, 0.0, 0.0).cross(u_old).normalize()
    } else {
        Vector3::new(0.0, 1.0, 0.0).cross(u_old).normalize()
    };
    let ortho = u_old.cross(&perp);

    mu * u_old + sin_theta * phi.cos() * perp + sin_theta * phi.sin() * ortho
}

/// Closed set of transported species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParticleKind {
    Ion,
    SubstrateKnockon,
    Electron,
}

impl ParticleKind {
    pub fn is_electron(&self) -> bool {
        matches!(self, ParticleKind::Electron)
    }
}

/// Transport state machine: Created -> Traveling -> one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleStatus {
    Created,
    Traveling,
    /// Energy fell below the species stopping threshold.
    StoppedByEnergy,
    /// Distance from entry or step count exceeded the configured bounds.
    StoppedByRange,
    /// Crossed the substrate surface back into vacuum (z < 0).
    LeftSubstrate,
}

impl ParticleStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ParticleStatus::Created | ParticleStatus::Traveling)
    }
}

/// Static physical constants of a species.
#[derive(Debug, Clone, Copy)]
pub struct Species {
    /// Atomic number (charge state of the nucleus).
    pub charge: f64,
    /// Mass in amu.
    pub mass: f64,
}

/// One transported particle and its append-only trajectory.
#[derive(Debug, Clone)]
pub struct Particle {
    pub kind: ParticleKind,
    pub species: Species,
    pub coordinate: Coordinate,
    pub motion: Motion,
    pub status: ParticleStatus,
    pub trajectory: Vec<Coordinate>,
    /// Knock-on generation: 0 for primaries, parent + 1 for secondaries.
    pub cascade_depth: usize,
    /// Count of per-event numerical anomalies recovered with a fallback.
    pub flagged_events: u32,
    /// Seed for the next closest-approach root find (previous solution).
    pub(crate) last_closest_approach: f64,
}

impl Particle {
    /// The primary particle of a cascade, entering at the surface origin
    /// along the beam axis with the configured energy.
    pub fn primary(config: &Config) -> Self {
        let (kind, species) = match config.primary_kind {
            PrimaryKind::Ion => (
                ParticleKind::Ion,
                Species {
                    charge: config.primary_charge,
                    mass: config.primary_mass,
                },
            ),
            PrimaryKind::Electron => (
                ParticleKind::Electron,
                Species {
                    charge: 1.0,
                    mass: constants::ELECTRON_MASS_AMU,
                },
            ),
        };
        Particle {
            kind,
            species,
            coordinate: Coordinate::entry(),
            motion: Motion::along_beam(config.primary_energy),
            status: ParticleStatus::Created,
            trajectory: Vec::new(),
            cascade_depth: 0,
            flagged_events: 0,
            last_closest_approach: constants::screening_length(
                species.charge,
                config.substrate_charge,
            ),
        }
    }

    /// A substrate knock-on created at a collision site with the recoil
    /// motion computed by the parent's collision.
    pub fn knockon(
        coordinate: Coordinate,
        motion: Motion,
        config: &Config,
        parent_cascade_depth: usize,
    ) -> Self {
        let species = Species {
            charge: config.substrate_charge,
            mass: config.substrate_mass,
        };
        Particle {
            kind: ParticleKind::SubstrateKnockon,
            species,
            coordinate: Coordinate {
                depth: 0,
                ..coordinate
            },
            motion,
            status: ParticleStatus::Created,
            trajectory: Vec::new(),
            cascade_depth: parent_cascade_depth + 1,
            flagged_events: 0,
            last_closest_approach: constants::screening_length(
                species.charge,
                config.substrate_charge,
            ),
        }
    }

    /// Move `distance` along the current flight direction and advance the
    /// step ordinal.
    pub fn advance(&mut self, distance: f64) {
        let dir = self.motion.direction();
        self.coordinate = Coordinate {
            x: self.coordinate.x + distance * dir.x,
            y: self.coordinate.y + distance * dir.y,
            z: self.coordinate.z + distance * dir.z,
            depth: self.coordinate.depth + 1,
        };
    }

    /// Append the current position to the trajectory according to the
    /// configured output kind. `batch_end` marks the last flight of an
    /// electron flight group; ion collisions always count as batch ends.
    pub fn record_point(&mut self, batch_end: bool, config: &Config) {
        match config.output_kind {
            OutputKind::Coordinates => self.trajectory.push(self.coordinate),
            OutputKind::EndOfFlight => {
                if batch_end {
                    self.trajectory.push(self.coordinate);
                }
            }
            OutputKind::StoppingPoints => {}
        }
    }

    /// Record the terminal position. In stopping-point mode this is the one
    /// retained point; in the other modes it is appended unless the terminal
    /// position was already the last recorded point, so a particle halting
    /// between group-end records still keeps its resting place.
    pub fn record_stop(&mut self, config: &Config) {
        match config.output_kind {
            OutputKind::StoppingPoints => self.trajectory.push(self.coordinate),
            _ => {
                if self.trajectory.last() != Some(&self.coordinate) {
                    self.trajectory.push(self.coordinate);
                }
            }
        }
    }

    /// Re-check the terminal conditions, setting the status accordingly.
    /// Returns true once the particle has reached a terminal state.
    pub fn check_terminal(&mut self, config: &Config) -> bool {
        if self.motion.energy < config.stopping_energy(self.kind.is_electron()) {
            self.status = ParticleStatus::StoppedByEnergy;
        } else if self.coordinate.depth >= config.max_depth
            || self.coordinate.distance_from_entry() > config.range_limit
        {
            self.status = ParticleStatus::StoppedByRange;
        } else if self.coordinate.z < 0.0 {
            self.status = ParticleStatus::LeftSubstrate;
        }
        self.status.is_terminal()
    }
}
