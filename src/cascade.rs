// One damage cascade: a primary particle plus every knock-on it and its
// descendants create, driven by an explicit work-list instead of recursion.
//
// Particles are processed depth-first: the particle on top of the list runs
// to a terminal state, its freshly created knock-ons are pushed, and the
// most recently created one runs next. The cascade is complete exactly when
// the list is empty, at which point every particle it ever held is in a
// terminal state.

use crate::config::Config;
use crate::electron;
use crate::ion;
use crate::particle::{Coordinate, Particle, ParticleKind};
use crate::rng::SharedRng;

/// The retained trajectory of one completed particle, flattened out of the
/// `Particle` so that discarding particle state never loses output.
#[derive(Debug, Clone)]
pub struct TrajectoryRecord {
    pub kind: ParticleKind,
    pub points: Vec<Coordinate>,
}

/// A single cascade in flight: pending work, completed records and the
/// optional retained particle states.
#[derive(Debug)]
pub struct Cascade {
    pub id: usize,
    pending: Vec<Particle>,
    completed: Vec<Particle>,
    records: Vec<TrajectoryRecord>,
    flagged_events: u32,
}

impl Cascade {
    /// A fresh cascade seeded with its primary particle.
    pub fn new(id: usize, config: &Config) -> Self {
        Cascade {
            id,
            pending: vec![Particle::primary(config)],
            completed: Vec::new(),
            records: Vec::new(),
            flagged_events: 0,
        }
    }

    /// Drain the work-list. Returns only once every particle the cascade
    /// created has reached a terminal state.
    pub fn run(&mut self, config: &Config, rng: &SharedRng) {
        while let Some(mut particle) = self.pending.pop() {
            let knockons = match particle.kind {
                ParticleKind::Electron => electron::fire(&mut particle, config, rng),
                ParticleKind::Ion | ParticleKind::SubstrateKnockon => {
                    ion::fire(&mut particle, config, rng)
                }
            };
            debug_assert!(particle.status.is_terminal());
            // Creation order on a LIFO list: the newest knock-on runs next.
            self.pending.extend(knockons);
            self.retire(particle, config);
        }
    }

    /// Flatten the particle's retained points into the cascade's records,
    /// then either keep or discard the particle state itself. The record is
    /// taken before the particle can be dropped, so eager discard never
    /// loses output.
    fn retire(&mut self, mut particle: Particle, config: &Config) {
        self.flagged_events += particle.flagged_events;
        self.records.push(TrajectoryRecord {
            kind: particle.kind,
            points: std::mem::take(&mut particle.trajectory),
        });
        if config.retain_particles {
            self.completed.push(particle);
        }
    }

    /// Completed trajectory records, one per particle, in completion order.
    pub fn records(&self) -> &[TrajectoryRecord] {
        &self.records
    }

    /// Retained particle states (empty when eager discard is configured).
    pub fn particles(&self) -> &[Particle] {
        &self.completed
    }

    /// Total particles this cascade transported.
    pub fn particle_count(&self) -> usize {
        self.records.len()
    }

    /// Numerical anomalies recovered with a fallback across all particles.
    pub fn flagged_events(&self) -> u32 {
        self.flagged_events
    }
}
