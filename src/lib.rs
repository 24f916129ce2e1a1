mod cascade;
mod config;
mod constants;
mod electron;
mod error;
mod ion;
mod output;
mod particle;
mod rng;
mod simulation;
mod tables;

pub use cascade::{Cascade, TrajectoryRecord};
pub use config::{Config, OutputKind, PrimaryKind};
pub use error::{CascadeError, Result};
pub use output::OutputWriter;
pub use particle::{Coordinate, Motion, Particle, ParticleKind, ParticleStatus, Species};
pub use rng::SharedRng;
pub use simulation::{Simulation, SimulationSummary};
pub use tables::{ElectronTables, MottRow, ScreeningRow};
