// Immutable run configuration
//
// Constructed once before any cascade starts and shared read-only by every
// worker. The settings-file parser lives outside this crate; it hands over
// a fully populated `Config`, which is validated here before parallel work
// begins.

use crate::constants;
use crate::error::{CascadeError, Result};
use crate::tables::ElectronTables;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Species of the primary particle that opens each cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrimaryKind {
    Ion,
    Electron,
}

/// Which trajectory points a run persists, and therefore which destination
/// file it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputKind {
    /// Every collision point of every particle.
    Coordinates,
    /// Only the final resting point of each particle.
    StoppingPoints,
    /// Only the last point of each electron flight group (full detail for ions).
    EndOfFlight,
}

impl OutputKind {
    /// File-name suffix distinguishing the destination files.
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputKind::Coordinates => "coordinates",
            OutputKind::StoppingPoints => "stopping_points",
            OutputKind::EndOfFlight => "end_of_flight",
        }
    }

    pub const ALL: [OutputKind; 3] = [
        OutputKind::Coordinates,
        OutputKind::StoppingPoints,
        OutputKind::EndOfFlight,
    ];
}

/// Run-wide parameters, fixed for the lifetime of a simulation.
///
/// Energies are in eV, lengths in Angstrom, the substrate density in
/// atoms/A^3. The beam enters the substrate surface at the origin along +z;
/// the substrate fills the half-space z >= 0.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    // Primary species
    pub primary_kind: PrimaryKind,
    /// Atomic number of the primary ion (ignored for electrons).
    pub primary_charge: f64,
    /// Mass of the primary ion in amu (ignored for electrons).
    pub primary_mass: f64,
    /// Kinetic energy at entry, eV.
    pub primary_energy: f64,

    // Substrate species
    pub substrate_charge: f64,
    pub substrate_mass: f64,
    /// Atomic number density, atoms/A^3.
    pub substrate_density: f64,

    // Thresholds
    /// Transferred energy must strictly exceed this to create a knock-on, eV.
    pub displacement_energy: f64,
    /// Ions and knock-ons below this energy are halted, eV.
    pub ion_stopping_energy: f64,
    /// Electrons below this energy are halted, eV.
    pub electron_stopping_energy: f64,
    /// When false, collisions never spawn knock-ons.
    pub enable_damage_cascade: bool,

    // Geometry and bounds
    /// Maximum distance from the entry point before a particle is halted, A.
    pub range_limit: f64,
    /// Safeguard on the number of scattering events per particle.
    pub max_depth: usize,

    // Electron sampling discretization
    /// Number of angular divisions for the integrated cross sections.
    pub num_angle_divisors: usize,
    /// Flying distances processed per electron step.
    pub num_flying_distances: usize,
    /// Expected row count of the injected screening table.
    pub num_screening_rows: usize,
    /// Expected row count of the injected Mott table.
    pub num_mott_rows: usize,

    // Run shape
    pub cascade_count: usize,
    pub thread_count: usize,
    pub seed: u64,

    // Output
    pub output_directory: PathBuf,
    pub output_stem: String,
    pub output_extension: String,
    /// Sentinel line terminating each cascade's output batch.
    pub end_marker: String,
    pub output_kind: OutputKind,
    /// Keep completed particle records in the cascade (true) or discard each
    /// one as soon as its retained points are recorded (false).
    pub retain_particles: bool,
    pub report_progress: bool,

    /// Pre-parsed electron scattering tables; required when the primary is
    /// an electron.
    #[serde(skip)]
    pub electron_tables: Option<Arc<ElectronTables>>,
}

impl Default for Config {
    /// 100 keV helium on iron, full coordinate log, single thread.
    fn default() -> Self {
        Config {
            primary_kind: PrimaryKind::Ion,
            primary_charge: 2.0,
            primary_mass: 4.0026,
            primary_energy: 1.0e5,
            substrate_charge: 26.0,
            substrate_mass: 55.845,
            substrate_density: 0.08491,
            displacement_energy: 40.0,
            ion_stopping_energy: 20.0,
            electron_stopping_energy: 50.0,
            enable_damage_cascade: true,
            range_limit: 1.0e7,
            max_depth: 100_000,
            num_angle_divisors: 1000,
            num_flying_distances: 100,
            num_screening_rows: 92,
            num_mott_rows: 92,
            cascade_count: 1,
            thread_count: 1,
            seed: 1,
            output_directory: PathBuf::from("output"),
            output_stem: String::from("cascade"),
            output_extension: String::from("csv"),
            end_marker: String::from("END_OF_BATCH"),
            output_kind: OutputKind::Coordinates,
            retain_particles: true,
            report_progress: false,
            electron_tables: None,
        }
    }
}

impl Config {
    /// Check the configuration before any worker starts. Every failure here
    /// is fatal; nothing is recoverable once threads are running against a
    /// bad configuration.
    pub fn validate(&self) -> Result<()> {
        if self.primary_energy <= 0.0 {
            return Err(CascadeError::Config(format!(
                "primary energy must be positive, got {}",
                self.primary_energy
            )));
        }
        if self.substrate_density <= 0.0 {
            return Err(CascadeError::Config(format!(
                "substrate density must be positive, got {}",
                self.substrate_density
            )));
        }
        if self.substrate_charge < 1.0 || self.substrate_mass <= 0.0 {
            return Err(CascadeError::Config(
                "substrate charge and mass must be physical".to_string(),
            ));
        }
        if self.primary_kind == PrimaryKind::Ion
            && (self.primary_charge < 1.0 || self.primary_mass <= 0.0)
        {
            return Err(CascadeError::Config(
                "ion charge and mass must be physical".to_string(),
            ));
        }
        if self.displacement_energy <= 0.0
            || self.ion_stopping_energy <= 0.0
            || self.electron_stopping_energy <= 0.0
        {
            return Err(CascadeError::Config(
                "energy thresholds must be positive".to_string(),
            ));
        }
        if self.range_limit <= 0.0 || self.max_depth == 0 {
            return Err(CascadeError::Config(
                "range limit and depth bound must be positive".to_string(),
            ));
        }
        if self.cascade_count == 0 {
            return Err(CascadeError::Config("cascade count is zero".to_string()));
        }
        if self.thread_count == 0 {
            return Err(CascadeError::Config("thread count is zero".to_string()));
        }
        if self.num_angle_divisors < 2 || self.num_flying_distances == 0 {
            return Err(CascadeError::Config(
                "electron discretization counts are too small".to_string(),
            ));
        }
        if self.end_marker.is_empty() {
            return Err(CascadeError::Config("end marker is empty".to_string()));
        }
        if self.primary_kind == PrimaryKind::Electron {
            match &self.electron_tables {
                None => {
                    return Err(CascadeError::Config(
                        "electron primary configured but no scattering tables injected"
                            .to_string(),
                    ))
                }
                Some(tables) => {
                    tables.check_shape(self.num_mott_rows, self.num_screening_rows)?;
                    if self.substrate_charge as usize > tables.mott_rows() {
                        return Err(CascadeError::Config(format!(
                            "no Mott row for substrate Z = {}",
                            self.substrate_charge
                        )));
                    }
                    if self.substrate_charge as usize > tables.screening_rows() {
                        return Err(CascadeError::Config(format!(
                            "no screening row for substrate Z = {}",
                            self.substrate_charge
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Mean interatomic spacing of the substrate, A.
    pub fn atomic_spacing(&self) -> f64 {
        self.substrate_density.powf(-1.0 / 3.0)
    }

    /// Destination path for one output kind.
    pub fn output_path(&self, kind: OutputKind) -> PathBuf {
        self.output_directory.join(format!(
            "{}_{}.{}",
            self.output_stem,
            kind.suffix(),
            self.output_extension
        ))
    }

    /// Human-readable dump of the effective configuration.
    pub fn describe(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<unprintable: {}>", e))
    }

    /// Stopping threshold for a given transported species.
    pub fn stopping_energy(&self, electron: bool) -> f64 {
        if electron {
            self.electron_stopping_energy
        } else {
            self.ion_stopping_energy
        }
    }

    /// Displacement predicate: knock-ons require strictly more transferred
    /// energy than the threshold.
    pub fn displaces(&self, transferred: f64) -> bool {
        self.enable_damage_cascade && transferred > self.displacement_energy
    }

    /// Universal screening length for the primary/substrate pair, A.
    pub fn ion_screening_length(&self) -> f64 {
        constants::screening_length(self.primary_charge, self.substrate_charge)
    }
}
