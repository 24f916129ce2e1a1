// Physical constants and fit coefficients
//
// Unit system: energies in eV, lengths in Angstrom, angles in radians,
// number densities in atoms/A^3. All formulas in the engine assume these
// units; never mix.

/// Coulomb constant e^2 / (4 pi eps0) in eV * Angstrom per unit-charge pair.
pub const COULOMB_EV_ANGSTROM: f64 = 14.3992;

/// Bohr radius in Angstrom.
pub const BOHR_RADIUS: f64 = 0.529177;

/// Prefactor of the Lindhard universal screening length.
pub const SCREENING_PREFACTOR: f64 = 0.8854;

/// Electron rest mass in atomic mass units.
pub const ELECTRON_MASS_AMU: f64 = 5.485799e-4;

/// Electron rest energy in eV.
pub const ELECTRON_REST_ENERGY_EV: f64 = 510_998.95;

/// Classical electron radius in Angstrom.
pub const ELECTRON_RADIUS: f64 = 2.8179403e-5;

/// Biersack-Haggmark MAGIC scattering-angle fit coefficients C1..C5.
pub const MAGIC_C: [f64; 5] = [0.99229, 0.011615, 0.0071222, 14.813, 9.3066];

/// Maximum Newton iterations for the closest-approach root find.
pub const MAX_NEWTON_ITERATIONS: usize = 50;

/// Relative convergence tolerance for the closest-approach root find.
pub const NEWTON_TOLERANCE: f64 = 1e-9;

/// Universal screening length for a colliding pair, in Angstrom.
pub fn screening_length(z1: f64, z2: f64) -> f64 {
    SCREENING_PREFACTOR * BOHR_RADIUS / (z1.powf(0.23) + z2.powf(0.23))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screening_length_scale() {
        // Helium on iron lands in the typical tenth-of-an-Angstrom range.
        let a = screening_length(2.0, 26.0);
        assert!(a > 0.05 && a < 0.5, "screening length {} out of range", a);
    }

    #[test]
    fn test_screening_length_symmetric() {
        assert_eq!(screening_length(2.0, 26.0), screening_length(26.0, 2.0));
    }
}
