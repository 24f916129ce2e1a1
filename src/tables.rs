// Injected electron scattering parameter tables
//
// Parsing the tabulated Mott and screening coefficients from disk is an
// external responsibility; this module receives the already-parsed numbers,
// validates their shape once, and serves them read-only to every worker.
// A malformed table is a fatal initialization error: no cascade may start
// against it.

use crate::error::{CascadeError, Result};
use once_cell::sync::OnceCell;

/// Powers of (1 - cos theta) in the Mott ratio fit.
pub const MOTT_GROUPS: usize = 5;
/// Beta-polynomial terms within one Mott group.
pub const MOTT_TERMS: usize = 6;
/// ln-energy polynomial terms in the screening-parameter fit.
pub const SCREENING_TERMS: usize = 6;

/// One Mott row: fit coefficients for a single element.
pub type MottRow = [[f64; MOTT_TERMS]; MOTT_GROUPS];
/// One screening row: fit coefficients for a single element.
pub type ScreeningRow = [f64; SCREENING_TERMS];

/// Read-only electron scattering tables, one row per element, indexed by
/// atomic number starting at Z = 1.
///
/// The Mott ratio at energy E and scattering angle theta is evaluated as
/// R = sum_j c_j * (1 - cos theta)^j with c_j = sum_k m[j][k] * beta^k,
/// where beta is the electron's speed in units of c. The screening
/// parameter is alpha = sum_k s_k * ln(E_keV)^k, clamped positive.
#[derive(Debug)]
pub struct ElectronTables {
    mott: Vec<MottRow>,
    screening: Vec<ScreeningRow>,
    division_angles: OnceCell<Vec<f64>>,
}

impl ElectronTables {
    /// Wrap pre-parsed coefficient rows, rejecting non-finite entries.
    pub fn new(mott: Vec<MottRow>, screening: Vec<ScreeningRow>) -> Result<Self> {
        if mott.is_empty() || screening.is_empty() {
            return Err(CascadeError::Table("tables must not be empty".to_string()));
        }
        for (z, row) in mott.iter().enumerate() {
            if row.iter().flatten().any(|v| !v.is_finite()) {
                return Err(CascadeError::Table(format!(
                    "non-finite Mott coefficient in row {}",
                    z + 1
                )));
            }
        }
        for (z, row) in screening.iter().enumerate() {
            if row.iter().any(|v| !v.is_finite()) {
                return Err(CascadeError::Table(format!(
                    "non-finite screening coefficient in row {}",
                    z + 1
                )));
            }
        }
        Ok(ElectronTables {
            mott,
            screening,
            division_angles: OnceCell::new(),
        })
    }

    /// Tables equivalent to a pure screened-Rutherford cross section:
    /// the Mott ratio is identically 1 and the screening parameter follows
    /// the Nigam form alpha = 3.4e-3 * Z^(2/3) / E_keV, linearized here as
    /// a constant per element at 10 keV. Useful when no measured tables
    /// are available and in tests.
    pub fn screened_rutherford(rows: usize) -> Self {
        let mut mott = Vec::with_capacity(rows);
        let mut screening = Vec::with_capacity(rows);
        for z in 1..=rows {
            let mut m: MottRow = [[0.0; MOTT_TERMS]; MOTT_GROUPS];
            m[0][0] = 1.0;
            mott.push(m);
            let mut s: ScreeningRow = [0.0; SCREENING_TERMS];
            s[0] = 3.4e-3 * (z as f64).powf(2.0 / 3.0) / 10.0;
            screening.push(s);
        }
        ElectronTables {
            mott,
            screening,
            division_angles: OnceCell::new(),
        }
    }

    /// Verify the row counts against the configured expectations.
    pub fn check_shape(&self, mott_rows: usize, screening_rows: usize) -> Result<()> {
        if self.mott.len() != mott_rows {
            return Err(CascadeError::Table(format!(
                "Mott table has {} rows, configuration expects {}",
                self.mott.len(),
                mott_rows
            )));
        }
        if self.screening.len() != screening_rows {
            return Err(CascadeError::Table(format!(
                "screening table has {} rows, configuration expects {}",
                self.screening.len(),
                screening_rows
            )));
        }
        Ok(())
    }

    pub fn mott_rows(&self) -> usize {
        self.mott.len()
    }

    pub fn screening_rows(&self) -> usize {
        self.screening.len()
    }

    /// Mott fit row for atomic number `z` (1-based).
    pub fn mott_row(&self, z: usize) -> &MottRow {
        &self.mott[z - 1]
    }

    /// Screening fit row for atomic number `z` (1-based).
    pub fn screening_row(&self, z: usize) -> &ScreeningRow {
        &self.screening[z - 1]
    }

    /// Angular grid for the integrated cross sections: `divisors + 1`
    /// uniformly spaced angles covering [0, pi]. Computed on first use and
    /// shared read-only afterwards. Panics if a later caller asks for a
    /// different division count than the grid was built with; tables shared
    /// across runs must agree on the discretization.
    pub fn division_angles(&self, divisors: usize) -> &[f64] {
        let angles = self.division_angles.get_or_init(|| {
            (0..=divisors)
                .map(|i| std::f64::consts::PI * i as f64 / divisors as f64)
                .collect()
        });
        assert_eq!(
            angles.len(),
            divisors + 1,
            "angular grid already built with {} divisions",
            angles.len() - 1
        );
        angles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_check() {
        let tables = ElectronTables::screened_rutherford(92);
        tables.check_shape(92, 92).unwrap();
        assert!(tables.check_shape(50, 92).is_err());
        assert!(tables.check_shape(92, 50).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut mott = vec![[[0.0; MOTT_TERMS]; MOTT_GROUPS]];
        mott[0][2][3] = f64::NAN;
        let screening = vec![[0.0; SCREENING_TERMS]];
        assert!(ElectronTables::new(mott, screening).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(ElectronTables::new(Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn test_division_angles_span_and_cache() {
        let tables = ElectronTables::screened_rutherford(10);
        let angles = tables.division_angles(100);
        assert_eq!(angles.len(), 101);
        assert_eq!(angles[0], 0.0);
        assert!((angles[100] - std::f64::consts::PI).abs() < 1e-12);
        // Second call returns the same cached grid.
        let again = tables.division_angles(100);
        assert_eq!(angles.as_ptr(), again.as_ptr());
    }

    #[test]
    #[should_panic(expected = "angular grid already built")]
    fn test_division_angles_rejects_mismatched_count() {
        let tables = ElectronTables::screened_rutherford(10);
        tables.division_angles(100);
        tables.division_angles(200);
    }

    #[test]
    fn test_screened_rutherford_rows() {
        let tables = ElectronTables::screened_rutherford(92);
        assert_eq!(tables.mott_rows(), 92);
        let row = tables.mott_row(26);
        assert_eq!(row[0][0], 1.0);
        let alpha_row = tables.screening_row(26);
        assert!(alpha_row[0] > 0.0);
    }
}
