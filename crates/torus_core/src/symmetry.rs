//! Symmetry classes and their shape arithmetic.
//!
//! Each class is a tag; the methods here form the "symmetry descriptor"
//! that the shared operator code is parameterized by: shape formulas per
//! basis, selection-rule capabilities, and degenerate-axis flags. All
//! formulas are bijective given a basis, so a state array plus its basis
//! always determines the field discretization (N, M).

use serde::{Deserialize, Serialize};

use crate::error::OrbitError;
use crate::types::Basis;

/// The discrete symmetry class of an orbit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymmetryClass {
    /// No discrete symmetry.
    Full,
    /// Odd about a spatial reflection point; only the antisymmetric
    /// (imaginary) half of the spatial coefficients is stored.
    Antisymmetric,
    /// Invariant under spatial reflection composed with a half-period
    /// time shift; per temporal harmonic only one spatial half survives.
    ShiftReflection,
    /// Comoving frame with a free spatial drift S.
    Relative,
    /// Antisymmetric and time-independent (T forced to zero).
    Equilibrium,
    /// Relative and time-independent: pure drift.
    RelativeEquilibrium,
}

impl SymmetryClass {
    /// Whether the class carries the spatial-shift degree of freedom.
    pub fn has_shift(&self) -> bool {
        matches!(
            self,
            SymmetryClass::Relative | SymmetryClass::RelativeEquilibrium
        )
    }

    /// Whether the time axis is degenerate (a single stored harmonic).
    pub fn is_equilibrium(&self) -> bool {
        matches!(
            self,
            SymmetryClass::Equilibrium | SymmetryClass::RelativeEquilibrium
        )
    }

    /// Whether the spatial selection rule halves the stored mode columns.
    pub fn has_spatial_selection(&self) -> bool {
        matches!(
            self,
            SymmetryClass::Antisymmetric
                | SymmetryClass::ShiftReflection
                | SymmetryClass::Equilibrium
        )
    }

    /// Shape of the mode-basis array for field discretization (N, M).
    pub fn mode_shape(&self, n_points: usize, m_points: usize) -> (usize, usize) {
        let rows = std::cmp::max(n_points.saturating_sub(1), 1);
        let m = m_points / 2 - 1;
        match self {
            SymmetryClass::Full | SymmetryClass::Relative => (rows, m_points - 2),
            SymmetryClass::Antisymmetric | SymmetryClass::ShiftReflection => (rows, m),
            SymmetryClass::Equilibrium => (1, m),
            SymmetryClass::RelativeEquilibrium => (1, m_points - 2),
        }
    }

    /// Shape of the spatial-mode array: the space axis loses the zeroth
    /// and Nyquist coefficients, the time axis stays physical.
    pub fn smode_shape(&self, n_points: usize, m_points: usize) -> (usize, usize) {
        (n_points, m_points - 2)
    }

    /// Recover the field discretization (N, M) from an array shape and its
    /// basis. `time_points` supplies N for the equilibrium classes in the
    /// mode basis, where the stored array has a single row.
    pub fn discretization_from_shape(
        &self,
        basis: Basis,
        rows: usize,
        cols: usize,
        time_points: Option<usize>,
    ) -> Result<(usize, usize), OrbitError> {
        let shape_err = OrbitError::ShapeMismatch { basis, rows, cols };
        let (n, m) = match basis {
            Basis::Field => (rows, cols),
            Basis::SpatialModes => (rows, cols + 2),
            Basis::Modes => match self {
                SymmetryClass::Full | SymmetryClass::Relative => (rows + 1, cols + 2),
                SymmetryClass::Antisymmetric | SymmetryClass::ShiftReflection => {
                    (rows + 1, 2 * cols + 2)
                }
                SymmetryClass::Equilibrium => {
                    if rows != 1 {
                        return Err(shape_err);
                    }
                    (time_points.unwrap_or(1), 2 * cols + 2)
                }
                SymmetryClass::RelativeEquilibrium => {
                    if rows != 1 {
                        return Err(shape_err);
                    }
                    (time_points.unwrap_or(1), cols + 2)
                }
            },
        };
        // Even discretizations only; the degenerate time axis of the
        // equilibrium classes may hold any positive number of rows.
        if m < 4 || m % 2 != 0 {
            return Err(shape_err);
        }
        if self.is_equilibrium() {
            if n == 0 {
                return Err(shape_err);
            }
        } else if n < 2 || n % 2 != 0 {
            return Err(shape_err);
        }
        Ok((n, m))
    }

    /// Expected array shape for a basis, the inverse of
    /// [`discretization_from_shape`](Self::discretization_from_shape).
    pub fn shape_for(&self, basis: Basis, n_points: usize, m_points: usize) -> (usize, usize) {
        match basis {
            Basis::Field => (n_points, m_points),
            Basis::SpatialModes => self.smode_shape(n_points, m_points),
            Basis::Modes => self.mode_shape(n_points, m_points),
        }
    }
}
