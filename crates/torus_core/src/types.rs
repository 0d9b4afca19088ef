//! Core value types shared by the orbit state model and its operators.

use serde::{Deserialize, Serialize};

use crate::symmetry::SymmetryClass;

/// Which representation the state array currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Basis {
    /// Physical velocity field u(x, t).
    Field,
    /// Space axis transformed, time axis physical.
    SpatialModes,
    /// Both axes transformed (spatiotemporal spectral coefficients).
    Modes,
}

/// Reference frame of a state with a spatial drift degree of freedom.
///
/// Only meaningful for the shift-carrying symmetry classes; the physical
/// frame exists for display purposes and most operators reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    Comoving,
    Physical,
}

/// Axis selector for resolution changes and rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Time,
    Space,
}

/// Continuous orbit parameters: time period, space period, spatial shift.
///
/// The tuple always carries all three values so that conversions between
/// symmetry classes and the serialization format stay uniform; classes
/// without a shift degree of freedom hold `s` at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub t: f64,
    pub l: f64,
    pub s: f64,
}

impl Parameters {
    pub fn new(t: f64, l: f64, s: f64) -> Self {
        Self { t, l, s }
    }
}

/// Flags marking which parameters are held fixed during optimization.
///
/// `true` means constrained (fixed). Unconstrained parameters acquire a
/// column in the Jacobian and a scalar slot in the state-vector
/// representation. Constraint status is always decided by these flags,
/// never inferred from a parameter value happening to be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub t: bool,
    pub l: bool,
    pub s: bool,
}

impl Constraints {
    pub fn new(t: bool, l: bool, s: bool) -> Self {
        Self { t, l, s }
    }

    /// Number of unconstrained parameters.
    pub fn free_count(&self) -> usize {
        [self.t, self.l, self.s].iter().filter(|c| !**c).count()
    }
}

/// Outcome of the post-convergence classification of `verify_integrity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityStatus {
    /// The orbit is a genuine spatiotemporal solution; returned unchanged.
    Converged,
    /// The field has no temporal variation; re-typed as an equilibrium class.
    TimeIndependent,
    /// The field is uniformly close to zero; re-typed as the zero solution.
    ZeroField,
}

/// Serialization contract consumed by external persistence collaborators.
///
/// Carries exactly the information needed to reconstruct the orbit: the
/// physical-field array (row-major), the discretization, the parameter
/// tuple and the symmetry-class tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitData {
    pub class: SymmetryClass,
    pub field: Vec<f64>,
    pub discretization: (usize, usize),
    pub parameters: Parameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbit_data_serde_round_trip() {
        let data = OrbitData {
            class: SymmetryClass::Relative,
            field: vec![0.5, -0.5, 1.0, -1.0],
            discretization: (2, 2),
            parameters: Parameters::new(40.0, 30.0, 2.5),
        };
        let json = serde_json::to_string(&data).unwrap();
        let back: OrbitData = serde_json::from_str(&json).unwrap();
        assert_eq!(back.class, data.class);
        assert_eq!(back.discretization, data.discretization);
        assert_eq!(back.parameters, data.parameters);
        assert_eq!(back.field, data.field);
    }
}
