//! The orbit state model.
//!
//! An [`Orbit`] couples a 2-D state array (time rows by space columns)
//! with the basis tag describing its representation, the continuous
//! parameter tuple, the optimization constraint flags and the symmetry
//! class. Every operator in this crate is value-semantic: it consumes
//! `&self` and returns a fresh instance, so a converged state can never be
//! corrupted by a failed step.

use nalgebra::{DMatrix, DVector};

use crate::error::OrbitError;
use crate::frequencies::{frequency_vector, wave_vector};
use crate::symmetry::SymmetryClass;
use crate::types::{Axis, Basis, Constraints, Frame, OrbitData, Parameters};

/// Flatten a state array in row-major order, matching the ordering the
/// Kronecker-structured operator matrices act on.
pub(crate) fn flatten_row_major(a: &DMatrix<f64>) -> DVector<f64> {
    let mut out = DVector::zeros(a.len());
    let mut idx = 0;
    for i in 0..a.nrows() {
        for j in 0..a.ncols() {
            out[idx] = a[(i, j)];
            idx += 1;
        }
    }
    out
}

/// A spectral/physical representation of one doubly-periodic spacetime
/// solution candidate.
#[derive(Debug, Clone)]
pub struct Orbit {
    pub(crate) class: SymmetryClass,
    pub(crate) state: DMatrix<f64>,
    pub(crate) basis: Basis,
    pub(crate) parameters: Parameters,
    pub(crate) constraints: Constraints,
    pub(crate) frame: Frame,
    pub(crate) n_points: usize,
    pub(crate) m_points: usize,
}

impl Orbit {
    /// Construct an orbit from an array, its basis and the parameter
    /// tuple. The field discretization is derived from the array shape;
    /// an inconsistent shape/basis pair is rejected.
    ///
    /// Classes without a shift degree of freedom have `s` forced to zero
    /// and constrained; the Equilibrium class also forces `t = 0`.
    pub fn new(
        class: SymmetryClass,
        state: DMatrix<f64>,
        basis: Basis,
        parameters: Parameters,
    ) -> Result<Orbit, OrbitError> {
        let (n_points, m_points) =
            class.discretization_from_shape(basis, state.nrows(), state.ncols(), None)?;
        let mut parameters = parameters;
        let mut constraints = Constraints::new(false, false, !class.has_shift());
        if !class.has_shift() {
            parameters.s = 0.0;
        }
        if class == SymmetryClass::Equilibrium {
            parameters.t = 0.0;
            constraints.t = true;
        }
        Ok(Orbit {
            class,
            state,
            basis,
            parameters,
            constraints,
            frame: Frame::Comoving,
            n_points,
            m_points,
        })
    }

    /// Replace the constraint flags. Structural constraints are kept in
    /// force: `s` stays constrained for classes without a shift, `t` for
    /// the Equilibrium class.
    pub fn with_constraints(mut self, constraints: Constraints) -> Orbit {
        self.constraints = constraints;
        if !self.class.has_shift() {
            self.constraints.s = true;
        }
        if self.class == SymmetryClass::Equilibrium {
            self.constraints.t = true;
        }
        self
    }

    /// Set the reference frame; ignored for classes without a shift.
    pub fn with_frame(mut self, frame: Frame) -> Orbit {
        if self.class.has_shift() {
            self.frame = frame;
        }
        self
    }

    /// Override the (degenerate) time discretization of an equilibrium
    /// class constructed in the mode basis, where the array itself only
    /// stores a single row.
    pub fn with_time_points(mut self, n_points: usize) -> Result<Orbit, OrbitError> {
        if self.class.is_equilibrium() {
            if n_points == 0 {
                return Err(OrbitError::OddSize { size: n_points });
            }
            self.n_points = n_points;
            Ok(self)
        } else if n_points == self.n_points {
            Ok(self)
        } else {
            Err(OrbitError::ShapeMismatch {
                basis: self.basis,
                rows: self.state.nrows(),
                cols: self.state.ncols(),
            })
        }
    }

    /// Internal: a new orbit sharing all metadata but holding a different
    /// state array/basis. The discretization is unchanged.
    pub(crate) fn like_with_state(&self, state: DMatrix<f64>, basis: Basis) -> Orbit {
        Orbit {
            class: self.class,
            state,
            basis,
            parameters: self.parameters,
            constraints: self.constraints,
            frame: self.frame,
            n_points: self.n_points,
            m_points: self.m_points,
        }
    }

    pub fn class(&self) -> SymmetryClass {
        self.class
    }

    pub fn state(&self) -> &DMatrix<f64> {
        &self.state
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn parameters(&self) -> Parameters {
        self.parameters
    }

    pub fn constraints(&self) -> Constraints {
        self.constraints
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Field-basis discretization (N, M).
    pub fn discretization(&self) -> (usize, usize) {
        (self.n_points, self.m_points)
    }

    /// Shape of the mode-basis array for this orbit's discretization.
    pub fn mode_shape(&self) -> (usize, usize) {
        self.class.mode_shape(self.n_points, self.m_points)
    }

    /// L2 norm of the state array.
    pub fn norm(&self) -> f64 {
        self.state.norm()
    }

    /// L2 inner product of two orbit states.
    pub fn dot(&self, other: &Orbit) -> f64 {
        self.state.dot(&other.state)
    }

    /// Elementwise product of two states in the same basis.
    pub fn statemul(&self, other: &Orbit) -> Orbit {
        self.like_with_state(self.state.component_mul(&other.state), self.basis)
    }

    /// Parameter-aware additive update: `self + step_size * other`.
    ///
    /// Constrained parameters are left untouched regardless of the value
    /// the correction carries; the constraint flags are authoritative, a
    /// zero delta on a free parameter is simply added as zero.
    pub fn increment(&self, other: &Orbit, step_size: f64) -> Result<Orbit, OrbitError> {
        if self.basis != other.basis {
            return Err(OrbitError::BasisMismatch {
                op: "increment",
                expected: self.basis,
                found: other.basis,
            });
        }
        let parameters = Parameters {
            t: if self.constraints.t {
                self.parameters.t
            } else {
                self.parameters.t + step_size * other.parameters.t
            },
            l: if self.constraints.l {
                self.parameters.l
            } else {
                self.parameters.l + step_size * other.parameters.l
            },
            s: if self.constraints.s {
                self.parameters.s
            } else {
                self.parameters.s + step_size * other.parameters.s
            },
        };
        let mut out = self.like_with_state(&self.state + &other.state * step_size, self.basis);
        out.parameters = parameters;
        Ok(out)
    }

    /// Flattened state plus one slot per unconstrained parameter (T, L, S
    /// order), the representation generic flat-vector solvers operate on.
    /// Meaningful in the mode basis.
    pub fn state_vector(&self) -> DVector<f64> {
        let flat = flatten_row_major(&self.state);
        let mut out = DVector::zeros(flat.len() + self.constraints.free_count());
        out.rows_mut(0, flat.len()).copy_from(&flat);
        let mut idx = flat.len();
        for (constrained, value) in [
            (self.constraints.t, self.parameters.t),
            (self.constraints.l, self.parameters.l),
            (self.constraints.s, self.parameters.s),
        ] {
            if !constrained {
                out[idx] = value;
                idx += 1;
            }
        }
        out
    }

    /// Rebuild an orbit from the flat representation produced by
    /// [`state_vector`](Self::state_vector), using `self` as the template
    /// for class, discretization, constraints and the constrained
    /// parameter values.
    pub fn from_state_vector(&self, vector: &DVector<f64>) -> Result<Orbit, OrbitError> {
        let (rows, cols) = self.mode_shape();
        let mode_size = rows * cols;
        let expected = mode_size + self.constraints.free_count();
        if vector.len() != expected {
            return Err(OrbitError::VectorLength {
                expected,
                found: vector.len(),
            });
        }
        let state = DMatrix::from_row_slice(rows, cols, &vector.as_slice()[..mode_size]);
        let mut idx = mode_size;
        let mut take = |constrained: bool, current: f64| {
            if constrained {
                current
            } else {
                let v = vector[idx];
                idx += 1;
                v
            }
        };
        let parameters = Parameters {
            t: take(self.constraints.t, self.parameters.t),
            l: take(self.constraints.l, self.parameters.l),
            s: take(self.constraints.s, self.parameters.s),
        };
        let mut out = self.like_with_state(state, Basis::Modes);
        out.parameters = parameters;
        Ok(out)
    }

    /// Rescale the physical field so its maximum absolute value equals
    /// `magnitude`, returning the result in the original basis.
    pub fn rescale(&self, magnitude: f64) -> Result<Orbit, OrbitError> {
        let field = self.transform(Basis::Field)?;
        let max = field.state.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        if max == 0.0 {
            return Ok(self.clone());
        }
        let rescaled = field.like_with_state(&field.state * (magnitude / max), Basis::Field);
        rescaled.transform(self.basis)
    }

    /// Spatial reflection of the velocity field, `u(x, t) -> -u(-x, t)`.
    /// The shift parameter changes sign with the reflection.
    pub fn reflection(&self) -> Result<Orbit, OrbitError> {
        let field = self.transform(Basis::Field)?;
        let m = self.m_points;
        let reflected = DMatrix::from_fn(self.n_points, m, |i, j| {
            -field.state[(i, if j == 0 { 0 } else { m - j })]
        });
        let mut out = field.like_with_state(reflected, Basis::Field);
        out.parameters.s = -self.parameters.s;
        out.transform(self.basis)
    }

    /// Spatial reflection composed with a half-period temporal shift; the
    /// two operations act on different axes and commute.
    pub fn shift_reflection(&self) -> Result<Orbit, OrbitError> {
        let field = self.transform(Basis::Field)?;
        let (n, m) = (self.n_points, self.m_points);
        let shifted = DMatrix::from_fn(n, m, |i, j| {
            let row = (i + n - n / 2) % n;
            -field.state[(row, if j == 0 { 0 } else { m - j })]
        });
        field.like_with_state(shifted, Basis::Field).transform(self.basis)
    }

    /// Translate the field along one axis. Translations are modulo the
    /// corresponding period; amounts that do not coincide with collocation
    /// points are resolved spectrally and remain exact.
    pub fn rotate(&self, distance: f64, axis: Axis) -> Result<Orbit, OrbitError> {
        match axis {
            Axis::Time => {
                if self.class.is_equilibrium() {
                    // No temporal content to rotate.
                    return Ok(self.clone());
                }
                let modes = self.transform(Basis::Modes)?;
                let (rows, cols) = modes.state.shape();
                let n = (rows - 1) / 2;
                let w = frequency_vector(self.parameters.t, self.n_points, 1);
                let rotated = DMatrix::from_fn(rows, cols, |i, j| {
                    if i == 0 {
                        modes.state[(0, j)]
                    } else {
                        let k = if i <= n { i } else { i - n };
                        let theta = distance * w[k - 1];
                        let re = modes.state[(k, j)];
                        let im = modes.state[(n + k, j)];
                        if i <= n {
                            theta.cos() * re + theta.sin() * im
                        } else {
                            -theta.sin() * re + theta.cos() * im
                        }
                    }
                });
                modes.like_with_state(rotated, Basis::Modes).transform(self.basis)
            }
            Axis::Space => {
                let smodes = self.transform(Basis::SpatialModes)?;
                let (rows, cols) = smodes.state.shape();
                let m = cols / 2;
                let q = wave_vector(self.parameters.l, self.m_points, 1);
                let rotated = DMatrix::from_fn(rows, cols, |i, j| {
                    let k = if j < m { j } else { j - m };
                    let theta = distance * q[k];
                    let re = smodes.state[(i, k)];
                    let im = smodes.state[(i, m + k)];
                    if j < m {
                        theta.cos() * re + theta.sin() * im
                    } else {
                        -theta.sin() * re + theta.cos() * im
                    }
                });
                smodes
                    .like_with_state(rotated, Basis::SpatialModes)
                    .transform(self.basis)
            }
        }
    }

    /// Cyclically roll the field by a whole number of grid points.
    pub fn roll(&self, shift: i64, axis: Axis) -> Result<Orbit, OrbitError> {
        let field = self.transform(Basis::Field)?;
        let (n, m) = (self.n_points as i64, self.m_points as i64);
        let rolled = DMatrix::from_fn(self.n_points, self.m_points, |i, j| {
            let (si, sj) = match axis {
                Axis::Time => ((i as i64 - shift).rem_euclid(n), j as i64),
                Axis::Space => (i as i64, (j as i64 - shift).rem_euclid(m)),
            };
            field.state[(si as usize, sj as usize)]
        });
        field.like_with_state(rolled, Basis::Field).transform(self.basis)
    }

    /// Export the serialization contract: physical field, discretization,
    /// parameters and class tag.
    pub fn to_data(&self) -> Result<OrbitData, OrbitError> {
        let field = self.transform(Basis::Field)?;
        Ok(OrbitData {
            class: self.class,
            field: flatten_row_major(&field.state).iter().copied().collect(),
            discretization: (self.n_points, self.m_points),
            parameters: self.parameters,
        })
    }

    /// Reconstruct an orbit from its serialization contract.
    pub fn from_data(data: &OrbitData) -> Result<Orbit, OrbitError> {
        let (n, m) = data.discretization;
        if data.field.len() != n * m {
            return Err(OrbitError::ShapeMismatch {
                basis: Basis::Field,
                rows: n,
                cols: m,
            });
        }
        let state = DMatrix::from_row_slice(n, m, &data.field);
        Orbit::new(data.class, state, Basis::Field, data.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_orbit(seed_value: f64) -> Orbit {
        let state = DMatrix::from_fn(15, 14, |i, j| ((i * 14 + j) as f64 * seed_value).sin());
        Orbit::new(
            SymmetryClass::Full,
            state,
            Basis::Modes,
            Parameters::new(40.0, 30.0, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_inconsistent_shape_is_rejected() {
        let state = DMatrix::<f64>::zeros(16, 14);
        // 16 mode rows imply N = 17, which is odd.
        assert!(Orbit::new(
            SymmetryClass::Full,
            state,
            Basis::Modes,
            Parameters::new(40.0, 30.0, 0.0)
        )
        .is_err());
    }

    #[test]
    fn test_shiftless_classes_pin_s() {
        let orbit = full_orbit(0.01);
        assert_eq!(orbit.parameters().s, 0.0);
        assert!(orbit.constraints().s);
        let orbit = orbit.with_constraints(Constraints::new(true, false, false));
        assert!(orbit.constraints().s, "s stays structurally constrained");
    }

    #[test]
    fn test_increment_respects_constraints() {
        let orbit = full_orbit(0.01).with_constraints(Constraints::new(true, false, true));
        let step = full_orbit(0.02);
        let mut correction = step.clone();
        correction.parameters = Parameters::new(5.0, 7.0, 9.0);
        let incremented = orbit.increment(&correction, 0.5).unwrap();
        assert_eq!(incremented.parameters().t, 40.0);
        assert!((incremented.parameters().l - 33.5).abs() < 1e-14);
        assert_eq!(incremented.parameters().s, 0.0);
        let expected = &orbit.state + &correction.state * 0.5;
        assert!((incremented.state() - &expected).norm() < 1e-14);
    }

    #[test]
    fn test_state_vector_round_trip() {
        let orbit = full_orbit(0.03).with_constraints(Constraints::new(false, false, true));
        let vector = orbit.state_vector();
        assert_eq!(vector.len(), 15 * 14 + 2);
        let back = orbit.from_state_vector(&vector).unwrap();
        assert!((back.state() - orbit.state()).norm() < 1e-14);
        assert_eq!(back.parameters(), orbit.parameters());

        let short = DVector::zeros(10);
        assert!(orbit.from_state_vector(&short).is_err());
    }

    #[test]
    fn test_reflection_is_an_involution() {
        let orbit = full_orbit(0.05);
        let twice = orbit.reflection().unwrap().reflection().unwrap();
        assert!((twice.state() - orbit.state()).norm() < 1e-10);
    }

    #[test]
    fn test_rotation_by_full_period_is_identity() {
        let orbit = full_orbit(0.07);
        let rotated = orbit.rotate(orbit.parameters().l, Axis::Space).unwrap();
        assert!((rotated.state() - orbit.state()).norm() < 1e-8);
        let rotated = orbit.rotate(orbit.parameters().t, Axis::Time).unwrap();
        assert!((rotated.state() - orbit.state()).norm() < 1e-8);
    }

    #[test]
    fn test_serialization_contract_round_trip() {
        let orbit = full_orbit(0.09);
        let data = orbit.to_data().unwrap();
        assert_eq!(data.discretization, (16, 16));
        let back = Orbit::from_data(&data).unwrap();
        let field = orbit.transform(Basis::Field).unwrap();
        assert!((back.state() - field.state()).norm() < 1e-12);
    }
}
