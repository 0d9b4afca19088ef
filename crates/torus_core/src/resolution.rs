//! Resolution changes, fundamental-domain folding and post-convergence
//! reclassification.
//!
//! Pad/truncate operate on the mode basis: each coefficient half gets its
//! zero block inserted or removed symmetrically, then the whole array is
//! rescaled by `sqrt(new/old)` to preserve the orthonormal-transform
//! energy invariant. The equilibrium classes tile or slice their
//! degenerate time axis instead, since it carries no frequency content.

use nalgebra::DMatrix;

use crate::error::OrbitError;
use crate::frequencies::wave_vector;
use crate::orbit::Orbit;
use crate::symmetry::SymmetryClass;
use crate::types::{Axis, Basis, Frame, IntegrityStatus};

/// Field-norm threshold below which a state counts as numerically zero,
/// and a time-derivative norm below which it counts as time-independent.
const DEGENERACY_THRESHOLD: f64 = 1e-5;

impl Orbit {
    /// Internal: a new orbit with a different state and discretization.
    fn rebuilt(
        &self,
        state: DMatrix<f64>,
        basis: Basis,
        n_points: usize,
        m_points: usize,
    ) -> Orbit {
        let mut out = self.like_with_state(state, basis);
        out.n_points = n_points;
        out.m_points = m_points;
        out
    }

    fn check_resize(&self, size: usize, axis: Axis, growing: bool) -> Result<(), OrbitError> {
        if size % 2 != 0 {
            return Err(OrbitError::OddSize { size });
        }
        if self.class.has_shift() && self.frame == Frame::Physical {
            return Err(OrbitError::FrameMismatch {
                op: if growing { "pad" } else { "truncate" },
                expected: Frame::Comoving,
            });
        }
        let current = match axis {
            Axis::Time => self.n_points,
            Axis::Space => self.m_points,
        };
        if (growing && size <= current) || (!growing && size >= current) {
            return Err(OrbitError::SizeOrder {
                current,
                requested: size,
            });
        }
        Ok(())
    }

    /// Increase the discretization along one axis by zero-padding the
    /// middle of each coefficient half, returning the result in the
    /// original basis. The target must be even; shift classes must be in
    /// the comoving frame.
    pub fn pad(&self, size: usize, axis: Axis) -> Result<Orbit, OrbitError> {
        self.check_resize(size, axis, true)?;
        match (axis, self.class.is_equilibrium()) {
            (Axis::Time, true) => {
                let smodes = self.transform(Basis::SpatialModes)?;
                // Copying, not zero-padding: the time axis of an
                // equilibrium carries the same values at every point.
                let source_row = match self.class {
                    SymmetryClass::RelativeEquilibrium => smodes.state.nrows() - 1,
                    _ => 0,
                };
                let tiled = DMatrix::from_fn(size, smodes.state.ncols(), |_, j| {
                    smodes.state[(source_row, j)]
                });
                self.rebuilt(tiled, Basis::SpatialModes, size, self.m_points)
                    .transform(self.basis)
            }
            (Axis::Time, false) => {
                let modes = self.transform(Basis::Modes)?;
                let (rows, cols) = modes.state.shape();
                let n = (rows - 1) / 2;
                let pad_rows = (size - self.n_points) / 2;
                let scale = (size as f64 / self.n_points as f64).sqrt();
                let padded = DMatrix::from_fn(rows + 2 * pad_rows, cols, |i, j| {
                    if i <= n {
                        scale * modes.state[(i, j)]
                    } else if i <= n + pad_rows {
                        0.0
                    } else if i <= 2 * n + pad_rows {
                        scale * modes.state[(i - pad_rows, j)]
                    } else {
                        0.0
                    }
                });
                self.rebuilt(padded, Basis::Modes, size, self.m_points)
                    .transform(self.basis)
            }
            (Axis::Space, true) => {
                // Spatial modes: the symmetric half of an equilibrium is
                // structurally zero, the antisymmetric half is padded.
                let smodes = self.transform(Basis::SpatialModes)?;
                let (rows, cols) = smodes.state.shape();
                let m = cols / 2;
                let pad_cols = (size - self.m_points) / 2;
                let new_m = m + pad_cols;
                let scale = (size as f64 / self.m_points as f64).sqrt();
                let padded = DMatrix::from_fn(rows, 2 * new_m, |i, j| {
                    if self.class == SymmetryClass::Equilibrium && j < new_m {
                        0.0
                    } else if j < new_m {
                        if j < m {
                            scale * smodes.state[(i, j)]
                        } else {
                            0.0
                        }
                    } else if j - new_m < m {
                        scale * smodes.state[(i, m + (j - new_m))]
                    } else {
                        0.0
                    }
                });
                self.rebuilt(padded, Basis::SpatialModes, self.n_points, size)
                    .transform(self.basis)
            }
            (Axis::Space, false) => {
                let modes = self.transform(Basis::Modes)?;
                let (rows, cols) = modes.state.shape();
                let pad_cols = (size - self.m_points) / 2;
                let scale = (size as f64 / self.m_points as f64).sqrt();
                let padded = if self.class.has_spatial_selection() {
                    // Only one coefficient half is stored.
                    let m = cols;
                    DMatrix::from_fn(rows, m + pad_cols, |i, j| {
                        if j < m {
                            scale * modes.state[(i, j)]
                        } else {
                            0.0
                        }
                    })
                } else {
                    let m = cols / 2;
                    DMatrix::from_fn(rows, cols + 2 * pad_cols, |i, j| {
                        if j < m {
                            scale * modes.state[(i, j)]
                        } else if j < m + pad_cols {
                            0.0
                        } else if j < 2 * m + pad_cols {
                            scale * modes.state[(i, j - pad_cols)]
                        } else {
                            0.0
                        }
                    })
                };
                self.rebuilt(padded, Basis::Modes, self.n_points, size)
                    .transform(self.basis)
            }
        }
    }

    /// Decrease the discretization along one axis by removing the highest
    /// frequencies of each coefficient half, returning the result in the
    /// original basis.
    pub fn truncate(&self, size: usize, axis: Axis) -> Result<Orbit, OrbitError> {
        self.check_resize(size, axis, false)?;
        match (axis, self.class.is_equilibrium()) {
            (Axis::Time, true) => {
                let smodes = self.transform(Basis::SpatialModes)?;
                let offset = smodes.state.nrows() - size;
                let sliced = DMatrix::from_fn(size, smodes.state.ncols(), |i, j| {
                    smodes.state[(offset + i, j)]
                });
                self.rebuilt(sliced, Basis::SpatialModes, size, self.m_points)
                    .transform(self.basis)
            }
            (Axis::Time, false) => {
                let modes = self.transform(Basis::Modes)?;
                let (rows, cols) = modes.state.shape();
                let n = (rows - 1) / 2;
                let new_n = size / 2 - 1;
                let scale = (size as f64 / self.n_points as f64).sqrt();
                let truncated = DMatrix::from_fn(size - 1, cols, |i, j| {
                    if i <= new_n {
                        scale * modes.state[(i, j)]
                    } else {
                        scale * modes.state[(n + (i - new_n), j)]
                    }
                });
                self.rebuilt(truncated, Basis::Modes, size, self.m_points)
                    .transform(self.basis)
            }
            (Axis::Space, true) => match self.class {
                SymmetryClass::Equilibrium => {
                    let modes = self.transform(Basis::Modes)?;
                    let new_m = size / 2 - 1;
                    let scale = (size as f64 / self.m_points as f64).sqrt();
                    let truncated =
                        DMatrix::from_fn(1, new_m, |_, j| scale * modes.state[(0, j)]);
                    self.rebuilt(truncated, Basis::Modes, self.n_points, size)
                        .transform(self.basis)
                }
                _ => {
                    let smodes = self.transform(Basis::SpatialModes)?;
                    let (rows, cols) = smodes.state.shape();
                    let m = cols / 2;
                    let new_m = size / 2 - 1;
                    let scale = (size as f64 / self.m_points as f64).sqrt();
                    let truncated = DMatrix::from_fn(rows, 2 * new_m, |i, j| {
                        if j < new_m {
                            scale * smodes.state[(i, j)]
                        } else {
                            scale * smodes.state[(i, m + (j - new_m))]
                        }
                    });
                    self.rebuilt(truncated, Basis::SpatialModes, self.n_points, size)
                        .transform(self.basis)
                }
            },
            (Axis::Space, false) => {
                let modes = self.transform(Basis::Modes)?;
                let (rows, cols) = modes.state.shape();
                let new_m = size / 2 - 1;
                let scale = (size as f64 / self.m_points as f64).sqrt();
                let truncated = if self.class.has_spatial_selection() {
                    DMatrix::from_fn(rows, new_m, |i, j| scale * modes.state[(i, j)])
                } else {
                    let m = cols / 2;
                    DMatrix::from_fn(rows, 2 * new_m, |i, j| {
                        if j < new_m {
                            scale * modes.state[(i, j)]
                        } else {
                            scale * modes.state[(i, m + (j - new_m))]
                        }
                    })
                };
                self.rebuilt(truncated, Basis::Modes, self.n_points, size)
                    .transform(self.basis)
            }
        }
    }

    /// Change the field discretization to the target shape, padding or
    /// truncating each axis as needed.
    pub fn reshape(&self, n_points: usize, m_points: usize) -> Result<Orbit, OrbitError> {
        let mut out = self.clone();
        if n_points != out.n_points {
            out = if n_points > out.n_points {
                out.pad(n_points, Axis::Time)?
            } else {
                out.truncate(n_points, Axis::Time)?
            };
        }
        if m_points != out.m_points {
            out = if m_points > out.m_points {
                out.pad(m_points, Axis::Space)?
            } else {
                out.truncate(m_points, Axis::Space)?
            };
        }
        Ok(out)
    }

    /// Rotate between the comoving and physical reference frames by a
    /// time-dependent spatial-mode rotation. A no-op for classes without a
    /// shift degree of freedom.
    pub fn change_reference_frame(&self, to: Frame) -> Result<Orbit, OrbitError> {
        if !self.class.has_shift() || self.frame == to {
            return Ok(self.clone());
        }
        // The shift is stored as the translation from comoving to
        // physical frame.
        let shift = match to {
            Frame::Comoving => -self.parameters.s,
            Frame::Physical => self.parameters.s,
        };
        let smodes = self.transform(Basis::SpatialModes)?;
        let (rows, cols) = smodes.state.shape();
        let m = cols / 2;
        let q = wave_vector(self.parameters.l, self.m_points, 1);
        let t = self.parameters.t;
        let rotated = DMatrix::from_fn(rows, cols, |i, j| {
            let time = if rows == 1 {
                0.0
            } else {
                t * (rows - 1 - i) as f64 / (rows - 1) as f64
            };
            let k = if j < m { j } else { j - m };
            let theta = (shift / t) * time * q[k];
            let re = smodes.state[(i, k)];
            let im = smodes.state[(i, m + k)];
            if j < m {
                theta.cos() * re + theta.sin() * im
            } else {
                -theta.sin() * re + theta.cos() * im
            }
        });
        let mut out = self.rebuilt(rotated, Basis::SpatialModes, self.n_points, self.m_points);
        out.frame = to;
        out.transform(self.basis)
    }

    /// Fold the field into its minimal non-redundant domain: the half
    /// space for the antisymmetric classes, the half period for
    /// shift-reflection, the physical frame for the shift classes.
    /// Returns a field-basis orbit.
    pub fn to_fundamental_domain(&self) -> Result<Orbit, OrbitError> {
        match self.class {
            SymmetryClass::Full => Ok(self.clone()),
            SymmetryClass::Antisymmetric | SymmetryClass::Equilibrium => {
                let field = self.transform(Basis::Field)?;
                let half = self.m_points / 2;
                let folded =
                    DMatrix::from_fn(self.n_points, half, |i, j| field.state()[(i, j)]);
                let mut out = self.rebuilt(folded, Basis::Field, self.n_points, half);
                out.parameters.l = self.parameters.l / 2.0;
                Ok(out)
            }
            SymmetryClass::ShiftReflection => {
                let field = self.transform(Basis::Field)?;
                let half = self.n_points / 2;
                let folded = DMatrix::from_fn(half, self.m_points, |i, j| {
                    field.state()[(self.n_points - half + i, j)]
                });
                let mut out = self.rebuilt(folded, Basis::Field, half, self.m_points);
                out.parameters.t = self.parameters.t / 2.0;
                Ok(out)
            }
            SymmetryClass::Relative | SymmetryClass::RelativeEquilibrium => {
                self.change_reference_frame(Frame::Physical)
            }
        }
    }

    /// Reconstruct the full field from a fundamental domain by reflecting
    /// and concatenating (discrete symmetry classes) or by returning to
    /// the comoving frame (shift classes).
    pub fn from_fundamental_domain(&self) -> Result<Orbit, OrbitError> {
        match self.class {
            SymmetryClass::Full => Ok(self.clone()),
            SymmetryClass::Antisymmetric | SymmetryClass::Equilibrium => {
                let field = self.transform(Basis::Field)?;
                let reflected = field.reflection()?;
                let (rows, cols) = field.state().shape();
                let unfolded = DMatrix::from_fn(rows, 2 * cols, |i, j| {
                    if j < cols {
                        reflected.state()[(i, j)]
                    } else {
                        field.state()[(i, j - cols)]
                    }
                });
                let mut out = self.rebuilt(unfolded, Basis::Field, rows, 2 * cols);
                out.parameters.l = self.parameters.l * 2.0;
                Ok(out)
            }
            SymmetryClass::ShiftReflection => {
                let field = self.transform(Basis::Field)?;
                let reflected = field.reflection()?;
                let (rows, cols) = field.state().shape();
                let unfolded = DMatrix::from_fn(2 * rows, cols, |i, j| {
                    if i < rows {
                        reflected.state()[(i, j)]
                    } else {
                        field.state()[(i - rows, j)]
                    }
                });
                let mut out = self.rebuilt(unfolded, Basis::Field, 2 * rows, cols);
                out.parameters.t = self.parameters.t * 2.0;
                Ok(out)
            }
            SymmetryClass::Relative | SymmetryClass::RelativeEquilibrium => {
                self.change_reference_frame(Frame::Comoving)
            }
        }
    }

    /// Post-convergence classification: detect numerically degenerate
    /// solutions and re-type them into the matching simpler class. Shift
    /// classes first resolve the sign ambiguity of S by keeping whichever
    /// sign yields the lower residual. The status code is reported to the
    /// caller; degeneracy is data here, never an error.
    pub fn verify_integrity(&self) -> Result<(Orbit, IntegrityStatus), OrbitError> {
        match self.class {
            SymmetryClass::Full | SymmetryClass::Antisymmetric | SymmetryClass::ShiftReflection => {
                let field = self.transform(Basis::Field)?;
                if field.norm() < DEGENERACY_THRESHOLD {
                    let zeros = Orbit::new(
                        SymmetryClass::Equilibrium,
                        DMatrix::zeros(self.n_points, self.m_points),
                        Basis::Field,
                        self.parameters,
                    )?;
                    return Ok((zeros.transform(self.basis)?, IntegrityStatus::ZeroField));
                }
                let time_independent = self.parameters.t == 0.0
                    || field.dt(1)?.transform(Basis::Field)?.norm() < DEGENERACY_THRESHOLD;
                if time_independent {
                    let equilibrium = Orbit::new(
                        SymmetryClass::Equilibrium,
                        field.state().clone(),
                        Basis::Field,
                        self.parameters,
                    )?;
                    return Ok((
                        equilibrium.transform(self.basis)?,
                        IntegrityStatus::TimeIndependent,
                    ));
                }
                Ok((self.clone(), IntegrityStatus::Converged))
            }
            SymmetryClass::Relative => {
                let chosen = self.resolve_shift_sign()?;
                let field = chosen.transform(Basis::Field)?;
                if field.norm() < DEGENERACY_THRESHOLD {
                    let zeros = Orbit::new(
                        SymmetryClass::RelativeEquilibrium,
                        DMatrix::zeros(self.n_points, self.m_points),
                        Basis::Field,
                        chosen.parameters,
                    )?;
                    return Ok((zeros.transform(self.basis)?, IntegrityStatus::ZeroField));
                }
                let time_independent = chosen.parameters.t == 0.0
                    || field.dt(1)?.transform(Basis::Field)?.norm() < DEGENERACY_THRESHOLD;
                if time_independent {
                    let modes = chosen.transform(Basis::Modes)?;
                    let first_row =
                        DMatrix::from_fn(1, modes.state().ncols(), |_, j| modes.state()[(0, j)]);
                    let drifter = Orbit::new(
                        SymmetryClass::RelativeEquilibrium,
                        first_row,
                        Basis::Modes,
                        chosen.parameters,
                    )?
                    .with_time_points(self.n_points)?;
                    return Ok((
                        drifter.transform(self.basis)?,
                        IntegrityStatus::TimeIndependent,
                    ));
                }
                Ok((chosen, IntegrityStatus::Converged))
            }
            SymmetryClass::Equilibrium => {
                let field = self.transform(Basis::Field)?;
                if field.norm() < DEGENERACY_THRESHOLD {
                    let zeros = Orbit::new(
                        SymmetryClass::Equilibrium,
                        DMatrix::zeros(self.n_points, self.m_points),
                        Basis::Field,
                        self.parameters,
                    )?;
                    return Ok((zeros.transform(self.basis)?, IntegrityStatus::ZeroField));
                }
                Ok((self.clone(), IntegrityStatus::Converged))
            }
            SymmetryClass::RelativeEquilibrium => {
                let chosen = self.resolve_shift_sign()?;
                let field = chosen.transform(Basis::Field)?;
                if field.norm() < DEGENERACY_THRESHOLD {
                    let zeros = Orbit::new(
                        SymmetryClass::RelativeEquilibrium,
                        DMatrix::zeros(self.n_points, self.m_points),
                        Basis::Field,
                        chosen.parameters,
                    )?;
                    return Ok((zeros.transform(self.basis)?, IntegrityStatus::ZeroField));
                }
                Ok((chosen, IntegrityStatus::Converged))
            }
        }
    }

    /// Keep whichever sign of the spatial shift yields the lower
    /// residual; imported data does not always record the drift
    /// direction consistently.
    fn resolve_shift_sign(&self) -> Result<Orbit, OrbitError> {
        let mut negated = self.clone();
        negated.parameters.s = -self.parameters.s;
        if self.residual(true)? > negated.residual(true)? {
            Ok(negated)
        } else {
            Ok(self.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameters;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, StandardNormal};

    fn random_orbit(class: SymmetryClass, n: usize, m: usize, seed: u64) -> Orbit {
        let mut rng = StdRng::seed_from_u64(seed);
        let (rows, cols) = class.mode_shape(n, m);
        let state = DMatrix::from_fn(rows, cols, |_, _| StandardNormal.sample(&mut rng));
        Orbit::new(
            class,
            state,
            Basis::Modes,
            Parameters::new(44.0, 33.0, if class.has_shift() { 2.5 } else { 0.0 }),
        )
        .unwrap()
    }

    #[test]
    fn test_pad_truncate_round_trip() {
        for class in [
            SymmetryClass::Full,
            SymmetryClass::Antisymmetric,
            SymmetryClass::ShiftReflection,
            SymmetryClass::Relative,
        ] {
            let orbit = random_orbit(class, 16, 16, 111);
            for axis in [Axis::Time, Axis::Space] {
                let padded = orbit.pad(32, axis).unwrap();
                // Zero-padding plus the sqrt(new/old) rescale.
                assert!(
                    (padded.norm() - 2f64.sqrt() * orbit.norm()).abs() < 1e-10,
                    "{:?} {:?}",
                    class,
                    axis
                );
                let back = padded.truncate(16, axis).unwrap();
                assert!(
                    (back.state() - orbit.state()).norm() < 1e-10,
                    "{:?} {:?}",
                    class,
                    axis
                );
            }
        }
    }

    #[test]
    fn test_pad_rejects_odd_and_non_growing_sizes() {
        let orbit = random_orbit(SymmetryClass::Full, 16, 16, 113);
        assert!(matches!(
            orbit.pad(17, Axis::Time),
            Err(OrbitError::OddSize { size: 17 })
        ));
        assert!(matches!(
            orbit.pad(16, Axis::Time),
            Err(OrbitError::SizeOrder { .. })
        ));
        assert!(matches!(
            orbit.truncate(16, Axis::Space),
            Err(OrbitError::SizeOrder { .. })
        ));
    }

    #[test]
    fn test_pad_requires_comoving_frame() {
        let orbit = random_orbit(SymmetryClass::Relative, 16, 16, 127).with_frame(Frame::Physical);
        assert!(matches!(
            orbit.pad(32, Axis::Space),
            Err(OrbitError::FrameMismatch { .. })
        ));
    }

    #[test]
    fn test_reshape_changes_both_axes() {
        let orbit = random_orbit(SymmetryClass::Full, 16, 16, 131);
        let reshaped = orbit.reshape(32, 8).unwrap();
        assert_eq!(reshaped.discretization(), (32, 8));
    }

    #[test]
    fn test_shift_reflection_fundamental_domain_round_trip() {
        let orbit = random_orbit(SymmetryClass::ShiftReflection, 16, 16, 137)
            .transform(Basis::Field)
            .unwrap();
        let rebuilt = orbit
            .to_fundamental_domain()
            .unwrap()
            .from_fundamental_domain()
            .unwrap();
        assert!((rebuilt.state() - orbit.state()).norm() < 1e-10);
        assert!((rebuilt.parameters().t - orbit.parameters().t).abs() < 1e-12);
    }

    #[test]
    fn test_antisymmetric_fundamental_domain_reconstructs_up_to_half_cell() {
        let orbit = random_orbit(SymmetryClass::Antisymmetric, 16, 16, 139)
            .transform(Basis::Field)
            .unwrap();
        let rebuilt = orbit
            .to_fundamental_domain()
            .unwrap()
            .from_fundamental_domain()
            .unwrap();
        let rolled = orbit.roll(8, Axis::Space).unwrap();
        assert!((rebuilt.state() - rolled.state()).norm() < 1e-10);
    }

    #[test]
    fn test_reference_frame_round_trip() {
        // Round trip in the spatial-mode basis: the frame rotation is
        // exactly invertible there, while the mode basis cannot hold the
        // temporal Nyquist content a rotation creates.
        let orbit = random_orbit(SymmetryClass::Relative, 16, 16, 149)
            .transform(Basis::SpatialModes)
            .unwrap();
        let physical = orbit.change_reference_frame(Frame::Physical).unwrap();
        assert_eq!(physical.frame(), Frame::Physical);
        let back = physical.change_reference_frame(Frame::Comoving).unwrap();
        assert!((back.state() - orbit.state()).norm() < 1e-10);
    }

    #[test]
    fn test_verify_integrity_keeps_generic_orbit() {
        let orbit = random_orbit(SymmetryClass::Full, 16, 16, 151);
        let (same, status) = orbit.verify_integrity().unwrap();
        assert_eq!(status, IntegrityStatus::Converged);
        assert!((same.state() - orbit.state()).norm() < 1e-12);
    }

    #[test]
    fn test_verify_integrity_reclassifies_zero_field() {
        let orbit = Orbit::new(
            SymmetryClass::Full,
            DMatrix::zeros(16, 16),
            Basis::Field,
            Parameters::new(40.0, 30.0, 0.0),
        )
        .unwrap();
        let (reclassified, status) = orbit.verify_integrity().unwrap();
        assert_eq!(status, IntegrityStatus::ZeroField);
        assert_eq!(reclassified.class(), SymmetryClass::Equilibrium);
        assert!(reclassified.norm() < DEGENERACY_THRESHOLD);
    }

    #[test]
    fn test_verify_integrity_detects_time_independence() {
        // Modes with only the zeroth temporal harmonic populated.
        let mut rng = StdRng::seed_from_u64(157);
        let state = DMatrix::from_fn(15, 14, |i, _| {
            if i == 0 {
                StandardNormal.sample(&mut rng)
            } else {
                0.0
            }
        });
        let orbit = Orbit::new(
            SymmetryClass::Full,
            state,
            Basis::Modes,
            Parameters::new(40.0, 30.0, 0.0),
        )
        .unwrap();
        let (reclassified, status) = orbit.verify_integrity().unwrap();
        assert_eq!(status, IntegrityStatus::TimeIndependent);
        assert_eq!(reclassified.class(), SymmetryClass::Equilibrium);
    }

    #[test]
    fn test_verify_integrity_resolves_shift_sign() {
        let orbit = random_orbit(SymmetryClass::Relative, 16, 16, 163);
        let mut negated = orbit.clone();
        negated.parameters.s = -orbit.parameters().s;
        let better = if orbit.residual(true).unwrap() <= negated.residual(true).unwrap() {
            orbit.parameters().s
        } else {
            negated.parameters().s
        };
        let (chosen, status) = orbit.verify_integrity().unwrap();
        assert_eq!(status, IntegrityStatus::Converged);
        assert_eq!(chosen.parameters().s, better);
    }
}
