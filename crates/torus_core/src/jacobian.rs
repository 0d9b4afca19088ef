//! Matrix-free Jacobian actions, dense Jacobian assembly and diagonal
//! preconditioning.
//!
//! The forward product maps a correction (state plus parameter deltas)
//! into equation space; the adjoint maps an equation-space vector back
//! into a correction whose parameter slots are inner products with the
//! analytic parameter partials. The asymmetry is structural. Dense
//! assembly reproduces the same operator from Kronecker products of the
//! transform matrices and diagonal frequency operators, for direct and
//! least-squares solves on small problems.

use nalgebra::{DMatrix, DVector};

use crate::error::OrbitError;
use crate::frequencies::{
    elementwise_dtn, elementwise_dxn, frequency_vector, so2_coefficients, so2_generator,
    wave_vector, SpatialLayout,
};
use crate::orbit::{flatten_row_major, Orbit};
use crate::types::{Basis, Parameters};

/// Which side of the (rectangular) Jacobian a dense preconditioner is
/// meant to multiply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionerSide {
    Left,
    Right,
}

/// Power-law exponents applied to the unconstrained period parameters so
/// that their corrections do not dominate the step length. The shift, when
/// present, is left unscaled.
#[derive(Debug, Clone, Copy)]
pub struct PreconditioningExponents {
    pub t: i32,
    pub l: i32,
}

impl Default for PreconditioningExponents {
    fn default() -> Self {
        Self { t: 1, l: 4 }
    }
}

impl Orbit {
    fn require_modes(&self, op: &'static str, other: &Orbit) -> Result<(), OrbitError> {
        for operand in [self, other] {
            if operand.basis != Basis::Modes {
                return Err(OrbitError::BasisMismatch {
                    op,
                    expected: Basis::Modes,
                    found: operand.basis,
                });
            }
        }
        Ok(())
    }

    /// Analytic `dF/dT`: `(-1/T) * (u_t [+ comoving term])`.
    fn parameter_partial_t(&self) -> Result<DMatrix<f64>, OrbitError> {
        let mut partial = self.dt_modes(1)?;
        if self.class.has_shift() {
            partial += self.comoving_modes()?;
        }
        Ok(partial * (-1.0 / self.parameters.t))
    }

    /// Analytic `dF/dL`: every spatial derivative scales with an inverse
    /// power of L, so the partial is a weighted sum of the equation terms.
    fn parameter_partial_l(&self, self_field: &Orbit) -> Result<DMatrix<f64>, OrbitError> {
        let l = self.parameters.l;
        let mut nonlinear = self_field.nonlinear_modes(self_field)?;
        if self.class.has_shift() {
            nonlinear += self.comoving_modes()?;
        }
        Ok(self.dx_modes(2)? * (-2.0 / l)
            + self.dx_modes(4)? * (-4.0 / l)
            + nonlinear * (-1.0 / l))
    }

    /// Analytic `dF/dS`: `(-1/T) * u_x`.
    fn parameter_partial_s(&self) -> Result<DMatrix<f64>, OrbitError> {
        Ok(self.dx_modes(1)? * (-1.0 / self.parameters.t))
    }

    /// Forward Jacobian-vector product.
    ///
    /// `other` is a correction orbit: its state is the direction, its
    /// parameters are the parameter deltas. Computes
    /// `v_t + v_xx + v_xxxx + 2*nonlinear(u, v)` [+ comoving] plus one
    /// analytic term per unconstrained parameter. Both operands must be in
    /// the mode basis.
    pub fn matvec(&self, other: &Orbit) -> Result<Orbit, OrbitError> {
        self.require_modes("matvec", other)?;
        let self_field = self.transform(Basis::Field)?;
        // The direction inherits this orbit's parameters; the factor of
        // two comes from differentiating the quadratic term.
        let v = self.like_with_state(other.state.clone(), Basis::Modes);
        let v_field = v.transform(Basis::Field)?;
        let mut out =
            v.dx_modes(2)? + v.dx_modes(4)? + self_field.nonlinear_modes(&v_field)? * 2.0;
        out += v.dt_modes(1)?;
        if self.class.has_shift() {
            out += v.comoving_modes()?;
        }
        if !self.constraints.t {
            out += self.parameter_partial_t()? * other.parameters.t;
        }
        if !self.constraints.l {
            out += self.parameter_partial_l(&self_field)? * other.parameters.l;
        }
        if !self.constraints.s && self.class.has_shift() {
            out += self.parameter_partial_s()? * other.parameters.s;
        }
        Ok(self.like_with_state(out, Basis::Modes))
    }

    /// Adjoint Jacobian-vector product.
    ///
    /// Computes `-v_t + v_xx + v_xxxx - u .* v_x` [+ adjoint comoving
    /// term]; the parameter slots of the result are the projections of `v`
    /// onto the analytic parameter partials.
    pub fn rmatvec(&self, other: &Orbit) -> Result<Orbit, OrbitError> {
        self.require_modes("rmatvec", other)?;
        let self_field = self.transform(Basis::Field)?;
        let v = self.like_with_state(other.state.clone(), Basis::Modes);
        let mut out = v.dx_modes(2)? + v.dx_modes(4)? + self_field.rnonlinear_modes(&v)?;
        out -= v.dt_modes(1)?;
        if self.class.has_shift() {
            out -= v.comoving_modes()?;
        }
        let parameters = self.rmatvec_parameters(&self_field, &v)?;
        let mut result = self.like_with_state(out, Basis::Modes);
        result.parameters = parameters;
        Ok(result)
    }

    fn rmatvec_parameters(
        &self,
        self_field: &Orbit,
        v: &Orbit,
    ) -> Result<Parameters, OrbitError> {
        let t = if self.constraints.t {
            0.0
        } else {
            self.parameter_partial_t()?.dot(&v.state)
        };
        let l = if self.constraints.l {
            0.0
        } else {
            self.parameter_partial_l(self_field)?.dot(&v.state)
        };
        let s = if self.constraints.s || !self.class.has_shift() {
            0.0
        } else {
            self.parameter_partial_s()?.dot(&v.state)
        };
        Ok(Parameters::new(t, l, s))
    }

    /// Dense temporal derivative operator acting on row-major flattened
    /// modes: a Kronecker product of the SO(2) generator block with the
    /// identity over mode columns.
    fn dt_matrix(&self, order: u32) -> DMatrix<f64> {
        let (rows, cols) = self.mode_shape();
        let n = (rows - 1) / 2;
        let w = frequency_vector(self.parameters.t, self.n_points, order);
        let so2 = so2_generator(order);
        let mut block = DMatrix::zeros(rows, rows);
        for a in 0..2 {
            for b in 0..2 {
                for k in 0..n {
                    block[(1 + a * n + k, 1 + b * n + k)] = so2[(a, b)] * w[k];
                }
            }
        }
        block.kronecker(&DMatrix::identity(cols, cols))
    }

    /// Dense spatial derivative operator in the mode-basis layout.
    /// Selection-rule classes keep a single (diagonal) coefficient half;
    /// even orders only for those classes.
    fn dx_matrix_modes(&self, order: u32) -> DMatrix<f64> {
        let (rows, _) = self.mode_shape();
        let q = wave_vector(self.parameters.l, self.m_points, order);
        let m = q.len();
        let block = if self.class.has_spatial_selection() {
            let (_, c) = so2_coefficients(order);
            DMatrix::from_fn(m, m, |i, j| if i == j { c * q[i] } else { 0.0 })
        } else {
            let so2 = so2_generator(order);
            let mut b = DMatrix::zeros(2 * m, 2 * m);
            for row_half in 0..2 {
                for col_half in 0..2 {
                    for k in 0..m {
                        b[(row_half * m + k, col_half * m + k)] =
                            so2[(row_half, col_half)] * q[k];
                    }
                }
            }
            b
        };
        DMatrix::identity(rows, rows).kronecker(&block)
    }

    /// Dense spatial derivative operator in the spatial-mode layout,
    /// where both coefficient halves exist for every class.
    fn dx_matrix_smodes(&self, order: u32) -> DMatrix<f64> {
        let q = wave_vector(self.parameters.l, self.m_points, order);
        let m = q.len();
        let so2 = so2_generator(order);
        let mut block = DMatrix::zeros(2 * m, 2 * m);
        for row_half in 0..2 {
            for col_half in 0..2 {
                for k in 0..m {
                    block[(row_half * m + k, col_half * m + k)] = so2[(row_half, col_half)] * q[k];
                }
            }
        }
        DMatrix::identity(self.n_points, self.n_points).kronecker(&block)
    }

    fn jacobian_linear_part(&self) -> DMatrix<f64> {
        let mut lin = self.dx_matrix_modes(2) + self.dx_matrix_modes(4);
        if !self.class.is_equilibrium() {
            lin += self.dt_matrix(1);
        }
        if self.class.has_shift() {
            lin += self.dx_matrix_modes(1) * (-self.parameters.s / self.parameters.t);
        }
        lin
    }

    /// Chain rule through the pseudospectral quadratic term:
    /// `d_x . F . diag(u) . F^{-1}` with the spatial derivative taken on
    /// spatial modes for the selection-rule classes.
    fn jacobian_nonlinear_part(&self) -> Result<DMatrix<f64>, OrbitError> {
        let field = self.transform(Basis::Field)?;
        let diag = DMatrix::from_diagonal(&flatten_row_major(&field.state));
        let left = if self.class.has_spatial_selection() {
            self.time_transform_matrix() * self.dx_matrix_smodes(1)
        } else {
            self.dx_matrix_modes(1) * self.time_transform_matrix()
        };
        Ok(left * self.space_transform_matrix() * diag * self.inv_spacetime_transform_matrix())
    }

    /// Dense Jacobian of the governing equation at the current state,
    /// with one appended column per unconstrained parameter. Used when a
    /// direct or least-squares solve replaces the iterative one.
    pub fn jacobian(&self) -> Result<DMatrix<f64>, OrbitError> {
        if self.basis != Basis::Modes {
            return Err(OrbitError::BasisMismatch {
                op: "jacobian",
                expected: Basis::Modes,
                found: self.basis,
            });
        }
        let square = self.jacobian_linear_part() + self.jacobian_nonlinear_part()?;
        let self_field = self.transform(Basis::Field)?;

        let mut columns: Vec<DVector<f64>> = Vec::new();
        if !self.constraints.t {
            columns.push(flatten_row_major(&self.parameter_partial_t()?));
        }
        if !self.constraints.l {
            columns.push(flatten_row_major(&self.parameter_partial_l(&self_field)?));
        }
        if !self.constraints.s && self.class.has_shift() {
            columns.push(flatten_row_major(&self.parameter_partial_s()?));
        }

        let rows = square.nrows();
        let mut jac = DMatrix::zeros(rows, rows + columns.len());
        jac.view_mut((0, 0), (rows, rows)).copy_from(&square);
        for (offset, column) in columns.iter().enumerate() {
            jac.column_mut(rows + offset).copy_from(column);
        }
        Ok(jac)
    }

    /// Elementwise inverse of the absolute linear operator diagonal,
    /// `1 / (|omega| + |q^2| + q^4)`, shaped to this orbit's mode layout.
    fn preconditioning_multipliers(&self) -> DMatrix<f64> {
        let (rows, cols) = self.mode_shape();
        let layout = if self.class.has_spatial_selection() {
            SpatialLayout::Half
        } else {
            SpatialLayout::Paired
        };
        let dx2 = elementwise_dxn(self.parameters.l, self.m_points, rows, layout, 2);
        let dx4 = elementwise_dxn(self.parameters.l, self.m_points, rows, layout, 4);
        let mut denominator = dx2.abs() + &*dx4;
        if !self.class.is_equilibrium() {
            let dtn = elementwise_dtn(self.parameters.t, self.n_points, cols, 1);
            denominator += dtn.abs();
        }
        denominator.map(|v| 1.0 / v)
    }

    /// Apply the diagonal preconditioner (an approximation of
    /// `diag(J)^{-1}`) to this correction, with the frequency operators
    /// evaluated at `reference`'s parameters. Unconstrained T and L
    /// corrections are rescaled by the configured power laws; S is not.
    pub fn precondition(
        &self,
        reference: &Orbit,
        exponents: PreconditioningExponents,
    ) -> Result<Orbit, OrbitError> {
        if self.basis != Basis::Modes {
            return Err(OrbitError::BasisMismatch {
                op: "precondition",
                expected: Basis::Modes,
                found: self.basis,
            });
        }
        let multipliers = reference.preconditioning_multipliers();
        let mut out = self.like_with_state(self.state.component_mul(&multipliers), Basis::Modes);
        if !self.constraints.t {
            out.parameters.t = self.parameters.t * reference.parameters.t.powi(-exponents.t);
        }
        if !self.constraints.l {
            out.parameters.l = self.parameters.l * reference.parameters.l.powi(-exponents.l);
        }
        Ok(out)
    }

    /// Preconditioner for normal-equation solves: since the diagonal
    /// approximates `(J^T J)^{-1}` rather than `J^{-1}`, it is applied
    /// twice.
    pub fn precondition_normal_equations(
        &self,
        reference: &Orbit,
        exponents: PreconditioningExponents,
    ) -> Result<Orbit, OrbitError> {
        self.precondition(reference, exponents)?
            .precondition(reference, exponents)
    }

    /// Dense diagonal preconditioner for least-squares paths. The right
    /// side carries the extra parameter entries of the rectangular
    /// Jacobian.
    pub fn preconditioner_matrix(
        &self,
        side: PreconditionerSide,
        exponents: PreconditioningExponents,
    ) -> DMatrix<f64> {
        let multipliers = flatten_row_major(&self.preconditioning_multipliers());
        let mut entries: Vec<f64> = multipliers.iter().copied().collect();
        if side == PreconditionerSide::Right {
            if !self.constraints.t {
                entries.push(self.parameters.t.powi(-exponents.t));
            }
            if !self.constraints.l {
                entries.push(self.parameters.l.powi(-exponents.l));
            }
            if !self.constraints.s && self.class.has_shift() {
                entries.push(1.0);
            }
        }
        DMatrix::from_diagonal(&DVector::from_vec(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::SymmetryClass;
    use crate::types::Constraints;
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

    fn correction(class: SymmetryClass, n: usize, m: usize, seed: u64) -> Orbit {
        let mut rng = StdRng::seed_from_u64(seed);
        let (rows, cols) = class.mode_shape(n, m);
        let state = DMatrix::from_fn(rows, cols, |_, _| StandardNormal.sample(&mut rng));
        Orbit::new(
            class,
            state,
            Basis::Modes,
            Parameters::new(0.7, -0.4, if class.has_shift() { 0.9 } else { 0.0 }),
        )
        .unwrap()
    }

    #[test]
    fn test_adjoint_identity() {
        for class in [
            SymmetryClass::Full,
            SymmetryClass::Relative,
            SymmetryClass::Antisymmetric,
            SymmetryClass::ShiftReflection,
        ] {
            let orbit = random_orbit(class, 16, 16, 61);
            let u = correction(class, 16, 16, 67);
            let v = correction(class, 16, 16, 71);

            let forward = orbit.matvec(&u).unwrap().dot(&v);
            let adjoint = orbit.rmatvec(&v).unwrap();
            let mut backward = u.dot(&adjoint);
            if !orbit.constraints().t {
                backward += u.parameters().t * adjoint.parameters().t;
            }
            if !orbit.constraints().l {
                backward += u.parameters().l * adjoint.parameters().l;
            }
            if !orbit.constraints().s {
                backward += u.parameters().s * adjoint.parameters().s;
            }
            assert!(
                (forward - backward).abs() < 1e-8 * forward.abs().max(1.0),
                "{:?}: {} vs {}",
                class,
                forward,
                backward
            );
        }
    }

    #[test]
    fn test_matvec_matches_central_difference() {
        for class in [
            SymmetryClass::Full,
            SymmetryClass::Relative,
            SymmetryClass::Antisymmetric,
            SymmetryClass::ShiftReflection,
        ] {
            let orbit = random_orbit(class, 16, 16, 73)
                .with_constraints(Constraints::new(true, true, true));
            let direction = {
                let mut d = correction(class, 16, 16, 79);
                d.parameters = Parameters::new(0.0, 0.0, 0.0);
                d.with_constraints(Constraints::new(true, true, true))
            };
            let eps = 1e-4;
            let plus = orbit.increment(&direction, eps).unwrap().equation_map().unwrap();
            let minus = orbit.increment(&direction, -eps).unwrap().equation_map().unwrap();
            let fd = (plus.state() - minus.state()) / (2.0 * eps);
            let analytic = orbit.matvec(&direction).unwrap();
            assert!(
                (&fd - analytic.state()).norm() < 1e-7 * analytic.norm().max(1.0),
                "{:?}",
                class
            );
        }
    }

    #[test]
    fn test_dense_jacobian_matches_matvec() {
        for class in [
            SymmetryClass::Full,
            SymmetryClass::Antisymmetric,
            SymmetryClass::Relative,
        ] {
            let orbit = random_orbit(class, 8, 8, 83);
            let u = correction(class, 8, 8, 89);
            let jac = orbit.jacobian().unwrap();

            let mut augmented: Vec<f64> = flatten_row_major(u.state()).iter().copied().collect();
            if !orbit.constraints().t {
                augmented.push(u.parameters().t);
            }
            if !orbit.constraints().l {
                augmented.push(u.parameters().l);
            }
            if !orbit.constraints().s && class.has_shift() {
                augmented.push(u.parameters().s);
            }
            let product = &jac * DVector::from_vec(augmented);
            let matvec = flatten_row_major(orbit.matvec(&u).unwrap().state());
            assert!(
                (&product - &matvec).norm() < 1e-8 * matvec.norm().max(1.0),
                "{:?}",
                class
            );
        }
    }

    #[test]
    fn test_dense_jacobian_matches_matvec_equilibrium() {
        let orbit = random_orbit(SymmetryClass::Equilibrium, 1, 16, 97)
            .with_time_points(8)
            .unwrap();
        let u = correction(SymmetryClass::Equilibrium, 1, 16, 101)
            .with_time_points(8)
            .unwrap();
        let jac = orbit.jacobian().unwrap();
        let mut augmented: Vec<f64> = flatten_row_major(u.state()).iter().copied().collect();
        augmented.push(u.parameters().l);
        let product = &jac * DVector::from_vec(augmented);
        let matvec = flatten_row_major(orbit.matvec(&u).unwrap().state());
        assert!((&product - &matvec).norm() < 1e-8 * matvec.norm().max(1.0));
    }

    #[test]
    fn test_preconditioner_rescales_parameters() {
        let orbit = random_orbit(SymmetryClass::Full, 16, 16, 103);
        let mut u = correction(SymmetryClass::Full, 16, 16, 107);
        u.parameters = Parameters::new(1.0, 1.0, 0.0);
        let preconditioned = u.precondition(&orbit, PreconditioningExponents::default()).unwrap();
        assert!((preconditioned.parameters().t - 1.0 / 44.0).abs() < 1e-12);
        assert!((preconditioned.parameters().l - 33.0f64.powi(-4)).abs() < 1e-12);
        let multipliers = orbit.preconditioning_multipliers();
        assert!(multipliers.iter().all(|v| v.is_finite() && *v > 0.0));
        let expected = u.state().component_mul(&multipliers);
        assert!((preconditioned.state() - &expected).norm() < 1e-14);
    }
}
