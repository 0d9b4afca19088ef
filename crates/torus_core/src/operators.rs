//! Elementwise spectral derivatives, the pseudospectral nonlinear term
//! and the governing-equation map.
//!
//! Derivatives multiply the mode array by cached frequency-operator
//! arrays; odd orders exchange the real and imaginary coefficient blocks
//! (multiplication by an odd power of `i`). Classes with a spatial
//! selection rule evaluate odd spatial orders on spatial modes, where both
//! coefficient halves exist.

use nalgebra::DMatrix;

use crate::error::OrbitError;
use crate::frequencies::{elementwise_dtn, elementwise_dxn, SpatialLayout};
use crate::orbit::Orbit;
use crate::transforms::time_forward;
use crate::types::{Basis, Frame};

/// Exchange the real/imaginary spatial halves of an array after an
/// odd-order multiplication.
pub(crate) fn swap_space_halves(a: &DMatrix<f64>) -> DMatrix<f64> {
    let h = a.ncols() / 2;
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| {
        if j < h {
            a[(i, j + h)]
        } else {
            a[(i, j - h)]
        }
    })
}

/// Exchange the real/imaginary temporal blocks; the zeroth-harmonic row
/// stays in place.
pub(crate) fn swap_time_halves(a: &DMatrix<f64>) -> DMatrix<f64> {
    let n = (a.nrows() - 1) / 2;
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| {
        if i == 0 {
            a[(0, j)]
        } else if i <= n {
            a[(i + n, j)]
        } else {
            a[(i - n, j)]
        }
    })
}

impl Orbit {
    /// Time derivative of the given order as a mode-basis array.
    ///
    /// The equilibrium classes have no temporal frequency content and
    /// return zeros; shift classes reject the physical frame, where the
    /// time derivative of a drifting field is not well defined.
    pub(crate) fn dt_modes(&self, order: u32) -> Result<DMatrix<f64>, OrbitError> {
        if self.class.has_shift() && self.frame == Frame::Physical {
            return Err(OrbitError::FrameMismatch {
                op: "dt",
                expected: Frame::Comoving,
            });
        }
        let (rows, cols) = self.mode_shape();
        if self.class.is_equilibrium() {
            return Ok(DMatrix::zeros(rows, cols));
        }
        let modes = self.transform(Basis::Modes)?;
        let dtn = elementwise_dtn(self.parameters.t, self.n_points, cols, order);
        let product = modes.state.component_mul(&*dtn);
        Ok(if order % 2 == 1 {
            swap_time_halves(&product)
        } else {
            product
        })
    }

    /// Time derivative returned as an orbit in the original basis.
    pub fn dt(&self, order: u32) -> Result<Orbit, OrbitError> {
        let modes = self.dt_modes(order)?;
        self.like_with_state(modes, Basis::Modes).transform(self.basis)
    }

    /// Odd-order spatial derivative on the spatial-mode array, where both
    /// coefficient halves are present.
    fn dx_smodes(&self, order: u32) -> Result<DMatrix<f64>, OrbitError> {
        let smodes = self.transform(Basis::SpatialModes)?;
        let dxn = elementwise_dxn(
            self.parameters.l,
            self.m_points,
            self.n_points,
            SpatialLayout::Paired,
            order,
        );
        Ok(swap_space_halves(&smodes.state.component_mul(&*dxn)))
    }

    /// Spatial derivative of the given order as a mode-basis array.
    pub(crate) fn dx_modes(&self, order: u32) -> Result<DMatrix<f64>, OrbitError> {
        if self.class.has_spatial_selection() && order % 2 == 1 {
            // The stored half cannot represent an odd derivative;
            // differentiate spatial modes and project back.
            let smodes = self.dx_smodes(order)?;
            return Ok(time_forward(self.class, &smodes));
        }
        let modes = self.transform(Basis::Modes)?;
        let layout = if self.class.has_spatial_selection() {
            SpatialLayout::Half
        } else {
            SpatialLayout::Paired
        };
        let dxn = elementwise_dxn(
            self.parameters.l,
            self.m_points,
            modes.state.nrows(),
            layout,
            order,
        );
        let product = modes.state.component_mul(&*dxn);
        Ok(if order % 2 == 1 {
            swap_space_halves(&product)
        } else {
            product
        })
    }

    /// Spatial derivative of the given order.
    ///
    /// Classes with a spatial selection rule return odd orders in the
    /// spatial-mode basis (their mode basis cannot hold them); everything
    /// else comes back in the original basis.
    pub fn dx(&self, order: u32) -> Result<Orbit, OrbitError> {
        if self.class.has_spatial_selection() && order % 2 == 1 {
            let smodes = self.dx_smodes(order)?;
            Ok(self.like_with_state(smodes, Basis::SpatialModes))
        } else {
            let modes = self.dx_modes(order)?;
            self.like_with_state(modes, Basis::Modes).transform(self.basis)
        }
    }

    /// Pseudospectral quadratic term `0.5 * d/dx(self .* other)` as a
    /// mode-basis array. Both operands must be physical fields; the
    /// elementwise product replaces the spectral convolution sum.
    pub(crate) fn nonlinear_modes(&self, other: &Orbit) -> Result<DMatrix<f64>, OrbitError> {
        for operand in [self, other] {
            if operand.basis != Basis::Field {
                return Err(OrbitError::BasisMismatch {
                    op: "nonlinear",
                    expected: Basis::Field,
                    found: operand.basis,
                });
            }
        }
        Ok(self.statemul(other).dx_modes(1)? * 0.5)
    }

    /// Pseudospectral quadratic term as a mode-basis orbit.
    pub fn nonlinear(&self, other: &Orbit) -> Result<Orbit, OrbitError> {
        let modes = self.nonlinear_modes(other)?;
        Ok(self.like_with_state(modes, Basis::Modes))
    }

    /// Adjoint counterpart of the quadratic term, `-self .* d/dx(other)`,
    /// as a mode-basis array. `self` must be a physical field.
    pub(crate) fn rnonlinear_modes(&self, other: &Orbit) -> Result<DMatrix<f64>, OrbitError> {
        if self.basis != Basis::Field {
            return Err(OrbitError::BasisMismatch {
                op: "rnonlinear",
                expected: Basis::Field,
                found: self.basis,
            });
        }
        let other_dx = other.dx(1)?.transform(Basis::Field)?;
        let product = self.statemul(&other_dx).transform(Basis::Modes)?;
        Ok(product.state * -1.0)
    }

    /// Adjoint counterpart of the quadratic term as a mode-basis orbit.
    pub fn rnonlinear(&self, other: &Orbit) -> Result<Orbit, OrbitError> {
        let modes = self.rnonlinear_modes(other)?;
        Ok(self.like_with_state(modes, Basis::Modes))
    }

    /// Comoving-frame drift term `(-S/T) * u_x` as a mode-basis array.
    pub(crate) fn comoving_modes(&self) -> Result<DMatrix<f64>, OrbitError> {
        let factor = -self.parameters.s / self.parameters.t;
        Ok(self.dx_modes(1)? * factor)
    }

    /// The governing equation evaluated at the current state:
    /// `u_t + u_xx + u_xxxx + 0.5*(u^2)_x`, plus the comoving drift term
    /// for the shift classes. Mode basis only.
    pub fn equation_map(&self) -> Result<Orbit, OrbitError> {
        if self.basis != Basis::Modes {
            return Err(OrbitError::BasisMismatch {
                op: "equation_map",
                expected: Basis::Modes,
                found: self.basis,
            });
        }
        let field = self.transform(Basis::Field)?;
        let mut modes = self.dx_modes(2)? + self.dx_modes(4)? + field.nonlinear_modes(&field)?;
        modes += self.dt_modes(1)?;
        if self.class.has_shift() {
            modes += self.comoving_modes()?;
        }
        Ok(self.like_with_state(modes, Basis::Modes))
    }

    /// The scalar cost `0.5*||equation_map||^2`, or `0.5*||state||^2` when
    /// the equation is not to be applied.
    pub fn residual(&self, apply_mapping: bool) -> Result<f64, OrbitError> {
        if apply_mapping {
            let mapping = self.transform(Basis::Modes)?.equation_map()?;
            Ok(0.5 * mapping.state.iter().map(|v| v * v).sum::<f64>())
        } else {
            Ok(0.5 * self.state.iter().map(|v| v * v).sum::<f64>())
        }
    }
}
