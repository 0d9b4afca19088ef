//! Basis transform engine.
//!
//! Orthonormal real-input Fourier transforms along the time and space
//! axes, specialized per symmetry class by their selection rules, plus the
//! dense transform-matrix constructors used exclusively by Jacobian
//! assembly. The fast-path array transforms and the matrices agree on the
//! realizable subspace of each class.
//!
//! Layout conventions: spatial-mode columns are `[real half | imaginary
//! half]` with the zeroth and Nyquist coefficients structurally absent;
//! mode rows are `[zeroth harmonic, real harmonics 1..=n, imaginary
//! harmonics 1..=n]` with the temporal Nyquist absent. All transforms are
//! norm-preserving except the degenerate equilibrium time selection.

use std::f64::consts::SQRT_2;
use std::sync::{Arc, LazyLock, Mutex};

use nalgebra::DMatrix;
use num_complex::Complex;
use num_traits::Zero;
use rustfft::{Fft, FftPlanner};

use crate::error::OrbitError;
use crate::orbit::Orbit;
use crate::symmetry::SymmetryClass;
use crate::types::Basis;

static PLANNER: LazyLock<Mutex<FftPlanner<f64>>> = LazyLock::new(|| Mutex::new(FftPlanner::new()));

fn plan_forward(len: usize) -> Arc<dyn Fft<f64>> {
    PLANNER.lock().unwrap().plan_fft_forward(len)
}

fn plan_inverse(len: usize) -> Arc<dyn Fft<f64>> {
    PLANNER.lock().unwrap().plan_fft_inverse(len)
}

/// Orthonormal real FFT down each column; returns the non-redundant half
/// spectrum with `nrows/2 + 1` rows.
pub(crate) fn rfft_cols(state: &DMatrix<f64>) -> DMatrix<Complex<f64>> {
    let n = state.nrows();
    let fft = plan_forward(n);
    let scale = 1.0 / (n as f64).sqrt();
    let mut out = DMatrix::<Complex<f64>>::zeros(n / 2 + 1, state.ncols());
    let mut buf = vec![Complex::zero(); n];
    for j in 0..state.ncols() {
        for i in 0..n {
            buf[i] = Complex::new(state[(i, j)], 0.0);
        }
        fft.process(&mut buf);
        for k in 0..=n / 2 {
            out[(k, j)] = buf[k] * scale;
        }
    }
    out
}

/// Inverse of [`rfft_cols`]: reconstructs the Hermitian-symmetric full
/// spectrum and applies the orthonormal inverse FFT down each column.
pub(crate) fn irfft_cols(spec: &DMatrix<Complex<f64>>, n: usize) -> DMatrix<f64> {
    let fft = plan_inverse(n);
    let scale = 1.0 / (n as f64).sqrt();
    let mut out = DMatrix::<f64>::zeros(n, spec.ncols());
    let mut buf = vec![Complex::zero(); n];
    for j in 0..spec.ncols() {
        buf[0] = spec[(0, j)];
        for k in 1..n / 2 {
            buf[k] = spec[(k, j)];
            buf[n - k] = spec[(k, j)].conj();
        }
        buf[n / 2] = spec[(n / 2, j)];
        fft.process(&mut buf);
        for i in 0..n {
            out[(i, j)] = buf[i].re * scale;
        }
    }
    out
}

/// Orthonormal real FFT along each row.
pub(crate) fn rfft_rows(state: &DMatrix<f64>) -> DMatrix<Complex<f64>> {
    let m = state.ncols();
    let fft = plan_forward(m);
    let scale = 1.0 / (m as f64).sqrt();
    let mut out = DMatrix::<Complex<f64>>::zeros(state.nrows(), m / 2 + 1);
    let mut buf = vec![Complex::zero(); m];
    for i in 0..state.nrows() {
        for j in 0..m {
            buf[j] = Complex::new(state[(i, j)], 0.0);
        }
        fft.process(&mut buf);
        for k in 0..=m / 2 {
            out[(i, k)] = buf[k] * scale;
        }
    }
    out
}

/// Inverse of [`rfft_rows`].
pub(crate) fn irfft_rows(spec: &DMatrix<Complex<f64>>, m: usize) -> DMatrix<f64> {
    let fft = plan_inverse(m);
    let scale = 1.0 / (m as f64).sqrt();
    let mut out = DMatrix::<f64>::zeros(spec.nrows(), m);
    let mut buf = vec![Complex::zero(); m];
    for i in 0..spec.nrows() {
        buf[0] = spec[(i, 0)];
        for k in 1..m / 2 {
            buf[k] = spec[(i, k)];
            buf[m - k] = spec[(i, k)].conj();
        }
        buf[m / 2] = spec[(i, m / 2)];
        fft.process(&mut buf);
        for j in 0..m {
            out[(i, j)] = buf[j].re * scale;
        }
    }
    out
}

/// Physical field to spatial modes: drop the zeroth (mean flow) and
/// Nyquist coefficients, store `[sqrt(2)*Re | sqrt(2)*Im]`.
pub(crate) fn space_forward(field: &DMatrix<f64>) -> DMatrix<f64> {
    let m_points = field.ncols();
    let m = m_points / 2 - 1;
    let spec = rfft_rows(field);
    DMatrix::from_fn(field.nrows(), 2 * m, |i, j| {
        if j < m {
            SQRT_2 * spec[(i, j + 1)].re
        } else {
            SQRT_2 * spec[(i, j - m + 1)].im
        }
    })
}

/// Spatial modes back to the physical field.
pub(crate) fn space_inverse(smodes: &DMatrix<f64>, m_points: usize) -> DMatrix<f64> {
    let m = m_points / 2 - 1;
    let mut spec = DMatrix::<Complex<f64>>::zeros(smodes.nrows(), m_points / 2 + 1);
    for i in 0..smodes.nrows() {
        for k in 1..=m {
            spec[(i, k)] = Complex::new(smodes[(i, k - 1)], smodes[(i, m + k - 1)]) / SQRT_2;
        }
    }
    irfft_rows(&spec, m_points)
}

/// Shared temporal forward transform for classes without a time-axis
/// selection rule: `[r0, sqrt(2)*Re 1..=n, sqrt(2)*Im 1..=n]` rows.
fn time_forward_paired(smodes: &DMatrix<f64>) -> DMatrix<f64> {
    let n_points = smodes.nrows();
    let n = n_points / 2 - 1;
    let spec = rfft_cols(smodes);
    DMatrix::from_fn(n_points - 1, smodes.ncols(), |i, j| {
        if i == 0 {
            spec[(0, j)].re
        } else if i <= n {
            SQRT_2 * spec[(i, j)].re
        } else {
            SQRT_2 * spec[(i - n, j)].im
        }
    })
}

fn time_inverse_paired(modes: &DMatrix<f64>, n_points: usize) -> DMatrix<f64> {
    let n = n_points / 2 - 1;
    let mut spec = DMatrix::<Complex<f64>>::zeros(n_points / 2 + 1, modes.ncols());
    for j in 0..modes.ncols() {
        spec[(0, j)] = Complex::new(modes[(0, j)], 0.0);
        for k in 1..=n {
            spec[(k, j)] = Complex::new(modes[(k, j)], modes[(n + k, j)]) / SQRT_2;
        }
    }
    irfft_cols(&spec, n_points)
}

/// Per-class temporal forward transform (spatial modes to spatiotemporal
/// modes), applying the class selection rule.
pub(crate) fn time_forward(class: SymmetryClass, smodes: &DMatrix<f64>) -> DMatrix<f64> {
    let cols = smodes.ncols();
    let m = cols / 2;
    match class {
        SymmetryClass::Full | SymmetryClass::Relative => time_forward_paired(smodes),
        SymmetryClass::Antisymmetric => {
            // Only the antisymmetric (imaginary) spatial half carries
            // physical content.
            let imag_half = DMatrix::from_fn(smodes.nrows(), m, |i, j| smodes[(i, m + j)]);
            time_forward_paired(&imag_half)
        }
        SymmetryClass::ShiftReflection => {
            let n_points = smodes.nrows();
            let n = n_points / 2 - 1;
            let spec_a = rfft_cols(&DMatrix::from_fn(n_points, m, |i, j| smodes[(i, j)]));
            let spec_b = rfft_cols(&DMatrix::from_fn(n_points, m, |i, j| smodes[(i, m + j)]));
            // The two spatial halves carry disjoint temporal harmonics;
            // summing merges them into one coefficient set.
            DMatrix::from_fn(n_points - 1, m, |i, j| {
                if i == 0 {
                    spec_a[(0, j)].re + spec_b[(0, j)].re
                } else if i <= n {
                    SQRT_2 * (spec_a[(i, j)].re + spec_b[(i, j)].re)
                } else {
                    SQRT_2 * (spec_a[(i - n, j)].im + spec_b[(i - n, j)].im)
                }
            })
        }
        SymmetryClass::Equilibrium => DMatrix::from_fn(1, m, |_, j| smodes[(0, m + j)]),
        SymmetryClass::RelativeEquilibrium => {
            DMatrix::from_fn(1, cols, |_, j| smodes[(0, j)])
        }
    }
}

/// Per-class temporal inverse transform (spatiotemporal modes back to
/// spatial modes on `n_points` time rows).
pub(crate) fn time_inverse(
    class: SymmetryClass,
    modes: &DMatrix<f64>,
    n_points: usize,
) -> DMatrix<f64> {
    match class {
        SymmetryClass::Full | SymmetryClass::Relative => time_inverse_paired(modes, n_points),
        SymmetryClass::Antisymmetric => {
            let m = modes.ncols();
            let imag_half = time_inverse_paired(modes, n_points);
            DMatrix::from_fn(n_points, 2 * m, |i, j| {
                if j < m {
                    0.0
                } else {
                    imag_half[(i, j - m)]
                }
            })
        }
        SymmetryClass::ShiftReflection => {
            let m = modes.ncols();
            let n = n_points / 2 - 1;
            let mut spec_a = DMatrix::<Complex<f64>>::zeros(n_points / 2 + 1, m);
            let mut spec_b = DMatrix::<Complex<f64>>::zeros(n_points / 2 + 1, m);
            for j in 0..m {
                // Odd harmonics belong to the symmetric (real) spatial
                // half, even harmonics to the antisymmetric half.
                spec_b[(0, j)] = Complex::new(modes[(0, j)], 0.0);
                for k in 1..=n {
                    let val = Complex::new(modes[(k, j)], modes[(n + k, j)]) / SQRT_2;
                    if k % 2 == 1 {
                        spec_a[(k, j)] = val;
                    } else {
                        spec_b[(k, j)] = val;
                    }
                }
            }
            let a = irfft_cols(&spec_a, n_points);
            let b = irfft_cols(&spec_b, n_points);
            DMatrix::from_fn(n_points, 2 * m, |i, j| {
                if j < m {
                    a[(i, j)]
                } else {
                    b[(i, j - m)]
                }
            })
        }
        SymmetryClass::Equilibrium => {
            let m = modes.ncols();
            DMatrix::from_fn(n_points, 2 * m, |_, j| {
                if j < m {
                    0.0
                } else {
                    modes[(0, j - m)]
                }
            })
        }
        SymmetryClass::RelativeEquilibrium => {
            DMatrix::from_fn(n_points, modes.ncols(), |_, j| modes[(0, j)])
        }
    }
}

impl Orbit {
    /// Convert the state to another basis, returning a new orbit.
    ///
    /// Only adjacent basis pairs are primitive transforms; field to modes
    /// composes through spatial modes. Transforming to the current basis
    /// returns a copy (never an alias).
    pub fn transform(&self, to: Basis) -> Result<Orbit, OrbitError> {
        match (self.basis, to) {
            (from, to) if from == to => Ok(self.clone()),
            (Basis::Field, Basis::SpatialModes) => {
                Ok(self.like_with_state(space_forward(&self.state), Basis::SpatialModes))
            }
            (Basis::SpatialModes, Basis::Field) => Ok(self.like_with_state(
                space_inverse(&self.state, self.m_points),
                Basis::Field,
            )),
            (Basis::SpatialModes, Basis::Modes) => Ok(self.like_with_state(
                time_forward(self.class, &self.state),
                Basis::Modes,
            )),
            (Basis::Modes, Basis::SpatialModes) => Ok(self.like_with_state(
                time_inverse(self.class, &self.state, self.n_points),
                Basis::SpatialModes,
            )),
            (Basis::Field, Basis::Modes) => {
                self.transform(Basis::SpatialModes)?.transform(Basis::Modes)
            }
            (Basis::Modes, Basis::Field) => self
                .transform(Basis::SpatialModes)?
                .transform(Basis::Field),
            _ => unreachable!(),
        }
    }

    /// Mutating variant of [`transform`](Self::transform) for
    /// performance-sensitive inner loops; the value-returning form is the
    /// default discipline everywhere else.
    pub fn transform_in_place(&mut self, to: Basis) -> Result<(), OrbitError> {
        if self.basis != to {
            *self = self.transform(to)?;
        }
        Ok(())
    }
}

fn complex_identity(n: usize) -> DMatrix<Complex<f64>> {
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            Complex::new(1.0, 0.0)
        } else {
            Complex::new(0.0, 0.0)
        }
    })
}

fn imaginary_identity(n: usize) -> DMatrix<Complex<f64>> {
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            Complex::new(0.0, 1.0)
        } else {
            Complex::new(0.0, 0.0)
        }
    })
}

/// One-dimensional forward time-transform matrix, (N-1) x N, built by
/// transforming the identity.
fn time_dft_block(n_points: usize) -> DMatrix<f64> {
    let n = n_points / 2 - 1;
    let spec = rfft_cols(&DMatrix::identity(n_points, n_points));
    DMatrix::from_fn(n_points - 1, n_points, |i, t| {
        if i == 0 {
            spec[(0, t)].re
        } else if i <= n {
            SQRT_2 * spec[(i, t)].re
        } else {
            SQRT_2 * spec[(i - n, t)].im
        }
    })
}

/// One-dimensional inverse time-transform matrix, N x (N-1).
fn inv_time_block(n_points: usize) -> DMatrix<f64> {
    let n = n_points / 2 - 1;
    let real = irfft_cols(&complex_identity(n_points / 2 + 1), n_points);
    let imag = irfft_cols(&imaginary_identity(n_points / 2 + 1), n_points);
    DMatrix::from_fn(n_points, n_points - 1, |t, j| {
        if j == 0 {
            real[(t, 0)]
        } else if j <= n {
            real[(t, j)] / SQRT_2
        } else {
            imag[(t, j - n)] / SQRT_2
        }
    })
}

fn space_dft_block(m_points: usize) -> DMatrix<f64> {
    let m = m_points / 2 - 1;
    let spec = rfft_cols(&DMatrix::identity(m_points, m_points));
    DMatrix::from_fn(m_points - 2, m_points, |i, x| {
        if i < m {
            SQRT_2 * spec[(i + 1, x)].re
        } else {
            SQRT_2 * spec[(i - m + 1, x)].im
        }
    })
}

fn inv_space_block(m_points: usize) -> DMatrix<f64> {
    let m = m_points / 2 - 1;
    let real = irfft_cols(&complex_identity(m_points / 2 + 1), m_points);
    let imag = irfft_cols(&imaginary_identity(m_points / 2 + 1), m_points);
    DMatrix::from_fn(m_points, m_points - 2, |x, j| {
        if j < m {
            real[(x, j + 1)] / SQRT_2
        } else {
            imag[(x, j - m + 1)] / SQRT_2
        }
    })
}

/// Temporal harmonic index of a mode row (or mode column of the inverse).
fn harmonic_index(i: usize, n: usize) -> usize {
    if i == 0 {
        0
    } else if i <= n {
        i
    } else {
        i - n
    }
}

impl Orbit {
    /// Dense forward time-transform matrix acting on row-major flattened
    /// spatial modes. Only used for Jacobian assembly.
    pub(crate) fn time_transform_matrix(&self) -> DMatrix<f64> {
        let (n_points, m_points) = (self.n_points, self.m_points);
        let m = m_points / 2 - 1;
        match self.class {
            SymmetryClass::Full | SymmetryClass::Relative => {
                time_dft_block(n_points).kronecker(&DMatrix::identity(m_points - 2, m_points - 2))
            }
            SymmetryClass::Antisymmetric => {
                let block = time_dft_block(n_points);
                // Formatter: zero columns over the symmetric spatial half.
                let mut ab = DMatrix::zeros(n_points - 1, 2 * n_points);
                for i in 0..n_points - 1 {
                    for t in 0..n_points {
                        ab[(i, 2 * t + 1)] = block[(i, t)];
                    }
                }
                ab.kronecker(&DMatrix::identity(m, m))
            }
            SymmetryClass::ShiftReflection => {
                let block = time_dft_block(n_points);
                let n = n_points / 2 - 1;
                let mut ab = DMatrix::zeros(n_points - 1, 2 * n_points);
                for i in 0..n_points - 1 {
                    let offset = if harmonic_index(i, n) % 2 == 1 { 0 } else { 1 };
                    for t in 0..n_points {
                        ab[(i, 2 * t + offset)] = block[(i, t)];
                    }
                }
                ab.kronecker(&DMatrix::identity(m, m))
            }
            SymmetryClass::Equilibrium => {
                let cols = n_points * (m_points - 2);
                DMatrix::from_fn(m, cols, |i, j| if j == m + i { 1.0 } else { 0.0 })
            }
            SymmetryClass::RelativeEquilibrium => {
                let cols = n_points * (m_points - 2);
                DMatrix::from_fn(m_points - 2, cols, |i, j| if j == i { 1.0 } else { 0.0 })
            }
        }
    }

    /// Dense inverse time-transform matrix. Only used for Jacobian
    /// assembly.
    pub(crate) fn inv_time_transform_matrix(&self) -> DMatrix<f64> {
        let (n_points, m_points) = (self.n_points, self.m_points);
        let m = m_points / 2 - 1;
        match self.class {
            SymmetryClass::Full | SymmetryClass::Relative => {
                inv_time_block(n_points).kronecker(&DMatrix::identity(m_points - 2, m_points - 2))
            }
            SymmetryClass::Antisymmetric => {
                let block = inv_time_block(n_points);
                let mut ab = DMatrix::zeros(2 * n_points, n_points - 1);
                for t in 0..n_points {
                    for j in 0..n_points - 1 {
                        ab[(2 * t + 1, j)] = block[(t, j)];
                    }
                }
                ab.kronecker(&DMatrix::identity(m, m))
            }
            SymmetryClass::ShiftReflection => {
                let block = inv_time_block(n_points);
                let n = n_points / 2 - 1;
                let mut ab = DMatrix::zeros(2 * n_points, n_points - 1);
                for t in 0..n_points {
                    for j in 0..n_points - 1 {
                        let offset = if harmonic_index(j, n) % 2 == 1 { 0 } else { 1 };
                        ab[(2 * t + offset, j)] = block[(t, j)];
                    }
                }
                ab.kronecker(&DMatrix::identity(m, m))
            }
            SymmetryClass::Equilibrium => {
                let rows = n_points * (m_points - 2);
                DMatrix::from_fn(rows, m, |i, j| {
                    if i % (m_points - 2) == m + j {
                        1.0
                    } else {
                        0.0
                    }
                })
            }
            SymmetryClass::RelativeEquilibrium => {
                let rows = n_points * (m_points - 2);
                DMatrix::from_fn(rows, m_points - 2, |i, j| {
                    if i % (m_points - 2) == j {
                        1.0
                    } else {
                        0.0
                    }
                })
            }
        }
    }

    /// Dense forward space-transform matrix acting on the row-major
    /// flattened physical field.
    pub(crate) fn space_transform_matrix(&self) -> DMatrix<f64> {
        DMatrix::identity(self.n_points, self.n_points)
            .kronecker(&space_dft_block(self.m_points))
    }

    pub(crate) fn inv_space_transform_matrix(&self) -> DMatrix<f64> {
        DMatrix::identity(self.n_points, self.n_points)
            .kronecker(&inv_space_block(self.m_points))
    }

    pub(crate) fn spacetime_transform_matrix(&self) -> DMatrix<f64> {
        self.time_transform_matrix() * self.space_transform_matrix()
    }

    pub(crate) fn inv_spacetime_transform_matrix(&self) -> DMatrix<f64> {
        self.inv_space_transform_matrix() * self.inv_time_transform_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameters;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, StandardNormal};

    fn random_modes(rows: usize, cols: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(rows, cols, |_, _| StandardNormal.sample(&mut rng))
    }

    fn orbit_from_modes(class: SymmetryClass, n: usize, m: usize, seed: u64) -> Orbit {
        let (rows, cols) = class.mode_shape(n, m);
        Orbit::new(
            class,
            random_modes(rows, cols, seed),
            Basis::Modes,
            Parameters::new(44.0, 33.0, if class.has_shift() { 2.5 } else { 0.0 }),
        )
        .unwrap()
    }

    #[test]
    fn test_rfft_round_trip() {
        let state = random_modes(16, 3, 7);
        let back = irfft_cols(&rfft_cols(&state), 16);
        assert!((&state - &back).norm() < 1e-12);
    }

    #[test]
    fn test_round_trip_all_classes_and_bases() {
        for class in [
            SymmetryClass::Full,
            SymmetryClass::Antisymmetric,
            SymmetryClass::ShiftReflection,
            SymmetryClass::Relative,
        ] {
            for (n, m) in [(16, 16), (32, 16), (16, 32)] {
                let orbit = orbit_from_modes(class, n, m, 41);
                for to in [Basis::Field, Basis::SpatialModes] {
                    let back = orbit
                        .transform(to)
                        .unwrap()
                        .transform(Basis::Modes)
                        .unwrap();
                    assert!(
                        (back.state() - orbit.state()).norm() < 1e-10,
                        "{:?} via {:?} ({}, {})",
                        class,
                        to,
                        n,
                        m
                    );
                }
            }
        }
    }

    #[test]
    fn test_equilibrium_round_trip() {
        for class in [
            SymmetryClass::Equilibrium,
            SymmetryClass::RelativeEquilibrium,
        ] {
            let orbit = orbit_from_modes(class, 1, 16, 13);
            let back = orbit
                .transform(Basis::Field)
                .unwrap()
                .transform(Basis::Modes)
                .unwrap();
            assert!(
                (back.state() - orbit.state()).norm() < 1e-10,
                "{:?}",
                class
            );
        }
    }

    #[test]
    fn test_transforms_preserve_energy() {
        for class in [
            SymmetryClass::Full,
            SymmetryClass::Antisymmetric,
            SymmetryClass::ShiftReflection,
            SymmetryClass::Relative,
        ] {
            let orbit = orbit_from_modes(class, 16, 16, 3);
            let field = orbit.transform(Basis::Field).unwrap();
            let smodes = orbit.transform(Basis::SpatialModes).unwrap();
            assert!((field.norm() - orbit.norm()).abs() < 1e-10, "{:?}", class);
            assert!((smodes.norm() - orbit.norm()).abs() < 1e-10, "{:?}", class);
        }
    }

    #[test]
    fn test_transform_to_same_basis_copies() {
        let orbit = orbit_from_modes(SymmetryClass::Full, 16, 16, 5);
        let same = orbit.transform(Basis::Modes).unwrap();
        assert_eq!(same.state(), orbit.state());
    }

    #[test]
    fn test_dense_matrices_match_array_transforms() {
        for class in [
            SymmetryClass::Full,
            SymmetryClass::Antisymmetric,
            SymmetryClass::ShiftReflection,
        ] {
            let orbit = orbit_from_modes(class, 8, 8, 11);
            let smodes = orbit.transform(Basis::SpatialModes).unwrap();
            let field = orbit.transform(Basis::Field).unwrap();

            // Forward time matrix against the array transform.
            let flat_smodes = crate::orbit::flatten_row_major(smodes.state());
            let modes_via_matrix = orbit.time_transform_matrix() * &flat_smodes;
            let flat_modes = crate::orbit::flatten_row_major(orbit.state());
            assert!(
                (&modes_via_matrix - &flat_modes).norm() < 1e-10,
                "time fwd {:?}",
                class
            );

            // Inverse time matrix.
            let smodes_via_matrix = orbit.inv_time_transform_matrix() * &flat_modes;
            assert!(
                (&smodes_via_matrix - &flat_smodes).norm() < 1e-10,
                "time inv {:?}",
                class
            );

            // Space matrices.
            let flat_field = crate::orbit::flatten_row_major(field.state());
            let smodes_from_field = orbit.space_transform_matrix() * &flat_field;
            assert!(
                (&smodes_from_field - &flat_smodes).norm() < 1e-10,
                "space fwd {:?}",
                class
            );
            let field_from_smodes = orbit.inv_space_transform_matrix() * &flat_smodes;
            assert!(
                (&field_from_smodes - &flat_field).norm() < 1e-10,
                "space inv {:?}",
                class
            );
        }
    }

    #[test]
    fn test_spacetime_matrix_round_trip() {
        let orbit = orbit_from_modes(SymmetryClass::Full, 8, 8, 17);
        let forward = orbit.spacetime_transform_matrix();
        let inverse = orbit.inv_spacetime_transform_matrix();
        let product = &forward * &inverse;
        let size = orbit.state().len();
        let identity = DMatrix::<f64>::identity(size, size);
        assert!((&product - &identity).norm() < 1e-10);
    }
}
