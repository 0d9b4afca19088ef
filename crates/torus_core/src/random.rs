//! Spectrum-modulated random orbit generation.
//!
//! Initial conditions for orbit searches are drawn as random mode arrays
//! whose spectrum is shaped around a characteristic space/time scale, then
//! rescaled to a target physical magnitude. Generation takes an explicit
//! RNG instance; the library never touches process-global random state,
//! so independent search workers stay reproducible and race-free.

use std::f64::consts::PI;

use anyhow::Result;
use nalgebra::DMatrix;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::frequencies::{elementwise_dtn, elementwise_dxn, SpatialLayout};
use crate::orbit::Orbit;
use crate::symmetry::SymmetryClass;
use crate::types::{Basis, Parameters};

/// Spectrum shaping applied to the raw random modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spectrum {
    /// Gaussian bump around the characteristic space and time scales.
    Gaussian,
    /// Exponential decay away from the spatial scale, hard truncation in
    /// time.
    Exponential,
    /// No modulation.
    Flat,
}

/// Knobs for random generation; the defaults reproduce the standard
/// search initialization.
#[derive(Debug, Clone, Copy)]
pub struct RandomOptions {
    pub spectrum: Spectrum,
    /// Target maximum absolute value of the physical field.
    pub magnitude: f64,
    /// Field discretization override; derived from the periods otherwise.
    pub shape: Option<(usize, usize)>,
    /// Characteristic temporal harmonic; `T/25` rounded otherwise.
    pub time_scale: Option<f64>,
    /// Characteristic spatial wavenumber; one more than the number of
    /// fundamental wavelengths fitting in L otherwise.
    pub space_scale: Option<f64>,
}

impl Default for RandomOptions {
    fn default() -> Self {
        Self {
            spectrum: Spectrum::Gaussian,
            magnitude: 3.5,
            shape: None,
            time_scale: None,
            space_scale: None,
        }
    }
}

/// Discretization size conventions: roughly a power of two per period
/// unit, never below 32 points per axis. A zero time period collapses the
/// time axis to a single point.
pub fn parameter_based_discretization(parameters: &Parameters) -> (usize, usize) {
    let n = if parameters.t == 0.0 {
        1
    } else {
        let exponent = (parameters.t.log2() - 1.0).trunc() as i32;
        (2f64.powi(exponent).max(32.0)) as usize
    };
    let exponent = (parameters.l.log2() + 0.5).trunc() as i32;
    let m = (2f64.powi(exponent).max(32.0)) as usize;
    (n, m)
}

impl Orbit {
    /// Generate a random orbit of the given class.
    ///
    /// Zero periods are drawn from the per-class default ranges
    /// (T in [20, 180], L in [22, 66]); the mode spectrum is modulated per
    /// `options.spectrum` and the field rescaled to `options.magnitude`.
    /// The result is in the mode basis.
    pub fn random<R: Rng + ?Sized>(
        class: SymmetryClass,
        parameters: Parameters,
        rng: &mut R,
        options: &RandomOptions,
    ) -> Result<Orbit> {
        let mut parameters = parameters;
        if parameters.t == 0.0 && class != SymmetryClass::Equilibrium {
            parameters.t = Uniform::new(20.0, 180.0).sample(rng);
        }
        if parameters.l == 0.0 {
            parameters.l = Uniform::new(22.0, 66.0).sample(rng);
        }

        let (n_points, m_points) = options.shape.unwrap_or_else(|| {
            let (n, m) = parameter_based_discretization(&parameters);
            if class.is_equilibrium() {
                (1, m)
            } else {
                (n, m)
            }
        });
        let (rows, cols) = class.mode_shape(n_points, m_points);
        let raw = DMatrix::from_fn(rows, cols, |_, _| StandardNormal.sample(rng));

        // Harmonic indices in the same layout as the mode array, derived
        // from the frequency operators so the formula covers every
        // selection rule.
        let layout = if class.has_spatial_selection() {
            SpatialLayout::Half
        } else {
            SpatialLayout::Paired
        };
        let dx2 = elementwise_dxn(parameters.l, m_points, rows, layout, 2);
        let space_index = dx2.map(|v| ((parameters.l / (2.0 * PI)).powi(2) * v.abs()).sqrt());
        let time_index = if class.is_equilibrium() {
            DMatrix::zeros(rows, cols)
        } else {
            let dtn = elementwise_dtn(parameters.t, n_points, cols, 1);
            dtn.map(|v| (parameters.t / (2.0 * PI)) * v.abs())
        };

        let space_scale = options
            .space_scale
            .unwrap_or_else(|| 1.0 + (parameters.l / (2.0 * PI * 2f64.sqrt())).round());
        let time_scale = options
            .time_scale
            .unwrap_or_else(|| (parameters.t / 25.0).round());
        let space_var = space_scale.sqrt().max(1.0);
        let time_var = time_scale.sqrt().max(1.0);

        let modes = match options.spectrum {
            Spectrum::Gaussian => DMatrix::from_fn(rows, cols, |i, j| {
                let space_factor =
                    (-(space_index[(i, j)] - space_scale).powi(2) / (2.0 * space_var)).exp();
                let time_factor = if class.is_equilibrium() {
                    1.0
                } else {
                    (-(time_index[(i, j)] - time_scale).powi(2) / (2.0 * time_var)).exp()
                };
                space_factor * time_factor * raw[(i, j)]
            }),
            Spectrum::Exponential => DMatrix::from_fn(rows, cols, |i, j| {
                let space_factor = (-(space_index[(i, j)] - space_scale).abs() / space_var).exp();
                let time_factor = if !class.is_equilibrium() && time_index[(i, j)] > time_scale {
                    0.0
                } else {
                    1.0
                };
                space_factor * time_factor * raw[(i, j)]
            }),
            Spectrum::Flat => raw,
        };

        let orbit = Orbit::new(class, modes, Basis::Modes, parameters)?
            .with_time_points(n_points)?;
        Ok(orbit.rescale(options.magnitude)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generation_is_reproducible() {
        let options = RandomOptions::default();
        let parameters = Parameters::new(40.0, 30.0, 0.0);
        let mut rng_a = StdRng::seed_from_u64(9);
        let mut rng_b = StdRng::seed_from_u64(9);
        let a = Orbit::random(SymmetryClass::Full, parameters, &mut rng_a, &options).unwrap();
        let b = Orbit::random(SymmetryClass::Full, parameters, &mut rng_b, &options).unwrap();
        assert_eq!(a.state(), b.state());
        assert_eq!(a.parameters(), b.parameters());
    }

    #[test]
    fn test_zero_periods_are_drawn_from_ranges() {
        let options = RandomOptions::default();
        let mut rng = StdRng::seed_from_u64(11);
        let orbit = Orbit::random(
            SymmetryClass::Full,
            Parameters::new(0.0, 0.0, 0.0),
            &mut rng,
            &options,
        )
        .unwrap();
        let parameters = orbit.parameters();
        assert!(parameters.t >= 20.0 && parameters.t <= 180.0);
        assert!(parameters.l >= 22.0 && parameters.l <= 66.0);
    }

    #[test]
    fn test_rescaled_field_magnitude() {
        let options = RandomOptions::default();
        let mut rng = StdRng::seed_from_u64(13);
        let orbit = Orbit::random(
            SymmetryClass::Antisymmetric,
            Parameters::new(40.0, 30.0, 0.0),
            &mut rng,
            &options,
        )
        .unwrap();
        let field = orbit.transform(Basis::Field).unwrap();
        let max = field.state().iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        assert!((max - 3.5).abs() < 1e-10);
    }

    #[test]
    fn test_fixed_seed_search_scenario() {
        // A Full-class orbit at (T, L) = (40, 30) on a 32 x 32 grid: the
        // cost without the equation applied is exactly half the squared
        // array norm, and classification leaves a genuinely
        // time-dependent state untouched.
        let options = RandomOptions {
            shape: Some((32, 32)),
            ..RandomOptions::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let orbit = Orbit::random(
            SymmetryClass::Full,
            Parameters::new(40.0, 30.0, 0.0),
            &mut rng,
            &options,
        )
        .unwrap();
        assert_eq!(orbit.discretization(), (32, 32));

        let expected = 0.5 * orbit.state().iter().map(|v| v * v).sum::<f64>();
        assert_eq!(orbit.residual(false).unwrap(), expected);

        let (unchanged, status) = orbit.verify_integrity().unwrap();
        assert_eq!(status, crate::types::IntegrityStatus::Converged);
        assert!((unchanged.state() - orbit.state()).norm() < 1e-12);
    }

    #[test]
    fn test_equilibrium_generation_collapses_time_axis() {
        let options = RandomOptions::default();
        let mut rng = StdRng::seed_from_u64(17);
        let orbit = Orbit::random(
            SymmetryClass::Equilibrium,
            Parameters::new(0.0, 30.0, 0.0),
            &mut rng,
            &options,
        )
        .unwrap();
        assert_eq!(orbit.parameters().t, 0.0);
        assert_eq!(orbit.state().nrows(), 1);
    }
}
