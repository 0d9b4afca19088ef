//! The `torus_core` crate is the spectral engine for finding
//! doubly-periodic orbits of the Kuramoto-Sivashinsky equation inside a
//! Newton-Krylov continuation framework.
//!
//! Key components:
//! - **Orbit**: the symmetry-tagged spectral/physical state with its
//!   parameter tuple and constraint flags.
//! - **Transforms**: orthonormal real-input Fourier transforms per
//!   symmetry class, plus the dense matrices used by Jacobian assembly.
//! - **Operators**: elementwise spectral derivatives, the pseudospectral
//!   nonlinear term and the governing-equation residual.
//! - **Jacobian**: matrix-free forward/adjoint products, dense assembly
//!   and diagonal preconditioning for the outer solver.
//! - **Resolution**: pad/truncate, fundamental domains and
//!   post-convergence reclassification.

pub mod error;
pub mod frequencies;
pub mod jacobian;
pub mod operators;
pub mod orbit;
pub mod random;
pub mod resolution;
pub mod symmetry;
pub mod transforms;
pub mod types;

pub use error::OrbitError;
pub use jacobian::{PreconditionerSide, PreconditioningExponents};
pub use orbit::Orbit;
pub use random::{parameter_based_discretization, RandomOptions, Spectrum};
pub use symmetry::SymmetryClass;
pub use types::{Axis, Basis, Constraints, Frame, IntegrityStatus, OrbitData, Parameters};
