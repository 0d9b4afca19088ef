use crate::types::{Basis, Frame};
use thiserror::Error;

/// Errors produced by orbit construction and the spectral operators.
///
/// Every variant is a precondition or shape violation that is fatal to the
/// call which raised it; operators never coerce a state into the basis or
/// frame they require.
#[derive(Debug, Error)]
pub enum OrbitError {
    #[error("`{op}` requires the {expected:?} basis but the state is in {found:?}")]
    BasisMismatch {
        op: &'static str,
        expected: Basis,
        found: Basis,
    },

    #[error("`{op}` is only defined in the {expected:?} frame")]
    FrameMismatch { op: &'static str, expected: Frame },

    #[error("discretization size {size} must be an even number")]
    OddSize { size: usize },

    #[error("state array of shape ({rows}, {cols}) is inconsistent with basis {basis:?}")]
    ShapeMismatch {
        basis: Basis,
        rows: usize,
        cols: usize,
    },

    #[error("target size {requested} must differ from the current size {current} in the right direction")]
    SizeOrder { current: usize, requested: usize },

    #[error("state vector of length {found} does not match {expected} modes plus unconstrained parameters")]
    VectorLength { expected: usize, found: usize },
}
