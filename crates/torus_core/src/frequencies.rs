//! Frequency-operator library.
//!
//! Pure functions producing wavenumber/frequency vectors and the
//! elementwise derivative multiplier arrays, plus the SO(2)
//! rotation-generator coefficients that encode how odd derivative orders
//! mix the real and imaginary coefficient blocks. The elementwise arrays
//! are expensive relative to their reuse rate (every derivative of every
//! state of the same discretization needs the same array), so they are
//! memoized in bounded caches.

use std::f64::consts::PI;
use std::sync::{Arc, LazyLock, Mutex};

use linked_hash_map::LinkedHashMap;
use nalgebra::{DMatrix, DVector, Matrix2};

/// Column layout of a spatial multiplier array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialLayout {
    /// Both coefficient halves stored: `[c1*q | c2*q]`, M-2 columns.
    Paired,
    /// Selection-rule classes, even orders only: `[c1*q]`, M/2-1 columns.
    Half,
}

/// Spatial wavenumbers `(2*pi*k/L)^order` for k = 1..=M/2-1.
pub fn wave_vector(l: f64, m_points: usize, order: u32) -> DVector<f64> {
    let m = m_points / 2 - 1;
    DVector::from_fn(m, |k, _| (2.0 * PI * (k + 1) as f64 / l).powi(order as i32))
}

/// Temporal frequencies `(-2*pi*k/T)^order` for k = 1..=N/2-1.
///
/// The extra factor of -1 accounts for the row ordering of the state,
/// which runs opposite to physical time.
pub fn frequency_vector(t: f64, n_points: usize, order: u32) -> DVector<f64> {
    let n = n_points / 2 - 1;
    DVector::from_fn(n, |k, _| {
        (-2.0 * PI * (k + 1) as f64 / t).powi(order as i32)
    })
}

/// `[[0, -1], [1, 0]]^(order mod 4)`, the generator of rotations acting on
/// a (real, imaginary) coefficient pair.
pub fn so2_generator(order: u32) -> Matrix2<f64> {
    let gen = Matrix2::new(0.0, -1.0, 1.0, 0.0);
    let mut out = Matrix2::identity();
    for _ in 0..(order % 4) {
        out = gen * out;
    }
    out
}

/// Column sums of the rotation generator: the pair of signs applied to the
/// real and imaginary halves before an odd-order swap. Even orders act
/// diagonally with equal signs.
pub fn so2_coefficients(order: u32) -> (f64, f64) {
    let g = so2_generator(order);
    (g[(0, 0)] + g[(1, 0)], g[(0, 1)] + g[(1, 1)])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DtKey {
    t_bits: u64,
    n_points: usize,
    cols: usize,
    order: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DxKey {
    l_bits: u64,
    m_points: usize,
    rows: usize,
    layout: SpatialLayout,
    order: u32,
}

/// Entries per cache. Eviction is strictly least-recently-used: a hit
/// refreshes the entry, inserts beyond capacity pop the oldest.
const CACHE_CAPACITY: usize = 32;

static DTN_CACHE: LazyLock<Mutex<LinkedHashMap<DtKey, Arc<DMatrix<f64>>>>> =
    LazyLock::new(|| Mutex::new(LinkedHashMap::new()));

static DXN_CACHE: LazyLock<Mutex<LinkedHashMap<DxKey, Arc<DMatrix<f64>>>>> =
    LazyLock::new(|| Mutex::new(LinkedHashMap::new()));

/// Elementwise temporal frequency array matching the mode-basis layout:
/// a column `[0, c1*w, c2*w]` replicated over `cols` mode columns.
pub fn elementwise_dtn(t: f64, n_points: usize, cols: usize, order: u32) -> Arc<DMatrix<f64>> {
    let key = DtKey {
        t_bits: t.to_bits(),
        n_points,
        cols,
        order,
    };
    if let Some(hit) = DTN_CACHE.lock().unwrap().get_refresh(&key) {
        return Arc::clone(hit);
    }

    let w = frequency_vector(t, n_points, order);
    let (c1, c2) = so2_coefficients(order);
    let n = w.len();
    let column = DVector::from_fn(2 * n + 1, |i, _| {
        if i == 0 {
            0.0
        } else if i <= n {
            c1 * w[i - 1]
        } else {
            c2 * w[i - n - 1]
        }
    });
    let array = Arc::new(DMatrix::from_fn(2 * n + 1, cols, |i, _| column[i]));

    let mut cache = DTN_CACHE.lock().unwrap();
    cache.insert(key, Arc::clone(&array));
    while cache.len() > CACHE_CAPACITY {
        cache.pop_front();
    }
    array
}

/// Elementwise spatial wavenumber array. The row pattern depends on the
/// layout: `Paired` carries both coefficient halves, `Half` only the
/// selection-rule half (even orders of the discrete-symmetry classes,
/// where both signs coincide).
pub fn elementwise_dxn(
    l: f64,
    m_points: usize,
    rows: usize,
    layout: SpatialLayout,
    order: u32,
) -> Arc<DMatrix<f64>> {
    let key = DxKey {
        l_bits: l.to_bits(),
        m_points,
        rows,
        layout,
        order,
    };
    if let Some(hit) = DXN_CACHE.lock().unwrap().get_refresh(&key) {
        return Arc::clone(hit);
    }

    let q = wave_vector(l, m_points, order);
    let (c1, c2) = so2_coefficients(order);
    let m = q.len();
    let row: DVector<f64> = match layout {
        SpatialLayout::Paired => DVector::from_fn(2 * m, |j, _| {
            if j < m {
                c1 * q[j]
            } else {
                c2 * q[j - m]
            }
        }),
        SpatialLayout::Half => DVector::from_fn(m, |j, _| c1 * q[j]),
    };
    let array = Arc::new(DMatrix::from_fn(rows, row.len(), |_, j| row[j]));

    let mut cache = DXN_CACHE.lock().unwrap();
    cache.insert(key, Arc::clone(&array));
    while cache.len() > CACHE_CAPACITY {
        cache.pop_front();
    }
    array
}
