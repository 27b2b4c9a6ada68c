#![allow(unused)]

use std::cell::Cell;
use std::ops::RangeInclusive;

use ndarray::prelude::*;
use proptest::prelude::*;
use proptest_derive::Arbitrary;

use ndarray_lyapunov::{LinearOperator, MatrixOperator, Result};

const FLOAT_RANGE: RangeInclusive<f64> = -1000.0..=1000.0;
const DIM_RANGE: RangeInclusive<usize> = 1..=10;
const STABLE_DIM_RANGE: RangeInclusive<usize> = 1..=6;

#[derive(Debug, Arbitrary)]
struct Layout {
    invert_rows: bool,
    invert_cols: bool,
    transpose: bool,
}

impl Layout {
    fn apply(&self, mut arr: Array2<f64>) -> Array2<f64> {
        if self.invert_rows {
            arr.invert_axis(Axis(0));
        }
        if self.invert_cols {
            arr.invert_axis(Axis(1));
        }
        if self.transpose {
            arr.reversed_axes()
        } else {
            arr
        }
    }
}

prop_compose! {
    pub fn square_arr()(dim in DIM_RANGE)
        (data in prop::collection::vec(FLOAT_RANGE, dim*dim), dim in Just(dim), layout in any::<Layout>()) -> Array2<f64> {
        layout.apply(Array2::from_shape_vec((dim, dim), data).unwrap())
    }
}

prop_compose! {
    pub fn tall_arr()(rows in DIM_RANGE, cols in DIM_RANGE)
        (data in prop::collection::vec(FLOAT_RANGE, rows*cols.min(rows)), rows in Just(rows), cols in Just(cols.min(rows))) -> Array2<f64> {
        Array2::from_shape_vec((rows, cols), data).unwrap()
    }
}

fn to_symm(arr: &mut Array2<f64>) {
    let n = arr.nrows();
    for i in 0..n {
        for j in 0..i {
            arr[(i, j)] = arr[(j, i)];
        }
    }
}

prop_compose! {
    pub fn symm_arr()(mut arr in square_arr()) -> Array2<f64> {
        to_symm(&mut arr);
        arr
    }
}

prop_compose! {
    /// Matrix whose symmetric part is negative definite, so that every Ritz value of it is stable
    pub fn stable_arr()(dim in STABLE_DIM_RANGE)
        (diag in prop::collection::vec(-10.0..-0.5f64, dim), off in prop::collection::vec(-1.0..1.0f64, dim*dim), dim in Just(dim)) -> Array2<f64> {
        let mut arr = Array2::from_shape_vec((dim, dim), off).unwrap() * (0.4 / dim as f64);
        arr.diag_mut().assign(&Array1::from(diag));
        arr
    }
}

prop_compose! {
    /// Stable matrix together with a positive diagonal `E` and a right-hand side of one or two columns
    pub fn stable_system()(a in stable_arr(), cols in 1..=2usize)
        (e in prop::collection::vec(0.5..2.0f64, a.nrows()), b in prop::collection::vec(-1.0..1.0f64, a.nrows()*cols), a in Just(a), cols in Just(cols)) -> (Array2<f64>, Array2<f64>, Array2<f64>) {
        let n = a.nrows();
        let e = Array2::from_diag(&Array1::from(e));
        let mut b = Array2::from_shape_vec((n, cols), b).unwrap();
        // keep the right-hand side away from zero
        b[(0, 0)] += 2.;
        (a, e, b)
    }
}

/// `A Z Z^T E^T + E Z Z^T A^T + B B^T`
pub fn lyap_residual(
    a: &Array2<f64>,
    e: &Array2<f64>,
    b: &Array2<f64>,
    z: ArrayView2<f64>,
) -> Array2<f64> {
    let x = z.dot(&z.t());
    let axe = a.dot(&x).dot(&e.t());
    &axe + &axe.t() + b.dot(&b.t())
}

/// Matrix operator counting its forward applications and linearity queries
pub struct CountingOperator {
    pub inner: MatrixOperator,
    pub applies: Cell<usize>,
    pub linearity_checks: Cell<usize>,
}

impl CountingOperator {
    pub fn new(matrix: Array2<f64>) -> Self {
        Self {
            inner: MatrixOperator::new(matrix),
            applies: Cell::new(0),
            linearity_checks: Cell::new(0),
        }
    }
}

impl LinearOperator for CountingOperator {
    fn source_dim(&self) -> usize {
        self.inner.source_dim()
    }

    fn range_dim(&self) -> usize {
        self.inner.range_dim()
    }

    fn linear(&self) -> bool {
        self.linearity_checks.set(self.linearity_checks.get() + 1);
        true
    }

    fn apply(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.applies.set(self.applies.get() + 1);
        self.inner.apply(v)
    }

    fn apply_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.inner.apply_adjoint(v)
    }

    fn assemble(&self) -> Option<Array2<f64>> {
        self.inner.assemble()
    }
}

/// Dense matrix reachable only through its action
pub struct MatrixFree(pub Array2<f64>);

impl LinearOperator for MatrixFree {
    fn source_dim(&self) -> usize {
        self.0.ncols()
    }

    fn range_dim(&self) -> usize {
        self.0.nrows()
    }

    fn apply(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        Ok(self.0.dot(&v))
    }

    fn apply_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        Ok(self.0.t().dot(&v))
    }
}
