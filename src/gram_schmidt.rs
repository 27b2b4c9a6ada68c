//! Gram-Schmidt orthonormalization
//!
//! Modified Gram-Schmidt with re-orthogonalization: a vector is orthogonalized again whenever
//! its norm shrank by more than [`REITERATION_THRESHOLD`] in the previous pass, which keeps the
//! basis numerically orthonormal even for nearly dependent input.

use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};

use crate::{operator::LinearOperator, Result};

/// Relative norm decrease below which a vector is orthogonalized a second time
pub const REITERATION_THRESHOLD: f64 = 0.9;

/// Maximal number of orthogonalization passes per vector
const MAX_PASSES: usize = 4;

fn inner(x: &Array1<f64>, y: &Array1<f64>, product: Option<&dyn LinearOperator>) -> Result<f64> {
    match product {
        None => Ok(x.dot(y)),
        Some(op) => {
            let py = op.apply(y.view().insert_axis(Axis(1)))?;
            Ok(x.dot(&py.column(0)))
        }
    }
}

fn norm(x: &Array1<f64>, product: Option<&dyn LinearOperator>) -> Result<f64> {
    Ok(inner(x, x, product)?.sqrt())
}

/// Orthonormalizes the columns of `v` with respect to the inner product given by `product`
/// (the Euclidean one if `None`).
///
/// A column is dropped if its initial norm does not exceed `atol`, or if orthogonalization
/// against the previous columns reduces its norm to `rtol` times its normalized size or below.
/// Zero columns are always dropped. The returned matrix has the same number of rows as `v` and
/// at most as many columns.
pub fn gram_schmidt<S: Data<Elem = f64>>(
    v: &ArrayBase<S, Ix2>,
    product: Option<&dyn LinearOperator>,
    atol: f64,
    rtol: f64,
) -> Result<Array2<f64>> {
    let mut basis: Vec<Array1<f64>> = Vec::with_capacity(v.ncols());

    'columns: for col in v.columns() {
        let mut x = col.to_owned();
        let initial = norm(&x, product)?;
        if !(initial > atol) {
            continue;
        }
        x /= initial;

        // x has unit norm at the start of every pass
        for _ in 0..MAX_PASSES {
            for q in &basis {
                let p = inner(q, &x, product)?;
                x.scaled_add(-p, q);
            }
            let new = norm(&x, product)?;
            if !(new > rtol) || new == 0. {
                continue 'columns;
            }
            x /= new;
            if new >= REITERATION_THRESHOLD {
                break;
            }
        }
        basis.push(x);
    }

    let mut out = Array2::zeros((v.nrows(), basis.len()));
    for (mut col, q) in out.columns_mut().into_iter().zip(basis.iter()) {
        col.assign(q);
    }
    Ok(out)
}
