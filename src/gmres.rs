//! Restarted GMRES for operators that are only available through their action

use ndarray::{s, Array1, Array2, ArrayView1};

use crate::{LinalgError, Result};

/// Relative residual reached by the solves of matrix-free operators
pub const TOLERANCE: f64 = 1e-12;
/// Krylov dimension before a restart
pub const RESTART: usize = 50;
/// Total number of Arnoldi steps before giving up
pub const MAX_ITERATIONS: usize = 2000;

/// Computes `(c, s)` with `-s a + c b = 0`
fn givens(a: f64, b: f64) -> (f64, f64) {
    if b == 0. {
        (1., 0.)
    } else if a.abs() > b.abs() {
        let t = b / a;
        let c = (1. + t * t).sqrt().recip();
        (c, c * t)
    } else {
        let t = a / b;
        let s = (1. + t * t).sqrt().recip();
        (s * t, s)
    }
}

/// Solves `op(x) = b` by GMRES restarted every `restart` steps, without preconditioning
///
/// Stops once `‖b - op(x)‖ <= tol ‖b‖`. Fails with `NoConvergence` after `maxiter` Arnoldi
/// steps in total.
pub fn gmres<F>(
    op: F,
    b: ArrayView1<f64>,
    tol: f64,
    restart: usize,
    maxiter: usize,
) -> Result<Array1<f64>>
where
    F: Fn(ArrayView1<f64>) -> Result<Array1<f64>>,
{
    let n = b.len();
    let mut x = Array1::zeros(n);
    let bnorm = b.dot(&b).sqrt();
    if bnorm == 0. {
        return Ok(x);
    }
    let m = restart.min(n).max(1);
    let mut iterations = 0;

    loop {
        let r = &b - &op(x.view())?;
        let beta = r.dot(&r).sqrt();
        if beta <= tol * bnorm {
            return Ok(x);
        }
        if iterations >= maxiter {
            return Err(LinalgError::NoConvergence { iterations });
        }

        let mut basis = Array2::zeros((n, m + 1));
        let mut h = Array2::zeros((m + 1, m));
        let mut rotations = Vec::with_capacity(m);
        let mut g = Array1::zeros(m + 1);
        basis.column_mut(0).assign(&(r / beta));
        g[0] = beta;

        let mut k = 0;
        while k < m && iterations < maxiter {
            iterations += 1;
            let mut w = op(basis.column(k))?;
            for j in 0..=k {
                let hjk = w.dot(&basis.column(j));
                w.scaled_add(-hjk, &basis.column(j));
                h[(j, k)] = hjk;
            }
            let hnext = w.dot(&w).sqrt();
            h[(k + 1, k)] = hnext;
            if hnext != 0. {
                basis.column_mut(k + 1).assign(&(w / hnext));
            }

            for (j, &(cs, sn)) in rotations.iter().enumerate() {
                let (upper, lower) = (h[(j, k)], h[(j + 1, k)]);
                h[(j, k)] = cs * upper + sn * lower;
                h[(j + 1, k)] = cs * lower - sn * upper;
            }
            let (cs, sn) = givens(h[(k, k)], h[(k + 1, k)]);
            rotations.push((cs, sn));
            h[(k, k)] = cs * h[(k, k)] + sn * h[(k + 1, k)];
            h[(k + 1, k)] = 0.;
            g[k + 1] = -sn * g[k];
            g[k] *= cs;
            k += 1;

            // `hnext == 0` means the Krylov space is invariant and holds the solution
            if hnext == 0. || g[k].abs() <= tol * bnorm {
                break;
            }
        }

        let mut y = Array1::zeros(k);
        for i in (0..k).rev() {
            let tail = h.slice(s![i, i + 1..k]).dot(&y.slice(s![i + 1..k]));
            y[i] = (g[i] - tail) / h[(i, i)];
        }
        x += &basis.slice(s![.., ..k]).dot(&y);
    }
}
