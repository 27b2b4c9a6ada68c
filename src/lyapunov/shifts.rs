//! Shift parameters of the low-rank ADI iteration
//!
//! Shifts are Ritz values of the pencil `(A, E)`: the pencil is projected onto a small subspace
//! and the eigenvalues of the projected pencil with negative real part are used. The initial
//! shifts come from the space spanned by the right-hand side, later ones from the space spanned
//! by the most recent columns of the solution factor `Z`.

use std::ops::Index;

use ndarray::{linalg::kron, Array2, ArrayView2, Axis};
use num_complex::Complex64;
use rand::Rng;

use super::{random, ProjectionShiftOptions};
use crate::{
    eig::generalized_eigvals, eigh::EighInto, gram_schmidt::gram_schmidt,
    operator::LinearOperator, vector_array::VectorArray, LinalgError, Result,
};

/// Ordered sequence of stable shift parameters
///
/// Every entry has negative real part. A complex shift is always directly followed by its
/// conjugate, and the pair is consumed by a single ADI step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShiftSet(Vec<Complex64>);

impl ShiftSet {
    /// Collects the values with negative real part.
    ///
    /// Complex values are taken from the member of each conjugate pair with positive imaginary
    /// part, which is inserted together with its conjugate.
    pub fn stable<I: IntoIterator<Item = Complex64>>(values: I) -> Self {
        let mut shifts = Vec::new();
        for v in values.into_iter().filter(|v| v.re < 0.) {
            if v.im == 0. {
                shifts.push(v);
            } else if v.im > 0. {
                shifts.push(v);
                shifts.push(v.conj());
            }
        }
        ShiftSet(shifts)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Complex64> {
        self.0.iter()
    }

    fn extended(&self, fresh: &ShiftSet) -> ShiftSet {
        let mut shifts = self.0.clone();
        shifts.extend_from_slice(&fresh.0);
        ShiftSet(shifts)
    }
}

impl Index<usize> for ShiftSet {
    type Output = Complex64;

    fn index(&self, index: usize) -> &Complex64 {
        &self.0[index]
    }
}

/// `q^T op(q)`, or `q^T op^T(q)` for the dual equation
fn project(op: &dyn LinearOperator, q: ArrayView2<f64>, trans: bool) -> Result<Array2<f64>> {
    if trans {
        Ok(q.t().dot(&op.apply_adjoint(q)?))
    } else {
        op.apply2(q, q)
    }
}

/// Stable eigenvalues of the projected pencil. A singular `ep` gives no shifts.
fn stable_ritz_values(ap: &Array2<f64>, ep: &Array2<f64>) -> Result<ShiftSet> {
    match generalized_eigvals(ap, ep) {
        Ok(vals) => Ok(ShiftSet::stable(vals.iter().copied())),
        Err(LinalgError::Singular { .. }) | Err(LinalgError::NoConvergence { .. }) => {
            Ok(ShiftSet::default())
        }
        Err(err) => Err(err),
    }
}

/// Initial shifts from the span of the residual factor `w`
///
/// If the projection onto `span(w)` has no stable eigenvalue, random subspaces of the same
/// dimension drawn from `rng` are tried, for at most `options.init_maxiter` attempts in total.
pub fn projection_shifts_init<R: Rng>(
    a: &dyn LinearOperator,
    e: &dyn LinearOperator,
    w: ArrayView2<f64>,
    trans: bool,
    options: &ProjectionShiftOptions,
    rng: &mut R,
) -> Result<ShiftSet> {
    let mut basis = w.to_owned();
    for attempt in 0..options.init_maxiter {
        let q = gram_schmidt(&basis, None, 0., 0.)?;
        let ap = project(a, q.view(), trans)?;
        let ep = project(e, q.view(), trans)?;
        let shifts = stable_ritz_values(&ap, &ep)?;
        if !shifts.is_empty() {
            log::debug!(
                "Generated {} initial shifts in attempt {}",
                shifts.len(),
                attempt + 1
            );
            return Ok(shifts);
        }
        basis = random(w.dim(), rng);
    }
    Err(LinalgError::ShiftGeneration {
        attempts: options.init_maxiter,
    })
}

/// Coefficients of the ADI recurrence on the shift window, i.e. `B` and `G` with
/// `A Vu = W G^T + E Vu B` for the columns `Vu` of `Z` belonging to `window`.
fn recurrence_matrices(window: &[Complex64]) -> (Array2<f64>, Array2<f64>) {
    let u = window.len();
    let mut rec = Array2::zeros((u, u));
    let mut g = Array2::zeros((u, 1));

    let mut i = 0;
    while i < u {
        let rp = window[i].re;
        let complex = window[i].im != 0.;
        // a pair feeds `W` through its first real block only, scaled as in the complex step
        g[(i, 0)] = if complex {
            2. * (-rp).sqrt()
        } else {
            (-2. * rp).sqrt()
        };
        for (k, prev) in window[..i].iter().enumerate() {
            // the second member of a pair couples through the first one
            if prev.im < 0. {
                continue;
            }
            let (factor, weight) = match (complex, prev.im > 0.) {
                (false, false) => (2., 1.),
                (true, true) => (4., 1.),
                _ => (2., 2.),
            };
            rec[(i, k)] = -factor * (weight * rp * prev.re).sqrt();
        }
        if complex {
            let abs = window[i].norm();
            rec[(i, i)] = 2. * rp;
            rec[(i, i + 1)] = -abs;
            rec[(i + 1, i)] = abs;
            i += 2;
        } else {
            rec[(i, i)] = rp;
            i += 1;
        }
    }
    (rec, g)
}

/// Projected pencil on `span(vu)` reconstructed from the ADI recurrence, without applying `A`
fn implicit_projection(
    e: &dyn LinearOperator,
    vu: ArrayView2<f64>,
    w: ArrayView2<f64>,
    window: &[Complex64],
    trans: bool,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let r = w.ncols();
    let (rec, g) = recurrence_matrices(window);
    let eye = Array2::eye(r);
    let (rec, g) = (kron(&rec, &eye), kron(&g, &eye));

    // whitening transform of the gramian, dropping its numerically zero part
    let (vals, vecs) = vu.t().dot(&vu).eigh_into()?;
    let cutoff = vals.iter().fold(0., |m: f64, &x| m.max(x)) * vals.len() as f64 * f64::EPSILON;
    let keep: Vec<usize> = (0..vals.len()).filter(|&k| vals[k] > cutoff).collect();
    let mut p = vecs.select(Axis(1), &keep);
    for (mut col, &k) in p.columns_mut().into_iter().zip(keep.iter()) {
        col /= vals[k].sqrt();
    }
    let q = vu.dot(&p);

    let ev = if trans { e.apply_adjoint(vu)? } else { e.apply(vu)? };
    let t = q.t().dot(&ev);
    let ap = q.t().dot(&w).dot(&g.t()).dot(&p) + t.dot(&rec).dot(&p);
    let ep = t.dot(&p);
    Ok((ap, ep))
}

/// Extends `prev` by further shifts, projecting onto the span of the last columns of `z`
///
/// `z` holds one block of `w.ncols()` columns per consumed entry of `prev`. The projection space
/// is spanned by the blocks of the last `options.z_columns` shifts, widened by one shift when it
/// would otherwise start in the middle of a conjugate pair. If the projected pencil has no
/// stable eigenvalue, `prev` is repeated instead.
pub fn projection_shifts(
    a: &dyn LinearOperator,
    e: &dyn LinearOperator,
    z: &VectorArray,
    w: ArrayView2<f64>,
    prev: &ShiftSet,
    trans: bool,
    options: &ProjectionShiftOptions,
) -> Result<ShiftSet> {
    let l = prev.len();
    let r = w.ncols();
    let mut u = options.z_columns.min(l);
    let mut d = l - u;
    if d > 0 && prev[d].im < 0. {
        d -= 1;
        u += 1;
    }
    let vu = z.last(u * r)?;
    let window = &prev.as_slice()[d..];

    let (ap, ep) = if options.implicit_subspace {
        implicit_projection(e, vu, w, window, trans)?
    } else {
        let q = gram_schmidt(&vu, None, 0., 0.)?;
        (project(a, q.view(), trans)?, project(e, q.view(), trans)?)
    };

    let shifts = stable_ritz_values(&ap, &ep)?;
    if shifts.is_empty() {
        log::debug!("No stable Ritz values, repeating {} previous shifts", l);
        Ok(prev.extended(prev))
    } else {
        log::debug!("Generated {} further shifts", shifts.len());
        Ok(prev.extended(&shifts))
    }
}
