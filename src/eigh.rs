//! Eigendecomposition of symmetric matrices
//!
//! Uses the cyclic Jacobi method, which is accurate and robust for the small Gram and projection
//! matrices this crate works with. Only the lower triangle of the input is read.

use ndarray::{Array1, Array2, ArrayBase, Axis, Data, DataMut, Ix2, NdFloat};

use crate::{check_square, LinalgError, Result};

const MAX_SWEEPS: usize = 64;

fn symmetric_eig<A: NdFloat, S: DataMut<Elem = A>>(
    mut matrix: ArrayBase<S, Ix2>,
    eigenvectors: bool,
) -> Result<(Array1<A>, Option<Array2<A>>)> {
    let n = check_square(&matrix)?;

    // mirror the lower triangle
    for i in 0..n {
        for j in 0..i {
            matrix[(j, i)] = matrix[(i, j)];
        }
    }
    let mut vecs = eigenvectors.then(|| Array2::eye(n));

    let total = matrix.iter().fold(A::zero(), |acc, &x| acc + x * x);
    let tol = A::epsilon() * A::from(n.max(1)).unwrap();
    let threshold = (tol * tol * total).max(A::min_positive_value());

    let mut converged = false;
    for _ in 0..MAX_SWEEPS {
        let off = off_diagonal_sq(&matrix);
        if off <= threshold {
            converged = true;
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = matrix[(p, q)];
                if apq.is_zero() {
                    continue;
                }
                let (c, s) = jacobi_rotation(matrix[(p, p)], matrix[(q, q)], apq);
                rotate_cols(&mut matrix, p, q, c, s);
                rotate_rows(&mut matrix, p, q, c, s);
                // exact zero keeps the off-diagonal mass strictly decreasing
                matrix[(p, q)] = A::zero();
                matrix[(q, p)] = A::zero();
                if let Some(v) = vecs.as_mut() {
                    rotate_cols(v, p, q, c, s);
                }
            }
        }
    }

    if !converged && off_diagonal_sq(&matrix) > threshold {
        return Err(LinalgError::NoConvergence {
            iterations: MAX_SWEEPS,
        });
    }

    Ok((matrix.diag().to_owned(), vecs))
}

fn off_diagonal_sq<A: NdFloat, S: Data<Elem = A>>(matrix: &ArrayBase<S, Ix2>) -> A {
    let mut off = A::zero();
    for ((i, j), &x) in matrix.indexed_iter() {
        if i != j {
            off += x * x;
        }
    }
    off
}

/// Computes `(c, s)` of the rotation annihilating `apq` in the 2x2 symmetric matrix
///     app  apq
///     apq  aqq
fn jacobi_rotation<A: NdFloat>(app: A, aqq: A, apq: A) -> (A, A) {
    let two = A::from(2.0f64).unwrap();
    let theta = (aqq - app) / (two * apq);
    let t = if theta.abs() > A::from(1e150f64).unwrap_or_else(A::max_value) {
        (two * theta).recip()
    } else {
        let sign = if theta >= A::zero() { A::one() } else { -A::one() };
        sign / (theta.abs() + (theta * theta + A::one()).sqrt())
    };
    let c = (t * t + A::one()).sqrt().recip();
    (c, t * c)
}

fn rotate_cols<A: NdFloat, S: DataMut<Elem = A>>(
    m: &mut ArrayBase<S, Ix2>,
    p: usize,
    q: usize,
    c: A,
    s: A,
) {
    for k in 0..m.nrows() {
        let (mkp, mkq) = (m[(k, p)], m[(k, q)]);
        m[(k, p)] = c * mkp - s * mkq;
        m[(k, q)] = s * mkp + c * mkq;
    }
}

fn rotate_rows<A: NdFloat, S: DataMut<Elem = A>>(
    m: &mut ArrayBase<S, Ix2>,
    p: usize,
    q: usize,
    c: A,
    s: A,
) {
    for k in 0..m.ncols() {
        let (mpk, mqk) = (m[(p, k)], m[(q, k)]);
        m[(p, k)] = c * mpk - s * mqk;
        m[(q, k)] = s * mpk + c * mqk;
    }
}

/// Eigendecomposition of symmetric matrices, consuming the input
pub trait EighInto: Sized {
    type EigVal;
    type EigVec;

    /// Returns the eigenvalues (ascending) and the matching orthonormal eigenvectors as columns.
    fn eigh_into(self) -> Result<(Self::EigVal, Self::EigVec)>;

    /// Returns the eigenvalues in ascending order.
    fn eigvalsh_into(self) -> Result<Self::EigVal>;
}

impl<A: NdFloat, S: DataMut<Elem = A>> EighInto for ArrayBase<S, Ix2> {
    type EigVal = Array1<A>;
    type EigVec = Array2<A>;

    fn eigh_into(self) -> Result<(Self::EigVal, Self::EigVec)> {
        let (vals, vecs) = symmetric_eig(self, true)?;
        Ok((vals, vecs.unwrap()).sort_eig(false))
    }

    fn eigvalsh_into(self) -> Result<Self::EigVal> {
        let (mut vals, _) = symmetric_eig(self, false)?;
        vals.as_slice_mut()
            .unwrap()
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Ok(vals)
    }
}

/// Eigendecomposition of symmetric matrices
pub trait Eigh {
    type EigVal;
    type EigVec;

    fn eigh(&self) -> Result<(Self::EigVal, Self::EigVec)>;

    fn eigvalsh(&self) -> Result<Self::EigVal>;
}

impl<A: NdFloat, S: Data<Elem = A>> Eigh for ArrayBase<S, Ix2> {
    type EigVal = Array1<A>;
    type EigVec = Array2<A>;

    fn eigh(&self) -> Result<(Self::EigVal, Self::EigVec)> {
        self.to_owned().eigh_into()
    }

    fn eigvalsh(&self) -> Result<Self::EigVal> {
        self.to_owned().eigvalsh_into()
    }
}

/// Sorting of eigendecomposition results
pub trait EigSort: Sized {
    /// Sorts eigenvalues ascending (or descending if `descending` is set), permuting the
    /// eigenvector columns accordingly.
    fn sort_eig(self, descending: bool) -> Self;
}

impl<A: NdFloat> EigSort for (Array1<A>, Array2<A>) {
    fn sort_eig(self, descending: bool) -> Self {
        let (vals, vecs) = self;
        let mut order: Vec<usize> = (0..vals.len()).collect();
        order.sort_by(|&i, &j| {
            let ord = vals[i]
                .partial_cmp(&vals[j])
                .unwrap_or(std::cmp::Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        let vals = order.iter().map(|&i| vals[i]).collect();
        let vecs = vecs.select(Axis(1), &order);
        (vals, vecs)
    }
}
