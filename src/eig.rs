//! Eigenvalues of general real matrices and matrix pencils
//!
//! The matrix is first reduced to upper Hessenberg form with Householder similarity transforms,
//! then the eigenvalues are extracted with the Francis double-shift QR iteration, which keeps all
//! arithmetic real. Complex eigenvalues come out as conjugate pairs.

use ndarray::{Array1, Array2, ArrayBase, Data, Ix2, NdFloat};
use num_complex::{Complex, ComplexFloat};

use crate::{check_square, householder::hessenberg_step, lu::Lu, LinalgError, Result};

/// Maximal number of QR sweeps spent on a single eigenvalue before giving up
const MAX_ITERATIONS: usize = 60;

/// Reduces a square matrix to upper Hessenberg form in place
pub fn hessenberg_inplace<A: NdFloat>(matrix: &mut Array2<A>) -> Result<()> {
    let n = check_square(matrix)?;
    for icol in 0..n.saturating_sub(2) {
        hessenberg_step(matrix, icol);
    }
    Ok(())
}

fn sign<A: NdFloat>(magnitude: A, of: A) -> A {
    if of >= A::zero() {
        magnitude.abs()
    } else {
        -magnitude.abs()
    }
}

/// Francis double-shift QR on an upper Hessenberg matrix, destroying it.
///
/// Returns the real and imaginary parts of the eigenvalues.
fn hessenberg_qr<A: NdFloat>(h: &mut Array2<A>) -> Result<(Vec<A>, Vec<A>)> {
    let n = h.nrows();
    let mut wr = vec![A::zero(); n];
    let mut wi = vec![A::zero(); n];

    let mut anorm = A::zero();
    for i in 0..n {
        for j in i.saturating_sub(1)..n {
            anorm += h[(i, j)].abs();
        }
    }

    let half = A::from(0.5f64).unwrap();
    let mut shift_acc = A::zero();
    let mut nn = n as isize - 1;
    let mut its = 0;

    while nn >= 0 {
        let e = nn as usize;

        // look for a single small subdiagonal element
        let mut l = e;
        while l >= 1 {
            let mut s = h[(l - 1, l - 1)].abs() + h[(l, l)].abs();
            if s.is_zero() {
                s = anorm;
            }
            if h[(l, l - 1)].abs() + s == s {
                h[(l, l - 1)] = A::zero();
                break;
            }
            l -= 1;
        }

        let mut x = h[(e, e)];
        if l == e {
            // one root found
            wr[e] = x + shift_acc;
            wi[e] = A::zero();
            nn -= 1;
            its = 0;
            continue;
        }

        let mut y = h[(e - 1, e - 1)];
        let mut w = h[(e, e - 1)] * h[(e - 1, e)];
        if l == e - 1 {
            // two roots found
            let p = half * (y - x);
            let q = p * p + w;
            let z = q.abs().sqrt();
            x += shift_acc;
            if q >= A::zero() {
                let z = p + sign(z, p);
                wr[e - 1] = x + z;
                wr[e] = if z.is_zero() { x + z } else { x - w / z };
                wi[e - 1] = A::zero();
                wi[e] = A::zero();
            } else {
                wr[e - 1] = x + p;
                wr[e] = x + p;
                wi[e - 1] = -z;
                wi[e] = z;
            }
            nn -= 2;
            its = 0;
            continue;
        }

        if its == MAX_ITERATIONS {
            return Err(LinalgError::NoConvergence { iterations: its });
        }
        if its == 10 || its == 20 {
            // exceptional shift
            shift_acc += x;
            for i in 0..=e {
                h[(i, i)] -= x;
            }
            let s = h[(e, e - 1)].abs() + h[(e - 1, e - 2)].abs();
            x = A::from(0.75f64).unwrap() * s;
            y = x;
            w = A::from(-0.4375f64).unwrap() * s * s;
        }
        its += 1;

        // look for two consecutive small subdiagonal elements
        let mut m = e - 2;
        let (mut p, mut q, mut r);
        loop {
            let z = h[(m, m)];
            let rr = x - z;
            let ss = y - z;
            p = (rr * ss - w) / h[(m + 1, m)] + h[(m, m + 1)];
            q = h[(m + 1, m + 1)] - z - rr - ss;
            r = h[(m + 2, m + 1)];
            let s = p.abs() + q.abs() + r.abs();
            p /= s;
            q /= s;
            r /= s;
            if m == l {
                break;
            }
            let u = h[(m, m - 1)].abs() * (q.abs() + r.abs());
            let v = p.abs() * (h[(m - 1, m - 1)].abs() + z.abs() + h[(m + 1, m + 1)].abs());
            if u + v == v {
                break;
            }
            m -= 1;
        }

        for i in m + 2..=e {
            h[(i, i - 2)] = A::zero();
            if i != m + 2 {
                h[(i, i - 3)] = A::zero();
            }
        }

        // double QR step on rows l..=e and columns m..=e
        for k in m..e {
            if k != m {
                p = h[(k, k - 1)];
                q = h[(k + 1, k - 1)];
                r = if k != e - 1 { h[(k + 2, k - 1)] } else { A::zero() };
                x = p.abs() + q.abs() + r.abs();
                if !x.is_zero() {
                    p /= x;
                    q /= x;
                    r /= x;
                }
            }
            let s = sign((p * p + q * q + r * r).sqrt(), p);
            if s.is_zero() {
                continue;
            }
            if k == m {
                if l != m {
                    h[(k, k - 1)] = -h[(k, k - 1)];
                }
            } else {
                h[(k, k - 1)] = -s * x;
            }
            p += s;
            x = p / s;
            y = q / s;
            let z = r / s;
            q /= p;
            r /= p;

            // row modification
            for j in k..=e {
                let mut pp = h[(k, j)] + q * h[(k + 1, j)];
                if k != e - 1 {
                    pp += r * h[(k + 2, j)];
                    h[(k + 2, j)] -= pp * z;
                }
                h[(k + 1, j)] -= pp * y;
                h[(k, j)] -= pp * x;
            }

            // column modification
            let mmin = if e < k + 3 { e } else { k + 3 };
            for i in l..=mmin {
                let mut pp = x * h[(i, k)] + y * h[(i, k + 1)];
                if k != e - 1 {
                    pp += z * h[(i, k + 2)];
                    h[(i, k + 2)] -= pp * r;
                }
                h[(i, k + 1)] -= pp * q;
                h[(i, k)] -= pp;
            }
        }
    }

    Ok((wr, wi))
}

/// Orders the eigenvalues such that every conjugate pair is adjacent with the member of positive
/// imaginary part first.
fn collect_eigenvalues<A: NdFloat>(wr: Vec<A>, wi: Vec<A>) -> Array1<Complex<A>> {
    let mut out = Vec::with_capacity(wr.len());
    for (&re, &im) in wr.iter().zip(wi.iter()) {
        if im.is_zero() {
            out.push(Complex::new(re, A::zero()));
        } else if im > A::zero() {
            out.push(Complex::new(re, im));
            out.push(Complex::new(re, -im));
        }
    }
    Array1::from(out)
}

/// Eigenvalues of a general square matrix
pub trait EigVals {
    type EigVal;

    /// Computes all eigenvalues. Conjugate pairs are adjacent, positive imaginary part first.
    fn eigvals(&self) -> Result<Self::EigVal>;
}

/// Eigenvalues of a general square matrix, consuming the input
pub trait EigValsInto {
    type EigVal;

    fn eigvals_into(self) -> Result<Self::EigVal>;
}

impl<A: NdFloat> EigValsInto for Array2<A> {
    type EigVal = Array1<Complex<A>>;

    fn eigvals_into(mut self) -> Result<Self::EigVal> {
        hessenberg_inplace(&mut self)?;
        let (wr, wi) = hessenberg_qr(&mut self)?;
        Ok(collect_eigenvalues(wr, wi))
    }
}

impl<A: NdFloat, S: Data<Elem = A>> EigVals for ArrayBase<S, Ix2> {
    type EigVal = Array1<Complex<A>>;

    fn eigvals(&self) -> Result<Self::EigVal> {
        self.to_owned().eigvals_into()
    }
}

/// Eigenvalues `λ` of the pencil `(a, e)`, i.e. `a x = λ e x`, for nonsingular `e`.
///
/// Returns `LinalgError::Singular` if `e` is singular.
pub fn generalized_eigvals<A, S1, S2>(
    a: &ArrayBase<S1, Ix2>,
    e: &ArrayBase<S2, Ix2>,
) -> Result<Array1<Complex<A>>>
where
    A: NdFloat + ComplexFloat,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    let n = check_square(a)?;
    if check_square(e)? != n {
        return Err(LinalgError::WrongRows {
            expected: n,
            actual: e.nrows(),
        });
    }
    e.lu()?.solve(a)?.eigvals_into()
}
