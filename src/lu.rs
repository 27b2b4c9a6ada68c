//! LU decomposition with partial pivoting
//!
//! Works for real as well as complex scalars, which is needed for the shifted systems
//! `(A + σE) V = W` of the ADI iteration when `σ` is complex.

use ndarray::{Array2, ArrayBase, Data, Ix2};
use num_complex::ComplexFloat;
use num_traits::Zero;

use crate::{check_square, LinalgError, Result};

/// LU decomposition `P * A = L * U` of a square matrix
#[derive(Debug, Clone)]
pub struct LuDecomp<A> {
    // strict lower part holds L (unit diagonal implied), upper part holds U
    lu: Array2<A>,
    // row `i` of `P * A` is row `perm[i]` of `A`
    perm: Vec<usize>,
}

pub trait LuInto {
    type Decomp;

    /// Computes the decomposition, consuming the matrix.
    fn lu_into(self) -> Result<Self::Decomp>;
}

pub trait Lu {
    type Decomp;

    /// Computes the decomposition without modifying the matrix.
    fn lu(&self) -> Result<Self::Decomp>;
}

impl<A: ComplexFloat> LuInto for Array2<A> {
    type Decomp = LuDecomp<A>;

    fn lu_into(mut self) -> Result<Self::Decomp> {
        let n = check_square(&self)?;
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let mut pivot = k;
            let mut pivot_abs = self[(k, k)].abs();
            for i in k + 1..n {
                let v = self[(i, k)].abs();
                if v > pivot_abs {
                    pivot = i;
                    pivot_abs = v;
                }
            }
            if pivot_abs.is_zero() {
                return Err(LinalgError::Singular { pivot: k });
            }
            if pivot != k {
                for j in 0..n {
                    self.swap((k, j), (pivot, j));
                }
                perm.swap(k, pivot);
            }

            let diag = self[(k, k)];
            for i in k + 1..n {
                let l = self[(i, k)] / diag;
                self[(i, k)] = l;
                if l.is_zero() {
                    continue;
                }
                for j in k + 1..n {
                    let u = self[(k, j)];
                    self[(i, j)] = self[(i, j)] - l * u;
                }
            }
        }

        Ok(LuDecomp { lu: self, perm })
    }
}

impl<A: ComplexFloat, S: Data<Elem = A>> Lu for ArrayBase<S, Ix2> {
    type Decomp = LuDecomp<A>;

    fn lu(&self) -> Result<Self::Decomp> {
        self.to_owned().lu_into()
    }
}

impl<A: ComplexFloat> LuDecomp<A> {
    pub fn dim(&self) -> usize {
        self.perm.len()
    }

    /// Solves `A * x = b` for every column of `b`.
    pub fn solve<S: Data<Elem = A>>(&self, b: &ArrayBase<S, Ix2>) -> Result<Array2<A>> {
        let n = self.dim();
        if b.nrows() != n {
            return Err(LinalgError::WrongRows {
                expected: n,
                actual: b.nrows(),
            });
        }

        let mut x = Array2::from_shape_fn(b.dim(), |(i, j)| b[(self.perm[i], j)]);
        for mut col in x.columns_mut() {
            // L y = P b
            for i in 0..n {
                let mut s = col[i];
                for k in 0..i {
                    s = s - self.lu[(i, k)] * col[k];
                }
                col[i] = s;
            }
            // U x = y
            for i in (0..n).rev() {
                let mut s = col[i];
                for k in i + 1..n {
                    s = s - self.lu[(i, k)] * col[k];
                }
                col[i] = s / self.lu[(i, i)];
            }
        }
        Ok(x)
    }

    /// Solves `A^H * x = b` for every column of `b`, where `A^H` is the conjugate transpose.
    pub fn solve_h<S: Data<Elem = A>>(&self, b: &ArrayBase<S, Ix2>) -> Result<Array2<A>> {
        let n = self.dim();
        if b.nrows() != n {
            return Err(LinalgError::WrongRows {
                expected: n,
                actual: b.nrows(),
            });
        }

        let mut z = b.to_owned();
        for mut col in z.columns_mut() {
            // U^H y = b
            for i in 0..n {
                let mut s = col[i];
                for k in 0..i {
                    s = s - self.lu[(k, i)].conj() * col[k];
                }
                col[i] = s / self.lu[(i, i)].conj();
            }
            // L^H z = y
            for i in (0..n).rev() {
                let mut s = col[i];
                for k in i + 1..n {
                    s = s - self.lu[(k, i)].conj() * col[k];
                }
                col[i] = s;
            }
        }

        // P x = z
        let mut x = Array2::zeros(z.dim());
        for (i, &p) in self.perm.iter().enumerate() {
            x.row_mut(p).assign(&z.row(i));
        }
        Ok(x)
    }

    /// Determinant of the decomposed matrix
    pub fn det(&self) -> A {
        let mut det = A::one();
        for i in 0..self.dim() {
            det = det * self.lu[(i, i)];
        }
        // sign of the permutation from its cycle decomposition
        let mut visited = vec![false; self.dim()];
        for start in 0..self.dim() {
            if visited[start] {
                continue;
            }
            let mut len = 0;
            let mut i = start;
            while !visited[i] {
                visited[i] = true;
                i = self.perm[i];
                len += 1;
            }
            if len % 2 == 0 {
                det = -det;
            }
        }
        det
    }
}
