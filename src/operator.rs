//! Linear operators acting on blocks of vectors
//!
//! Vectors are the columns of a matrix, so every operation is batched over columns. Operators
//! only need `apply` and `apply_adjoint`. Those with a dense form also provide `assemble`, and
//! their inverse actions use an LU decomposition of it. The inverse actions of matrix-free
//! operators fall back to GMRES, unless the operator overrides them.

use ndarray::{s, Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2};
use num_complex::Complex64;

use crate::{
    gmres::{gmres, MAX_ITERATIONS, RESTART, TOLERANCE},
    lu::Lu,
    LinalgError, Result,
};

pub(crate) fn check_rows<S: Data>(expected: usize, v: &ArrayBase<S, Ix2>) -> Result<()> {
    if v.nrows() != expected {
        Err(LinalgError::WrongRows {
            expected,
            actual: v.nrows(),
        })
    } else {
        Ok(())
    }
}

fn check_square_op<O: LinearOperator + ?Sized>(op: &O) -> Result<()> {
    if op.source_dim() != op.range_dim() {
        return Err(LinalgError::NotSquare {
            rows: op.range_dim(),
            cols: op.source_dim(),
        });
    }
    Ok(())
}

/// Solves `op(x) = v` column by column with GMRES, `op` acting on blocks of vectors
fn solve_columns<F>(v: ArrayView2<f64>, op: F) -> Result<Array2<f64>>
where
    F: Fn(ArrayView2<f64>) -> Result<Array2<f64>>,
{
    let single = |x: ArrayView1<f64>| -> Result<Array1<f64>> {
        Ok(op(x.insert_axis(Axis(1)))?.column(0).to_owned())
    };
    let mut out = Array2::zeros(v.raw_dim());
    for (mut col, rhs) in out.columns_mut().into_iter().zip(v.columns()) {
        col.assign(&gmres(&single, rhs, TOLERANCE, RESTART, MAX_ITERATIONS)?);
    }
    Ok(out)
}

/// Capabilities of a linear map from a source space of dimension `source_dim` into a range space
/// of dimension `range_dim`
pub trait LinearOperator {
    fn source_dim(&self) -> usize;

    fn range_dim(&self) -> usize;

    /// Whether the operator is linear
    fn linear(&self) -> bool {
        true
    }

    /// Applies the operator to every column of `v`
    fn apply(&self, v: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// Applies the adjoint operator to every column of `v`
    fn apply_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// Dense matrix of the operator, if one is available
    fn assemble(&self) -> Option<Array2<f64>> {
        None
    }

    /// Solves `op(x) = v` for every column of `v`
    fn apply_inverse(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_rows(self.range_dim(), &v)?;
        match self.assemble() {
            Some(matrix) => matrix.lu()?.solve(&v),
            None => {
                check_square_op(self)?;
                solve_columns(v, |x| self.apply(x))
            }
        }
    }

    /// Solves `op^T(x) = v` for every column of `v`
    fn apply_inverse_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_rows(self.source_dim(), &v)?;
        match self.assemble() {
            Some(matrix) => matrix.lu()?.solve_h(&v),
            None => {
                check_square_op(self)?;
                solve_columns(v, |x| self.apply_adjoint(x))
            }
        }
    }

    /// Galerkin projection `v^T op(u)`
    fn apply2(&self, v: ArrayView2<f64>, u: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_rows(self.range_dim(), &v)?;
        Ok(v.t().dot(&self.apply(u)?))
    }
}

/// Operator given by a dense matrix
#[derive(Debug, Clone)]
pub struct MatrixOperator {
    matrix: Array2<f64>,
}

impl MatrixOperator {
    pub fn new(matrix: Array2<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}

impl From<Array2<f64>> for MatrixOperator {
    fn from(matrix: Array2<f64>) -> Self {
        Self::new(matrix)
    }
}

impl LinearOperator for MatrixOperator {
    fn source_dim(&self) -> usize {
        self.matrix.ncols()
    }

    fn range_dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_rows(self.source_dim(), &v)?;
        Ok(self.matrix.dot(&v))
    }

    fn apply_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_rows(self.range_dim(), &v)?;
        Ok(self.matrix.t().dot(&v))
    }

    fn assemble(&self) -> Option<Array2<f64>> {
        Some(self.matrix.clone())
    }
}

/// Identity on a space of dimension `dim`
#[derive(Debug, Clone, Copy)]
pub struct IdentityOperator {
    dim: usize,
}

impl IdentityOperator {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl LinearOperator for IdentityOperator {
    fn source_dim(&self) -> usize {
        self.dim
    }

    fn range_dim(&self) -> usize {
        self.dim
    }

    fn apply(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_rows(self.dim, &v)?;
        Ok(v.to_owned())
    }

    fn apply_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.apply(v)
    }

    fn assemble(&self) -> Option<Array2<f64>> {
        Some(Array2::eye(self.dim))
    }

    fn apply_inverse(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.apply(v)
    }

    fn apply_inverse_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.apply(v)
    }
}

/// Real linear combination `sum_i c_i op_i` of operators sharing source and range
pub struct LincombOperator<'a> {
    operators: Vec<&'a dyn LinearOperator>,
    coefficients: Vec<f64>,
}

impl<'a> LincombOperator<'a> {
    pub fn new(operators: Vec<&'a dyn LinearOperator>, coefficients: Vec<f64>) -> Result<Self> {
        let first = operators.first().ok_or(LinalgError::InvalidEquation(
            "linear combination of no operators",
        ))?;
        if coefficients.len() != operators.len() {
            return Err(LinalgError::InvalidEquation(
                "number of coefficients differs from number of operators",
            ));
        }
        let (source, range) = (first.source_dim(), first.range_dim());
        if operators
            .iter()
            .any(|op| op.source_dim() != source || op.range_dim() != range)
        {
            return Err(LinalgError::InvalidEquation(
                "combined operators act on different spaces",
            ));
        }
        Ok(Self {
            operators,
            coefficients,
        })
    }

    fn combine<F>(&self, rows: usize, v: ArrayView2<f64>, op: F) -> Result<Array2<f64>>
    where
        F: Fn(&dyn LinearOperator, ArrayView2<f64>) -> Result<Array2<f64>>,
    {
        let mut out = Array2::zeros((rows, v.ncols()));
        for (&o, &c) in self.operators.iter().zip(self.coefficients.iter()) {
            out.scaled_add(c, &op(o, v)?);
        }
        Ok(out)
    }
}

impl LinearOperator for LincombOperator<'_> {
    fn source_dim(&self) -> usize {
        self.operators[0].source_dim()
    }

    fn range_dim(&self) -> usize {
        self.operators[0].range_dim()
    }

    fn linear(&self) -> bool {
        self.operators.iter().all(|op| op.linear())
    }

    fn apply(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.combine(self.range_dim(), v, |op, v| op.apply(v))
    }

    fn apply_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.combine(self.source_dim(), v, |op, v| op.apply_adjoint(v))
    }

    fn assemble(&self) -> Option<Array2<f64>> {
        let mut out = Array2::zeros((self.range_dim(), self.source_dim()));
        for (op, &c) in self.operators.iter().zip(self.coefficients.iter()) {
            out.scaled_add(c, &op.assemble()?);
        }
        Some(out)
    }
}

/// Complex shifted operator `A + shift * E` on a square space
///
/// Acts on complex blocks of vectors; the real operators are applied to real and imaginary
/// parts separately.
pub struct ShiftedOperator<'a> {
    a: &'a dyn LinearOperator,
    e: &'a dyn LinearOperator,
    shift: Complex64,
}

impl<'a> ShiftedOperator<'a> {
    pub fn new(a: &'a dyn LinearOperator, e: &'a dyn LinearOperator, shift: Complex64) -> Self {
        Self { a, e, shift }
    }

    pub fn dim(&self) -> usize {
        self.a.source_dim()
    }

    pub fn apply(&self, v: ArrayView2<Complex64>) -> Result<Array2<Complex64>> {
        let (re, im) = (v.mapv(|x| x.re), v.mapv(|x| x.im));
        let av = complexify(&self.a.apply(re.view())?, &self.a.apply(im.view())?);
        let ev = complexify(&self.e.apply(re.view())?, &self.e.apply(im.view())?);
        Ok(av + ev * self.shift)
    }

    /// Dense complex matrix `A + shift * E`
    pub fn assemble(&self) -> Result<Array2<Complex64>> {
        let a = self.a.assemble().ok_or(LinalgError::NotAssemblable)?;
        let e = self.e.assemble().ok_or(LinalgError::NotAssemblable)?;
        Ok(a.mapv(Complex64::from) + e.mapv(|x| self.shift * x))
    }

    /// Solves `(A + shift * E) x = v` for every column of the real block `v`
    pub fn apply_inverse(&self, v: ArrayView2<f64>) -> Result<Array2<Complex64>> {
        check_rows(self.dim(), &v)?;
        match self.assemble() {
            Ok(matrix) => matrix.lu()?.solve(&v.mapv(Complex64::from)),
            Err(LinalgError::NotAssemblable) => {
                self.solve_real_form(v, self.shift, |op, x| op.apply(x))
            }
            Err(err) => Err(err),
        }
    }

    /// Solves `(A + shift * E)^H x = v` for every column of the real block `v`
    pub fn apply_inverse_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<Complex64>> {
        check_rows(self.dim(), &v)?;
        match self.assemble() {
            Ok(matrix) => matrix.lu()?.solve_h(&v.mapv(Complex64::from)),
            Err(LinalgError::NotAssemblable) => {
                self.solve_real_form(v, self.shift.conj(), |op, x| op.apply_adjoint(x))
            }
            Err(err) => Err(err),
        }
    }

    /// Solves `(op(A) + shift * op(E)) x = v` by GMRES on the equivalent real system
    ///
    /// With `x = p + i q` and `shift = α + i β` the system reads
    /// `[op(A) + α op(E), -β op(E); β op(E), op(A) + α op(E)] [p; q] = [v; 0]`.
    fn solve_real_form<F>(
        &self,
        v: ArrayView2<f64>,
        shift: Complex64,
        op: F,
    ) -> Result<Array2<Complex64>>
    where
        F: Fn(&dyn LinearOperator, ArrayView2<f64>) -> Result<Array2<f64>>,
    {
        let n = self.dim();
        let (alpha, beta) = (shift.re, shift.im);
        let stacked = |x: ArrayView2<f64>| -> Result<Array2<f64>> {
            // columns of `x` are `[p; q]`, the blocks `[p q]` are applied at once
            let k = x.ncols();
            let mut pq = Array2::zeros((n, 2 * k));
            pq.slice_mut(s![.., ..k]).assign(&x.slice(s![..n, ..]));
            pq.slice_mut(s![.., k..]).assign(&x.slice(s![n.., ..]));
            let apq = op(self.a, pq.view())?;
            let epq = op(self.e, pq.view())?;
            let (ep, eq) = (epq.slice(s![.., ..k]), epq.slice(s![.., k..]));

            let mut out = Array2::zeros((2 * n, k));
            let mut top = &apq.slice(s![.., ..k]) + &(&ep * alpha);
            top.scaled_add(-beta, &eq);
            let mut bottom = &apq.slice(s![.., k..]) + &(&eq * alpha);
            bottom.scaled_add(beta, &ep);
            out.slice_mut(s![..n, ..]).assign(&top);
            out.slice_mut(s![n.., ..]).assign(&bottom);
            Ok(out)
        };

        let mut rhs = Array2::zeros((2 * n, v.ncols()));
        rhs.slice_mut(s![..n, ..]).assign(&v);
        let pq = solve_columns(rhs.view(), stacked)?;
        Ok(complexify(
            &pq.slice(s![..n, ..]).to_owned(),
            &pq.slice(s![n.., ..]).to_owned(),
        ))
    }
}

fn complexify(re: &Array2<f64>, im: &Array2<f64>) -> Array2<Complex64> {
    Array2::from_shape_fn(re.dim(), |idx| Complex64::new(re[idx], im[idx]))
}
