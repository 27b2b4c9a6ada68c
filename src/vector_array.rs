//! Growable arrays of vectors

use ndarray::{s, Array2, ArrayBase, ArrayView2, ArrayViewMut2, Data, Ix2, ShapeBuilder};

use crate::{
    operator::{check_rows, LinearOperator},
    LinalgError, Result,
};

/// Ordered sequence of vectors of dimension `dim`
///
/// The vectors are stored contiguously as the columns of a column-major matrix, so appending
/// never moves existing data as long as the reserved capacity suffices.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorArray {
    dim: usize,
    len: usize,
    data: Vec<f64>,
}

impl VectorArray {
    /// Empty array with room for `reserve` vectors
    pub fn empty(dim: usize, reserve: usize) -> Self {
        Self {
            dim,
            len: 0,
            data: Vec::with_capacity(dim * reserve),
        }
    }

    /// Array holding the columns of `v`
    pub fn from_array<S: Data<Elem = f64>>(v: &ArrayBase<S, Ix2>) -> Self {
        let mut out = Self::empty(v.nrows(), v.ncols());
        out.push_columns(v);
        out
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of vectors the array can hold without reallocating
    pub fn capacity(&self) -> usize {
        if self.dim == 0 {
            usize::MAX
        } else {
            self.data.capacity() / self.dim
        }
    }

    fn push_columns<S: Data<Elem = f64>>(&mut self, v: &ArrayBase<S, Ix2>) {
        for col in v.columns() {
            self.data.extend(col.iter());
        }
        self.len += v.ncols();
    }

    /// Appends the columns of `v`
    pub fn append<S: Data<Elem = f64>>(&mut self, v: &ArrayBase<S, Ix2>) -> Result<()> {
        check_rows(self.dim, v)?;
        self.push_columns(v);
        Ok(())
    }

    /// The vectors as columns of a `dim x len` matrix
    pub fn view(&self) -> ArrayView2<'_, f64> {
        // shape is maintained by every mutation
        ArrayView2::from_shape((self.dim, self.len).f(), &self.data).unwrap()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        ArrayViewMut2::from_shape((self.dim, self.len).f(), &mut self.data).unwrap()
    }

    pub fn to_array(&self) -> Array2<f64> {
        self.view().to_owned()
    }

    /// The last `count` vectors
    pub fn last(&self, count: usize) -> Result<ArrayView2<'_, f64>> {
        if count > self.len {
            return Err(LinalgError::WrongColumns {
                expected: count,
                actual: self.len,
            });
        }
        Ok(self.view().slice_move(s![.., self.len - count..]))
    }

    /// Matrix of pairwise Euclidean inner products
    pub fn gramian(&self) -> Array2<f64> {
        let v = self.view();
        v.t().dot(&v)
    }

    /// Matrix of pairwise inner products `self_i^T product(other_j)`
    pub fn inner(
        &self,
        other: &VectorArray,
        product: Option<&dyn LinearOperator>,
    ) -> Result<Array2<f64>> {
        if other.dim != self.dim {
            return Err(LinalgError::WrongRows {
                expected: self.dim,
                actual: other.dim,
            });
        }
        match product {
            None => Ok(self.view().t().dot(&other.view())),
            Some(op) => op.apply2(self.view(), other.view()),
        }
    }

    /// Linear combinations of the vectors, one for every column of `coefficients`
    pub fn lincomb<S: Data<Elem = f64>>(
        &self,
        coefficients: &ArrayBase<S, Ix2>,
    ) -> Result<VectorArray> {
        check_rows(self.len, coefficients)?;
        Ok(Self::from_array(&self.view().dot(coefficients)))
    }

    /// Scales all vectors by `alpha`
    pub fn scal(&mut self, alpha: f64) {
        self.data.iter_mut().for_each(|x| *x *= alpha);
    }

    /// Adds `alpha * x` to the vectors, column by column
    pub fn axpy<S: Data<Elem = f64>>(&mut self, alpha: f64, x: &ArrayBase<S, Ix2>) -> Result<()> {
        check_rows(self.dim, x)?;
        if x.ncols() != self.len {
            return Err(LinalgError::WrongColumns {
                expected: self.len,
                actual: x.ncols(),
            });
        }
        self.view_mut().scaled_add(alpha, x);
        Ok(())
    }
}

impl From<Array2<f64>> for VectorArray {
    fn from(v: Array2<f64>) -> Self {
        Self::from_array(&v)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;
    use crate::operator::MatrixOperator;

    #[test]
    fn append_and_view() {
        let mut z = VectorArray::empty(3, 4);
        assert!(z.is_empty());
        assert_eq!(z.view().dim(), (3, 0));
        let ptr = z.data.as_ptr();

        z.append(&array![[1., 4.], [2., 5.], [3., 6.]]).unwrap();
        z.append(&array![[7.], [8.], [9.]]).unwrap();
        assert_eq!(z.len(), 3);
        assert_eq!(z.view(), array![[1., 4., 7.], [2., 5., 8.], [3., 6., 9.]]);
        assert_eq!(z.last(2).unwrap(), array![[4., 7.], [5., 8.], [6., 9.]]);
        assert_eq!(z.last(0).unwrap().dim(), (3, 0));
        // no reallocation within the reserved capacity
        assert_eq!(z.data.as_ptr(), ptr);

        assert!(matches!(
            z.append(&array![[1.], [2.]]),
            Err(LinalgError::WrongRows {
                expected: 3,
                actual: 2
            })
        ));
        assert!(z.last(4).is_err());
    }

    #[test]
    fn products() {
        let v = VectorArray::from(array![[1., 0.], [1., 2.]]);
        assert_eq!(v.gramian(), array![[2., 2.], [2., 4.]]);

        let product = MatrixOperator::new(array![[2., 0.], [0., 1.]]);
        let w = VectorArray::from(array![[1.], [1.]]);
        assert_eq!(v.inner(&w, None).unwrap(), array![[2.], [2.]]);
        assert_eq!(v.inner(&w, Some(&product)).unwrap(), array![[3.], [2.]]);

        let c = v.lincomb(&array![[1.], [-0.5]]).unwrap();
        assert_eq!(c.to_array(), array![[1.], [0.]]);
    }

    #[test]
    fn in_place_updates() {
        let mut w = VectorArray::from(array![[1., 2.], [3., 4.]]);
        w.scal(2.);
        assert_eq!(w.to_array(), array![[2., 4.], [6., 8.]]);
        w.axpy(-0.5, &array![[4., 8.], [12., 16.]]).unwrap();
        assert_abs_diff_eq!(w.to_array(), Array2::zeros((2, 2)));
        assert!(w.axpy(1., &array![[1.], [1.]]).is_err());
    }
}
