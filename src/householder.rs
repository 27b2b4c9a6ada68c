use ndarray::{
    linalg::{general_mat_mul, general_mat_vec_mul},
    s, Array1, Array2, ArrayBase, Axis, Data, DataMut, Ix1, Ix2, NdFloat,
};

/// Reflection with respect to the hyperplane orthogonal to a unit vector
pub struct Reflection<A, D: Data<Elem = A>> {
    axis: ArrayBase<D, Ix1>,
}

impl<A: NdFloat, D: Data<Elem = A>> Reflection<A, D> {
    /// `axis` must be a unit vector
    pub fn new(axis: ArrayBase<D, Ix1>) -> Self {
        Self { axis }
    }

    /// Computes `H * rhs` in place
    pub fn reflect_cols<M: DataMut<Elem = A>>(&self, rhs: &mut ArrayBase<M, Ix2>) {
        let m_two = A::from(-2.0f64).unwrap();
        for mut col in rhs.columns_mut() {
            let factor = self.axis.dot(&col) * m_two;
            col.scaled_add(factor, &self.axis);
        }
    }

    /// Computes `lhs * H` in place
    ///
    /// Length of `work` must equal the rows of `lhs`.
    pub fn reflect_rows<M1: DataMut<Elem = A>, M2: DataMut<Elem = A>>(
        &self,
        lhs: &mut ArrayBase<M1, Ix2>,
        work: &mut ArrayBase<M2, Ix1>,
    ) {
        // work = lhs * axis
        general_mat_vec_mul(A::one(), lhs, &self.axis, A::zero(), work);
        let m_two = A::from(-2.0f64).unwrap();
        // lhs -= 2 * work * axis.t
        general_mat_mul(
            m_two,
            &work.view().insert_axis(Axis(1)),
            &self.axis.view().insert_axis(Axis(0)),
            A::one(),
            lhs,
        );
    }
}

/// Turns `col` into the unit axis of the Householder reflection mapping `col` onto a multiple of
/// the first unit vector.
///
/// Returns the first component of the reflected column, or `None` for a zero column.
pub fn reflection_axis_mut<A: NdFloat, S: DataMut<Elem = A>>(
    col: &mut ArrayBase<S, Ix1>,
) -> Option<A> {
    let reflection_norm_sq = col.dot(col);
    let reflection_norm = reflection_norm_sq.sqrt();

    let first = col[0];
    let signed_norm = first.signum() * reflection_norm;
    col[0] += signed_norm;
    // norm(col)^2 after the update
    let new_norm_sq =
        (reflection_norm_sq + first.abs() * reflection_norm) * A::from(2.0f64).unwrap();

    if !new_norm_sq.is_zero() {
        *col /= new_norm_sq.sqrt();
        Some(-signed_norm)
    } else {
        None
    }
}

/// Applies the similarity transform `H * M * H` that clears column `icol` of the square `matrix`
/// below its first subdiagonal entry.
pub fn hessenberg_step<A: NdFloat>(matrix: &mut Array2<A>, icol: usize) {
    let n = matrix.nrows();
    if icol + 2 >= n {
        return;
    }

    let mut axis = matrix.slice(s![icol + 1.., icol]).to_owned();
    if let Some(sub) = reflection_axis_mut(&mut axis) {
        let refl = Reflection::new(axis.view());
        refl.reflect_cols(&mut matrix.slice_mut(s![icol + 1.., icol..]));
        let mut work = Array1::zeros(n);
        refl.reflect_rows(&mut matrix.slice_mut(s![.., icol + 1..]), &mut work);

        matrix[(icol + 1, icol)] = sub;
        matrix.slice_mut(s![icol + 2.., icol]).fill(A::zero());
    }
}
