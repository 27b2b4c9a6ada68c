//! Norms of vectors and matrices

use ndarray::{prelude::*, Data};

use crate::{eigh::EighInto, Result};

/// Entry-wise norms, treating the whole array as one big vector.
pub trait Norm {
    type Output;

    /// L-1 norm
    fn norm_l1(&self) -> Self::Output;
    /// L-2 (Frobenius) norm
    fn norm_l2(&self) -> Self::Output;
    /// Maximum norm (L-infinite)
    fn norm_max(&self) -> Self::Output;
}

impl<A, S, D> Norm for ArrayBase<S, D>
where
    A: NdFloat + std::iter::Sum,
    S: Data<Elem = A>,
    D: Dimension,
{
    type Output = A;

    fn norm_l1(&self) -> Self::Output {
        self.iter().map(|x| x.abs()).sum()
    }

    fn norm_l2(&self) -> Self::Output {
        // scale first so that large entries do not overflow when squared
        let scale = self.norm_max();
        if scale.is_zero() {
            return scale;
        }
        self.iter().map(|&x| (x / scale) * (x / scale)).sum::<A>().sqrt() * scale
    }

    fn norm_max(&self) -> Self::Output {
        self.iter().fold(A::zero(), |f, &val| val.abs().max(f))
    }
}

/// Operator norms of symmetric matrices
pub trait SymmetricNorm {
    type Output;

    /// Spectral norm (largest singular value) of a symmetric matrix, i.e. the largest absolute
    /// eigenvalue. Only the lower triangle is read.
    fn norm_spectral_sym(&self) -> Result<Self::Output>;
}

impl<A, S> SymmetricNorm for ArrayBase<S, Ix2>
where
    A: NdFloat,
    S: Data<Elem = A>,
{
    type Output = A;

    fn norm_spectral_sym(&self) -> Result<A> {
        if self.is_empty() {
            return Ok(A::zero());
        }
        let vals = self.to_owned().eigvalsh_into()?;
        Ok(vals.iter().fold(A::zero(), |m, &v| m.max(v.abs())))
    }
}
