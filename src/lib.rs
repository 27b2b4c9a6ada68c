//! Low-rank solvers for large-scale Lyapunov equations on top of `ndarray`.
//!
//! The central routine is the low-rank ADI iteration in [`lyapunov`], which computes a tall and
//! skinny factor `Z` with `Z Z^T ≈ X` for
//! ```text
//! A X E^T + E X A^T + B B^T = 0
//! ```
//! The operators only need to implement [`operator::LinearOperator`], so the dense form of `A`
//! never has to be materialized by the iteration itself. The small dense kernels the iteration
//! relies on (LU, symmetric and general eigenvalue problems, Gram-Schmidt) are implemented in
//! pure Rust as extension traits on `ndarray` arrays.

pub mod eig;
pub mod eigh;
pub mod gmres;
pub mod gram_schmidt;
mod householder;
pub mod lu;
pub mod lyapunov;
pub mod norm;
pub mod operator;
pub mod vector_array;

use ndarray::{ArrayBase, Ix2, RawData};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LinalgError {
    /// Non-square matrix
    #[error("Matrix with {rows} rows and {cols} cols is not square")]
    NotSquare { rows: usize, cols: usize },
    /// Unexpected number of rows
    #[error("Expected {expected} rows, got {actual} rows")]
    WrongRows { expected: usize, actual: usize },
    /// Unexpected number of columns
    #[error("Expected {expected} columns, got {actual} columns")]
    WrongColumns { expected: usize, actual: usize },
    /// Exactly zero pivot during an LU factorization
    #[error("Matrix is singular, zero pivot in column {pivot}")]
    Singular { pivot: usize },
    /// An eigenvalue iteration ran out of iterations
    #[error("Eigenvalue iteration did not converge within {iterations} iterations")]
    NoConvergence { iterations: usize },
    /// Dense form requested from an operator that has none
    #[error("Operator cannot be assembled into a dense matrix")]
    NotAssemblable,
    /// Operator is not linear
    #[error("Operator is not linear")]
    NotLinear,
    /// Malformed equation, e.g. mismatching operator spaces
    #[error("Invalid equation: {0}")]
    InvalidEquation(&'static str),
    /// Unknown solver type, unknown shift strategy or invalid option value
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    /// No stable initial shift could be found
    #[error("Could not generate initial ADI shifts after {attempts} attempts")]
    ShiftGeneration { attempts: usize },
}

pub type Result<T> = std::result::Result<T, LinalgError>;

pub(crate) fn check_square<S: RawData>(arr: &ArrayBase<S, Ix2>) -> Result<usize> {
    let (n, m) = (arr.nrows(), arr.ncols());
    if n != m {
        Err(LinalgError::NotSquare { rows: n, cols: m })
    } else {
        Ok(n)
    }
}

pub use lyapunov::{
    lradi, solve_lyap, Lradi, LradiOptions, LradiSolution, LyapSolverOptions,
    ProjectionShiftOptions, ShiftStrategy,
};
pub use operator::{IdentityOperator, LincombOperator, LinearOperator, MatrixOperator};
pub use vector_array::VectorArray;
