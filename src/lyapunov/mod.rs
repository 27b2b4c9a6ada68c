//! Low-rank solution of large-scale Lyapunov equations
//!
//! Solves
//! ```text
//! A X E^T + E X A^T + B B^T = 0        (trans = false)
//! A^T X E + E^T X A + B^T B = 0        (trans = true)
//! ```
//! for a low-rank factor `Z` with `Z Z^T ≈ X`. `A` has to be stable, i.e. all eigenvalues of the
//! pencil `(A, E)` lie in the open left half-plane. The only solver is the low-rank ADI
//! iteration ([`Lradi`]), whose shift parameters are generated by projecting the pencil onto
//! spaces spanned by its own iterates ([`shifts`]).
//!
//! ```rust
//! use ndarray::array;
//! use ndarray_lyapunov::{solve_lyap, MatrixOperator};
//!
//! let a = MatrixOperator::new(array![[-1., 0.], [0., -2.]]);
//! let b = MatrixOperator::new(array![[1.], [1.]]);
//!
//! let z = solve_lyap(&a, None, &b, false, None).unwrap();
//! assert_eq!(z.dim(), 2);
//! ```
mod lradi;
pub mod shifts;

use ndarray::Array2;
use rand::Rng;

use crate::{operator::LinearOperator, vector_array::VectorArray, LinalgError, Result};

pub use lradi::{lradi, Lradi, LradiSolution};
pub use shifts::ShiftSet;

/// Generate random array with entries uniform in `[0, 1)`
pub(crate) fn random<R: Rng>(sh: (usize, usize), rng: &mut R) -> Array2<f64> {
    Array2::from_shape_fn(sh, |_| rng.gen::<f64>())
}

/// Options of the projection shift strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionShiftOptions {
    /// Number of trailing shift blocks of `Z` spanning the projection space
    pub z_columns: usize,
    /// Maximal number of attempts to find initial shifts
    pub init_maxiter: usize,
    /// Seed of the random subspaces used when the right-hand side yields no stable shift
    pub init_seed: Option<u64>,
    /// Reconstruct the projected pencil from the ADI recurrence instead of applying `A`
    pub implicit_subspace: bool,
}

impl Default for ProjectionShiftOptions {
    fn default() -> Self {
        Self {
            z_columns: 1,
            init_maxiter: 20,
            init_seed: None,
            implicit_subspace: true,
        }
    }
}

impl ProjectionShiftOptions {
    pub fn z_columns(mut self, z_columns: usize) -> Self {
        self.z_columns = z_columns;

        self
    }

    pub fn init_maxiter(mut self, init_maxiter: usize) -> Self {
        self.init_maxiter = init_maxiter;

        self
    }

    pub fn init_seed(mut self, init_seed: Option<u64>) -> Self {
        self.init_seed = init_seed;

        self
    }

    pub fn implicit_subspace(mut self, implicit_subspace: bool) -> Self {
        self.implicit_subspace = implicit_subspace;

        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.z_columns == 0 {
            return Err(LinalgError::UnsupportedConfiguration(
                "z_columns must be positive".into(),
            ));
        }
        if self.init_maxiter == 0 {
            return Err(LinalgError::UnsupportedConfiguration(
                "init_maxiter must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Strategy generating the shift parameters of the ADI iteration
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ShiftStrategy {
    /// Galerkin projection onto spaces spanned by the iterates
    Projection(ProjectionShiftOptions),
}

impl Default for ShiftStrategy {
    fn default() -> Self {
        ShiftStrategy::Projection(ProjectionShiftOptions::default())
    }
}

impl ShiftStrategy {
    /// Strategy with default options by its name, only `"projection_shifts"` is known
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "projection_shifts" => Ok(Self::default()),
            _ => Err(LinalgError::UnsupportedConfiguration(format!(
                "unknown lradi shift strategy `{}`",
                name
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ShiftStrategy::Projection(options) => options.validate(),
        }
    }
}

/// Options of the low-rank ADI iteration
#[derive(Debug, Clone, PartialEq)]
pub struct LradiOptions {
    /// Relative tolerance of the residual norm
    pub tol: f64,
    /// Maximal number of consumed shifts
    pub maxiter: usize,
    pub shifts: ShiftStrategy,
}

impl Default for LradiOptions {
    fn default() -> Self {
        Self {
            tol: 1e-10,
            maxiter: 500,
            shifts: ShiftStrategy::default(),
        }
    }
}

impl LradiOptions {
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;

        self
    }

    pub fn maxiter(mut self, maxiter: usize) -> Self {
        self.maxiter = maxiter;

        self
    }

    pub fn shifts(mut self, shifts: ShiftStrategy) -> Self {
        self.shifts = shifts;

        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tol.is_finite() && self.tol >= 0.) {
            return Err(LinalgError::UnsupportedConfiguration(format!(
                "invalid tolerance {}",
                self.tol
            )));
        }
        self.shifts.validate()
    }
}

/// Options selecting the Lyapunov solver
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum LyapSolverOptions {
    /// Low-rank ADI iteration
    Lradi(LradiOptions),
}

impl Default for LyapSolverOptions {
    fn default() -> Self {
        LyapSolverOptions::Lradi(LradiOptions::default())
    }
}

impl LyapSolverOptions {
    /// Solver with default options by its type name, only `"lradi"` is known
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "lradi" => Ok(Self::default()),
            _ => Err(LinalgError::UnsupportedConfiguration(format!(
                "unknown Lyapunov solver type `{}`",
                name
            ))),
        }
    }
}

/// Checks that `A`, `E` and `B` form a well-posed Lyapunov equation
pub(crate) fn check_args(
    a: &dyn LinearOperator,
    e: Option<&dyn LinearOperator>,
    b: &dyn LinearOperator,
    trans: bool,
) -> Result<()> {
    if !a.linear() || !b.linear() || e.map_or(false, |e| !e.linear()) {
        return Err(LinalgError::NotLinear);
    }
    let n = a.source_dim();
    if a.range_dim() != n {
        return Err(LinalgError::InvalidEquation("A is not square"));
    }
    if !trans && b.range_dim() != n {
        return Err(LinalgError::InvalidEquation(
            "range of B differs from the space of A",
        ));
    }
    if trans && b.source_dim() != n {
        return Err(LinalgError::InvalidEquation(
            "source of B differs from the space of A",
        ));
    }
    if let Some(e) = e {
        if e.source_dim() != n || e.range_dim() != n {
            return Err(LinalgError::InvalidEquation(
                "E does not act on the space of A",
            ));
        }
    }
    Ok(())
}

/// Computes a low-rank factor `Z` of the solution of a Lyapunov equation
///
/// `E = None` stands for the identity. Without `options` the low-rank ADI iteration with
/// default options is used. The selected solver validates the equation.
pub fn solve_lyap(
    a: &dyn LinearOperator,
    e: Option<&dyn LinearOperator>,
    b: &dyn LinearOperator,
    trans: bool,
    options: Option<&LyapSolverOptions>,
) -> Result<VectorArray> {
    match options.cloned().unwrap_or_default() {
        LyapSolverOptions::Lradi(options) => lradi(a, e, b, trans, &options),
    }
}
