//! Low-rank ADI iteration
//!
//! See Algorithm 4.3 in P. Kürschner, *Efficient Low-Rank Solution of Large-Scale Matrix
//! Equations*, Dissertation, Otto-von-Guericke-Universität Magdeburg, 2016.

use ndarray::Array2;
use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use super::{
    check_args,
    shifts::{projection_shifts, projection_shifts_init, ShiftSet},
    LradiOptions, ShiftStrategy,
};
use crate::{
    norm::SymmetricNorm,
    operator::{IdentityOperator, LincombOperator, LinearOperator, ShiftedOperator},
    vector_array::VectorArray,
    Result,
};

/// Outcome of a low-rank ADI run
#[derive(Debug, Clone, PartialEq)]
pub struct LradiSolution {
    /// Low-rank factor of the solution
    pub z: VectorArray,
    /// All generated shifts, including those not consumed
    pub shifts: ShiftSet,
    /// Number of consumed shift entries, a complex pair counts twice
    pub steps: usize,
    /// Residual norm relative to the initial one after every step
    pub relative_residuals: Vec<f64>,
    /// Whether the relative residual reached the tolerance
    pub converged: bool,
}

/// Low-rank ADI solver
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use ndarray_lyapunov::{Lradi, LradiOptions, MatrixOperator};
/// use rand::SeedableRng;
/// use rand_xoshiro::Xoshiro256Plus;
///
/// let a = MatrixOperator::new(array![[-1., 0., 0.], [0., -2., 0.], [0., 0., -3.]]);
/// let b = MatrixOperator::new(array![[1.], [1.], [1.]]);
///
/// let options = LradiOptions::default().tol(1e-8).maxiter(50);
/// let mut solver = Lradi::new_with_rng(options, Xoshiro256Plus::seed_from_u64(42)).unwrap();
/// let sol = solver.solve(&a, None, &b, false).unwrap();
/// assert!(sol.converged);
/// ```
#[derive(Debug, Clone)]
pub struct Lradi<R: Rng> {
    options: LradiOptions,
    rng: R,
}

impl Lradi<Xoshiro256Plus> {
    /// Solver drawing its random subspaces from a generator seeded with `init_seed`, or from
    /// system entropy if no seed is set
    pub fn new(options: LradiOptions) -> Result<Self> {
        let seed = match &options.shifts {
            ShiftStrategy::Projection(shift_options) => shift_options.init_seed,
        };
        let rng = match seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        Self::new_with_rng(options, rng)
    }
}

impl<R: Rng> Lradi<R> {
    /// Solver drawing its random subspaces from `rng`
    ///
    /// Fails with `UnsupportedConfiguration` if the options are invalid.
    pub fn new_with_rng(options: LradiOptions, rng: R) -> Result<Self> {
        options.validate()?;
        Ok(Lradi { options, rng })
    }

    pub fn options(&self) -> &LradiOptions {
        &self.options
    }

    /// Runs the iteration for `A X E^T + E X A^T + B B^T = 0`, or for the dual equation if
    /// `trans` is set.
    ///
    /// Running out of iterations is not an error: the factor computed so far is returned with
    /// `converged` unset.
    pub fn solve(
        &mut self,
        a: &dyn LinearOperator,
        e: Option<&dyn LinearOperator>,
        b: &dyn LinearOperator,
        trans: bool,
    ) -> Result<LradiSolution> {
        check_args(a, e, b, trans)?;
        let ShiftStrategy::Projection(shift_options) = &self.options.shifts;
        let (tol, maxiter) = (self.options.tol, self.options.maxiter);

        let n = a.source_dim();
        let identity = IdentityOperator::new(n);
        let e = e.unwrap_or(&identity);

        let w = if !trans {
            b.apply(Array2::eye(b.source_dim()).view())?
        } else {
            b.apply_adjoint(Array2::eye(b.range_dim()).view())?
        };
        let r = w.ncols();
        let mut w = VectorArray::from(w);
        // a complex pair in the last step adds one block beyond maxiter
        let mut z = VectorArray::empty(n, r * (maxiter + 1));

        let init_res = w.gramian().norm_spectral_sym()?;
        if init_res == 0. {
            return Ok(LradiSolution {
                z,
                shifts: ShiftSet::default(),
                steps: 0,
                relative_residuals: Vec::new(),
                converged: true,
            });
        }
        let btol = init_res * tol;

        let mut shifts =
            projection_shifts_init(a, e, w.view(), trans, shift_options, &mut self.rng)?;
        let mut res = init_res;
        let mut relative_residuals = Vec::new();
        let mut j = 0;

        while res > btol && j < maxiter {
            let shift = shifts[j];
            if shift.im == 0. {
                real_step(a, e, shift.re, &mut w, &mut z, trans)?;
                j += 1;
            } else {
                complex_step(a, e, shift, &mut w, &mut z, trans)?;
                j += 2;
            }
            if j >= shifts.len() {
                shifts = projection_shifts(a, e, &z, w.view(), &shifts, trans, shift_options)?;
            }
            res = w.gramian().norm_spectral_sym()?;
            log::info!("Relative residual at step {}: {:.5e}", j, res / init_res);
            relative_residuals.push(res / init_res);
        }

        let converged = res <= btol;
        if !converged {
            log::warn!(
                "Prescribed relative residual tolerance was not achieved ({:e} > {:e}) after {} ADI steps.",
                res / init_res,
                tol,
                maxiter
            );
        }

        Ok(LradiSolution {
            z,
            shifts,
            steps: j,
            relative_residuals,
            converged,
        })
    }
}

/// Step with a real shift `sigma`, appending one block to `z`
fn real_step(
    a: &dyn LinearOperator,
    e: &dyn LinearOperator,
    sigma: f64,
    w: &mut VectorArray,
    z: &mut VectorArray,
    trans: bool,
) -> Result<()> {
    let shifted = LincombOperator::new(vec![a, e], vec![1., sigma])?;
    let (v, ev) = if !trans {
        let v = shifted.apply_inverse(w.view())?;
        let ev = e.apply(v.view())?;
        (v, ev)
    } else {
        let v = shifted.apply_inverse_adjoint(w.view())?;
        let ev = e.apply_adjoint(v.view())?;
        (v, ev)
    };
    w.axpy(-2. * sigma, &ev)?;
    z.append(&(v * (-2. * sigma).sqrt()))
}

/// Step with the complex pair `(shift, conj(shift))`, appending two real blocks to `z`
fn complex_step(
    a: &dyn LinearOperator,
    e: &dyn LinearOperator,
    shift: Complex64,
    w: &mut VectorArray,
    z: &mut VectorArray,
    trans: bool,
) -> Result<()> {
    let shifted = ShiftedOperator::new(a, e, shift);
    let v = if !trans {
        shifted.apply_inverse(w.view())?
    } else {
        shifted.apply_inverse_adjoint(w.view())?.mapv(|x| x.conj())
    };

    let g = 2. * (-shift.re).sqrt();
    let d = shift.re / shift.im;
    let combined = v.mapv(|x| x.re + d * x.im);
    let v_im = v.mapv(|x| x.im);

    let ev = if !trans {
        e.apply(combined.view())?
    } else {
        e.apply_adjoint(combined.view())?
    };
    w.axpy(g * g, &ev)?;
    z.append(&(combined * g))?;
    z.append(&(v_im * (g * (d * d + 1.).sqrt())))
}

/// Computes a low-rank factor `Z` of the solution of a Lyapunov equation by the low-rank ADI
/// iteration
///
/// Shorthand for [`Lradi::new`] followed by [`Lradi::solve`], keeping only `Z`.
pub fn lradi(
    a: &dyn LinearOperator,
    e: Option<&dyn LinearOperator>,
    b: &dyn LinearOperator,
    trans: bool,
    options: &LradiOptions,
) -> Result<VectorArray> {
    let mut solver = Lradi::new(options.clone())?;
    Ok(solver.solve(a, e, b, trans)?.z)
}
