use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use ndarray_rand::{rand_distr::Uniform, RandomExt};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use ndarray_lyapunov::{
    lradi, norm::Norm, solve_lyap, LinalgError, LinearOperator, Lradi, LradiOptions,
    LyapSolverOptions, MatrixOperator, ProjectionShiftOptions, Result, ShiftStrategy,
};

mod common;

use common::{lyap_residual, CountingOperator, MatrixFree};

fn seeded(options: LradiOptions) -> Lradi<Xoshiro256Plus> {
    Lradi::new_with_rng(options, Xoshiro256Plus::seed_from_u64(3)).unwrap()
}

fn relative_residual(
    a: &Array2<f64>,
    e: &Array2<f64>,
    b: &Array2<f64>,
    z: ArrayView2<f64>,
) -> f64 {
    lyap_residual(a, e, b, z).norm_l2() / b.dot(&b.t()).norm_l2()
}

/// Operator that claims to be nonlinear
struct Nonlinear(MatrixOperator);

impl LinearOperator for Nonlinear {
    fn source_dim(&self) -> usize {
        self.0.source_dim()
    }

    fn range_dim(&self) -> usize {
        self.0.range_dim()
    }

    fn linear(&self) -> bool {
        false
    }

    fn apply(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.0.apply(v)
    }

    fn apply_adjoint(&self, v: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.0.apply_adjoint(v)
    }
}

#[test]
fn diagonal_default_options() {
    let a = Array2::from_diag(&array![-1., -2., -3.]);
    let b = array![[1.], [1.], [1.]];
    let z = solve_lyap(
        &MatrixOperator::new(a.clone()),
        None,
        &MatrixOperator::new(b.clone()),
        false,
        None,
    )
    .unwrap();
    assert_eq!(z.dim(), 3);
    assert!(relative_residual(&a, &Array2::eye(3), &b, z.view()) <= 1e-8);
}

#[test]
fn complex_pairs() {
    let a = array![[-1., 5.], [-5., -1.]];
    let b = Array2::eye(2);
    let sol = seeded(LradiOptions::default().tol(1e-12))
        .solve(
            &MatrixOperator::new(a.clone()),
            None,
            &MatrixOperator::new(b.clone()),
            false,
        )
        .unwrap();
    assert!(sol.converged);
    assert!(sol.shifts[0].im != 0.);
    // every consumed shift entry contributes one block of two columns
    assert_eq!(sol.z.len(), sol.steps * 2);
    assert!(relative_residual(&a, &Array2::eye(2), &b, sol.z.view()) <= 1e-10);
}

#[test]
fn mixed_blocks() {
    let a = array![[-1., 3., 0.], [-3., -1., 0.], [0., 0., -2.]];
    let b = array![[1.], [1.], [1.]];
    let sol = seeded(LradiOptions::default())
        .solve(
            &MatrixOperator::new(a.clone()),
            None,
            &MatrixOperator::new(b.clone()),
            false,
        )
        .unwrap();
    assert!(sol.converged);
    assert_eq!(sol.z.len(), sol.steps);
    // no conjugate pair is split by the consumed prefix
    let consumed = &sol.shifts.as_slice()[..sol.steps];
    let upper = consumed.iter().filter(|s| s.im > 0.).count();
    let lower = consumed.iter().filter(|s| s.im < 0.).count();
    assert_eq!(upper, lower);
    assert!(relative_residual(&a, &Array2::eye(3), &b, sol.z.view()) <= 1e-8);
}

#[test]
fn dual_equation() {
    let a = array![[-2., 1., 0.], [0., -3., 1.], [0.5, 0., -4.]];
    let e = Array2::from_diag(&array![1., 2., 1.]);
    let c = array![[1., -1., 2.]];
    let z = lradi(
        &MatrixOperator::new(a.clone()),
        Some(&MatrixOperator::new(e.clone())),
        &MatrixOperator::new(c.clone()),
        true,
        &LradiOptions::default().tol(1e-12),
    )
    .unwrap();
    // A^T X E + E^T X A + C^T C
    let res = relative_residual(
        &a.t().to_owned(),
        &e.t().to_owned(),
        &c.t().to_owned(),
        z.view(),
    );
    assert!(res <= 1e-10);
}

#[test]
fn trans_symmetry() {
    let a = MatrixOperator::new(array![[-3., 1., 0.], [1., -2., 0.5], [0., 0.5, -1.]]);
    let b = array![[1.], [0.], [-1.]];
    let options = LradiOptions::default().tol(1e-12);

    let primal = seeded(options.clone())
        .solve(&a, None, &MatrixOperator::new(b.clone()), false)
        .unwrap();
    let dual = seeded(options)
        .solve(&a, None, &MatrixOperator::new(b.t().to_owned()), true)
        .unwrap();
    assert!(primal.converged && dual.converged);
    let x = primal.z.view().dot(&primal.z.view().t());
    let y = dual.z.view().dot(&dual.z.view().t());
    assert_abs_diff_eq!(x, y, epsilon = 1e-9);
}

#[test]
fn implicit_and_explicit_subspaces() {
    let mut rng = Xoshiro256Plus::seed_from_u64(17);
    let n = 6;
    let a = Array2::random_using((n, n), Uniform::new(-0.1, 0.1), &mut rng)
        - Array2::from_diag(&Array1::linspace(1., 6., n));
    let b = Array2::random_using((n, 2), Uniform::new(-1., 1.), &mut rng);
    let e = Array2::eye(n);

    for implicit in [false, true] {
        let shifts = ProjectionShiftOptions::default().implicit_subspace(implicit);
        let options = LradiOptions::default()
            .maxiter(200)
            .shifts(ShiftStrategy::Projection(shifts));
        let sol = seeded(options)
            .solve(
                &MatrixOperator::new(a.clone()),
                None,
                &MatrixOperator::new(b.clone()),
                false,
            )
            .unwrap();
        assert!(sol.converged);
        assert!(sol.shifts.iter().all(|s| s.re < 0.));
        assert!(relative_residual(&a, &e, &b, sol.z.view()) <= 1e-8);
    }
}

#[test]
fn matrix_free_operators() {
    let a = Array2::from_diag(&array![-1., -2., -3.]);
    let b = array![[1.], [1.], [1.]];
    let z = solve_lyap(
        &MatrixFree(a.clone()),
        None,
        &MatrixOperator::new(b.clone()),
        false,
        None,
    )
    .unwrap();
    assert!(relative_residual(&a, &Array2::eye(3), &b, z.view()) <= 1e-8);

    // complex shifts with a matrix-free `E`, for both equations
    let a = array![[-1., 5.], [-5., -1.]];
    let e = Array2::from_diag(&array![1., 2.]);
    let b = Array2::eye(2);
    for trans in [false, true] {
        let sol = seeded(LradiOptions::default())
            .solve(
                &MatrixFree(a.clone()),
                Some(&MatrixFree(e.clone())),
                &MatrixOperator::new(b.clone()),
                trans,
            )
            .unwrap();
        assert!(sol.converged);
        assert!(sol.shifts.iter().any(|s| s.im != 0.));
        let res = if trans {
            relative_residual(&a.t().to_owned(), &e, &b, sol.z.view())
        } else {
            relative_residual(&a, &e, &b, sol.z.view())
        };
        assert!(res <= 1e-8);
    }
}

#[test]
fn equation_checked_once() {
    let a = CountingOperator::new(Array2::from_diag(&array![-1., -2., -3.]));
    let b = MatrixOperator::new(array![[1.], [1.], [1.]]);
    solve_lyap(&a, None, &b, false, None).unwrap();
    assert_eq!(a.linearity_checks.get(), 1);
}

#[test]
fn not_converged() {
    let a = MatrixOperator::new(Array2::from_diag(&array![-1., -10., -100.]));
    let b = MatrixOperator::new(array![[1.], [1.], [1.]]);
    let options = LradiOptions::default().tol(1e-14).maxiter(2);
    let sol = seeded(options).solve(&a, None, &b, false).unwrap();
    assert!(!sol.converged);
    assert_eq!(sol.steps, 2);
    assert_eq!(sol.z.len(), 2);
    assert_eq!(sol.relative_residuals.len(), 2);
    assert!(sol.relative_residuals.iter().all(|r| *r > 1e-14));
}

#[test]
fn seeded_runs_agree() {
    let a = MatrixOperator::new(array![[-1., 2.], [-2., -3.]]);
    let b = MatrixOperator::new(array![[1.], [0.]]);
    let shifts = ProjectionShiftOptions::default().init_seed(Some(9));
    let options = LradiOptions::default().shifts(ShiftStrategy::Projection(shifts));

    let first = Lradi::new(options.clone()).unwrap().solve(&a, None, &b, false).unwrap();
    let second = Lradi::new(options).unwrap().solve(&a, None, &b, false).unwrap();
    assert_eq!(first, second);
}

#[test]
fn zero_rhs() {
    let a = MatrixOperator::new(Array2::from_diag(&array![-1., -2.]));
    let b = MatrixOperator::new(Array2::zeros((2, 2)));
    let z = solve_lyap(&a, None, &b, false, None).unwrap();
    assert!(z.is_empty());
    assert_eq!(z.dim(), 2);
}

#[test]
fn invalid_equations() {
    let a = MatrixOperator::new(Array2::from_diag(&array![-1., -2.]));
    let b = MatrixOperator::new(array![[1.], [1.]]);
    let b3 = MatrixOperator::new(array![[1.], [1.], [1.]]);

    assert!(matches!(
        solve_lyap(&a, None, &b3, false, None),
        Err(LinalgError::InvalidEquation(_))
    ));
    assert!(matches!(
        solve_lyap(&Nonlinear(a.clone()), None, &b, false, None),
        Err(LinalgError::NotLinear)
    ));
    assert!(matches!(
        solve_lyap(&a, Some(&Nonlinear(a.clone())), &b, false, None),
        Err(LinalgError::NotLinear)
    ));
}

#[test]
fn invalid_options() {
    assert!(matches!(
        LyapSolverOptions::from_name("lrcf"),
        Err(LinalgError::UnsupportedConfiguration(_))
    ));
    assert!(matches!(
        ShiftStrategy::from_name("heuristic"),
        Err(LinalgError::UnsupportedConfiguration(_))
    ));

    let shifts = ProjectionShiftOptions::default().init_maxiter(0);
    let options = LradiOptions::default().shifts(ShiftStrategy::Projection(shifts));
    assert!(matches!(
        Lradi::new(options),
        Err(LinalgError::UnsupportedConfiguration(_))
    ));
}

#[test]
fn unstable_system() {
    let a = MatrixOperator::new(Array2::from_diag(&array![1., 2., 3.]));
    let b = MatrixOperator::new(array![[1.], [1.], [1.]]);
    let options = LyapSolverOptions::Lradi(LradiOptions::default());
    assert!(matches!(
        solve_lyap(&a, None, &b, false, Some(&options)),
        Err(LinalgError::ShiftGeneration { attempts: 20 })
    ));
}

proptest! {
    #[test]
    fn lradi_test((a, e, b) in common::stable_system()) {
        let r = b.ncols();
        let options = LradiOptions::default().maxiter(10);
        let sol = seeded(options)
            .solve(
                &MatrixOperator::new(a),
                Some(&MatrixOperator::new(e)),
                &MatrixOperator::new(b),
                false,
            )
            .unwrap();
        prop_assert!(sol.steps <= 11);
        prop_assert_eq!(sol.z.len(), sol.steps * r);
        prop_assert!(sol.shifts.iter().all(|s| s.re < 0.));
        prop_assert!(sol.relative_residuals.iter().all(|res| res.is_finite()));
    }
}
