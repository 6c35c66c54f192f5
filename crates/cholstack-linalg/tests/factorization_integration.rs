//! Integration tests for batched factorization and solves.

use cholstack_linalg::{
    Error, Factorization, MatrixStack, ParallelConfig, compute_chol_inplace,
    compute_chol_reference, decompose, reconstruct_ldl, reconstruct_ll, solve, validate,
};
use nalgebra::{DMatrix, DVector, dvector};

/// Dense SPD test matrices built as `A A' + n I` from a smooth, non-random `A`.
fn dense_spd_stack(n: usize, slices: usize) -> MatrixStack {
    MatrixStack::from_fn(n, slices, |k| {
        let a = DMatrix::from_fn(n, n, |i, j| {
            ((i * 7 + j * 3 + k * 11) as f64 * 0.37).sin()
        });
        let m = &a * a.transpose() + DMatrix::identity(n, n) * n as f64;
        (&m + m.transpose()) * 0.5
    })
    .unwrap()
}

/// Three 3×3 "identity plus diagonal" slices, each with its own diagonal.
fn identity_plus_diagonal_stack() -> MatrixStack {
    MatrixStack::from_fn(3, 3, |k| {
        let d = DVector::from_fn(3, |i, _| (k * 3 + i) as f64);
        DMatrix::identity(3, 3) + DMatrix::from_diagonal(&d)
    })
    .unwrap()
}

#[test]
fn test_ldl_matches_reference_reconstruction() {
    let stack = dense_spd_stack(12, 9);

    let ll = compute_chol_reference(&stack).expect("LL' should succeed");
    let mut ldl = stack.clone();
    compute_chol_inplace(&mut ldl).expect("LDL' should succeed");

    for k in 0..stack.num_slices() {
        let m = stack.to_matrix(k);
        let from_ll = reconstruct_ll(ll.slice(k));
        let from_ldl = reconstruct_ldl(ldl.slice_data(k), 12);

        let err_ll = (&from_ll - &m).abs().max();
        let err_ldl = (&from_ldl - &m).abs().max();
        assert!(err_ll < 1e-10, "slice {}: LL' error {}", k, err_ll);
        assert!(err_ldl < 1e-10, "slice {}: LDL' error {}", k, err_ldl);

        // D is the square of L's diagonal.
        for i in 0..12 {
            let l_ii = ll.get(i, i, k);
            let d_i = ldl.get(i, i, k);
            assert!(
                (l_ii * l_ii - d_i).abs() < 1e-9 * d_i,
                "slice {}, pivot {}: L^2 = {}, D = {}",
                k,
                i,
                l_ii * l_ii,
                d_i
            );
        }
    }
}

#[test]
fn test_solutions_agree_and_satisfy_system() {
    let stack = dense_spd_stack(16, 20);
    let config = ParallelConfig::default().with_min_parallel(1);
    let rhs = DVector::from_fn(16, |i, _| 1.0 - 0.25 * i as f64);

    let x_ll = solve(
        Factorization::Ll,
        &decompose(Factorization::Ll, &stack, &config).unwrap(),
        &rhs,
        &config,
    )
    .unwrap();
    let x_ldl = solve(
        Factorization::Ldl,
        &decompose(Factorization::Ldl, &stack, &config).unwrap(),
        &rhs,
        &config,
    )
    .unwrap();

    assert_eq!(x_ll.shape(), (16, 20));
    assert_eq!(x_ldl.shape(), (16, 20));
    assert!((&x_ll - &x_ldl).abs().max() < 1e-10);

    for k in 0..20 {
        let residual = stack.slice(k) * x_ldl.column(k) - &rhs;
        assert!(
            residual.amax() < 1e-10,
            "slice {} residual {}",
            k,
            residual.amax()
        );
    }
}

#[test]
fn test_identity_plus_diagonal_columns_are_independent() {
    let stack = identity_plus_diagonal_stack();
    let rhs = dvector![1.0, 2.0, 3.0];
    let config = ParallelConfig::default();

    for form in Factorization::ALL {
        let factors = decompose(form, &stack, &config).unwrap();
        let x = solve(form, &factors, &rhs, &config).unwrap();
        assert_eq!(x.shape(), (3, 3));

        for k in 0..3 {
            for i in 0..3 {
                let expected = rhs[i] / (1.0 + (k * 3 + i) as f64);
                assert!(
                    (x[(i, k)] - expected).abs() < 1e-14,
                    "{} slice {}, row {}: {} vs {}",
                    form,
                    k,
                    i,
                    x[(i, k)],
                    expected
                );
            }
        }
    }
}

#[test]
fn test_two_by_two_scenario() {
    let stack = MatrixStack::from_column_major(2, 2, 1, vec![2.0, 1.0, 1.0, 2.0]).unwrap();
    let config = ParallelConfig::default();

    let ldl = decompose(Factorization::Ldl, &stack, &config).unwrap();
    assert!((ldl.get(0, 0, 0) - 2.0).abs() < 1e-15);
    assert!((ldl.get(1, 1, 0) - 1.5).abs() < 1e-15);
    assert!((ldl.get(1, 0, 0) - 0.5).abs() < 1e-15);

    let x = solve(Factorization::Ldl, &ldl, &dvector![1.0, 1.0], &config).unwrap();
    assert!((x[(0, 0)] - 1.0 / 3.0).abs() < 1e-15);
    assert!((x[(1, 0)] - 1.0 / 3.0).abs() < 1e-15);

    let mx = stack.slice(0) * x.column(0);
    assert!((mx[0] - 1.0).abs() < 1e-14);
    assert!((mx[1] - 1.0).abs() < 1e-14);
}

#[test]
fn test_validation_errors_name_the_slice() {
    let mut stack = dense_spd_stack(4, 6);
    stack.set(3, 0, 4, stack.get(3, 0, 4) + 1.0);

    let err = validate(&stack).unwrap_err();
    assert_eq!(err.slice(), Some(4));
    assert!(matches!(err, Error::InvalidMatrix { .. }));
    assert!(err.to_string().contains("slice 4"));
}

#[test]
fn test_parallel_matches_sequential() {
    let stack = dense_spd_stack(10, 40);
    let par = ParallelConfig::default().with_min_parallel(1).with_chunk_size(3);
    let seq = ParallelConfig::sequential();

    for form in Factorization::ALL {
        let a = decompose(form, &stack, &par).unwrap();
        let b = decompose(form, &stack, &seq).unwrap();
        assert_eq!(a, b, "{} factors differ between parallel and sequential", form);
    }
}
