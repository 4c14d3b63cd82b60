use proptest::prelude::*;
use trellis_core::{Dense, Ell, Executor};
use trellis_kernels::{advanced_spmv, spmv};

fn close(x: f64, y: f64) -> bool {
    (x - y).abs() <= 1e-9 * (x.abs().max(y.abs()) + 1.0)
}

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|v| v.to_bits()).collect()
}

/// Naive triple loop over the logical matrix, padding slots skipped.
fn reference_spmv(a: &Ell<f64, i64>, b: &Dense<f64>) -> Dense<f64> {
    let mut c = Dense::filled(a.nrows, b.ncols, 0.0f64);
    for row in 0..a.nrows {
        for i in 0..a.max_nnz_per_row {
            let col = a.col_at(row, i);
            if col != -1 {
                let val = a.val_at(row, i);
                for j in 0..b.ncols {
                    *c.at_mut(row, j) += val * b.at(col as usize, j);
                }
            }
        }
    }
    c
}

fn ell_and_rhs() -> impl Strategy<Value = (Ell<f64, i64>, Dense<f64>)> {
    (1usize..=20, 1usize..=12, 0usize..=4, 0usize..=3, 1usize..=7)
        .prop_flat_map(|(nrows, ncols, max_nnz, pad, num_rhs)| {
            let stride = nrows + pad;
            let slots = stride * max_nnz;
            (
                Just((nrows, ncols, max_nnz, stride, num_rhs)),
                proptest::collection::vec(
                    prop_oneof![2 => Just(-1i64), 3 => 0..ncols as i64],
                    slots,
                ),
                proptest::collection::vec(-8.0f64..8.0, slots),
                proptest::collection::vec(-8.0f64..8.0, ncols * num_rhs),
            )
        })
        .prop_map(
            |((nrows, ncols, max_nnz, stride, num_rhs), col_idxs, values, b_vals)| {
                let a =
                    Ell::from_parts(nrows, ncols, max_nnz, stride, col_idxs, values, true).unwrap();
                let b = Dense::from_vec(ncols, num_rhs, b_vals).unwrap();
                (a, b)
            },
        )
}

proptest! {
    #[test]
    fn matches_reference((a, b) in ell_and_rhs()) {
        let exec = Executor::shared();
        let mut c = Dense::filled(a.nrows, b.ncols, 0.0f64);
        spmv(&exec, &a, &b, &mut c);
        let reference = reference_spmv(&a, &b);
        for row in 0..a.nrows {
            for j in 0..b.ncols {
                prop_assert!(
                    close(c.at(row, j), reference.at(row, j)),
                    "cell ({}, {}): {} vs {}", row, j, c.at(row, j), reference.at(row, j)
                );
            }
        }
    }

    #[test]
    fn advanced_matches_reference(
        (a, b) in ell_and_rhs(),
        alpha in -4.0f64..4.0,
        beta in -4.0f64..4.0,
    ) {
        let exec = Executor::shared();
        let mut c = Dense::filled(a.nrows, b.ncols, 0.0f64);
        for row in 0..a.nrows {
            for j in 0..b.ncols {
                *c.at_mut(row, j) = ((row * 31 + j) % 7) as f64 - 3.0;
            }
        }
        let c_prev = c.clone();
        advanced_spmv(
            &exec,
            &Dense::scalar(alpha),
            &a,
            &b,
            &Dense::scalar(beta),
            &mut c,
        );
        let reference = reference_spmv(&a, &b);
        for row in 0..a.nrows {
            for j in 0..b.ncols {
                let expected = alpha * reference.at(row, j) + beta * c_prev.at(row, j);
                prop_assert!(
                    close(c.at(row, j), expected),
                    "cell ({}, {}): {} vs {}", row, j, c.at(row, j), expected
                );
            }
        }
    }

    #[test]
    fn padding_values_never_matter((a, b) in ell_and_rhs()) {
        let exec = Executor::shared();
        let mut c_clean = Dense::filled(a.nrows, b.ncols, 0.0f64);
        spmv(&exec, &a, &b, &mut c_clean);

        let mut poisoned = a.clone();
        for slot in 0..poisoned.col_idxs.len() {
            if poisoned.col_idxs[slot] == -1 {
                poisoned.values[slot] = if slot % 2 == 0 { f64::NAN } else { f64::INFINITY };
            }
        }
        let mut c_poisoned = Dense::filled(a.nrows, b.ncols, 0.0f64);
        spmv(&exec, &poisoned, &b, &mut c_poisoned);
        prop_assert_eq!(bits(&c_clean.values), bits(&c_poisoned.values));
    }

    #[test]
    fn linear_in_b((a, b1) in ell_and_rhs()) {
        let exec = Executor::shared();
        let lambda = 0.5f64;
        let mu = -2.0f64;
        let b2_vals: Vec<f64> = b1.values.iter().map(|v| 0.7 * v - 1.3).collect();
        let b2 = Dense::from_vec(b1.nrows, b1.ncols, b2_vals).unwrap();
        let comb_vals: Vec<f64> = b1
            .values
            .iter()
            .zip(b2.values.iter())
            .map(|(x, y)| lambda * x + mu * y)
            .collect();
        let b_comb = Dense::from_vec(b1.nrows, b1.ncols, comb_vals).unwrap();

        let mut c1 = Dense::filled(a.nrows, b1.ncols, 0.0f64);
        spmv(&exec, &a, &b1, &mut c1);
        let mut c2 = Dense::filled(a.nrows, b1.ncols, 0.0f64);
        spmv(&exec, &a, &b2, &mut c2);
        let mut c_comb = Dense::filled(a.nrows, b1.ncols, 0.0f64);
        spmv(&exec, &a, &b_comb, &mut c_comb);

        for row in 0..a.nrows {
            for j in 0..b1.ncols {
                let expected = lambda * c1.at(row, j) + mu * c2.at(row, j);
                prop_assert!(
                    (c_comb.at(row, j) - expected).abs()
                        <= 1e-8 * (expected.abs() + c_comb.at(row, j).abs() + 1.0),
                    "cell ({}, {}): {} vs {}", row, j, c_comb.at(row, j), expected
                );
            }
        }
    }

    #[test]
    fn zero_matrix_yields_beta_scaled_output((a, b) in ell_and_rhs()) {
        let exec = Executor::shared();
        let mut zeroed = a.clone();
        for col in &mut zeroed.col_idxs {
            *col = -1;
        }

        let mut c = Dense::filled(a.nrows, b.ncols, 7.0f64);
        spmv(&exec, &zeroed, &b, &mut c);
        prop_assert!(c.values.iter().all(|v| *v == 0.0));

        let mut c = Dense::filled(a.nrows, b.ncols, 1.5f64);
        advanced_spmv(
            &exec,
            &Dense::scalar(2.0f64),
            &zeroed,
            &b,
            &Dense::scalar(3.0f64),
            &mut c,
        );
        prop_assert!(c.values.iter().all(|v| *v == 4.5));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn thread_count_invariance((a, b) in ell_and_rhs()) {
        let mut reference: Option<Vec<u64>> = None;
        for threads in [1usize, 2, 4] {
            let exec = Executor::with_num_threads(threads).unwrap();
            let mut c = Dense::filled(a.nrows, b.ncols, 0.0f64);
            spmv(&exec, &a, &b, &mut c);
            let got = bits(&c.values);
            match &reference {
                None => reference = Some(got),
                Some(expected) => prop_assert_eq!(expected, &got, "threads = {}", threads),
            }
        }
    }
}
