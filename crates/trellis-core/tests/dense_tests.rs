use trellis_core::{Dense, Executor};

#[test]
fn from_vec_is_contiguous() {
    let m = Dense::from_vec(2usize, 3usize, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(m.stride, 3);
    assert_eq!(m.at(0, 2), 3.0);
    assert_eq!(m.at(1, 0), 4.0);
}

#[test]
fn from_parts_respects_stride() {
    // 2x2 stored with stride 3; the third column of each row is slack.
    let m = Dense::from_parts(2usize, 2usize, 3, vec![1.0f64, 2.0, 0.0, 3.0, 4.0, 0.0]).unwrap();
    assert_eq!(m.at(1, 1), 4.0);
    assert_eq!(m.shape(), (2, 2));
}

#[test]
fn stride_below_ncols_is_rejected() {
    let err = Dense::from_parts(1usize, 3usize, 2, vec![1.0f64, 2.0]).unwrap_err();
    assert!(err.contains("stride"));
}

#[test]
fn length_must_match_nrows_times_stride() {
    let err = Dense::from_parts(2usize, 2usize, 2, vec![1.0f64, 2.0, 3.0]).unwrap_err();
    assert!(err.contains("values length"));
}

#[test]
fn at_mut_writes_through() {
    let mut m = Dense::filled(2usize, 2usize, 0.0f64);
    *m.at_mut(1, 0) = 7.5;
    assert_eq!(m.at(1, 0), 7.5);
    assert_eq!(m.at(0, 0), 0.0);
}

#[test]
fn scalar_is_one_by_one() {
    let s = Dense::scalar(2.5f64);
    assert_eq!(s.shape(), (1, 1));
    assert_eq!(s.at(0, 0), 2.5);
}

#[test]
fn executor_runs_on_requested_pool() {
    let exec = Executor::with_num_threads(2).unwrap();
    assert_eq!(exec.num_threads(), 2);
    let sum = exec.install(|| (0..10).sum::<i32>());
    assert_eq!(sum, 45);
}

#[test]
fn shared_executor_installs_inline() {
    let exec = Executor::shared();
    assert!(exec.num_threads() >= 1);
    assert_eq!(exec.install(|| 41 + 1), 42);
}
