use flyer_sysid::TrainingMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Reproducible noise generator
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// `n` samples of uniform noise in [-1, 1]
pub fn noise(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Ramp input `u = 0..n` driving `x[t+1] = 0.8 x[t] + 0.5 u[t]`, rows `[x, u]`.
pub fn ramp_system(n: usize) -> TrainingMatrix {
    let u: Vec<f64> = (0..n).map(|t| t as f64).collect();
    let mut x = vec![0.0; n];
    for t in 0..n - 1 {
        x[t + 1] = 0.8 * x[t] + 0.5 * u[t];
    }
    TrainingMatrix::from_rows(vec![("x".into(), x), ("u".into(), u)]).unwrap()
}

/// Smooth multi-tone input signal
pub fn excitation(n: usize, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|t| {
            let t = t as f64;
            (0.1 * t + phase).sin() + 0.3 * (0.37 * t + 2.0 * phase).sin()
        })
        .collect()
}

/// `y[t+1] = 0.7 a[t] + 0.3 b[t]` plus unrelated noise channels and a
/// constant channel.
///
/// Rows: `a`, `b`, `noise0..noise{k}`, `bias`, `y`.
pub fn transition_with_noise(n: usize, noise_rows: usize, seed: u64) -> TrainingMatrix {
    let a: Vec<f64> = (0..n).map(|t| (0.05 * t as f64).sin()).collect();
    let b: Vec<f64> = (0..n).map(|t| (0.13 * t as f64 + 0.4).cos()).collect();
    let mut y = vec![0.0; n];
    for t in 0..n - 1 {
        y[t + 1] = 0.7 * a[t] + 0.3 * b[t];
    }

    let mut rng = seeded_rng(seed);
    let mut rows = vec![("a".to_string(), a), ("b".to_string(), b)];
    for k in 0..noise_rows {
        rows.push((format!("noise{}", k), noise(&mut rng, n)));
    }
    rows.push(("bias".to_string(), vec![1.0; n]));
    rows.push(("y".to_string(), y));
    TrainingMatrix::from_rows(rows).unwrap()
}

/// Random wide matrix for factorization checks
pub fn random_matrix(rows: usize, cols: usize, seed: u64) -> nalgebra::DMatrix<f64> {
    let mut rng = seeded_rng(seed);
    nalgebra::DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..1.0))
}
