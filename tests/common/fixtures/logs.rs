use std::fmt::Write;

/// Sample period of the synthetic logs
pub const LOG_DT: f64 = 0.02;

/// Airspeed comfortably above the fixed wing flying threshold
pub const CRUISE_MPS: f64 = 50.0;

/// Coefficients of `x[t+1] = a x[t] + b u[t]` for a flap setting
pub fn flap_dynamics(flaps: f64) -> (f64, f64) {
    if flaps < 0.25 {
        (0.8, 0.5)
    } else {
        (0.6, 0.2)
    }
}

/// CSV flight log with `time`, `airspeed_mps`, `flaps`, `elevator`, `u` and
/// `x` channels. The first half is flown with flaps up, the second with half
/// flaps; `x` follows [`flap_dynamics`] of the current setting.
pub fn two_flap_log_csv(n: usize) -> String {
    let u = super::excitation(n, 0.0);
    let flaps: Vec<f64> = (0..n).map(|t| if t < n / 2 { 0.0 } else { 0.5 }).collect();
    let mut x = vec![0.0; n];
    for t in 0..n - 1 {
        let (a, b) = flap_dynamics(flaps[t]);
        x[t + 1] = a * x[t] + b * u[t];
    }

    let mut csv = String::from("time,airspeed_mps,flaps,elevator,u,x\n");
    for t in 0..n {
        writeln!(
            csv,
            "{},{},{},{},{},{}",
            t as f64 * LOG_DT,
            CRUISE_MPS,
            flaps[t],
            0.1 * u[t],
            u[t],
            x[t]
        )
        .unwrap();
    }
    csv
}
