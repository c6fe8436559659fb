#![allow(dead_code)]


// Re-export
pub use assertions::{
    assert_coefficients_eq, assert_report_finite, assert_selected_before, coefficient,
};

pub use helpers::*;

pub use fixtures::*;
