//! Property coverage for the MIS power heuristic, generalizing the
//! fixed-value unit test in `src/integrator.rs` to arbitrary finite
//! positive pdfs.

use proptest::prelude::*;
use spectral_tracer::integrator::power_heuristic;

proptest! {
    #[test]
    fn weights_are_bounded_and_sum_to_one(a in 0.0001f32..1.0e6, b in 0.0001f32..1.0e6) {
        let wa = power_heuristic(a, b);
        let wb = power_heuristic(b, a);
        prop_assert!((0.0..=1.0).contains(&wa));
        prop_assert!((0.0..=1.0).contains(&wb));
        prop_assert!((wa + wb - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn equal_pdfs_split_evenly(p in 0.0001f32..1.0e6) {
        let w = power_heuristic(p, p);
        prop_assert!((w - 0.5).abs() < 1.0e-4);
    }

    #[test]
    fn larger_pdf_never_loses_more_weight_than_the_smaller_one(a in 0.0001f32..1.0e6, b in 0.0001f32..1.0e6) {
        let wa = power_heuristic(a, b);
        let wb = power_heuristic(b, a);
        if a >= b {
            prop_assert!(wa >= wb);
        } else {
            prop_assert!(wb >= wa);
        }
    }
}
