use proptest::prelude::*;
use slidepot_core::HysteresisFilter;

proptest! {
    #[test]
    fn admitted_values_always_exceed_threshold(
        h in 0.0f32..1.0,
        samples in prop::collection::vec(-5.0f32..5.0, 1..200),
    ) {
        let mut f = HysteresisFilter::new(h);
        for v in samples {
            let before = f.last_reported();
            match f.admit(v) {
                Some(r) => {
                    prop_assert_eq!(r, v);
                    prop_assert!((v - before).abs() > h);
                    prop_assert_eq!(f.last_reported(), v);
                }
                None => {
                    prop_assert!((v - before).abs() <= h);
                    prop_assert_eq!(f.last_reported(), before);
                }
            }
        }
    }

    #[test]
    fn scaled_sequence_reports_only_the_last(h in 0.01f32..2.0) {
        let mut f = HysteresisFilter::new(h);
        let out: Vec<_> = [0.0, 0.5 * h, 0.9 * h, 1.5 * h]
            .into_iter()
            .map(|v| f.admit(v))
            .collect();
        prop_assert_eq!(out, vec![None, None, None, Some(1.5 * h)]);
    }
}
