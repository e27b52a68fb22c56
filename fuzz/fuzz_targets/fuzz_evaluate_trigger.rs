#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use hedge_engine::{evaluate_trigger, HedgeError};
use rust_decimal::Decimal;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    current: i64,
    current_scale: u8,
    reference: i64,
    reference_scale: u8,
    threshold: i64,
    threshold_scale: u8,
}

fn decimal(mantissa: i64, scale: u8) -> Decimal {
    Decimal::new(mantissa, u32::from(scale % 12))
}

fuzz_target!(|data: FuzzInput| {
    let current = decimal(data.current, data.current_scale);
    let reference = decimal(data.reference, data.reference_scale);
    let threshold = decimal(data.threshold, data.threshold_scale);

    match evaluate_trigger(current, reference, threshold) {
        Ok(decision) => {
            assert!(reference > Decimal::ZERO);
            assert!(threshold > Decimal::ZERO);
            assert_eq!(decision.triggered, decision.change_percent.abs() >= threshold);
            if decision.recommends_protection() {
                assert!(current > reference);
            }
        }
        Err(HedgeError::InvalidRate(_)) => {}
        Err(HedgeError::InvalidConfiguration { .. }) => assert!(threshold <= Decimal::ZERO),
        Err(e) => panic!("unexpected error {:?}", e),
    }

    if reference <= Decimal::ZERO {
        assert!(evaluate_trigger(current, reference, threshold).is_err());
    }
});
