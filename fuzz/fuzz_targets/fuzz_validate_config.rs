#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use hedge_engine::{validate, validation_issues, ConfigDraft};
use hedge_types::{CurrencyCode, ProtectionLimits, CURRENCIES};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    currency: Option<String>,
    pick_known: Option<u8>,
    percentage: Option<u32>,
    threshold: Option<(i64, u8)>,
}

fuzz_target!(|data: FuzzInput| {
    let supported: BTreeSet<CurrencyCode> = CURRENCIES.iter().map(|c| CurrencyCode::new(c.code)).collect();
    let limits = ProtectionLimits::default();

    let currency = match data.pick_known {
        Some(i) => Some(CurrencyCode::new(CURRENCIES[usize::from(i) % CURRENCIES.len()].code)),
        None => data.currency.as_deref().map(CurrencyCode::new),
    };
    let draft = ConfigDraft {
        currency,
        percentage: data.percentage,
        threshold: data.threshold.map(|(m, s)| Decimal::new(m, u32::from(s % 12))),
    };

    let issues = validation_issues(&draft, &supported, &limits);
    match validate(&draft, &supported, &limits) {
        Ok(config) => {
            assert!(issues.is_empty());
            assert!(supported.contains(&config.currency));
            assert!((limits.min_percentage..=limits.max_percentage).contains(&config.target_percentage));
            assert!(config.threshold >= limits.min_threshold && config.threshold <= limits.max_threshold);
            assert!((100..=500).contains(&config.threshold_bp()));
        }
        Err(e) => {
            assert!(!issues.is_empty());
            assert_eq!(Some(&e), issues.first());
            assert!(e.field().is_some());
        }
    }
});
