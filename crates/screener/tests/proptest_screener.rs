use chrono::{Duration, TimeZone, Utc};
use common::{Bar, PriceSeries};
use proptest::prelude::*;
use screener::{
    derive_stats, select, Direction, PriceBucket, SymbolStats, Thresholds, MAX_CANDIDATES,
};

fn series(symbol: &str, closes: &[f64], volume: f64) -> PriceSeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, c)| Bar {
            timestamp: start + Duration::days(i as i64),
            open: Some(*c),
            high: Some(*c),
            low: Some(*c),
            close: Some(*c),
            volume: Some(volume),
        })
        .collect();
    PriceSeries::new(symbol, bars)
}

fn arb_stats() -> impl Strategy<Value = Vec<SymbolStats>> {
    prop::collection::vec(
        (
            prop::collection::vec(0.5f64..60.0f64, 5),
            0f64..3_000_000f64,
        ),
        0..60,
    )
    .prop_map(|rows| {
        rows.iter()
            .enumerate()
            .filter_map(|(i, (closes, volume))| {
                derive_stats(&series(&format!("SYM{i}"), closes, *volume)).ok()
            })
            .collect()
    })
}

proptest! {
    /// Direction is Bullish exactly when the last close beats the first.
    #[test]
    fn direction_follows_first_and_last_close(
        closes in prop::collection::vec(0.01f64..1_000.0f64, 5),
    ) {
        let stats = derive_stats(&series("X", &closes, 1_000_000.0)).unwrap();
        let expected = if closes[4] > closes[0] { Direction::Bullish } else { Direction::Bearish };
        prop_assert_eq!(stats.direction, expected);
        prop_assert!(stats.volatility >= 0.0);
    }

    /// Lists are capped, ordered, and free of anything below threshold.
    #[test]
    fn candidate_lists_are_capped_sorted_and_filtered(stats in arb_stats()) {
        let thresholds = Thresholds::default();
        for bucket in PriceBucket::defaults() {
            let list = select(&stats, &bucket.criteria(&thresholds));

            prop_assert!(list.len() <= MAX_CANDIDATES);
            for pair in list.windows(2) {
                prop_assert!(pair[0].volatility >= pair[1].volatility);
                if pair[0].volatility == pair[1].volatility {
                    prop_assert!(pair[0].avg_volume >= pair[1].avg_volume);
                }
            }
            for c in &list {
                prop_assert!(c.volatility > thresholds.min_volatility);
                prop_assert!(c.avg_volume > thresholds.min_avg_volume);
                prop_assert!(bucket.min <= c.last_price && c.last_price < bucket.max);
            }
        }
    }

    /// A missing close anywhere in the window keeps the symbol out.
    #[test]
    fn missing_close_never_screens(
        closes in prop::collection::vec(0.5f64..60.0f64, 5),
        hole in 0usize..5,
    ) {
        let mut s = series("GAP", &closes, 2_000_000.0);
        s.bars[hole].close = None;
        prop_assert!(derive_stats(&s).is_err());
    }
}
