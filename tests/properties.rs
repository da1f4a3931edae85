//! Property tests over generated price paths.

use blockscan::detection::check_lookback;
use blockscan::prelude::*;
use blockscan::redetection::score_shapes;
use chrono::{Days, NaiveDate};
use proptest::prelude::*;

fn date(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1)
        .unwrap()
        .checked_add_days(Days::new(i as u64))
        .unwrap()
}

/// (close change %, volume, wick fraction) per bar
fn steps(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-12.0f64..18.0, 100.0f64..20_000.0, 0.0f64..0.03), len)
}

fn build_series(steps: &[(f64, f64, f64)]) -> Series {
    let mut close = 100.0;
    let bars = steps
        .iter()
        .enumerate()
        .map(|(i, &(change, volume, wick))| {
            let open = close;
            close = open * (1.0 + change / 100.0);
            let high = open.max(close) * (1.0 + wick);
            let low = open.min(close) * (1.0 - wick);
            Bar::new(date(i), open, high, low, close, volume)
        })
        .collect();
    Series::new("PROP", bars).unwrap()
}

fn loose_conditions() -> ConditionSet {
    ConditionSet::new(vec![
        BlockCondition {
            entry_surge_rate: Some(6.0),
            exit_ma_period: Some(Period::new(3).unwrap()),
            ..Default::default()
        },
        BlockCondition {
            entry_surge_rate: Some(4.0),
            min_candles_after: Some(1),
            exit_on_reversal: true,
            exit_ma_period: Some(Period::new(5).unwrap()),
            ..Default::default()
        },
        BlockCondition {
            entry_surge_rate: Some(4.0),
            volume_ratio: Some(50.0),
            exit_on_body_mid: true,
            ..Default::default()
        },
        BlockCondition {
            entry_surge_rate: Some(2.0),
            lookback_max: Some(40),
            exit_ma_period: Some(Period::new(2).unwrap()),
            ..Default::default()
        },
    ])
}

proptest! {
    #[test]
    fn prop_peak_never_shrinks(steps in steps(1..60)) {
        let series = build_series(&steps);
        let bars = series.bars();
        let mut state = PeakState::open(0, &bars[0]);
        for (i, bar) in bars.iter().enumerate().skip(1) {
            let next = state.update(i, bar);
            prop_assert!(next.peak_price >= state.peak_price);
            prop_assert!(next.peak_volume >= state.peak_volume);
            prop_assert!(next.peak_price >= bar.high);
            state = next;
        }
    }

    #[test]
    fn prop_chains_are_well_formed(steps in steps(10..250)) {
        let series = build_series(&steps);
        let chains = ChainDetector::new(&loose_conditions()).detect(&series).unwrap();

        let mut ids = Vec::new();
        for chain in &chains {
            prop_assert!(chain.check_structure().is_ok());
            prop_assert!(chain.depth() <= 4);
            for pair in chain.blocks.windows(2) {
                prop_assert!(pair[1].started_at > pair[0].started_at);
                if pair[0].exit_reason == ExitReason::SuccessorStarted {
                    prop_assert_eq!(series.candles_between(pair[0].ended_at, pair[1].started_at), Some(1));
                } else {
                    prop_assert!(pair[1].started_at > pair[0].ended_at);
                }
            }
            for block in &chain.blocks {
                prop_assert!(block.ended_at >= block.started_at);
                prop_assert!(block.peak_date >= block.started_at && block.peak_date <= block.ended_at);
                ids.push(block.id);
            }
        }
        let unique = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), unique);

        // roots ordered by start
        for pair in chains.windows(2) {
            prop_assert!(pair[0].root().started_at <= pair[1].root().started_at);
        }
    }

    #[test]
    fn prop_detection_is_idempotent(steps in steps(10..150)) {
        let series = build_series(&steps);
        let conditions = loose_conditions();
        let detector = ChainDetector::new(&conditions);
        prop_assert_eq!(detector.detect(&series).unwrap(), detector.detect(&series).unwrap());
    }

    #[test]
    fn prop_score_in_unit_interval(
        prices in prop::collection::vec(0.01f64..50.0, 1..12),
        volumes in prop::collection::vec(0.01f64..50.0, 1..12),
        len in 1usize..30,
    ) {
        let seed = SeedShape {
            seed_id: SeedId("S@2010-01-01".into()),
            ticker: "S".into(),
            blocks: vec![BlockShape {
                level: BlockLevel::Block1,
                offset: 0,
                prices: vec![1.0, 1.1, 1.2, 1.05],
                volumes: vec![1.0, 0.5, 0.4, 0.3],
            }],
            duration: 4,
        };
        let candidate = vec![BlockShape {
            level: BlockLevel::Block1,
            offset: 0,
            prices,
            volumes,
        }];
        let sim = score_shapes(&seed, &candidate, len, &ToleranceConfig::default()).unwrap();
        prop_assert!((0.0..=1.0).contains(&sim.score));
        prop_assert!(sim.price_distance >= 0.0 && sim.volume_distance >= 0.0);
        prop_assert!((0.0..=1.0).contains(&sim.timing_penalty));
    }

    #[test]
    fn prop_lookback_gate(
        pred in 0usize..100,
        distance in 0usize..200,
        min in prop::option::of(0usize..100),
        max in prop::option::of(0usize..250),
    ) {
        let series = Series::new("LB", (0..300).map(|i| {
            Bar::new(date(i), 10.0, 10.5, 9.5, 10.0, 1.0)
        }).collect()).unwrap();
        let candidate = pred + distance;
        let count = distance + 1;
        let expected = min.map_or(true, |m| count >= m) && max.map_or(true, |m| count <= m);
        prop_assert_eq!(
            check_lookback(&series, date(candidate), Some(date(pred)), min, max),
            expected
        );
    }
}
