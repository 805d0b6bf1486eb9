//! Property tests for series prefixing and rate adjustment

mod common;

use epicharts::stats::{prepare_stats, StatRecord};
use epicharts::types::has_prefix;
use epicharts::view::{ChartView, MemoryView, ViewKind};
use epicharts::{Series, SeriesTable};
use proptest::prelude::*;

fn table(ids: &[String]) -> SeriesTable {
    ids.iter()
        .enumerate()
        .map(|(i, id)| Series::new(id.as_str(), vec![i as f64]))
        .collect::<Vec<_>>()
        .into()
}

proptest! {
    #[test]
    fn unloading_a_prefix_removes_exactly_its_series(
        ids_a in prop::collection::hash_set("[a-z0-9]{1,6}", 0..8),
        ids_b in prop::collection::hash_set("[a-z0-9]{1,6}", 0..8),
    ) {
        let ids_a: Vec<String> = ids_a.into_iter().collect();
        let ids_b: Vec<String> = ids_b.into_iter().collect();
        let mut view = MemoryView::new(ViewKind::Full, Default::default());

        view.load(&table(&ids_b).prefixed("beta"));
        let before = view.data_ids();
        view.load(&table(&ids_a).prefixed("alpha"));
        prop_assert_eq!(view.series().len(), ids_a.len() + ids_b.len());

        let alpha: Vec<String> = view
            .data_ids()
            .into_iter()
            .filter(|id| has_prefix(id, "alpha"))
            .collect();
        prop_assert_eq!(alpha.len(), ids_a.len());
        view.unload(&alpha);

        prop_assert_eq!(view.data_ids(), before);
    }

    #[test]
    fn prefixing_keeps_values(values in prop::collection::vec(-1e6f64..1e6, 0..10)) {
        let series = Series::new("s1", values.clone());
        let prefixed = series.prefixed("run1");
        prop_assert_eq!(prefixed.id, "run1_s1");
        prop_assert_eq!(prefixed.values, values);
    }

    #[test]
    fn per_100k_is_linear(total in 1.0f64..1e7, a in -1e4f64..1e4, b in -1e4f64..1e4, k in -100.0f64..100.0) {
        let records = vec![StatRecord::new("total", total)];
        let stats = prepare_stats(&records);

        let sum = stats.adjust_number_per_100k(a + b);
        let parts = stats.adjust_number_per_100k(a) + stats.adjust_number_per_100k(b);
        let tolerance = 1e-9
            * (1.0 + stats.adjust_number_per_100k(a).abs() + stats.adjust_number_per_100k(b).abs());
        prop_assert!((sum - parts).abs() <= tolerance, "{} vs {}", sum, parts);

        let scaled = stats.adjust_number_per_100k(k * a);
        let expected = k * stats.adjust_number_per_100k(a);
        prop_assert!((scaled - expected).abs() <= 1e-9 * (1.0 + expected.abs()));
    }

    #[test]
    fn per_100k_adjustment_scales_every_value(
        total in 1.0f64..1e7,
        values in prop::collection::vec(-1e6f64..1e6, 0..12),
    ) {
        let records = vec![StatRecord::new("total", total)];
        let stats = prepare_stats(&records);
        let table: SeriesTable = vec![Series::new("WHITE", values.clone())].into();

        let adjusted = stats.adjust(table, "per100k");
        prop_assert_eq!(adjusted.series().len(), 1);
        let series = &adjusted.series()[0];
        prop_assert_eq!(series.id.as_str(), "WHITE");
        prop_assert_eq!(series.values.len(), values.len());
        for (got, raw) in series.values.iter().zip(&values) {
            let expected = raw * 100_000.0 / total;
            prop_assert!(
                (got - expected).abs() <= 1e-9 * (1.0 + expected.abs()),
                "{} vs {}",
                got,
                expected
            );
        }
    }
}

#[test]
fn test_per_100k_of_total_is_rate_base() {
    let records = vec![StatRecord::new("total", 2500)];
    let stats = prepare_stats(&records);

    common::assert_float_eq(stats.adjust_number_per_100k(2500.0), 100_000.0, 1e-6);
    common::assert_float_eq(stats.adjust_number_per_100k(25.0), 1000.0, 1e-6);
}
