use proptest::prelude::*;
use sales_metrics::{
    Dataset, Metric, Value,
    coerce::{parse_numeric_text, to_numeric},
    metrics::{self, RankedValue},
    normalize_default,
};

fn revenue_dataset(rows: &[(u8, f64)]) -> Dataset {
    Dataset::new(
        vec!["category_name".to_string(), "gross_product_amount".to_string()],
        rows.iter()
            .map(|(key, value)| vec![Value::from(format!("K{key}")), Value::from(*value)])
            .collect(),
    )
    .expect("valid dataset")
}

proptest! {
    #[test]
    fn numeric_coercion_never_panics_and_stays_finite(text in "\\PC{0,24}") {
        let once = to_numeric(&Value::from(text.as_str()));
        if let Some(value) = once {
            prop_assert!(value.is_finite());
        }
        prop_assert_eq!(to_numeric(&Value::from(once)), once);
    }

    #[test]
    fn formatted_numbers_parse_back(value in -1.0e9f64..1.0e9) {
        let parsed = parse_numeric_text(&format!("  {value}  "));
        prop_assert_eq!(parsed, Some(value));
        prop_assert_eq!(to_numeric(&Value::from(value)), Some(value));
    }

    #[test]
    fn top_n_is_a_sorted_prefix_of_the_full_ranking(
        rows in prop::collection::vec((0u8..15, -1_000.0f64..1_000.0), 0..60),
        n in 1usize..12,
    ) {
        let normalized = normalize_default(&revenue_dataset(&rows));
        let full = match metrics::group_totals(&normalized, "category_name", "gross_product_amount") {
            Metric::Available(groups) => metrics::rank_descending(groups),
            Metric::Unavailable => return Err(TestCaseError::fail("group totals unavailable")),
        };
        let top = metrics::top_by_revenue(&normalized, "category_name", n)
            .into_option()
            .expect("top table");

        prop_assert!(top.len() <= n);
        prop_assert_eq!(top.len(), full.len().min(n));
        prop_assert!(top.windows(2).all(|pair| pair[0].value >= pair[1].value));
        prop_assert_eq!(&top[..], &full[..top.len()]);
    }

    #[test]
    fn positive_contributions_sum_to_one_hundred(
        rows in prop::collection::vec((0u8..15, 0.01f64..1_000.0), 1..60),
    ) {
        let normalized = normalize_default(&revenue_dataset(&rows));
        let shares: Vec<RankedValue> = metrics::category_contribution_all(&normalized)
            .into_option()
            .expect("contribution");
        let total: f64 = shares.iter().map(|share| share.value).sum();
        prop_assert!((total - 100.0).abs() < 1e-6);
        prop_assert!(shares.iter().all(|share| share.value > 0.0));
    }
}
