mod common;

use common::{SAMPLE_SALES_CSV, dataset};
use encoding_rs::UTF_8;
use sales_metrics::{
    Dataset, DatasetError, Metric, build_report, io_utils,
    metrics::{self, RankedValue},
    normalize_default,
};

fn available(metric: Metric) -> f64 {
    metric.into_option().expect("metric should be available")
}

fn sample_dataset() -> Dataset {
    let mut reader = io_utils::open_csv_reader(SAMPLE_SALES_CSV.as_bytes(), b',');
    Dataset::from_csv_reader(&mut reader, UTF_8).expect("sample parses")
}

#[test]
fn three_row_basket_scenario() {
    let report = build_report(&sample_dataset());

    assert_eq!(report.row_count, 3);
    assert_eq!(report.basket.unique_bills, Metric::Available(2));
    assert_eq!(report.basket.unique_customers, Metric::Available(2));
    assert_eq!(available(report.totals.gross_product), 300.0);
    assert_eq!(available(report.basket.avg_basket_size), 2.0);
    assert_eq!(available(report.basket.atv), 150.0);
    assert_eq!(available(report.basket.sales_per_customer), 150.0);
    assert_eq!(available(report.basket.line_items_per_bill), 1.5);

    // returned = 1, net = 4, total = 5
    assert!((available(report.returns.return_rate_by_volume) - 20.0).abs() < 1e-9);
    assert_eq!(report.returns.returned_line_items, Metric::Available(1));

    let categories = report.top_categories.into_option().expect("categories");
    assert_eq!(
        categories,
        vec![RankedValue::new("X", 150.0), RankedValue::new("Y", 150.0)]
    );

    let shares = report.category_contribution.into_option().expect("shares");
    assert_eq!(shares[0].key, "X");
    assert!((shares[0].value - 50.0).abs() < 1e-9);
}

#[test]
fn missing_gross_revenue_never_fails_the_report() {
    let data = dataset(
        &[
            "bill_no",
            "customer_id",
            "category_name",
            "subcategory_name",
            "department_name",
            "store",
            "order_date",
            "product_discount",
        ],
        &[&["1", "A", "X", "X1", "D", "North", "2024-01-01", "5"]],
    );
    let report = build_report(&data);
    assert_eq!(report.totals.gross_product, Metric::Unavailable);
    assert_eq!(report.basket.atv, Metric::Unavailable);
    assert_eq!(report.basket.sales_per_customer, Metric::Unavailable);
    assert_eq!(report.top_categories, Metric::Unavailable);
    assert_eq!(report.top_subcategories, Metric::Unavailable);
    assert_eq!(report.top_departments, Metric::Unavailable);
    assert_eq!(report.top_stores, Metric::Unavailable);
    assert_eq!(report.category_contribution, Metric::Unavailable);
    assert_eq!(report.discounts.avg_product_discount_rate, Metric::Unavailable);
    assert_eq!(report.monthly_sales, Metric::Unavailable);
    assert_eq!(report.basket.line_items_per_bill, Metric::Available(1.0));
}

#[test]
fn zero_discounts_leave_discount_rate_unavailable() {
    let data = dataset(
        &["order_discount", "order_gross_amount"],
        &[&["0", "120"], &["0", "80"], &["", "10"]],
    );
    let report = build_report(&data);
    assert_eq!(report.discounts.avg_order_discount_rate, Metric::Unavailable);
    assert_eq!(available(report.totals.gross_order), 210.0);
}

#[test]
fn messy_export_is_coerced_cell_by_cell() {
    let csv = "\
\u{feff}order_date,bill_no,store,order_net_amount,order_tax_total,gross_product_amount,event_id,channel
2024-01-05,B1,North,\"1,000.00\",100,\"1,100\",7,web
2024-01-20,B2,South,none,n/a,250,x,store
not-a-date,B3,North,500,50,abc,9,
2024-02-11 09:15:00,B3,East,500,50,300,9,web
";
    let mut reader = io_utils::open_csv_reader(csv.as_bytes(), b',');
    let raw = Dataset::from_csv_reader(&mut reader, UTF_8).expect("parses");
    let normalized = normalize_default(&raw);

    assert_eq!(available(metrics::net_order_total(&normalized)), 2000.0);
    assert!((available(metrics::avg_tax_rate(&normalized)) - 10.0).abs() < 1e-9);
    assert_eq!(normalized.summary().degraded("gross_product_amount"), 1);
    assert_eq!(normalized.summary().degraded("order_date"), 1);
    assert_eq!(normalized.summary().degraded("event_id"), 1);

    let trend = metrics::monthly_sales_trend(&normalized)
        .into_option()
        .expect("trend");
    let trend: Vec<(String, f64)> = trend
        .into_iter()
        .map(|entry| (entry.month.to_string(), entry.value))
        .collect();
    assert_eq!(
        trend,
        vec![("2024-01".to_string(), 1350.0), ("2024-02".to_string(), 300.0)]
    );

    let stores = metrics::top_stores(&normalized).into_option().expect("stores");
    assert_eq!(stores[0], RankedValue::new("North", 1100.0));
    assert_eq!(stores.len(), 3);

    let report = build_report(&raw);
    let channels = report.channels.into_option().expect("channels");
    assert_eq!(channels[0].value, "web");
    assert_eq!(channels[0].count, 2);
}

#[test]
fn structural_failures_surface_to_the_caller() {
    let mut reader = io_utils::open_csv_reader("bill_no,,store\n1,2,3\n".as_bytes(), b',');
    let err = Dataset::from_csv_reader(&mut reader, UTF_8).unwrap_err();
    assert!(matches!(err, DatasetError::EmptyHeader { position: 2 }));
    assert_eq!(err.to_string(), "header 2 is empty");
}

#[test]
fn runs_do_not_share_state() {
    let first = build_report(&sample_dataset());
    let other = dataset(&["bill_no"], &[&["9"]]);
    let _ = build_report(&other);
    let again = build_report(&sample_dataset());
    assert_eq!(first, again);
}
