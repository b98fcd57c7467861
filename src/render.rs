//! Presentation of a [`Report`] as text tables, JSON, or YAML.

use std::fmt::Write as _;

use anyhow::{Context, Result};

use crate::{
    cli::OutputFormat,
    frequency::FrequencyEntry,
    metrics::{Metric, MonthlyValue, RankedValue},
    report::Report,
    table::{Align, render_table},
};

const UNAVAILABLE: &str = "-";

pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_text(report)),
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(report).context("Serializing report as JSON")?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Yaml => serde_yaml::to_string(report).context("Serializing report as YAML"),
    }
}

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Rows analysed: {}", report.row_count);

    let totals = &report.totals;
    section(
        &mut out,
        "Key Totals",
        &metric_rows(&[
            ("Net Order Amount", amount(&totals.net_order)),
            ("Gross Order Amount", amount(&totals.gross_order)),
            ("Net Product Amount", amount(&totals.net_product)),
            ("Gross Product Amount", amount(&totals.gross_product)),
        ]),
    );

    let basket = &report.basket;
    section(
        &mut out,
        "Basket & Customer Metrics",
        &metric_rows(&[
            ("Unique Bills", count(&basket.unique_bills)),
            ("Unique Customers", count(&basket.unique_customers)),
            ("Avg Basket Size", amount(&basket.avg_basket_size)),
            ("ATV (Avg Transaction Value)", amount(&basket.atv)),
            ("Sales per Customer", amount(&basket.sales_per_customer)),
            ("Line Items per Bill", amount(&basket.line_items_per_bill)),
        ]),
    );

    section(
        &mut out,
        "Discounts, Returns & Tax",
        &metric_rows(&[
            (
                "Avg Order Discount Rate",
                percent(&report.discounts.avg_order_discount_rate.map(|r| r * 100.0)),
            ),
            (
                "Avg Product Discount Rate",
                percent(&report.discounts.avg_product_discount_rate.map(|r| r * 100.0)),
            ),
            (
                "Return Rate (by volume)",
                percent(&report.returns.return_rate_by_volume),
            ),
            (
                "Returned Line Items",
                count(&report.returns.returned_line_items),
            ),
            ("Avg Tax Rate on Orders", percent(&report.avg_tax_rate)),
        ]),
    );

    ranked_section(
        &mut out,
        "Top 10 Categories by Revenue",
        "category",
        &report.top_categories,
        amount_value,
    );
    ranked_section(
        &mut out,
        "Top 10 Subcategories by Revenue",
        "subcategory",
        &report.top_subcategories,
        amount_value,
    );
    ranked_section(
        &mut out,
        "Top 10 Departments by Revenue",
        "department",
        &report.top_departments,
        amount_value,
    );
    ranked_section(
        &mut out,
        "Top 5 Stores by Revenue",
        "store",
        &report.top_stores,
        amount_value,
    );
    ranked_section(
        &mut out,
        "Top 10 Products by Quantity",
        "product",
        &report.top_products_by_quantity,
        amount_value,
    );
    ranked_section(
        &mut out,
        "Category Contribution to Sales",
        "category",
        &report.category_contribution,
        |v| format!("{v:.2}%"),
    );
    monthly_section(&mut out, &report.monthly_sales);

    section(
        &mut out,
        "Unique Counts",
        &report
            .unique_counts
            .iter()
            .map(|entry| vec![entry.column.clone(), count(&entry.count)])
            .collect::<Vec<_>>(),
    );
    frequency_section(&mut out, "Event Types", &report.event_types);
    frequency_section(&mut out, "Channels", &report.channels);
    summary_section(&mut out, report);

    if !report.degraded_values.is_empty() {
        section(
            &mut out,
            "Unparseable Values Treated as Missing",
            &report
                .degraded_values
                .entries()
                .map(|(column, n)| vec![column.to_string(), n.to_string()])
                .collect::<Vec<_>>(),
        );
    }
    out
}

fn section(out: &mut String, title: &str, rows: &[Vec<String>]) {
    let _ = writeln!(out, "\n{title}");
    out.push_str(&render_table(
        &["metric", "value"],
        rows,
        &[Align::Left, Align::Right],
    ));
}

fn ranked_section(
    out: &mut String,
    title: &str,
    key_label: &str,
    table: &Metric<Vec<RankedValue>>,
    format_value: impl Fn(f64) -> String,
) {
    let _ = writeln!(out, "\n{title}");
    match table {
        Metric::Available(entries) => {
            let rows = entries
                .iter()
                .map(|entry| vec![entry.key.clone(), format_value(entry.value)])
                .collect::<Vec<_>>();
            out.push_str(&render_table(
                &[key_label, "value"],
                &rows,
                &[Align::Left, Align::Right],
            ));
        }
        Metric::Unavailable => out.push_str(&unavailable_line()),
    }
}

fn monthly_section(out: &mut String, trend: &Metric<Vec<MonthlyValue>>) {
    let _ = writeln!(out, "\nMonthly Sales Trend");
    match trend {
        Metric::Available(entries) => {
            let rows = entries
                .iter()
                .map(|entry| vec![entry.month.to_string(), amount_value(entry.value)])
                .collect::<Vec<_>>();
            out.push_str(&render_table(
                &["month", "gross"],
                &rows,
                &[Align::Left, Align::Right],
            ));
        }
        Metric::Unavailable => out.push_str(&unavailable_line()),
    }
}

fn frequency_section(out: &mut String, title: &str, counts: &Metric<Vec<FrequencyEntry>>) {
    let _ = writeln!(out, "\n{title}");
    match counts {
        Metric::Available(entries) => {
            let rows = entries
                .iter()
                .map(|entry| {
                    vec![
                        entry.value.clone(),
                        entry.count.to_string(),
                        format!("{:.2}%", entry.percent),
                    ]
                })
                .collect::<Vec<_>>();
            out.push_str(&render_table(
                &["value", "count", "percent"],
                &rows,
                &[Align::Left, Align::Right, Align::Right],
            ));
        }
        Metric::Unavailable => out.push_str(&unavailable_line()),
    }
}

fn summary_section(out: &mut String, report: &Report) {
    if report.column_summaries.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nNumeric Column Summary");
    let rows = report
        .column_summaries
        .iter()
        .map(|summary| {
            vec![
                summary.column.clone(),
                summary.count.to_string(),
                summary.missing.to_string(),
                amount(&summary.min),
                amount(&summary.max),
                amount(&summary.mean),
                amount(&summary.q1),
                amount(&summary.median),
                amount(&summary.q3),
                amount(&summary.std_dev),
            ]
        })
        .collect::<Vec<_>>();
    let headers = [
        "column", "count", "missing", "min", "max", "mean", "25%", "median", "75%", "std_dev",
    ];
    let mut alignments = vec![Align::Right; headers.len()];
    alignments[0] = Align::Left;
    out.push_str(&render_table(&headers, &rows, &alignments));
}

fn metric_rows(entries: &[(&str, String)]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|(label, value)| vec![label.to_string(), value.clone()])
        .collect()
}

fn unavailable_line() -> String {
    format!("{UNAVAILABLE} (required columns missing or no data)\n")
}

fn amount_value(value: f64) -> String {
    format!("{value:.2}")
}

fn amount(metric: &Metric) -> String {
    metric
        .value()
        .map_or_else(|| UNAVAILABLE.to_string(), |v| amount_value(*v))
}

fn percent(metric: &Metric) -> String {
    metric
        .value()
        .map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{v:.2}%"))
}

fn count(metric: &Metric<usize>) -> String {
    metric
        .value()
        .map_or_else(|| UNAVAILABLE.to_string(), |v| v.to_string())
}
