//! Report assembly.
//!
//! [`assemble()`] evaluates the full metric set once, in dependency order:
//! column totals first, then the ratios built on those totals, then the
//! grouped tables. The category group table is built once and feeds both the
//! top categories and the revenue contribution table.

use log::{debug, info};
use serde::Serialize;

use crate::{
    data::Dataset,
    frequency::{FrequencyEntry, value_counts},
    metrics::{
        self, Metric, MonthlyValue, RankedValue, TOP_CONTRIBUTIONS, TOP_GROUPS, TOP_STORES,
        column_total, contribution_shares, group_totals, per_unit, rank_descending, tax_rate,
        top_n, unique_count,
    },
    schema::{
        BILL_NO, CATEGORY_NAME, CHANNEL, CUSTOMER_ID, DEPARTMENT_NAME, EVENT_TYPE,
        EXPECTED_NUMERIC_COLUMNS, GROSS_PRODUCT_AMOUNT, LOCATION_ID, NET_PRODUCT_AMOUNT,
        NormalizationSummary, NormalizedDataset, ORDER_GROSS_AMOUNT, ORDER_NET_AMOUNT,
        ORDER_TAX_TOTAL, PRODUCT_NAME, QUANTITY, STORE, SUBCATEGORY_NAME, normalize_default,
    },
    stats::{ColumnSummary, summarize_columns},
};

/// Columns whose distinct-value counts are listed in the report.
pub const UNIQUE_COUNT_COLUMNS: &[&str] = &[
    CUSTOMER_ID,
    LOCATION_ID,
    STORE,
    PRODUCT_NAME,
    CATEGORY_NAME,
    SUBCATEGORY_NAME,
    DEPARTMENT_NAME,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub row_count: usize,
    pub totals: Totals,
    pub basket: BasketMetrics,
    pub discounts: DiscountMetrics,
    pub returns: ReturnMetrics,
    pub avg_tax_rate: Metric,
    pub top_categories: Metric<Vec<RankedValue>>,
    pub top_subcategories: Metric<Vec<RankedValue>>,
    pub top_departments: Metric<Vec<RankedValue>>,
    pub top_stores: Metric<Vec<RankedValue>>,
    pub top_products_by_quantity: Metric<Vec<RankedValue>>,
    pub category_contribution: Metric<Vec<RankedValue>>,
    pub monthly_sales: Metric<Vec<MonthlyValue>>,
    pub unique_counts: Vec<UniqueCount>,
    pub event_types: Metric<Vec<FrequencyEntry>>,
    pub channels: Metric<Vec<FrequencyEntry>>,
    pub column_summaries: Vec<ColumnSummary>,
    pub degraded_values: NormalizationSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub net_order: Metric,
    pub gross_order: Metric,
    pub net_product: Metric,
    pub gross_product: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasketMetrics {
    pub unique_bills: Metric<usize>,
    pub unique_customers: Metric<usize>,
    pub avg_basket_size: Metric,
    pub atv: Metric,
    pub sales_per_customer: Metric,
    pub line_items_per_bill: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountMetrics {
    pub avg_order_discount_rate: Metric,
    pub avg_product_discount_rate: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnMetrics {
    /// Returned units over units sold before returns, in percent.
    pub return_rate_by_volume: Metric,
    /// Count of line items with negative quantity.
    pub returned_line_items: Metric<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniqueCount {
    pub column: String,
    pub count: Metric<usize>,
}

/// Normalizes `dataset` and assembles its report.
pub fn build_report(dataset: &Dataset) -> Report {
    let normalized = normalize_default(dataset);
    assemble(&normalized)
}

pub fn assemble(dataset: &NormalizedDataset) -> Report {
    let totals = Totals {
        net_order: column_total(dataset, ORDER_NET_AMOUNT),
        gross_order: column_total(dataset, ORDER_GROSS_AMOUNT),
        net_product: column_total(dataset, NET_PRODUCT_AMOUNT),
        gross_product: column_total(dataset, GROSS_PRODUCT_AMOUNT),
    };
    let quantity_total = column_total(dataset, QUANTITY);
    let tax_total = column_total(dataset, ORDER_TAX_TOTAL);
    let unique_bills = unique_count(dataset, BILL_NO);
    let unique_customers = unique_count(dataset, CUSTOMER_ID);
    debug!(
        "Totals computed; {} bill(s), {} customer(s)",
        display_count(&unique_bills),
        display_count(&unique_customers)
    );

    let basket = BasketMetrics {
        unique_bills,
        unique_customers,
        avg_basket_size: per_unit(quantity_total, unique_bills),
        atv: per_unit(totals.gross_product, unique_bills),
        sales_per_customer: per_unit(totals.gross_product, unique_customers),
        line_items_per_bill: per_unit(
            Metric::Available(dataset.row_count() as f64),
            unique_bills,
        ),
    };

    let discounts = DiscountMetrics {
        avg_order_discount_rate: metrics::avg_order_discount_rate(dataset),
        avg_product_discount_rate: metrics::avg_product_discount_rate(dataset),
    };
    let returns = ReturnMetrics {
        return_rate_by_volume: metrics::return_rate_by_volume(dataset),
        returned_line_items: metrics::returned_line_items(dataset),
    };
    let avg_tax_rate = tax_rate(tax_total, totals.net_order);

    let category_groups = group_totals(dataset, CATEGORY_NAME, GROSS_PRODUCT_AMOUNT);
    let category_contribution = category_groups
        .as_ref()
        .and_then(|groups| contribution_shares(groups))
        .map(|shares| top_n(&shares, TOP_CONTRIBUTIONS));
    let top_categories = category_groups.map(|groups| top_n(&rank_descending(groups), TOP_GROUPS));

    let unique_counts = UNIQUE_COUNT_COLUMNS
        .iter()
        .map(|column| UniqueCount {
            column: column.to_string(),
            count: if *column == CUSTOMER_ID {
                unique_customers
            } else {
                unique_count(dataset, column)
            },
        })
        .collect();

    let report = Report {
        row_count: dataset.row_count(),
        totals,
        basket,
        discounts,
        returns,
        avg_tax_rate,
        top_categories,
        top_subcategories: metrics::top_subcategories(dataset),
        top_departments: metrics::top_departments(dataset),
        top_stores: metrics::top_by_revenue(dataset, STORE, TOP_STORES),
        top_products_by_quantity: metrics::top_products_by_quantity(dataset),
        category_contribution,
        monthly_sales: metrics::monthly_sales_trend(dataset),
        unique_counts,
        event_types: value_counts(dataset, EVENT_TYPE),
        channels: value_counts(dataset, CHANNEL),
        column_summaries: summarize_columns(dataset, EXPECTED_NUMERIC_COLUMNS),
        degraded_values: dataset.summary().clone(),
    };
    info!(
        "Assembled report over {} row(s); {} of {} headline metric(s) available",
        report.row_count,
        report.available_headline_metrics(),
        HEADLINE_METRICS
    );
    report
}

const HEADLINE_METRICS: usize = 16;

impl Report {
    /// How many of the scalar metrics could be computed.
    pub fn available_headline_metrics(&self) -> usize {
        [
            self.totals.net_order.is_available(),
            self.totals.gross_order.is_available(),
            self.totals.net_product.is_available(),
            self.totals.gross_product.is_available(),
            self.basket.unique_bills.is_available(),
            self.basket.unique_customers.is_available(),
            self.basket.avg_basket_size.is_available(),
            self.basket.atv.is_available(),
            self.basket.sales_per_customer.is_available(),
            self.basket.line_items_per_bill.is_available(),
            self.discounts.avg_order_discount_rate.is_available(),
            self.discounts.avg_product_discount_rate.is_available(),
            self.returns.return_rate_by_volume.is_available(),
            self.returns.returned_line_items.is_available(),
            self.avg_tax_rate.is_available(),
            self.monthly_sales.is_available(),
        ]
        .into_iter()
        .filter(|available| *available)
        .count()
    }
}

fn display_count(count: &Metric<usize>) -> String {
    count
        .value()
        .map_or_else(|| "unavailable".to_string(), |c| c.to_string())
}
