//! Sales metrics computed from a [`NormalizedDataset`].
//!
//! Every metric is a pure function returning [`Metric`]: either a value or
//! [`Metric::Unavailable`] when a required column is absent or a denominator
//! is zero. Nothing here panics on odd data and nothing substitutes zero for
//! a value that could not be computed.
//!
//! The dataset-level functions (`atv`, `avg_tax_rate`, ...) are convenient for
//! one-off queries. The combinators they are built from (`per_unit`,
//! `tax_rate`, `rank_descending`, `contribution_shares`) take already computed
//! inputs, which is how [`crate::report::assemble`] avoids summing a column
//! twice.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
};

use serde::{Serialize, Serializer};

use crate::schema::{
    BILL_NO, CATEGORY_NAME, CUSTOMER_ID, Column, DEPARTMENT_NAME, GROSS_PRODUCT_AMOUNT,
    NET_PRODUCT_AMOUNT, NormalizedDataset, ORDER_DISCOUNT, ORDER_GROSS_AMOUNT, ORDER_NET_AMOUNT,
    ORDER_TAX_TOTAL, PRODUCT_DISCOUNT, PRODUCT_NAME, QUANTITY, STORE, SUBCATEGORY_NAME, YearMonth,
};

pub const TOP_GROUPS: usize = 10;
pub const TOP_STORES: usize = 5;
pub const TOP_PRODUCTS: usize = 10;
pub const TOP_CONTRIBUTIONS: usize = 10;

/// Result of a single metric: a value, or an explicit marker that the data
/// could not support it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric<T = f64> {
    Available(T),
    Unavailable,
}

impl<T> Metric<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Metric::Available(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Metric::Available(value) => Some(value),
            Metric::Unavailable => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Metric::Available(value) => Some(value),
            Metric::Unavailable => None,
        }
    }

    pub fn as_ref(&self) -> Metric<&T> {
        match self {
            Metric::Available(value) => Metric::Available(value),
            Metric::Unavailable => Metric::Unavailable,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metric<U> {
        match self {
            Metric::Available(value) => Metric::Available(f(value)),
            Metric::Unavailable => Metric::Unavailable,
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Metric<U>) -> Metric<U> {
        match self {
            Metric::Available(value) => f(value),
            Metric::Unavailable => Metric::Unavailable,
        }
    }
}

impl<T> From<Option<T>> for Metric<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Metric::Unavailable, Metric::Available)
    }
}

/// Available metrics serialize as their value, unavailable ones as the
/// string `"unavailable"`.
impl<T: Serialize> Serialize for Metric<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Available(value) => value.serialize(serializer),
            Metric::Unavailable => serializer.serialize_str("unavailable"),
        }
    }
}

/// One row of a grouped table: a group key and its aggregated value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedValue {
    pub key: String,
    pub value: f64,
}

impl RankedValue {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyValue {
    pub month: YearMonth,
    pub value: f64,
}

/// Sum of the non-missing values of a numeric column.
///
/// A sum that overflows to infinity is unavailable.
pub fn column_total(dataset: &NormalizedDataset, column: &str) -> Metric {
    match dataset.numeric(column) {
        Some(values) => finite(values.iter().flatten().sum::<f64>()),
        None => Metric::Unavailable,
    }
}

pub fn net_order_total(dataset: &NormalizedDataset) -> Metric {
    column_total(dataset, ORDER_NET_AMOUNT)
}

pub fn gross_order_total(dataset: &NormalizedDataset) -> Metric {
    column_total(dataset, ORDER_GROSS_AMOUNT)
}

pub fn net_product_total(dataset: &NormalizedDataset) -> Metric {
    column_total(dataset, NET_PRODUCT_AMOUNT)
}

pub fn gross_product_total(dataset: &NormalizedDataset) -> Metric {
    column_total(dataset, GROSS_PRODUCT_AMOUNT)
}

/// Number of distinct non-missing values in a column.
pub fn unique_count(dataset: &NormalizedDataset, column: &str) -> Metric<usize> {
    match dataset.column(column) {
        Some(Column::Text(values)) => {
            Metric::Available(values.iter().flatten().collect::<HashSet<_>>().len())
        }
        Some(Column::Numeric(values)) => Metric::Available(
            values
                .iter()
                .flatten()
                .map(|v| normalize_zero(*v).to_bits())
                .collect::<HashSet<_>>()
                .len(),
        ),
        Some(Column::Date(values)) => {
            Metric::Available(values.iter().flatten().collect::<HashSet<_>>().len())
        }
        None => Metric::Unavailable,
    }
}

pub fn unique_bills(dataset: &NormalizedDataset) -> Metric<usize> {
    unique_count(dataset, BILL_NO)
}

pub fn unique_customers(dataset: &NormalizedDataset) -> Metric<usize> {
    unique_count(dataset, CUSTOMER_ID)
}

/// `numerator / count`, unavailable when either side is or the count is zero.
pub fn per_unit(numerator: Metric, count: Metric<usize>) -> Metric {
    match (numerator, count) {
        (Metric::Available(n), Metric::Available(c)) if c > 0 => finite(n / c as f64),
        _ => Metric::Unavailable,
    }
}

pub fn avg_basket_size(dataset: &NormalizedDataset) -> Metric {
    per_unit(column_total(dataset, QUANTITY), unique_bills(dataset))
}

/// Average transaction value: gross product revenue per bill.
pub fn atv(dataset: &NormalizedDataset) -> Metric {
    per_unit(gross_product_total(dataset), unique_bills(dataset))
}

pub fn sales_per_customer(dataset: &NormalizedDataset) -> Metric {
    per_unit(gross_product_total(dataset), unique_customers(dataset))
}

pub fn line_items_per_bill(dataset: &NormalizedDataset) -> Metric {
    per_unit(
        Metric::Available(dataset.row_count() as f64),
        unique_bills(dataset),
    )
}

/// Sums `value_column` per distinct `key_column` value.
///
/// Groups come back in first-encountered order. Rows with a missing key are
/// skipped; missing values add nothing to their group. The table is
/// unavailable when any group sum overflows.
pub fn group_totals(
    dataset: &NormalizedDataset,
    key_column: &str,
    value_column: &str,
) -> Metric<Vec<RankedValue>> {
    let (Some(keys), Some(values)) = (dataset.text(key_column), dataset.numeric(value_column))
    else {
        return Metric::Unavailable;
    };
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<RankedValue> = Vec::new();
    for (key, value) in keys.iter().zip(values) {
        let Some(key) = key.as_deref() else {
            continue;
        };
        let idx = *positions.entry(key).or_insert_with(|| {
            groups.push(RankedValue::new(key, 0.0));
            groups.len() - 1
        });
        if let Some(value) = value {
            groups[idx].value += value;
        }
    }
    if groups.iter().any(|group| !group.value.is_finite()) {
        return Metric::Unavailable;
    }
    Metric::Available(groups)
}

/// Stable descending sort: equal values keep their incoming order.
pub fn rank_descending(mut groups: Vec<RankedValue>) -> Vec<RankedValue> {
    groups.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    groups
}

pub fn top_n(ranked: &[RankedValue], n: usize) -> Vec<RankedValue> {
    ranked.iter().take(n).cloned().collect()
}

/// The `n` groups of `group_column` with the highest gross product revenue.
pub fn top_by_revenue(
    dataset: &NormalizedDataset,
    group_column: &str,
    n: usize,
) -> Metric<Vec<RankedValue>> {
    group_totals(dataset, group_column, GROSS_PRODUCT_AMOUNT)
        .map(|groups| top_n(&rank_descending(groups), n))
}

pub fn top_categories(dataset: &NormalizedDataset) -> Metric<Vec<RankedValue>> {
    top_by_revenue(dataset, CATEGORY_NAME, TOP_GROUPS)
}

pub fn top_subcategories(dataset: &NormalizedDataset) -> Metric<Vec<RankedValue>> {
    top_by_revenue(dataset, SUBCATEGORY_NAME, TOP_GROUPS)
}

pub fn top_departments(dataset: &NormalizedDataset) -> Metric<Vec<RankedValue>> {
    top_by_revenue(dataset, DEPARTMENT_NAME, TOP_GROUPS)
}

pub fn top_stores(dataset: &NormalizedDataset) -> Metric<Vec<RankedValue>> {
    top_by_revenue(dataset, STORE, TOP_STORES)
}

pub fn top_products_by_quantity(dataset: &NormalizedDataset) -> Metric<Vec<RankedValue>> {
    group_totals(dataset, PRODUCT_NAME, QUANTITY)
        .map(|groups| top_n(&rank_descending(groups), TOP_PRODUCTS))
}

/// Each group's share of the grand total in percent, largest first.
///
/// Unavailable when the grand total is zero.
pub fn contribution_shares(groups: &[RankedValue]) -> Metric<Vec<RankedValue>> {
    let total: f64 = groups.iter().map(|group| group.value).sum();
    if total == 0.0 || !total.is_finite() {
        return Metric::Unavailable;
    }
    let shares = groups
        .iter()
        .map(|group| RankedValue::new(group.key.clone(), group.value / total * 100.0))
        .collect();
    Metric::Available(rank_descending(shares))
}

/// Revenue share of every category.
pub fn category_contribution_all(dataset: &NormalizedDataset) -> Metric<Vec<RankedValue>> {
    group_totals(dataset, CATEGORY_NAME, GROSS_PRODUCT_AMOUNT)
        .and_then(|groups| contribution_shares(&groups))
}

pub fn category_contribution(dataset: &NormalizedDataset) -> Metric<Vec<RankedValue>> {
    category_contribution_all(dataset).map(|shares| top_n(&shares, TOP_CONTRIBUTIONS))
}

/// Mean of `rates` over rows where both the numerator and the denominator are
/// strictly positive. An empty selection is unavailable, not zero.
pub fn mean_rate_where_positive(
    rates: Option<&[Option<f64>]>,
    numerators: Option<&[Option<f64>]>,
    denominators: Option<&[Option<f64>]>,
) -> Metric {
    let (Some(rates), Some(numerators), Some(denominators)) = (rates, numerators, denominators)
    else {
        return Metric::Unavailable;
    };
    let (sum, count) = rates
        .iter()
        .zip(numerators.iter().zip(denominators))
        .filter_map(|(rate, (n, d))| match (rate, n, d) {
            (Some(rate), Some(n), Some(d)) if *n > 0.0 && *d > 0.0 => Some(*rate),
            _ => None,
        })
        .fold((0.0, 0usize), |(sum, count), rate| (sum + rate, count + 1));
    if count == 0 {
        Metric::Unavailable
    } else {
        finite(sum / count as f64)
    }
}

/// Mean of `order_discount / order_gross_amount` over discounted orders, as a fraction.
pub fn avg_order_discount_rate(dataset: &NormalizedDataset) -> Metric {
    mean_rate_where_positive(
        dataset.order_discount_rates(),
        dataset.numeric(ORDER_DISCOUNT),
        dataset.numeric(ORDER_GROSS_AMOUNT),
    )
}

/// Mean of `product_discount / gross_product_amount` over discounted lines, as a fraction.
pub fn avg_product_discount_rate(dataset: &NormalizedDataset) -> Metric {
    mean_rate_where_positive(
        dataset.product_discount_rates(),
        dataset.numeric(PRODUCT_DISCOUNT),
        dataset.numeric(GROSS_PRODUCT_AMOUNT),
    )
}

/// Returned units as a percentage of units sold before returns.
///
/// `neg = Σ|q|` over negative quantities and `total = Σq + neg`; the rate is
/// `neg / total × 100`, unavailable when `total <= 0`.
pub fn return_rate_by_volume(dataset: &NormalizedDataset) -> Metric {
    let Some(quantities) = dataset.numeric(QUANTITY) else {
        return Metric::Unavailable;
    };
    let (net, returned) = quantities
        .iter()
        .flatten()
        .fold((0.0, 0.0), |(net, returned), q| {
            let returned = if *q < 0.0 { returned + q.abs() } else { returned };
            (net + q, returned)
        });
    let total = net + returned;
    if total > 0.0 {
        finite(returned / total * 100.0)
    } else {
        Metric::Unavailable
    }
}

/// Number of line items with a negative quantity.
pub fn returned_line_items(dataset: &NormalizedDataset) -> Metric<usize> {
    dataset
        .numeric(QUANTITY)
        .map(|quantities| quantities.iter().flatten().filter(|q| **q < 0.0).count())
        .into()
}

/// `tax / net × 100`, unavailable when the net total is zero.
pub fn tax_rate(tax_total: Metric, net_total: Metric) -> Metric {
    match (tax_total, net_total) {
        (Metric::Available(tax), Metric::Available(net)) if net != 0.0 => {
            finite(tax / net * 100.0)
        }
        _ => Metric::Unavailable,
    }
}

pub fn avg_tax_rate(dataset: &NormalizedDataset) -> Metric {
    tax_rate(
        column_total(dataset, ORDER_TAX_TOTAL),
        net_order_total(dataset),
    )
}

/// Gross product revenue per calendar month, oldest first. Rows without a
/// parseable order date are left out.
pub fn monthly_sales_trend(dataset: &NormalizedDataset) -> Metric<Vec<MonthlyValue>> {
    let (Some(months), Some(values)) = (dataset.months(), dataset.numeric(GROSS_PRODUCT_AMOUNT))
    else {
        return Metric::Unavailable;
    };
    let mut totals: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for (month, value) in months.iter().zip(values) {
        if let Some(month) = month {
            *totals.entry(*month).or_insert(0.0) += value.unwrap_or(0.0);
        }
    }
    if totals.values().any(|total| !total.is_finite()) {
        return Metric::Unavailable;
    }
    Metric::Available(
        totals
            .into_iter()
            .map(|(month, value)| MonthlyValue { month, value })
            .collect(),
    )
}

/// Wraps `value`, treating infinities and NaN as unavailable.
fn finite(value: f64) -> Metric {
    if value.is_finite() {
        Metric::Available(value)
    } else {
        Metric::Unavailable
    }
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}
