//! Column roles and dataset normalization.
//!
//! This module owns the fixed sales schema: which column names carry money,
//! quantities, identifiers or dates, and how each raw cell is coerced into its
//! canonical type. [`normalize()`] turns a raw [`Dataset`] into a
//! [`NormalizedDataset`] without touching the input.
//!
//! ## Responsibilities
//!
//! - Role lookup for every known column ([`ColumnRole::of`])
//! - Numeric coercion of monetary and quantity columns
//! - Numeric identifier coercion for `event_id`
//! - Order date parsing and the derived `month` field
//! - Derived discount-rate fields
//! - Column presence queries used by the metrics engine
//! - Counting cells that degraded to missing ([`NormalizationSummary`])

use std::{collections::BTreeMap, fmt};

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use serde::{Serialize, Serializer};

use crate::{
    coerce::{is_placeholder, to_identifier_number, to_numeric},
    data::{Dataset, Value, parse_order_date},
};

pub const ORDER_NET_AMOUNT: &str = "order_net_amount";
pub const ORDER_GROSS_AMOUNT: &str = "order_gross_amount";
pub const ORDER_TAX_TOTAL: &str = "order_tax_total";
pub const ORDER_DISCOUNT: &str = "order_discount";
pub const NET_PRODUCT_AMOUNT: &str = "net_product_amount";
pub const GROSS_PRODUCT_AMOUNT: &str = "gross_product_amount";
pub const LINEITEM_TAX_AMOUNT: &str = "lineitem_tax_amount";
pub const PRODUCT_DISCOUNT: &str = "product_discount";
pub const QUANTITY: &str = "quantity";

pub const BILL_NO: &str = "bill_no";
pub const CUSTOMER_ID: &str = "customer_id";
pub const STORE: &str = "store";
pub const LOCATION_ID: &str = "location_id";
pub const PRODUCT_NAME: &str = "product_name";
pub const CATEGORY_NAME: &str = "category_name";
pub const SUBCATEGORY_NAME: &str = "subcategory_name";
pub const DEPARTMENT_NAME: &str = "department_name";
pub const EVENT_ID: &str = "event_id";
pub const EVENT_TYPE: &str = "event_type";
pub const CHANNEL: &str = "channel";

pub const ORDER_DATE: &str = "order_date";

/// Monetary and quantity columns that are coerced with [`to_numeric()`].
pub const EXPECTED_NUMERIC_COLUMNS: &[&str] = &[
    ORDER_NET_AMOUNT,
    ORDER_GROSS_AMOUNT,
    ORDER_TAX_TOTAL,
    ORDER_DISCOUNT,
    NET_PRODUCT_AMOUNT,
    GROSS_PRODUCT_AMOUNT,
    LINEITEM_TAX_AMOUNT,
    PRODUCT_DISCOUNT,
    QUANTITY,
];

const IDENTIFIER_COLUMNS: &[&str] = &[
    BILL_NO,
    CUSTOMER_ID,
    STORE,
    LOCATION_ID,
    PRODUCT_NAME,
    CATEGORY_NAME,
    SUBCATEGORY_NAME,
    DEPARTMENT_NAME,
    EVENT_TYPE,
    CHANNEL,
];

/// Columns read by at least one headline metric, table or count in the report.
pub const METRIC_INPUT_COLUMNS: &[&str] = &[
    ORDER_NET_AMOUNT,
    ORDER_GROSS_AMOUNT,
    ORDER_TAX_TOTAL,
    ORDER_DISCOUNT,
    NET_PRODUCT_AMOUNT,
    GROSS_PRODUCT_AMOUNT,
    PRODUCT_DISCOUNT,
    QUANTITY,
    BILL_NO,
    CUSTOMER_ID,
    STORE,
    LOCATION_ID,
    PRODUCT_NAME,
    CATEGORY_NAME,
    SUBCATEGORY_NAME,
    DEPARTMENT_NAME,
    EVENT_TYPE,
    CHANNEL,
    ORDER_DATE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Monetary,
    Quantity,
    Identifier,
    NumericIdentifier,
    Temporal,
    Other,
}

impl ColumnRole {
    pub fn of(name: &str) -> Self {
        match name {
            QUANTITY => ColumnRole::Quantity,
            EVENT_ID => ColumnRole::NumericIdentifier,
            ORDER_DATE => ColumnRole::Temporal,
            _ if EXPECTED_NUMERIC_COLUMNS.contains(&name) => ColumnRole::Monetary,
            _ if IDENTIFIER_COLUMNS.contains(&name) => ColumnRole::Identifier,
            _ => ColumnRole::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Monetary => "monetary",
            ColumnRole::Quantity => "quantity",
            ColumnRole::Identifier => "identifier",
            ColumnRole::NumericIdentifier => "numeric identifier",
            ColumnRole::Temporal => "temporal",
            ColumnRole::Other => "other",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar month, the bucket used by the monthly sales trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
}

/// Per-column count of non-empty cells that could not be coerced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationSummary {
    degraded: BTreeMap<String, usize>,
}

impl NormalizationSummary {
    pub fn is_empty(&self) -> bool {
        self.degraded.is_empty()
    }

    pub fn degraded(&self, column: &str) -> usize {
        self.degraded.get(column).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, usize)> {
        self.degraded.iter().map(|(name, count)| (name.as_str(), *count))
    }

    fn record(&mut self, column: &str, count: usize) {
        if count > 0 {
            self.degraded.insert(column.to_string(), count);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDataset {
    row_count: usize,
    columns: Vec<(String, Column)>,
    order_discount_rate: Option<Vec<Option<f64>>>,
    product_discount_rate: Option<Vec<Option<f64>>>,
    month: Option<Vec<Option<YearMonth>>>,
    summary: NormalizationSummary,
}

impl NormalizedDataset {
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, column)| column)
    }

    /// Coerced values of a numeric column; `None` when absent or not numeric.
    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name)? {
            Column::Numeric(values) => Some(values),
            _ => None,
        }
    }

    /// Values of an identifier or free-text column.
    pub fn text(&self, name: &str) -> Option<&[Option<String>]> {
        match self.column(name)? {
            Column::Text(values) => Some(values),
            _ => None,
        }
    }

    pub fn dates(&self, name: &str) -> Option<&[Option<NaiveDate>]> {
        match self.column(name)? {
            Column::Date(values) => Some(values),
            _ => None,
        }
    }

    pub fn months(&self) -> Option<&[Option<YearMonth>]> {
        self.month.as_deref()
    }

    pub fn order_discount_rates(&self) -> Option<&[Option<f64>]> {
        self.order_discount_rate.as_deref()
    }

    pub fn product_discount_rates(&self) -> Option<&[Option<f64>]> {
        self.product_discount_rate.as_deref()
    }

    pub fn summary(&self) -> &NormalizationSummary {
        &self.summary
    }
}

/// Normalizes with the standard set of monetary and quantity columns.
pub fn normalize_default(dataset: &Dataset) -> NormalizedDataset {
    normalize(dataset, EXPECTED_NUMERIC_COLUMNS)
}

pub fn normalize(dataset: &Dataset, numeric_columns: &[&str]) -> NormalizedDataset {
    let mut summary = NormalizationSummary::default();
    let mut columns = Vec::with_capacity(dataset.headers().len());

    for (idx, name) in dataset.headers().iter().enumerate() {
        let cells = dataset.rows().iter().map(|row| &row[idx]);
        let (column, degraded) = if numeric_columns.contains(&name.as_str()) {
            coerce_cells(cells, to_numeric)
        } else if name == EVENT_ID {
            coerce_cells(cells, to_identifier_number)
        } else if name == ORDER_DATE {
            parse_dates(cells)
        } else {
            (Column::Text(cells.map(to_text).collect()), 0)
        };
        if degraded > 0 {
            warn!("{degraded} value(s) in column '{name}' could not be parsed and were treated as missing");
        }
        debug!("Normalized column '{name}' as {}", ColumnRole::of(name));
        summary.record(name, degraded);
        columns.push((name.clone(), column));
    }

    let mut normalized = NormalizedDataset {
        row_count: dataset.row_count(),
        columns,
        order_discount_rate: None,
        product_discount_rate: None,
        month: None,
        summary,
    };
    normalized.order_discount_rate = derive_ratio(&normalized, ORDER_DISCOUNT, ORDER_GROSS_AMOUNT);
    normalized.product_discount_rate =
        derive_ratio(&normalized, PRODUCT_DISCOUNT, GROSS_PRODUCT_AMOUNT);
    normalized.month = normalized
        .dates(ORDER_DATE)
        .map(|dates| dates.iter().map(|d| d.map(YearMonth::of)).collect());
    normalized
}

fn coerce_cells<'a>(
    cells: impl Iterator<Item = &'a Value>,
    coerce: fn(&Value) -> Option<f64>,
) -> (Column, usize) {
    let mut degraded = 0;
    let values = cells
        .map(|cell| {
            let value = coerce(cell);
            if value.is_none() && carries_content(cell) {
                degraded += 1;
            }
            value
        })
        .collect();
    (Column::Numeric(values), degraded)
}

fn parse_dates<'a>(cells: impl Iterator<Item = &'a Value>) -> (Column, usize) {
    let mut degraded = 0;
    let values = cells
        .map(|cell| {
            let parsed = match cell {
                Value::Text(text) if !is_placeholder(text) => parse_order_date(text),
                _ => None,
            };
            if parsed.is_none() && carries_content(cell) {
                degraded += 1;
            }
            parsed
        })
        .collect();
    (Column::Date(values), degraded)
}

/// Whether a cell held something other than a blank or null-like token.
fn carries_content(cell: &Value) -> bool {
    match cell {
        Value::Missing => false,
        Value::Number(_) => true,
        Value::Text(text) => !is_placeholder(text),
    }
}

fn to_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Missing => None,
        Value::Text(text) if is_placeholder(text) => None,
        Value::Text(text) => Some(text.trim().to_string()),
        Value::Number(n) if !n.is_finite() => None,
        number => Some(number.as_display()),
    }
}

fn derive_ratio(
    dataset: &NormalizedDataset,
    numerator: &str,
    denominator: &str,
) -> Option<Vec<Option<f64>>> {
    let numerators = dataset.numeric(numerator)?;
    let denominators = dataset.numeric(denominator)?;
    Some(
        numerators
            .iter()
            .zip(denominators)
            .map(|(n, d)| match (n, d) {
                (Some(n), Some(d)) => Some(n / d).filter(|rate| rate.is_finite()),
                _ => None,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| Value::from(*cell)).collect())
                .collect(),
        )
        .expect("valid dataset")
    }

    #[test]
    fn roles_cover_the_sales_schema() {
        assert_eq!(ColumnRole::of("order_tax_total"), ColumnRole::Monetary);
        assert_eq!(ColumnRole::of("quantity"), ColumnRole::Quantity);
        assert_eq!(ColumnRole::of("bill_no"), ColumnRole::Identifier);
        assert_eq!(ColumnRole::of("event_id"), ColumnRole::NumericIdentifier);
        assert_eq!(ColumnRole::of("order_date"), ColumnRole::Temporal);
        assert_eq!(ColumnRole::of("notes"), ColumnRole::Other);
    }

    #[test]
    fn numeric_columns_are_coerced_cell_by_cell() {
        let normalized = normalize_default(&dataset(
            &["order_net_amount", "quantity"],
            &[&["1,200.50", "2"], &["oops", ""], &["none", "-1"]],
        ));
        assert_eq!(
            normalized.numeric("order_net_amount").unwrap(),
            [Some(1200.5), None, None]
        );
        assert_eq!(
            normalized.numeric("quantity").unwrap(),
            [Some(2.0), None, Some(-1.0)]
        );
        assert_eq!(normalized.summary().degraded("order_net_amount"), 1);
        assert_eq!(normalized.summary().degraded("quantity"), 0);
    }

    #[test]
    fn absent_columns_stay_absent() {
        let normalized = normalize_default(&dataset(&["bill_no"], &[&["1"]]));
        assert!(normalized.has_column("bill_no"));
        assert!(!normalized.has_column("gross_product_amount"));
        assert!(normalized.numeric("gross_product_amount").is_none());
        assert!(normalized.order_discount_rates().is_none());
        assert!(normalized.months().is_none());
        assert_eq!(normalized.column_names().collect::<Vec<_>>(), ["bill_no"]);
    }

    #[test]
    fn caller_chosen_numeric_columns_are_respected() {
        let normalized = normalize(
            &dataset(&["quantity", "order_net_amount"], &[&["3", "10"]]),
            &["quantity"],
        );
        assert_eq!(normalized.numeric("quantity").unwrap(), [Some(3.0)]);
        assert_eq!(
            normalized.text("order_net_amount").unwrap(),
            [Some("10".to_string())]
        );
    }

    #[test]
    fn event_id_is_numeric_but_not_separator_stripped() {
        let normalized = normalize_default(&dataset(&["event_id"], &[&["12"], &["1,024"], &["x"]]));
        assert_eq!(normalized.numeric("event_id").unwrap(), [Some(12.0), None, None]);
        assert_eq!(normalized.summary().degraded("event_id"), 2);
    }

    #[test]
    fn identifiers_treat_placeholders_as_missing() {
        let normalized = normalize_default(&dataset(&["customer_id"], &[&[" A "], &["NULL"], &[""]]));
        assert_eq!(
            normalized.text("customer_id").unwrap(),
            [Some("A".to_string()), None, None]
        );
    }

    #[test]
    fn numeric_identifier_values_render_as_text() {
        let raw = Dataset::from_records(vec![
            vec![("bill_no", Value::from(7.0))],
            vec![("bill_no", Value::from(7.5))],
        ])
        .unwrap();
        let normalized = normalize_default(&raw);
        assert_eq!(
            normalized.text("bill_no").unwrap(),
            [Some("7".to_string()), Some("7.5".to_string())]
        );
    }

    #[test]
    fn order_dates_degrade_per_cell_and_derive_months() {
        let normalized = normalize_default(&dataset(
            &["order_date"],
            &[&["2024-01-15"], &["garbage"], &[""], &["2024-02-01 10:00:00"]],
        ));
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(normalized.dates("order_date").unwrap()[0], Some(jan));
        assert_eq!(
            normalized.months().unwrap(),
            [
                Some(YearMonth::new(2024, 1)),
                None,
                None,
                Some(YearMonth::new(2024, 2))
            ]
        );
        assert_eq!(normalized.summary().degraded("order_date"), 1);
    }

    #[test]
    fn discount_rates_are_derived_without_touching_sources() {
        let normalized = normalize_default(&dataset(
            &["order_discount", "order_gross_amount"],
            &[&["10", "100"], &["5", "0"], &["", "50"]],
        ));
        assert_eq!(
            normalized.order_discount_rates().unwrap(),
            [Some(0.1), None, None]
        );
        assert_eq!(
            normalized.numeric("order_discount").unwrap(),
            [Some(10.0), Some(5.0), None]
        );
        assert!(normalized.product_discount_rates().is_none());
    }

    #[test]
    fn year_month_displays_zero_padded() {
        assert_eq!(YearMonth::new(2024, 3).to_string(), "2024-03");
        assert!(YearMonth::new(2023, 12) < YearMonth::new(2024, 1));
    }
}
