//! Column listing for an input file.
//!
//! Reads only the header row and renders each column with the role the
//! metrics engine assigns to it.

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::ColumnsArgs,
    data::Dataset,
    io_utils,
    schema::{ColumnRole, EXPECTED_NUMERIC_COLUMNS, METRIC_INPUT_COLUMNS},
    table::{self, Align},
};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let source = &args.source;
    let delimiter = io_utils::resolve_input_delimiter(&source.input, source.delimiter);
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    let mut reader = io_utils::open_csv_reader_from_path(&source.input, delimiter)?;
    let header_record = reader
        .byte_headers()
        .with_context(|| format!("Reading header row of {:?}", source.input))?
        .clone();
    let headers = io_utils::decode_record(&header_record, encoding)
        .with_context(|| format!("Decoding header row as {}", encoding.name()))?;
    let dataset = Dataset::new(headers, Vec::new())
        .with_context(|| format!("Validating header row of {:?}", source.input))?;

    let rows = column_rows(dataset.headers());
    let rendered = table::render_table(
        &["#", "name", "role", "used"],
        &rows,
        &[Align::Right, Align::Left, Align::Left, Align::Left],
    );
    print!("{rendered}");
    info!(
        "Listed {} column(s) from {:?}",
        dataset.headers().len(),
        source.input
    );
    Ok(())
}

/// Which part of the report reads a column: the metric set, only the numeric
/// summary table, or nothing.
fn usage(name: &str) -> &'static str {
    if METRIC_INPUT_COLUMNS.contains(&name) {
        "metrics"
    } else if EXPECTED_NUMERIC_COLUMNS.contains(&name) {
        "summary"
    } else {
        "no"
    }
}

pub fn column_rows(headers: &[String]) -> Vec<Vec<String>> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let role = ColumnRole::of(name);
            let used = usage(name);
            vec![
                (idx + 1).to_string(),
                name.clone(),
                role.to_string(),
                used.to_string(),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_report_role_and_usage() {
        let headers = vec![
            "bill_no".to_string(),
            "order_date".to_string(),
            "notes".to_string(),
            "event_id".to_string(),
            "lineitem_tax_amount".to_string(),
        ];
        let rows = column_rows(&headers);
        assert_eq!(rows[0], ["1", "bill_no", "identifier", "metrics"]);
        assert_eq!(rows[1], ["2", "order_date", "temporal", "metrics"]);
        assert_eq!(rows[2], ["3", "notes", "other", "no"]);
        assert_eq!(rows[3], ["4", "event_id", "numeric identifier", "no"]);
        assert_eq!(rows[4], ["5", "lineitem_tax_amount", "monetary", "summary"]);
    }
}
