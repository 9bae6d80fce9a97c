//! Row-set comparison for computed results.
//!
//! Actual rows come either from a [`DataFrame`] (collected here) or from
//! an already-materialized slice of JSON maps; expected rows are plain
//! JSON objects. Comparison is ordered (exact sequence equality) or
//! unordered (multiset equality, position ignored). A field subset can
//! be selected first, in which case non-selected fields are ignored on
//! BOTH sides.

use std::collections::BTreeMap;

use arrow::json::writer::{JsonArray, WriterBuilder};
use datafusion::arrow::array::RecordBatch;
use datafusion::prelude::DataFrame;
use serde_json::Value;

use crate::error::CompareError;

/// A materialized row: column name to JSON value, nested structs
/// expanded into nested objects.
pub type Row = serde_json::Map<String, Value>;

#[derive(Clone, Debug, Default)]
pub struct CompareOptions {
    /// Compare only these fields; everything else is ignored on both
    /// sides.
    pub fields: Option<Vec<String>>,
    /// Require identical row order instead of multiset equality.
    pub ordered: bool,
}

impl CompareOptions {
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }
}

/// Collect a frame and compare it against expected rows.
pub async fn check_dataframe(
    df: DataFrame,
    expected: &[Value],
    options: &CompareOptions,
) -> Result<(), CompareError> {
    let df = match &options.fields {
        Some(fields) => {
            let names: Vec<&str> = fields.iter().map(String::as_str).collect();
            df.select_columns(&names)?
        }
        None => df,
    };

    let batches = df.collect().await?;
    let actual = batches_to_rows(&batches)?;
    check_rows(&actual, expected, options)
}

/// Compare already-materialized rows against expected rows.
pub fn check_rows(
    actual: &[Row],
    expected: &[Value],
    options: &CompareOptions,
) -> Result<(), CompareError> {
    let expected = expected_as_rows(expected)?;

    let (actual, expected) = match &options.fields {
        Some(fields) => (
            actual.iter().map(|row| project_row(row, fields)).collect(),
            expected.iter().map(|row| project_row(row, fields)).collect(),
        ),
        None => (actual.to_vec(), expected),
    };

    if options.ordered {
        check_ordered(&actual, &expected)
    } else {
        check_unordered(&actual, &expected)
    }
}

/// Panicking wrapper around [`check_dataframe`], for use as a test
/// assertion.
pub async fn assert_dataframe_eq(df: DataFrame, expected: &[Value], options: &CompareOptions) {
    if let Err(err) = check_dataframe(df, expected, options).await {
        panic!("{err}");
    }
}

/// Panicking wrapper around [`check_rows`], for use as a test assertion.
pub fn assert_rows_eq(actual: &[Row], expected: &[Value], options: &CompareOptions) {
    if let Err(err) = check_rows(actual, expected, options) {
        panic!("{err}");
    }
}

/// Render collected batches as JSON rows, nested structs expanded and
/// nulls kept explicit so a null field still compares against an
/// expected `null`.
pub fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>, CompareError> {
    if batches.iter().all(|batch| batch.num_rows() == 0) {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&refs)?;
    writer.finish()?;

    Ok(serde_json::from_slice(&writer.into_inner())?)
}

fn expected_as_rows(expected: &[Value]) -> Result<Vec<Row>, CompareError> {
    expected
        .iter()
        .map(|value| match value {
            Value::Object(map) => Ok(map.clone()),
            other => Err(CompareError::ExpectedNotObject(other.to_string())),
        })
        .collect()
}

fn project_row(row: &Row, fields: &[String]) -> Row {
    let mut projected = Row::new();
    for field in fields {
        if let Some(value) = row.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    projected
}

fn check_ordered(actual: &[Row], expected: &[Row]) -> Result<(), CompareError> {
    if actual == expected {
        return Ok(());
    }

    let detail = if actual.len() != expected.len() {
        format!(
            "length mismatch: actual {} rows, expected {}",
            actual.len(),
            expected.len()
        )
    } else {
        let index = actual
            .iter()
            .zip(expected)
            .position(|(a, e)| a != e)
            .unwrap_or(0);
        format!("first difference at row {index}")
    };

    Err(mismatch(detail, actual, expected))
}

fn check_unordered(actual: &[Row], expected: &[Row]) -> Result<(), CompareError> {
    let actual_counts = multiset(actual);
    let expected_counts = multiset(expected);

    if actual_counts == expected_counts {
        return Ok(());
    }

    let mut diffs = Vec::new();
    for (row, count) in &actual_counts {
        let expected_count = expected_counts.get(row).copied().unwrap_or(0);
        if *count != expected_count {
            diffs.push(format!("{row} seen {count} times, expected {expected_count}"));
        }
    }
    for (row, count) in &expected_counts {
        if !actual_counts.contains_key(row) {
            diffs.push(format!("{row} seen 0 times, expected {count}"));
        }
    }

    Err(mismatch(
        format!("multiset mismatch: {}", diffs.join("; ")),
        actual,
        expected,
    ))
}

fn multiset(rows: &[Row]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts
            .entry(Value::Object(row.clone()).to_string())
            .or_insert(0) += 1;
    }
    counts
}

fn mismatch(detail: String, actual: &[Row], expected: &[Row]) -> CompareError {
    CompareError::Mismatch {
        detail,
        actual: render(actual),
        expected: render(expected),
    }
}

fn render(rows: &[Row]) -> String {
    let values: Vec<Value> = rows.iter().map(|row| Value::Object(row.clone())).collect();
    serde_json::to_string_pretty(&values).unwrap_or_else(|_| format!("{rows:?}"))
}
