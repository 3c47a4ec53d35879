//! Request and response payloads of the data set endpoints.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    column::{Column, ColumnType, ISO_DATE_FORMAT},
    data_set_query::{FilterValue, Query},
};

/// Body of the initialize request. A posted `query` wins over a saved `query_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InitializeArgs {
    pub data_set_id: String,
    pub query_id: Option<String>,
    pub query: Option<Query>,
}

impl InitializeArgs {
    pub fn new(data_set_id: impl Into<String>) -> Self {
        Self { data_set_id: data_set_id.into(), query_id: None, query: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub query: Query,
    pub all_columns: Vec<Column>,
    pub data_set_name: String,
    pub row_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub query: Query,
    pub limit: u64,
    pub offset: u64,
}

/// One row of a distribution chart. Numeric columns give `[bucket_low, bucket_high, count]`,
/// date columns `[timestamp, label, count]` and text columns `[value, count]`.
/// Empty buckets come back with a `null` count, rows of missing values with a `null` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DistributionRow {
    Bucket(f64, f64, Option<u64>),
    Dated(serde_json::Value, serde_json::Value, Option<u64>),
    Value(Option<String>, u64),
}

impl DistributionRow {
    pub fn count(&self) -> u64 {
        match self {
            DistributionRow::Bucket(_, _, count) | DistributionRow::Dated(_, _, count) => count.unwrap_or(0),
            DistributionRow::Value(_, count) => *count,
        }
    }

    /// Filter value that selects this row of a chart drawn for a column of `column_type`.
    pub fn filter_value(&self, column_type: ColumnType) -> Option<FilterValue> {
        match (column_type, self) {
            (ColumnType::Number, DistributionRow::Bucket(low, _, _)) => Some(FilterValue::Number(*low)),
            (ColumnType::Date, DistributionRow::Dated(timestamp, _, _)) => {
                date_of_timestamp(timestamp).map(|day| FilterValue::Text(day.format(ISO_DATE_FORMAT).to_string()))
            }
            (ColumnType::Date, DistributionRow::Bucket(millis, _, _)) => {
                date_of_timestamp(&serde_json::json!(*millis as i64))
                    .map(|day| FilterValue::Text(day.format(ISO_DATE_FORMAT).to_string()))
            }
            (ColumnType::Text | ColumnType::TextArray, DistributionRow::Value(Some(value), _)) => {
                Some(FilterValue::List(vec![value.clone()]))
            }
            _ => None,
        }
    }
}

/// Dates arrive as RFC 2822 strings, ISO strings or epoch milliseconds depending on the server.
fn date_of_timestamp(timestamp: &serde_json::Value) -> Option<NaiveDate> {
    match timestamp {
        serde_json::Value::Number(n) => {
            DateTime::from_timestamp_millis(n.as_i64()?).map(|datetime| datetime.date_naive())
        }
        serde_json::Value::String(s) => {
            if let Ok(datetime) = DateTime::parse_from_rfc2822(s) {
                return Some(datetime.date_naive());
            }
            s.get(..10).and_then(|prefix| NaiveDate::parse_from_str(prefix, ISO_DATE_FORMAT).ok())
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionChart {
    pub column: Column,
    pub data: Vec<DistributionRow>,
}
