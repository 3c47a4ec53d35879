//! Column catalog entries and the per-type filter rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data_set_query::{FilterOperator, FilterValue};

/// ISO date format used for date filter values.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "text[]")]
    TextArray,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "json")]
    Json,
}

impl ColumnType {
    /// Operators offered when editing a filter on a column of this type.
    pub fn allowed_operators(self) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match self {
            ColumnType::Number | ColumnType::Date => &[GreaterOrEqual, Greater, Equal, Less, LessOrEqual],
            ColumnType::Text => &[Equal, NotEqual, Contains],
            ColumnType::TextArray => &[Equal, NotEqual],
            ColumnType::Json => &[],
        }
    }

    pub fn default_operator(self) -> Option<FilterOperator> {
        match self {
            ColumnType::Text | ColumnType::TextArray => Some(FilterOperator::Equal),
            ColumnType::Number => Some(FilterOperator::Greater),
            ColumnType::Date => Some(FilterOperator::LessOrEqual),
            ColumnType::Json => None,
        }
    }

    /// The value a freshly added filter starts with. Date filters start at `today`.
    pub fn default_value(self, today: NaiveDate) -> Option<FilterValue> {
        match self {
            ColumnType::Text | ColumnType::TextArray => Some(FilterValue::List(vec![])),
            ColumnType::Number => Some(FilterValue::Number(0.0)),
            ColumnType::Date => Some(FilterValue::Text(today.format(ISO_DATE_FORMAT).to_string())),
            ColumnType::Json => None,
        }
    }

    pub fn is_filterable(self) -> bool {
        self != ColumnType::Json
    }

    pub fn is_sortable(self) -> bool {
        !matches!(self, ColumnType::TextArray | ColumnType::Json)
    }

    /// Text-like columns take a list of discrete values (tag input), the rest a scalar.
    pub fn takes_value_list(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::TextArray)
    }

    /// Whether `value` has the shape this column type expects.
    pub fn accepts(self, value: &FilterValue) -> bool {
        match (self, value) {
            (ColumnType::Text | ColumnType::TextArray, FilterValue::List(_)) => true,
            (ColumnType::Number, FilterValue::Number(n)) => n.is_finite(),
            (ColumnType::Number, FilterValue::Text(s)) => s.trim().parse::<f64>().is_ok(),
            (ColumnType::Date, FilterValue::Text(s)) => NaiveDate::parse_from_str(s, ISO_DATE_FORMAT).is_ok(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub column_name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(column_name: impl Into<String>, column_type: ColumnType) -> Self {
        Self { column_name: column_name.into(), column_type }
    }
}

/// Case-insensitive substring search over column names, as used by the column and filter menus.
pub fn matching_columns<'a>(columns: &'a [Column], search: &str) -> Vec<&'a Column> {
    let search = search.trim().to_lowercase();
    columns
        .iter()
        .filter(|column| search.is_empty() || column.column_name.to_lowercase().contains(&search))
        .collect()
}
