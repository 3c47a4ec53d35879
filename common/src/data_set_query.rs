//! Shared data set query models.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Client-side identity of a filter. Never sent to the server, which addresses filters by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FilterId(pub u64);

impl Display for FilterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "~")]
    Contains,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::GreaterOrEqual => ">=",
            FilterOperator::Greater => ">",
            FilterOperator::Equal => "=",
            FilterOperator::Less => "<",
            FilterOperator::LessOrEqual => "<=",
            FilterOperator::NotEqual => "!=",
            FilterOperator::Contains => "~",
        }
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">=" => Ok(FilterOperator::GreaterOrEqual),
            ">" => Ok(FilterOperator::Greater),
            "=" => Ok(FilterOperator::Equal),
            "<" => Ok(FilterOperator::Less),
            "<=" => Ok(FilterOperator::LessOrEqual),
            "!=" => Ok(FilterOperator::NotEqual),
            "~" => Ok(FilterOperator::Contains),
            other => Err(format!("unknown filter operator {other:?}")),
        }
    }
}

/// Filter value; the shape depends on the column type: a list for text columns,
/// a number for numeric columns and an ISO date string for date columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<String>),
    Number(f64),
    Text(String),
}

impl FilterValue {
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FilterValue::List(values) => Some(values),
            _ => None,
        }
    }
}

impl Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::List(values) => write!(f, "{}", values.join(", ")),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(skip)]
    pub id: FilterId,
    pub column_name: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Query {
    pub data_set_id: String,
    pub query_id: Option<String>,
    pub column_names: Vec<String>,
    pub sort_column_name: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub filters: Vec<Filter>,
    pub created_at: Option<String>,
    pub created_by: Option<String>,
    pub updated_at: Option<String>,
    pub updated_by: Option<String>,
}

impl Query {
    pub fn new(data_set_id: impl Into<String>) -> Self {
        Self { data_set_id: data_set_id.into(), ..Default::default() }
    }

    pub fn filter_position(&self, id: FilterId) -> Option<usize> {
        self.filters.iter().position(|filter| filter.id == id)
    }

    pub fn filter(&self, id: FilterId) -> Option<&Filter> {
        self.filters.iter().find(|filter| filter.id == id)
    }

    pub fn filter_mut(&mut self, id: FilterId) -> Option<&mut Filter> {
        self.filters.iter_mut().find(|filter| filter.id == id)
    }

    /// First filter on `column_name`, if any. Several filters on one column are allowed.
    pub fn filter_on_column(&self, column_name: &str) -> Option<&Filter> {
        self.filters.iter().find(|filter| filter.column_name == column_name)
    }

    /// Sort order applied to `column_name`, or `None` when the query is not sorted by it.
    pub fn sort_order_of(&self, column_name: &str) -> Option<SortOrder> {
        if self.sort_column_name.as_deref() == Some(column_name) { self.sort_order } else { None }
    }

    /// Sorting cycles ascending, descending, unsorted on the same column; a new column starts ascending.
    pub fn cycle_sort(&mut self, column_name: &str) {
        if self.sort_column_name.as_deref() == Some(column_name) {
            self.sort_order = match self.sort_order {
                None => Some(SortOrder::Asc),
                Some(SortOrder::Asc) => Some(SortOrder::Desc),
                Some(SortOrder::Desc) => None,
            };
        } else {
            self.sort_column_name = Some(column_name.to_string());
            self.sort_order = Some(SortOrder::Asc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount_filter() -> Filter {
        Filter {
            id: FilterId(7),
            column_name: "amount".to_string(),
            operator: FilterOperator::Greater,
            value: FilterValue::Number(0.0),
        }
    }

    #[test]
    fn filter_id_is_not_on_the_wire() {
        let json = serde_json::to_value(amount_filter()).unwrap();
        assert_eq!(json, serde_json::json!({"column_name": "amount", "operator": ">", "value": 0.0}));
    }

    #[test]
    fn query_from_server_json() {
        let query: Query = serde_json::from_str(
            r#"{
                "data_set_id": "orders",
                "query_id": "",
                "column_names": ["id", "tags"],
                "sort_column_name": "id",
                "sort_order": "DESC",
                "filters": [
                    {"column_name": "tags", "operator": "!=", "value": ["a", "b"]},
                    {"column_name": "created", "operator": "<=", "value": "2024-01-31"},
                    {"column_name": "amount", "operator": ">=", "value": 12}
                ],
                "created_at": null,
                "created_by": null,
                "updated_at": null,
                "updated_by": null
            }"#,
        )
        .unwrap();
        assert_eq!(query.sort_order, Some(SortOrder::Desc));
        assert_eq!(query.filters[0].value, FilterValue::List(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(query.filters[1].value, FilterValue::Text("2024-01-31".to_string()));
        assert_eq!(query.filters[2].value, FilterValue::Number(12.0));
        assert_eq!(query.filters[2].operator, FilterOperator::GreaterOrEqual);
        assert!(query.filters.iter().all(|filter| filter.id == FilterId::default()));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let query: Query = serde_json::from_str(r#"{"data_set_id": "orders"}"#).unwrap();
        assert_eq!(query, Query::new("orders"));
    }

    #[test]
    fn sort_cycles_on_same_column() {
        let mut query = Query::new("orders");
        query.cycle_sort("id");
        assert_eq!(query.sort_order_of("id"), Some(SortOrder::Asc));
        query.cycle_sort("id");
        assert_eq!(query.sort_order_of("id"), Some(SortOrder::Desc));
        query.cycle_sort("id");
        assert_eq!(query.sort_order_of("id"), None);
        query.cycle_sort("id");
        assert_eq!(query.sort_order_of("id"), Some(SortOrder::Asc));

        query.cycle_sort("amount");
        assert_eq!(query.sort_column_name.as_deref(), Some("amount"));
        assert_eq!(query.sort_order, Some(SortOrder::Asc));
        assert_eq!(query.sort_order_of("id"), None);
    }

    #[test]
    fn filters_are_found_by_id() {
        let mut query = Query::new("orders");
        query.filters.push(amount_filter());
        assert_eq!(query.filter_position(FilterId(7)), Some(0));
        assert!(query.filter(FilterId(8)).is_none());
        query.filter_mut(FilterId(7)).unwrap().operator = FilterOperator::Less;
        assert_eq!(query.filter_on_column("amount").unwrap().operator, FilterOperator::Less);
    }

    #[test]
    fn operators_parse_from_their_symbols() {
        for op in [FilterOperator::GreaterOrEqual, FilterOperator::Contains, FilterOperator::NotEqual] {
            assert_eq!(op.as_str().parse::<FilterOperator>(), Ok(op));
        }
        assert!("like".parse::<FilterOperator>().is_err());
    }
}
