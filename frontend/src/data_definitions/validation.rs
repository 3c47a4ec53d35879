//! Rejected mutations. A rejected mutation leaves the session untouched and contacts no server.

use backend::request_error::RequestError;
use common::data_set_query::{FilterId, FilterOperator};

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    /// The initialize request has not completed yet.
    NotInitialized,
    UnknownColumn(String),
    NotFilterable(String),
    NotSortable(String),
    /// The filter was deleted, or never existed.
    UnknownFilter(FilterId),
    OperatorNotAllowed { column_name: String, operator: FilterOperator },
    InvalidValue { column_name: String, value: String },
    MissingQueryName,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "The data set is still loading"),
            Self::UnknownColumn(column_name) => write!(f, "Unknown column {}", column_name),
            Self::NotFilterable(column_name) => write!(f, "Column {} can not be filtered", column_name),
            Self::NotSortable(column_name) => write!(f, "Column {} can not be sorted", column_name),
            Self::UnknownFilter(id) => write!(f, "Filter {} does not exist", id),
            Self::OperatorNotAllowed { column_name, operator } => {
                write!(f, "Operator {} is not allowed for column {}", operator, column_name)
            }
            Self::InvalidValue { column_name, value } => {
                write!(f, "Invalid value {:?} for column {}", value, column_name)
            }
            Self::MissingQueryName => write!(f, "Please enter a query name"),
        }
    }
}

impl std::error::Error for ValidationFailure {}

/// Why a query action (save, auto-complete) failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionError {
    Validation(ValidationFailure),
    Request(RequestError),
}

impl From<ValidationFailure> for ActionError {
    fn from(value: ValidationFailure) -> Self {
        ActionError::Validation(value)
    }
}

impl From<RequestError> for ActionError {
    fn from(value: RequestError) -> Self {
        ActionError::Request(value)
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(failure) => write!(f, "{}", failure),
            Self::Request(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ActionError {}
