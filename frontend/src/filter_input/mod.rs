//! Inputs that edit the value of one filter.

mod debounced_input;
mod tag_input;

pub use debounced_input::DebouncedFilterInput;
pub use tag_input::{TagFilterInput, split_pasted_values};

use common::data_set_query::{FilterId, FilterValue};

use crate::{
    data_definitions::validation::ValidationFailure,
    query_engine::{DataSetPage, FilterChange},
};

/// What filter inputs need from the page.
pub trait FilterEditor {
    fn filter_value(&self, id: FilterId) -> Option<FilterValue>;
    fn change_filter(&self, id: FilterId, change: FilterChange) -> Result<(), ValidationFailure>;
    fn change_filter_value_text(&self, id: FilterId, raw: &str) -> Result<(), ValidationFailure>;
}

impl FilterEditor for DataSetPage {
    fn filter_value(&self, id: FilterId) -> Option<FilterValue> {
        self.query().filter(id).map(|filter| filter.value.clone())
    }

    fn change_filter(&self, id: FilterId, change: FilterChange) -> Result<(), ValidationFailure> {
        DataSetPage::change_filter(self, id, change)
    }

    fn change_filter_value_text(&self, id: FilterId, raw: &str) -> Result<(), ValidationFailure> {
        DataSetPage::change_filter_value_text(self, id, raw)
    }
}
