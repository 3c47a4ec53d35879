use common::data_set_query::{FilterId, FilterValue};

use crate::{
    data_definitions::validation::ValidationFailure,
    filter_input::FilterEditor,
    query_engine::FilterChange,
};

/// Splits pasted text on whitespace, `,` and `;`, dropping empty pieces.
pub fn split_pasted_values(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Input for filters over discrete values. Every edit changes the filter immediately.
pub struct TagFilterInput<E: FilterEditor> {
    editor: E,
    filter_id: FilterId,
}

impl<E: FilterEditor> TagFilterInput<E> {
    pub fn new(editor: E, filter_id: FilterId) -> Self {
        Self { editor, filter_id }
    }

    pub fn tags(&self) -> Result<Vec<String>, ValidationFailure> {
        let value = self
            .editor
            .filter_value(self.filter_id)
            .ok_or(ValidationFailure::UnknownFilter(self.filter_id))?;
        Ok(value.as_list().map(<[String]>::to_vec).unwrap_or_default())
    }

    /// Adds one tag. Returns false for blank or already present tags.
    pub fn add_tag(&self, tag: &str) -> Result<bool, ValidationFailure> {
        let tag = tag.trim();
        let mut tags = self.tags()?;
        if tag.is_empty() || tags.iter().any(|existing| existing == tag) {
            return Ok(false);
        }
        tags.push(tag.to_string());
        self.set_tags(tags)?;
        Ok(true)
    }

    pub fn remove_tag(&self, tag: &str) -> Result<bool, ValidationFailure> {
        let mut tags = self.tags()?;
        let before = tags.len();
        tags.retain(|existing| existing != tag);
        if tags.len() == before {
            return Ok(false);
        }
        self.set_tags(tags)?;
        Ok(true)
    }

    /// Appends every value of the pasted text with a single filter change. Returns how many were added.
    pub fn paste(&self, text: &str) -> Result<usize, ValidationFailure> {
        let pasted = split_pasted_values(text);
        if pasted.is_empty() {
            return Ok(0);
        }
        let mut tags = self.tags()?;
        tags.extend(pasted.iter().cloned());
        self.set_tags(tags)?;
        Ok(pasted.len())
    }

    fn set_tags(&self, tags: Vec<String>) -> Result<(), ValidationFailure> {
        self.editor.change_filter(self.filter_id, FilterChange::Value(FilterValue::List(tags)))
    }
}
