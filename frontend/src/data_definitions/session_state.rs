//! The query being edited plus what is known about the data set.

use std::collections::BTreeSet;

use common::{
    column::{Column, ColumnType},
    data_set_query::{Filter, FilterId, FilterOperator, FilterValue, Query},
    explorer_result::InitializeResponse,
};

use crate::data_definitions::target_board::PaginationView;

#[derive(Debug, Clone)]
pub struct SessionState {
    pub query: Query,
    pub data_set_name: String,
    /// Column catalog, fixed once initialized.
    pub catalog: Vec<Column>,
    pub current_page: u64,
    pub page_size: u64,
    pub data_set_row_count: u64,
    /// Row count under the current filters, once the row-count request has answered.
    pub filtered_row_count: Option<u64>,
    /// Catalog indices of the charts currently shown.
    pub visible_charts: BTreeSet<usize>,
    pub initialized: bool,
    next_filter_id: u64,
}

/// Charts to fetch and charts to hide after a change of the selected columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartChanges {
    pub fetch: Vec<usize>,
    pub hide: Vec<usize>,
}

impl SessionState {
    pub fn new(data_set_id: &str, page_size: u64) -> Self {
        Self {
            query: Query::new(data_set_id),
            data_set_name: String::new(),
            catalog: Vec::new(),
            current_page: 0,
            page_size: page_size.max(1),
            data_set_row_count: 0,
            filtered_row_count: None,
            visible_charts: BTreeSet::new(),
            initialized: false,
            next_filter_id: 0,
        }
    }

    /// Takes over the answer of the initialize request; loaded filters get fresh ids.
    pub fn adopt(&mut self, response: InitializeResponse) {
        let InitializeResponse { mut query, all_columns, data_set_name, row_count } = response;
        for filter in query.filters.iter_mut() {
            filter.id = self.allocate_filter_id();
        }
        self.query = query;
        self.catalog = all_columns;
        self.data_set_name = data_set_name;
        self.data_set_row_count = row_count;
        self.filtered_row_count = None;
        self.current_page = 0;
        self.visible_charts.clear();
        self.initialized = true;
    }

    fn allocate_filter_id(&mut self) -> FilterId {
        self.next_filter_id += 1;
        FilterId(self.next_filter_id)
    }

    pub fn column(&self, column_name: &str) -> Option<&Column> {
        self.catalog.iter().find(|column| column.column_name == column_name)
    }

    pub fn column_type(&self, column_name: &str) -> Option<ColumnType> {
        self.column(column_name).map(|column| column.column_type)
    }

    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.catalog.iter().position(|column| column.column_name == column_name)
    }

    pub fn filter_ids(&self) -> Vec<FilterId> {
        self.query.filters.iter().map(|filter| filter.id).collect()
    }

    pub fn push_filter(&mut self, column_name: &str, operator: FilterOperator, value: FilterValue) -> FilterId {
        let id = self.allocate_filter_id();
        self.query.filters.push(Filter { id, column_name: column_name.to_string(), operator, value });
        id
    }

    pub fn remove_filter(&mut self, id: FilterId) -> Option<Filter> {
        let position = self.query.filter_position(id)?;
        Some(self.query.filters.remove(position))
    }

    /// Selects `column_name` if needed, keeping the selection in catalog order. Returns whether it changed.
    pub fn ensure_column(&mut self, column_name: &str) -> bool {
        if self.query.column_names.iter().any(|name| name == column_name) {
            return false;
        }
        self.query.column_names.push(column_name.to_string());
        let catalog = &self.catalog;
        self.query.column_names.sort_by_key(|name| {
            catalog.iter().position(|column| &column.column_name == name).unwrap_or(usize::MAX)
        });
        true
    }

    pub fn all_columns_selected(&self) -> bool {
        self.catalog
            .iter()
            .all(|column| self.query.column_names.contains(&column.column_name))
    }

    pub fn offset(&self) -> u64 {
        self.current_page * self.page_size
    }

    /// Last page with rows on it. While the row count is unknown the current page is the last one.
    pub fn max_page(&self) -> u64 {
        match self.filtered_row_count {
            Some(rows) => rows.div_ceil(self.page_size).saturating_sub(1),
            None => self.current_page,
        }
    }

    /// Moves the page cursor by `delta` within the reachable pages. Returns whether it moved.
    pub fn paginate(&mut self, delta: i64) -> bool {
        let target = (self.current_page as i64).saturating_add(delta).max(0) as u64;
        let target = target.min(self.max_page());
        if target == self.current_page {
            return false;
        }
        self.current_page = target;
        true
    }

    pub fn pagination_view(&self) -> Option<PaginationView> {
        let total = self.filtered_row_count?;
        let offset = self.offset();
        Some(PaginationView {
            from: if total == 0 { 0 } else { offset + 1 },
            to: (offset + self.page_size).min(total),
            total,
            can_go_back: self.current_page > 0,
            can_go_forward: self.current_page < self.max_page(),
        })
    }

    /// Catalog indices of the charts of all selected columns.
    pub fn selected_chart_columns(&self) -> BTreeSet<usize> {
        self.catalog
            .iter()
            .enumerate()
            .filter(|(_, column)| self.query.column_names.contains(&column.column_name))
            .map(|(index, _)| index)
            .collect()
    }

    /// Brings `visible_charts` in line with the selected columns. Newly shown charts are always
    /// fetched, already shown ones only with `reload_all`.
    pub fn refresh_visible_charts(&mut self, reload_all: bool) -> ChartChanges {
        let selected = self.selected_chart_columns();
        let fetch = selected
            .iter()
            .copied()
            .filter(|index| reload_all || !self.visible_charts.contains(index))
            .collect();
        let hide = self.visible_charts.difference(&selected).copied().collect();
        self.visible_charts = selected;
        ChartChanges { fetch, hide }
    }
}
