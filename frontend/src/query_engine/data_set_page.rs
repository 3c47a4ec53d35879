use std::{cell::RefCell, rc::Rc, time::Duration};

use anyhow::Context;
use backend::{
    api::data_set_endpoints::DataSetEndpoints,
    http_utils::endpoint_client::{EndpointCall, EndpointClient},
};
use common::{
    column::{Column, ColumnType, matching_columns},
    data_set_query::{FilterId, FilterOperator, FilterValue, Query},
    explorer_result::{DistributionChart, DistributionRow, InitializeArgs, InitializeResponse},
};

use crate::{
    data_definitions::{
        explorer_config::ExplorerConfig,
        session_state::SessionState,
        target_board::{
            ColumnListItem, FilterRowView, INITIALIZATION_TARGETS, QueryDetailsView, Target, TargetBoard,
            TargetContent, row_count_label,
        },
        validation::ValidationFailure,
    },
    filter_input::DebouncedFilterInput,
    query_engine::cascade::{self, Mutation, Refresh},
    scheduler::{RequestScheduler, ScheduledRequest},
};

/// Edit of one field of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Operator(FilterOperator),
    Value(FilterValue),
}

/// One data set page: the query being edited and everything fetched for it.
///
/// Every mutation validates first, then updates the session and finally schedules
/// the refreshes listed in [`cascade::plan`]. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct DataSetPage {
    pub(super) session: Rc<RefCell<SessionState>>,
    pub(super) scheduler: RequestScheduler,
    pub(super) board: TargetBoard,
    pub(super) endpoints: Rc<DataSetEndpoints>,
    pub(super) client: Rc<dyn EndpointClient>,
    init_args: Rc<InitializeArgs>,
    filter_debounce: Duration,
}

impl DataSetPage {
    pub fn new(config: &ExplorerConfig, init_args: InitializeArgs, client: Rc<dyn EndpointClient>) -> anyhow::Result<Self> {
        let endpoints = DataSetEndpoints::new(&config.base_url)
            .with_context(|| format!("invalid data sets url {}", config.base_url))?;
        let board = TargetBoard::new();
        let scheduler = RequestScheduler::new(client.clone(), board.clone(), config.max_concurrent_requests);
        let session = SessionState::new(&init_args.data_set_id, config.page_size);
        Ok(Self {
            session: Rc::new(RefCell::new(session)),
            scheduler,
            board,
            endpoints: Rc::new(endpoints),
            client,
            init_args: Rc::new(init_args),
            filter_debounce: config.filter_debounce,
        })
    }

    pub fn board(&self) -> &TargetBoard {
        &self.board
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn query(&self) -> Query {
        self.session.borrow().query.clone()
    }

    pub fn current_page(&self) -> u64 {
        self.session.borrow().current_page
    }

    pub fn filtered_row_count(&self) -> Option<u64> {
        self.session.borrow().filtered_row_count
    }

    pub fn catalog(&self) -> Vec<Column> {
        self.session.borrow().catalog.clone()
    }

    /// Catalog columns whose name contains `search`, for the columns list.
    pub fn search_columns(&self, search: &str) -> Vec<Column> {
        let session = self.session.borrow();
        matching_columns(&session.catalog, search).into_iter().cloned().collect()
    }

    /// Like [`Self::search_columns`], without the columns that can not be filtered.
    pub fn filter_menu(&self, search: &str) -> Vec<Column> {
        self.search_columns(search)
            .into_iter()
            .filter(|column| column.column_type.is_filterable())
            .collect()
    }

    pub fn filter_id_at(&self, position: usize) -> Option<FilterId> {
        self.session.borrow().query.filters.get(position).map(|filter| filter.id)
    }

    /// Text input for the value of filter `id`, applied after the configured quiet period.
    pub fn debounced_input(&self, id: FilterId) -> DebouncedFilterInput<DataSetPage> {
        DebouncedFilterInput::new(self.clone(), id, self.filter_debounce)
    }

    /// Fetches the catalog and the query, then loads everything else.
    pub fn initialize(&self) {
        let call = self.endpoints.initialize(&self.init_args);
        let page = self.clone();
        self.scheduler.enqueue(ScheduledRequest::for_url(call, INITIALIZATION_TARGETS.to_vec(), move |body| {
            let response: InitializeResponse = body.json().context("invalid initialize response")?;
            page.on_initialized(response);
            Ok(())
        }));
    }

    fn on_initialized(&self, response: InitializeResponse) {
        let no_columns = response.all_columns.is_empty();
        tracing::info!(
            "initialized data set {} with {} columns and {} rows",
            response.data_set_name,
            response.all_columns.len(),
            response.row_count
        );
        self.session.borrow_mut().adopt(response);
        if no_columns {
            for target in INITIALIZATION_TARGETS {
                self.board.render(target, TargetContent::NoData);
            }
            return;
        }
        self.render_column_list();
        self.render_query_details(None);
        self.run_cascade(Mutation::Initialized, None);
    }

    /// Adds a filter on `column_name`, or with `update_existing` sets the value of the
    /// first filter already on it. Without a value the column type's default is used.
    pub fn add_filter(
        &self,
        column_name: &str,
        value: Option<FilterValue>,
        update_existing: bool,
    ) -> Result<FilterId, ValidationFailure> {
        let column_type = self.filterable_column(column_name)?;

        if update_existing {
            let existing = self.session.borrow().query.filter_on_column(column_name).map(|filter| filter.id);
            if let Some(id) = existing {
                if let Some(value) = value {
                    self.change_filter(id, FilterChange::Value(value))?;
                }
                return Ok(id);
            }
        }

        let not_filterable = || ValidationFailure::NotFilterable(column_name.to_string());
        let operator = column_type.default_operator().ok_or_else(not_filterable)?;
        let value = match value {
            Some(value) => checked_value(column_name, column_type, value)?,
            None => column_type
                .default_value(chrono::Local::now().date_naive())
                .ok_or_else(not_filterable)?,
        };

        let (id, column_added) = {
            let mut session = self.session.borrow_mut();
            let id = session.push_filter(column_name, operator, value);
            (id, session.ensure_column(column_name))
        };
        tracing::debug!("added filter {} on {}", id, column_name);
        self.render_filter_list();
        if column_added {
            self.render_column_list();
        }
        self.run_cascade(Mutation::FilterAdded, Some(id));
        Ok(id)
    }

    pub fn delete_filter(&self, id: FilterId) -> Result<(), ValidationFailure> {
        self.ensure_initialized()?;
        let removed = self.session.borrow_mut().remove_filter(id);
        if removed.is_none() {
            return Err(ValidationFailure::UnknownFilter(id));
        }
        self.scheduler.cancel(&self.filter_count_key(id));
        self.board.remove(Target::FilterRow(id));
        self.board.remove(Target::FilterCount(id));
        self.run_cascade(Mutation::FilterDeleted, None);
        Ok(())
    }

    pub fn change_filter(&self, id: FilterId, change: FilterChange) -> Result<(), ValidationFailure> {
        self.ensure_initialized()?;
        let (column_name, column_type) = self.filter_column(id)?;
        let change = match change {
            FilterChange::Operator(operator) => {
                if !column_type.allowed_operators().contains(&operator) {
                    return Err(ValidationFailure::OperatorNotAllowed { column_name, operator });
                }
                FilterChange::Operator(operator)
            }
            FilterChange::Value(value) => FilterChange::Value(checked_value(&column_name, column_type, value)?),
        };

        {
            let mut session = self.session.borrow_mut();
            let filter = session.query.filter_mut(id).ok_or(ValidationFailure::UnknownFilter(id))?;
            match change {
                FilterChange::Operator(operator) => filter.operator = operator,
                FilterChange::Value(value) => filter.value = value,
            }
        }
        self.run_cascade(Mutation::FilterChanged, Some(id));
        Ok(())
    }

    /// Sets a filter value from typed text, interpreted according to the column type.
    pub fn change_filter_value_text(&self, id: FilterId, raw: &str) -> Result<(), ValidationFailure> {
        self.ensure_initialized()?;
        let (_, column_type) = self.filter_column(id)?;
        self.change_filter(id, FilterChange::Value(value_from_text(column_type, raw)))
    }

    /// Filters on a value clicked in the preview table.
    pub fn filter_on_value(&self, column_name: &str, raw: &str) -> Result<FilterId, ValidationFailure> {
        let column_type = self.filterable_column(column_name)?;
        self.add_filter(column_name, Some(value_from_text(column_type, raw)), true)
    }

    /// Filters on the row of a distribution chart the user picked.
    pub fn filter_on_chart_point(&self, column_index: usize, row: &DistributionRow) -> Result<FilterId, ValidationFailure> {
        self.ensure_initialized()?;
        let column = self
            .session
            .borrow()
            .catalog
            .get(column_index)
            .cloned()
            .ok_or_else(|| ValidationFailure::UnknownColumn(format!("#{column_index}")))?;
        let value = row.filter_value(column.column_type).ok_or_else(|| ValidationFailure::InvalidValue {
            column_name: column.column_name.clone(),
            value: format!("{row:?}"),
        })?;
        self.add_filter(&column.column_name, Some(value), true)
    }

    /// Replaces the selected columns. Charts of already visible columns are not reloaded.
    pub fn update_columns(&self, column_names: Vec<String>) -> Result<(), ValidationFailure> {
        self.ensure_initialized()?;
        {
            let session = self.session.borrow();
            if let Some(unknown) = column_names.iter().find(|name| session.column(name).is_none()) {
                return Err(ValidationFailure::UnknownColumn(unknown.clone()));
            }
        }
        self.session.borrow_mut().query.column_names = column_names;
        self.render_column_list();
        self.run_cascade(Mutation::ColumnsUpdated, None);
        Ok(())
    }

    /// Selects all columns, or none when all are selected already.
    pub fn toggle_select_all(&self) -> Result<(), ValidationFailure> {
        self.ensure_initialized()?;
        let column_names = {
            let session = self.session.borrow();
            if session.all_columns_selected() {
                Vec::new()
            } else {
                session.catalog.iter().map(|column| column.column_name.clone()).collect()
            }
        };
        self.update_columns(column_names)
    }

    /// Moves `delta` pages. Returns false when already on the first or last page.
    pub fn paginate(&self, delta: i64) -> bool {
        let moved = {
            let mut session = self.session.borrow_mut();
            session.initialized && session.paginate(delta)
        };
        if moved {
            self.run_cascade(Mutation::Paginated, None);
        }
        moved
    }

    pub fn change_sort(&self, column_name: &str) -> Result<(), ValidationFailure> {
        self.ensure_initialized()?;
        let column_type = self
            .session
            .borrow()
            .column_type(column_name)
            .ok_or_else(|| ValidationFailure::UnknownColumn(column_name.to_string()))?;
        if !column_type.is_sortable() {
            return Err(ValidationFailure::NotSortable(column_name.to_string()));
        }
        self.session.borrow_mut().query.cycle_sort(column_name);
        self.render_column_list();
        self.run_cascade(Mutation::SortChanged, None);
        Ok(())
    }

    /// Fetches everything again for the unchanged query.
    pub fn reload(&self) -> Result<(), ValidationFailure> {
        self.ensure_initialized()?;
        self.run_cascade(Mutation::Reloaded, None);
        Ok(())
    }

    pub(super) fn ensure_initialized(&self) -> Result<(), ValidationFailure> {
        if self.session.borrow().initialized { Ok(()) } else { Err(ValidationFailure::NotInitialized) }
    }

    fn filterable_column(&self, column_name: &str) -> Result<ColumnType, ValidationFailure> {
        self.ensure_initialized()?;
        let column_type = self
            .session
            .borrow()
            .column_type(column_name)
            .ok_or_else(|| ValidationFailure::UnknownColumn(column_name.to_string()))?;
        if !column_type.is_filterable() {
            return Err(ValidationFailure::NotFilterable(column_name.to_string()));
        }
        Ok(column_type)
    }

    /// Column name and type of the filter `id`.
    pub(super) fn filter_column(&self, id: FilterId) -> Result<(String, ColumnType), ValidationFailure> {
        let session = self.session.borrow();
        let filter = session.query.filter(id).ok_or(ValidationFailure::UnknownFilter(id))?;
        let column_type = session
            .column_type(&filter.column_name)
            .ok_or_else(|| ValidationFailure::UnknownColumn(filter.column_name.clone()))?;
        Ok((filter.column_name.clone(), column_type))
    }

    fn filter_count_key(&self, id: FilterId) -> String {
        format!("{}/.filter-row-count#{}", self.endpoints.base_url().trim_end_matches('/'), id)
    }

    fn run_cascade(&self, mutation: Mutation, touched: Option<FilterId>) {
        let plan = cascade::plan(mutation);
        if plan.resets_pagination {
            self.session.borrow_mut().current_page = 0;
        }
        for refresh in plan.refreshes {
            match *refresh {
                Refresh::AllFilterRows => self.refresh_all_filter_rows(),
                Refresh::TouchedFilterRow => {
                    if let Some(id) = touched {
                        self.refresh_filter_row(id);
                    }
                }
                Refresh::Preview => self.update_preview(),
                Refresh::RowCount => self.update_row_count(),
                Refresh::PaginationView => self.render_pagination(),
                Refresh::DistributionCharts { reload_all } => self.update_distribution_charts(reload_all),
            }
        }
    }

    fn render_filter_list(&self) {
        let ids = self.session.borrow().filter_ids();
        self.board.render(Target::Filters, TargetContent::FilterList(ids));
    }

    fn refresh_all_filter_rows(&self) {
        let ids = self.session.borrow().filter_ids();
        for target in self.board.targets() {
            if let Target::FilterRow(id) | Target::FilterCount(id) = target
                && !ids.contains(&id)
            {
                self.board.remove(target);
            }
        }
        self.render_filter_list();
        for id in ids {
            self.refresh_filter_row(id);
        }
    }

    /// Redraws the row of filter `id` and fetches its count. The count is requested
    /// for the filter's current position.
    fn refresh_filter_row(&self, id: FilterId) {
        let (view, call) = {
            let session = self.session.borrow();
            let Some(position) = session.query.filter_position(id) else {
                return;
            };
            let filter = &session.query.filters[position];
            let column_type = session.column_type(&filter.column_name);
            let view = FilterRowView {
                position,
                column_name: filter.column_name.clone(),
                column_type,
                operator: filter.operator,
                allowed_operators: column_type.map(|t| t.allowed_operators().to_vec()).unwrap_or_default(),
                value: filter.value.clone(),
            };
            (view, self.endpoints.filter_row_count(position, &session.query))
        };
        self.board.render(Target::FilterRow(id), TargetContent::FilterRow(view));

        let page = self.clone();
        let target = Target::FilterCount(id);
        self.scheduler.enqueue(ScheduledRequest::new(self.filter_count_key(id), call, vec![target], move |body| {
            let count: u64 = body.json().context("invalid filter row count")?;
            page.render_count(target, count);
            Ok(())
        }));
    }

    fn render_count(&self, target: Target, count: u64) {
        let label = {
            let session = self.session.borrow();
            row_count_label(count, &session.data_set_name, session.data_set_row_count)
        };
        self.board.render(target, TargetContent::Text(label));
    }

    fn update_preview(&self) {
        let call = {
            let session = self.session.borrow();
            self.endpoints.preview(&session.query, session.page_size, session.offset())
        };
        let board = self.board.clone();
        let request = ScheduledRequest::for_url(call, vec![Target::Preview], move |body| {
            board.render(Target::Preview, TargetContent::Markup(body.into_text()));
            Ok(())
        });
        self.scheduler.enqueue(request.high_priority());
    }

    fn update_row_count(&self) {
        let call = {
            let mut session = self.session.borrow_mut();
            session.filtered_row_count = None;
            self.endpoints.row_count(&session.query)
        };
        let page = self.clone();
        let request = ScheduledRequest::for_url(call, vec![Target::RowCounts, Target::Pagination], move |body| {
            let count: u64 = body.json().context("invalid row count")?;
            page.session.borrow_mut().filtered_row_count = Some(count);
            page.render_count(Target::RowCounts, count);
            page.render_pagination();
            Ok(())
        });
        self.scheduler.enqueue(request);
    }

    /// Pagination is derived from the row count; while that is being fetched its placeholder stays.
    fn render_pagination(&self) {
        if self.scheduler.is_scheduled(&self.endpoints.row_count_url()) {
            return;
        }
        let view = self.session.borrow().pagination_view();
        if let Some(view) = view {
            self.board.render(Target::Pagination, TargetContent::Pagination(view));
        }
    }

    fn update_distribution_charts(&self, reload_all: bool) {
        let (hide, fetch) = {
            let mut session = self.session.borrow_mut();
            let changes = session.refresh_visible_charts(reload_all);
            let fetch: Vec<(usize, EndpointCall)> = changes
                .fetch
                .iter()
                .map(|index| (*index, self.endpoints.distribution_chart(*index, &session.query)))
                .collect();
            (changes.hide, fetch)
        };

        for index in hide {
            self.scheduler.cancel(&self.endpoints.distribution_chart_url(index));
            self.board.remove(Target::DistributionChart(index));
        }

        for (index, call) in fetch {
            let board = self.board.clone();
            let target = Target::DistributionChart(index);
            self.scheduler.enqueue(ScheduledRequest::for_url(call, vec![target], move |body| {
                let chart: DistributionChart = body.json().context("invalid distribution chart")?;
                let content = if chart.data.is_empty() { TargetContent::NoData } else { TargetContent::Chart(chart) };
                board.render(target, content);
                Ok(())
            }));
        }
    }

    fn render_column_list(&self) {
        let items = {
            let session = self.session.borrow();
            session
                .catalog
                .iter()
                .map(|column| ColumnListItem {
                    column_name: column.column_name.clone(),
                    column_type: column.column_type,
                    selected: session.query.column_names.contains(&column.column_name),
                    sortable: column.column_type.is_sortable(),
                    sort_order: session.query.sort_order_of(&column.column_name),
                })
                .collect()
        };
        self.board.render(Target::ColumnsList, TargetContent::ColumnList(items));
    }

    pub(super) fn render_query_details(&self, alert: Option<String>) {
        let view = {
            let session = self.session.borrow();
            let query = &session.query;
            QueryDetailsView {
                query_id: query.query_id.clone().filter(|id| !id.is_empty()),
                created: provenance(&query.created_at, &query.created_by),
                updated: provenance(&query.updated_at, &query.updated_by),
                alert,
            }
        };
        self.board.render(Target::QueryDetails, TargetContent::QueryDetails(view));
    }
}

fn provenance(at: &Option<String>, by: &Option<String>) -> Option<String> {
    let at = at.as_deref()?;
    Some(match by.as_deref() {
        Some(by) => format!("{} ({})", at, by),
        None => at.to_string(),
    })
}

/// Interprets typed or clicked text as a filter value for a column of `column_type`.
fn value_from_text(column_type: ColumnType, raw: &str) -> FilterValue {
    match column_type {
        ColumnType::Text | ColumnType::TextArray => FilterValue::List(vec![raw.to_string()]),
        ColumnType::Date => FilterValue::Text(raw.trim().chars().take(10).collect()),
        ColumnType::Number | ColumnType::Json => FilterValue::Text(raw.trim().to_string()),
    }
}

/// Checks the value's shape against the column type; numbers given as text are parsed.
fn checked_value(column_name: &str, column_type: ColumnType, value: FilterValue) -> Result<FilterValue, ValidationFailure> {
    let invalid = |value: &FilterValue| ValidationFailure::InvalidValue {
        column_name: column_name.to_string(),
        value: value.to_string(),
    };
    if !column_type.accepts(&value) {
        return Err(invalid(&value));
    }
    if let (ColumnType::Number, FilterValue::Text(raw)) = (column_type, &value) {
        return match raw.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(FilterValue::Number(number)),
            _ => Err(invalid(&value)),
        };
    }
    Ok(value)
}
