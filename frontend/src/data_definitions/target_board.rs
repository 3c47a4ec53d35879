//! The UI slots request results are rendered into.
//!
//! Rendering itself is out of scope for the page core: a target holds a typed
//! description of what should be shown, and a view layer (or the headless
//! runner) reads it back.

use std::{cell::RefCell, collections::BTreeMap, fmt::Display, rc::Rc};

use common::{
    column::ColumnType,
    data_set_query::{FilterId, FilterOperator, FilterValue, SortOrder},
    explorer_const::NO_DATA_MARKER,
    explorer_result::DistributionChart,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    ColumnsList,
    Preview,
    Filters,
    FilterRow(FilterId),
    FilterCount(FilterId),
    RowCounts,
    Pagination,
    QueryDetails,
    /// Chart of the catalog column with this index.
    DistributionChart(usize),
    QueryDisplay,
    QueryList,
}

/// Everything that is (re)filled by the initialize request.
pub const INITIALIZATION_TARGETS: [Target; 6] = [
    Target::ColumnsList,
    Target::Preview,
    Target::Filters,
    Target::RowCounts,
    Target::Pagination,
    Target::QueryDetails,
];

#[derive(Debug, Clone, PartialEq)]
pub struct FilterRowView {
    pub position: usize,
    pub column_name: String,
    /// `None` when the column is no longer in the catalog.
    pub column_type: Option<ColumnType>,
    pub operator: FilterOperator,
    pub allowed_operators: Vec<FilterOperator>,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationView {
    /// First shown row, 1-based. Zero when there are no rows.
    pub from: u64,
    pub to: u64,
    pub total: u64,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnListItem {
    pub column_name: String,
    pub column_type: ColumnType,
    pub selected: bool,
    pub sortable: bool,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDetailsView {
    pub query_id: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    /// Inline message next to the query name input.
    pub alert: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetContent {
    Blank,
    /// Placeholder keeping the previous height of the target.
    Loading { height_px: u32 },
    NoData,
    /// Markup from the server, shown as-is.
    Markup(String),
    Text(String),
    Chart(DistributionChart),
    FilterList(Vec<FilterId>),
    FilterRow(FilterRowView),
    Pagination(PaginationView),
    ColumnList(Vec<ColumnListItem>),
    QueryDetails(QueryDetailsView),
    /// Explanation sent with a 403 response.
    AccessDenied(String),
    /// Error marker; the detail is shown as a tooltip.
    Error(String),
}

impl TargetContent {
    pub fn is_loading(&self) -> bool {
        matches!(self, TargetContent::Loading { .. })
    }
}

impl Display for TargetContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetContent::Blank => Ok(()),
            TargetContent::Loading { .. } => write!(f, "..."),
            TargetContent::NoData => write!(f, "{}", NO_DATA_MARKER),
            TargetContent::Markup(markup) => write!(f, "{} bytes of markup", markup.len()),
            TargetContent::Text(text) => write!(f, "{}", text),
            TargetContent::Chart(chart) => {
                write!(f, "{} chart of {} ({} rows)", chart.column.column_name, type_name(chart.column.column_type), chart.data.len())
            }
            TargetContent::FilterList(ids) => write!(f, "{} filters", ids.len()),
            TargetContent::FilterRow(row) => write!(f, "{} {} {}", row.column_name, row.operator, row.value),
            TargetContent::Pagination(view) => {
                write!(f, "Rows {} - {} of {}", view.from, view.to, view.total)
            }
            TargetContent::ColumnList(items) => {
                let selected = items.iter().filter(|item| item.selected).count();
                write!(f, "{} of {} columns selected", selected, items.len())
            }
            TargetContent::QueryDetails(details) => match (&details.alert, &details.query_id) {
                (Some(alert), _) => write!(f, "{}", alert),
                (None, Some(query_id)) => write!(f, "query {}", query_id),
                (None, None) => write!(f, "unsaved query"),
            },
            TargetContent::AccessDenied(explanation) => write!(f, "access denied: {}", explanation),
            TargetContent::Error(detail) => write!(f, "error: {}", detail),
        }
    }
}

fn type_name(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Text => "text",
        ColumnType::TextArray => "text[]",
        ColumnType::Number => "number",
        ColumnType::Date => "date",
        ColumnType::Json => "json",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Danger,
}

/// Transient message shown outside of any target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn danger(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Danger, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Success, message: message.into() }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    content: TargetContent,
    height_px: u32,
}

#[derive(Debug, Default)]
struct Board {
    slots: BTreeMap<Target, Slot>,
    notifications: Vec<Notification>,
}

/// Shared handle to the content of all targets of one page.
#[derive(Debug, Clone, Default)]
pub struct TargetBoard {
    inner: Rc<RefCell<Board>>,
}

impl TargetBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the rendered height of a target, reported back by the view layer.
    pub fn set_height(&self, target: Target, height_px: u32) {
        let mut board = self.inner.borrow_mut();
        board
            .slots
            .entry(target)
            .or_insert(Slot { content: TargetContent::Blank, height_px: 0 })
            .height_px = height_px;
    }

    pub fn height(&self, target: Target) -> u32 {
        self.inner.borrow().slots.get(&target).map(|slot| slot.height_px).unwrap_or(0)
    }

    pub fn show_loading(&self, target: Target) {
        let height_px = self.height(target);
        self.render(target, TargetContent::Loading { height_px });
    }

    pub fn render(&self, target: Target, content: TargetContent) {
        let mut board = self.inner.borrow_mut();
        match board.slots.get_mut(&target) {
            Some(slot) => slot.content = content,
            None => {
                board.slots.insert(target, Slot { content, height_px: 0 });
            }
        }
    }

    pub fn content(&self, target: Target) -> Option<TargetContent> {
        self.inner.borrow().slots.get(&target).map(|slot| slot.content.clone())
    }

    pub fn remove(&self, target: Target) {
        self.inner.borrow_mut().slots.remove(&target);
    }

    pub fn targets(&self) -> Vec<Target> {
        self.inner.borrow().slots.keys().copied().collect()
    }

    pub fn snapshot(&self) -> Vec<(Target, TargetContent)> {
        self.inner
            .borrow()
            .slots
            .iter()
            .map(|(target, slot)| (*target, slot.content.clone()))
            .collect()
    }

    pub fn notify(&self, notification: Notification) {
        self.inner.borrow_mut().notifications.push(notification);
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.inner.borrow_mut().notifications)
    }
}

/// `"{count} {data_set_name} ({percent}%)"`, the percentage rounded to one decimal.
pub fn row_count_label(count: u64, data_set_name: &str, total: u64) -> String {
    if total == 0 {
        return format!("{} {}", count, data_set_name);
    }
    let percent = (1000.0 * count as f64 / total as f64).round() / 10.0;
    format!("{} {} ({}%)", count, data_set_name, percent)
}
