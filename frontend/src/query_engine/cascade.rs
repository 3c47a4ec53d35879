//! Which refreshes every mutation of the query causes.

/// A mutation of the query, as far as the re-fetch cascade is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Initialized,
    Reloaded,
    FilterAdded,
    FilterDeleted,
    FilterChanged,
    ColumnsUpdated,
    Paginated,
    SortChanged,
}

/// One downstream refresh. Some are requests, some only re-render local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Redraw the filter table and fetch every filter count.
    AllFilterRows,
    /// Redraw the touched filter's row and fetch its count.
    TouchedFilterRow,
    Preview,
    RowCount,
    /// Re-render the pagination from the known row count, without a request.
    PaginationView,
    /// Sync charts with the selected columns; `reload_all` re-fetches the visible ones too.
    DistributionCharts { reload_all: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadePlan {
    pub resets_pagination: bool,
    /// In the order they are scheduled.
    pub refreshes: &'static [Refresh],
}

impl CascadePlan {
    pub fn includes(&self, refresh: Refresh) -> bool {
        self.refreshes.contains(&refresh)
    }
}

pub const fn plan(mutation: Mutation) -> CascadePlan {
    use Refresh::*;
    const RELOAD_CHARTS: Refresh = DistributionCharts { reload_all: true };
    match mutation {
        Mutation::Initialized => CascadePlan {
            resets_pagination: true,
            refreshes: &[AllFilterRows, Preview, RowCount, RELOAD_CHARTS],
        },
        Mutation::Reloaded => CascadePlan {
            resets_pagination: false,
            refreshes: &[AllFilterRows, Preview, RowCount, RELOAD_CHARTS],
        },
        Mutation::FilterAdded => CascadePlan {
            resets_pagination: true,
            refreshes: &[TouchedFilterRow, Preview, RowCount, RELOAD_CHARTS],
        },
        Mutation::FilterDeleted => CascadePlan {
            resets_pagination: true,
            refreshes: &[AllFilterRows, Preview, RowCount, RELOAD_CHARTS],
        },
        Mutation::FilterChanged => CascadePlan {
            resets_pagination: true,
            refreshes: &[Preview, RowCount, TouchedFilterRow, RELOAD_CHARTS],
        },
        Mutation::ColumnsUpdated => CascadePlan {
            resets_pagination: true,
            refreshes: &[PaginationView, Preview, DistributionCharts { reload_all: false }],
        },
        Mutation::Paginated => CascadePlan { resets_pagination: false, refreshes: &[PaginationView, Preview] },
        Mutation::SortChanged => CascadePlan { resets_pagination: true, refreshes: &[PaginationView, Preview] },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Mutation; 8] = [
        Mutation::Initialized,
        Mutation::Reloaded,
        Mutation::FilterAdded,
        Mutation::FilterDeleted,
        Mutation::FilterChanged,
        Mutation::ColumnsUpdated,
        Mutation::Paginated,
        Mutation::SortChanged,
    ];

    #[test]
    fn every_mutation_refreshes_the_preview_once() {
        for mutation in ALL {
            let plan = plan(mutation);
            assert_eq!(plan.refreshes.iter().filter(|r| **r == Refresh::Preview).count(), 1, "{mutation:?}");
        }
    }

    #[test]
    fn row_content_changes_reset_pagination() {
        for mutation in ALL {
            let expected = !matches!(mutation, Mutation::Paginated | Mutation::Reloaded);
            assert_eq!(plan(mutation).resets_pagination, expected, "{mutation:?}");
        }
    }

    #[test]
    fn filter_changes_reload_counts_and_charts() {
        for mutation in [Mutation::FilterAdded, Mutation::FilterDeleted, Mutation::FilterChanged] {
            let plan = plan(mutation);
            assert!(plan.includes(Refresh::RowCount), "{mutation:?}");
            assert!(plan.includes(Refresh::DistributionCharts { reload_all: true }), "{mutation:?}");
        }
        assert!(plan(Mutation::FilterDeleted).includes(Refresh::AllFilterRows));
        assert!(plan(Mutation::FilterChanged).includes(Refresh::TouchedFilterRow));
    }

    #[test]
    fn column_selection_does_not_reload_visible_charts() {
        let plan = plan(Mutation::ColumnsUpdated);
        assert!(plan.includes(Refresh::DistributionCharts { reload_all: false }));
        assert!(!plan.includes(Refresh::RowCount));
    }

    #[test]
    fn paging_and_sorting_only_touch_the_preview() {
        for mutation in [Mutation::Paginated, Mutation::SortChanged] {
            assert_eq!(plan(mutation).refreshes, &[Refresh::PaginationView, Refresh::Preview]);
        }
    }
}
