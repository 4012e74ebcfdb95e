//! Derived views: pure projections of query snapshots into display rows.
//!
//! Builders never touch the network and never mutate the snapshot. The same
//! snapshot, context and filter always give the same rows in the same order.

pub mod absence_table;
pub mod child_cards;
pub mod context;

pub use absence_table::{build_absence_table, AbsenceRow, AbsenceTableBuilder, RowActions, StatusTone};
pub use child_cards::{build_child_cards, AbsenceSummary, ChildCard, ChildCardBuilder};
pub use context::{matches_filter, DerivedView, SortKey, ViewContext};

use shared::Child;

use crate::sync::{PageState, QueryState};

pub trait DerivedViewBuilder {
    type Row;

    fn build(&self, children: &[Child], ctx: &ViewContext, filter: &str) -> DerivedView<Self::Row>;
}

/// What a page shows for one query: its status plus rows built from the
/// latest snapshot, if there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub state: PageState,
    pub view: Option<DerivedView<R>>,
    /// Message for the latest failed poll
    pub notice: Option<String>,
}

impl<R> Page<R> {
    pub fn rows(&self) -> &[R] {
        self.view.as_ref().map(|v| v.rows.as_slice()).unwrap_or(&[])
    }
}

/// Build a page from a list query such as `GetParentsChildren`.
pub fn build_page<B: DerivedViewBuilder>(
    builder: &B,
    state: &QueryState<Vec<Child>>,
    ctx: &ViewContext,
    filter: &str,
) -> Page<B::Row> {
    Page {
        state: state.page_state(),
        view: state
            .snapshot
            .as_deref()
            .map(|children| builder.build(children, ctx, filter)),
        notice: state.error.as_ref().map(|e| e.to_string()),
    }
}

/// Build a page from a single-child query (`ViewChild`).
pub fn build_child_page<B: DerivedViewBuilder>(
    builder: &B,
    state: &QueryState<Child>,
    ctx: &ViewContext,
    filter: &str,
) -> Page<B::Row> {
    Page {
        state: state.page_state(),
        view: state
            .snapshot
            .as_deref()
            .map(|child| builder.build(std::slice::from_ref(child), ctx, filter)),
        notice: state.error.as_ref().map(|e| e.to_string()),
    }
}
