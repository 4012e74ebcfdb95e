//! Absence table: one row per absence request across every visible child.
//!
//! Parents see their own children's requests with a cancel action while a
//! request is still pending. Teachers see their year group's requests with
//! approve and reject actions under the same condition.

use shared::{AbsenceRequest, AbsenceStatus, Child, Role};

use super::context::{name_key, order_rows, visible_children, DerivedView, SortKey, ViewContext};
use super::DerivedViewBuilder;
use crate::services::date_utils::{format_absence_date_time, timestamp_key};

/// Display colour for a request's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Amber,
    Green,
    Red,
}

impl StatusTone {
    pub fn css_class(&self) -> &'static str {
        match self {
            StatusTone::Amber => "status-pending",
            StatusTone::Green => "status-approved",
            StatusTone::Red => "status-rejected",
        }
    }
}

pub fn status_tone(status: AbsenceStatus) -> StatusTone {
    match status {
        AbsenceStatus::Pending => StatusTone::Amber,
        AbsenceStatus::Approved => StatusTone::Green,
        AbsenceStatus::Rejected => StatusTone::Red,
    }
}

/// Only pending requests can still be withdrawn.
pub fn can_cancel(status: AbsenceStatus) -> bool {
    status.is_pending()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowActions {
    pub cancel: bool,
    pub approve: bool,
    pub reject: bool,
}

pub fn row_actions(status: AbsenceStatus, role: Role) -> RowActions {
    let open = status.is_pending();
    match role {
        Role::Parent => RowActions {
            cancel: can_cancel(status),
            ..RowActions::default()
        },
        Role::Teacher => RowActions {
            cancel: false,
            approve: open,
            reject: open,
        },
        Role::Anonymous => RowActions::default(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbsenceRow {
    pub child_id: String,
    pub child_name: String,
    pub year_group: String,
    pub absence_request_id: String,
    pub kind: String,
    pub description: String,
    /// Display form of the absence timestamp
    pub date_time: String,
    pub raw_date_time: String,
    pub status: AbsenceStatus,
    pub tone: StatusTone,
    pub actions: RowActions,
}

impl AbsenceRow {
    fn new(child: &Child, request: &AbsenceRequest, role: Role) -> Self {
        Self {
            child_id: child.id.clone(),
            child_name: child.full_name(),
            year_group: child.year_group.title.clone(),
            absence_request_id: request.id.clone(),
            kind: request.kind.clone(),
            description: request.description.clone(),
            date_time: format_absence_date_time(&request.date_time),
            raw_date_time: request.date_time.clone(),
            status: request.status,
            tone: status_tone(request.status),
            actions: row_actions(request.status, role),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AbsenceTableBuilder;

impl DerivedViewBuilder for AbsenceTableBuilder {
    type Row = AbsenceRow;

    fn build(&self, children: &[Child], ctx: &ViewContext, filter: &str) -> DerivedView<AbsenceRow> {
        build_absence_table(children, ctx, filter)
    }
}

pub fn build_absence_table(children: &[Child], ctx: &ViewContext, filter: &str) -> DerivedView<AbsenceRow> {
    let role = ctx.role();
    let mut rows: Vec<AbsenceRow> = visible_children(children, ctx, filter)
        .flat_map(|child| {
            child
                .absence_requests
                .iter()
                .map(move |request| AbsenceRow::new(child, request, role))
        })
        .collect();

    match ctx.sort {
        SortKey::SnapshotOrder => {}
        SortKey::DateTime => order_rows(&mut rows, |row| timestamp_key(&row.raw_date_time), request_id),
        SortKey::ChildName => order_rows(&mut rows, |row| name_key(&row.child_name), request_id),
    }

    DerivedView::new(rows)
}

fn request_id(row: &AbsenceRow) -> &str {
    &row.absence_request_id
}
