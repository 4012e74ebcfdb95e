use chrono::NaiveDate;

use shared::{AbsenceStatus, Child};

use super::context::{name_key, order_rows, visible_children, DerivedView, SortKey, ViewContext};
use super::DerivedViewBuilder;
use crate::services::date_utils::format_date_of_birth;

/// Request counts for one child, by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AbsenceSummary {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl AbsenceSummary {
    pub fn of(child: &Child) -> Self {
        child
            .absence_requests
            .iter()
            .fold(Self::default(), |mut summary, request| {
                match request.status {
                    AbsenceStatus::Pending => summary.pending += 1,
                    AbsenceStatus::Approved => summary.approved += 1,
                    AbsenceStatus::Rejected => summary.rejected += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChildCard {
    pub child_id: String,
    pub name: String,
    pub year_group: String,
    pub date_of_birth: String,
    pub raw_dob: String,
    pub profile_image_url: Option<String>,
    pub has_medical_record: bool,
    pub absences: AbsenceSummary,
}

impl ChildCard {
    fn new(child: &Child) -> Self {
        Self {
            child_id: child.id.clone(),
            name: child.full_name(),
            year_group: child.year_group.title.clone(),
            date_of_birth: format_date_of_birth(&child.dob),
            raw_dob: child.dob.clone(),
            profile_image_url: child.profile_image_url.clone(),
            has_medical_record: child.medical.is_some(),
            absences: AbsenceSummary::of(child),
        }
    }

    pub fn pending_requests(&self) -> usize {
        self.absences.pending
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChildCardBuilder;

impl DerivedViewBuilder for ChildCardBuilder {
    type Row = ChildCard;

    fn build(&self, children: &[Child], ctx: &ViewContext, filter: &str) -> DerivedView<ChildCard> {
        build_child_cards(children, ctx, filter)
    }
}

/// One card per visible child. Sorting by date uses the date of birth.
pub fn build_child_cards(children: &[Child], ctx: &ViewContext, filter: &str) -> DerivedView<ChildCard> {
    let mut rows: Vec<ChildCard> = visible_children(children, ctx, filter).map(ChildCard::new).collect();

    match ctx.sort {
        SortKey::SnapshotOrder => {}
        SortKey::DateTime => order_rows(&mut rows, |card| dob_key(&card.raw_dob), card_id),
        SortKey::ChildName => order_rows(&mut rows, |card| name_key(&card.name), card_id),
    }

    DerivedView::new(rows)
}

fn card_id(card: &ChildCard) -> &str {
    &card.child_id
}

fn dob_key(raw: &str) -> (bool, Option<NaiveDate>) {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => (false, Some(date)),
        Err(_) => (true, None),
    }
}
