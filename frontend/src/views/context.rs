use shared::{Child, Role, SessionContext};

/// How rows are ordered. Ties always fall back to the row's record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// The order records arrive in the snapshot
    #[default]
    SnapshotOrder,
    DateTime,
    ChildName,
}

/// Everything a view build needs besides the snapshot itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewContext {
    pub session: SessionContext,
    pub sort: SortKey,
}

impl ViewContext {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            sort: SortKey::default(),
        }
    }

    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn role(&self) -> Role {
        self.session.role
    }

    /// Whether the session may see `child` at all.
    pub fn can_see(&self, child: &Child) -> bool {
        match self.session.role {
            Role::Parent => self.session.user_id.as_deref() == Some(child.parent_id.as_str()),
            Role::Teacher => self.session.year_group_id.as_deref() == Some(child.year_group.id.as_str()),
            Role::Anonymous => false,
        }
    }
}

/// Rows ready for display. `is_empty` is what pages check to show their
/// empty state.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView<R> {
    pub rows: Vec<R>,
    pub is_empty: bool,
}

impl<R> DerivedView<R> {
    pub fn new(rows: Vec<R>) -> Self {
        let is_empty = rows.is_empty();
        Self { rows, is_empty }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Case-insensitive substring match on the child's full name. Only the
/// empty filter matches everyone; whitespace is matched like any other text.
pub fn matches_filter(child: &Child, filter: &str) -> bool {
    let needle = filter.to_lowercase();
    needle.is_empty() || child.full_name().to_lowercase().contains(&needle)
}

/// Children the session may see that pass the name filter, in snapshot
/// order.
pub(crate) fn visible_children<'a>(
    children: &'a [Child],
    ctx: &'a ViewContext,
    filter: &'a str,
) -> impl Iterator<Item = &'a Child> + 'a {
    children
        .iter()
        .filter(move |child| ctx.can_see(child) && matches_filter(child, filter))
}

pub(crate) fn order_rows<R, K: Ord>(rows: &mut [R], key: impl Fn(&R) -> K, id: impl Fn(&R) -> &str) {
    rows.sort_by(|a, b| key(a).cmp(&key(b)).then_with(|| id(a).cmp(id(b))));
}

/// Compares names without regard to case.
pub(crate) fn name_key(name: &str) -> String {
    name.to_lowercase()
}
