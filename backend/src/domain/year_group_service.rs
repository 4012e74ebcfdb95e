use std::sync::Arc;
use tracing::info;

use shared::YearGroup;

use super::errors::DomainResult;
use crate::storage::{MemoryConnection, YearGroupStorage};

#[derive(Clone)]
pub struct YearGroupService {
    db: Arc<MemoryConnection>,
}

impl YearGroupService {
    pub fn new(db: Arc<MemoryConnection>) -> Self {
        Self { db }
    }

    pub fn list_year_groups(&self) -> DomainResult<Vec<YearGroup>> {
        let year_groups = self.db.list_year_groups()?;
        info!("Found {} year groups", year_groups.len());
        Ok(year_groups)
    }
}
