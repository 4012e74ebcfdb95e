use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use shared::validation::validate_add_student;
use shared::{AddStudentInput, Child, Role, SessionContext};

use super::errors::{DomainError, DomainResult};
use super::models::StudentRecord;
use crate::storage::{AbsenceRequestStorage, MemoryConnection, StudentStorage, YearGroupStorage};

/// Service for registering children and reading them back with their
/// year group and absence requests attached
#[derive(Clone)]
pub struct ChildService {
    db: Arc<MemoryConnection>,
}

impl ChildService {
    pub fn new(db: Arc<MemoryConnection>) -> Self {
        Self { db }
    }

    /// Register a child for the calling parent
    pub fn add_student(&self, session: &SessionContext, input: AddStudentInput) -> DomainResult<Child> {
        let parent_id = require_parent(session)?;
        info!(
            "Adding student: first_name={}, last_name={}, dob={}, year_group={}",
            input.first_name, input.last_name, input.dob, input.year_group
        );

        let validation = validate_add_student(&input);
        if !validation.is_valid {
            return Err(DomainError::Validation(validation.message()));
        }

        let year_group_id = input.year_group.trim().to_string();
        if self.db.get_year_group(&year_group_id)?.is_none() {
            return Err(DomainError::Validation(format!(
                "Unknown year group: {year_group_id}"
            )));
        }

        let dob = NaiveDate::parse_from_str(input.dob.trim(), "%Y-%m-%d")
            .map_err(|e| DomainError::Validation(format!("dob: {e}")))?;

        let record = StudentRecord {
            id: StudentRecord::generate_id(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            dob,
            profile_image_url: input.profile_image_url.filter(|url| !url.trim().is_empty()),
            parent_id: parent_id.to_string(),
            year_group_id,
            medical: None,
            created_at: Utc::now(),
        };

        self.db.store_student(&record)?;
        info!("Added student {} for parent {}", record.id, parent_id);

        self.assemble(&record)
    }

    /// Children registered by the calling parent
    pub fn parents_children(&self, session: &SessionContext) -> DomainResult<Vec<Child>> {
        let parent_id = require_parent(session)?;

        let records = self.db.list_students_for_parent(parent_id)?;
        info!("Found {} children for parent {}", records.len(), parent_id);

        records.iter().map(|r| self.assemble(r)).collect()
    }

    /// Students in a year group, for a teacher
    pub fn teacher_students(&self, session: &SessionContext, year_group_id: &str) -> DomainResult<Vec<Child>> {
        if session.role != Role::Teacher {
            return Err(DomainError::Unauthorized(
                "only teachers can list students".to_string(),
            ));
        }
        if self.db.get_year_group(year_group_id)?.is_none() {
            return Err(DomainError::NotFound(format!("year group {year_group_id}")));
        }

        let records = self.db.list_students_in_year_group(year_group_id)?;
        info!("Found {} students in year group {}", records.len(), year_group_id);

        records.iter().map(|r| self.assemble(r)).collect()
    }

    /// A single child, visible to its parent and to teachers
    pub fn view_child(&self, session: &SessionContext, student_id: &str) -> DomainResult<Child> {
        let record = self.db.get_student(student_id)?.ok_or_else(|| {
            warn!("Student not found: {}", student_id);
            DomainError::NotFound(format!("student {student_id}"))
        })?;

        let allowed = match session.role {
            Role::Parent => session.user_id.as_deref() == Some(record.parent_id.as_str()),
            Role::Teacher => true,
            Role::Anonymous => false,
        };
        if !allowed {
            return Err(DomainError::Unauthorized(format!(
                "student {student_id} is not visible to this session"
            )));
        }

        self.assemble(&record)
    }

    fn assemble(&self, record: &StudentRecord) -> DomainResult<Child> {
        let year_group = self
            .db
            .get_year_group(&record.year_group_id)?
            .ok_or_else(|| {
                DomainError::Internal(format!(
                    "student {} references missing year group {}",
                    record.id, record.year_group_id
                ))
            })?;
        let requests = self.db.list_absence_requests_for_student(&record.id)?;

        Ok(record.to_dto(year_group, &requests))
    }
}

/// The calling parent's id, or `Unauthorized`
pub(crate) fn require_parent(session: &SessionContext) -> DomainResult<&str> {
    match (session.role, session.user_id.as_deref()) {
        (Role::Parent, Some(id)) if !id.is_empty() => Ok(id),
        _ => Err(DomainError::Unauthorized(
            "a signed-in parent is required".to_string(),
        )),
    }
}
