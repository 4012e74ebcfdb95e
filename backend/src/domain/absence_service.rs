//! Absence requests: submission by parents, cancellation while pending, and
//! decisions by teachers.
//!
//! Status changes only ever move forward (pending to approved or rejected).
//! Every write goes through a conditional storage call so a request that
//! was decided in the meantime is never deleted or re-decided.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use shared::validation::validate_add_absence_request;
use shared::{
    AbsenceRequest, AbsenceStatus, AddAbsenceRequestInput, DeleteAbsenceRequestInput,
    RespondToAbsenceRequestInput, Role, SessionContext,
};

use super::child_service::require_parent;
use super::errors::{DomainError, DomainResult};
use super::models::{AbsenceRecord, StudentRecord};
use crate::storage::{AbsenceRequestStorage, MemoryConnection, StudentStorage};

#[derive(Clone)]
pub struct AbsenceService {
    db: Arc<MemoryConnection>,
}

impl AbsenceService {
    pub fn new(db: Arc<MemoryConnection>) -> Self {
        Self { db }
    }

    /// Submit a new request for one of the caller's children. New requests
    /// always start out pending.
    pub fn add_absence_request(
        &self,
        session: &SessionContext,
        input: AddAbsenceRequestInput,
    ) -> DomainResult<AbsenceRequest> {
        let validation = validate_add_absence_request(&input);
        if !validation.is_valid {
            return Err(DomainError::Validation(validation.message()));
        }

        let student = self.owned_student(session, &input.student_id)?;
        let date_time = DateTime::parse_from_rfc3339(input.date_time.trim())
            .map_err(|e| DomainError::Validation(format!("dateTime: {e}")))?
            .with_timezone(&Utc);

        let record = AbsenceRecord {
            id: AbsenceRecord::generate_id(),
            child_id: student.id.clone(),
            kind: input.kind.trim().to_string(),
            description: input.description.trim().to_string(),
            date_time,
            status: AbsenceStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
        };
        self.db.store_absence_request(&record)?;

        info!("Created absence request {} for student {}", record.id, student.id);
        Ok(record.to_dto())
    }

    /// Cancel a request. Only the owning parent may do this, and only while
    /// the request is still pending.
    pub fn delete_absence_request(
        &self,
        session: &SessionContext,
        input: DeleteAbsenceRequestInput,
    ) -> DomainResult<bool> {
        info!(
            "Deleting absence request {} for student {}",
            input.absence_request_id, input.student_id
        );

        let student = self.owned_student(session, &input.student_id)?;
        let current = self.request_for_student(&student.id, &input.absence_request_id)?;

        if !current.status.is_pending() {
            warn!(
                "Refusing to delete absence request {} with status {}",
                current.id, current.status
            );
            return Err(DomainError::AbsenceNotPending(current.id));
        }

        if self
            .db
            .delete_absence_request_if(&current.id, AbsenceStatus::Pending)?
        {
            info!("Deleted absence request {}", current.id);
            return Ok(true);
        }

        // Decided or removed between the read and the delete.
        match self.db.get_absence_request(&current.id)? {
            Some(_) => Err(DomainError::AbsenceNotPending(current.id)),
            None => Err(DomainError::NotFound(format!("absence request {}", current.id))),
        }
    }

    /// Record a teacher's decision on a pending request.
    pub fn respond_to_absence_request(
        &self,
        session: &SessionContext,
        input: RespondToAbsenceRequestInput,
    ) -> DomainResult<AbsenceRequest> {
        if session.role != Role::Teacher {
            return Err(DomainError::Unauthorized(
                "only teachers can decide absence requests".to_string(),
            ));
        }
        info!(
            "Teacher {:?} setting absence request {} to {}",
            session.user_id, input.absence_request_id, input.status
        );

        let current = self.request_for_student(&input.student_id, &input.absence_request_id)?;
        if !current.status.can_transition_to(input.status) {
            return Err(DomainError::InvalidStatusTransition {
                from: current.status,
                to: input.status,
            });
        }

        match self
            .db
            .compare_and_set_status(&current.id, current.status, input.status)?
        {
            Some(updated) => {
                info!("Absence request {} is now {}", updated.id, updated.status);
                Ok(updated.to_dto())
            }
            None => {
                let latest = self.db.get_absence_request(&current.id)?.ok_or_else(|| {
                    DomainError::NotFound(format!("absence request {}", current.id))
                })?;
                Err(DomainError::InvalidStatusTransition {
                    from: latest.status,
                    to: input.status,
                })
            }
        }
    }

    fn owned_student(&self, session: &SessionContext, student_id: &str) -> DomainResult<StudentRecord> {
        let parent_id = require_parent(session)?;
        let student = self
            .db
            .get_student(student_id)?
            .ok_or_else(|| DomainError::NotFound(format!("student {student_id}")))?;

        if student.parent_id != parent_id {
            return Err(DomainError::Unauthorized(format!(
                "student {student_id} does not belong to this parent"
            )));
        }
        Ok(student)
    }

    fn request_for_student(&self, student_id: &str, absence_request_id: &str) -> DomainResult<AbsenceRecord> {
        match self.db.get_absence_request(absence_request_id)? {
            Some(record) if record.child_id == student_id => Ok(record),
            _ => Err(DomainError::NotFound(format!(
                "absence request {absence_request_id} for student {student_id}"
            ))),
        }
    }
}
