//! # Storage Traits
//!
//! Storage abstraction used by the domain services. All operations are
//! synchronous; implementations guard their own state.

use anyhow::Result;
use shared::{AbsenceStatus, YearGroup};

use crate::domain::models::{AbsenceRecord, StudentRecord, UserRecord};

/// Trait defining the interface for student storage operations
pub trait StudentStorage: Send + Sync {
    /// Store a new student
    fn store_student(&self, student: &StudentRecord) -> Result<()>;

    /// Retrieve a specific student by ID
    fn get_student(&self, student_id: &str) -> Result<Option<StudentRecord>>;

    /// Students registered by a parent, in registration order
    fn list_students_for_parent(&self, parent_id: &str) -> Result<Vec<StudentRecord>>;

    /// Students in a year group, in registration order
    fn list_students_in_year_group(&self, year_group_id: &str) -> Result<Vec<StudentRecord>>;
}

/// Trait defining the interface for absence request storage operations
pub trait AbsenceRequestStorage: Send + Sync {
    fn store_absence_request(&self, request: &AbsenceRecord) -> Result<()>;

    fn get_absence_request(&self, absence_request_id: &str) -> Result<Option<AbsenceRecord>>;

    /// Requests for one student, in submission order
    fn list_absence_requests_for_student(&self, student_id: &str) -> Result<Vec<AbsenceRecord>>;

    /// Set `next` only if the stored status is still `expected`.
    /// Returns the updated record, or `None` if the status had moved on or
    /// the record is gone.
    fn compare_and_set_status(
        &self,
        absence_request_id: &str,
        expected: AbsenceStatus,
        next: AbsenceStatus,
    ) -> Result<Option<AbsenceRecord>>;

    /// Delete only if the stored status is still `expected`.
    /// Returns true if a record was removed.
    fn delete_absence_request_if(&self, absence_request_id: &str, expected: AbsenceStatus) -> Result<bool>;
}

/// Trait defining the interface for year group storage operations
pub trait YearGroupStorage: Send + Sync {
    fn store_year_group(&self, year_group: &YearGroup) -> Result<()>;

    fn get_year_group(&self, year_group_id: &str) -> Result<Option<YearGroup>>;

    fn list_year_groups(&self) -> Result<Vec<YearGroup>>;
}

/// Trait defining the interface for user account storage operations
pub trait UserStorage: Send + Sync {
    /// Store a new user. Fails if the email is already registered.
    fn store_user(&self, user: &UserRecord) -> Result<()>;

    fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
}
