//! In-memory storage backend.
//!
//! Records are kept in insertion order so list operations return them in
//! the order they were created.

use anyhow::{anyhow, bail, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use shared::{AbsenceStatus, YearGroup};

use super::traits::{AbsenceRequestStorage, StudentStorage, UserStorage, YearGroupStorage};
use crate::domain::models::{AbsenceRecord, StudentRecord, UserRecord};

#[derive(Default)]
struct StoreState {
    year_groups: Vec<YearGroup>,
    students: Vec<StudentRecord>,
    absence_requests: Vec<AbsenceRecord>,
    users: Vec<UserRecord>,
}

/// MemoryConnection holds every record the store owns
#[derive(Default)]
pub struct MemoryConnection {
    state: Mutex<StoreState>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl StudentStorage for MemoryConnection {
    fn store_student(&self, student: &StudentRecord) -> Result<()> {
        let mut state = self.state()?;
        if state.students.iter().any(|s| s.id == student.id) {
            bail!("Student already exists: {}", student.id);
        }
        debug!("Storing student {}", student.id);
        state.students.push(student.clone());
        Ok(())
    }

    fn get_student(&self, student_id: &str) -> Result<Option<StudentRecord>> {
        let state = self.state()?;
        Ok(state.students.iter().find(|s| s.id == student_id).cloned())
    }

    fn list_students_for_parent(&self, parent_id: &str) -> Result<Vec<StudentRecord>> {
        let state = self.state()?;
        Ok(state
            .students
            .iter()
            .filter(|s| s.parent_id == parent_id)
            .cloned()
            .collect())
    }

    fn list_students_in_year_group(&self, year_group_id: &str) -> Result<Vec<StudentRecord>> {
        let state = self.state()?;
        Ok(state
            .students
            .iter()
            .filter(|s| s.year_group_id == year_group_id)
            .cloned()
            .collect())
    }
}

impl AbsenceRequestStorage for MemoryConnection {
    fn store_absence_request(&self, request: &AbsenceRecord) -> Result<()> {
        let mut state = self.state()?;
        if state.absence_requests.iter().any(|r| r.id == request.id) {
            bail!("Absence request already exists: {}", request.id);
        }
        debug!("Storing absence request {} for {}", request.id, request.child_id);
        state.absence_requests.push(request.clone());
        Ok(())
    }

    fn get_absence_request(&self, absence_request_id: &str) -> Result<Option<AbsenceRecord>> {
        let state = self.state()?;
        Ok(state
            .absence_requests
            .iter()
            .find(|r| r.id == absence_request_id)
            .cloned())
    }

    fn list_absence_requests_for_student(&self, student_id: &str) -> Result<Vec<AbsenceRecord>> {
        let state = self.state()?;
        Ok(state
            .absence_requests
            .iter()
            .filter(|r| r.child_id == student_id)
            .cloned()
            .collect())
    }

    fn compare_and_set_status(
        &self,
        absence_request_id: &str,
        expected: AbsenceStatus,
        next: AbsenceStatus,
    ) -> Result<Option<AbsenceRecord>> {
        let mut state = self.state()?;
        let Some(record) = state
            .absence_requests
            .iter_mut()
            .find(|r| r.id == absence_request_id)
        else {
            return Ok(None);
        };

        if record.status != expected {
            return Ok(None);
        }

        record.status = next;
        record.decided_at = Some(chrono::Utc::now());
        Ok(Some(record.clone()))
    }

    fn delete_absence_request_if(&self, absence_request_id: &str, expected: AbsenceStatus) -> Result<bool> {
        let mut state = self.state()?;
        let before = state.absence_requests.len();
        state
            .absence_requests
            .retain(|r| !(r.id == absence_request_id && r.status == expected));
        Ok(state.absence_requests.len() < before)
    }
}

impl YearGroupStorage for MemoryConnection {
    fn store_year_group(&self, year_group: &YearGroup) -> Result<()> {
        let mut state = self.state()?;
        match state.year_groups.iter_mut().find(|y| y.id == year_group.id) {
            Some(existing) => *existing = year_group.clone(),
            None => state.year_groups.push(year_group.clone()),
        }
        Ok(())
    }

    fn get_year_group(&self, year_group_id: &str) -> Result<Option<YearGroup>> {
        let state = self.state()?;
        Ok(state.year_groups.iter().find(|y| y.id == year_group_id).cloned())
    }

    fn list_year_groups(&self) -> Result<Vec<YearGroup>> {
        Ok(self.state()?.year_groups.clone())
    }
}

impl UserStorage for MemoryConnection {
    fn store_user(&self, user: &UserRecord) -> Result<()> {
        let mut state = self.state()?;
        if state
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            bail!("Email already registered: {}", user.email);
        }
        state.users.push(user.clone());
        Ok(())
    }

    fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let state = self.state()?;
        Ok(state.users.iter().find(|u| u.id == user_id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let state = self.state()?;
        Ok(state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn absence(id: &str, status: AbsenceStatus) -> AbsenceRecord {
        AbsenceRecord {
            id: id.to_string(),
            child_id: "student::1".to_string(),
            kind: "Medical".to_string(),
            description: "Dentist".to_string(),
            date_time: Utc::now(),
            status,
            created_at: Utc::now(),
            decided_at: None,
        }
    }

    #[test]
    fn test_compare_and_set_only_moves_from_expected() {
        let conn = MemoryConnection::new();
        conn.store_absence_request(&absence("a1", AbsenceStatus::Pending)).unwrap();

        let updated = conn
            .compare_and_set_status("a1", AbsenceStatus::Pending, AbsenceStatus::Approved)
            .unwrap()
            .expect("pending request should be updated");
        assert_eq!(updated.status, AbsenceStatus::Approved);
        assert!(updated.decided_at.is_some());

        let again = conn
            .compare_and_set_status("a1", AbsenceStatus::Pending, AbsenceStatus::Rejected)
            .unwrap();
        assert!(again.is_none());
        assert_eq!(
            conn.get_absence_request("a1").unwrap().unwrap().status,
            AbsenceStatus::Approved
        );
    }

    #[test]
    fn test_conditional_delete() {
        let conn = MemoryConnection::new();
        conn.store_absence_request(&absence("a1", AbsenceStatus::Pending)).unwrap();
        conn.store_absence_request(&absence("a2", AbsenceStatus::Rejected)).unwrap();

        assert!(!conn.delete_absence_request_if("a2", AbsenceStatus::Pending).unwrap());
        assert!(conn.delete_absence_request_if("a1", AbsenceStatus::Pending).unwrap());
        assert!(!conn.delete_absence_request_if("missing", AbsenceStatus::Pending).unwrap());

        let remaining = conn.list_absence_requests_for_student("student::1").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "a2");
    }

    #[test]
    fn test_students_keep_registration_order() {
        let conn = MemoryConnection::new();
        for (id, parent) in [("s1", "p1"), ("s2", "p2"), ("s3", "p1")] {
            conn.store_student(&StudentRecord {
                id: id.to_string(),
                first_name: "First".to_string(),
                last_name: "Last".to_string(),
                dob: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
                profile_image_url: None,
                parent_id: parent.to_string(),
                year_group_id: "yg-1".to_string(),
                medical: None,
                created_at: Utc::now(),
            })
            .unwrap();
        }

        let ids: Vec<String> = conn
            .list_students_for_parent("p1")
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["s1", "s3"]);
        assert_eq!(conn.list_students_in_year_group("yg-1").unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let conn = MemoryConnection::new();
        let user = UserRecord {
            id: "u1".to_string(),
            title: "Mr".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Smith".to_string(),
            email: "sam@example.com".to_string(),
            phone_number: String::new(),
            password_hash: String::new(),
            address: None,
            role: shared::Role::Parent,
            year_group_id: None,
            created_at: Utc::now(),
        };
        conn.store_user(&user).unwrap();

        let dup = UserRecord {
            id: "u2".to_string(),
            email: "SAM@example.com".to_string(),
            ..user
        };
        assert!(conn.store_user(&dup).is_err());
        assert!(conn.find_user_by_email("Sam@Example.com").unwrap().is_some());
    }
}
