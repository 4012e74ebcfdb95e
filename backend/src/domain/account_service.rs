use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use shared::validation::validate_parent_sign_up;
use shared::{ParentSignUpInput, Role, SignUpResponse, User};

use super::errors::{DomainError, DomainResult};
use super::models::{Address, UserRecord};
use crate::storage::{MemoryConnection, UserStorage, YearGroupStorage};

/// Service for user accounts
#[derive(Clone)]
pub struct AccountService {
    db: Arc<MemoryConnection>,
    hash_cost: u32,
}

impl AccountService {
    pub fn new(db: Arc<MemoryConnection>) -> Self {
        Self::with_hash_cost(db, bcrypt::DEFAULT_COST)
    }

    pub fn with_hash_cost(db: Arc<MemoryConnection>, hash_cost: u32) -> Self {
        Self { db, hash_cost }
    }

    /// Register a parent account
    pub fn parent_sign_up(&self, input: ParentSignUpInput) -> DomainResult<SignUpResponse> {
        info!("Parent sign up: email={}", input.email);

        let validation = validate_parent_sign_up(&input);
        if !validation.is_valid {
            return Err(DomainError::Validation(validation.message()));
        }

        let email = input.email.trim().to_string();
        if self.db.find_user_by_email(&email)?.is_some() {
            warn!("Sign up with an already registered email: {}", email);
            return Err(DomainError::Validation(format!(
                "Email already registered: {email}"
            )));
        }

        let record = UserRecord {
            id: UserRecord::generate_id(),
            title: input.title.trim().to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email,
            phone_number: input.phone_number.trim().to_string(),
            password_hash: self.hash_password(&input.password)?,
            address: Some(Address {
                house_number: input.house_number.trim().to_string(),
                street: input.street.trim().to_string(),
                city: input.city.trim().to_string(),
                post_code: input.post_code.trim().to_string(),
            }),
            role: Role::Parent,
            year_group_id: None,
            created_at: Utc::now(),
        };
        self.db.store_user(&record)?;

        info!("Registered parent {}", record.id);
        Ok(SignUpResponse {
            id: record.id,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            title: record.title,
            role: record.role,
        })
    }

    /// Create a teacher account bound to a year group. Teachers are
    /// provisioned by the school rather than signing themselves up.
    pub fn create_teacher(
        &self,
        title: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
        year_group_id: &str,
    ) -> DomainResult<User> {
        let year_group = self
            .db
            .get_year_group(year_group_id)?
            .ok_or_else(|| DomainError::Validation(format!("Unknown year group: {year_group_id}")))?;

        let record = UserRecord {
            id: UserRecord::generate_id(),
            title: title.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phone_number: String::new(),
            password_hash: self.hash_password(password)?,
            address: None,
            role: Role::Teacher,
            year_group_id: Some(year_group.id.clone()),
            created_at: Utc::now(),
        };
        self.db
            .store_user(&record)
            .map_err(|e| DomainError::Validation(e.to_string()))?;

        info!("Created teacher {} for {}", record.id, year_group.title);
        Ok(record.to_dto(Some(year_group)))
    }

    /// Check a password against the stored hash for an email
    pub fn verify_credentials(&self, email: &str, password: &str) -> DomainResult<Option<User>> {
        let Some(record) = self.db.find_user_by_email(email.trim())? else {
            return Ok(None);
        };

        let matches = bcrypt::verify(password, &record.password_hash)
            .map_err(|e| DomainError::Internal(format!("password check failed: {e}")))?;
        if !matches {
            return Ok(None);
        }

        let year_group = match &record.year_group_id {
            Some(id) => self.db.get_year_group(id)?,
            None => None,
        };
        Ok(Some(record.to_dto(year_group)))
    }

    fn hash_password(&self, password: &str) -> DomainResult<String> {
        bcrypt::hash(password, self.hash_cost)
            .map_err(|e| DomainError::Internal(format!("password hashing failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::seed::seed_year_groups;

    fn setup_test() -> AccountService {
        let db = Arc::new(MemoryConnection::new());
        seed_year_groups(&db).expect("Failed to seed year groups");
        AccountService::with_hash_cost(db, 4)
    }

    fn sign_up(email: &str, password: &str) -> ParentSignUpInput {
        ParentSignUpInput {
            title: "Mrs".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone_number: "07123456789".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            house_number: "1".to_string(),
            street: "High Street".to_string(),
            city: "Birmingham".to_string(),
            post_code: "B1 1AA".to_string(),
        }
    }

    #[test]
    fn test_parent_sign_up() {
        let service = setup_test();

        let response = service
            .parent_sign_up(sign_up("jane@example.com", "Password1!"))
            .expect("Failed to sign up");
        assert_eq!(response.email, "jane@example.com");
        assert_eq!(response.title, "Mrs");
        assert_eq!(response.role, Role::Parent);

        let user = service
            .verify_credentials("jane@example.com", "Password1!")
            .unwrap()
            .expect("credentials should verify");
        assert_eq!(user.id, response.id);
        assert!(service
            .verify_credentials("jane@example.com", "Password2!")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_sign_up_rejects_bad_input() {
        let service = setup_test();

        let err = service
            .parent_sign_up(sign_up("jane@example", "Password1!"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = service
            .parent_sign_up(sign_up("jane@example.com", "password"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_sign_up_rejects_duplicate_email() {
        let service = setup_test();
        service
            .parent_sign_up(sign_up("jane@example.com", "Password1!"))
            .unwrap();

        let err = service
            .parent_sign_up(sign_up("JANE@example.com", "Password1!"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_create_teacher() {
        let service = setup_test();
        let teacher = service
            .create_teacher("Mr", "Tom", "Teach", "tom@school.example.com", "Password1!", "year-2")
            .unwrap();

        assert_eq!(teacher.role, Role::Teacher);
        assert_eq!(teacher.year_group.map(|y| y.id), Some("year-2".to_string()));
    }
}
