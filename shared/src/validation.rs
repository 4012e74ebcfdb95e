//! Input rules shared by the sign-up/add forms and the store.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{AddAbsenceRequestInput, AddStudentInput, ParentSignUpInput};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$").expect("email pattern is valid")
});

const PASSWORD_SPECIALS: &str = "@$!%*?&";
const PASSWORD_MIN_LEN: usize = 8;
const NAME_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Human readable summary, one message per error.
    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(ValidationError::message)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ValidationError {
    MissingField(String),
    FieldTooLong(String, usize),
    InvalidEmail,
    WeakPassword,
    InvalidDate(String),
}

impl ValidationError {
    pub fn message(&self) -> String {
        match self {
            ValidationError::MissingField(field) => format!("{field} is required"),
            ValidationError::FieldTooLong(field, max) => {
                format!("{field} cannot exceed {max} characters")
            }
            ValidationError::InvalidEmail => "Please enter a valid email".to_string(),
            ValidationError::WeakPassword => "Password must be 8 characters, and include both lower and uppercase characters, a digit, with 1 special character required".to_string(),
            ValidationError::InvalidDate(field) => format!("{field} is not a valid date"),
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// At least eight characters from letters, digits and `@$!%*?&`, with at
/// least one lowercase, one uppercase, one digit and one of the specials.
pub fn is_strong_password(password: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c);

    password.chars().count() >= PASSWORD_MIN_LEN
        && password.chars().all(allowed)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

fn require(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::MissingField(field.to_string()));
    }
}

fn limit(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().chars().count() > NAME_MAX_LEN {
        errors.push(ValidationError::FieldTooLong(field.to_string(), NAME_MAX_LEN));
    }
}

pub fn validate_parent_sign_up(input: &ParentSignUpInput) -> ValidationResult {
    let mut errors = Vec::new();

    require(&mut errors, "firstName", &input.first_name);
    require(&mut errors, "lastName", &input.last_name);
    limit(&mut errors, "firstName", &input.first_name);
    limit(&mut errors, "lastName", &input.last_name);

    if !is_valid_email(input.email.trim()) {
        errors.push(ValidationError::InvalidEmail);
    }
    if !is_strong_password(&input.password) {
        errors.push(ValidationError::WeakPassword);
    }

    ValidationResult::from_errors(errors)
}

pub fn validate_add_student(input: &AddStudentInput) -> ValidationResult {
    let mut errors = Vec::new();

    require(&mut errors, "firstName", &input.first_name);
    require(&mut errors, "lastName", &input.last_name);
    require(&mut errors, "yearGroup", &input.year_group);
    limit(&mut errors, "firstName", &input.first_name);
    limit(&mut errors, "lastName", &input.last_name);

    if input.dob.trim().is_empty() {
        errors.push(ValidationError::MissingField("dob".to_string()));
    } else if chrono::NaiveDate::parse_from_str(input.dob.trim(), "%Y-%m-%d").is_err() {
        errors.push(ValidationError::InvalidDate("dob".to_string()));
    }

    ValidationResult::from_errors(errors)
}

pub fn validate_add_absence_request(input: &AddAbsenceRequestInput) -> ValidationResult {
    let mut errors = Vec::new();

    require(&mut errors, "studentId", &input.student_id);
    require(&mut errors, "type", &input.kind);
    require(&mut errors, "description", &input.description);

    if input.date_time.trim().is_empty() {
        errors.push(ValidationError::MissingField("dateTime".to_string()));
    } else if chrono::DateTime::parse_from_rfc3339(input.date_time.trim()).is_err() {
        errors.push(ValidationError::InvalidDate("dateTime".to_string()));
    }

    ValidationResult::from_errors(errors)
}
