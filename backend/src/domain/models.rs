//! Storage-side records. These are what the store owns; the shared DTOs
//! handed to clients are assembled from them.

use chrono::{DateTime, NaiveDate, Utc};
use shared::{AbsenceRequest, AbsenceStatus, Child, Medical, Role, User, YearGroup};

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub profile_image_url: Option<String>,
    pub parent_id: String,
    pub year_group_id: String,
    pub medical: Option<Medical>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbsenceRecord {
    pub id: String,
    pub child_id: String,
    pub kind: String,
    pub description: String,
    pub date_time: DateTime<Utc>,
    pub status: AbsenceStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub house_number: String,
    pub street: String,
    pub city: String,
    pub post_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub address: Option<Address>,
    pub role: Role,
    pub year_group_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StudentRecord {
    pub fn generate_id() -> String {
        format!("student::{}", uuid::Uuid::new_v4())
    }

    pub fn to_dto(&self, year_group: YearGroup, absence_requests: &[AbsenceRecord]) -> Child {
        Child {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            dob: self.dob.format("%Y-%m-%d").to_string(),
            profile_image_url: self.profile_image_url.clone(),
            parent_id: self.parent_id.clone(),
            year_group,
            medical: self.medical.clone(),
            absence_requests: absence_requests.iter().map(AbsenceRecord::to_dto).collect(),
        }
    }
}

impl AbsenceRecord {
    pub fn generate_id() -> String {
        format!("absence::{}", uuid::Uuid::new_v4())
    }

    pub fn to_dto(&self) -> AbsenceRequest {
        AbsenceRequest {
            id: self.id.clone(),
            child_id: self.child_id.clone(),
            kind: self.kind.clone(),
            description: self.description.clone(),
            date_time: self.date_time.to_rfc3339(),
            status: self.status,
        }
    }
}

impl UserRecord {
    pub fn generate_id() -> String {
        format!("user::{}", uuid::Uuid::new_v4())
    }

    pub fn to_dto(&self, year_group: Option<YearGroup>) -> User {
        User {
            id: self.id.clone(),
            title: self.title.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            role: self.role,
            year_group,
        }
    }
}
