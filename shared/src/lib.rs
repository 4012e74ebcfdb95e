//! Types shared between the portal backend (the authoritative store) and the
//! portal frontend (the sync core that polls it).
//!
//! Everything in here is plain data plus a few total functions over it:
//! record DTOs, the role and session context, the operation contracts in
//! [`operations`], the [`channel::RemoteChannel`] seam and the input rules in
//! [`validation`].

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod channel;
pub mod operations;
pub mod validation;

pub use channel::{ChannelError, FailureCode, RemoteChannel, RemoteFailure};
pub use operations::*;
pub use validation::{ValidationError, ValidationResult};

/// Who is looking at the data. Drives navigation and row filtering only;
/// the store enforces its own access rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Anonymous,
    Parent,
    Teacher,
}

impl Role {
    /// Parse a stored role token. Only the exact tokens `parent` and
    /// `teacher` are recognised; anything else, including case or
    /// whitespace variants and a missing token, is anonymous.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("parent") => Role::Parent,
            Some("teacher") => Role::Teacher,
            _ => Role::Anonymous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Parent => "parent",
            Role::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit session passed to every channel call and view build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub role: Role,
    pub user_id: Option<String>,
    /// Year group a teacher is responsible for
    pub year_group_id: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn parent(user_id: impl Into<String>) -> Self {
        Self {
            role: Role::Parent,
            user_id: Some(user_id.into()),
            year_group_id: None,
        }
    }

    pub fn teacher(user_id: impl Into<String>, year_group_id: impl Into<String>) -> Self {
        Self {
            role: Role::Teacher,
            user_id: Some(user_id.into()),
            year_group_id: Some(year_group_id.into()),
        }
    }
}

/// Decision state of an absence request.
///
/// Transitions are one-directional: `Pending` may become `Approved` or
/// `Rejected`, and both of those are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsenceStatus {
    Pending,
    Approved,
    Rejected,
}

impl AbsenceStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, AbsenceStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: AbsenceStatus) -> bool {
        matches!(
            (self, next),
            (AbsenceStatus::Pending, AbsenceStatus::Approved)
                | (AbsenceStatus::Pending, AbsenceStatus::Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AbsenceStatus::Pending => "PENDING",
            AbsenceStatus::Approved => "APPROVED",
            AbsenceStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for AbsenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearGroup {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medical {
    pub id: String,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub disabilities: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRequest {
    pub id: String,
    pub child_id: String,
    /// Free-form category, e.g. "Medical" or "Holiday"
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    /// RFC 3339 timestamp of the absence
    pub date_time: String,
    pub status: AbsenceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Date of birth (YYYY-MM-DD)
    pub dob: String,
    pub profile_image_url: Option<String>,
    pub parent_id: String,
    pub year_group: YearGroup,
    pub medical: Option<Medical>,
    #[serde(default)]
    pub absence_requests: Vec<AbsenceRequest>,
}

impl Child {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn find_absence_request(&self, absence_request_id: &str) -> Option<&AbsenceRequest> {
        self.absence_requests
            .iter()
            .find(|r| r.id == absence_request_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub year_group: Option<YearGroup>,
}
