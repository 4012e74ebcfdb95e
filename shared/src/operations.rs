//! Operation contracts between the frontend and the store.
//!
//! Each query names the [`Resource`]s it reads and each mutation the
//! resources it touches. The frontend uses the overlap to decide which live
//! queries to refresh after a successful write.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AbsenceRequest, AbsenceStatus, Child, Role, SessionContext, YearGroup};

/// Coarse data categories owned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Children,
    AbsenceRequests,
    YearGroups,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryOperation {
    GetYearGroups,
    GetParentsChildren,
    GetTeacherStudents,
    ViewChild,
}

impl QueryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperation::GetYearGroups => "GetYearGroups",
            QueryOperation::GetParentsChildren => "GetParentsChildren",
            QueryOperation::GetTeacherStudents => "GetTeacherStudents",
            QueryOperation::ViewChild => "ViewChild",
        }
    }

    pub fn reads(&self) -> &'static [Resource] {
        match self {
            QueryOperation::GetYearGroups => &[Resource::YearGroups],
            QueryOperation::GetParentsChildren => &[
                Resource::Children,
                Resource::AbsenceRequests,
                Resource::YearGroups,
            ],
            QueryOperation::GetTeacherStudents | QueryOperation::ViewChild => {
                &[Resource::Children, Resource::AbsenceRequests]
            }
        }
    }

    pub fn reads_any(&self, touched: &[Resource]) -> bool {
        self.reads().iter().any(|r| touched.contains(r))
    }
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationName {
    AddStudent,
    DeleteAbsenceRequest,
    AddAbsenceRequest,
    RespondToAbsenceRequest,
    ParentSignUp,
}

impl MutationName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationName::AddStudent => "AddStudent",
            MutationName::DeleteAbsenceRequest => "DeleteAbsenceRequest",
            MutationName::AddAbsenceRequest => "AddAbsenceRequest",
            MutationName::RespondToAbsenceRequest => "RespondToAbsenceRequest",
            MutationName::ParentSignUp => "ParentSignUp",
        }
    }

    pub fn touches(&self) -> &'static [Resource] {
        match self {
            MutationName::AddStudent => &[Resource::Children],
            MutationName::DeleteAbsenceRequest
            | MutationName::AddAbsenceRequest
            | MutationName::RespondToAbsenceRequest => &[Resource::AbsenceRequests],
            MutationName::ParentSignUp => &[Resource::Users],
        }
    }
}

impl fmt::Display for MutationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed query. The serialized form of the value is the query's variables.
pub trait Query: Serialize + Send + Sync + 'static {
    type Output: DeserializeOwned + Send + Sync + 'static;
    const OPERATION: QueryOperation;
}

/// A typed mutation. The serialized form of the value is the mutation input.
pub trait Mutation: Serialize + Send + Sync {
    type Output: DeserializeOwned + Send + 'static;
    const NAME: MutationName;

    /// Record identifier this write is about. Two writes with the same
    /// target may not be in flight at once.
    fn target(&self) -> String;
}

/// Wire envelope used by the bundled HTTP transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub operation: QueryOperation,
    #[serde(default)]
    pub variables: serde_json::Value,
    #[serde(default)]
    pub session: SessionContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRequest {
    pub mutation: MutationName,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub session: SessionContext,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetYearGroups {}

impl Query for GetYearGroups {
    type Output = Vec<YearGroup>;
    const OPERATION: QueryOperation = QueryOperation::GetYearGroups;
}

/// Children belonging to the calling parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParentsChildren {}

impl Query for GetParentsChildren {
    type Output = Vec<Child>;
    const OPERATION: QueryOperation = QueryOperation::GetParentsChildren;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTeacherStudents {
    pub year_group_id: String,
}

impl Query for GetTeacherStudents {
    type Output = Vec<Child>;
    const OPERATION: QueryOperation = QueryOperation::GetTeacherStudents;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewChild {
    pub student_id: String,
}

impl Query for ViewChild {
    type Output = Child;
    const OPERATION: QueryOperation = QueryOperation::ViewChild;
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStudentInput {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    /// Year group id
    pub year_group: String,
    pub profile_image_url: Option<String>,
}

impl Mutation for AddStudentInput {
    type Output = Child;
    const NAME: MutationName = MutationName::AddStudent;

    fn target(&self) -> String {
        format!(
            "student:new:{}:{}:{}",
            self.first_name.trim().to_lowercase(),
            self.last_name.trim().to_lowercase(),
            self.dob.trim()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAbsenceRequestInput {
    pub student_id: String,
    pub absence_request_id: String,
}

impl Mutation for DeleteAbsenceRequestInput {
    type Output = bool;
    const NAME: MutationName = MutationName::DeleteAbsenceRequest;

    fn target(&self) -> String {
        self.absence_request_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAbsenceRequestInput {
    pub student_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub date_time: String,
}

impl Mutation for AddAbsenceRequestInput {
    type Output = AbsenceRequest;
    const NAME: MutationName = MutationName::AddAbsenceRequest;

    fn target(&self) -> String {
        format!("student:{}:absence:new", self.student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondToAbsenceRequestInput {
    pub student_id: String,
    pub absence_request_id: String,
    pub status: AbsenceStatus,
}

impl Mutation for RespondToAbsenceRequestInput {
    type Output = AbsenceRequest;
    const NAME: MutationName = MutationName::RespondToAbsenceRequest;

    fn target(&self) -> String {
        self.absence_request_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentSignUpInput {
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
    pub house_number: String,
    pub street: String,
    pub city: String,
    pub post_code: String,
}

impl Mutation for ParentSignUpInput {
    type Output = SignUpResponse;
    const NAME: MutationName = MutationName::ParentSignUp;

    fn target(&self) -> String {
        format!("user:new:{}", self.email.trim().to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub title: String,
    pub role: Role,
}
