//! Routes named operations to the domain services.
//!
//! Both the REST handlers and the in-process channel go through here, so
//! the two transports behave identically.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use shared::{
    AddAbsenceRequestInput, AddStudentInput, DeleteAbsenceRequestInput, GetTeacherStudents,
    MutationName, ParentSignUpInput, QueryOperation, RespondToAbsenceRequestInput, SessionContext,
    ViewChild,
};

use crate::domain::{DomainError, DomainResult};
use crate::AppState;

#[derive(Clone)]
pub struct OperationDispatcher {
    state: AppState,
}

impl OperationDispatcher {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn run_query(
        &self,
        session: &SessionContext,
        operation: QueryOperation,
        variables: Value,
    ) -> DomainResult<Value> {
        debug!("query {} as {} with {}", operation, session.role, variables);

        match operation {
            QueryOperation::GetYearGroups => to_value(self.state.year_group_service.list_year_groups()?),
            QueryOperation::GetParentsChildren => {
                to_value(self.state.child_service.parents_children(session)?)
            }
            QueryOperation::GetTeacherStudents => {
                let vars: GetTeacherStudents = decode(variables)?;
                to_value(
                    self.state
                        .child_service
                        .teacher_students(session, &vars.year_group_id)?,
                )
            }
            QueryOperation::ViewChild => {
                let vars: ViewChild = decode(variables)?;
                to_value(self.state.child_service.view_child(session, &vars.student_id)?)
            }
        }
    }

    pub fn run_mutation(
        &self,
        session: &SessionContext,
        mutation: MutationName,
        input: Value,
    ) -> DomainResult<Value> {
        debug!("mutation {} as {}", mutation, session.role);

        match mutation {
            MutationName::AddStudent => {
                let input: AddStudentInput = decode(input)?;
                to_value(self.state.child_service.add_student(session, input)?)
            }
            MutationName::DeleteAbsenceRequest => {
                let input: DeleteAbsenceRequestInput = decode(input)?;
                to_value(self.state.absence_service.delete_absence_request(session, input)?)
            }
            MutationName::AddAbsenceRequest => {
                let input: AddAbsenceRequestInput = decode(input)?;
                to_value(self.state.absence_service.add_absence_request(session, input)?)
            }
            MutationName::RespondToAbsenceRequest => {
                let input: RespondToAbsenceRequestInput = decode(input)?;
                to_value(
                    self.state
                        .absence_service
                        .respond_to_absence_request(session, input)?,
                )
            }
            MutationName::ParentSignUp => {
                let input: ParentSignUpInput = decode(input)?;
                to_value(self.state.account_service.parent_sign_up(input)?)
            }
        }
    }
}

/// Missing or mistyped fields are a validation failure, not a server error.
fn decode<T: DeserializeOwned>(value: Value) -> DomainResult<T> {
    serde_json::from_value(value).map_err(|e| DomainError::Validation(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> DomainResult<Value> {
    serde_json::to_value(value).map_err(|e| DomainError::Internal(e.to_string()))
}
