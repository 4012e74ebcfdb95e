//! Reference and demo data.

use anyhow::Result;
use tracing::info;

use shared::{
    AbsenceStatus, AddAbsenceRequestInput, AddStudentInput, ParentSignUpInput,
    RespondToAbsenceRequestInput, SessionContext, YearGroup,
};

use crate::storage::{MemoryConnection, YearGroupStorage};
use crate::AppState;

const CORE_SUBJECTS: [&str; 3] = ["English", "Maths", "Science"];

/// Year groups every school has. Idempotent.
pub fn seed_year_groups(db: &MemoryConnection) -> Result<()> {
    let groups = std::iter::once(("reception".to_string(), "Reception".to_string()))
        .chain((1..=6).map(|n| (format!("year-{n}"), format!("Year {n}"))));

    for (id, title) in groups {
        let mut subjects: Vec<String> = CORE_SUBJECTS.iter().map(|s| s.to_string()).collect();
        if id != "reception" {
            subjects.extend(["History", "Geography", "PE"].map(String::from));
        }
        db.store_year_group(&YearGroup { id, title, subjects })?;
    }
    Ok(())
}

/// Accounts created by [`seed_demo_data`]
#[derive(Debug, Clone)]
pub struct DemoAccounts {
    pub parent: SessionContext,
    pub teacher: SessionContext,
}

/// A parent with two children, a Year 1 teacher, and one absence request
/// in each status.
pub fn seed_demo_data(state: &AppState) -> Result<DemoAccounts> {
    let parent = state.account_service.parent_sign_up(ParentSignUpInput {
        title: "Mrs".to_string(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        phone_number: "07123456789".to_string(),
        email: "parent@example.com".to_string(),
        password: "Password1!".to_string(),
        house_number: "12".to_string(),
        street: "High Street".to_string(),
        city: "Birmingham".to_string(),
        post_code: "B1 1AA".to_string(),
    })?;
    let teacher = state.account_service.create_teacher(
        "Mr",
        "Tom",
        "Brown",
        "teacher@example.com",
        "Password1!",
        "year-1",
    )?;

    let parent_session = SessionContext::parent(parent.id.clone());
    let teacher_session = SessionContext::teacher(teacher.id.clone(), "year-1");

    let ada = state.child_service.add_student(
        &parent_session,
        AddStudentInput {
            first_name: "Ada".to_string(),
            last_name: "Doe".to_string(),
            dob: "2016-03-04".to_string(),
            year_group: "year-1".to_string(),
            profile_image_url: None,
        },
    )?;
    state.child_service.add_student(
        &parent_session,
        AddStudentInput {
            first_name: "Alan".to_string(),
            last_name: "Doe".to_string(),
            dob: "2014-06-23".to_string(),
            year_group: "year-3".to_string(),
            profile_image_url: None,
        },
    )?;

    let requests = [
        ("Medical", "Dentist appointment", "2022-06-14T09:30:00Z", None),
        ("Holiday", "Family wedding", "2022-07-01T08:00:00Z", Some(AbsenceStatus::Approved)),
        ("Other", "Day trip", "2022-07-08T08:00:00Z", Some(AbsenceStatus::Rejected)),
    ];
    for (kind, description, date_time, decision) in requests {
        let created = state.absence_service.add_absence_request(
            &parent_session,
            AddAbsenceRequestInput {
                student_id: ada.id.clone(),
                kind: kind.to_string(),
                description: description.to_string(),
                date_time: date_time.to_string(),
            },
        )?;
        if let Some(status) = decision {
            state.absence_service.respond_to_absence_request(
                &teacher_session,
                RespondToAbsenceRequestInput {
                    student_id: ada.id.clone(),
                    absence_request_id: created.id,
                    status,
                },
            )?;
        }
    }

    info!(
        "Seeded demo data: parent={} teacher={}",
        parent.id, teacher.id
    );
    Ok(DemoAccounts {
        parent: parent_session,
        teacher: teacher_session,
    })
}
