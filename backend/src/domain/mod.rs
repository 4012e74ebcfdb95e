//! # Domain Module
//!
//! Business rules of the store: who may read which children, how absence
//! requests move between states, and how accounts are created.

pub mod absence_service;
pub mod account_service;
pub mod child_service;
pub mod errors;
pub mod models;
pub mod seed;
pub mod year_group_service;

pub use absence_service::AbsenceService;
pub use account_service::AccountService;
pub use child_service::ChildService;
pub use errors::{DomainError, DomainResult};
pub use year_group_service::YearGroupService;
