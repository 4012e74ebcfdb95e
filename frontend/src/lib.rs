//! # Portal Frontend
//!
//! Client-side core of the school portal. It keeps cached copies of store
//! data fresh by polling, writes through to the store without optimistic
//! updates, and turns snapshots into role-scoped rows for display.
//!
//! - [`sync::RemoteSyncEngine`] polls live queries and publishes snapshots.
//! - [`sync::MutationCoordinator`] submits writes and refreshes what they touched.
//! - [`views`] builds display rows from snapshots.
//! - [`routing`] picks the navigation menu for a role.
//!
//! The store is reached through any [`shared::RemoteChannel`];
//! [`services::ApiClient`] is the HTTP one.

pub mod config;
pub mod error;
pub mod routing;
pub mod services;
pub mod sync;
pub mod views;

pub use config::ClientConfig;
pub use error::{MutationError, SyncError};
pub use sync::{MutationCoordinator, PageState, QueryHandle, QueryState, RemoteSyncEngine};
