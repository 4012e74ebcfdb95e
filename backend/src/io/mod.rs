//! # IO Module
//!
//! Ways into the store: the operation dispatcher, the axum REST surface
//! built on it, and an in-process [`shared::RemoteChannel`] for embedding
//! the store next to a client.

pub mod dispatch;
pub mod local;
pub mod rest;

pub use dispatch::OperationDispatcher;
pub use local::InProcessChannel;
