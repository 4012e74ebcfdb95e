//! # Storage Module
//!
//! Persistence for the records the store owns. The domain layer talks to
//! the traits in [`traits`]; [`memory::MemoryConnection`] is the backend
//! used by the server and by tests.

pub mod memory;
pub mod traits;

pub use memory::MemoryConnection;
pub use traits::*;
