//! Remote sync: polling live queries and writing through to the store.

pub mod engine;
pub mod mutation;
pub mod state;

pub use engine::{QueryHandle, QueryKey, RemoteSyncEngine, DEFAULT_POLL_INTERVAL};
pub use mutation::MutationCoordinator;
pub use state::{PageState, QueryState};
