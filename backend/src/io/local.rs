use async_trait::async_trait;
use serde_json::Value;

use shared::{ChannelError, MutationName, QueryOperation, RemoteChannel, SessionContext};

use super::OperationDispatcher;

/// A [`RemoteChannel`] that calls the store directly, bound to one session.
#[derive(Clone)]
pub struct InProcessChannel {
    dispatcher: OperationDispatcher,
    session: SessionContext,
}

impl InProcessChannel {
    pub fn new(dispatcher: OperationDispatcher, session: SessionContext) -> Self {
        Self { dispatcher, session }
    }

    /// Same store, different caller
    pub fn with_session(&self, session: SessionContext) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            session,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }
}

#[async_trait]
impl RemoteChannel for InProcessChannel {
    async fn query(&self, operation: QueryOperation, variables: Value) -> Result<Value, ChannelError> {
        self.dispatcher
            .run_query(&self.session, operation, variables)
            .map_err(|e| ChannelError::Rejected(e.to_failure()))
    }

    async fn mutate(&self, mutation: MutationName, input: Value) -> Result<Value, ChannelError> {
        self.dispatcher
            .run_mutation(&self.session, mutation, input)
            .map_err(|e| ChannelError::Rejected(e.to_failure()))
    }
}
