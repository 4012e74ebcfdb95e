use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use shared::{
    ChannelError, MutationName, MutationRequest, QueryOperation, QueryRequest, RemoteChannel, RemoteFailure,
    SessionContext,
};

use crate::config::ClientConfig;

/// HTTP client for the portal backend, bound to one session.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionContext,
}

impl ApiClient {
    /// Create a new API client with the default base URL
    pub fn new(session: SessionContext) -> Self {
        Self::with_base_url("http://localhost:3000".to_string(), session)
    }

    /// Create a new API client with a custom base URL
    pub fn with_base_url(base_url: String, session: SessionContext) -> Self {
        Self {
            http: Client::new(),
            base_url,
            session,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ChannelError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChannelError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            session: config.session(),
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Test connection to the backend
    pub async fn test_connection(&self) -> Result<(), ChannelError> {
        let response = self
            .http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("Connection failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Transport(format!(
                "Health check returned {}",
                response.status()
            )))
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, ChannelError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("Failed to reach {}: {}", url, e)))?;

        read_response(response).await
    }
}

async fn read_response(response: Response) -> Result<Value, ChannelError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<Value>()
            .await
            .map_err(|e| ChannelError::Decode(format!("Failed to parse response: {}", e)));
    }

    let body = response.text().await.unwrap_or_default();
    Err(failure_from_body(status, &body))
}

/// Non-2xx answers: server faults are transient, anything else carrying a
/// failure body is the store saying no.
fn failure_from_body(status: StatusCode, body: &str) -> ChannelError {
    let failure = serde_json::from_str::<RemoteFailure>(body).ok();

    match failure {
        Some(failure) if !status.is_server_error() => ChannelError::Rejected(failure),
        Some(failure) => {
            warn!("Backend fault ({}): {}", status, failure.message);
            ChannelError::Transport(format!("{}: {}", status, failure.message))
        }
        None => ChannelError::Transport(format!("{}: {}", status, body)),
    }
}

#[async_trait]
impl RemoteChannel for ApiClient {
    async fn query(&self, operation: QueryOperation, variables: Value) -> Result<Value, ChannelError> {
        let request = QueryRequest {
            operation,
            variables,
            session: self.session.clone(),
        };
        self.post("/api/query", &request).await
    }

    async fn mutate(&self, mutation: MutationName, input: Value) -> Result<Value, ChannelError> {
        let request = MutationRequest {
            mutation,
            input,
            session: self.session.clone(),
        };
        self.post("/api/mutation", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::FailureCode;

    #[test]
    fn test_conflict_body_is_rejection() {
        let body = r#"{"code":"ABSENCE_NOT_PENDING","message":"absence request ar-1 is no longer pending"}"#;
        let err = failure_from_body(StatusCode::CONFLICT, body);

        assert_eq!(
            err,
            ChannelError::Rejected(RemoteFailure::new(
                FailureCode::AbsenceNotPending,
                "absence request ar-1 is no longer pending"
            ))
        );
    }

    #[test]
    fn test_server_faults_are_transport_errors() {
        let body = r#"{"code":"INTERNAL","message":"store lock poisoned"}"#;
        assert!(matches!(
            failure_from_body(StatusCode::INTERNAL_SERVER_ERROR, body),
            ChannelError::Transport(_)
        ));
        assert!(matches!(
            failure_from_body(StatusCode::BAD_GATEWAY, "<html>upstream down</html>"),
            ChannelError::Transport(_)
        ));
    }

    #[test]
    fn test_client_from_config_uses_session() {
        let config = ClientConfig {
            role: shared::Role::Parent,
            user_id: Some("p-1".to_string()),
            ..ClientConfig::default()
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.session(), &SessionContext::parent("p-1"));
    }
}
