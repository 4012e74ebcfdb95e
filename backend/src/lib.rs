//! # Portal Backend
//!
//! The authoritative store behind the school portal. It owns every child,
//! absence request, year group and account; clients only ever hold cached
//! copies fetched through one of the ways in under [`io`].
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST handlers, in-process channel)
//!     ↓
//! OperationDispatcher (named operation → service call)
//!     ↓
//! Domain Layer (services, state rules)
//!     ↓
//! Storage Layer (MemoryConnection)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::domain::{AbsenceService, AccountService, ChildService, YearGroupService};
use crate::io::{rest, OperationDispatcher};
use crate::storage::MemoryConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub child_service: ChildService,
    pub absence_service: AbsenceService,
    pub account_service: AccountService,
    pub year_group_service: YearGroupService,
}

/// Initialize the store with reference data and all services
pub fn initialize_backend(config: &ServerConfig) -> Result<AppState> {
    info!("Setting up storage");
    let db = Arc::new(MemoryConnection::new());
    domain::seed::seed_year_groups(&db).context("Failed to seed year groups")?;

    info!("Setting up domain model");
    let app_state = AppState {
        child_service: ChildService::new(db.clone()),
        absence_service: AbsenceService::new(db.clone()),
        account_service: AccountService::with_hash_cost(db.clone(), config.password_hash_cost),
        year_group_service: YearGroupService::new(db),
    };

    Ok(app_state)
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, config: &ServerConfig) -> Result<Router> {
    let origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", config.allowed_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/query", post(rest::run_query))
        .route("/mutation", post(rest::run_mutation))
        .route("/health", get(rest::health));

    Ok(Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(OperationDispatcher::new(app_state)))
}
