use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use portal_frontend::config::ClientConfig;
use portal_frontend::routing::{routes_for, NavTarget};
use portal_frontend::services::logging::init_logging;
use portal_frontend::services::ApiClient;
use portal_frontend::sync::{QueryHandle, RemoteSyncEngine};
use portal_frontend::views::{build_page, AbsenceTableBuilder, ChildCardBuilder, ViewContext};
use shared::{Child, GetParentsChildren, GetTeacherStudents, Role};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = ClientConfig::from_env().context("Invalid client configuration")?;
    info!("Starting portal client against {} as {}", config.api_base_url, config.role);

    for entry in routes_for(config.role) {
        match entry.target {
            NavTarget::Path(path) => info!("menu: {} -> {}", entry.label, path),
            NavTarget::Logout => info!("menu: {}", entry.label),
        }
    }

    let client = ApiClient::from_config(&config)?;
    if let Err(e) = client.test_connection().await {
        warn!("Backend not reachable yet, polling anyway: {}", e);
    }

    let engine = RemoteSyncEngine::with_default_interval(Arc::new(client), config.poll_interval);
    let Some(mut handle) = subscribe_for_role(&engine, &config)? else {
        info!("Nothing to sync for an anonymous session");
        return Ok(());
    };

    let ctx = ViewContext::new(config.session());
    loop {
        tokio::select! {
            changed = handle.changed() => {
                if !changed {
                    break;
                }
                report(&handle, &ctx, &config.filter);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    engine.shutdown();
    Ok(())
}

fn subscribe_for_role(
    engine: &RemoteSyncEngine,
    config: &ClientConfig,
) -> anyhow::Result<Option<QueryHandle<Vec<Child>>>> {
    let handle = match config.role {
        Role::Parent => engine.subscribe(GetParentsChildren {})?,
        Role::Teacher => {
            let year_group_id = config
                .year_group_id
                .clone()
                .context("PORTAL_YEAR_GROUP_ID is required for a teacher session")?;
            engine.subscribe(GetTeacherStudents { year_group_id })?
        }
        Role::Anonymous => return Ok(None),
    };
    Ok(Some(handle))
}

fn report(handle: &QueryHandle<Vec<Child>>, ctx: &ViewContext, filter: &str) {
    let state = handle.current();

    let cards = build_page(&ChildCardBuilder, &state, ctx, filter);
    let absences = build_page(&AbsenceTableBuilder, &state, ctx, filter);

    info!("{:?}: {} children, {} absence requests", cards.state, cards.rows().len(), absences.rows().len());
    if let Some(notice) = &cards.notice {
        warn!("{}", notice);
    }
    for card in cards.rows() {
        info!("  {} ({}) - {} pending", card.name, card.year_group, card.pending_requests());
    }
    for row in absences.rows() {
        info!("  {} | {} | {} | {} | {}", row.child_name, row.date_time, row.kind, row.description, row.status);
    }
}
