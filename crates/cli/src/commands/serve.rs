//! Serve command handler.

use crate::server::{start_server, AppState};
use crate::services;
use callsight_core::{config::AppConfig, AppError, AppResult};
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;

/// Serve the chat and ingestion endpoints over HTTP
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        config.validate()?;

        let bind = self.bind.as_deref().unwrap_or(&config.server.bind);
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid bind address '{}': {}", bind, e)))?;

        let store = services::open_store(config)?;
        let state = AppState {
            orchestrator: Arc::new(services::orchestrator(config, &store, &config.completion)?),
            ingestion: Arc::new(services::ingestion_job(config, &store)?),
            records: store,
        };

        start_server(addr, state)
            .await
            .map_err(|e| AppError::Other(format!("{:#}", e)))
    }
}
