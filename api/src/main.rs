mod error;
mod handlers;
mod responses;
mod routes;

use anyhow::Result;
use compliance_rag::{build_llm_client, ComplianceService, Config};
use std::sync::Arc;

pub struct AppState {
    pub service: ComplianceService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let llm = build_llm_client(&config.llm);
    let service = ComplianceService::new(&config, llm)?;
    log::info!("Compliance service initialized successfully");

    let app = routes::create_router(Arc::new(AppState { service }), &config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
