mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use headliner_engine::{
    ExtractionRules, FetchSettings, ReqwestFetcher, SnippetExtractor, SnippetHarvester,
};
use headliner_logging::LogDestination;
use headliner_server::AppState;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    headliner_logging::initialize(LogDestination::Terminal, config.log_level);
    log::info!("configured with {} urls", config.urls.len());

    let fetcher = Arc::new(ReqwestFetcher::new(FetchSettings::default()));
    let rules = ExtractionRules::default_rules().context("failed to build extraction rules")?;
    let extractor = Arc::new(SnippetExtractor::new(fetcher, rules));
    let harvester = Arc::new(SnippetHarvester::new(config.urls, extractor));

    // One token for the whole process: ctrl-c stops the server and aborts
    // any batch still in flight.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(harvester, cancel.clone());
    headliner_server::serve(addr, state, cancel)
        .await
        .context("http server failed")?;

    log::info!("shut down cleanly");
    Ok(())
}
