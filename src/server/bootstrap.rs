//! Process lifecycle: init tracing, install metrics, load the upstream
//! registry, build the outbound client, bind the proxy and admin servers,
//! wait for a shutdown signal, drain. Grounded on the teacher's
//! `server::bootstrap::run`/`init_tracing`, narrowed to this system's
//! lifecycle — the etcd/Consul/discovery/instance-registry phases the
//! teacher runs here have no counterpart and are removed.

use crate::client::build_https_client;
use crate::config::ProxyConfig;
use crate::metrics::Metrics;
use crate::server::state::AppState;
use crate::server::{run_admin_server, run_proxy_server};
use crate::upstream::load_upstreams;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();
}

pub async fn run(config: ProxyConfig) -> Result<()> {
    init_tracing();

    let metrics = Metrics::install();
    let upstreams = load_upstreams();
    info!("bootstrap: loaded {} upstream(s)", upstreams.len());

    let client = build_https_client();
    let state = AppState::new(upstreams, client, metrics);

    let shutdown = Arc::new(Notify::new());
    let proxy_shutdown = shutdown.clone();

    let proxy_state = state.clone();
    let listen = config.listen.clone();
    let proxy_handle =
        tokio::spawn(async move { run_proxy_server(&listen, proxy_state, proxy_shutdown).await });

    let admin_state = state.clone();
    let admin_listen = config.admin_listen.clone();
    let admin_handle = tokio::spawn(async move { run_admin_server(&admin_listen, admin_state).await });

    wait_for_shutdown_signal().await;
    info!("bootstrap: shutdown signal received");
    shutdown.notify_one();

    match proxy_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("bootstrap: proxy server exited with error, error={}", e),
        Err(e) => tracing::error!("bootstrap: proxy server task panicked, error={}", e),
    }
    admin_handle.abort();

    info!("bootstrap: shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = &mut ctrl_c => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
