// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fluxion_netbilling::{NetBillingConfig, RevenueMetrics, RevenueService};
use fluxion_netbilling_adapters::{HttpEnergySource, HttpPriceSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;

#[derive(Debug, Parser)]
#[command(name = "fluxion-netbilling-server", about = "Net-billing revenue API")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("🚀 Starting FluxION net-billing server");

    let config = NetBillingConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    info!(
        "Loaded config: zone={}, cache_ttl={}s, fetch_concurrency={}",
        config.zone.timezone, config.cache.ttl_secs, config.fetch.concurrency
    );

    let energy = HttpEnergySource::from_config(&config)?;
    let prices = HttpPriceSource::from_config(&config)?;
    let metrics = RevenueMetrics::new().context("Failed to register metrics")?;
    let service = RevenueService::from_config(&config, Arc::new(energy), Arc::new(prices), metrics);

    let state = api::AppState::new(Arc::new(service), &config.cache.cache_control())?;
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    info!("🌐 Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
