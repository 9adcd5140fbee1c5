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

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fluxion_netbilling::{NetBillingConfig, PriceDataSource, PricePoint};
use tracing::debug;

use crate::client::ProviderClient;

/// Hourly day-ahead/balancing prices from the market-data service.
///
/// `GET {base_url}/prices?from=..&to=..` returning
/// `[{ "timestamp": RFC3339, "price_pln_per_kwh": f64 }]`. Negative prices
/// are passed through unchanged.
#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: ProviderClient,
}

impl HttpPriceSource {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &NetBillingConfig) -> Result<Self> {
        let client = ProviderClient::new(
            config.price.base_url.clone(),
            config.price.token.clone(),
            config.fetch.upstream_timeout(),
        )?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PriceDataSource for HttpPriceSource {
    async fn fetch_hourly_prices(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let points: Vec<PricePoint> = self.client.get_range("prices", from, to).await?;

        if let Some(bad) = points.iter().find(|p| !p.price_pln_per_kwh.is_finite()) {
            bail!(
                "Malformed payload from {}: non-finite price at {}",
                self.client.base_url(),
                bad.timestamp.to_rfc3339()
            );
        }

        debug!("💰 {} price points", points.len());
        Ok(points)
    }

    fn name(&self) -> &str {
        "price-provider"
    }
}
