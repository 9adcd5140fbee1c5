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
use fluxion_netbilling::{EnergyDataSource, EnergyPoint, NetBillingConfig};
use tracing::debug;

use crate::client::ProviderClient;

/// Exported-energy readings from the inverter telemetry service.
///
/// `GET {base_url}/exported?from=..&to=..` returning
/// `[{ "timestamp": RFC3339, "exported_kwh": f64 }]`.
#[derive(Debug, Clone)]
pub struct HttpEnergySource {
    client: ProviderClient,
}

impl HttpEnergySource {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &NetBillingConfig) -> Result<Self> {
        let client = ProviderClient::new(
            config.energy.base_url.clone(),
            config.energy.token.clone(),
            config.fetch.upstream_timeout(),
        )?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl EnergyDataSource for HttpEnergySource {
    async fn fetch_hourly_exported(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<EnergyPoint>> {
        let points: Vec<EnergyPoint> = self.client.get_range("exported", day_start, day_end).await?;

        if let Some(bad) = points
            .iter()
            .find(|p| !p.exported_kwh.is_finite() || p.exported_kwh < 0.0)
        {
            bail!(
                "Malformed payload from {}: invalid exported_kwh {} at {}",
                self.client.base_url(),
                bad.exported_kwh,
                bad.timestamp.to_rfc3339()
            );
        }

        debug!(
            "⚡ {} energy points for {}",
            points.len(),
            day_start.format("%Y-%m-%d %H:%M")
        );
        Ok(points)
    }

    fn name(&self) -> &str {
        "energy-provider"
    }
}
