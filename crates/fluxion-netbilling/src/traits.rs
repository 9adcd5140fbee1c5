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

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{EnergyPoint, PricePoint};

/// Inverter telemetry provider. Accepts single-day windows only.
#[async_trait]
pub trait EnergyDataSource: Send + Sync {
    /// Exported energy readings between the bounds of one local day
    async fn fetch_hourly_exported(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<EnergyPoint>>;

    /// Name of the data source (for logging)
    fn name(&self) -> &str;
}

/// Market price provider, queried once per request for the whole range
#[async_trait]
pub trait PriceDataSource: Send + Sync {
    async fn fetch_hourly_prices(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>>;

    /// Name of the data source (for logging)
    fn name(&self) -> &str;
}
