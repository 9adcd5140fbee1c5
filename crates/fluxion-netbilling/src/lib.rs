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

//! FluxION Net-Billing Core
//!
//! Aligns per-hour exported energy with per-hour market prices and reports
//! revenue for net-billing settlement.
//!
//! ## Features
//!
//! - **Zone Clock**: DST-aware local-day boundaries for the installation's zone
//! - **Flexible parsing**: RFC 3339, `DD.MM.YYYY` and `YYYY-MM-DD` range bounds
//! - **Hourly grid**: gap-free UTC-hour rows with the negative-price revenue clamp
//! - **Aggregation**: hour/day/week/month/year buckets with kWh-weighted prices
//! - **Result cache**: short-TTL memoization keyed by the resolved range

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod service;
pub mod time;
pub mod traits;
pub mod types;

pub use aggregate::{Granularity, aggregate};
pub use cache::{CacheEntry, ResultCache};
pub use config::NetBillingConfig;
pub use error::{NetBillingError, Result};
pub use merge::{floor_hour, merge_hourly};
pub use metrics::RevenueMetrics;
pub use service::{AggregateReport, HourlyReport, RevenueService, ServiceOptions};
pub use time::{DayBounds, RangeRole, ZoneClock, local_day_starts, local_days, parse_instant};
pub use traits::{EnergyDataSource, PriceDataSource};
pub use types::*;
