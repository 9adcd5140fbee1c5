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

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One inverter export reading. Sub-hour samples are summed into hour buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyPoint {
    pub timestamp: DateTime<Utc>,
    pub exported_kwh: f64,
}

/// One hourly market price (PLN/kWh). May be negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price_pln_per_kwh: f64,
}

/// A single UTC hour on the canonical grid.
///
/// `price_pln_per_kwh` is the true market price; `revenue_pln` uses the
/// price clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyRow {
    #[serde(rename = "ts")]
    pub hour: DateTime<Utc>,
    #[serde(rename = "kwh")]
    pub exported_kwh: f64,
    #[serde(rename = "price")]
    pub price_pln_per_kwh: f64,
    #[serde(rename = "revenue")]
    pub revenue_pln: f64,
}

impl HourlyRow {
    pub fn new(hour: DateTime<Utc>, exported_kwh: f64, price_pln_per_kwh: f64) -> Self {
        Self {
            hour,
            exported_kwh,
            price_pln_per_kwh,
            revenue_pln: round_to(exported_kwh * price_pln_per_kwh.max(0.0), 6),
        }
    }
}

/// Summary of one aggregation bucket in the configured civil zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBucket {
    pub key: String,
    pub label: String,
    pub exported_kwh: f64,
    pub avg_price_pln_per_kwh: f64,
    pub revenue_pln: f64,
}

/// Fully resolved request range (post-parsing, post-defaulting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ResolvedRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Canonical cache key. Differently worded requests resolving to the same
    /// instants produce the same key.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}",
            self.from.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.to.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Totals across a set of hourly rows
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotals {
    pub exported_kwh: f64,
    pub avg_price_pln_per_kwh: f64,
    pub revenue_pln: f64,
}

impl RevenueTotals {
    pub fn from_rows(rows: &[HourlyRow]) -> Self {
        let mut acc = WeightedAccumulator::default();
        for row in rows {
            acc.push(row);
        }
        acc.finish()
    }
}

/// Running kWh-weighted merge shared by totals and aggregate buckets.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WeightedAccumulator {
    kwh: f64,
    avg_price: f64,
    revenue: f64,
}

impl WeightedAccumulator {
    pub(crate) fn push(&mut self, row: &HourlyRow) {
        let new_kwh = self.kwh + row.exported_kwh;
        // With no exported energy yet the average carries the latest price.
        self.avg_price = if new_kwh > 0.0 {
            (self.avg_price * self.kwh + row.price_pln_per_kwh * row.exported_kwh) / new_kwh
        } else {
            row.price_pln_per_kwh
        };
        self.kwh = new_kwh;
        self.revenue += row.revenue_pln;
    }

    pub(crate) fn finish(&self) -> RevenueTotals {
        RevenueTotals {
            exported_kwh: round_to(self.kwh, 2),
            avg_price_pln_per_kwh: round_to(self.avg_price, 4),
            revenue_pln: round_to(self.revenue, 2),
        }
    }
}

/// Diagnostic counters returned when a caller asks for `debug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugCounters {
    pub hours_with_energy: usize,
    pub hours_with_price: usize,
    pub first_hour: Option<DateTime<Utc>>,
    pub last_hour: Option<DateTime<Utc>>,
    pub cache_hit: bool,
}

impl DebugCounters {
    pub fn from_rows(rows: &[HourlyRow], cache_hit: bool) -> Self {
        Self {
            hours_with_energy: rows.iter().filter(|r| r.exported_kwh != 0.0).count(),
            hours_with_price: rows.iter().filter(|r| r.price_pln_per_kwh != 0.0).count(),
            first_hour: rows.first().map(|r| r.hour),
            last_hour: rows.last().map(|r| r.hour),
            cache_hit,
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
