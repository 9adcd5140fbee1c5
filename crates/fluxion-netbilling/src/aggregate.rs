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

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::time::ZoneClock;
use crate::types::{AggregateBucket, HourlyRow, WeightedAccumulator};

/// Reporting granularity for revenue buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    pub fn all() -> &'static [Granularity] {
        &[Self::Hour, Self::Day, Self::Week, Self::Month, Self::Year]
    }

    /// Sortable bucket key for a local wall-clock time. Lexicographic order of
    /// keys is chronological order of buckets.
    pub fn key(&self, local: NaiveDateTime) -> String {
        match self {
            Self::Hour => local.format("%Y-%m-%d %H:00").to_string(),
            Self::Day => local.format("%Y-%m-%d").to_string(),
            Self::Week => {
                let week = local.date().iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            Self::Month => local.format("%Y-%m").to_string(),
            Self::Year => local.format("%Y").to_string(),
        }
    }

    /// Human-readable bucket label for a local wall-clock time
    pub fn label(&self, local: NaiveDateTime) -> String {
        match self {
            Self::Hour => local.format("%d.%m.%Y %H:00").to_string(),
            Self::Day => local.format("%d.%m.%Y").to_string(),
            Self::Week => {
                let week = local.date().iso_week();
                format!("Week {:02}, {}", week.week(), week.year())
            }
            Self::Month => local.format("%m.%Y").to_string(),
            Self::Year => local.format("%Y").to_string(),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(anyhow::anyhow!(
                "Unknown granularity: '{}'. Supported: {}",
                s,
                Self::all()
                    .iter()
                    .map(Granularity::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// Re-bucket hourly rows into local-zone buckets, sorted by key.
///
/// Average price is weighted by exported kWh and uses the true (unclamped)
/// price; revenue is the sum of row revenues.
pub fn aggregate(
    rows: &[HourlyRow],
    granularity: Granularity,
    clock: &ZoneClock,
) -> Vec<AggregateBucket> {
    let mut buckets: BTreeMap<String, (String, WeightedAccumulator)> = BTreeMap::new();

    for row in rows {
        let local = clock.local_parts(row.hour);
        buckets
            .entry(granularity.key(local))
            .or_insert_with(|| (granularity.label(local), WeightedAccumulator::default()))
            .1
            .push(row);
    }

    buckets
        .into_iter()
        .map(|(key, (label, acc))| {
            let totals = acc.finish();
            AggregateBucket {
                key,
                label,
                exported_kwh: totals.exported_kwh,
                avg_price_pln_per_kwh: totals.avg_price_pln_per_kwh,
                revenue_pln: totals.revenue_pln,
            }
        })
        .collect()
}
