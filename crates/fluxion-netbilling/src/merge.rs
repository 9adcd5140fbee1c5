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

use std::collections::HashMap;

use chrono::{DateTime, Duration, DurationRound, Utc};

use crate::types::{EnergyPoint, HourlyRow, PricePoint};

/// Truncate an instant to the start of its UTC hour
pub fn floor_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(Duration::hours(1))
        .unwrap_or(instant)
}

/// Left-join energy and prices onto the contiguous UTC-hour grid
/// `floor(from)..=floor(to)`.
///
/// Energy samples are summed per hour; prices are looked up by exact hour.
/// Missing values become 0 and every hour in range gets a row. A reversed
/// range yields no rows.
pub fn merge_hourly(
    energy: &[EnergyPoint],
    prices: &[PricePoint],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<HourlyRow> {
    if from > to {
        return Vec::new();
    }

    let mut kwh_by_hour: HashMap<DateTime<Utc>, f64> = HashMap::new();
    for point in energy {
        *kwh_by_hour.entry(floor_hour(point.timestamp)).or_insert(0.0) += point.exported_kwh;
    }

    let price_by_hour: HashMap<DateTime<Utc>, f64> = prices
        .iter()
        .map(|p| (p.timestamp, p.price_pln_per_kwh))
        .collect();

    let first = floor_hour(from);
    let last = floor_hour(to);
    let capacity = usize::try_from((last - first).num_hours() + 1).unwrap_or(0);
    let mut rows = Vec::with_capacity(capacity);

    let mut hour = first;
    while hour <= last {
        let kwh = kwh_by_hour.get(&hour).copied().unwrap_or(0.0);
        let price = price_by_hour.get(&hour).copied().unwrap_or(0.0);
        rows.push(HourlyRow::new(hour, kwh, price));
        hour += Duration::hours(1);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn energy(ts: &str, kwh: f64) -> EnergyPoint {
        EnergyPoint {
            timestamp: utc(ts),
            exported_kwh: kwh,
        }
    }

    fn price(ts: &str, pln: f64) -> PricePoint {
        PricePoint {
            timestamp: utc(ts),
            price_pln_per_kwh: pln,
        }
    }

    #[test]
    fn test_negative_price_is_reported_but_not_earned() {
        let rows = merge_hourly(
            &[energy("2024-06-10T01:00:00Z", 1.0)],
            &[price("2024-06-10T01:00:00Z", -0.10)],
            utc("2024-06-10T01:00:00Z"),
            utc("2024-06-10T01:00:00Z"),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].exported_kwh, 1.0);
        assert_eq!(rows[0].price_pln_per_kwh, -0.10);
        assert_eq!(rows[0].revenue_pln, 0.0);
    }

    #[test]
    fn test_price_without_energy() {
        let rows = merge_hourly(
            &[],
            &[price("2024-06-10T05:00:00Z", 0.50)],
            utc("2024-06-10T05:00:00Z"),
            utc("2024-06-10T05:59:59Z"),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hour, utc("2024-06-10T05:00:00Z"));
        assert_eq!(rows[0].exported_kwh, 0.0);
        assert_eq!(rows[0].price_pln_per_kwh, 0.50);
        assert_eq!(rows[0].revenue_pln, 0.0);
    }

    #[test]
    fn test_sub_hour_samples_are_summed() {
        let rows = merge_hourly(
            &[
                energy("2024-06-10T10:00:00Z", 0.25),
                energy("2024-06-10T10:15:00Z", 0.25),
                energy("2024-06-10T10:30:00Z", 0.5),
                energy("2024-06-10T10:59:59Z", 1.0),
                energy("2024-06-10T11:00:00Z", 3.0),
            ],
            &[price("2024-06-10T10:00:00Z", 0.4)],
            utc("2024-06-10T10:00:00Z"),
            utc("2024-06-10T11:00:00Z"),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].exported_kwh, 2.0);
        assert_eq!(rows[0].revenue_pln, 0.8);
        assert_eq!(rows[1].exported_kwh, 3.0);
        assert_eq!(rows[1].price_pln_per_kwh, 0.0);
    }

    #[test]
    fn test_grid_is_contiguous_with_expected_length() {
        let from = utc("2024-03-30T23:00:00Z");
        for hours in [0_i64, 1, 22, 23, 24, 72] {
            let to = from + Duration::hours(hours) + Duration::minutes(37);
            let rows = merge_hourly(&[], &[], from, to);
            let expected = usize::try_from((to - from).num_hours() + 1).unwrap();
            assert_eq!(rows.len(), expected);
            assert_eq!(rows[0].hour, from);
            for pair in rows.windows(2) {
                assert_eq!(pair[1].hour - pair[0].hour, Duration::hours(1));
            }
        }
    }

    #[test]
    fn test_unaligned_end_includes_final_hour() {
        let rows = merge_hourly(
            &[energy("2024-06-10T12:45:00Z", 1.0)],
            &[],
            utc("2024-06-10T10:00:00Z"),
            utc("2024-06-10T12:10:00Z"),
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].hour, utc("2024-06-10T12:00:00Z"));
        assert_eq!(rows[2].exported_kwh, 1.0);
    }

    #[test]
    fn test_out_of_range_points_are_ignored() {
        let rows = merge_hourly(
            &[energy("2024-06-09T23:00:00Z", 5.0)],
            &[price("2024-06-10T03:00:00Z", 1.0)],
            utc("2024-06-10T00:00:00Z"),
            utc("2024-06-10T01:00:00Z"),
        );
        assert!(rows.iter().all(|r| r.exported_kwh == 0.0 && r.price_pln_per_kwh == 0.0));
    }

    #[test]
    fn test_reversed_range_is_empty() {
        let rows = merge_hourly(
            &[energy("2024-06-10T01:00:00Z", 1.0)],
            &[],
            utc("2024-06-10T05:00:00Z"),
            utc("2024-06-10T01:00:00Z"),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_revenue_invariant_holds_for_every_row() {
        let prices: Vec<_> = (0..24)
            .map(|h| PricePoint {
                timestamp: utc("2024-06-10T00:00:00Z") + Duration::hours(h),
                price_pln_per_kwh: f64::from(i32::try_from(h).unwrap() - 8) * 0.05,
            })
            .collect();
        let energy: Vec<_> = (0..24)
            .map(|h| EnergyPoint {
                timestamp: utc("2024-06-10T00:30:00Z") + Duration::hours(h),
                exported_kwh: 0.5,
            })
            .collect();
        let rows = merge_hourly(&energy, &prices, utc("2024-06-10T00:00:00Z"), utc("2024-06-10T23:00:00Z"));
        for row in &rows {
            let expected = row.exported_kwh * row.price_pln_per_kwh.max(0.0);
            assert!((row.revenue_pln - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let energy = [energy("2024-06-10T01:10:00Z", 1.2), energy("2024-06-10T02:10:00Z", 0.8)];
        let prices = [price("2024-06-10T01:00:00Z", 0.6), price("2024-06-10T02:00:00Z", -0.2)];
        let from = utc("2024-06-10T00:00:00Z");
        let to = utc("2024-06-10T03:00:00Z");
        assert_eq!(
            merge_hourly(&energy, &prices, from, to),
            merge_hourly(&energy, &prices, from, to)
        );
    }
}
