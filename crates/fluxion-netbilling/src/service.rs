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

//! Request orchestration: resolve the range, fetch both series, merge, cache.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::{StreamExt, TryStreamExt, stream};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::aggregate::{Granularity, aggregate};
use crate::cache::ResultCache;
use crate::config::NetBillingConfig;
use crate::error::{NetBillingError, Result};
use crate::merge::merge_hourly;
use crate::metrics::RevenueMetrics;
use crate::time::{DayBounds, RangeRole, ZoneClock, local_days, parse_instant};
use crate::traits::{EnergyDataSource, PriceDataSource};
use crate::types::{
    AggregateBucket, DebugCounters, EnergyPoint, HourlyRow, PricePoint, ResolvedRange,
    RevenueTotals,
};

/// Tunables for [`RevenueService`]
#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    pub cache_ttl: Duration,
    pub fetch_concurrency: usize,
    pub request_timeout: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            fetch_concurrency: 4,
            request_timeout: Duration::from_secs(25),
        }
    }
}

impl From<&NetBillingConfig> for ServiceOptions {
    fn from(config: &NetBillingConfig) -> Self {
        Self {
            cache_ttl: config.cache.ttl(),
            fetch_concurrency: config.fetch.concurrency,
            request_timeout: config.fetch.request_timeout(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HourlyReport {
    pub range: ResolvedRange,
    pub rows: Arc<Vec<HourlyRow>>,
    pub totals: RevenueTotals,
    pub debug: Option<DebugCounters>,
}

#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub range: ResolvedRange,
    pub granularity: Granularity,
    pub buckets: Vec<AggregateBucket>,
}

pub struct RevenueService {
    clock: ZoneClock,
    energy: Arc<dyn EnergyDataSource>,
    prices: Arc<dyn PriceDataSource>,
    cache: ResultCache,
    metrics: RevenueMetrics,
    options: ServiceOptions,
}

impl std::fmt::Debug for RevenueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevenueService")
            .field("zone", &self.clock.zone_name())
            .field("energy", &self.energy.name())
            .field("prices", &self.prices.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RevenueService {
    pub fn new(
        zone: &str,
        energy: Arc<dyn EnergyDataSource>,
        prices: Arc<dyn PriceDataSource>,
        options: ServiceOptions,
        metrics: RevenueMetrics,
    ) -> Self {
        let clock =
            ZoneClock::new(zone).with_degrade_counter(metrics.degraded_zone_resolutions.clone());
        Self {
            clock,
            energy,
            prices,
            cache: ResultCache::new(options.cache_ttl),
            metrics,
            options: ServiceOptions {
                fetch_concurrency: options.fetch_concurrency.max(1),
                ..options
            },
        }
    }

    pub fn from_config(
        config: &NetBillingConfig,
        energy: Arc<dyn EnergyDataSource>,
        prices: Arc<dyn PriceDataSource>,
        metrics: RevenueMetrics,
    ) -> Self {
        Self::new(
            &config.zone.timezone,
            energy,
            prices,
            ServiceOptions::from(config),
            metrics,
        )
    }

    pub fn clock(&self) -> &ZoneClock {
        &self.clock
    }

    pub fn metrics(&self) -> &RevenueMetrics {
        &self.metrics
    }

    /// Resolve caller-supplied bounds. Each absent or unparseable end falls
    /// back to the matching bound of today in the configured zone.
    pub fn resolve_range(&self, from: Option<&str>, to: Option<&str>) -> ResolvedRange {
        let today = self.clock.today_bounds();
        let from = from
            .and_then(|text| parse_instant(text, RangeRole::Start, &self.clock))
            .unwrap_or(today.start);
        let to = to
            .and_then(|text| parse_instant(text, RangeRole::End, &self.clock))
            .unwrap_or(today.end);
        ResolvedRange::new(from, to)
    }

    pub async fn hourly(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        debug: bool,
    ) -> Result<HourlyReport> {
        let range = self.resolve_range(from, to);
        let (rows, cache_hit) = self.rows_for(range).await?;
        Ok(HourlyReport {
            range,
            totals: RevenueTotals::from_rows(&rows),
            debug: debug.then(|| DebugCounters::from_rows(&rows, cache_hit)),
            rows,
        })
    }

    pub async fn aggregate(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        granularity: Granularity,
    ) -> Result<AggregateReport> {
        let range = self.resolve_range(from, to);
        let (rows, _) = self.rows_for(range).await?;
        Ok(AggregateReport {
            range,
            granularity,
            buckets: aggregate(&rows, granularity, &self.clock),
        })
    }

    /// Hourly rows for a resolved range, from cache when fresh
    pub async fn rows_for(&self, range: ResolvedRange) -> Result<(Arc<Vec<HourlyRow>>, bool)> {
        let key = range.cache_key();
        if range.from > range.to {
            debug!("Reversed range {}, nothing to fetch", key);
            return Ok((Arc::new(Vec::new()), false));
        }

        if let Some(entry) = self.cache.get(&key) {
            self.metrics.cache_hits.inc();
            debug!(
                "💾 Cache hit for {} (computed at {})",
                key,
                entry.computed_at.format("%H:%M:%S")
            );
            return Ok((entry.rows, true));
        }
        self.metrics.cache_misses.inc();
        debug!("💾 Cache miss for {}", key);

        let started = Instant::now();
        let rows = Arc::new(self.compute(range).await?);
        info!(
            "📊 Merged {} hourly rows for {} in {} ms",
            rows.len(),
            key,
            started.elapsed().as_millis()
        );

        self.cache.put(&key, Arc::clone(&rows));
        Ok((rows, false))
    }

    async fn compute(&self, range: ResolvedRange) -> Result<Vec<HourlyRow>> {
        let timeout = self.options.request_timeout;
        let fetch = async {
            tokio::try_join!(self.fetch_energy(range), self.fetch_prices(range))
        };

        let (energy, prices) = tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| {
                error!(
                    "❌ Upstream fetch for {} exceeded {}s deadline",
                    range.cache_key(),
                    timeout.as_secs()
                );
                NetBillingError::Timeout {
                    secs: timeout.as_secs(),
                }
            })??;

        debug!(
            "Fetched {} energy points and {} price points",
            energy.len(),
            prices.len()
        );
        Ok(merge_hourly(&energy, &prices, range.from, range.to))
    }

    /// One request per local day, at most `fetch_concurrency` in flight.
    /// Results keep day order regardless of completion order.
    async fn fetch_energy(&self, range: ResolvedRange) -> Result<Vec<EnergyPoint>> {
        let days: Vec<DayBounds> = local_days(&self.clock, range.from, range.to).collect();
        debug!(
            "⚡ Fetching exported energy for {} local day(s) from {}",
            days.len(),
            self.energy.name()
        );

        let per_day: Vec<Vec<EnergyPoint>> = stream::iter(days)
            .map(|day| {
                let source = Arc::clone(&self.energy);
                async move {
                    source
                        .fetch_hourly_exported(day.start, day.end)
                        .await
                        .with_context(|| {
                            format!(
                                "day {}..{}",
                                day.start.to_rfc3339(),
                                day.end.to_rfc3339()
                            )
                        })
                }
            })
            .buffered(self.options.fetch_concurrency)
            .try_collect()
            .await
            .map_err(|e| self.upstream_failure(self.energy.name(), &e))?;

        Ok(per_day.into_iter().flatten().collect())
    }

    async fn fetch_prices(&self, range: ResolvedRange) -> Result<Vec<PricePoint>> {
        debug!("💰 Fetching prices from {}", self.prices.name());
        self.prices
            .fetch_hourly_prices(range.from, range.to)
            .await
            .map_err(|e| self.upstream_failure(self.prices.name(), &e))
    }

    fn upstream_failure(&self, provider: &str, err: &anyhow::Error) -> NetBillingError {
        self.metrics.upstream_failures.inc();
        error!("❌ {} request failed: {:#}", provider, err);
        NetBillingError::upstream(provider, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    /// Returns 1 kWh at the start of every UTC hour of the requested day
    #[derive(Default)]
    struct StubEnergy {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl EnergyDataSource for StubEnergy {
        async fn fetch_hourly_exported(
            &self,
            day_start: DateTime<Utc>,
            day_end: DateTime<Utc>,
        ) -> anyhow::Result<Vec<EnergyPoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.windows.lock().push((day_start, day_end));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                anyhow::bail!("HTTP 503");
            }
            let mut points = Vec::new();
            let mut hour = day_start;
            while hour <= day_end {
                points.push(EnergyPoint {
                    timestamp: hour,
                    exported_kwh: 1.0,
                });
                hour += ChronoDuration::hours(1);
            }
            Ok(points)
        }

        fn name(&self) -> &str {
            "stub-energy"
        }
    }

    #[derive(Default)]
    struct StubPrices {
        calls: AtomicUsize,
        points: Vec<PricePoint>,
        fail: bool,
    }

    #[async_trait]
    impl PriceDataSource for StubPrices {
        async fn fetch_hourly_prices(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> anyhow::Result<Vec<PricePoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.points.clone())
        }

        fn name(&self) -> &str {
            "stub-prices"
        }
    }

    fn service(
        energy: Arc<StubEnergy>,
        prices: Arc<StubPrices>,
        options: ServiceOptions,
    ) -> RevenueService {
        RevenueService::new(
            "Europe/Warsaw",
            energy,
            prices,
            options,
            RevenueMetrics::new().unwrap(),
        )
    }

    #[test]
    fn test_resolve_range_equivalent_wordings() {
        let svc = service(Arc::default(), Arc::default(), ServiceOptions::default());
        let a = svc.resolve_range(Some("10.06.2024"), Some("11.06.2024"));
        let b = svc.resolve_range(Some("2024-06-10"), Some("2024-06-11"));
        let c = svc.resolve_range(
            Some("2024-06-09T22:00:00Z"),
            Some("2024-06-11T21:59:59.999Z"),
        );
        assert_eq!(a, b);
        assert_eq!(a.cache_key(), c.cache_key());
        assert_eq!(a.from, utc("2024-06-09T22:00:00Z"));
        assert_eq!(a.to, utc("2024-06-11T21:59:59.999Z"));
    }

    #[test]
    fn test_malformed_from_falls_back_to_today() {
        let svc = service(Arc::default(), Arc::default(), ServiceOptions::default());
        let today = svc.clock().today_bounds();
        let range = svc.resolve_range(Some("not a date"), None);
        // Guard against the local day rolling over between the two reads
        if svc.clock().today_bounds() == today {
            assert_eq!(range.from, today.start);
            assert_eq!(range.to, today.end);
        }
    }

    #[tokio::test]
    async fn test_hourly_merges_one_fetch_per_local_day() {
        let energy = Arc::new(StubEnergy::default());
        let prices = Arc::new(StubPrices {
            points: vec![PricePoint {
                timestamp: utc("2024-06-10T10:00:00Z"),
                price_pln_per_kwh: 0.8,
            }],
            ..Default::default()
        });
        let svc = service(energy.clone(), prices.clone(), ServiceOptions::default());

        let report = svc
            .hourly(Some("2024-06-10"), Some("2024-06-12"), true)
            .await
            .unwrap();

        assert_eq!(energy.calls.load(Ordering::SeqCst), 3);
        assert_eq!(prices.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.rows.len(), 72);
        assert!(report.rows.iter().all(|r| r.exported_kwh == 1.0));
        assert_eq!(report.totals.exported_kwh, 72.0);
        assert_eq!(report.totals.revenue_pln, 0.8);

        let debug = report.debug.unwrap();
        assert_eq!(debug.hours_with_energy, 72);
        assert_eq!(debug.hours_with_price, 1);
        assert_eq!(debug.first_hour, Some(utc("2024-06-09T22:00:00Z")));
        assert_eq!(debug.last_hour, Some(utc("2024-06-12T21:00:00Z")));
        assert!(!debug.cache_hit);

        let windows = energy.windows.lock().clone();
        assert_eq!(
            windows[0],
            (utc("2024-06-09T22:00:00Z"), utc("2024-06-10T21:59:59.999Z"))
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_upstream() {
        let energy = Arc::new(StubEnergy::default());
        let prices = Arc::new(StubPrices::default());
        let svc = service(energy.clone(), prices.clone(), ServiceOptions::default());

        let first = svc
            .hourly(Some("2024-06-10"), Some("2024-06-10"), false)
            .await
            .unwrap();
        let second = svc
            .hourly(Some("10.06.2024"), Some("10.06.2024"), true)
            .await
            .unwrap();

        assert_eq!(energy.calls.load(Ordering::SeqCst), 1);
        assert_eq!(prices.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            serde_json::to_string(first.rows.as_slice()).unwrap(),
            serde_json::to_string(second.rows.as_slice()).unwrap()
        );
        assert!(second.debug.unwrap().cache_hit);
        assert_eq!(svc.metrics().cache_hits.get(), 1);
        assert_eq!(svc.metrics().cache_misses.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expires_after_ttl() {
        let energy = Arc::new(StubEnergy::default());
        let prices = Arc::new(StubPrices::default());
        let svc = service(energy.clone(), prices.clone(), ServiceOptions::default());

        svc.hourly(Some("2024-06-10"), Some("2024-06-10"), false)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        svc.hourly(Some("2024-06-10"), Some("2024-06-10"), false)
            .await
            .unwrap();

        assert_eq!(prices.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_energy_failure_fails_whole_request() {
        let energy = Arc::new(StubEnergy {
            fail: true,
            ..Default::default()
        });
        let prices = Arc::new(StubPrices::default());
        let svc = service(energy, prices, ServiceOptions::default());

        let err = svc
            .hourly(Some("2024-06-10"), Some("2024-06-11"), false)
            .await
            .unwrap_err();

        match err {
            NetBillingError::Upstream { provider, message } => {
                assert_eq!(provider, "stub-energy");
                assert!(message.contains("HTTP 503"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(svc.metrics().upstream_failures.get(), 1);
    }

    #[tokio::test]
    async fn test_price_failure_is_not_cached() {
        let energy = Arc::new(StubEnergy::default());
        let prices = Arc::new(StubPrices {
            fail: true,
            ..Default::default()
        });
        let svc = service(energy, prices.clone(), ServiceOptions::default());

        for _ in 0..2 {
            let err = svc
                .hourly(Some("2024-06-10"), Some("2024-06-10"), false)
                .await
                .unwrap_err();
            assert!(matches!(err, NetBillingError::Upstream { .. }));
        }
        assert_eq!(prices.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_concurrency_is_bounded() {
        let energy = Arc::new(StubEnergy {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let prices = Arc::new(StubPrices::default());
        let options = ServiceOptions {
            fetch_concurrency: 3,
            ..Default::default()
        };
        let svc = service(energy.clone(), prices, options);

        let report = svc
            .hourly(Some("2024-06-01"), Some("2024-06-10"), false)
            .await
            .unwrap();

        assert_eq!(energy.calls.load(Ordering::SeqCst), 10);
        assert_eq!(energy.max_in_flight.load(Ordering::SeqCst), 3);
        assert_eq!(report.rows.len(), 240);
        for pair in report.rows.windows(2) {
            assert_eq!(pair[1].hour - pair[0].hour, ChronoDuration::hours(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fails_request() {
        let energy = Arc::new(StubEnergy {
            delay: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let prices = Arc::new(StubPrices::default());
        let options = ServiceOptions {
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let svc = service(energy, prices, options);

        let err = svc
            .hourly(Some("2024-06-10"), Some("2024-06-10"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, NetBillingError::Timeout { secs: 5 }));
    }

    #[tokio::test]
    async fn test_aggregate_by_day() {
        let energy = Arc::new(StubEnergy::default());
        let prices = Arc::new(StubPrices {
            points: vec![
                PricePoint {
                    timestamp: utc("2024-06-10T10:00:00Z"),
                    price_pln_per_kwh: 1.0,
                },
                PricePoint {
                    timestamp: utc("2024-06-11T10:00:00Z"),
                    price_pln_per_kwh: -0.5,
                },
            ],
            ..Default::default()
        });
        let svc = service(energy, prices, ServiceOptions::default());

        let report = svc
            .aggregate(Some("2024-06-10"), Some("2024-06-11"), Granularity::Day)
            .await
            .unwrap();

        assert_eq!(report.buckets.len(), 2);
        assert_eq!(report.buckets[0].key, "2024-06-10");
        assert_eq!(report.buckets[0].exported_kwh, 24.0);
        assert_eq!(report.buckets[0].revenue_pln, 1.0);
        assert_eq!(report.buckets[1].key, "2024-06-11");
        assert_eq!(report.buckets[1].revenue_pln, 0.0);
        assert_eq!(report.buckets[1].avg_price_pln_per_kwh, -0.0208);
    }

    #[tokio::test]
    async fn test_reversed_range_yields_no_rows() {
        let energy = Arc::new(StubEnergy::default());
        let prices = Arc::new(StubPrices {
            fail: true,
            ..Default::default()
        });
        let svc = service(energy.clone(), prices.clone(), ServiceOptions::default());

        let report = svc
            .hourly(Some("2024-06-12"), Some("2024-06-10"), true)
            .await
            .unwrap();
        assert!(report.rows.is_empty());
        assert_eq!(report.totals, RevenueTotals::default());
        assert_eq!(energy.calls.load(Ordering::SeqCst), 0);
        assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
        assert_eq!(svc.metrics().upstream_failures.get(), 0);

        let buckets = svc
            .aggregate(Some("2024-06-12"), Some("2024-06-10"), Granularity::Day)
            .await
            .unwrap()
            .buckets;
        assert!(buckets.is_empty());
        assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
    }
}
