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

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Counters for the conditions operators need to see: degraded timezone
/// resolution, cache effectiveness and upstream failures.
#[derive(Debug, Clone)]
pub struct RevenueMetrics {
    registry: Registry,
    pub degraded_zone_resolutions: IntCounter,
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub upstream_failures: IntCounter,
}

impl RevenueMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let degraded_zone_resolutions = IntCounter::new(
            "netbilling_degraded_zone_resolutions_total",
            "UTC offsets resolved with the seasonal heuristic instead of the zone database",
        )?;
        let cache_hits = IntCounter::new(
            "netbilling_cache_hits_total",
            "Hourly revenue requests served from the result cache",
        )?;
        let cache_misses = IntCounter::new(
            "netbilling_cache_misses_total",
            "Hourly revenue requests recomputed from upstream data",
        )?;
        let upstream_failures = IntCounter::new(
            "netbilling_upstream_failures_total",
            "Failed calls to the energy or price provider",
        )?;

        registry.register(Box::new(degraded_zone_resolutions.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(upstream_failures.clone()))?;

        Ok(Self {
            registry,
            degraded_zone_resolutions,
            cache_hits,
            cache_misses,
            upstream_failures,
        })
    }

    /// Render all counters in the Prometheus text exposition format
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
