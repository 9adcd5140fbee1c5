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

use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{NetBillingError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetBillingConfig {
    #[serde(default)]
    pub zone: ZoneSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    pub energy: ProviderSettings,
    pub price: ProviderSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSettings {
    /// IANA name of the installation's civil zone
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_stale_while_revalidate_secs")]
    pub stale_while_revalidate_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Maximum concurrent per-day energy requests
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Deadline for the whole upstream phase of one request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Per-call HTTP timeout used by the provider clients
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_timezone() -> String {
    "Europe/Warsaw".to_owned()
}

fn default_ttl_secs() -> u64 {
    30
}

fn default_stale_while_revalidate_secs() -> u64 {
    15
}

fn default_concurrency() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    25
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8110
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            stale_while_revalidate_secs: default_stale_while_revalidate_secs(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// `Cache-Control` value matching the result cache lifetime
    pub fn cache_control(&self) -> String {
        format!(
            "public, max-age={ttl}, s-maxage={ttl}, stale-while-revalidate={swr}",
            ttl = self.ttl_secs,
            swr = self.stale_while_revalidate_secs
        )
    }
}

impl FetchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

impl NetBillingConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NetBillingError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NetBillingError::Config(format!("Failed to parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.zone.timezone.parse::<Tz>().is_err() {
            return Err(NetBillingError::Config(format!(
                "zone.timezone '{}' is not a known IANA timezone",
                self.zone.timezone
            )));
        }
        if self.fetch.concurrency == 0 {
            return Err(NetBillingError::Config(
                "fetch.concurrency must be at least 1".to_owned(),
            ));
        }
        if self.fetch.request_timeout_secs == 0 || self.fetch.upstream_timeout_secs == 0 {
            return Err(NetBillingError::Config(
                "fetch timeouts must be at least 1 second".to_owned(),
            ));
        }
        if self.energy.base_url.trim().is_empty() {
            return Err(NetBillingError::Config("energy.base_url must be set".to_owned()));
        }
        if self.price.base_url.trim().is_empty() {
            return Err(NetBillingError::Config("price.base_url must be set".to_owned()));
        }
        Ok(())
    }
}
