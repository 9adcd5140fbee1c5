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

use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

/// Minimal JSON-over-HTTP client shared by the provider adapters.
///
/// Sends `from`/`to` as RFC 3339 query parameters and an optional bearer
/// token. No retries; failures are returned to the caller.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl ProviderClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_range<T: DeserializeOwned>(
        &self,
        path: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let from = from.to_rfc3339_opts(SecondsFormat::Millis, true);
        let to = to.to_rfc3339_opts(SecondsFormat::Millis, true);
        debug!("🔍 GET {} from={} to={}", url, from, to);

        let mut request = self
            .client
            .get(&url)
            .query(&[("from", from.as_str()), ("to", to.as_str())]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{url} returned HTTP {status}: {body}");
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))?;
        trace!("   Body: {}", body);

        serde_json::from_str(&body).with_context(|| format!("Malformed payload from {url}"))
    }
}
