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

//! Error types for the net-billing core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetBillingError {
    #[error("{provider} unavailable: {message}")]
    Upstream { provider: String, message: String },

    #[error("request exceeded deadline of {secs}s")]
    Timeout { secs: u64 },

    #[error("config error: {0}")]
    Config(String),
}

impl NetBillingError {
    pub fn upstream(provider: &str, err: &anyhow::Error) -> Self {
        Self::Upstream {
            provider: provider.to_owned(),
            message: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetBillingError>;
