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

//! Normalizes the date/time text accepted from dashboard callers.
//!
//! Accepted forms, in priority order:
//! 1. timestamps carrying an explicit offset (RFC 3339 and close relatives), used as-is
//! 2. `DD.MM.YYYY` with optional ` HH:MM`
//! 3. `YYYY-MM-DD` with optional `THH:MM`, ` HH:MM` or seconds
//!
//! Forms 2 and 3 are wall-clock times in the configured zone. A date without
//! a time resolves to the first (start role) or last (end role) millisecond of
//! that local day. Years outside [`SUPPORTED_YEARS`] and anything else
//! unrecognized are absent, never an error.

use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use super::ZoneClock;

/// Which end of a range a parsed value will bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRole {
    Start,
    End,
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// `Z`-suffixed forms that RFC 3339 parsing rejects (no seconds)
const ZULU_FORMATS: &[&str] = &["%Y-%m-%dT%H:%MZ", "%Y-%m-%d %H:%MZ"];

/// Calendar years accepted from callers. Keeps zone arithmetic far from
/// chrono's representable limits.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1900..=9999;

const DOTTED_DATETIME_FORMATS: &[&str] = &["%d.%m.%Y %H:%M", "%d.%m.%Y %H:%M:%S"];

const ISO_LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

pub fn parse_instant(text: &str, role: RangeRole, clock: &ZoneClock) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(instant) = parse_with_offset(text) {
        return supported(instant.year()).then_some(instant);
    }

    if let Some(local) = parse_naive_datetime(text, DOTTED_DATETIME_FORMATS) {
        return supported(local.year()).then(|| clock.to_utc(local));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%d.%m.%Y") {
        return resolve_date(date, role, clock);
    }

    if let Some(local) = parse_naive_datetime(text, ISO_LOCAL_DATETIME_FORMATS) {
        return supported(local.year()).then(|| clock.to_utc(local));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return resolve_date(date, role, clock);
    }

    None
}

fn supported(year: i32) -> bool {
    SUPPORTED_YEARS.contains(&year)
}

fn parse_with_offset(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    parse_naive_datetime(text, ZULU_FORMATS).map(|naive| naive.and_utc())
}

fn parse_naive_datetime(text: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn resolve_date(date: NaiveDate, role: RangeRole, clock: &ZoneClock) -> Option<DateTime<Utc>> {
    if !supported(date.year()) {
        return None;
    }
    let bounds = clock.day_bounds(date);
    Some(match role {
        RangeRole::Start => bounds.start,
        RangeRole::End => bounds.end,
    })
}
